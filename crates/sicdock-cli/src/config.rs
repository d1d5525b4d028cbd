use crate::cli::ScoreArgs;
use crate::error::{CliError, Result};
use serde::Deserialize;
use sicdock::core::docking::DistanceFunc;
use sicdock::core::loops::LoopHashParams;
use sicdock::engine::config as core_config;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_CLASH_DISTANCE: f64 = 4.0;
const DEFAULT_CONTACT_DISTANCE: f64 = 8.0;
const DEFAULT_LOOKUP_RADIUS: usize = 1;
const DEFAULT_DUMP_TOP: usize = 1;

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialAtomSpecifier {
    fragment: u8,
    chain: char,
    residue: isize,
    atom: String,
}

impl TryFrom<PartialAtomSpecifier> for core_config::AtomSpecifier {
    type Error = CliError;

    fn try_from(p: PartialAtomSpecifier) -> Result<Self> {
        let side = match p.fragment {
            1 => core_config::FragmentSide::One,
            2 => core_config::FragmentSide::Two,
            other => {
                return Err(CliError::Config(format!(
                    "Constraint atom fragment must be 1 or 2, got {}",
                    other
                )));
            }
        };
        Ok(Self {
            side,
            chain_id: p.chain,
            residue_number: p.residue,
            atom_name: p.atom,
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialConstraint {
    atom1: PartialAtomSpecifier,
    atom2: PartialAtomSpecifier,
    func: DistanceFunc,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", tag = "type", deny_unknown_fields)]
enum PartialComponent {
    #[serde(rename_all = "kebab-case")]
    Contact {
        weight: Option<f64>,
        clash_distance: Option<f64>,
        contact_distance: Option<f64>,
    },
    #[serde(rename_all = "kebab-case")]
    Linker {
        weight: Option<f64>,
        max_loop_length: Option<usize>,
        lookup_radius: Option<usize>,
    },
    Constraints {
        weight: Option<f64>,
        #[serde(default)]
        constraints: Vec<PartialConstraint>,
    },
}

impl PartialComponent {
    fn into_core(self) -> Result<core_config::ComponentConfig> {
        Ok(match self {
            PartialComponent::Contact {
                weight,
                clash_distance,
                contact_distance,
            } => core_config::ComponentConfig::Contact {
                weight: weight.unwrap_or(1.0),
                clash_distance: clash_distance.unwrap_or(DEFAULT_CLASH_DISTANCE),
                contact_distance: contact_distance.unwrap_or(DEFAULT_CONTACT_DISTANCE),
            },
            PartialComponent::Linker {
                weight,
                max_loop_length,
                lookup_radius,
            } => core_config::ComponentConfig::Linker {
                weight: weight.unwrap_or(1.0),
                max_loop_length: max_loop_length.ok_or_else(|| {
                    CliError::Config("Linker components require `max-loop-length`.".to_string())
                })?,
                lookup_radius: lookup_radius.unwrap_or(DEFAULT_LOOKUP_RADIUS),
            },
            PartialComponent::Constraints {
                weight,
                constraints,
            } => core_config::ComponentConfig::Constraints {
                weight: weight.unwrap_or(1.0),
                constraints: constraints
                    .into_iter()
                    .map(|c| {
                        Ok(core_config::ConstraintSpec {
                            atom1: c.atom1.try_into()?,
                            atom2: c.atom2.try_into()?,
                            func: c.func,
                        })
                    })
                    .collect::<Result<_>>()?,
            },
        })
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialLoopLibraryConfig {
    db_path: Option<PathBuf>,
    cart_resolution: Option<f64>,
    angle_resolution: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDumpConfig {
    out_prefix: Option<String>,
    top: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialScoreConfig {
    #[serde(default)]
    components: Vec<PartialComponent>,
    loop_library: Option<PartialLoopLibraryConfig>,
    dump: Option<PartialDumpConfig>,
}

impl PartialScoreConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Applies `-S` settings and explicit CLI flags (highest precedence) and validates the result.
    pub fn merge_with_cli(mut self, args: &ScoreArgs) -> Result<core_config::DockScoreConfig> {
        self.apply_set_values(&args.set_values)?;

        let loop_library = self.loop_library.take().unwrap_or_default();
        let defaults = LoopHashParams::default();
        let params = LoopHashParams {
            cart_resolution: loop_library
                .cart_resolution
                .unwrap_or(defaults.cart_resolution),
            angle_resolution: loop_library
                .angle_resolution
                .unwrap_or(defaults.angle_resolution),
        };
        let db_path = args.loop_db.clone().or(loop_library.db_path);

        let dump = Self::merge_dump(self.dump.take(), args)?;

        let components = self
            .components
            .into_iter()
            .map(PartialComponent::into_core)
            .collect::<Result<Vec<_>>>()?;

        core_config::DockScoreConfigBuilder::new()
            .components(components)
            .loop_db_path(db_path)
            .loop_hash_params(params)
            .dump(dump)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_dump(
        partial: Option<PartialDumpConfig>,
        args: &ScoreArgs,
    ) -> Result<Option<core_config::DumpConfig>> {
        let partial = partial.unwrap_or_default();
        let out_prefix = args.dump_prefix.clone().or(partial.out_prefix);
        let top = args.dump_top.or(partial.top);
        match (out_prefix, top) {
            (Some(out_prefix), top) => Ok(Some(core_config::DumpConfig {
                out_prefix,
                top: top.unwrap_or(DEFAULT_DUMP_TOP),
            })),
            (None, Some(_)) => Err(CliError::Config(
                "A dump count was given without `dump.out-prefix` / `--dump-prefix`.".to_string(),
            )),
            (None, None) => Ok(None),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            let parse_float = || -> Result<f64> {
                value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                })
            };
            let parse_int = || -> Result<usize> {
                value_str.parse().map_err(|_| {
                    CliError::Config(format!("Invalid integer value for {}: {}", key, value_str))
                })
            };

            match key {
                "loop-library.db-path" => {
                    self.loop_library
                        .get_or_insert_with(Default::default)
                        .db_path = Some(PathBuf::from(value_str));
                }
                "loop-library.cart-resolution" => {
                    self.loop_library
                        .get_or_insert_with(Default::default)
                        .cart_resolution = Some(parse_float()?);
                }
                "loop-library.angle-resolution" => {
                    self.loop_library
                        .get_or_insert_with(Default::default)
                        .angle_resolution = Some(parse_float()?);
                }
                "dump.out-prefix" => {
                    self.dump.get_or_insert_with(Default::default).out_prefix =
                        Some(value_str.to_string());
                }
                "dump.top" => {
                    self.dump.get_or_insert_with(Default::default).top = Some(parse_int()?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
