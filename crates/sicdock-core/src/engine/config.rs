use crate::core::docking::DistanceFunc;
use crate::core::docking::linker::MIN_LOOP_LENGTH;
pub use crate::core::loops::LoopLibraryConfig;
use crate::core::loops::LoopHashParams;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentSide {
    One,
    Two,
}

impl fmt::Display for FragmentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentSide::One => write!(f, "fragment 1"),
            FragmentSide::Two => write!(f, "fragment 2"),
        }
    }
}

/// Names an atom by chain, residue number and atom name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtomSpecifier {
    pub side: FragmentSide,
    pub chain_id: char,
    pub residue_number: isize,
    pub atom_name: String,
}

impl fmt::Display for AtomSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{}:{}",
            self.side, self.chain_id, self.residue_number, self.atom_name
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    pub atom1: AtomSpecifier,
    pub atom2: AtomSpecifier,
    pub func: DistanceFunc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentConfig {
    Contact {
        weight: f64,
        clash_distance: f64,
        contact_distance: f64,
    },
    Linker {
        weight: f64,
        max_loop_length: usize,
        lookup_radius: usize,
    },
    Constraints {
        weight: f64,
        constraints: Vec<ConstraintSpec>,
    },
}

impl ComponentConfig {
    pub fn weight(&self) -> f64 {
        match self {
            ComponentConfig::Contact { weight, .. }
            | ComponentConfig::Linker { weight, .. }
            | ComponentConfig::Constraints { weight, .. } => *weight,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.weight().is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "weight",
                reason: format!("must be finite, got {}", self.weight()),
            });
        }
        match *self {
            ComponentConfig::Contact {
                clash_distance,
                contact_distance,
                ..
            } => {
                if !(contact_distance > 0.0) {
                    return Err(ConfigError::InvalidParameter {
                        name: "contact-distance",
                        reason: format!("must be positive, got {}", contact_distance),
                    });
                }
                if !(clash_distance >= 0.0) || clash_distance > contact_distance {
                    return Err(ConfigError::InvalidParameter {
                        name: "clash-distance",
                        reason: format!(
                            "must lie between 0 and the contact distance ({}), got {}",
                            contact_distance, clash_distance
                        ),
                    });
                }
            }
            ComponentConfig::Linker {
                max_loop_length, ..
            } => {
                if max_loop_length < MIN_LOOP_LENGTH {
                    return Err(ConfigError::InvalidParameter {
                        name: "max-loop-length",
                        reason: format!(
                            "must be at least {}, got {}",
                            MIN_LOOP_LENGTH, max_loop_length
                        ),
                    });
                }
            }
            ComponentConfig::Constraints { .. } => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DumpConfig {
    pub out_prefix: String,
    pub top: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockScoreConfig {
    pub components: Vec<ComponentConfig>,
    pub loop_library: LoopLibraryConfig,
    pub dump: Option<DumpConfig>,
}

impl DockScoreConfig {
    /// Largest loop length requested by any linker component.
    pub fn max_loop_length(&self) -> Option<usize> {
        self.components
            .iter()
            .filter_map(|c| match c {
                ComponentConfig::Linker {
                    max_loop_length, ..
                } => Some(*max_loop_length),
                _ => None,
            })
            .max()
    }
}

#[derive(Default)]
pub struct DockScoreConfigBuilder {
    components: Vec<ComponentConfig>,
    loop_db_path: Option<PathBuf>,
    loop_hash_params: Option<LoopHashParams>,
    dump: Option<DumpConfig>,
}

impl DockScoreConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component(mut self, component: ComponentConfig) -> Self {
        self.components.push(component);
        self
    }
    pub fn components(mut self, components: Vec<ComponentConfig>) -> Self {
        self.components.extend(components);
        self
    }
    pub fn loop_db_path(mut self, path: Option<PathBuf>) -> Self {
        self.loop_db_path = path;
        self
    }
    pub fn loop_hash_params(mut self, params: LoopHashParams) -> Self {
        self.loop_hash_params = Some(params);
        self
    }
    pub fn dump(mut self, dump: Option<DumpConfig>) -> Self {
        self.dump = dump;
        self
    }

    pub fn build(self) -> Result<DockScoreConfig, ConfigError> {
        if self.components.is_empty() {
            return Err(ConfigError::MissingParameter("components"));
        }
        for component in &self.components {
            component.validate()?;
        }
        if let Some(dump) = &self.dump {
            if dump.top == 0 {
                return Err(ConfigError::InvalidParameter {
                    name: "dump-top",
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        Ok(DockScoreConfig {
            components: self.components,
            loop_library: LoopLibraryConfig {
                db_path: self.loop_db_path,
                params: self.loop_hash_params.unwrap_or_default(),
            },
            dump: self.dump,
        })
    }
}
