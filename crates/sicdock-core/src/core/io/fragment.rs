use super::traits::FragmentFile;
use crate::core::models::atom::Atom;
use crate::core::models::chain::ChainType;
use crate::core::models::fragment::Fragment;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FragmentFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Chain identifier must be a single character, got '{0}'")]
    InvalidChainId(String),
    #[error("Duplicate atom '{atom}' in residue {residue} of chain '{chain}'")]
    DuplicateAtom {
        chain: char,
        residue: isize,
        atom: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FragmentDocument {
    #[serde(default)]
    chains: Vec<ChainRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ChainRecord {
    id: String,
    #[serde(rename = "type", default = "default_chain_type")]
    chain_type: String,
    #[serde(default)]
    residues: Vec<ResidueRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ResidueRecord {
    number: isize,
    name: String,
    #[serde(default)]
    atoms: Vec<AtomRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AtomRecord {
    name: String,
    position: [f64; 3],
}

fn default_chain_type() -> String {
    "protein".to_string()
}

/// Fragment structures stored as TOML.
///
/// ```toml
/// [[chains]]
/// id = "A"
/// type = "protein"
///
/// [[chains.residues]]
/// number = 1
/// name = "GLY"
/// atoms = [
///     { name = "N", position = [0.0, 0.0, 0.0] },
///     { name = "CA", position = [1.46, 0.0, 0.0] },
/// ]
/// ```
///
/// Residue order in the file is the fragment's sequential order.
pub struct TomlFragmentFile;

impl FragmentFile for TomlFragmentFile {
    type Error = FragmentFileError;

    fn read_from(reader: &mut impl BufRead) -> Result<Fragment, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let document: FragmentDocument = toml::from_str(&content)?;

        let mut fragment = Fragment::new();
        for chain_record in document.chains {
            let mut chars = chain_record.id.chars();
            let (Some(id), None) = (chars.next(), chars.next()) else {
                return Err(FragmentFileError::InvalidChainId(chain_record.id));
            };
            let chain_type = chain_record
                .chain_type
                .parse::<ChainType>()
                .unwrap_or(ChainType::Other);
            let chain_id = fragment.add_chain(id, chain_type);

            for residue_record in chain_record.residues {
                let Some(residue_id) =
                    fragment.add_residue(chain_id, residue_record.number, &residue_record.name)
                else {
                    continue;
                };

                let mut seen = HashSet::new();
                for atom_record in residue_record.atoms {
                    if !seen.insert(atom_record.name.clone()) {
                        return Err(FragmentFileError::DuplicateAtom {
                            chain: id,
                            residue: residue_record.number,
                            atom: atom_record.name,
                        });
                    }
                    let atom = Atom::new(
                        &atom_record.name,
                        residue_id,
                        Point3::from(atom_record.position),
                    );
                    fragment.add_atom_to_residue(residue_id, atom);
                }
            }
        }
        Ok(fragment)
    }

    fn write_to(fragment: &Fragment, writer: &mut impl Write) -> Result<(), Self::Error> {
        let chains = fragment
            .chains_iter()
            .map(|(_, chain)| ChainRecord {
                id: chain.id.to_string(),
                chain_type: chain.chain_type.to_string().to_lowercase(),
                residues: chain
                    .residues()
                    .iter()
                    .filter_map(|&residue_id| fragment.residue(residue_id))
                    .map(|residue| ResidueRecord {
                        number: residue.residue_number,
                        name: residue.name.clone(),
                        atoms: residue
                            .atoms()
                            .iter()
                            .filter_map(|&atom_id| fragment.atom(atom_id))
                            .map(|atom| AtomRecord {
                                name: atom.name.clone(),
                                position: [atom.position.x, atom.position.y, atom.position.z],
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let content = toml::to_string(&FragmentDocument { chains })?;
        writer.write_all(content.as_bytes())?;
        Ok(())
    }
}
