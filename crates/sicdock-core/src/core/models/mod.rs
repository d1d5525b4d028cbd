//! # Fragment Models Module
//!
//! Data structures for the rigid bodies being docked. A [`fragment::Fragment`]
//! is an immutable-after-construction container of atoms grouped into
//! residues and chains; the docking scores read coordinates, named atoms and
//! chain termini from it but never move it. Candidate placements are applied
//! through transforms instead.
//!
//! - [`atom`] - Atom name, parent residue and local coordinates
//! - [`residue`] - Residue with ordered atoms and named lookup
//! - [`chain`] - Chain with sequence-ordered residues
//! - [`fragment`] - The fragment container itself
//! - [`ids`] - Slotmap handles for atoms, residues and chains
//!
//! ```ignore
//! use sicdock::core::models::{fragment::Fragment, chain::ChainType};
//!
//! let mut fragment = Fragment::new();
//! let chain_id = fragment.add_chain('A', ChainType::Protein);
//! let residue_id = fragment.add_residue(chain_id, 1, "ALA").unwrap();
//! fragment.add_atom_to_residue(residue_id, Atom::new("CA", residue_id, Point3::origin()));
//! ```

pub mod atom;
pub mod chain;
pub mod fragment;
pub mod ids;
pub mod residue;
