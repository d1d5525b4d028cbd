//! # Core Module
//!
//! Stateless building blocks for scoring rigid placements of two fragments.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues and chains of a fragment
//! - **Transforms** ([`geometry`]) - Rigid transforms, backbone frames and virtual CB placement
//! - **Proximity Queries** ([`spatial`]) - Weighted point index with radius-bounded visits
//! - **Loop Closure** ([`loops`]) - Loop-feasibility library service and its hashed implementation
//! - **Docking Scores** ([`docking`]) - The `RigidScore` family and its numeric primitives
//! - **File I/O** ([`io`]) - Fragment files and diagnostic structure dumps

pub mod docking;
pub mod geometry;
pub mod io;
pub mod loops;
pub mod models;
pub mod spatial;
