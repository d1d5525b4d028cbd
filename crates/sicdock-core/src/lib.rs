//! # sicdock
//!
//! Scoring of rigid-body docking poses for pairs of macromolecular fragments.
//!
//! A docking search proposes placements (rigid transforms) for two fragments and
//! asks how good each placement is. This library answers with a weighted sum of
//! independent terms: steric contact between representative atoms, feasibility of
//! closing a short loop between chain termini, and user-supplied geometric
//! constraints.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Fragment models, transform math, the spatial
//!   index, the loop library and the `RigidScore` implementations.
//!
//! - **[`engine`]: Configuration and plumbing.** Validated score configurations,
//!   the engine error type and progress reporting.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures: scoring and ranking
//!   candidate poses, and building loop libraries from structures.

pub mod core;
pub mod engine;
pub mod workflows;
