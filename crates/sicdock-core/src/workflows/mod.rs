//! # Workflows Module
//!
//! High-level entry points that drive the core scores from a validated configuration.
//!
//! - **Scoring Workflow** ([`score`]) - Builds the weighted docking score for two
//!   fragments, evaluates candidate poses, ranks them and optionally dumps linker
//!   examples for the best ones.
//! - **Library Workflow** ([`library`]) - Harvests backbone loop windows from
//!   structures into a loop hash library that the linker score can later load.
//!
//! Both report their phases through [`crate::engine::progress::ProgressReporter`].

pub mod library;
pub mod score;
