//! # Engine Module
//!
//! Configuration, error handling and progress plumbing shared by the workflows.
//!
//! - **Configuration** ([`config`]) - Validated docking score configurations built with
//!   [`config::DockScoreConfigBuilder`]
//! - **Error Handling** ([`error`]) - The engine-level error type wrapping core failures
//! - **Progress Monitoring** ([`progress`]) - Phase and task events for user feedback

pub mod config;
pub mod error;
pub mod progress;
