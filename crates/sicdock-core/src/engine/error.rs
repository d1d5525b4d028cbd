use std::path::PathBuf;
use thiserror::Error;

use super::config::{AtomSpecifier, ConfigError};
use crate::core::docking::ScoreError;
use crate::core::loops::LoopLibraryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Atom not found: {spec}")]
    AtomNotFound { spec: AtomSpecifier },

    #[error("Scoring failed: {source}")]
    Scoring {
        #[from]
        source: ScoreError,
    },

    #[error("Loop library error: {source}")]
    LoopLibrary {
        #[from]
        source: LoopLibraryError,
    },

    #[error("Dumping linkers for pose '{pose}' failed: {source}")]
    Dump { pose: String, source: ScoreError },

    #[error("Failed to write placed fragment '{path}': {source}")]
    DumpIo {
        path: PathBuf,
        source: std::io::Error,
    },
}
