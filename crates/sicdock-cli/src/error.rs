use sicdock::core::io::fragment::FragmentFileError;
use sicdock::core::loops::LoopLibraryError;
use sicdock::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    SicdockCore(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read fragment '{path}': {source}", path = path.display())]
    Fragment {
        path: PathBuf,
        #[source]
        source: FragmentFileError,
    },

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Loop library error: {0}")]
    LoopLibrary(#[from] LoopLibraryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
