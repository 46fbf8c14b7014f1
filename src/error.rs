use std::path::PathBuf;

use thiserror::Error;

/// Main error type for Docsmith operations
#[derive(Error, Debug)]
pub enum DocsmithError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The tree does not match the shape assumed for an already-classified
    /// production. Aborts the walk for that input only.
    #[error("Structural error in {file}:{line}: {message}")]
    Structural {
        file: PathBuf,
        line: u32,
        message: String,
    },

    #[error("Input error: {0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Check failed: {0}")]
    Check(String),
}

pub type Result<T> = std::result::Result<T, DocsmithError>;
