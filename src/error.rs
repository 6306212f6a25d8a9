use thiserror::Error;

/// Main error type for docwatch operations
#[derive(Error, Debug)]
pub enum DocwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error at {path}: {reason}")]
    Persistence { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DocwatchError>;
