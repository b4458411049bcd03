use std::path::PathBuf;
use thiserror::Error;

/// Every failure the pipeline can surface. All variants are fatal: errors are
/// logged where they arise and propagated unchanged to the process boundary.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("missing required environment variables: {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("{service} rejected credentials: {message}")]
    Authentication {
        service: &'static str,
        message: String,
    },

    #[error("{context} failed: {message}")]
    Transfer {
        context: &'static str,
        message: String,
    },

    #[error("failed to parse {file}: {message}")]
    Parse { file: String, message: String },

    #[error("no spreadsheet files to process")]
    EmptyInput,

    #[error("duplicate column name after canonicalization: {0}")]
    ColumnCollision(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EtlError>;
