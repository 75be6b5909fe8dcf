//! Persistence error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed record {row} in {path}: {message}")]
    Malformed {
        path: PathBuf,
        row: usize,
        message: String,
    },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
