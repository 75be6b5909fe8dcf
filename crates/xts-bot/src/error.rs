//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] xts_core::CoreError),

    #[error("Client error: {0}")]
    Client(#[from] xts_client::ClientError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] xts_persistence::PersistenceError),

    #[error("Stream error: {0}")]
    Stream(#[from] xts_stream::StreamError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] xts_telemetry::TelemetryError),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
