//! Stream error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Session is not authenticated")]
    NotAuthenticated,

    #[error("Socket not connected")]
    NotConnected,

    #[error("Event channel closed")]
    ChannelClosed,

    #[error("Invalid socket config: {0}")]
    InvalidConfig(String),
}

pub type StreamResult<T> = Result<T, StreamError>;
