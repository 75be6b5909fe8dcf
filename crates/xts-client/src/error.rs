//! Client error types.

use thiserror::Error;
use xts_core::CoreError;
use xts_feed::FeedError;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Login rejected or its response was unusable.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A retrieval was attempted with an unauthenticated session.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Non-success status, network failure or timeout.
    #[error("Transport error{}: {message}", fmt_status(.status))]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] FeedError),

    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl ClientError {
    /// Label used for the `result` dimension of the request counter.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ClientError::Transport { .. } => "transport_error",
            ClientError::Parse(_) => "parse_error",
            _ => "other_error",
        }
    }

    /// HTTP status carried by a transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_status() {
        let err = ClientError::Transport {
            status: Some(503),
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transport error (HTTP 503): Service Unavailable"
        );
        assert_eq!(err.status(), Some(503));

        let err = ClientError::Transport {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_metric_labels() {
        let err = ClientError::Transport {
            status: Some(500),
            message: String::new(),
        };
        assert_eq!(err.metric_label(), "transport_error");
        assert_eq!(ClientError::NotLoggedIn.metric_label(), "other_error");
    }
}
