//! Error types for the gateway

use std::io;

use thiserror::Error;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied an invalid entity type, id, where clause, include or order
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote API rejected the credentials (HTTP 401)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Remote API answered with a non-success status
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the error body
        message: String,
    },

    /// Transient failures persisted through every attempt
    #[error("{operation} failed after {attempts} attempts: {message}")]
    RetriesExhausted {
        /// Operation label, e.g. `GET UserStorys`
        operation: String,
        /// Attempts made
        attempts: u32,
        /// Last underlying error message
        message: String,
    },

    /// Connection-level failure before a response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Secondary metadata feed could not be decoded, even after repair
    #[error("Metadata parse error: {0}")]
    MetadataParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Machine-checkable error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input; never retried
    Validation,
    /// Bad credentials; never retried
    Authentication,
    /// Non-success HTTP status
    Api,
    /// Retries exhausted on a transient failure
    TransientNetwork,
    /// Malformed metadata feed
    MetadataParse,
    /// Configuration problem
    Config,
    /// Anything else (IO, JSON decoding)
    Internal,
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 401 {
            Self::Authentication(message)
        } else {
            Self::Api { status, message }
        }
    }

    /// HTTP status carried by this error, if any
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Authentication(_) => Some(401),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Authentication(_) => ErrorKind::Authentication,
            Self::Api { .. } => ErrorKind::Api,
            Self::RetriesExhausted { .. } | Self::Transport(_) | Self::Http(_) => {
                ErrorKind::TransientNetwork
            }
            Self::MetadataParse(_) => ErrorKind::MetadataParse,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Whether another attempt could succeed.
    ///
    /// 400 and 401 mean a malformed request or bad credentials; every other
    /// network or status failure is worth another try.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_)
            | Self::Authentication(_)
            | Self::MetadataParse(_)
            | Self::Config(_)
            | Self::Json(_)
            | Self::RetriesExhausted { .. } => false,
            Self::Api { status, .. } => !matches!(status, 400 | 401),
            Self::Http(e) => !matches!(e.status().map(|s| s.as_u16()), Some(400 | 401)),
            Self::Transport(_) | Self::Io(_) => true,
        }
    }
}
