//! Error types for objgate-core
//!
//! Provides a unified error type shared by the facade and every store adapter.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for objgate-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for objgate operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required request field is missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Content type does not resolve to a registered MIME type
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    /// Upload target already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Bucket does not exist
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Object does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Payload is not valid base64
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Opaque failure reported by the object store (permission, transport, throttling)
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Operation was cancelled through its context
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Operation did not finish before its context deadline
    #[error("Deadline exceeded after {elapsed:?}: {operation}")]
    DeadlineExceeded {
        operation: String,
        elapsed: Duration,
    },
}

impl Error {
    /// Whether this error means the addressed bucket or object is absent
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::BucketNotFound(_) | Error::FileNotFound(_))
    }

    /// Whether this error was caused by the caller's input rather than the store
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidArgument(_)
                | Error::UnknownContentType(_)
                | Error::InvalidPayload(_)
                | Error::AlreadyExists(_)
        )
    }
}
