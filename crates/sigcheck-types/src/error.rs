//! Error types for sigcheck-types

use thiserror::Error;

/// Errors produced while decoding bundles and their encoded fields
#[derive(Error, Debug)]
pub enum Error {
    /// JSON decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Media type is not a known bundle media type
    #[error("unsupported bundle media type: {0}")]
    InvalidMediaType(String),

    /// Version string is not of the form `major.minor`
    #[error("invalid bundle version: {0}")]
    InvalidVersion(String),

    /// A hex or base64 field could not be decoded
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A required field is missing
    #[error("missing field: {0}")]
    MissingField(String),
}

/// Result alias for sigcheck-types
pub type Result<T> = std::result::Result<T, Error>;
