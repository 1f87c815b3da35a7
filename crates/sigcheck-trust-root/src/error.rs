//! Error types for sigcheck-trust-root

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The document's media type is not the supported trusted root schema
    #[error("unsupported trusted root media type: {0}")]
    Schema(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally invalid content: empty chains, bad DER, missing key bytes
    #[error("malformed trusted root: {0}")]
    Malformed(String),

    /// A hash algorithm or key type outside the supported set
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fetching the trusted root through TUF failed
    #[error("TUF error: {0}")]
    Tuf(String),
}

pub type Result<T> = std::result::Result<T, Error>;
