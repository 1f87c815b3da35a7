//! Error types for sigcheck-rekor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid checkpoint: {0}")]
    Checkpoint(String),

    #[error("invalid inclusion proof: {0}")]
    InclusionProof(String),

    /// Signed entry timestamp did not verify
    #[error("invalid signed entry timestamp: {0}")]
    SignedEntryTimestamp(String),

    /// The canonicalized entry body could not be decoded
    #[error("invalid entry body: {0}")]
    Body(String),

    /// The online log returned an entry that does not match the bundle
    #[error("log entry mismatch: {0}")]
    Mismatch(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure, a server error, or rate limiting
    #[error("network error: {0}")]
    Network(String),

    /// The log answered, but with a client error status or an unusable body
    #[error("unusable log response: {0}")]
    Response(String),
}

impl Error {
    /// Only transport failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
