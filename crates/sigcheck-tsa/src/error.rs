//! Error types for sigcheck-tsa

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The token or one of its structures failed to decode
    #[error("malformed timestamp: {0}")]
    Malformed(String),

    /// The signer does not chain to the supplied authority
    #[error("timestamp signer is not trusted: {0}")]
    UntrustedSigner(String),

    /// The token timestamps something other than the expected message
    #[error("message imprint mismatch: {0}")]
    MessageImprint(String),

    #[error("timestamp signature invalid: {0}")]
    Signature(String),

    /// Signer certificate unusable for timestamping
    #[error("timestamp signer certificate: {0}")]
    Certificate(String),

    /// The timestamp lies outside the authority's validity period
    #[error("timestamp outside validity period: {0}")]
    Validity(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::Malformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
