//! Error types for sigcheck-verify
//!
//! Every failure carries one [`ErrorKind`] so callers can branch on the
//! reason without matching message text.

use thiserror::Error;

/// Machine-distinguishable failure reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    MalformedInput,
    UnsupportedAlgorithm,
    BundleVersion,
    CertificateChain,
    IdentityMismatch,
    InvalidSignature,
    UnknownLog,
    InvalidLogEntry,
    TlogThreshold,
    InvalidTimestamp,
    TsaThreshold,
    Network,
    Policy,
}

#[derive(Error, Debug)]
pub enum Error {
    /// Unknown bundle or trusted root media type
    #[error("unsupported schema: {0}")]
    Schema(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("bundle version {actual} is below the required minimum {minimum}")]
    BundleVersion { minimum: String, actual: String },

    #[error("certificate chain verification failed: {0}")]
    CertificateChain(String),

    #[error("{field} mismatch: expected {expected}, got {actual}")]
    IdentityMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("signature verification failed: {0}")]
    InvalidSignature(String),

    /// A log entry names a log the trusted root does not contain
    #[error("unknown transparency log {log_id}")]
    UnknownLog { log_id: String },

    #[error("invalid transparency log entry: {0}")]
    InvalidLogEntry(String),

    #[error(
        "transparency log threshold not met: {verified} of {required} required entries verified"
    )]
    TlogThreshold { required: usize, verified: usize },

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error(
        "timestamp threshold not met: {verified} of {required} required timestamps verified"
    )]
    TsaThreshold { required: usize, verified: usize },

    /// Online log access failed; the only retryable kind
    #[error("network error: {0}")]
    Network(String),

    /// The policy is inconsistent or cannot be applied
    #[error("invalid policy: {0}")]
    Policy(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Schema(_) => ErrorKind::Schema,
            Error::MalformedInput(_) => ErrorKind::MalformedInput,
            Error::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Error::BundleVersion { .. } => ErrorKind::BundleVersion,
            Error::CertificateChain(_) => ErrorKind::CertificateChain,
            Error::IdentityMismatch { .. } => ErrorKind::IdentityMismatch,
            Error::InvalidSignature(_) => ErrorKind::InvalidSignature,
            Error::UnknownLog { .. } => ErrorKind::UnknownLog,
            Error::InvalidLogEntry(_) => ErrorKind::InvalidLogEntry,
            Error::TlogThreshold { .. } => ErrorKind::TlogThreshold,
            Error::InvalidTimestamp(_) => ErrorKind::InvalidTimestamp,
            Error::TsaThreshold { .. } => ErrorKind::TsaThreshold,
            Error::Network(_) => ErrorKind::Network,
            Error::Policy(_) => ErrorKind::Policy,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

impl From<sigcheck_types::Error> for Error {
    fn from(e: sigcheck_types::Error) -> Self {
        match e {
            sigcheck_types::Error::InvalidMediaType(_) => Error::Schema(e.to_string()),
            _ => Error::MalformedInput(e.to_string()),
        }
    }
}

impl From<sigcheck_trust_root::Error> for Error {
    fn from(e: sigcheck_trust_root::Error) -> Self {
        use sigcheck_trust_root::Error as E;
        match e {
            E::Schema(_) => Error::Schema(e.to_string()),
            E::UnsupportedAlgorithm(_) => Error::UnsupportedAlgorithm(e.to_string()),
            E::Tuf(_) => Error::Network(e.to_string()),
            E::Json(_) | E::Malformed(_) | E::Io(_) => Error::MalformedInput(e.to_string()),
        }
    }
}

impl From<sigcheck_rekor::Error> for Error {
    fn from(e: sigcheck_rekor::Error) -> Self {
        match e {
            sigcheck_rekor::Error::Network(msg) => Error::Network(msg),
            other => Error::InvalidLogEntry(other.to_string()),
        }
    }
}

impl From<sigcheck_tsa::Error> for Error {
    fn from(e: sigcheck_tsa::Error) -> Self {
        match e {
            sigcheck_tsa::Error::UnsupportedAlgorithm(_) => {
                Error::UnsupportedAlgorithm(e.to_string())
            }
            _ => Error::InvalidTimestamp(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
