//! Error types for sigcheck-crypto

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// ASN.1 / DER decoding failed
    #[error("DER error: {0}")]
    Der(String),

    #[error("invalid public key: {0}")]
    InvalidKey(String),

    /// Key type, curve, or hash combination outside the supported set
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature verification failed: {0}")]
    InvalidSignature(String),

    /// Certificate is structurally fine but unusable (profile, validity, extensions)
    #[error("certificate error: {0}")]
    Certificate(String),

    /// No path from the certificate to a trusted root
    #[error("certificate chain error: {0}")]
    Chain(String),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::Der(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
