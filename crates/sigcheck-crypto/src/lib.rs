//! Cryptographic building blocks for sigcheck
//!
//! - [`signing`]: the closed set of supported signature schemes and ECDSA keys
//! - [`hash`]: digest algorithms
//! - [`x509`]: certificate field extraction and profile checks
//! - [`chain`]: path building from a leaf to a trusted root

pub mod chain;
pub mod error;
pub mod hash;
pub mod signing;
pub mod x509;

pub use chain::{build_path, verify_issued_by, ParsedCertificate, MAX_CHAIN_DEPTH};
pub use error::{Error, Result};
pub use hash::{sha256, HashAlgorithm};
pub use signing::{Curve, PublicKey, SigningScheme};
pub use x509::{
    extract_ec_curve_oid, extract_tbs_der, oidc_issuer, parse_certificate, parse_certificate_info,
    subject_alt_names, verify_code_signing_profile, CertificateInfo,
};
