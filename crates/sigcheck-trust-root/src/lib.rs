//! Trusted root parsing and distribution for sigcheck
//!
//! The trusted root holds every trust anchor verification needs:
//! - certificate authorities that issue signing certificates
//! - transparency log keys, indexed by hex log ID
//! - timestamp authority certificate chains
//!
//! Parsing is all-or-nothing. Unsupported media types, hash algorithms or
//! key types, malformed certificates, and duplicate log IDs all reject the
//! document.
//!
//! # Features
//!
//! - `tuf` (default): [`TufSource`], fetching the trusted root from a TUF
//!   repository with a local cache and an offline mode.
//!
//! # Example
//!
//! ```no_run
//! use sigcheck_trust_root::{FileSource, TrustedRoot};
//!
//! # fn example() -> Result<(), sigcheck_trust_root::Error> {
//! let root = TrustedRoot::from_source(&FileSource::new("trusted_root.json"))?;
//! for log in root.tlog_verifiers() {
//!     println!("{} {}", log.log_id_hex(), log.base_url());
//! }
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod error;
pub mod source;
pub mod trusted_root;

#[cfg(feature = "tuf")]
pub mod tuf;

pub use document::{TrustedRootDocument, TRUSTED_ROOT_MEDIA_TYPE};
pub use error::{Error, Result};
pub use source::{BytesSource, FileSource, TrustRootSource};
pub use trusted_root::{
    Anchors, CaChain, CtLog, KeyDetails, LogKey, TransparencyLogVerifier, TrustedRoot,
    ValidityPeriod, SIGSTORE_PRODUCTION_TRUSTED_ROOT,
};

#[cfg(feature = "tuf")]
pub use tuf::{TufConfig, TufSource, TRUSTED_ROOT_TARGET};
