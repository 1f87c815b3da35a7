//! Bundle verification for sigcheck
//!
//! [`Verifier`] checks a bundle against a [`TrustedRoot`](trust_root::TrustedRoot)
//! under a [`VerificationPolicy`]. The verdict is binary: a
//! [`VerificationResult`] or the first failing check's [`Error`], whose
//! [`ErrorKind`] says which check failed.
//!
//! # Example
//!
//! ```no_run
//! use sigcheck_verify::{Verifier, VerificationPolicy};
//! use sigcheck_verify::trust_root::{FileSource, TrustedRoot};
//! use sigcheck_verify::types::{Bundle, BundleExt};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let trusted_root = TrustedRoot::from_source(&FileSource::new("trusted_root.json"))?;
//! let bundle = Bundle::from_json(&std::fs::read_to_string("artifact.sigstore.json")?)?;
//! let artifact = std::fs::read("artifact.txt")?;
//!
//! let policy = VerificationPolicy::builder()
//!     .require_identity("user@example.com")
//!     .require_issuer("https://accounts.example.com")
//!     .build()?;
//!
//! let result = Verifier::new(&trusted_root, policy).verify_artifact(&bundle, &artifact)?;
//! println!("signed by {:?}", result.identity);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod policy;
mod verify;

// Private submodules for verification logic
mod verify_impl;

pub use sigcheck_crypto as crypto;
pub use sigcheck_rekor as rekor;
pub use sigcheck_trust_root as trust_root;
pub use sigcheck_tsa as tsa;
pub use sigcheck_types as types;

pub use error::{Error, ErrorKind, Result};
pub use policy::{PolicyBuilder, TrustedSigner, VerificationPolicy, DEFAULT_CLOCK_SKEW_SECONDS};
pub use verify::{verify, VerificationResult, Verifier};
