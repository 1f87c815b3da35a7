//! Transparency log evidence for sigcheck
//!
//! - [`set`]: signed entry timestamps
//! - [`checkpoint`]: signed-note tree heads
//! - [`merkle`]: RFC 6962 hashing and inclusion proofs
//! - [`proof`]: inclusion proofs checked against a signed checkpoint
//! - [`body`]: canonicalized entry bodies
//! - [`client`]: the [`LogProofSource`] seam and a blocking Rekor client

pub mod body;
pub mod checkpoint;
pub mod client;
pub mod entry;
pub mod error;
pub mod merkle;
pub mod proof;
pub mod set;

pub use body::{EntryBody, Verifier};
pub use checkpoint::{Checkpoint, CheckpointSignature};
pub use client::{LogProofSource, RekorClient, RekorClientConfig};
pub use entry::{LogEntry, LogEntryResponse};
pub use error::{Error, Result};
pub use proof::{verify_fetched_entry, verify_inclusion_proof};
pub use set::verify_set;
