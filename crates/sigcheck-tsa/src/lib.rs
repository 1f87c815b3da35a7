//! RFC 3161 timestamp verification for sigcheck
//!
//! Tokens are decoded with `cms` and `x509-tsp`. [`verify_timestamp_response`]
//! checks one token against one authority's trust material, and
//! [`parse_timestamp`] reads the claimed time without verifying anything.

pub mod error;
mod token;
mod verify;

pub use error::{Error, Result};
pub use token::parse_timestamp;
pub use verify::{verify_timestamp_response, TimestampResult, VerifyOpts};
