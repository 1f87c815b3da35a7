//! Verification steps, in the order [`crate::Verifier`] runs them

pub mod hashedrekord;
pub mod helpers;
pub mod rekor;
pub mod tlog;
pub mod tsa;
