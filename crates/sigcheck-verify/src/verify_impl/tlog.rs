//! Transparency log verification
//!
//! Every entry in the bundle is evaluated. Entries from logs the trusted
//! root does not know fail the run when the check is required and are
//! skipped otherwise; entries from known logs must verify either way.

use crate::error::{Error, Result};
use crate::policy::VerificationPolicy;
use crate::verify_impl::rekor::verify_entry_body;
use sigcheck_crypto::ParsedCertificate;
use sigcheck_rekor::{verify_fetched_entry, verify_inclusion_proof, verify_set, LogProofSource};
use sigcheck_trust_root::{TransparencyLogVerifier, TrustedRoot};
use sigcheck_types::{Bundle, BundleExt, TransparencyLogEntry, TransparencyLogEntryExt};

/// Inputs shared by every entry check
pub struct TlogContext<'a> {
    pub bundle: &'a Bundle,
    pub trusted_root: &'a TrustedRoot,
    pub policy: &'a VerificationPolicy,
    pub leaf: &'a ParsedCertificate,
    pub signing_time: i64,
    pub message_digest: Option<&'a [u8]>,
    pub log_source: Option<&'a dyn LogProofSource>,
}

/// Indices of the bundle's log entries that verified
pub fn verify_tlog_entries(ctx: &TlogContext<'_>) -> Result<Vec<usize>> {
    let mut verified = Vec::new();

    for (index, entry) in ctx.bundle.tlog_entries().iter().enumerate() {
        let log_id = entry.log_id_hex();
        let Some(verifier) = ctx.trusted_root.tlog_verifier(&log_id) else {
            if ctx.policy.require_tlog() {
                return Err(Error::UnknownLog { log_id });
            }
            tracing::debug!(index, %log_id, "skipping entry from unknown log");
            continue;
        };

        verify_entry(ctx, entry, verifier)?;
        tracing::debug!(index, %log_id, log_index = entry.log_index, "log entry verified");
        verified.push(index);
    }

    if ctx.policy.require_tlog() && verified.len() < ctx.policy.tlog_threshold() {
        return Err(Error::TlogThreshold {
            required: ctx.policy.tlog_threshold(),
            verified: verified.len(),
        });
    }
    Ok(verified)
}

fn verify_entry(
    ctx: &TlogContext<'_>,
    entry: &TransparencyLogEntry,
    verifier: &TransparencyLogVerifier,
) -> Result<()> {
    let time = if entry.integrated_time > 0 {
        entry.integrated_time
    } else {
        ctx.signing_time
    };
    if !verifier.valid_for().contains(time) {
        return Err(Error::InvalidLogEntry(format!(
            "key of log {} is not valid at {}",
            verifier.log_id_hex(),
            time
        )));
    }

    if entry.inclusion_promise.is_none() && entry.inclusion_proof.is_none() {
        return Err(Error::InvalidLogEntry(
            "entry carries neither an inclusion promise nor an inclusion proof".to_string(),
        ));
    }
    if entry.inclusion_promise.is_some() {
        verify_set(entry, verifier)?;
    }
    if entry.inclusion_proof.is_some() {
        verify_inclusion_proof(entry, verifier)?;
    }

    if entry.integrated_time > 0 {
        let skew = ctx.policy.clock_skew_seconds();
        validate_integrated_time(entry.integrated_time, ctx.leaf, skew)?;
    }

    verify_entry_body(entry, ctx.bundle, ctx.message_digest, ctx.leaf)?;

    if ctx.policy.online_tlog() {
        let source = ctx.log_source.ok_or_else(|| {
            Error::Policy("online log verification requires a log source".to_string())
        })?;
        let fetched = source.fetch_entry(verifier.base_url(), entry.log_index)?;
        verify_fetched_entry(entry, &fetched, verifier)?;
    }

    Ok(())
}

/// The log must have integrated the entry while the certificate was valid
/// and not in the future
fn validate_integrated_time(
    time: i64,
    leaf: &ParsedCertificate,
    clock_skew_seconds: i64,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    if time > now + clock_skew_seconds {
        return Err(Error::InvalidLogEntry(format!(
            "integrated time {} is in the future (current time: {}, tolerance: {}s)",
            time, now, clock_skew_seconds
        )));
    }
    if time < leaf.not_before() {
        return Err(Error::InvalidLogEntry(format!(
            "integrated time {} is before certificate validity (not_before: {})",
            time,
            leaf.not_before()
        )));
    }
    if time > leaf.not_after() {
        return Err(Error::InvalidLogEntry(format!(
            "integrated time {} is after certificate validity (not_after: {})",
            time,
            leaf.not_after()
        )));
    }
    Ok(())
}
