//! Timestamp authority verification
//!
//! A token is attributed to the first trusted authority whose validity
//! window covers its genTime and to which its signer chains. Tokens no
//! authority claims fail the run when timestamps are required and are
//! skipped otherwise.

use crate::error::{Error, Result};
use crate::policy::VerificationPolicy;
use sigcheck_crypto::ParsedCertificate;
use sigcheck_trust_root::{CaChain, TrustedRoot};
use sigcheck_tsa::{verify_timestamp_response, TimestampResult, VerifyOpts};
use sigcheck_types::{Bundle, BundleExt};

/// Indices of the bundle's timestamps that verified
pub fn verify_timestamps(
    bundle: &Bundle,
    trusted_root: &TrustedRoot,
    policy: &VerificationPolicy,
    leaf: &ParsedCertificate,
) -> Result<Vec<usize>> {
    let mut verified = Vec::new();

    if !bundle.timestamps().is_empty() {
        let signature = bundle.signature_bytes().ok_or_else(|| {
            Error::MalformedInput("bundle has no signature to timestamp".to_string())
        })?;

        for (index, ts) in bundle.timestamps().iter().enumerate() {
            let Some(result) = attribute(&ts.signed_timestamp, signature, trusted_root)? else {
                if policy.require_tsa() {
                    return Err(Error::InvalidTimestamp(format!(
                        "timestamp {} does not chain to any trusted timestamp authority",
                        index
                    )));
                }
                tracing::debug!(index, "skipping timestamp from unknown authority");
                continue;
            };

            let time = result.time.timestamp();
            if !leaf.is_valid_at(time) {
                return Err(Error::InvalidTimestamp(format!(
                    "timestamp {} is outside the signing certificate's validity",
                    time
                )));
            }
            tracing::debug!(index, time, signer = %result.signer, "timestamp verified");
            verified.push(index);
        }
    }

    if policy.require_tsa() && verified.len() < policy.tsa_threshold() {
        return Err(Error::TsaThreshold {
            required: policy.tsa_threshold(),
            verified: verified.len(),
        });
    }
    Ok(verified)
}

/// Verify `token` against the first authority that claims it
fn attribute(
    token: &[u8],
    signature: &[u8],
    trusted_root: &TrustedRoot,
) -> Result<Option<TimestampResult>> {
    for authority in trusted_root.timestamp_authorities() {
        match verify_timestamp_response(token, signature, authority_opts(authority)) {
            Ok(result) => return Ok(Some(result)),
            Err(sigcheck_tsa::Error::UntrustedSigner(reason)) => {
                tracing::trace!(
                    authority = %authority.uri,
                    %reason,
                    "timestamp not from authority"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

fn authority_opts(authority: &CaChain) -> VerifyOpts {
    VerifyOpts::new()
        .with_roots(vec![authority.root.clone()])
        .with_intermediates(authority.intermediates.clone())
        .with_tsa_certificate(authority.leaf.clone())
        .with_tsa_validity(authority.valid_for.start, authority.valid_for.end)
}
