//! High-level verification API

use crate::error::{Error, Result};
use crate::policy::VerificationPolicy;
use crate::verify_impl::helpers::{self, TimeSource};
use crate::verify_impl::tlog::{verify_tlog_entries, TlogContext};
use crate::verify_impl::tsa::verify_timestamps;
use sigcheck_rekor::LogProofSource;
use sigcheck_trust_root::TrustedRoot;
use sigcheck_types::{Artifact, Bundle, BundleExt, TransparencyLogEntryExt};

/// What a successful verification established
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// First subject alternative name of the signing certificate
    pub identity: Option<String>,
    /// OIDC issuer of the signing certificate
    pub issuer: Option<String>,
    /// Time the certificate was checked at, in Unix seconds
    pub signing_time: i64,
    pub tlog_entries_verified: usize,
    pub timestamps_verified: usize,
    /// Policy knobs that were requested but not enforced
    pub warnings: Vec<String>,
}

/// Verifies bundles against one trusted root and policy
///
/// Holds no mutable state; one verifier may check any number of bundles.
pub struct Verifier<'a> {
    trusted_root: &'a TrustedRoot,
    policy: VerificationPolicy,
    log_source: Option<&'a dyn LogProofSource>,
}

impl<'a> Verifier<'a> {
    pub fn new(trusted_root: &'a TrustedRoot, policy: VerificationPolicy) -> Self {
        Self {
            trusted_root,
            policy,
            log_source: None,
        }
    }

    /// Log access for policies with online log verification
    pub fn with_log_source(mut self, source: &'a dyn LogProofSource) -> Self {
        self.log_source = Some(source);
        self
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Verify a bundle on its own: its signature over the digest it carries
    ///
    /// Checks run in order and the first failure is returned:
    ///
    /// 0. The bundle format version meets the policy minimum.
    /// 1. Establish a signing time from the log entries or timestamps.
    /// 2. The signing certificate chains to a trusted certificate authority
    ///    at that time and has the code-signing profile.
    /// 3. The certificate's identity satisfies the policy.
    /// 4. The signature verifies with the certificate's key.
    /// 5. Transparency log entries verify and meet the threshold.
    /// 6. Timestamps verify and meet the threshold.
    /// 7. CT log evidence is not checked; requesting it adds a warning.
    ///
    /// Disabling steps 5 or 6 lifts their threshold, but evidence they can
    /// attribute is still verified.
    pub fn verify(&self, bundle: &Bundle) -> Result<VerificationResult> {
        self.verify_inner(bundle, None)
    }

    /// Verify a bundle and bind it to `artifact`
    ///
    /// The artifact can be provided as raw bytes or as a pre-computed SHA-256 digest.
    pub fn verify_artifact<'b>(
        &self,
        bundle: &Bundle,
        artifact: impl Into<Artifact<'b>>,
    ) -> Result<VerificationResult> {
        let artifact = artifact.into();
        self.verify_inner(bundle, Some(&artifact))
    }

    fn verify_inner(
        &self,
        bundle: &Bundle,
        artifact: Option<&Artifact<'_>>,
    ) -> Result<VerificationResult> {
        // (0): cheap structural checks come before any cryptography
        let version = bundle.version()?;
        if let Some(minimum) = self.policy.min_bundle_version() {
            if version < minimum {
                return Err(Error::BundleVersion {
                    minimum: minimum.to_string(),
                    actual: version.to_string(),
                });
            }
        }
        if self.policy.online_tlog() && self.log_source.is_none() {
            return Err(Error::Policy(
                "online log verification requires a log source".to_string(),
            ));
        }

        let leaf = helpers::signing_certificate(bundle)?;

        // (1)
        let signing_time = helpers::establish_signing_time(bundle, self.trusted_root);
        tracing::debug!(
            time = signing_time.time,
            source = ?signing_time.source,
            "signing time"
        );

        // (2)
        let path = helpers::verify_certificate_chain(&leaf, self.trusted_root, signing_time.time)?;
        tracing::debug!(depth = path.len(), "certificate chain verified");

        // (3)
        let identity = helpers::verify_identity(&leaf, &self.policy)?;
        tracing::debug!(
            sans = ?identity.sans,
            issuer = ?identity.issuer,
            "identity accepted"
        );

        // (4)
        let message_digest = helpers::verify_signature(bundle, &leaf, artifact)?;
        tracing::debug!("signature verified");

        // (5)
        let entries = verify_tlog_entries(&TlogContext {
            bundle,
            trusted_root: self.trusted_root,
            policy: &self.policy,
            leaf: &leaf,
            signing_time: signing_time.time,
            message_digest: message_digest.as_deref(),
            log_source: self.log_source,
        })?;

        // (6)
        let timestamps = verify_timestamps(bundle, self.trusted_root, &self.policy, &leaf)?;

        // the evidence that dated the certificate must itself have verified
        match signing_time.source {
            TimeSource::LogEntry(index) if !entries.contains(&index) => {
                return Err(Error::UnknownLog {
                    log_id: bundle.tlog_entries()[index].log_id_hex(),
                });
            }
            TimeSource::Timestamp(index) if !timestamps.contains(&index) => {
                return Err(Error::InvalidTimestamp(format!(
                    "timestamp {} supplied the signing time but did not verify",
                    index
                )));
            }
            _ => {}
        }

        // (7)
        let mut warnings = Vec::new();
        if self.policy.require_ct_log() {
            let warning =
                "CT log verification is not implemented; the CT log requirement was ignored"
                    .to_string();
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        tracing::info!(
            identity = identity.sans.first().map(String::as_str).unwrap_or(""),
            tlog_entries_verified = entries.len(),
            timestamps_verified = timestamps.len(),
            "bundle verified"
        );
        Ok(VerificationResult {
            identity: identity.sans.first().cloned(),
            issuer: identity.issuer,
            signing_time: signing_time.time,
            tlog_entries_verified: entries.len(),
            timestamps_verified: timestamps.len(),
            warnings,
        })
    }
}

/// Convenience function to verify a bundle with a throwaway [`Verifier`]
pub fn verify(
    trusted_root: &TrustedRoot,
    policy: &VerificationPolicy,
    bundle: &Bundle,
) -> Result<VerificationResult> {
    Verifier::new(trusted_root, policy.clone()).verify(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const TRUSTED_ROOT: &str = include_str!("../../../testdata/trusted_root.json");
    const BUNDLE: &str = include_str!("../../../testdata/bundle_v03.json");
    const BUNDLE_V01: &str = include_str!("../../../testdata/bundle_v01.json");

    fn root() -> TrustedRoot {
        TrustedRoot::from_json(TRUSTED_ROOT).unwrap()
    }

    #[test]
    fn test_verify_reports_identity() {
        let root = root();
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        let result = verify(&root, &VerificationPolicy::default(), &bundle).unwrap();
        assert_eq!(result.identity.as_deref(), Some("signer@example.com"));
        assert_eq!(result.issuer.as_deref(), Some("https://accounts.example.com"));
        assert_eq!(result.signing_time, 1_709_294_700);
        assert_eq!(result.tlog_entries_verified, 1);
        assert_eq!(result.timestamps_verified, 0);
    }

    #[test]
    fn test_ct_requirement_is_a_warning() {
        let root = root();
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        let result = verify(&root, &VerificationPolicy::default(), &bundle).unwrap();
        assert_eq!(result.warnings.len(), 1);

        let policy = VerificationPolicy::builder().require_ct_log(false).build().unwrap();
        assert!(verify(&root, &policy, &bundle).unwrap().warnings.is_empty());
    }

    #[test]
    fn test_version_gate_runs_first() {
        let root = root();
        let mut bundle = Bundle::from_json(BUNDLE_V01).unwrap();
        // would fail every later check
        bundle.verification_material.as_mut().unwrap().tlog_entries.clear();

        let policy = VerificationPolicy::builder()
            .min_bundle_version("0.3")
            .build()
            .unwrap();
        let err = verify(&root, &policy, &bundle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BundleVersion);
        assert_eq!(err.to_string(), "bundle version 0.1 is below the required minimum 0.3");
    }

    #[test]
    fn test_online_without_source_is_policy_error() {
        let root = root();
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        let policy = VerificationPolicy::builder()
            .online_transparency_log(true)
            .build()
            .unwrap();
        let err = Verifier::new(&root, policy).verify(&bundle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Policy);
    }
}
