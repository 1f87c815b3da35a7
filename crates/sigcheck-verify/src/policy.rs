//! Verification policy
//!
//! A [`VerificationPolicy`] is built once through [`PolicyBuilder`] and is
//! read-only afterwards. Disabling a check drops its threshold and lets
//! evidence nobody vouches for (an unknown log, an unknown timestamp
//! authority) through; evidence that is present and attributable is still
//! verified.

use crate::error::{Error, Result};
use sigcheck_types::BundleVersion;
use std::str::FromStr;

/// Default clock skew tolerance in seconds (60 seconds = 1 minute)
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 60;

/// An identity allowed to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedSigner {
    /// Subject alternative name (email or URI)
    pub san: String,
    /// OIDC issuer; any issuer when `None`
    pub issuer: Option<String>,
}

impl TrustedSigner {
    pub fn new(san: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            issuer: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub(crate) fn matches(&self, sans: &[String], issuer: Option<&str>) -> bool {
        sans.iter().any(|s| *s == self.san)
            && self.issuer.as_deref().map_or(true, |expected| issuer == Some(expected))
    }
}

/// What a bundle must prove to be accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    require_tlog: bool,
    online_tlog: bool,
    tlog_threshold: usize,
    require_tsa: bool,
    tsa_threshold: usize,
    require_ct_log: bool,
    ct_log_threshold: usize,
    expected_issuer: Option<String>,
    expected_san: Option<String>,
    trusted_signers: Option<Vec<TrustedSigner>>,
    min_bundle_version: Option<BundleVersion>,
    clock_skew_seconds: i64,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            require_tlog: true,
            online_tlog: false,
            tlog_threshold: 1,
            require_tsa: false,
            tsa_threshold: 1,
            require_ct_log: true,
            ct_log_threshold: 1,
            expected_issuer: None,
            expected_san: None,
            trusted_signers: None,
            min_bundle_version: None,
            clock_skew_seconds: DEFAULT_CLOCK_SKEW_SECONDS,
        }
    }
}

impl VerificationPolicy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    pub fn require_tlog(&self) -> bool {
        self.require_tlog
    }

    pub fn online_tlog(&self) -> bool {
        self.online_tlog
    }

    pub fn tlog_threshold(&self) -> usize {
        self.tlog_threshold
    }

    pub fn require_tsa(&self) -> bool {
        self.require_tsa
    }

    pub fn tsa_threshold(&self) -> usize {
        self.tsa_threshold
    }

    /// Requested but not enforced; see [`crate::Verifier::verify`]
    pub fn require_ct_log(&self) -> bool {
        self.require_ct_log
    }

    pub fn ct_log_threshold(&self) -> usize {
        self.ct_log_threshold
    }

    pub fn expected_issuer(&self) -> Option<&str> {
        self.expected_issuer.as_deref()
    }

    pub fn expected_san(&self) -> Option<&str> {
        self.expected_san.as_deref()
    }

    pub fn trusted_signers(&self) -> Option<&[TrustedSigner]> {
        self.trusted_signers.as_deref()
    }

    pub fn min_bundle_version(&self) -> Option<BundleVersion> {
        self.min_bundle_version
    }

    pub fn clock_skew_seconds(&self) -> i64 {
        self.clock_skew_seconds
    }
}

/// Builder for [`VerificationPolicy`], starting from the defaults
#[derive(Debug, Clone, Default)]
pub struct PolicyBuilder {
    policy: VerificationPolicy,
    min_bundle_version: Option<String>,
}

impl PolicyBuilder {
    pub fn require_transparency_log(mut self, required: bool) -> Self {
        self.policy.require_tlog = required;
        self
    }

    /// Fetch a current inclusion proof from the log for each entry
    pub fn online_transparency_log(mut self, online: bool) -> Self {
        self.policy.online_tlog = online;
        self
    }

    pub fn transparency_log_threshold(mut self, threshold: usize) -> Self {
        self.policy.tlog_threshold = threshold;
        self
    }

    pub fn require_timestamp_authority(mut self, required: bool) -> Self {
        self.policy.require_tsa = required;
        self
    }

    pub fn timestamp_threshold(mut self, threshold: usize) -> Self {
        self.policy.tsa_threshold = threshold;
        self
    }

    pub fn require_ct_log(mut self, required: bool) -> Self {
        self.policy.require_ct_log = required;
        self
    }

    pub fn ct_log_threshold(mut self, threshold: usize) -> Self {
        self.policy.ct_log_threshold = threshold;
        self
    }

    /// Require the signing certificate's OIDC issuer extension to equal `issuer`
    pub fn require_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.policy.expected_issuer = Some(issuer.into());
        self
    }

    /// Require the signing certificate to carry `san` as a subject alternative name
    pub fn require_identity(mut self, san: impl Into<String>) -> Self {
        self.policy.expected_san = Some(san.into());
        self
    }

    /// Add an accepted signer; once any is added, only listed signers verify
    pub fn trusted_signer(mut self, signer: TrustedSigner) -> Self {
        self.policy.trusted_signers.get_or_insert_with(Vec::new).push(signer);
        self
    }

    /// Reject bundles whose format version is below `version` (`major.minor`)
    pub fn min_bundle_version(mut self, version: impl Into<String>) -> Self {
        self.min_bundle_version = Some(version.into());
        self
    }

    pub fn clock_skew_seconds(mut self, seconds: i64) -> Self {
        self.policy.clock_skew_seconds = seconds;
        self
    }

    pub fn build(self) -> Result<VerificationPolicy> {
        let mut policy = self.policy;

        if let Some(version) = self.min_bundle_version {
            let parsed = BundleVersion::from_str(&version).map_err(|_| {
                Error::Policy(format!("invalid minimum bundle version {:?}", version))
            })?;
            policy.min_bundle_version = Some(parsed);
        }
        if policy.require_tlog && policy.tlog_threshold == 0 {
            return Err(Error::Policy("transparency log threshold must be at least 1".to_string()));
        }
        if policy.require_tsa && policy.tsa_threshold == 0 {
            return Err(Error::Policy("timestamp threshold must be at least 1".to_string()));
        }
        if policy.require_ct_log && policy.ct_log_threshold == 0 {
            return Err(Error::Policy("CT log threshold must be at least 1".to_string()));
        }
        if policy.online_tlog && !policy.require_tlog {
            return Err(Error::Policy(
                "online log verification requires the transparency log check".to_string(),
            ));
        }
        if policy.clock_skew_seconds < 0 {
            return Err(Error::Policy("clock skew must not be negative".to_string()));
        }

        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_verification_policy_default() {
        let policy = VerificationPolicy::default();
        assert!(policy.require_tlog());
        assert!(!policy.online_tlog());
        assert_eq!(policy.tlog_threshold(), 1);
        assert!(!policy.require_tsa());
        assert!(policy.require_ct_log());
        assert_eq!(policy.clock_skew_seconds(), DEFAULT_CLOCK_SKEW_SECONDS);
        assert_eq!(VerificationPolicy::builder().build().unwrap(), policy);
    }

    #[test]
    fn test_verification_policy_builder() {
        let policy = VerificationPolicy::builder()
            .require_identity("test@example.com")
            .require_issuer("https://accounts.example.com")
            .require_timestamp_authority(true)
            .timestamp_threshold(2)
            .min_bundle_version("v0.3")
            .build()
            .unwrap();

        assert_eq!(policy.expected_san(), Some("test@example.com"));
        assert_eq!(policy.expected_issuer(), Some("https://accounts.example.com"));
        assert!(policy.require_tsa());
        assert_eq!(policy.tsa_threshold(), 2);
        assert_eq!(policy.min_bundle_version(), Some(BundleVersion::new(0, 3)));
    }

    #[test]
    fn test_invalid_policies() {
        let cases = [
            VerificationPolicy::builder().transparency_log_threshold(0),
            VerificationPolicy::builder()
                .require_timestamp_authority(true)
                .timestamp_threshold(0),
            VerificationPolicy::builder().ct_log_threshold(0),
            VerificationPolicy::builder()
                .require_transparency_log(false)
                .online_transparency_log(true),
            VerificationPolicy::builder().min_bundle_version("latest"),
            VerificationPolicy::builder().clock_skew_seconds(-1),
        ];
        for builder in cases {
            assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::Policy);
        }
    }

    #[test]
    fn test_thresholds_of_disabled_checks_are_free() {
        let policy = VerificationPolicy::builder()
            .require_transparency_log(false)
            .transparency_log_threshold(0)
            .require_ct_log(false)
            .ct_log_threshold(0)
            .build()
            .unwrap();
        assert!(!policy.require_tlog());
    }

    #[test]
    fn test_trusted_signers() {
        let policy = VerificationPolicy::builder()
            .trusted_signer(TrustedSigner::new("a@example.com"))
            .trusted_signer(TrustedSigner::new("b@example.com").with_issuer("https://issuer"))
            .build()
            .unwrap();
        let signers = policy.trusted_signers().unwrap();
        assert_eq!(signers.len(), 2);

        let sans = vec!["b@example.com".to_string()];
        assert!(!signers[0].matches(&sans, Some("https://issuer")));
        assert!(signers[1].matches(&sans, Some("https://issuer")));
        assert!(!signers[1].matches(&sans, Some("https://other")));
        assert!(!signers[1].matches(&sans, None));
    }
}
