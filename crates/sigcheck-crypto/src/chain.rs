//! Certificate path building
//!
//! Builds a path from a leaf to any trusted root through a pool of allowed
//! intermediates. Every certificate on the path must be valid at the
//! verification time, and every issuer must be a CA whose key produced the
//! child's signature over its original TBS bytes.

use crate::error::{Error, Result};
use crate::signing::{Curve, PublicKey, SigningScheme};
use crate::x509::{
    extract_ec_curve_oid, extract_tbs_der, is_certificate_authority, parse_certificate, validity,
};
use x509_cert::Certificate;

/// Longest chain accepted, leaf and root included
pub const MAX_CHAIN_DEPTH: usize = 8;

/// A parsed certificate kept together with its original DER
#[derive(Debug, Clone)]
pub struct ParsedCertificate {
    der: Vec<u8>,
    cert: Certificate,
}

impl PartialEq for ParsedCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for ParsedCertificate {}

impl ParsedCertificate {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            der: der.to_vec(),
            cert: parse_certificate(der)?,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn certificate(&self) -> &Certificate {
        &self.cert
    }

    pub fn not_before(&self) -> i64 {
        validity(&self.cert).0
    }

    pub fn not_after(&self) -> i64 {
        validity(&self.cert).1
    }

    /// Inclusive on both bounds
    pub fn is_valid_at(&self, time: i64) -> bool {
        let (not_before, not_after) = validity(&self.cert);
        time >= not_before && time <= not_after
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_spki(&self.cert.tbs_certificate.subject_public_key_info)
    }

    pub fn subject(&self) -> String {
        self.cert.tbs_certificate.subject.to_string()
    }
}

/// Verify that `issuer` signed `child`
pub fn verify_issued_by(child: &ParsedCertificate, issuer: &ParsedCertificate) -> Result<()> {
    let child_cert = child.certificate();
    let issuer_cert = issuer.certificate();

    if child_cert.tbs_certificate.issuer != issuer_cert.tbs_certificate.subject {
        return Err(Error::Chain(format!(
            "issuer '{}' does not match subject '{}'",
            child_cert.tbs_certificate.issuer,
            issuer_cert.tbs_certificate.subject
        )));
    }

    let issuer_spki = &issuer_cert.tbs_certificate.subject_public_key_info;
    let curve = Curve::from_oid(&extract_ec_curve_oid(issuer_spki)?)?;
    let scheme =
        SigningScheme::from_curve_and_signature_oid(curve, &child_cert.signature_algorithm.oid)?;

    let signature = child_cert
        .signature
        .as_bytes()
        .ok_or_else(|| Error::Der("certificate signature is not octet aligned".to_string()))?;
    let tbs_der = extract_tbs_der(child.der())?;

    issuer.public_key()?.verify_with_scheme(&tbs_der, signature, scheme)
}

/// Build a path from `leaf` to one of `roots`, valid at `time`
///
/// Returns the path leaf first, root last. `intermediates` may contain
/// certificates unrelated to this leaf; only those that sign into a root are
/// used.
pub fn build_path(
    leaf: &ParsedCertificate,
    intermediates: &[ParsedCertificate],
    roots: &[ParsedCertificate],
    time: i64,
) -> Result<Vec<ParsedCertificate>> {
    if time < leaf.not_before() {
        return Err(Error::Chain(format!(
            "certificate not yet valid: validation time {} is before not_before {}",
            time,
            leaf.not_before()
        )));
    }
    if time > leaf.not_after() {
        return Err(Error::Chain(format!(
            "certificate has expired: validation time {} is after not_after {}",
            time,
            leaf.not_after()
        )));
    }
    if roots.is_empty() {
        return Err(Error::Chain("no trusted roots available".to_string()));
    }

    let mut path = vec![leaf];
    if extend_path(&mut path, intermediates, roots, time) {
        tracing::debug!(
            depth = path.len(),
            root = %path[path.len() - 1].subject(),
            "built certificate path"
        );
        return Ok(path.into_iter().cloned().collect());
    }

    Err(Error::Chain(
        "certificate does not chain to any trusted root".to_string(),
    ))
}

fn usable_issuer(child: &ParsedCertificate, candidate: &ParsedCertificate, time: i64) -> bool {
    if !candidate.is_valid_at(time) {
        return false;
    }
    if !matches!(is_certificate_authority(candidate.certificate()), Ok(true)) {
        return false;
    }
    match verify_issued_by(child, candidate) {
        Ok(()) => true,
        Err(e) => {
            tracing::trace!(
                candidate = %candidate.subject(),
                error = %e,
                "issuer candidate rejected"
            );
            false
        }
    }
}

fn extend_path<'a>(
    path: &mut Vec<&'a ParsedCertificate>,
    intermediates: &'a [ParsedCertificate],
    roots: &'a [ParsedCertificate],
    time: i64,
) -> bool {
    let current = path[path.len() - 1];

    if let Some(root) = roots.iter().find(|root| usable_issuer(current, root, time)) {
        path.push(root);
        return true;
    }

    if path.len() + 1 >= MAX_CHAIN_DEPTH {
        return false;
    }

    for candidate in intermediates {
        if path.iter().any(|c| *c == candidate) {
            continue;
        }
        if usable_issuer(current, candidate, time) {
            path.push(candidate);
            if extend_path(path, intermediates, roots, time) {
                return true;
            }
            path.pop();
        }
    }

    false
}
