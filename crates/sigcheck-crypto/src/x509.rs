//! X.509 certificate helpers
//!
//! Extraction of the pieces verification needs from a certificate: the raw
//! TBS bytes, the EC curve of a key, validity bounds, subject alternative
//! names, the Fulcio OIDC issuer extensions, and key-usage profile checks.

use crate::error::{Error, Result};
use const_oid::db::rfc5280::{
    ID_CE_BASIC_CONSTRAINTS, ID_CE_EXT_KEY_USAGE, ID_CE_KEY_USAGE, ID_CE_SUBJECT_ALT_NAME,
};
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, ID_KP_CODE_SIGNING};
use const_oid::ObjectIdentifier;
use der::{Decode, Encode, Reader, SliceReader};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages, SubjectAltName,
};
use x509_cert::Certificate;

/// Fulcio OIDC issuer extension, raw string value (deprecated form)
pub const OID_FULCIO_ISSUER_V1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.1");

/// Fulcio OIDC issuer extension, DER UTF8String value
pub const OID_FULCIO_ISSUER_V2: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.57264.1.8");

/// Summary of the leaf certificate fields verification reports on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    /// Unix seconds
    pub not_before: i64,
    /// Unix seconds
    pub not_after: i64,
    pub subject_alt_names: Vec<String>,
    pub oidc_issuer: Option<String>,
}

pub fn parse_certificate(cert_der: &[u8]) -> Result<Certificate> {
    Certificate::from_der(cert_der)
        .map_err(|e| Error::Der(format!("failed to parse certificate: {}", e)))
}

pub fn parse_certificate_info(cert_der: &[u8]) -> Result<CertificateInfo> {
    let cert = parse_certificate(cert_der)?;
    let (not_before, not_after) = validity(&cert);
    Ok(CertificateInfo {
        not_before,
        not_after,
        subject_alt_names: subject_alt_names(&cert)?,
        oidc_issuer: oidc_issuer(&cert)?,
    })
}

/// `(not_before, not_after)` in Unix seconds
pub fn validity(cert: &Certificate) -> (i64, i64) {
    let v = &cert.tbs_certificate.validity;
    (
        v.not_before.to_unix_duration().as_secs() as i64,
        v.not_after.to_unix_duration().as_secs() as i64,
    )
}

/// Extract the EC curve OID from a SubjectPublicKeyInfo
///
/// For EC keys the algorithm parameters hold the named curve.
pub fn extract_ec_curve_oid(spki: &SubjectPublicKeyInfoOwned) -> Result<ObjectIdentifier> {
    if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(Error::UnsupportedAlgorithm(format!(
            "public key algorithm {} is not id-ecPublicKey",
            spki.algorithm.oid
        )));
    }

    let Some(params) = &spki.algorithm.parameters else {
        return Err(Error::InvalidKey("EC public key missing curve parameters".to_string()));
    };

    // value() is the OID content octets, without tag and length
    ObjectIdentifier::from_bytes(params.value())
        .map_err(|e| Error::InvalidKey(format!("failed to parse EC curve OID: {}", e)))
}

/// Extract the original TBSCertificate DER bytes
///
/// The signature covers these exact bytes, so they are sliced out of the
/// input rather than re-encoded.
pub fn extract_tbs_der(cert_der: &[u8]) -> Result<Vec<u8>> {
    let mut reader = SliceReader::new(cert_der)?;
    let outer_header = der::Header::decode(&mut reader)?;
    let cert_contents = reader.read_slice(outer_header.length)?;

    let mut tbs_reader = SliceReader::new(cert_contents)?;
    let tbs_header = der::Header::decode(&mut tbs_reader)?;

    let header_len: usize = tbs_header
        .encoded_len()?
        .try_into()
        .map_err(|_| Error::Der("TBS header length too large".to_string()))?;
    let body_len: usize = tbs_header
        .length
        .try_into()
        .map_err(|_| Error::Der("TBS body length too large".to_string()))?;
    let tbs_total_len = header_len
        .checked_add(body_len)
        .ok_or_else(|| Error::Der("TBS length calculation overflow".to_string()))?;

    if tbs_total_len > cert_contents.len() {
        return Err(Error::Der("TBS length exceeds certificate contents".to_string()));
    }

    Ok(cert_contents[..tbs_total_len].to_vec())
}

fn find_extension<'a>(
    cert: &'a Certificate,
    oid: &ObjectIdentifier,
) -> Option<&'a x509_cert::ext::Extension> {
    cert.tbs_certificate
        .extensions
        .as_ref()
        .and_then(|exts| exts.iter().find(|ext| ext.extn_id == *oid))
}

/// Subject alternative names as strings: emails, URIs and DNS names
pub fn subject_alt_names(cert: &Certificate) -> Result<Vec<String>> {
    let Some(ext) = find_extension(cert, &ID_CE_SUBJECT_ALT_NAME) else {
        return Ok(Vec::new());
    };
    let san = SubjectAltName::from_der(ext.extn_value.as_bytes()).map_err(|e| {
        Error::Certificate(format!("failed to parse SubjectAltName extension: {}", e))
    })?;

    Ok(san
        .0
        .iter()
        .filter_map(|name| match name {
            GeneralName::Rfc822Name(email) => Some(email.to_string()),
            GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
            GeneralName::DnsName(dns) => Some(dns.to_string()),
            _ => None,
        })
        .collect())
}

/// The OIDC issuer recorded by Fulcio, preferring the DER-encoded extension
pub fn oidc_issuer(cert: &Certificate) -> Result<Option<String>> {
    if let Some(ext) = find_extension(cert, &OID_FULCIO_ISSUER_V2) {
        let issuer = String::from_der(ext.extn_value.as_bytes()).map_err(|e| {
            Error::Certificate(format!("failed to parse OIDC issuer extension: {}", e))
        })?;
        return Ok(Some(issuer));
    }
    if let Some(ext) = find_extension(cert, &OID_FULCIO_ISSUER_V1) {
        let issuer = std::str::from_utf8(ext.extn_value.as_bytes())
            .map_err(|e| Error::Certificate(format!("OIDC issuer extension is not UTF-8: {}", e)))?;
        return Ok(Some(issuer.to_string()));
    }
    Ok(None)
}

pub fn key_usage(cert: &Certificate) -> Result<Option<KeyUsage>> {
    find_extension(cert, &ID_CE_KEY_USAGE)
        .map(|ext| {
            KeyUsage::from_der(ext.extn_value.as_bytes()).map_err(|e| {
                Error::Certificate(format!("failed to parse KeyUsage extension: {}", e))
            })
        })
        .transpose()
}

pub fn extended_key_usage(cert: &Certificate) -> Result<Option<ExtendedKeyUsage>> {
    find_extension(cert, &ID_CE_EXT_KEY_USAGE)
        .map(|ext| {
            ExtendedKeyUsage::from_der(ext.extn_value.as_bytes()).map_err(|e| {
                Error::Certificate(format!("failed to parse ExtendedKeyUsage extension: {}", e))
            })
        })
        .transpose()
}

/// Whether the certificate may issue other certificates
///
/// Requires BasicConstraints `cA` and, when KeyUsage is present, keyCertSign.
pub fn is_certificate_authority(cert: &Certificate) -> Result<bool> {
    let ca = match find_extension(cert, &ID_CE_BASIC_CONSTRAINTS) {
        Some(ext) => {
            BasicConstraints::from_der(ext.extn_value.as_bytes())
                .map_err(|e| {
                    Error::Certificate(format!(
                        "failed to parse BasicConstraints extension: {}",
                        e
                    ))
                })?
                .ca
        }
        None => false,
    };
    if !ca {
        return Ok(false);
    }
    Ok(match key_usage(cert)? {
        Some(ku) => ku.0.contains(KeyUsages::KeyCertSign),
        None => true,
    })
}

/// Check the certificate conforms to the code-signing leaf profile
///
/// - KeyUsage contains digitalSignature
/// - ExtendedKeyUsage contains codeSigning
pub fn verify_code_signing_profile(cert: &Certificate) -> Result<()> {
    let key_usage = key_usage(cert)?.ok_or_else(|| {
        Error::Certificate("certificate is missing KeyUsage extension".to_string())
    })?;
    if !key_usage.0.contains(KeyUsages::DigitalSignature) {
        return Err(Error::Certificate(
            "KeyUsage extension does not contain digitalSignature".to_string(),
        ));
    }

    let eku = extended_key_usage(cert)?.ok_or_else(|| {
        Error::Certificate("certificate is missing ExtendedKeyUsage extension".to_string())
    })?;
    if !eku.0.contains(&ID_KP_CODE_SIGNING) {
        return Err(Error::Certificate(
            "ExtendedKeyUsage extension does not contain codeSigning".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    const LEAF_PEM: &str = include_str!("../../../testdata/leaf.pem");

    fn leaf_der() -> Vec<u8> {
        let body: String = LEAF_PEM.lines().filter(|l| !l.starts_with("-----")).collect();
        base64::engine::general_purpose::STANDARD.decode(body).unwrap()
    }

    #[test]
    fn test_leaf_certificate_info() {
        let info = parse_certificate_info(&leaf_der()).unwrap();
        assert_eq!(info.subject_alt_names, vec!["signer@example.com".to_string()]);
        assert_eq!(info.oidc_issuer.as_deref(), Some("https://accounts.example.com"));
        // 2024-03-01T12:00:00Z .. 12:10:00Z
        assert_eq!(info.not_before, 1_709_294_400);
        assert_eq!(info.not_after, 1_709_295_000);
    }

    #[test]
    fn test_leaf_profile() {
        let cert = parse_certificate(&leaf_der()).unwrap();
        verify_code_signing_profile(&cert).unwrap();
        assert!(!is_certificate_authority(&cert).unwrap());
    }

    #[test]
    fn test_extract_tbs_der_is_prefix_of_certificate() {
        let der = leaf_der();
        let tbs = extract_tbs_der(&der).unwrap();
        let cert = parse_certificate(&der).unwrap();
        assert_eq!(tbs, cert.tbs_certificate.to_der().unwrap());
        // outer header is 4 bytes for a certificate of this size
        assert_eq!(&der[4..4 + tbs.len()], tbs.as_slice());
    }

    #[test]
    fn test_truncated_certificate_rejected() {
        let der = leaf_der();
        assert!(extract_tbs_der(&der[..20]).is_err());
        assert!(parse_certificate(&der[..der.len() - 1]).is_err());
    }
}
