//! Timestamp token verification
//!
//! A token is attributed to an authority when its genTime falls inside the
//! authority's validity window and its signer certificate chains to one of
//! the supplied roots. Only once attributed are the imprint, the signed
//! attributes and the signature checked, so callers can tell "not from this
//! authority" ([`Error::UntrustedSigner`]) from "forged or wrong" (every
//! other error).

use crate::error::{Error, Result};
use crate::token::{TimestampToken, ID_CT_TST_INFO};
use chrono::{DateTime, Utc};
use cms::cert::CertificateChoices;
use cms::signed_data::{SignerIdentifier, SignerInfo};
use const_oid::db::rfc5912::{ID_CE_SUBJECT_KEY_IDENTIFIER, ID_KP_TIME_STAMPING};
use const_oid::ObjectIdentifier;
use der::asn1::OctetString;
use der::{Decode, Encode};
use sigcheck_crypto::{build_path, HashAlgorithm, ParsedCertificate};
use x509_cert::ext::pkix::SubjectKeyIdentifier;

const ID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
const ID_MESSAGE_DIGEST: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// Trust material for one timestamping authority
#[derive(Debug, Clone, Default)]
pub struct VerifyOpts {
    roots: Vec<ParsedCertificate>,
    intermediates: Vec<ParsedCertificate>,
    tsa_certificate: Option<ParsedCertificate>,
    validity: Option<(Option<i64>, Option<i64>)>,
}

impl VerifyOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roots(mut self, roots: Vec<ParsedCertificate>) -> Self {
        self.roots = roots;
        self
    }

    pub fn with_intermediates(mut self, intermediates: Vec<ParsedCertificate>) -> Self {
        self.intermediates = intermediates;
        self
    }

    /// Signer certificate to use when the token does not embed one
    pub fn with_tsa_certificate(mut self, cert: ParsedCertificate) -> Self {
        self.tsa_certificate = Some(cert);
        self
    }

    /// Window, in epoch seconds, in which the authority's timestamps are accepted
    ///
    /// A genTime outside the window means the token is not attributed to
    /// this authority.
    pub fn with_tsa_validity(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.validity = Some((start, end));
        self
    }
}

/// A verified timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampResult {
    pub time: DateTime<Utc>,
    /// Subject of the certificate that signed the token
    pub signer: String,
}

/// Verify that `bytes` is a valid timestamp over `signature_bytes` issued by
/// the authority described by `opts`
pub fn verify_timestamp_response(
    bytes: &[u8],
    signature_bytes: &[u8],
    opts: VerifyOpts,
) -> Result<TimestampResult> {
    let token = TimestampToken::from_der(bytes)?;
    let gen_time = token.gen_time();

    let signer_info = token
        .signed_data
        .signer_infos
        .0
        .iter()
        .next()
        .ok_or_else(|| Error::Malformed("token has no signer".to_string()))?;

    check_authority_window(gen_time, opts.validity)?;
    let signer = signer_certificate(&token, signer_info, opts.tsa_certificate.as_ref())?;
    build_path(&signer, &opts.intermediates, &opts.roots, gen_time)
        .map_err(|e| Error::UntrustedSigner(e.to_string()))?;

    check_signer_validity(&signer, gen_time)?;
    check_time_stamping_usage(&signer)?;
    check_imprint(&token, signature_bytes)?;
    check_signed_attributes(&token, signer_info)?;
    check_signature(&signer, signer_info)?;

    let time = DateTime::<Utc>::from_timestamp(gen_time, 0)
        .ok_or_else(|| Error::Malformed(format!("genTime {} out of range", gen_time)))?;
    tracing::debug!(%time, signer = %signer.subject(), "timestamp verified");
    Ok(TimestampResult {
        time,
        signer: signer.subject(),
    })
}

fn signer_certificate(
    token: &TimestampToken,
    signer_info: &SignerInfo,
    fallback: Option<&ParsedCertificate>,
) -> Result<ParsedCertificate> {
    if let Some(certs) = &token.signed_data.certificates {
        for choice in certs.0.iter() {
            if let CertificateChoices::Certificate(cert) = choice {
                let parsed = ParsedCertificate::from_der(&cert.to_der()?)
                    .map_err(|e| Error::Malformed(format!("embedded certificate: {}", e)))?;
                if identifies(&signer_info.sid, &parsed)? {
                    return Ok(parsed);
                }
            }
        }
    }

    match fallback {
        Some(cert) if identifies(&signer_info.sid, cert)? => Ok(cert.clone()),
        _ => Err(Error::UntrustedSigner(
            "no certificate matches the token's signer".to_string(),
        )),
    }
}

fn identifies(sid: &SignerIdentifier, cert: &ParsedCertificate) -> Result<bool> {
    let tbs = &cert.certificate().tbs_certificate;
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => {
            Ok(isn.issuer == tbs.issuer && isn.serial_number == tbs.serial_number)
        }
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            let Some(ext) = tbs
                .extensions
                .iter()
                .flatten()
                .find(|ext| ext.extn_id == ID_CE_SUBJECT_KEY_IDENTIFIER)
            else {
                return Ok(false);
            };
            let cert_ski = SubjectKeyIdentifier::from_der(ext.extn_value.as_bytes())?;
            Ok(cert_ski.0 == ski.0)
        }
    }
}

fn check_time_stamping_usage(signer: &ParsedCertificate) -> Result<()> {
    let eku = sigcheck_crypto::x509::extended_key_usage(signer.certificate())
        .map_err(|e| Error::Certificate(e.to_string()))?
        .ok_or_else(|| Error::Certificate("missing ExtendedKeyUsage extension".to_string()))?;
    if !eku.0.contains(&ID_KP_TIME_STAMPING) {
        return Err(Error::Certificate(
            "ExtendedKeyUsage does not contain timeStamping".to_string(),
        ));
    }
    Ok(())
}

fn hash_for(oid: &ObjectIdentifier) -> Result<HashAlgorithm> {
    HashAlgorithm::from_oid(oid).map_err(|e| Error::UnsupportedAlgorithm(e.to_string()))
}

fn check_imprint(token: &TimestampToken, signature_bytes: &[u8]) -> Result<()> {
    let imprint = &token.tst_info.message_imprint;
    let hash = hash_for(&imprint.hash_algorithm.oid)?;
    if hash.digest(signature_bytes) != imprint.hashed_message.as_bytes() {
        return Err(Error::MessageImprint(
            "token does not timestamp this signature".to_string(),
        ));
    }
    Ok(())
}

fn check_signed_attributes(token: &TimestampToken, signer_info: &SignerInfo) -> Result<()> {
    let attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| Error::Malformed("signer has no signed attributes".to_string()))?;
    let hash = hash_for(&signer_info.digest_alg.oid)?;

    let attr_value = |oid: ObjectIdentifier| {
        attrs
            .iter()
            .find(|attr| attr.oid == oid)
            .and_then(|attr| attr.values.iter().next())
            .ok_or_else(|| Error::Malformed(format!("signed attribute {} missing", oid)))
    };

    let content_type = ObjectIdentifier::from_der(&attr_value(ID_CONTENT_TYPE)?.to_der()?)?;
    if content_type != ID_CT_TST_INFO {
        return Err(Error::Malformed(format!(
            "signed content type {} is not TSTInfo",
            content_type
        )));
    }

    let digest = OctetString::from_der(&attr_value(ID_MESSAGE_DIGEST)?.to_der()?)?;
    if digest.as_bytes() != hash.digest(&token.tst_info_der).as_slice() {
        return Err(Error::Signature(
            "messageDigest attribute does not match TSTInfo".to_string(),
        ));
    }

    Ok(())
}

fn check_signature(signer: &ParsedCertificate, signer_info: &SignerInfo) -> Result<()> {
    let attrs = signer_info
        .signed_attrs
        .as_ref()
        .ok_or_else(|| Error::Malformed("signer has no signed attributes".to_string()))?;
    let hash = hash_for(&signer_info.digest_alg.oid)?;
    let key = signer
        .public_key()
        .map_err(|e| Error::Certificate(e.to_string()))?;
    key.verify(&attrs.to_der()?, signer_info.signature.as_bytes(), hash)
        .map_err(|e| Error::Signature(e.to_string()))
}

fn check_authority_window(gen_time: i64, window: Option<(Option<i64>, Option<i64>)>) -> Result<()> {
    let Some((start, end)) = window else {
        return Ok(());
    };
    if start.is_some_and(|s| gen_time < s) || end.is_some_and(|e| gen_time > e) {
        return Err(Error::UntrustedSigner(format!(
            "genTime {} outside the authority's validity period",
            gen_time
        )));
    }
    Ok(())
}

/// The certificate that actually signed the token, not the authority's
/// configured leaf
fn check_signer_validity(signer: &ParsedCertificate, gen_time: i64) -> Result<()> {
    if !signer.is_valid_at(gen_time) {
        return Err(Error::Validity(format!(
            "genTime {} outside the signer certificate's validity",
            gen_time
        )));
    }
    Ok(())
}
