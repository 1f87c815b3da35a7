//! HashedRekord entry validation
//!
//! The body must repeat the bundle's digest, signature and signing
//! certificate, so an entry logged for one signature cannot vouch for
//! another.

use crate::error::{Error, Result};
use sigcheck_crypto::{ParsedCertificate, PublicKey};
use sigcheck_rekor::body::HashedRekordV001;
use sigcheck_rekor::Verifier;
use sigcheck_types::MessageSignature;

pub fn verify_hashedrekord_v001(
    body: &HashedRekordV001,
    signature: &MessageSignature,
    message_digest: Option<&[u8]>,
    leaf: &ParsedCertificate,
) -> Result<()> {
    if let Some(digest) = message_digest {
        if body.digest()? != digest {
            return Err(Error::InvalidLogEntry(
                "hashedrekord digest does not match the bundle's message digest".to_string(),
            ));
        }
    }

    if body.signature()? != signature.signature {
        return Err(Error::InvalidLogEntry(
            "hashedrekord signature does not match the bundle's signature".to_string(),
        ));
    }

    validate_verifier_match(&body.verifier()?, leaf)
}

/// The body's verifier must be the signing certificate, or its key
pub fn validate_verifier_match(verifier: &Verifier, leaf: &ParsedCertificate) -> Result<()> {
    let matches = match verifier {
        Verifier::Certificate(der) => der.as_slice() == leaf.der(),
        Verifier::PublicKey(der) => {
            let key = PublicKey::from_spki_der(der)
                .map_err(|e| Error::InvalidLogEntry(format!("entry public key: {}", e)))?;
            leaf.public_key().is_ok_and(|leaf_key| leaf_key == key)
        }
    };
    if !matches {
        return Err(Error::InvalidLogEntry(
            "entry was logged for a different signing certificate".to_string(),
        ));
    }
    Ok(())
}
