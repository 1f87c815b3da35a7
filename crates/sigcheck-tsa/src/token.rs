//! Decoding of RFC 3161 responses and tokens

use crate::error::{Error, Result};
use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use x509_tsp::{TimeStampResp, TstInfo};

pub(crate) const ID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
pub(crate) const ID_CT_TST_INFO: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.16.1.4");

/// A decoded timestamp token
pub(crate) struct TimestampToken {
    pub signed_data: SignedData,
    /// DER of the encapsulated TSTInfo, the input to the messageDigest attribute
    pub tst_info_der: Vec<u8>,
    pub tst_info: TstInfo,
}

impl TimestampToken {
    /// Decode a DER `TimeStampResp`, or a bare `ContentInfo` token
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let content_info = match TimeStampResp::from_der(bytes) {
            Ok(resp) => resp.time_stamp_token.ok_or_else(|| {
                Error::Malformed("response carries no timestamp token".to_string())
            })?,
            Err(resp_err) => ContentInfo::from_der(bytes).map_err(|e| {
                Error::Malformed(format!(
                    "neither a TimeStampResp ({}) nor a ContentInfo ({})",
                    resp_err, e
                ))
            })?,
        };

        if content_info.content_type != ID_SIGNED_DATA {
            return Err(Error::Malformed(format!(
                "token content type {} is not signed data",
                content_info.content_type
            )));
        }
        let signed_data = SignedData::from_der(&content_info.content.to_der()?)?;

        let encap = &signed_data.encap_content_info;
        if encap.econtent_type != ID_CT_TST_INFO {
            return Err(Error::Malformed(format!(
                "encapsulated content type {} is not TSTInfo",
                encap.econtent_type
            )));
        }
        let tst_info_der = encap
            .econtent
            .as_ref()
            .ok_or_else(|| Error::Malformed("token has no encapsulated TSTInfo".to_string()))?
            .value()
            .to_vec();
        let tst_info = TstInfo::from_der(&tst_info_der)?;

        Ok(Self {
            signed_data,
            tst_info_der,
            tst_info,
        })
    }

    /// genTime as seconds since the epoch
    pub fn gen_time(&self) -> i64 {
        self.tst_info.gen_time.to_unix_duration().as_secs() as i64
    }
}

/// Read the time a token claims without verifying it
pub fn parse_timestamp(bytes: &[u8]) -> Result<i64> {
    Ok(TimestampToken::from_der(bytes)?.gen_time())
}
