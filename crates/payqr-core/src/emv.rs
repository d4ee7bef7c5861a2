use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::tags;
use crate::crc::checksum_hex;
use crate::currency;
use crate::tlv::{TlvError, TlvReader};

/// EMV payload inspection errors
#[derive(Error, Debug, PartialEq)]
pub enum EmvError {
    #[error("Invalid CRC: expected {expected}, got {actual}")]
    InvalidCrc { expected: String, actual: String },
    #[error("Missing Checksum (Tag 63)")]
    MissingChecksum,
    #[error("Malformed TLV data: {0}")]
    Malformed(#[from] TlvError),
}

/// A single top-level data object
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmvField {
    pub tag: String,
    pub value: String,
}

/// CRC-checked EMV payload, fields kept in payload order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmvPayload {
    pub raw_data: String,
    pub fields: Vec<EmvField>,
}

impl EmvPayload {
    pub fn parse(raw: &str) -> Result<Self, EmvError> {
        // 1. Validate CRC first
        Self::validate_crc(raw)?;

        // 2. Parse TLV; the CRC group is the last one
        let fields = TlvReader::new(raw)
            .map(|field| {
                field.map(|f| EmvField {
                    tag: f.tag.to_string(),
                    value: f.value.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match fields.last() {
            Some(last) if last.tag == tags::CRC => {}
            _ => return Err(EmvError::MissingChecksum),
        }

        Ok(EmvPayload {
            raw_data: raw.to_string(),
            fields,
        })
    }

    fn validate_crc(raw: &str) -> Result<(), EmvError> {
        // Format: ... + '63' + '04' + 'CRC'
        let len = raw.len();
        if len < 8 || !raw.is_char_boundary(len - 8) || !raw.is_char_boundary(len - 4) {
            return Err(EmvError::MissingChecksum);
        }

        if &raw[len - 8..len - 4] != "6304" {
            return Err(EmvError::MissingChecksum);
        }

        let provided = &raw[len - 4..];
        let expected = checksum_hex(&raw[..len - 4]);

        if provided.to_uppercase() != expected {
            return Err(EmvError::InvalidCrc {
                expected,
                actual: provided.to_string(),
            });
        }

        Ok(())
    }

    /// First value for a top-level tag.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.tag == tag)
            .map(|f| f.value.as_str())
    }

    /// Nested fields of a template tag (26-51 merchant account, 62 additional data).
    pub fn template(&self, tag: &str) -> Option<Vec<EmvField>> {
        let value = self.get(tag)?;
        TlvReader::new(value)
            .map(|field| {
                field.map(|f| EmvField {
                    tag: f.tag.to_string(),
                    value: f.value.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .ok()
    }

    pub fn payload_format(&self) -> Option<&str> {
        self.get(tags::PAYLOAD_FORMAT)
    }

    pub fn point_of_initiation(&self) -> Option<&str> {
        self.get(tags::POINT_OF_INITIATION)
    }

    /// Merchant account template (tag 26).
    pub fn merchant_account(&self) -> Option<Vec<EmvField>> {
        self.template(tags::MERCHANT_ACCOUNT)
    }

    /// Numeric currency code (tag 53).
    pub fn currency(&self) -> Option<&str> {
        self.get(tags::CURRENCY)
    }

    /// Alphabetic currency, if the numeric code is known.
    pub fn currency_alpha(&self) -> Option<&'static str> {
        self.currency().and_then(currency::alpha_code)
    }

    pub fn amount(&self) -> Option<&str> {
        self.get(tags::AMOUNT)
    }

    pub fn country_code(&self) -> Option<&str> {
        self.get(tags::COUNTRY)
    }

    pub fn merchant_name(&self) -> Option<&str> {
        self.get(tags::MERCHANT_NAME)
    }

    pub fn merchant_city(&self) -> Option<&str> {
        self.get(tags::MERCHANT_CITY)
    }

    /// Bill/reference number from the additional data template (62 / 01).
    pub fn reference(&self) -> Option<String> {
        self.template(tags::ADDITIONAL_DATA)?
            .into_iter()
            .find(|f| f.tag == tags::REFERENCE)
            .map(|f| f.value)
    }

    pub fn crc(&self) -> Option<&str> {
        self.get(tags::CRC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emv() {
        let payload_body = "0002015909SomeMerch6304";
        let full_payload = format!("{}{}", payload_body, checksum_hex(payload_body));

        let parsed = EmvPayload::parse(&full_payload).expect("Should parse");
        assert_eq!(parsed.payload_format(), Some("01"));
        assert_eq!(parsed.merchant_name(), Some("SomeMerch"));
        assert_eq!(parsed.fields.len(), 3);
    }

    #[test]
    fn test_lowercase_crc_accepted() {
        let body = "0002015909SomeMerch6304";
        let full = format!("{}{}", body, checksum_hex(body).to_lowercase());
        assert!(EmvPayload::parse(&full).is_ok());
    }

    #[test]
    fn test_invalid_crc() {
        let body = "0002015909SomeMerch6304";
        let crc = checksum_hex(body);
        let wrong = if crc == "0000" { "0001" } else { "0000" };
        let err = EmvPayload::parse(&format!("{}{}", body, wrong)).unwrap_err();
        assert_eq!(
            err,
            EmvError::InvalidCrc { expected: crc, actual: wrong.to_string() }
        );
    }

    #[test]
    fn test_missing_checksum() {
        assert_eq!(EmvPayload::parse("000201"), Err(EmvError::MissingChecksum));
        assert_eq!(EmvPayload::parse("0002015909SomeMerch"), Err(EmvError::MissingChecksum));
    }

    #[test]
    fn test_malformed_body() {
        // CRC is valid but the body does not frame
        let body = "000201599Some6304";
        let full = format!("{}{}", body, checksum_hex(body));
        assert!(matches!(EmvPayload::parse(&full), Err(EmvError::Malformed(_))));
    }

    #[test]
    fn test_templates() {
        let body = "00020126110007com.upi62090105REF-96304";
        let full = format!("{}{}", body, checksum_hex(body));
        let parsed = EmvPayload::parse(&full).unwrap();

        let account = parsed.merchant_account().unwrap();
        assert_eq!(account[0], EmvField { tag: "00".into(), value: "com.upi".into() });
        assert_eq!(parsed.reference(), Some("REF-9".to_string()));
    }
}
