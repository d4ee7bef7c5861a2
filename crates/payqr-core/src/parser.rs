//! Interpretation of decoded QR text
//!
//! `upi://` deep links are split into their query parameters; anything else
//! (including EMVCo payloads) is returned as raw text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const UPI_PREFIX: &str = "upi://";

/// Decoded QR text with optional deep-link parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecodedQr {
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
}

impl DecodedQr {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.as_ref()?.get(key).map(String::as_str)
    }
}

/// Parses text produced by a QR symbol reader. Never fails.
pub fn parse_decoded_text(raw: &str) -> DecodedQr {
    if !raw.starts_with(UPI_PREFIX) {
        return DecodedQr { raw: raw.to_string(), params: None };
    }

    let query = raw.split_once('?').map(|(_, q)| q).unwrap_or("");
    DecodedQr {
        raw: raw.to_string(),
        params: Some(parse_query(query)),
    }
}

/// `application/x-www-form-urlencoded` parsing; later duplicates win.
fn parse_query(query: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(form_decode(key), form_decode(value));
    }
    params
}

fn form_decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upi_deep_link() {
        let raw = "upi://pay?pa=merchant@bank&pn=Test%20Shop&am=12.50";
        let decoded = parse_decoded_text(raw);
        assert_eq!(decoded.raw, raw);
        assert_eq!(decoded.param("pa"), Some("merchant@bank"));
        assert_eq!(decoded.param("pn"), Some("Test Shop"));
        assert_eq!(decoded.param("am"), Some("12.50"));
        assert_eq!(decoded.params.as_ref().map(|p| p.len()), Some(3));
    }

    #[test]
    fn test_opaque_text() {
        let decoded = parse_decoded_text("some-non-upi-string");
        assert_eq!(decoded.raw, "some-non-upi-string");
        assert_eq!(decoded.params, None);

        let json = serde_json::to_value(&decoded).unwrap();
        assert!(json.get("params").is_none());
    }

    #[test]
    fn test_form_semantics() {
        let decoded = parse_decoded_text("upi://pay?pn=A+B&&flag&tn=x%3Dy&pa=first&pa=second");
        let params = decoded.params.unwrap();
        assert_eq!(params["pn"], "A B");
        assert_eq!(params["flag"], "");
        assert_eq!(params["tn"], "x=y");
        assert_eq!(params["pa"], "second");
    }

    #[test]
    fn test_upi_without_query() {
        let decoded = parse_decoded_text("upi://pay");
        assert_eq!(decoded.params, Some(BTreeMap::new()));
    }

    #[test]
    fn test_query_after_first_question_mark() {
        let decoded = parse_decoded_text("upi://pay?tn=what?&am=1");
        assert_eq!(decoded.param("tn"), Some("what?"));
        assert_eq!(decoded.param("am"), Some("1"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let decoded = parse_decoded_text("upi://pay?pn=%FF");
        assert_eq!(decoded.param("pn"), Some("\u{FFFD}"));
    }

    #[test]
    fn test_emv_payload_stays_opaque() {
        let decoded = parse_decoded_text("00020101021226370009SG.PAYNOW01010021065912345670301163049C1A");
        assert!(decoded.params.is_none());
    }
}
