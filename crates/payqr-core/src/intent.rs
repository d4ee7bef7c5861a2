//! Payment intent deep link
//!
//! `{scheme}://pay?pa=..&pn=..[&am=..][&tr=..][&cu=..]` for apps that handle
//! intents directly instead of scanning. Not part of the EMVCo payload.

use crate::config::PaymentQrConfig;

pub fn payment_intent_uri(config: &PaymentQrConfig, ref_id: Option<&str>) -> String {
    let details = config.details();

    let mut uri = format!(
        "{}://pay?pa={}&pn={}",
        config.scheme().uri_scheme(),
        urlencoding::encode(&details.payee_id),
        urlencoding::encode(&details.payee_name),
    );

    if !details.amount.is_empty() {
        uri.push_str(&format!("&am={}", urlencoding::encode(&details.amount)));
    }
    if let Some(reference) = ref_id.filter(|r| !r.is_empty()) {
        uri.push_str(&format!("&tr={}", urlencoding::encode(reference)));
    }
    if !details.currency.is_empty() {
        uri.push_str(&format!("&cu={}", urlencoding::encode(&details.currency)));
    }

    uri
}
