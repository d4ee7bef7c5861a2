//! EMVCo merchant-presented payload builder
//!
//! Produces `{tag}{len}{value}` groups in the fixed order wallets expect and
//! seals the payload with the CRC group `6304XXXX`.

use crate::config::{PaymentDetails, PaymentQrConfig};
use crate::crc::checksum_hex;
use crate::currency;
use crate::tlv::TlvWriter;
use crate::PaymentError;

/// Maximum characters kept for the merchant name (59) and reference (62/01).
pub const MAX_TEXT_FIELD: usize = 25;

const PAYLOAD_FORMAT_INDICATOR: &str = "01";
/// Always "12": the payload carries a fixed amount.
const POINT_OF_INITIATION: &str = "12";
const MERCHANT_CATEGORY_CODE: &str = "0000";
const MERCHANT_CITY: &str = "UNKNOWN";
const UPI_AID: &str = "com.upi";
const PAYNOW_AID: &str = "SG.PAYNOW";
const CRC_HEADER: &str = "6304";

pub mod tags {
    pub const PAYLOAD_FORMAT: &str = "00";
    pub const POINT_OF_INITIATION: &str = "01";
    pub const MERCHANT_ACCOUNT: &str = "26";
    pub const MERCHANT_CATEGORY: &str = "52";
    pub const CURRENCY: &str = "53";
    pub const AMOUNT: &str = "54";
    pub const COUNTRY: &str = "58";
    pub const MERCHANT_NAME: &str = "59";
    pub const MERCHANT_CITY: &str = "60";
    pub const ADDITIONAL_DATA: &str = "62";
    pub const CRC: &str = "63";

    /// Bill/reference number inside tag 62
    pub const REFERENCE: &str = "01";
}

/// PayNow proxy types (tag 26 / 01)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Mobile,
    Uen,
}

impl ProxyType {
    /// UEN-style ids are 9 digits followed by one uppercase letter.
    pub fn detect(payee_id: &str) -> Self {
        let bytes = payee_id.as_bytes();
        let is_uen = bytes.len() == 10
            && bytes[..9].iter().all(u8::is_ascii_digit)
            && bytes[9].is_ascii_uppercase();
        if is_uen {
            ProxyType::Uen
        } else {
            ProxyType::Mobile
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ProxyType::Mobile => "0",
            ProxyType::Uen => "2",
        }
    }
}

/// Builds the payload for `config`.
///
/// `ref_id` takes precedence over the config's bill number as the tag 62
/// reference.
pub fn build_payload(config: &PaymentQrConfig, ref_id: Option<&str>) -> Result<String, PaymentError> {
    let details = config.details();
    let amount = validate(details)?;

    let mut payload = TlvWriter::new();
    payload
        .append_field(tags::PAYLOAD_FORMAT, PAYLOAD_FORMAT_INDICATOR)?
        .append_field(tags::POINT_OF_INITIATION, POINT_OF_INITIATION)?;

    let account = merchant_account(config)?;
    payload
        .append_nested(tags::MERCHANT_ACCOUNT, &account)?
        .append_field(tags::MERCHANT_CATEGORY, MERCHANT_CATEGORY_CODE)?
        .append_field(tags::CURRENCY, currency::numeric_code(&details.currency))?
        .append_field(tags::AMOUNT, &format_amount(amount))?
        .append_field(tags::COUNTRY, &details.country_code.to_uppercase())?
        .append_field(tags::MERCHANT_NAME, &truncate(&details.payee_name, MAX_TEXT_FIELD))?
        .append_field(tags::MERCHANT_CITY, MERCHANT_CITY)?;

    if let Some(reference) = reference(details, ref_id) {
        let mut additional = TlvWriter::new();
        additional.append_field(tags::REFERENCE, &truncate(reference, MAX_TEXT_FIELD))?;
        payload.append_nested(tags::ADDITIONAL_DATA, &additional)?;
    }

    payload.append_raw(CRC_HEADER);
    let crc = checksum_hex(payload.as_str());
    payload.append_raw(&crc);

    let payload = payload.finish();
    log::debug!("Built {} payload ({} chars)", config.scheme(), payload.chars().count());
    Ok(payload)
}

/// The reference that ends up in tag 62: explicit `ref_id`, else the bill number.
pub(crate) fn reference<'a>(details: &'a PaymentDetails, ref_id: Option<&'a str>) -> Option<&'a str> {
    ref_id
        .or(details.bill_number.as_deref())
        .filter(|r| !r.is_empty())
}

/// Checks required fields and returns the parsed amount.
fn validate(details: &PaymentDetails) -> Result<f64, PaymentError> {
    if details.payee_id.trim().is_empty() {
        return Err(PaymentError::Validation("Missing payeeId".into()));
    }
    if details.payee_name.trim().is_empty() {
        return Err(PaymentError::Validation("Missing payeeName".into()));
    }
    parse_amount(&details.amount)
}

/// Parses a positive, finite decimal amount.
pub(crate) fn parse_amount(raw: &str) -> Result<f64, PaymentError> {
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| PaymentError::Validation(format!("Invalid amount {:?}", raw)))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PaymentError::Validation(format!("Invalid amount {:?}", raw)));
    }
    Ok(amount)
}

/// Two-decimal amount, ties rounded away from zero.
///
/// The exact decimal expansion of the binary value decides the rounding, so
/// `10.125` (exact) becomes `10.13` while `1.005` (stored just below) stays `1.00`.
pub(crate) fn format_amount(amount: f64) -> String {
    let exact = format!("{:.40}", amount);
    let (int, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let frac = format!("{:0<3}", frac);

    let mut digits: Vec<u8> = int.bytes().chain(frac.bytes().take(2)).collect();
    if frac.as_bytes()[2] >= b'5' {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    let split = digits.len() - 2;
    let (whole, cents) = digits.split_at(split);
    format!(
        "{}.{}",
        String::from_utf8_lossy(whole),
        String::from_utf8_lossy(cents)
    )
}

fn merchant_account(config: &PaymentQrConfig) -> Result<TlvWriter, PaymentError> {
    let mut account = TlvWriter::new();
    match config {
        PaymentQrConfig::Upi(upi) => {
            let vpa: String = upi.details.payee_id.chars().filter(|c| !c.is_whitespace()).collect();
            account
                .append_field("00", UPI_AID)?
                .append_field("01", &vpa)?;
        }
        PaymentQrConfig::PayNow(paynow) => {
            let payee_id = &paynow.details.payee_id;
            let proxy: String = payee_id
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '+')
                .collect();
            // "1" locks the amount, "0" lets the payer change it
            let editable = if paynow.editable_amount == Some(true) { "0" } else { "1" };
            account
                .append_field("00", PAYNOW_AID)?
                .append_field("01", ProxyType::detect(payee_id).code())?
                .append_field("02", &proxy)?
                .append_field("03", editable)?;
        }
    }
    Ok(account)
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
