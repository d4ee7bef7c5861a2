//! Payment QR configuration
//!
//! `PaymentQrConfig` is a sum type over the supported schemes so that
//! scheme-only fields (PayNow's editable-amount flag) exist only where they
//! apply. `PaymentQrRequest` is the loosely typed form an API layer receives
//! and is converted with the same defaults the HTTP surface applied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::PaymentError;

/// Payment rail selecting the merchant-account sub-structure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentScheme {
    Upi,
    PayNow,
}

impl PaymentScheme {
    /// Lower-case form used as the deep-link URI scheme.
    pub fn uri_scheme(&self) -> &'static str {
        match self {
            PaymentScheme::Upi => "upi",
            PaymentScheme::PayNow => "paynow",
        }
    }

    fn default_currency(&self) -> &'static str {
        match self {
            PaymentScheme::Upi => "INR",
            PaymentScheme::PayNow => "SGD",
        }
    }

    fn default_country(&self) -> &'static str {
        match self {
            PaymentScheme::Upi => "IN",
            PaymentScheme::PayNow => "SG",
        }
    }
}

impl fmt::Display for PaymentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentScheme::Upi => f.write_str("UPI"),
            PaymentScheme::PayNow => f.write_str("PAYNOW"),
        }
    }
}

impl FromStr for PaymentScheme {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPI" => Ok(PaymentScheme::Upi),
            "PAYNOW" => Ok(PaymentScheme::PayNow),
            _ => Err(PaymentError::UnsupportedScheme(s.to_string())),
        }
    }
}

/// Fields shared by every scheme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// VPA for UPI, mobile number or UEN for PayNow
    pub payee_id: String,
    /// Merchant display name (truncated to 25 characters in the payload)
    pub payee_name: String,
    /// ISO 3166 alpha-2 country code
    pub country_code: String,
    /// ISO 4217 alphabetic currency code
    pub currency: String,
    /// Decimal amount, e.g. "12.50"
    pub amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_number: Option<String>,
}

impl PaymentDetails {
    pub fn new(
        payee_id: impl Into<String>,
        payee_name: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            payee_id: payee_id.into(),
            payee_name: payee_name.into(),
            country_code: String::new(),
            currency: String::new(),
            amount: amount.into(),
            bill_number: None,
        }
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_bill_number(mut self, bill_number: impl Into<String>) -> Self {
        self.bill_number = Some(bill_number.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpiConfig {
    #[serde(flatten)]
    pub details: PaymentDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PayNowConfig {
    #[serde(flatten)]
    pub details: PaymentDetails,
    /// `Some(true)` lets the payer edit the amount; unset locks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_amount: Option<bool>,
}

/// Input to the payload builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "scheme")]
pub enum PaymentQrConfig {
    #[serde(rename = "UPI")]
    Upi(UpiConfig),
    #[serde(rename = "PAYNOW")]
    PayNow(PayNowConfig),
}

impl PaymentQrConfig {
    pub fn upi(details: PaymentDetails) -> Self {
        PaymentQrConfig::Upi(UpiConfig { details })
    }

    pub fn paynow(details: PaymentDetails, editable_amount: Option<bool>) -> Self {
        PaymentQrConfig::PayNow(PayNowConfig { details, editable_amount })
    }

    pub fn scheme(&self) -> PaymentScheme {
        match self {
            PaymentQrConfig::Upi(_) => PaymentScheme::Upi,
            PaymentQrConfig::PayNow(_) => PaymentScheme::PayNow,
        }
    }

    pub fn details(&self) -> &PaymentDetails {
        match self {
            PaymentQrConfig::Upi(c) => &c.details,
            PaymentQrConfig::PayNow(c) => &c.details,
        }
    }

    /// Parses the JSON shape `{"scheme": "UPI", "payeeId": ..., ...}`.
    ///
    /// An unknown `scheme` is reported as [`PaymentError::UnsupportedScheme`].
    pub fn from_json(json: &str) -> Result<Self, PaymentError> {
        let request: PaymentQrRequest = serde_json::from_str(json)
            .map_err(|e| PaymentError::Validation(format!("Malformed payment config: {}", e)))?;
        PaymentQrConfig::try_from(request)
    }
}

/// Loosely typed request, every field optional as it arrives from a query
/// string or form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQrRequest {
    pub scheme: Option<String>,
    pub payee_id: Option<String>,
    pub payee_name: Option<String>,
    pub amount: Option<String>,
    pub bill_number: Option<String>,
    pub currency: Option<String>,
    pub country_code: Option<String>,
    pub editable_amount: Option<bool>,
}

impl TryFrom<PaymentQrRequest> for PaymentQrConfig {
    type Error = PaymentError;

    fn try_from(req: PaymentQrRequest) -> Result<Self, Self::Error> {
        let scheme: PaymentScheme = match req.scheme.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse()?,
            _ => return Err(PaymentError::Validation("Missing payment scheme".into())),
        };

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let details = PaymentDetails {
            payee_id: req.payee_id.unwrap_or_default(),
            payee_name: req.payee_name.unwrap_or_default(),
            country_code: non_empty(req.country_code)
                .unwrap_or_else(|| scheme.default_country().to_string()),
            currency: non_empty(req.currency)
                .unwrap_or_else(|| scheme.default_currency().to_string()),
            amount: req.amount.unwrap_or_default(),
            bill_number: non_empty(req.bill_number),
        };

        Ok(match scheme {
            PaymentScheme::Upi => PaymentQrConfig::upi(details),
            PaymentScheme::PayNow => {
                PaymentQrConfig::paynow(details, Some(req.editable_amount.unwrap_or(false)))
            }
        })
    }
}
