//! PayQR Core - EMVCo payment QR payloads
//!
//! Library for building and reading merchant-presented payment QR codes:
//! - TLV payload assembly for UPI and PayNow with CRC-16/CCITT-FALSE
//! - Fallback payment intent deep links
//! - QR rendering through `qrcode`, reading through rqrr with rxing fallback
//! - Interpretation of decoded text (`upi://` deep links)

pub mod builder;
pub mod config;
pub mod crc;
pub mod currency;
pub mod decoding;
pub mod emv;
pub mod intent;
pub mod parser;
pub mod render;
pub mod service;
pub mod source;
pub mod tlv;

pub use builder::build_payload;
pub use config::{PayNowConfig, PaymentDetails, PaymentQrConfig, PaymentQrRequest, PaymentScheme, UpiConfig};
pub use decoding::{DecodeError, QrSymbolReader, ReaderConfig, SymbolReader};
pub use emv::{EmvError, EmvPayload};
pub use intent::payment_intent_uri;
pub use parser::{parse_decoded_text, DecodedQr};
pub use render::{QrCodeWriter, QrImageFormat, QrSymbolWriter, RenderConfig, RenderedQr};
pub use service::{GeneratedQr, PaymentQrService, ServiceConfig};
pub use source::{FetchConfig, ImageFetcher, ImageSource};
pub use tlv::{TlvError, TlvReader, TlvWriter};

use thiserror::Error;

/// Errors surfaced to callers
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported QR scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Payload encoding error: {0}")]
    Tlv(#[from] TlvError),

    #[error("Failed to generate QR: {0}")]
    Render(String),

    #[error("Error decoding QR: {0}")]
    Decode(#[from] DecodeError),
}

impl PaymentError {
    /// Whether the caller can fix the error by correcting its input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PaymentError::Validation(_) | PaymentError::UnsupportedScheme(_) | PaymentError::Tlv(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_cause() {
        let err = PaymentError::from(DecodeError::NotFound);
        assert_eq!(err.to_string(), "Error decoding QR: No QR code found in image");
        assert!(!err.is_client_error());

        let err = PaymentError::UnsupportedScheme("ALIPAY".into());
        assert_eq!(err.to_string(), "Unsupported QR scheme: ALIPAY");
        assert!(err.is_client_error());
    }
}
