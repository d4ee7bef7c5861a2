//! Payment QR service
//!
//! Ties the payload builder to the symbol writer for generation, and the
//! image source + symbol reader to the text parser for decoding.

use std::path::Path;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::builder::{build_payload, reference};
use crate::config::PaymentQrConfig;
use crate::decoding::{QrSymbolReader, ReaderConfig, SymbolReader};
use crate::intent::payment_intent_uri;
use crate::parser::{parse_decoded_text, DecodedQr};
use crate::render::{QrCodeWriter, QrSymbolWriter, RenderConfig};
use crate::source::{load_image, FetchConfig, ImageFetcher, ImageSource, NoFetcher};
use crate::PaymentError;

/// Aggregated settings for the service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub render: RenderConfig,
    pub reader: ReaderConfig,
    pub fetch: FetchConfig,
}

impl ServiceConfig {
    pub fn from_json(json: &str) -> Result<Self, PaymentError> {
        serde_json::from_str(json)
            .map_err(|e| PaymentError::Validation(format!("Invalid service config: {}", e)))
    }
}

/// Result of QR generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQr {
    /// Image as a data URL
    pub qr: String,
    /// Fallback deep link
    pub intent: String,
    /// EMVCo payload encoded in the image
    pub payload: String,
}

pub struct PaymentQrService {
    writer: Box<dyn QrSymbolWriter>,
    reader: Box<dyn QrSymbolReader>,
    fetcher: Box<dyn ImageFetcher>,
}

impl Default for PaymentQrService {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentQrService {
    /// Service with default rendering/reading and no URL fetching.
    pub fn new() -> Self {
        Self {
            writer: Box::new(QrCodeWriter::default()),
            reader: Box::new(SymbolReader::default()),
            fetcher: Box::new(NoFetcher),
        }
    }

    /// Service built from configuration. With the `fetch` feature an HTTP
    /// fetcher honouring `config.fetch` is installed.
    pub fn with_config(config: ServiceConfig) -> Result<Self, PaymentError> {
        #[cfg(feature = "fetch")]
        let fetcher: Box<dyn ImageFetcher> = Box::new(crate::source::HttpFetcher::new(&config.fetch)?);
        #[cfg(not(feature = "fetch"))]
        let fetcher: Box<dyn ImageFetcher> = Box::new(NoFetcher);

        Ok(Self {
            writer: Box::new(QrCodeWriter::new(config.render)),
            reader: Box::new(SymbolReader::new(config.reader)),
            fetcher,
        })
    }

    pub fn with_writer(mut self, writer: impl QrSymbolWriter + 'static) -> Self {
        self.writer = Box::new(writer);
        self
    }

    pub fn with_reader(mut self, reader: impl QrSymbolReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl ImageFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Builds the payload, renders it and composes the intent link.
    pub fn generate_qr_code(
        &self,
        config: &PaymentQrConfig,
        ref_id: Option<&str>,
    ) -> Result<GeneratedQr, PaymentError> {
        let payload = build_payload(config, ref_id)?;
        let rendered = self.writer.write(&payload)?;
        let intent = payment_intent_uri(config, reference(config.details(), ref_id));

        log::info!("Generated {} QR for payee {}", config.scheme(), config.details().payee_id);

        Ok(GeneratedQr {
            qr: rendered.data_url,
            intent,
            payload,
        })
    }

    /// Loads the image, reads the symbol and interprets its text.
    pub fn decode_qr(&self, source: &ImageSource) -> Result<DecodedQr, PaymentError> {
        let img = load_image(source, self.fetcher.as_ref())?;
        self.decode_qr_from_image(&img)
    }

    /// Reads an already-loaded bitmap (e.g. canvas pixels).
    pub fn decode_qr_from_image(&self, img: &GrayImage) -> Result<DecodedQr, PaymentError> {
        let text = self.reader.read(img)?;
        log::info!("Decoded QR text ({} chars)", text.chars().count());
        Ok(parse_decoded_text(&text))
    }

    pub fn decode_qr_from_file(&self, path: impl AsRef<Path>) -> Result<DecodedQr, PaymentError> {
        self.decode_qr(&ImageSource::Path(path.as_ref().to_path_buf()))
    }

    pub fn decode_qr_from_bytes(&self, bytes: &[u8]) -> Result<DecodedQr, PaymentError> {
        self.decode_qr(&ImageSource::Bytes(bytes.to_vec()))
    }

    pub fn decode_qr_from_url(&self, url: &str) -> Result<DecodedQr, PaymentError> {
        if url.trim().is_empty() {
            return Err(PaymentError::Validation("imageUrl missing".into()));
        }
        self.decode_qr(&ImageSource::Url(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PaymentDetails;
    use crate::decoding::DecodeError;
    use crate::render::RenderedQr;

    struct FixedReader(&'static str);

    impl QrSymbolReader for FixedReader {
        fn read(&self, _img: &GrayImage) -> Result<String, DecodeError> {
            Ok(self.0.to_string())
        }
    }

    struct EchoWriter;

    impl QrSymbolWriter for EchoWriter {
        fn write(&self, payload: &str) -> Result<RenderedQr, PaymentError> {
            Ok(RenderedQr {
                format: crate::render::QrImageFormat::Png,
                data_url: payload.to_string(),
            })
        }
    }

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, image::Luma([255])))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_generate_uses_bill_number_for_intent() {
        let service = PaymentQrService::new().with_writer(EchoWriter);
        let config = PaymentQrConfig::upi(
            PaymentDetails::new("merchant@bank", "Test Shop", "12.50")
                .with_currency("INR")
                .with_bill_number("B-1"),
        );
        let generated = service.generate_qr_code(&config, None).unwrap();
        assert_eq!(generated.qr, generated.payload);
        assert!(generated.intent.contains("&tr=B-1"));
        assert!(generated.payload.contains("0103B-1"));
    }

    #[test]
    fn test_generate_propagates_validation() {
        let service = PaymentQrService::new();
        let config = PaymentQrConfig::upi(PaymentDetails::new("", "Shop", "1"));
        assert!(matches!(
            service.generate_qr_code(&config, None),
            Err(PaymentError::Validation(_))
        ));
    }

    #[test]
    fn test_decode_from_image_uses_configured_reader() {
        let service = PaymentQrService::new().with_reader(FixedReader("upi://pay?pa=x@y"));
        let img = GrayImage::from_pixel(10, 10, image::Luma([255]));
        let decoded = service.decode_qr_from_image(&img).unwrap();
        assert_eq!(decoded.param("pa"), Some("x@y"));
    }

    #[test]
    fn test_decode_pipeline_with_stub_reader() {
        let service = PaymentQrService::new().with_reader(FixedReader("upi://pay?pa=a@b&am=5"));
        let decoded = service.decode_qr_from_bytes(&tiny_png()).unwrap();
        assert_eq!(decoded.param("pa"), Some("a@b"));
        assert_eq!(decoded.param("am"), Some("5"));
    }

    #[test]
    fn test_decode_errors_are_wrapped() {
        let service = PaymentQrService::new();
        let err = service.decode_qr_from_bytes(b"garbage").unwrap_err();
        assert!(matches!(err, PaymentError::Decode(DecodeError::InvalidImage(_))));

        let err = service.decode_qr_from_bytes(&tiny_png()).unwrap_err();
        assert!(matches!(err, PaymentError::Decode(_)));
        assert!(err.to_string().starts_with("Error decoding QR"));
    }

    #[test]
    fn test_decode_from_url_requires_url() {
        let service = PaymentQrService::new();
        assert!(matches!(service.decode_qr_from_url(" "), Err(PaymentError::Validation(_))));
        assert!(matches!(
            service.decode_qr_from_url("https://example.com/qr.png"),
            Err(PaymentError::Decode(DecodeError::Fetch(_)))
        ));
    }

    #[test]
    fn test_service_config_from_json() {
        let config = ServiceConfig::from_json(r#"{"render": {"scale": 8, "format": "svg"}}"#).unwrap();
        assert_eq!(config.render.scale, 8);
        assert_eq!(config.render.margin, 2);
        assert!(config.reader.try_inverted);
        assert!(PaymentQrService::with_config(config).is_ok());
    }
}
