//! QR symbol rendering
//!
//! Turns a payload string into a scannable image delivered as a data URL.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{GrayImage, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::PaymentError;

/// Largest raster side accepted from `margin` and `scale`.
pub const MAX_IMAGE_SIDE: u32 = 8192;

/// Error correction level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCorrectionLevel {
    L, // ~7%
    M, // ~15%
    Q, // ~25%
    H, // ~30%
}

impl From<ErrorCorrectionLevel> for EcLevel {
    fn from(level: ErrorCorrectionLevel) -> Self {
        match level {
            ErrorCorrectionLevel::L => EcLevel::L,
            ErrorCorrectionLevel::M => EcLevel::M,
            ErrorCorrectionLevel::Q => EcLevel::Q,
            ErrorCorrectionLevel::H => EcLevel::H,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QrImageFormat {
    Png,
    Svg,
}

/// Rendering options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub error_correction: ErrorCorrectionLevel,
    /// Quiet zone around the symbol, in modules
    pub margin: u32,
    /// Pixels per module
    pub scale: u32,
    pub format: QrImageFormat,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            error_correction: ErrorCorrectionLevel::M,
            margin: 2,
            scale: 6,
            format: QrImageFormat::Png,
        }
    }
}

/// Rendered symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedQr {
    pub format: QrImageFormat,
    /// `data:image/...;base64,...`
    pub data_url: String,
}

/// Something that can turn a payload into a scannable image.
pub trait QrSymbolWriter: Send + Sync {
    fn write(&self, payload: &str) -> Result<RenderedQr, PaymentError>;
}

/// Writer backed by the `qrcode` crate
#[derive(Debug, Clone, Default)]
pub struct QrCodeWriter {
    config: RenderConfig,
}

impl QrSymbolWriter for QrCodeWriter {
    fn write(&self, payload: &str) -> Result<RenderedQr, PaymentError> {
        let code = self.encode(payload)?;
        let (mime, bytes) = match self.config.format {
            QrImageFormat::Png => ("image/png", self.to_png(&code)?),
            QrImageFormat::Svg => ("image/svg+xml", self.to_svg(&code).into_bytes()),
        };

        Ok(RenderedQr {
            format: self.config.format,
            data_url: format!("data:{};base64,{}", mime, STANDARD.encode(bytes)),
        })
    }
}

impl QrCodeWriter {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn encode(&self, payload: &str) -> Result<QrCode, PaymentError> {
        QrCode::with_error_correction_level(payload.as_bytes(), self.config.error_correction.into())
            .map_err(|e| PaymentError::Render(format!("QR encoding failed: {}", e)))
    }

    /// Renders the symbol module by module into a grayscale bitmap.
    pub fn to_image(&self, payload: &str) -> Result<GrayImage, PaymentError> {
        self.rasterize(&self.encode(payload)?)
    }

    fn rasterize(&self, code: &QrCode) -> Result<GrayImage, PaymentError> {
        let scale = self.config.scale.max(1);
        let margin = self.config.margin;
        let width = code.width() as u32;
        let side = margin
            .checked_mul(2)
            .and_then(|m| m.checked_add(width))
            .and_then(|modules| modules.checked_mul(scale))
            .filter(|&side| side <= MAX_IMAGE_SIDE)
            .ok_or_else(|| {
                PaymentError::Render(format!(
                    "image for margin {} and scale {} exceeds {} px",
                    margin, scale, MAX_IMAGE_SIDE
                ))
            })?;

        let mut img = GrayImage::from_pixel(side, side, Luma([255]));
        for y in 0..width {
            for x in 0..width {
                if code[(x as usize, y as usize)] != qrcode::Color::Dark {
                    continue;
                }
                let px = (margin + x) * scale;
                let py = (margin + y) * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        img.put_pixel(px + dx, py + dy, Luma([0]));
                    }
                }
            }
        }
        Ok(img)
    }

    fn to_png(&self, code: &QrCode) -> Result<Vec<u8>, PaymentError> {
        let img = self.rasterize(code)?;
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| PaymentError::Render(format!("PNG encoding failed: {}", e)))?;
        Ok(bytes)
    }

    fn to_svg(&self, code: &QrCode) -> String {
        let scale = self.config.scale.max(1);
        code.render::<qrcode::render::svg::Color<'_>>()
            .quiet_zone(self.config.margin > 0)
            .module_dimensions(scale, scale)
            .build()
    }
}
