//! QR symbol reading
//!
//! Turns a grayscale bitmap into the text stored in the QR symbol. rqrr is
//! tried first, rxing second, then both again on inverted and thresholded
//! copies of the image.

use std::collections::HashSet;

use image::{GrayImage, Luma};
use rxing::qrcode::QRCodeReader;
use rxing::{BarcodeFormat, DecodeHintType, DecodeHintValue, DecodingHintDictionary, Exceptions, Reader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the image source / symbol reader collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("No QR code found in image")]
    NotFound,

    #[error("Failed to decode QR: {0}")]
    DecodeFailed(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to fetch image: {0}")]
    Fetch(String),
}

/// Reader tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Retry on the inverted image (light-on-dark symbols)
    pub try_inverted: bool,
    /// Threshold for the last-resort binarisation pass
    pub threshold: u8,
    /// Images larger than this are downscaled before reading
    pub max_dimension: u32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            try_inverted: true,
            threshold: 128,
            max_dimension: 1000,
        }
    }
}

/// Something that can read the text out of a QR symbol.
pub trait QrSymbolReader: Send + Sync {
    fn read(&self, img: &GrayImage) -> Result<String, DecodeError>;
}

/// rqrr + rxing reader with fallbacks
#[derive(Debug, Clone, Default)]
pub struct SymbolReader {
    config: ReaderConfig,
}

impl QrSymbolReader for SymbolReader {
    fn read(&self, img: &GrayImage) -> Result<String, DecodeError> {
        self.decode(img)
    }
}

impl SymbolReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Runs the full fallback chain.
    pub fn decode(&self, img: &GrayImage) -> Result<String, DecodeError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(DecodeError::InvalidImage("empty image".into()));
        }

        let img = self.downscale(img);
        log::debug!("Reading QR from {}x{} image", img.width(), img.height());

        let mut last_error = DecodeError::NotFound;

        match self.try_decoders(&img) {
            Ok(text) => return Ok(text),
            Err(e) => last_error = prefer_specific(last_error, e),
        }

        if self.config.try_inverted {
            log::debug!("FALLBACK: inverted image");
            match self.try_decoders(&invert(&img)) {
                Ok(text) => return Ok(text),
                Err(e) => last_error = prefer_specific(last_error, e),
            }
        }

        log::debug!("FALLBACK: contrast stretch");
        match self.try_decoders(&contrast_stretch(&img)) {
            Ok(text) => return Ok(text),
            Err(e) => last_error = prefer_specific(last_error, e),
        }

        log::debug!("FALLBACK: hard threshold ({})", self.config.threshold);
        match self.try_decoders(&threshold(&img, self.config.threshold)) {
            Ok(text) => return Ok(text),
            Err(e) => last_error = prefer_specific(last_error, e),
        }

        log::info!("QR read failed: {}", last_error);
        Err(last_error)
    }

    fn try_decoders(&self, img: &GrayImage) -> Result<String, DecodeError> {
        match decode_with_rqrr(img) {
            Ok(text) => Ok(text),
            Err(rqrr_err) => decode_with_rxing(img).map_err(|e| prefer_specific(rqrr_err, e)),
        }
    }

    fn downscale(&self, img: &GrayImage) -> GrayImage {
        let (width, height) = img.dimensions();
        let max = self.config.max_dimension;
        if max == 0 || (width <= max && height <= max) {
            return img.clone();
        }

        let scale = max as f32 / width.max(height) as f32;
        let new_width = ((width as f32 * scale) as u32).max(1);
        let new_height = ((height as f32 * scale) as u32).max(1);

        image::imageops::resize(img, new_width, new_height, image::imageops::FilterType::Triangle)
    }
}

/// Keeps the more informative of two errors (a real decode failure beats "not found").
fn prefer_specific(current: DecodeError, next: DecodeError) -> DecodeError {
    match (&current, &next) {
        (DecodeError::NotFound, _) => next,
        _ => current,
    }
}

fn decode_with_rqrr(img: &GrayImage) -> Result<String, DecodeError> {
    let mut prepared = rqrr::PreparedImage::prepare(img.clone());
    let grids = prepared.detect_grids();
    log::debug!("RQRR: detected {} grids", grids.len());

    let grid = grids.first().ok_or(DecodeError::NotFound)?;
    match grid.decode() {
        Ok((_meta, content)) => Ok(content),
        Err(e) => Err(DecodeError::DecodeFailed(format!("{:?}", e))),
    }
}

fn decode_with_rxing(img: &GrayImage) -> Result<String, DecodeError> {
    let (width, height) = img.dimensions();

    // packed ARGB, gray repeated in each channel
    let pixels: Vec<u32> = img
        .as_raw()
        .iter()
        .map(|&gray| {
            let g = gray as u32;
            0xFF000000 | (g << 16) | (g << 8) | g
        })
        .collect();

    let mut hints = DecodingHintDictionary::new();
    hints.insert(
        DecodeHintType::POSSIBLE_FORMATS,
        DecodeHintValue::PossibleFormats(HashSet::from([BarcodeFormat::QR_CODE])),
    );
    hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));

    let mut reader = QRCodeReader::new();

    let source = rxing::RGBLuminanceSource::new_with_width_height_pixels(
        width as usize,
        height as usize,
        &pixels,
    );
    let mut bitmap = rxing::BinaryBitmap::new(rxing::common::HybridBinarizer::new(source));
    let hybrid_err = match reader.decode_with_hints(&mut bitmap, &hints) {
        Ok(result) => {
            log::debug!("RXING: success (HybridBinarizer)");
            return Ok(result.getText().to_string());
        }
        Err(e) => rxing_error(e),
    };

    let source = rxing::RGBLuminanceSource::new_with_width_height_pixels(
        width as usize,
        height as usize,
        &pixels,
    );
    let mut bitmap = rxing::BinaryBitmap::new(rxing::common::GlobalHistogramBinarizer::new(source));
    match reader.decode_with_hints(&mut bitmap, &hints) {
        Ok(result) => {
            log::debug!("RXING: success (GlobalHistogramBinarizer)");
            Ok(result.getText().to_string())
        }
        Err(e) => Err(prefer_specific(hybrid_err, rxing_error(e))),
    }
}

/// Only "no symbol" stays `NotFound`; checksum and format failures keep rxing's message.
fn rxing_error(e: Exceptions) -> DecodeError {
    log::debug!("RXING: {}", e);
    match e {
        Exceptions::NotFoundException(_) => DecodeError::NotFound,
        other => DecodeError::DecodeFailed(format!("rxing: {}", other)),
    }
}

fn invert(img: &GrayImage) -> GrayImage {
    let mut result = img.clone();
    for p in result.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
    result
}

/// Stretches the histogram to the full 0..=255 range.
fn contrast_stretch(img: &GrayImage) -> GrayImage {
    let (min_val, max_val) = img
        .pixels()
        .fold((255u8, 0u8), |(lo, hi), p| (lo.min(p.0[0]), hi.max(p.0[0])));

    if min_val >= max_val {
        return img.clone();
    }

    let range = (max_val - min_val) as f32;
    let mut result = img.clone();
    for p in result.pixels_mut() {
        p.0[0] = ((p.0[0] - min_val) as f32 / range * 255.0) as u8;
    }
    result
}

fn threshold(img: &GrayImage, level: u8) -> GrayImage {
    let mut result = img.clone();
    for p in result.pixels_mut() {
        *p = Luma([if p.0[0] < level { 0 } else { 255 }]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image_not_found() {
        let reader = SymbolReader::default();
        let img = GrayImage::from_pixel(50, 50, Luma([128]));
        assert!(reader.read(&img).is_err());
    }

    #[test]
    fn test_empty_image_rejected() {
        let reader = SymbolReader::default();
        let img = GrayImage::new(0, 0);
        assert!(matches!(reader.read(&img), Err(DecodeError::InvalidImage(_))));
    }

    #[test]
    fn test_invert() {
        let img = GrayImage::from_pixel(4, 4, Luma([100]));
        assert_eq!(invert(&img).get_pixel(0, 0).0[0], 155);
    }

    #[test]
    fn test_contrast_stretch() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([100]));
        img.put_pixel(1, 0, Luma([150]));
        let stretched = contrast_stretch(&img);
        assert_eq!(stretched.get_pixel(0, 0).0[0], 0);
        assert_eq!(stretched.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_threshold() {
        let mut img = GrayImage::from_pixel(2, 1, Luma([127]));
        img.put_pixel(1, 0, Luma([128]));
        let bin = threshold(&img, 128);
        assert_eq!(bin.get_pixel(0, 0).0[0], 0);
        assert_eq!(bin.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn test_downscale_keeps_aspect() {
        let reader = SymbolReader::new(ReaderConfig { max_dimension: 100, ..Default::default() });
        let img = GrayImage::new(400, 200);
        assert_eq!(reader.downscale(&img).dimensions(), (100, 50));
    }

    #[test]
    fn test_rxing_error_mapping() {
        assert_eq!(rxing_error(Exceptions::NOT_FOUND), DecodeError::NotFound);
        match rxing_error(Exceptions::ChecksumException("bad ecc".into())) {
            DecodeError::DecodeFailed(msg) => assert!(msg.contains("bad ecc"), "{}", msg),
            other => panic!("expected DecodeFailed, got {:?}", other),
        }
        assert!(matches!(
            rxing_error(Exceptions::FormatException(String::new())),
            DecodeError::DecodeFailed(_)
        ));
    }

    #[test]
    fn test_prefer_specific() {
        let e = prefer_specific(DecodeError::NotFound, DecodeError::DecodeFailed("ecc".into()));
        assert_eq!(e, DecodeError::DecodeFailed("ecc".into()));
        let e = prefer_specific(DecodeError::DecodeFailed("ecc".into()), DecodeError::NotFound);
        assert_eq!(e, DecodeError::DecodeFailed("ecc".into()));
    }
}
