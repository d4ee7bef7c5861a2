//! WASM bindings for payment QR codes
//!
//! Exposes payload building, QR generation and decoding to JavaScript.

use payqr_core::{parse_decoded_text, PaymentQrConfig, PaymentQrRequest, PaymentQrService};
use serde::Serialize;
use wasm_bindgen::prelude::*;

// rxing needs chrono's wasmbind clock on wasm32
use chrono as _;

/// Initialise panic hook and console logging
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("Payment QR WASM module initialized");
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    // plain objects instead of ES Maps for BTreeMap params
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).map_err(|e| JsError::new(&e.to_string()))
}

/// Accepts either the tagged config shape or the loose request shape
/// (`{scheme, payeeId, payeeName, amount, ...}` with optional fields).
fn config_from_js(config: JsValue) -> Result<PaymentQrConfig, JsError> {
    let request: PaymentQrRequest =
        serde_wasm_bindgen::from_value(config).map_err(|e| JsError::new(&e.to_string()))?;
    PaymentQrConfig::try_from(request).map_err(|e| JsError::new(&e.to_string()))
}

/// JavaScript-facing payment QR service
#[wasm_bindgen]
pub struct WasmPaymentQr {
    service: PaymentQrService,
}

#[wasm_bindgen]
impl WasmPaymentQr {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            service: PaymentQrService::new(),
        }
    }

    /// EMVCo payload string for `config`
    #[wasm_bindgen(js_name = buildPayload)]
    pub fn build_payload(&self, config: JsValue, ref_id: Option<String>) -> Result<String, JsError> {
        let config = config_from_js(config)?;
        payqr_core::build_payload(&config, ref_id.as_deref()).map_err(|e| JsError::new(&e.to_string()))
    }

    /// `{ qr, intent, payload }` with `qr` as a PNG data URL
    #[wasm_bindgen(js_name = generateQrCode)]
    pub fn generate_qr_code(&self, config: JsValue, ref_id: Option<String>) -> Result<JsValue, JsError> {
        let config = config_from_js(config)?;
        let generated = self
            .service
            .generate_qr_code(&config, ref_id.as_deref())
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_js(&generated)
    }

    /// Decode an encoded image (PNG, JPEG)
    ///
    /// @param image_data - Uint8Array with the image file bytes
    /// @returns `{ raw, params? }`
    #[wasm_bindgen(js_name = decodeImage)]
    pub fn decode_image(&self, image_data: &[u8]) -> Result<JsValue, JsError> {
        let decoded = self
            .service
            .decode_qr_from_bytes(image_data)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_js(&decoded)
    }

    /// Decode canvas pixels from `ctx.getImageData()`
    #[wasm_bindgen(js_name = decodeImageData)]
    pub fn decode_image_data(&self, image_data: &web_sys::ImageData) -> Result<JsValue, JsError> {
        let width = image_data.width();
        let height = image_data.height();
        let img = rgba_to_gray(&image_data.data(), width, height)
            .and_then(|gray| image::GrayImage::from_raw(width, height, gray))
            .ok_or_else(|| JsError::new("Failed to create image from data"))?;

        let decoded = self
            .service
            .decode_qr_from_image(&img)
            .map_err(|e| JsError::new(&e.to_string()))?;
        to_js(&decoded)
    }
}

impl Default for WasmPaymentQr {
    fn default() -> Self {
        Self::new()
    }
}

/// Interpret already-decoded QR text
#[wasm_bindgen(js_name = parseDecodedText)]
pub fn parse_text(text: &str) -> Result<JsValue, JsError> {
    to_js(&parse_decoded_text(text))
}

#[wasm_bindgen(js_name = version)]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// RGBA → grayscale with ITU-R BT.601 weights
///
/// `None` when the buffer is shorter than `width * height` pixels.
fn rgba_to_gray(rgba: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = (width as usize).checked_mul(height as usize)?;
    if rgba.len() / 4 < pixel_count {
        return None;
    }
    Some(
        rgba.chunks_exact(4)
            .take(pixel_count)
            .map(|px| (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32) as u8)
            .collect(),
    )
}
