//! Image sources for QR decoding
//!
//! Bytes and paths are handled locally; URLs go through an [`ImageFetcher`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::decoding::DecodeError;

/// Where a QR image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
    Url(String),
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

/// Retrieves image bytes for a URL.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DecodeError>;
}

/// HTTP fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Upper bound for the whole request, in milliseconds
    pub timeout_ms: u64,
    /// Responses larger than this are rejected
    pub max_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Blocking HTTP(S) fetcher
#[cfg(feature = "fetch")]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    max_bytes: usize,
}

#[cfg(feature = "fetch")]
impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, DecodeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DecodeError::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            max_bytes: config.max_bytes,
        })
    }
}

#[cfg(feature = "fetch")]
impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DecodeError> {
        log::info!("Fetching QR image from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DecodeError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DecodeError::Fetch(format!("{} returned {}", url, status)));
        }

        if let Some(len) = response.content_length() {
            check_size(len, self.max_bytes)?;
        }
        read_limited(response, self.max_bytes)
    }
}

#[cfg_attr(not(feature = "fetch"), allow(dead_code))]
fn check_size(len: u64, max_bytes: usize) -> Result<(), DecodeError> {
    if len > max_bytes as u64 {
        return Err(DecodeError::Fetch(format!(
            "image is {} bytes, limit is {}",
            len, max_bytes
        )));
    }
    Ok(())
}

/// Reads at most `max_bytes`; a longer body is an error rather than a truncated image.
#[cfg_attr(not(feature = "fetch"), allow(dead_code))]
fn read_limited(body: impl std::io::Read, max_bytes: usize) -> Result<Vec<u8>, DecodeError> {
    use std::io::Read;

    let mut bytes = Vec::new();
    body.take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| DecodeError::Fetch(e.to_string()))?;
    check_size(bytes.len() as u64, max_bytes)?;
    Ok(bytes)
}

/// Fetcher used when no HTTP client is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFetcher;

impl ImageFetcher for NoFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DecodeError> {
        Err(DecodeError::Fetch(format!("no fetcher configured for {}", url)))
    }
}

/// Loads `source` as a grayscale bitmap.
pub fn load_image(source: &ImageSource, fetcher: &dyn ImageFetcher) -> Result<GrayImage, DecodeError> {
    match source {
        ImageSource::Bytes(bytes) => decode_bytes(bytes),
        ImageSource::Path(path) => {
            let bytes = std::fs::read(path)
                .map_err(|e| DecodeError::Io(format!("{}: {}", path.display(), e)))?;
            decode_bytes(&bytes)
        }
        ImageSource::Url(url) => decode_bytes(&fetcher.fetch(url)?),
    }
}

fn decode_bytes(bytes: &[u8]) -> Result<GrayImage, DecodeError> {
    let img = image::load_from_memory(bytes).map_err(|e| DecodeError::InvalidImage(e.to_string()))?;
    Ok(img.to_luma8())
}
