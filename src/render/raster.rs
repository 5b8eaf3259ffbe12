//! # Logo Raster Encoding
//!
//! Turns an embedded `data:` image into a ready-to-send `GS v 0` command.
//!
//! ## Pipeline
//!
//! ```text
//! data URL ─► base64 ─► decode ─► composite on white ─► pad to 32 dots
//!          ─► Bayer dither ─► pack MSB first ─► GS v 0 header + rows
//! ```
//!
//! Logos repeat on every receipt, so encoded commands are cached by the
//! SHA-256 of the decoded image file.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::DynamicImage;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::dither;
use crate::error::CompileError;
use crate::protocol::graphics;

/// Raster blocks are sent in multiples of this many dots.
pub const BLOCK_DOTS: u32 = 32;

/// An encoded raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Padded width in dots (multiple of [`BLOCK_DOTS`])
    pub width_dots: u32,
    pub height: u32,
    /// Full `GS v 0` command including header
    pub command: Vec<u8>,
}

/// Content-addressed cache of encoded images.
#[derive(Debug, Default)]
pub struct RasterCache {
    entries: Mutex<HashMap<[u8; 32], Arc<RasterImage>>>,
}

impl RasterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a `data:<mime>;base64,<payload>` image, reusing a cached
    /// result for identical content.
    pub fn encode_data_url(&self, src: &str) -> Result<Arc<RasterImage>, CompileError> {
        let bytes = decode_data_url(src)?;
        self.encode_bytes(&bytes)
    }

    /// Encode an image file (PNG, JPEG, ...) from memory.
    pub fn encode_bytes(&self, bytes: &[u8]) -> Result<Arc<RasterImage>, CompileError> {
        let key: [u8; 32] = Sha256::digest(bytes).into();
        if let Some(hit) = self.entries.lock().get(&key) {
            debug!(width = hit.width_dots, height = hit.height, "raster cache hit");
            return Ok(Arc::clone(hit));
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| CompileError::Image(format!("failed to decode image: {}", e)))?;
        let encoded = Arc::new(encode_image(&img)?);
        debug!(
            width = encoded.width_dots,
            height = encoded.height,
            "encoded raster image"
        );

        self.entries.lock().insert(key, Arc::clone(&encoded));
        Ok(encoded)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract the payload bytes of a base64 `data:` URL.
pub fn decode_data_url(src: &str) -> Result<Vec<u8>, CompileError> {
    let rest = src
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| CompileError::Image("image source is not a data: URL".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| CompileError::Image("data: URL has no payload".into()))?;
    if !header.ends_with(";base64") {
        return Err(CompileError::Image(format!(
            "data: URL must be base64 encoded, got '{}'",
            header
        )));
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| CompileError::Image(format!("invalid base64 image data: {}", e)))
}

/// Convert a decoded image to a padded, dithered `GS v 0` raster.
///
/// Transparent pixels are blended onto white. The padding needed to reach
/// a multiple of [`BLOCK_DOTS`] is split between the left and right edges
/// (left gets the smaller half).
pub fn encode_image(img: &DynamicImage) -> Result<RasterImage, CompileError> {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(CompileError::Image("image has no pixels".into()));
    }

    let padded = width.div_ceil(BLOCK_DOTS) * BLOCK_DOTS;
    let left = (padded - width) / 2;

    let width_bytes = u16::try_from(padded / 8)
        .map_err(|_| CompileError::Image(format!("image too wide ({} px)", width)))?;
    let rows = u16::try_from(height)
        .map_err(|_| CompileError::Image(format!("image too tall ({} px)", height)))?;

    let data = dither::generate_raster(padded as usize, height as usize, |x, y| {
        let x = x as u32;
        if x < left || x >= left + width {
            return 0.0;
        }
        let [r, g, b, a] = rgba.get_pixel(x - left, y as u32).0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        let alpha = a as f32 / 255.0;
        let on_white = alpha * luma + (1.0 - alpha) * 255.0;
        1.0 - on_white / 255.0
    });

    Ok(RasterImage {
        width_dots: padded,
        height,
        command: graphics::raster(width_bytes, rows, &data),
    })
}
