//! Self-contained previews of cropped regions
//!
//! Crops are surfaced as `data:image/png;base64,...` strings so a UI can render
//! them without touching raw buffers.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, GrayImage, ImageFormat};

use crate::error::{AlprError, Result};

const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encode a crop as a PNG data URI
pub fn encode_preview(image: &GrayImage) -> Result<String> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(AlprError::invalid_image)?;
    Ok(format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(&png)))
}

/// Decode a preview produced by [`encode_preview`]
pub fn decode_preview(uri: &str) -> Result<DynamicImage> {
    let payload = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| AlprError::InvalidImage("not a PNG data URI".to_string()))?;
    let bytes = STANDARD.decode(payload).map_err(AlprError::invalid_image)?;
    image::load_from_memory_with_format(&bytes, ImageFormat::Png).map_err(AlprError::invalid_image)
}
