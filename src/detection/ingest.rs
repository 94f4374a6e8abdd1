use image::{DynamicImage, ImageFormat};

use crate::error::{AlprError, Result};

/// Largest encoded frame accepted (20MB)
const MAX_IMAGE_SIZE: usize = 20 * 1024 * 1024;

/// Decode an encoded image (JPEG camera frame, PNG upload, ...) into pixels
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(AlprError::InvalidImage("image data is empty".to_string()));
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(AlprError::InvalidImage(format!(
            "image data is too large: {} bytes (max: {} bytes)",
            bytes.len(),
            MAX_IMAGE_SIZE
        )));
    }

    let format = image::guess_format(bytes).map_err(AlprError::invalid_image)?;
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AlprError::InvalidImage(format!("failed to decode {:?}: {}", format, e)))?;

    if img.width() == 0 || img.height() == 0 {
        return Err(AlprError::InvalidImage("decoded image has no pixels".to_string()));
    }
    Ok(img)
}

/// Whether a file extension names a format we can ingest
pub fn is_supported_extension(ext: &str) -> bool {
    ImageFormat::from_extension(ext).is_some_and(|f| f.can_read())
}
