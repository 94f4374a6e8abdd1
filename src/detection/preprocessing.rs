use image::{DynamicImage, GrayImage};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::filter::separable_filter_equal;
use tracing::trace;

use crate::error::{AlprError, Result};

/// Side length of the fixed Gaussian kernel
pub const BLUR_KERNEL_SIZE: usize = 5;

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Sigma used for a kernel of the given size when none is supplied
/// (the OpenCV convention for `sigma = 0`).
pub fn sigma_for_kernel(size: usize) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian taps for a kernel of odd `size`
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = sigma_for_kernel(size);
    let half = (size / 2) as i32;
    let taps: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = taps.iter().sum();
    taps.into_iter().map(|t| t / sum).collect()
}

/// Apply a fixed 5x5 Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage) -> GrayImage {
    let kernel = gaussian_kernel(BLUR_KERNEL_SIZE);
    separable_filter_equal(img, &kernel)
}

/// Global binarization at the Otsu level; pixels above the level become 255
pub fn binarize(img: &GrayImage) -> (GrayImage, u8) {
    let level = otsu_level(img);
    (threshold(img, level, ThresholdType::Binary), level)
}

/// Grayscale, blur and binarize an image for region finding
pub fn preprocess(img: &DynamicImage) -> Result<GrayImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(AlprError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            img.width(),
            img.height()
        )));
    }

    let gray = to_grayscale(img);
    let blurred = apply_blur(&gray);
    drop(gray);

    let (binary, level) = binarize(&blurred);
    drop(blurred);

    trace!(
        width = binary.width(),
        height = binary.height(),
        otsu_level = level,
        "Binarized image"
    );
    Ok(binary)
}
