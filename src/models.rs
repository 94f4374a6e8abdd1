use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// One traced contour, reduced to what the plate filter needs
#[derive(Debug, Clone)]
pub struct Contour {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Polygon area enclosed by the contour points (shoelace formula)
    pub area: f64,
    /// Number of points left after chain simplification
    pub point_count: usize,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f64 {
        let w = self.width() as f64;
        let h = self.height() as f64;
        if h == 0.0 {
            return 0.0;
        }
        w / h
    }

    pub fn bounding_rect(&self) -> Rect {
        Rect {
            x: self.min_x,
            y: self.min_y,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// A rectangle proposed as a possible plate, with its crop from the binary image
#[derive(Debug, Clone)]
pub struct CandidateRegion {
    pub rect: Rect,
    pub image: GrayImage,
}

/// Raw reading reported by a text recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Backend self-reported score, expected in 0-100
    pub confidence: f32,
}

/// A cleaned plate reading.
///
/// Text is never empty and only contains `A-Z`, `0-9` and `-`; confidence is in 0-100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
    text: String,
    confidence: f32,
    coordinates: Option<Rect>,
    preview: Option<String>,
}

impl RecognitionResult {
    pub(crate) fn new(
        text: String,
        confidence: f32,
        coordinates: Option<Rect>,
        preview: Option<String>,
    ) -> Self {
        Self {
            text,
            confidence: clamp_confidence(confidence),
            coordinates,
            preview,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn coordinates(&self) -> Option<Rect> {
        self.coordinates
    }

    /// PNG data URI of the cropped region
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }
}

/// Bring a reported score into 0-100. Non-finite scores count as 0.
pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
