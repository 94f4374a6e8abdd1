use tracing::warn;

use crate::detection::preview;
use crate::models::{CandidateRegion, RecognitionResult};

/// Readings this short are not plausible plates
pub const MIN_PLATE_LEN: usize = 3;

/// Keep only `A-Z`, `0-9` and `-`
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Turn a raw OCR reading of a region into a result, or `None` if the cleaned
/// text is too short.
pub fn aggregate(
    region: &CandidateRegion,
    raw_text: &str,
    raw_confidence: f32,
) -> Option<RecognitionResult> {
    let text = clean_text(raw_text);
    if text.len() < MIN_PLATE_LEN {
        return None;
    }

    let preview = match preview::encode_preview(&region.image) {
        Ok(uri) => Some(uri),
        Err(e) => {
            warn!(error = %e, "Failed to encode region preview");
            None
        }
    };

    Some(RecognitionResult::new(
        text,
        raw_confidence,
        Some(region.rect),
        preview,
    ))
}
