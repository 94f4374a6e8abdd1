use thiserror::Error;

/// Errors surfaced by the recognition core.
///
/// The core only classifies and propagates; presenting these to a user is the
/// caller's job.
#[derive(Debug, Error)]
pub enum AlprError {
    /// Malformed, empty or undecodable input. Fatal for the call, no partial output.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The OCR backend failed to start.
    #[error("OCR engine failed to initialize: {0}")]
    EngineInit(String),

    /// Recognition was attempted against an engine that is not initialized.
    #[error("OCR engine is not ready")]
    EngineNotReady,

    /// OCR failed for a single crop. Non-fatal at the pipeline level.
    #[error("Recognition failed: {0}")]
    Recognition(String),

    /// Another recognition is in flight and the caller asked not to wait.
    #[error("A recognition is already in flight")]
    Busy,
}

impl AlprError {
    pub(crate) fn invalid_image(err: impl std::fmt::Display) -> Self {
        Self::InvalidImage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AlprError>;
