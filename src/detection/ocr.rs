use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AlprError, Result};
use crate::models::RecognizedText;

/// Characters a plate can contain
pub const PLATE_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";

/// An OCR backend with an explicit lifecycle.
///
/// `initialize` must be idempotent and must not build a second engine when
/// called again before the first call finishes. `terminate` must be safe to call
/// at any time, including before any `initialize`. After `terminate`,
/// `recognize` fails with [`AlprError::EngineNotReady`] until re-initialized.
pub trait TextRecognizer: Send + Sync + 'static {
    fn initialize(&self) -> impl Future<Output = Result<()>> + Send;

    /// Read the text in one candidate region
    fn recognize(&self, region: &GrayImage) -> impl Future<Output = Result<RecognizedText>> + Send;

    fn terminate(&self) -> impl Future<Output = ()> + Send;
}

/// Settings for the `ocrs` backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Directory holding `text-detection.rten` and `text-recognition.rten`
    pub model_dir: PathBuf,
    /// Characters the recognizer may emit
    pub allowed_chars: String,
    /// Score reported for non-empty readings; `ocrs` does not produce one
    pub assumed_confidence: f32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            allowed_chars: PLATE_CHARSET.to_string(),
            assumed_confidence: 90.0,
        }
    }
}

/// Standard `ocrs` model cache location
pub fn default_model_dir() -> PathBuf {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home_dir).join(".cache/ocrs")
}

/// Build an `ocrs` engine from the models in `settings.model_dir`
pub fn init_ocr_engine(settings: &OcrSettings) -> anyhow::Result<OcrEngine> {
    let detection_model_path = settings.model_dir.join("text-detection.rten");
    let recognition_model_path = settings.model_dir.join("text-recognition.rten");

    // Check if models exist
    if !detection_model_path.exists() || !recognition_model_path.exists() {
        anyhow::bail!(
            "OCR models not found. Please run: ocrs-cli --help (or download models manually)\n\
             Expected locations:\n  - {}\n  - {}",
            detection_model_path.display(),
            recognition_model_path.display()
        );
    }

    let detection_model = Model::load_file(&detection_model_path)
        .with_context(|| format!("Failed to load {}", detection_model_path.display()))?;
    let recognition_model = Model::load_file(&recognition_model_path)
        .with_context(|| format!("Failed to load {}", recognition_model_path.display()))?;

    let engine = OcrEngine::new(OcrEngineParams {
        detection_model: Some(detection_model),
        recognition_model: Some(recognition_model),
        allowed_chars: Some(settings.allowed_chars.clone()),
        ..Default::default()
    })?;

    Ok(engine)
}

/// Run the engine over one region and return the trimmed text
pub fn read_text(engine: &OcrEngine, region: &GrayImage) -> anyhow::Result<String> {
    // Convert to RGB8 format for OCR
    let img = DynamicImage::ImageLuma8(region.clone()).to_rgb8();

    let img_source = ImageSource::from_bytes(img.as_raw(), img.dimensions())?;
    let ocr_input = engine.prepare_input(img_source)?;
    let text = engine.get_text(&ocr_input)?;
    Ok(text.trim().to_string())
}

/// [`TextRecognizer`] backed by the `ocrs` engine.
///
/// The engine is loaded on the blocking pool and shared with recognition tasks
/// through an `Arc`; the async mutex is held across loading so concurrent
/// initializers wait for the first one instead of loading the models twice.
pub struct OcrsRecognizer {
    settings: OcrSettings,
    engine: Mutex<Option<Arc<OcrEngine>>>,
}

impl OcrsRecognizer {
    pub fn new(settings: OcrSettings) -> Self {
        Self {
            settings,
            engine: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }
}

impl TextRecognizer for OcrsRecognizer {
    async fn initialize(&self) -> Result<()> {
        let mut engine_guard = self.engine.lock().await;
        if engine_guard.is_some() {
            debug!("OCR engine already initialized");
            return Ok(());
        }

        info!(model_dir = %self.settings.model_dir.display(), "Initializing OCR engine");
        let settings = self.settings.clone();
        let engine = tokio::task::spawn_blocking(move || init_ocr_engine(&settings))
            .await
            .map_err(|e| AlprError::EngineInit(e.to_string()))?
            .map_err(|e| AlprError::EngineInit(format!("{:#}", e)))?;

        *engine_guard = Some(Arc::new(engine));
        info!("OCR engine initialized successfully");
        Ok(())
    }

    async fn recognize(&self, region: &GrayImage) -> Result<RecognizedText> {
        // Clone the Arc so the lock is not held while OCR runs
        let engine = self
            .engine
            .lock()
            .await
            .as_ref()
            .cloned()
            .ok_or(AlprError::EngineNotReady)?;

        let region = region.clone();
        let text = tokio::task::spawn_blocking(move || read_text(&engine, &region))
            .await
            .map_err(|e| AlprError::Recognition(e.to_string()))?
            .map_err(|e| AlprError::Recognition(format!("{:#}", e)))?;

        let confidence = if text.is_empty() {
            0.0
        } else {
            self.settings.assumed_confidence
        };
        Ok(RecognizedText { text, confidence })
    }

    async fn terminate(&self) {
        if self.engine.lock().await.take().is_some() {
            info!("OCR engine terminated");
        }
    }
}
