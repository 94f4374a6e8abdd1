use std::sync::Arc;

use image::DynamicImage;
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{debug, info, warn};

use crate::detection::{aggregate, plates, preprocessing};
use crate::detection::ocr::TextRecognizer;
use crate::detection::plates::PlateGeometry;
use crate::error::{AlprError, Result};
use crate::models::{CandidateRegion, RecognitionResult};

/// Lifecycle of the recognizer owned by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Initializing,
    Ready,
    Terminated,
}

/// Orchestrates preprocessing, region proposal, OCR and aggregation.
///
/// Every call (initialize, recognize, terminate) goes through one async gate, so
/// the recognizer never sees two requests interleave. `recognize` waits for its
/// turn; [`RecognitionPipeline::try_recognize`] gives up with
/// [`AlprError::Busy`] instead.
pub struct RecognitionPipeline<R: TextRecognizer> {
    recognizer: Arc<R>,
    geometry: PlateGeometry,
    gate: Mutex<()>,
    state: watch::Sender<PipelineState>,
}

impl<R: TextRecognizer> RecognitionPipeline<R> {
    pub fn new(recognizer: Arc<R>) -> Self {
        Self {
            recognizer,
            geometry: PlateGeometry::default(),
            gate: Mutex::new(()),
            state: watch::Sender::new(PipelineState::Uninitialized),
        }
    }

    /// Override the plate footprint used by the region filter
    pub fn with_geometry(mut self, geometry: PlateGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn geometry(&self) -> &PlateGeometry {
        &self.geometry
    }

    pub fn recognizer(&self) -> &Arc<R> {
        &self.recognizer
    }

    /// Current lifecycle state, readable while a call is in flight
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Start the recognizer. A no-op when already ready.
    pub async fn initialize(&self) -> Result<()> {
        let gate = self.gate.lock().await;
        self.initialize_locked(&gate).await
    }

    /// Recognize plates in one image, waiting for any in-flight call first.
    ///
    /// Results are ordered by descending confidence; equal scores keep their
    /// discovery order. An image without usable regions yields an empty list.
    pub async fn recognize(&self, image: DynamicImage) -> Result<Vec<RecognitionResult>> {
        let gate = self.gate.lock().await;
        self.recognize_locked(&gate, image).await
    }

    /// Like [`RecognitionPipeline::recognize`] but fails with
    /// [`AlprError::Busy`] rather than waiting.
    pub async fn try_recognize(&self, image: DynamicImage) -> Result<Vec<RecognitionResult>> {
        let gate = self.gate.try_lock().map_err(|_| AlprError::Busy)?;
        self.recognize_locked(&gate, image).await
    }

    /// Release the recognizer. Idempotent, and safe before any initialize.
    pub async fn terminate(&self) {
        let _gate = self.gate.lock().await;
        self.recognizer.terminate().await;
        if self.state.send_replace(PipelineState::Terminated) != PipelineState::Terminated {
            info!("Recognition pipeline terminated");
        }
    }

    async fn initialize_locked(&self, _gate: &MutexGuard<'_, ()>) -> Result<()> {
        let previous = match self.state() {
            PipelineState::Ready => {
                debug!("Recognition pipeline already initialized");
                return Ok(());
            }
            // Left behind by an initialize call whose future was dropped
            PipelineState::Initializing => PipelineState::Uninitialized,
            state => state,
        };

        self.state.send_replace(PipelineState::Initializing);
        match self.recognizer.initialize().await {
            Ok(()) => {
                self.state.send_replace(PipelineState::Ready);
                info!("Recognition pipeline ready");
                Ok(())
            }
            Err(e) => {
                self.state.send_replace(previous);
                warn!(error = %e, "Recognition pipeline failed to initialize");
                Err(match e {
                    AlprError::EngineInit(_) => e,
                    other => AlprError::EngineInit(other.to_string()),
                })
            }
        }
    }

    async fn recognize_locked(
        &self,
        gate: &MutexGuard<'_, ()>,
        image: DynamicImage,
    ) -> Result<Vec<RecognitionResult>> {
        if self.state() != PipelineState::Ready {
            self.initialize_locked(gate).await?;
        }

        let geometry = self.geometry;
        let regions = tokio::task::spawn_blocking(move || -> Result<Vec<CandidateRegion>> {
            let binary = preprocessing::preprocess(&image)?;
            drop(image);
            Ok(plates::propose(&binary, &geometry))
        })
        .await
        .map_err(AlprError::invalid_image)??;

        debug!(regions = regions.len(), "Proposed candidate regions");

        let mut results = Vec::new();
        for (index, region) in regions.into_iter().enumerate() {
            let reading = match self.recognizer.recognize(&region.image).await {
                Err(AlprError::EngineNotReady) => {
                    warn!(index, "OCR engine went away, re-initializing");
                    self.state.send_replace(PipelineState::Uninitialized);
                    self.initialize_locked(gate).await?;
                    self.recognizer.recognize(&region.image).await
                }
                other => other,
            };

            match reading {
                Ok(raw) => {
                    if let Some(result) = aggregate::aggregate(&region, &raw.text, raw.confidence) {
                        debug!(
                            index,
                            text = result.text(),
                            confidence = result.confidence(),
                            "Region recognized"
                        );
                        results.push(result);
                    } else {
                        debug!(index, raw = %raw.text, "Discarded unusable reading");
                    }
                }
                Err(e) => {
                    warn!(index, error = %e, "Skipping region after recognition failure");
                }
            }
        }

        // Stable: equal confidences keep discovery order
        results.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        Ok(results)
    }
}
