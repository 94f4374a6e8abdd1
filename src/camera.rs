//! Periodic frame sampling
//!
//! A [`CameraSampler`] pulls a frame from a [`FrameSource`] on a fixed cadence
//! and hands it to the recognition pipeline. While a recognition is in flight,
//! ticks are dropped rather than queued, so a slow OCR pass never builds a
//! backlog. Only the best reading of each frame is forwarded.

use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::detection::ingest;
use crate::detection::ocr::TextRecognizer;
use crate::models::RecognitionResult;
use crate::pipeline::RecognitionPipeline;

/// Cadence used when none is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Where frames come from. `Ok(None)` means the source is exhausted.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = anyhow::Result<Option<DynamicImage>>> + Send;
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Milliseconds between samples
    pub interval_ms: u64,
    /// Capacity of the result channel
    pub result_buffer: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            result_buffer: 16,
        }
    }
}

impl CameraSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_INTERVAL)
    }
}

/// Replays encoded image files from a directory, in file name order
pub struct DirectoryFrameSource {
    frames: VecDeque<PathBuf>,
}

impl DirectoryFrameSource {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read frame directory {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(ingest::is_supported_extension)
            })
            .collect();
        frames.sort();

        debug!(dir = %dir.display(), frames = frames.len(), "Opened frame directory");
        Ok(Self {
            frames: frames.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for DirectoryFrameSource {
    async fn next_frame(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        let Some(path) = self.frames.pop_front() else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read frame {:?}", path))?;
        let frame = ingest::decode_image_bytes(&bytes)
            .with_context(|| format!("Failed to decode frame {:?}", path))?;
        Ok(Some(frame))
    }
}

/// Counters maintained by a running sampler
#[derive(Debug, Default)]
pub struct SamplerStats {
    ticks: AtomicU64,
    skipped: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`SamplerStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSnapshot {
    pub ticks: u64,
    pub skipped: u64,
    pub processed: u64,
    pub failed: u64,
}

impl SamplerStats {
    pub fn snapshot(&self) -> SamplerSnapshot {
        SamplerSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Clears the busy flag when a recognition task ends, however it ends
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CameraSampler<R: TextRecognizer, S: FrameSource> {
    pipeline: Arc<RecognitionPipeline<R>>,
    source: S,
    interval: Duration,
    result_buffer: usize,
}

impl<R: TextRecognizer, S: FrameSource> CameraSampler<R, S> {
    pub fn new(pipeline: Arc<RecognitionPipeline<R>>, source: S) -> Self {
        Self {
            pipeline,
            source,
            interval: DEFAULT_INTERVAL,
            result_buffer: CameraSettings::default().result_buffer,
        }
    }

    pub fn with_settings(mut self, settings: &CameraSettings) -> Self {
        self.interval = settings.interval();
        self.result_buffer = settings.result_buffer.max(1);
        self
    }

    /// Sampling period, at least one millisecond
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Start sampling on the current runtime.
    ///
    /// The receiver yields the best result of each frame that produced one and
    /// closes once the source is exhausted and the last recognition finished.
    pub fn spawn(self) -> (SamplerHandle, mpsc::Receiver<RecognitionResult>) {
        let (tx, rx) = mpsc::channel(self.result_buffer);
        let stats = Arc::new(SamplerStats::default());
        let task = tokio::spawn(self.run(stats.clone(), tx));
        (SamplerHandle { task, stats }, rx)
    }

    async fn run(mut self, stats: Arc<SamplerStats>, results: mpsc::Sender<RecognitionResult>) {
        let busy = Arc::new(AtomicBool::new(false));
        // First sample one full period after start
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_ms = self.interval.as_millis() as u64, "Camera sampling started");

        loop {
            ticker.tick().await;
            stats.ticks.fetch_add(1, Ordering::Relaxed);

            if busy.load(Ordering::Acquire) {
                stats.skipped.fetch_add(1, Ordering::Relaxed);
                trace!("Recognition still in flight, dropping tick");
                continue;
            }

            let frame = match self.source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source exhausted, camera sampling stopped");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to capture frame");
                    continue;
                }
            };

            busy.store(true, Ordering::Release);
            let guard = BusyGuard(busy.clone());
            let pipeline = self.pipeline.clone();
            let results = results.clone();
            let stats = stats.clone();

            tokio::spawn(async move {
                let _guard = guard;
                match pipeline.recognize(frame).await {
                    Ok(found) => {
                        stats.processed.fetch_add(1, Ordering::Relaxed);
                        if let Some(best) = found.into_iter().next() {
                            debug!(text = best.text(), confidence = best.confidence(), "Plate sighted");
                            if results.send(best).await.is_err() {
                                debug!("Result receiver dropped, discarding reading");
                            }
                        }
                    }
                    Err(e) => {
                        stats.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "Frame recognition failed");
                    }
                }
            });
        }
    }
}

/// Control handle for a running sampler
pub struct SamplerHandle {
    task: JoinHandle<()>,
    stats: Arc<SamplerStats>,
}

impl SamplerHandle {
    pub fn stats(&self) -> SamplerSnapshot {
        self.stats.snapshot()
    }

    /// Stop sampling. A recognition already in flight still runs to completion.
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the sampling loop ends
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Camera sampling task failed");
            }
        }
    }
}
