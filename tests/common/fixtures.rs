#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use image::{DynamicImage, GrayImage, Luma};
use platesight::camera::FrameSource;
use platesight::core::db::{ActivityLog, NewActivity};
use platesight::error::Result;
use platesight::{AlprError, RecognitionPipeline, RecognizedText, TextRecognizer};

/// In-memory recognizer that replays canned readings.
///
/// Readings cycle by call index. Counters record how the pipeline drove it.
#[derive(Default)]
pub struct ScriptedRecognizer {
    responses: Vec<(String, f32)>,
    delay: Option<Duration>,
    failing_calls: Vec<usize>,
    lose_engine_at: Option<usize>,
    fail_init: bool,
    ready: AtomicBool,
    pub inits: AtomicUsize,
    pub terminates: AtomicUsize,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = (S, f32)>) -> Self {
        Self {
            responses: responses
                .into_iter()
                .map(|(text, conf)| (text.into(), conf))
                .collect(),
            ..Default::default()
        }
    }

    /// A recognizer whose engine never starts
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Default::default()
        }
    }

    /// Sleep this long inside every recognize call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail the recognize calls with these indices
    pub fn failing_calls(mut self, calls: &[usize]) -> Self {
        self.failing_calls = calls.to_vec();
        self
    }

    /// Drop the engine when the given call arrives, as if the backend died
    pub fn losing_engine_at(mut self, call: usize) -> Self {
        self.lose_engine_at = Some(call);
        self
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn terminates(&self) -> usize {
        self.terminates.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for ScriptedRecognizer {
    async fn initialize(&self) -> Result<()> {
        if self.fail_init {
            return Err(AlprError::EngineInit("models missing".to_string()));
        }
        if !self.ready.swap(true, Ordering::SeqCst) {
            self.inits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn recognize(&self, _region: &GrayImage) -> Result<RecognizedText> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(AlprError::EngineNotReady);
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.lose_engine_at == Some(call) {
            self.ready.store(false, Ordering::SeqCst);
            return Err(AlprError::EngineNotReady);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_calls.contains(&call) {
            return Err(AlprError::Recognition(format!("call {} failed", call)));
        }
        let (text, confidence) = self
            .responses
            .get(call % self.responses.len().max(1))
            .cloned()
            .unwrap_or_default();
        Ok(RecognizedText { text, confidence })
    }

    async fn terminate(&self) {
        self.ready.store(false, Ordering::SeqCst);
        self.terminates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pipeline over a shared scripted recognizer
pub fn scripted_pipeline(
    recognizer: ScriptedRecognizer,
) -> (RecognitionPipeline<ScriptedRecognizer>, Arc<ScriptedRecognizer>) {
    let recognizer = Arc::new(recognizer);
    (RecognitionPipeline::new(recognizer.clone()), recognizer)
}

/// Black canvas with white plates at the given `(x, y, width, height)` rects.
///
/// Each plate carries dark glyph blocks so it looks like a plate rather than a
/// solid bar; the blocks are too small to pass the plate filter themselves.
pub fn plate_canvas(width: u32, height: u32, plates: &[(u32, u32, u32, u32)]) -> DynamicImage {
    let mut img = GrayImage::new(width, height);
    for &(px, py, pw, ph) in plates {
        fill(&mut img, px, py, pw, ph, 255);
        let glyph_h = ph / 2;
        let glyph_y = py + ph / 4;
        let mut gx = px + 30;
        while gx + 20 < px + pw - 20 {
            fill(&mut img, gx, glyph_y, 20, glyph_h, 0);
            gx += 60;
        }
    }
    DynamicImage::ImageLuma8(img)
}

/// Single 300x80 plate at (40, 50) on a 400x200 canvas
pub fn single_plate_image() -> DynamicImage {
    plate_canvas(400, 200, &[(40, 50, 300, 80)])
}

/// Two plates, one above the other, on a 400x300 canvas
pub fn two_plate_image() -> DynamicImage {
    plate_canvas(400, 300, &[(20, 20, 300, 80), (20, 200, 240, 60)])
}

/// 300x80 light-grey plate photo cropped to the plate edges
pub fn full_frame_plate_image() -> DynamicImage {
    let mut img = GrayImage::from_pixel(300, 80, Luma([235]));
    for gx in [30, 90, 150, 210] {
        fill(&mut img, gx, 20, 20, 40, 20);
    }
    DynamicImage::ImageLuma8(img)
}

pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::new(320, 240))
}

/// A white 100x100 square: large enough but the wrong shape for a plate
pub fn square_image() -> DynamicImage {
    let mut img = GrayImage::new(300, 300);
    fill(&mut img, 100, 100, 100, 100, 255);
    DynamicImage::ImageLuma8(img)
}

fn fill(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, Luma([value]));
        }
    }
}

/// Frame source replaying in-memory images
pub struct VecFrameSource {
    frames: VecDeque<DynamicImage>,
}

impl VecFrameSource {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for VecFrameSource {
    async fn next_frame(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        Ok(self.frames.pop_front())
    }
}

/// Creates an ActivityLog in a temporary directory.
/// Returns both the log and the temp directory (which must be kept alive).
pub async fn create_test_log() -> (ActivityLog, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let log = ActivityLog::open(dir.path().join("activity.db"))
        .await
        .expect("Failed to open activity log");
    (log, dir)
}

pub fn make_activity(plate: &str, is_legal: bool, confidence: f32) -> NewActivity {
    NewActivity {
        plate_number: plate.to_string(),
        region: "US-CA".to_string(),
        is_legal,
        confidence,
    }
}
