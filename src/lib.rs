pub mod camera;
pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod legality;
pub mod models;
pub mod pipeline;

pub use camera::{CameraSampler, DirectoryFrameSource, FrameSource, SamplerHandle};
pub use detection::{OcrsRecognizer, PlateGeometry, TextRecognizer};
pub use error::AlprError;
pub use models::{CandidateRegion, Contour, RecognitionResult, RecognizedText, Rect};
pub use pipeline::{PipelineState, RecognitionPipeline};
