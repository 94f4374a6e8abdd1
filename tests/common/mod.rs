mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from platesight for tests
pub use platesight::core::db::{ActivityLog, ActivityRepository, NewActivity};
pub use platesight::{AlprError, PipelineState, RecognitionPipeline, RecognitionResult, Rect};
