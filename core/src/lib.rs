//! Core swath processing and mosaicking for side-scan sonar surveys.
//!
//! Raw pings are paired with the latest navigation, conditioned, placed in the
//! survey frame, and periodically gridded into overlapping mosaic tiles.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod sonar_interface;
pub mod store;
pub mod telemetry;

pub use prelude::{ProcessingStage, SonarGeometry, StageError, StageResult};
pub use processing::{PipelineConfig, PipelineContext, SharedPipeline};
