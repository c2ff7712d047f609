pub mod conditioner;
pub mod corrector;
pub mod ingest;
pub mod mosaic;
pub mod queue;
pub mod scheduler;
pub mod smoothing;

pub use conditioner::SignalConditioner;
pub use corrector::GeometricCorrector;
pub use ingest::{IngestConfig, IngestOutcome, SwathIngestor};
pub use mosaic::{
    BuildReport, GridError, MosaicAssembler, MosaicConfig, EVICTION_COUNT, TRIGGER_PERIOD,
};
pub use queue::{BackpressurePolicy, QueueConfig, SwathQueue};
pub use scheduler::{
    MosaicOutcome, PipelineConfig, PipelineContext, SharedPipeline, SwathOutcome, TickOutcome,
};
pub use smoothing::{KnnConfig, KnnSmoother, SmoothingError, Smoother};
