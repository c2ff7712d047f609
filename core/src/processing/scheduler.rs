use crate::math::spline::SplineConfig;
use crate::prelude::{ProcessingStage, SonarGeometry, StageError, StageResult};
use crate::processing::conditioner::SignalConditioner;
use crate::processing::corrector::GeometricCorrector;
use crate::processing::ingest::{IngestConfig, IngestOutcome, SwathIngestor};
use crate::processing::mosaic::{MosaicAssembler, MosaicConfig};
use crate::processing::queue::QueueConfig;
use crate::processing::smoothing::{KnnConfig, KnnSmoother, Smoother};
use crate::sonar_interface::{AltitudeReading, PoseUpdate, SonarFrame, Swath};
use crate::store::FrameStore;
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::{Event, MetricsRecorder, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Complete session configuration for the processing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub geometry: SonarGeometry,
    pub ingest: IngestConfig,
    pub queue: QueueConfig,
    pub normalization: SplineConfig,
    pub mosaic: MosaicConfig,
    pub smoothing: KnnConfig,
    /// Scheduler tick period in microseconds.
    pub tick_period_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            geometry: SonarGeometry::default(),
            ingest: IngestConfig::default(),
            queue: QueueConfig::default(),
            normalization: SplineConfig::default(),
            mosaic: MosaicConfig::default(),
            smoothing: KnnConfig::default(),
            tick_period_us: 100,
        }
    }
}

impl PipelineConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us.max(1))
    }
}

/// What happened to the swath popped during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwathOutcome {
    /// The ingest queue was empty.
    Idle,
    Processed,
    /// The swath failed conditioning or correction and was discarded.
    Skipped,
}

/// Summary of a mosaic build performed at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicOutcome {
    /// Frame counter of the emitted mosaic, `None` if the build was skipped.
    pub index: Option<u64>,
    pub evicted: usize,
    pub buffer_len: usize,
    pub stored: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub mosaic: Option<MosaicOutcome>,
    pub swath: SwathOutcome,
}

/// All mutable pipeline state: latest navigation, ingest queue, mosaic window.
pub struct PipelineContext {
    ingestor: SwathIngestor,
    conditioner: SignalConditioner,
    corrector: GeometricCorrector,
    assembler: MosaicAssembler,
    store: Box<dyn FrameStore>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl PipelineContext {
    /// Pipeline using the in-process k-NN smoother.
    pub fn new(config: &PipelineConfig, store: Box<dyn FrameStore>) -> StageResult<Self> {
        let smoother = Box::new(KnnSmoother::new(config.smoothing));
        Self::with_smoother(config, smoother, store)
    }

    pub fn with_smoother(
        config: &PipelineConfig,
        smoother: Box<dyn Smoother>,
        store: Box<dyn FrameStore>,
    ) -> StageResult<Self> {
        let mut conditioner = SignalConditioner::new(config.normalization);
        conditioner.initialize(&config.geometry)?;
        let mut corrector = GeometricCorrector::new();
        corrector.initialize(&config.geometry)?;

        Ok(Self {
            ingestor: SwathIngestor::new(config.ingest, config.queue),
            conditioner,
            corrector,
            assembler: MosaicAssembler::new(config.mosaic, smoother),
            store,
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("sonarcore::scheduler"),
        })
    }

    pub fn on_sonar(&mut self, frame: &SonarFrame) -> StageResult<IngestOutcome> {
        self.metrics.record(Event::FrameReceived);
        let outcome = self.ingestor.on_sonar(frame);
        match &outcome {
            Ok(IngestOutcome::Enqueued) => self.metrics.record(Event::SwathEnqueued),
            Ok(IngestOutcome::DisplacedOldest) => {
                self.metrics.record(Event::SwathEnqueued);
                self.metrics.record(Event::SwathDropped);
            }
            Ok(IngestOutcome::AwaitingPose) => self.metrics.record(Event::FrameBeforePose),
            Err(StageError::BufferExhaustion(reason)) => {
                self.logger.warn(&format!("sonar frame dropped: {}", reason));
                self.metrics.record(Event::SwathDropped);
            }
            Err(err) => {
                self.logger.warn(&format!("sonar frame rejected: {}", err));
                self.metrics.record(Event::FrameRejected);
            }
        }
        outcome
    }

    pub fn on_altitude(&mut self, reading: AltitudeReading) -> bool {
        self.ingestor.on_altitude(reading)
    }

    pub fn on_pose(&mut self, update: &PoseUpdate) {
        self.ingestor.on_pose(update);
    }

    /// One scheduler step: build a mosaic if due, then process at most one swath.
    pub fn tick(&mut self) -> TickOutcome {
        let mosaic = if self.assembler.should_build() {
            Some(self.build_mosaic())
        } else {
            None
        };

        let swath = match self.ingestor.next_swath() {
            Some(swath) => self.process(swath),
            None => SwathOutcome::Idle,
        };

        TickOutcome { mosaic, swath }
    }

    /// Ticks until the ingest queue is empty; returns the number of ticks run.
    pub fn drain(&mut self) -> usize {
        let mut ticks = 0;
        while self.ingestor.pending() > 0 {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    fn process(&mut self, swath: Swath) -> SwathOutcome {
        let result = self
            .conditioner
            .execute(swath)
            .and_then(|conditioned| self.corrector.execute(conditioned));
        match result {
            Ok(frame) => {
                self.assembler.push(frame);
                self.metrics.record(Event::SwathProcessed);
                SwathOutcome::Processed
            }
            Err(err) => {
                self.logger.warn(&format!("swath skipped: {}", err));
                self.metrics.record(Event::SwathSkipped);
                SwathOutcome::Skipped
            }
        }
    }

    fn build_mosaic(&mut self) -> MosaicOutcome {
        let report = self.assembler.build();
        if report.smoothing_error.is_some() {
            self.metrics.record(Event::SmoothingFailed);
        }

        let mut outcome = MosaicOutcome {
            index: None,
            evicted: report.evicted,
            buffer_len: report.buffer_len,
            stored: false,
        };
        match report.frame {
            Some(frame) => {
                self.metrics.record(Event::MosaicBuilt);
                outcome.index = Some(frame.index);
                match self.store.store(&frame) {
                    Ok(()) => outcome.stored = true,
                    Err(err) => {
                        self.logger
                            .fail(&format!("failed to store mosaic #{}: {}", frame.index, err));
                        self.metrics.record(Event::StoreFailed);
                    }
                }
            }
            None => self.metrics.record(Event::BuildSkipped),
        }
        outcome
    }

    pub fn pending(&self) -> usize {
        self.ingestor.pending()
    }

    pub fn buffered(&self) -> usize {
        self.assembler.len()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn shutdown(&mut self) {
        self.conditioner.cleanup();
        self.corrector.cleanup();
    }
}

/// Pipeline context behind a single mutex, shared by the inbound handlers and
/// the scheduler so that every entry point is serialized.
#[derive(Clone)]
pub struct SharedPipeline {
    inner: Arc<Mutex<PipelineContext>>,
}

impl SharedPipeline {
    pub fn new(context: PipelineContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut PipelineContext) -> R) -> StageResult<R> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| StageError::Internal("pipeline mutex poisoned".into()))?;
        Ok(f(&mut *guard))
    }

    pub fn on_sonar(&self, frame: &SonarFrame) -> StageResult<IngestOutcome> {
        self.with(|ctx| ctx.on_sonar(frame))?
    }

    pub fn on_altitude(&self, reading: AltitudeReading) -> StageResult<bool> {
        self.with(|ctx| ctx.on_altitude(reading))
    }

    pub fn on_pose(&self, update: &PoseUpdate) -> StageResult<()> {
        self.with(|ctx| ctx.on_pose(update))
    }

    pub fn tick(&self) -> StageResult<TickOutcome> {
        self.with(PipelineContext::tick)
    }

    /// Drives ticks at `period` until `shutdown` turns true or its sender is
    /// dropped. Returns the number of ticks run.
    ///
    /// Each tick runs on the blocking pool since a mosaic build holds the
    /// pipeline mutex for its whole duration.
    pub async fn run_scheduler(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> StageResult<u64> {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let pipeline = self.clone();
                    tokio::task::spawn_blocking(move || pipeline.tick())
                        .await
                        .map_err(|err| {
                            StageError::Internal(format!("scheduler tick aborted: {}", err))
                        })??;
                    ticks += 1;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        Ok(ticks)
    }
}
