use crate::generator::profile::MissionEvent;
use crate::workflow::config::SessionConfig;
use anyhow::Context;
use serde::Serialize;
use sonarcore::processing::{PipelineContext, SharedPipeline};
use sonarcore::store::{CsvFrameStore, FrameStore, MemoryFrameStore};
use sonarcore::telemetry::{LogManager, MetricsSnapshot};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub ticks: u64,
    pub interrupted: bool,
    pub metrics: MetricsSnapshot,
}

#[derive(Clone)]
pub struct Runner {
    config: SessionConfig,
    logger: LogManager,
}

impl Runner {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            logger: LogManager::new("simulator::runner"),
        }
    }

    fn build_store(&self) -> anyhow::Result<Box<dyn FrameStore>> {
        match &self.config.output_dir {
            Some(dir) => {
                let store = CsvFrameStore::new(dir)
                    .with_context(|| format!("opening frame store {}", dir.display()))?;
                Ok(Box::new(store))
            }
            None => Ok(Box::new(MemoryFrameStore::new())),
        }
    }

    fn build_context(&self) -> anyhow::Result<PipelineContext> {
        let store = self.build_store()?;
        PipelineContext::new(&self.config.to_pipeline_config(), store)
            .context("initializing pipeline stages")
    }

    /// Feeds every event synchronously, ticking once per sonar frame, then drains.
    pub fn execute_offline(&self, events: &[MissionEvent]) -> anyhow::Result<RunSummary> {
        let mut ctx = self.build_context()?;
        let mut ticks = 0u64;

        for event in events {
            match event {
                MissionEvent::Altitude(reading) => {
                    ctx.on_altitude(*reading);
                }
                MissionEvent::Pose(pose) => ctx.on_pose(pose),
                MissionEvent::Sonar(frame) => {
                    if let Err(err) = ctx.on_sonar(frame) {
                        self.logger.detail(&format!("frame not queued: {}", err));
                    }
                    ctx.tick();
                    ticks += 1;
                }
            }
        }
        ticks += ctx.drain() as u64;
        ctx.shutdown();

        self.logger.record(&format!(
            "offline run finished after {} ticks, {} pending",
            ticks,
            ctx.pending()
        ));
        Ok(RunSummary {
            events: events.len(),
            ticks,
            interrupted: false,
            metrics: ctx.metrics(),
        })
    }

    /// Replays the mission at `ping_interval` per sonar frame while the async
    /// scheduler ticks independently. Stops early when `shutdown` turns true.
    pub async fn execute_realtime(
        &self,
        events: Vec<MissionEvent>,
        ping_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<RunSummary> {
        let pipeline = SharedPipeline::new(self.build_context()?);
        let period = self.config.to_pipeline_config().tick_period();

        let (stop, stopped) = watch::channel(false);
        let scheduler = pipeline.clone();
        let handle = tokio::spawn(async move { scheduler.run_scheduler(period, stopped).await });

        let mut interrupted = false;
        for event in &events {
            match event {
                MissionEvent::Altitude(reading) => {
                    pipeline.on_altitude(*reading)?;
                }
                MissionEvent::Pose(pose) => pipeline.on_pose(pose)?,
                MissionEvent::Sonar(frame) => {
                    tokio::select! {
                        _ = tokio::time::sleep(ping_interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_ok() && *shutdown.borrow() {
                                interrupted = true;
                                break;
                            }
                        }
                    }
                    if let Err(err) = pipeline.on_sonar(frame) {
                        self.logger.detail(&format!("frame not queued: {}", err));
                    }
                }
            }
        }

        if interrupted {
            self.logger.warn("interrupted, abandoning queued swaths");
        } else {
            while pipeline.with(|ctx| ctx.pending())? > 0 {
                tokio::time::sleep(period).await;
            }
        }

        // the scheduler may already have exited on a failed tick
        let _ = stop.send(true);
        let ticks = handle
            .await
            .context("scheduler task panicked")?
            .context("scheduler loop failed")?;

        let metrics = pipeline.with(|ctx| {
            ctx.shutdown();
            ctx.metrics()
        })?;
        self.logger
            .record(&format!("real-time run finished after {} ticks", ticks));
        Ok(RunSummary {
            events: events.len(),
            ticks,
            interrupted,
            metrics,
        })
    }
}
