use crate::prelude::{StageError, StageResult};
use crate::processing::queue::{QueueConfig, SwathQueue};
use crate::sonar_interface::{AltitudeReading, NavigationState, PoseUpdate, SonarFrame, Swath};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Width of one big-endian unsigned sample in the raw channel bytes.
    pub bytes_per_sample: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            bytes_per_sample: 1,
        }
    }
}

/// Result of handing a sonar frame to the ingestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Enqueued,
    /// No pose has been observed yet; the frame was dropped.
    AwaitingPose,
    /// Enqueued, but the queue was full and its oldest swath was discarded.
    DisplacedOldest,
}

/// Builds swaths from raw frames and the latest navigation snapshot.
pub struct SwathIngestor {
    config: IngestConfig,
    altitude: f64,
    state: Option<NavigationState>,
    queue: SwathQueue,
    logger: LogManager,
}

impl SwathIngestor {
    pub fn new(config: IngestConfig, queue: QueueConfig) -> Self {
        Self {
            config,
            altitude: 0.0,
            state: None,
            queue: SwathQueue::with_config(queue),
            logger: LogManager::new("sonarcore::ingest"),
        }
    }

    /// Retains the reading unless it is the invalid sentinel; returns whether it was kept.
    pub fn on_altitude(&mut self, reading: AltitudeReading) -> bool {
        if reading.is_valid() {
            self.altitude = reading.altitude;
            true
        } else {
            self.logger.detail(&format!(
                "ignoring invalid altitude {}, keeping {:.3}",
                reading.altitude, self.altitude
            ));
            false
        }
    }

    pub fn on_pose(&mut self, update: &PoseUpdate) {
        if self.state.is_none() {
            self.logger.record("first pose received, swath ingestion enabled");
        }
        self.state = Some(NavigationState::from(update));
    }

    pub fn on_sonar(&mut self, frame: &SonarFrame) -> StageResult<IngestOutcome> {
        let Some(state) = self.state else {
            self.logger.detail("sonar frame before first pose, dropped");
            return Ok(IngestOutcome::AwaitingPose);
        };

        let right = decode_channel(&frame.right, self.config.bytes_per_sample)?;
        let left = decode_channel(&frame.left, self.config.bytes_per_sample)?;
        if right.len() != left.len() {
            return Err(StageError::InvalidInput(format!(
                "channel length mismatch: right {} vs left {}",
                right.len(),
                left.len()
            )));
        }

        let swath = Swath::new(right, left, state, self.altitude);
        match self.queue.push(swath)? {
            None => Ok(IngestOutcome::Enqueued),
            Some(_) => {
                self.logger.warn(&format!(
                    "ingest queue at capacity {}, dropped oldest swath",
                    self.queue.capacity()
                ));
                Ok(IngestOutcome::DisplacedOldest)
            }
        }
    }

    pub fn next_swath(&mut self) -> Option<Swath> {
        self.queue.pop()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }
}

/// Decodes a channel of fixed-width big-endian unsigned samples.
pub fn decode_channel(bytes: &[u8], bytes_per_sample: usize) -> StageResult<Vec<f64>> {
    if bytes_per_sample == 0 || bytes_per_sample > 8 {
        return Err(StageError::InvalidInput(format!(
            "unsupported sample width {} bytes",
            bytes_per_sample
        )));
    }
    if bytes.len() % bytes_per_sample != 0 {
        return Err(StageError::InvalidInput(format!(
            "{} bytes is not a whole number of {}-byte samples",
            bytes.len(),
            bytes_per_sample
        )));
    }

    Ok(bytes
        .chunks_exact(bytes_per_sample)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte)) as f64
        })
        .collect())
}
