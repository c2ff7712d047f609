use serde::Serialize;
use std::sync::Mutex;

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_received: usize,
    pub frames_before_pose: usize,
    pub frames_rejected: usize,
    pub swaths_enqueued: usize,
    pub swaths_dropped: usize,
    pub swaths_processed: usize,
    pub swaths_skipped: usize,
    pub mosaics_built: usize,
    pub builds_skipped: usize,
    pub smoothing_failures: usize,
    pub store_failures: usize,
}

/// Counter events recorded by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    FrameReceived,
    FrameBeforePose,
    FrameRejected,
    SwathEnqueued,
    SwathDropped,
    SwathProcessed,
    SwathSkipped,
    MosaicBuilt,
    BuildSkipped,
    SmoothingFailed,
    StoreFailed,
}

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record(&self, event: Event) {
        if let Ok(mut metrics) = self.inner.lock() {
            let counter = match event {
                Event::FrameReceived => &mut metrics.frames_received,
                Event::FrameBeforePose => &mut metrics.frames_before_pose,
                Event::FrameRejected => &mut metrics.frames_rejected,
                Event::SwathEnqueued => &mut metrics.swaths_enqueued,
                Event::SwathDropped => &mut metrics.swaths_dropped,
                Event::SwathProcessed => &mut metrics.swaths_processed,
                Event::SwathSkipped => &mut metrics.swaths_skipped,
                Event::MosaicBuilt => &mut metrics.mosaics_built,
                Event::BuildSkipped => &mut metrics.builds_skipped,
                Event::SmoothingFailed => &mut metrics.smoothing_failures,
                Event::StoreFailed => &mut metrics.store_failures,
            };
            *counter += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_events() {
        let recorder = MetricsRecorder::new();
        recorder.record(Event::SwathProcessed);
        recorder.record(Event::SwathProcessed);
        recorder.record(Event::StoreFailed);
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.swaths_processed, 2);
        assert_eq!(snapshot.store_failures, 1);
        assert_eq!(snapshot.mosaics_built, 0);
    }
}
