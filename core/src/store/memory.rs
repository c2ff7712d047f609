use crate::sonar_interface::MosaicFrame;
use crate::store::{FrameStore, StoreError, StoreResult};
use std::sync::{Arc, Mutex};

/// Keeps stored mosaics in memory. Clones share the same frame list, so a
/// handle kept by the caller observes frames stored through the pipeline.
#[derive(Clone, Default)]
pub struct MemoryFrameStore {
    frames: Arc<Mutex<Vec<MosaicFrame>>>,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frames(&self) -> Vec<MosaicFrame> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }
}

impl FrameStore for MemoryFrameStore {
    fn store(&mut self, frame: &MosaicFrame) -> StoreResult<()> {
        let mut frames = self.frames.lock().map_err(|_| StoreError::Poisoned)?;
        frames.push(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonar_interface::ScatterSet;
    use std::thread;

    fn frame(index: u64) -> MosaicFrame {
        let mut scatter = ScatterSet::default();
        scatter.push(-1.0, 0.0, 4.0);
        MosaicFrame {
            index,
            swath_count: 100,
            scatter,
            linear: None,
            smoothing: None,
        }
    }

    #[test]
    fn clones_observe_stored_frames() {
        let handle = MemoryFrameStore::new();
        let mut sink = handle.clone();
        sink.store(&frame(1)).unwrap();
        sink.store(&frame(2)).unwrap();
        assert_eq!(handle.len(), 2);
        assert_eq!(handle.frames()[1].index, 2);
    }

    #[test]
    fn poisoned_lock_reports_an_error() {
        let mut store = MemoryFrameStore::new();
        let shared = store.clone();
        let _ = thread::spawn(move || {
            let _guard = shared.frames.lock().unwrap();
            panic!("writer died holding the frame list");
        })
        .join();

        assert!(matches!(store.store(&frame(1)), Err(StoreError::Poisoned)));
    }
}
