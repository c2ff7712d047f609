use crate::prelude::{StageError, StageResult};
use crate::sonar_interface::Swath;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// What to do with an incoming swath when the ingest queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Discard the oldest queued swath to make room.
    #[default]
    DropOldest,
    /// Refuse the incoming swath.
    RejectNewest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    pub policy: BackpressurePolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            policy: BackpressurePolicy::DropOldest,
        }
    }
}

/// Bounded FIFO of swaths awaiting conditioning.
pub struct SwathQueue {
    swaths: VecDeque<Swath>,
    capacity: usize,
    policy: BackpressurePolicy,
}

impl SwathQueue {
    pub fn with_config(config: QueueConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            swaths: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            policy: config.policy,
        }
    }

    /// Enqueues a swath, returning the swath displaced under `DropOldest`.
    pub fn push(&mut self, swath: Swath) -> StageResult<Option<Swath>> {
        if self.swaths.len() < self.capacity {
            self.swaths.push_back(swath);
            return Ok(None);
        }
        match self.policy {
            BackpressurePolicy::DropOldest => {
                let displaced = self.swaths.pop_front();
                self.swaths.push_back(swath);
                Ok(displaced)
            }
            BackpressurePolicy::RejectNewest => Err(StageError::BufferExhaustion(format!(
                "ingest queue full ({} swaths)",
                self.capacity
            ))),
        }
    }

    pub fn pop(&mut self) -> Option<Swath> {
        self.swaths.pop_front()
    }

    pub fn len(&self) -> usize {
        self.swaths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaths.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
