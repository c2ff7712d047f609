//! Persistence boundary for assembled mosaics.

pub mod csv;
pub mod memory;

pub use self::csv::CsvFrameStore;
pub use self::memory::MemoryFrameStore;

use crate::sonar_interface::MosaicFrame;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("i/o failure writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest serialization failed: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("frame store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Receives every completed mosaic build.
pub trait FrameStore: Send {
    fn store(&mut self, frame: &MosaicFrame) -> StoreResult<()>;
}
