pub mod messages;
pub mod mosaic;
pub mod swath;

pub use messages::{AltitudeReading, NavigationState, PoseUpdate, SonarFrame};
pub use mosaic::{GridRaster, MosaicFrame, MosaicManifest, ScatterSet, SmoothingProducts};
pub use swath::{CoordinateFrame, Swath};
