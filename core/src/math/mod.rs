pub mod matrix;
pub mod quaternion;
pub mod spline;
pub mod stats;
pub mod triangulation;

pub use matrix::MatrixHelper;
pub use quaternion::quaternion_to_pitch_yaw;
pub use spline::{CubicRegressionSpline, SplineConfig};
pub use stats::StatsHelper;
pub use triangulation::{Delaunay, LinearInterpolator};
