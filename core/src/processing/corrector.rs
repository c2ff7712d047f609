use crate::math::quaternion::quaternion_to_pitch_yaw;
use crate::prelude::{ProcessingStage, SonarGeometry, StageError, StageResult};
use crate::sonar_interface::{CoordinateFrame, Swath};
use crate::telemetry::log::LogManager;

/// Source bins and blend weights feeding one ground-range sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundBin {
    pub exact: f64,
    pub floor: usize,
    pub ceiling: usize,
    /// Weight of the ceiling bin.
    pub w1: f64,
    /// Weight of the floor bin.
    pub w2: f64,
}

/// Slant-range bins sampled for each ground-range index of an `n`-sample channel.
pub fn ground_bins(n: usize, altitude: f64, res: f64) -> Vec<GroundBin> {
    let last = n.saturating_sub(1);
    (0..n)
        .map(|s| {
            let exact = ((res * s as f64).powi(2) + altitude.powi(2)).sqrt() / res;
            let floor = (exact.floor() as usize).min(last);
            let ceiling = (exact.ceil() as usize).min(last);
            let w1 = exact - floor as f64;
            GroundBin {
                exact,
                floor,
                ceiling,
                w1,
                w2: 1.0 - w1,
            }
        })
        .collect()
}

fn resample(channel: &[f64], bins: &[GroundBin]) -> Vec<f64> {
    bins.iter()
        .map(|bin| bin.w2 * channel[bin.floor] + bin.w1 * channel[bin.ceiling])
        .collect()
}

/// Remaps both channels from equal slant-range steps to equal ground-range steps.
pub fn slant_to_ground(swath: &mut Swath, res: f64) {
    let bins = ground_bins(swath.len(), swath.altitude, res);
    swath.right = resample(&swath.right, &bins);
    swath.left = resample(&swath.left, &bins);
}

/// Places every sample of the swath in the global frame using its captured pose.
pub fn project(swath: &Swath, geometry: &SonarGeometry) -> CoordinateFrame {
    let state = &swath.state;
    let (pitch, yaw) = quaternion_to_pitch_yaw(state.qw, state.qx, state.qy, state.qz);
    let altitude = swath.altitude;
    let step = geometry.ground_resolution(altitude);

    let along_x = pitch.sin() * yaw.cos() * altitude;
    let along_y = pitch.sin() * yaw.sin() * altitude;
    let (sin_yaw, cos_yaw) = yaw.sin_cos();

    let mut frame = CoordinateFrame::with_samples(swath.len());
    let table = frame.table_mut();
    for s in 0..swath.len() {
        let across = s as f64 * step;
        table[[CoordinateFrame::X_RIGHT, s]] = -(state.x + sin_yaw * across + along_x);
        table[[CoordinateFrame::X_LEFT, s]] = -(state.x - sin_yaw * across + along_x);
        table[[CoordinateFrame::Y_RIGHT, s]] = -state.y + cos_yaw * across - along_y;
        table[[CoordinateFrame::Y_LEFT, s]] = -state.y - cos_yaw * across - along_y;
        table[[CoordinateFrame::INTENSITY_RIGHT, s]] = swath.right[s];
        table[[CoordinateFrame::INTENSITY_LEFT, s]] = swath.left[s];
    }

    frame
}

/// Slant-range correction followed by pose projection.
pub struct GeometricCorrector {
    geometry: Option<SonarGeometry>,
    logger: LogManager,
}

impl GeometricCorrector {
    pub fn new() -> Self {
        Self {
            geometry: None,
            logger: LogManager::new("sonarcore::corrector"),
        }
    }
}

impl Default for GeometricCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for GeometricCorrector {
    type Input = Swath;
    type Output = CoordinateFrame;

    fn initialize(&mut self, geometry: &SonarGeometry) -> StageResult<()> {
        if !(geometry.res.is_finite() && geometry.res > 0.0) {
            return Err(StageError::InvalidInput(format!(
                "range resolution {} must be positive",
                geometry.res
            )));
        }
        self.geometry = Some(*geometry);
        Ok(())
    }

    fn execute(&mut self, mut swath: Swath) -> StageResult<CoordinateFrame> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        if !swath.channels_balanced() {
            return Err(StageError::InvalidInput(format!(
                "channel length mismatch: right {} vs left {}",
                swath.right.len(),
                swath.left.len()
            )));
        }

        slant_to_ground(&mut swath, geometry.res);
        let frame = project(&swath, geometry);
        self.logger.detail(&format!(
            "projected {} samples at ({:.2}, {:.2})",
            frame.len(),
            swath.state.x,
            swath.state.y
        ));
        Ok(frame)
    }

    fn cleanup(&mut self) {
        self.geometry = None;
    }
}
