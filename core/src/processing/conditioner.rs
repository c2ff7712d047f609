use crate::math::spline::{CubicRegressionSpline, SplineConfig};
use crate::math::stats::StatsHelper;
use crate::prelude::{ProcessingStage, SonarGeometry, StageError, StageResult};
use crate::sonar_interface::Swath;
use crate::telemetry::log::LogManager;

/// Flattens a channel against its fitted range-falloff trend.
///
/// Samples whose trend value is not strictly positive become `NaN`.
pub fn normalize(channel: &[f64], config: &SplineConfig) -> Vec<f64> {
    let Some(trend) = fit_trend(channel, config) else {
        return channel.to_vec();
    };
    channel
        .iter()
        .zip(trend)
        .map(|(&sample, level)| {
            if level.is_finite() && level > f64::EPSILON {
                sample / level
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Per-sample trend of the channel: the regression spline, or the channel
/// mean when there are too few samples to fit one.
fn fit_trend(channel: &[f64], config: &SplineConfig) -> Option<Vec<f64>> {
    let span = channel.len().saturating_sub(1).max(1) as f64;
    let xs: Vec<f64> = (0..channel.len()).map(|i| i as f64 / span).collect();

    match CubicRegressionSpline::fit(&xs, channel, config) {
        Some(spline) => Some(xs.iter().map(|&x| spline.evaluate(x)).collect()),
        None => StatsHelper::mean(channel).map(|mean| vec![mean; channel.len()]),
    }
}

/// Index of the first sample that can hold a seafloor return at `altitude`,
/// clamped to the channel length.
pub fn blind_zone_boundary(len: usize, altitude: f64, geometry: &SonarGeometry) -> usize {
    let bins = (geometry.first_bottom_return(altitude) / geometry.res).floor();
    if bins.is_nan() || bins <= 0.0 {
        0
    } else {
        (bins as usize).min(len)
    }
}

/// Marks the near-range samples in front of the first bottom return as missing.
pub fn remove_blind_zone(channel: &mut [f64], altitude: f64, geometry: &SonarGeometry) -> usize {
    let boundary = blind_zone_boundary(channel.len(), altitude, geometry);
    channel[..boundary].fill(f64::NAN);
    boundary
}

/// Intensity normalization followed by blind-zone removal.
pub struct SignalConditioner {
    spline: SplineConfig,
    geometry: Option<SonarGeometry>,
    logger: LogManager,
}

impl SignalConditioner {
    pub fn new(spline: SplineConfig) -> Self {
        Self {
            spline,
            geometry: None,
            logger: LogManager::new("sonarcore::conditioner"),
        }
    }
}

impl ProcessingStage for SignalConditioner {
    type Input = Swath;
    type Output = Swath;

    fn initialize(&mut self, geometry: &SonarGeometry) -> StageResult<()> {
        self.geometry = Some(*geometry);
        Ok(())
    }

    fn execute(&mut self, mut swath: Swath) -> StageResult<Swath> {
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
        if !(swath.altitude.is_finite() && swath.altitude > 0.0) {
            return Err(StageError::InvalidInput(format!(
                "altitude {} is not positive",
                swath.altitude
            )));
        }

        swath.right = normalize(&swath.right, &self.spline);
        swath.left = normalize(&swath.left, &self.spline);

        let boundary = remove_blind_zone(&mut swath.right, swath.altitude, geometry);
        remove_blind_zone(&mut swath.left, swath.altitude, geometry);

        self.logger.detail(&format!(
            "conditioned swath: blind zone {} of {} bins, rms {:.4}/{:.4}",
            boundary,
            swath.len(),
            StatsHelper::rms(&swath.right),
            StatsHelper::rms(&swath.left)
        ));
        Ok(swath)
    }

    fn cleanup(&mut self) {
        self.geometry = None;
    }
}
