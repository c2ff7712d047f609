use serde::{Deserialize, Serialize};

/// Session-fixed side-scan transducer geometry shared by every stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonarGeometry {
    /// Vertical beam opening angle (radians).
    pub alpha: f64,
    /// Depression (tilt) angle of the beam axis (radians).
    pub theta: f64,
    /// Slant-range resolution of one sample (metres).
    pub res: f64,
    /// Nominal number of samples per channel.
    pub n_samples: usize,
}

impl Default for SonarGeometry {
    fn default() -> Self {
        Self {
            alpha: 50f64.to_radians(),
            theta: 30f64.to_radians(),
            res: 0.0625,
            n_samples: 1000,
        }
    }
}

impl SonarGeometry {
    /// Slant range of the first bottom return for the given altitude.
    pub fn first_bottom_return(&self, altitude: f64) -> f64 {
        altitude / (self.theta + self.alpha / 2.0).sin()
    }

    /// Across-track ground distance covered by one sample at the given altitude.
    pub fn ground_resolution(&self, altitude: f64) -> f64 {
        let spread = (self.theta + self.alpha / 2.0).tan() - (self.theta - self.alpha / 2.0).tan();
        spread * altitude / self.n_samples.max(1) as f64
    }
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("buffer exhaustion: {0}")]
    BufferExhaustion(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type StageResult<T> = Result<T, StageError>;

/// Trait describing the per-swath processing stages driven by the scheduler.
pub trait ProcessingStage {
    type Input;
    type Output;

    fn initialize(&mut self, geometry: &SonarGeometry) -> StageResult<()>;
    fn execute(&mut self, input: Self::Input) -> StageResult<Self::Output>;
    fn cleanup(&mut self);
}
