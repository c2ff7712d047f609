use crate::generator::profile::MissionConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use sonarcore::processing::PipelineConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything one simulated survey needs: the pipeline settings, the mission
/// to synthesize, and where to write mosaics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub pipeline: PipelineConfig,
    pub mission: MissionConfig,
    /// Mosaics are kept in memory when unset.
    pub output_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading session config {}", path_ref.display()))?;
        let config: SessionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing session config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(samples: usize, legs: usize, pings_per_leg: usize, seed: u64) -> Self {
        let mut config = Self::default();
        config.pipeline.geometry.n_samples = samples;
        config.mission.legs = legs;
        config.mission.pings_per_leg = pings_per_leg;
        config.mission.seed = seed;
        config
    }

    pub fn to_pipeline_config(&self) -> PipelineConfig {
        self.pipeline.clone()
    }

    /// Samples per channel the generator should emit.
    pub fn samples(&self) -> usize {
        self.pipeline.geometry.n_samples.max(1)
    }
}
