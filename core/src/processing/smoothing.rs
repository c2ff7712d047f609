use crate::math::stats::StatsHelper;
use crate::sonar_interface::{GridRaster, SmoothingProducts};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum SmoothingError {
    #[error("scatter sequences differ in length: u {u}, v {v}, intensity {intensity}")]
    MismatchedInput {
        u: usize,
        v: usize,
        intensity: usize,
    },
    #[error("resolution {0} must be positive")]
    InvalidResolution(f64),
    #[error("no finite samples to smooth")]
    NoValidSamples,
    #[error("raster of {cells} cells exceeds the limit of {limit}")]
    RasterTooLarge { cells: usize, limit: usize },
    #[error("smoothing backend failed: {0}")]
    Backend(String),
}

/// Neighbourhood denoising collaborator invoked once per mosaic build.
///
/// Coordinates are in the mosaic display frame. `filtered` in the result
/// must have one value per input point.
pub trait Smoother: Send {
    fn smooth(
        &self,
        resolution: f64,
        e: &[f64],
        v: &[f64],
        intensity: &[f64],
    ) -> Result<SmoothingProducts, SmoothingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    /// Neighbours averaged per query.
    pub k: usize,
    /// Upper bound on raster cells produced per build.
    pub max_cells: usize,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 8,
            max_cells: 4_000_000,
        }
    }
}

#[derive(Debug, Clone)]
struct Sample {
    position: [f64; 2],
    intensity: f64,
}

impl RTreeObject for Sample {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for Sample {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// In-process k-nearest-neighbour smoother backed by an R-tree.
pub struct KnnSmoother {
    config: KnnConfig,
}

impl KnnSmoother {
    pub fn new(config: KnnConfig) -> Self {
        Self { config }
    }

    fn neighbourhood(&self, tree: &RTree<Sample>, point: [f64; 2]) -> Option<(f64, f64)> {
        StatsHelper::mean_variance(
            tree.nearest_neighbor_iter(&point)
                .take(self.config.k.max(1))
                .map(|sample| sample.intensity),
        )
    }
}

impl Default for KnnSmoother {
    fn default() -> Self {
        Self::new(KnnConfig::default())
    }
}

fn axis(lo: f64, hi: f64, resolution: f64) -> Vec<f64> {
    let count = ((hi - lo) / resolution).floor() as usize + 1;
    (0..count).map(|i| lo + i as f64 * resolution).collect()
}

impl Smoother for KnnSmoother {
    fn smooth(
        &self,
        resolution: f64,
        e: &[f64],
        v: &[f64],
        intensity: &[f64],
    ) -> Result<SmoothingProducts, SmoothingError> {
        if e.len() != v.len() || e.len() != intensity.len() {
            return Err(SmoothingError::MismatchedInput {
                u: e.len(),
                v: v.len(),
                intensity: intensity.len(),
            });
        }
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(SmoothingError::InvalidResolution(resolution));
        }

        let samples: Vec<Sample> = e
            .iter()
            .zip(v)
            .zip(intensity)
            .filter(|((x, y), value)| x.is_finite() && y.is_finite() && value.is_finite())
            .map(|((&x, &y), &value)| Sample {
                position: [x, y],
                intensity: value,
            })
            .collect();
        if samples.is_empty() {
            return Err(SmoothingError::NoValidSamples);
        }

        let (lo_e, hi_e, lo_v, hi_v) = samples.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(a, b, c, d), s| {
                (
                    a.min(s.position[0]),
                    b.max(s.position[0]),
                    c.min(s.position[1]),
                    d.max(s.position[1]),
                )
            },
        );
        let rows = ((hi_e - lo_e) / resolution).floor() + 1.0;
        let cols = ((hi_v - lo_v) / resolution).floor() + 1.0;
        let cells = rows * cols;
        if cells > self.config.max_cells as f64 {
            return Err(SmoothingError::RasterTooLarge {
                cells: cells.min(usize::MAX as f64) as usize,
                limit: self.config.max_cells,
            });
        }

        let tree = RTree::bulk_load(samples);
        let e_axis = axis(lo_e, hi_e, resolution);
        let v_axis = axis(lo_v, hi_v, resolution);
        let mut mean = GridRaster::filled(e_axis.clone(), v_axis.clone(), f64::NAN);
        let mut variance = GridRaster::filled(e_axis, v_axis, f64::NAN);

        for (i, &x) in mean.e_axis.iter().enumerate() {
            for (j, &y) in mean.v_axis.iter().enumerate() {
                if let Some((m, var)) = self.neighbourhood(&tree, [x, y]) {
                    mean.values[[i, j]] = m;
                    variance.values[[i, j]] = var;
                }
            }
        }

        let filtered = e
            .iter()
            .zip(v)
            .map(|(&x, &y)| {
                if x.is_finite() && y.is_finite() {
                    self.neighbourhood(&tree, [x, y])
                        .map_or(f64::NAN, |(m, _)| m)
                } else {
                    f64::NAN
                }
            })
            .collect();

        Ok(SmoothingProducts {
            mean,
            variance,
            filtered,
        })
    }
}
