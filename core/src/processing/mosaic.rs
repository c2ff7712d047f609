use crate::math::triangulation::LinearInterpolator;
use crate::processing::smoothing::{SmoothingError, Smoother};
use crate::sonar_interface::{CoordinateFrame, GridRaster, MosaicFrame, ScatterSet};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A mosaic is built whenever the buffer holds a positive multiple of this many frames.
pub const TRIGGER_PERIOD: usize = 100;
/// Oldest frames discarded after every build; the rest overlap into the next tile.
pub const EVICTION_COUNT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Cell size handed to the smoothing collaborator (metres).
    pub smoothing_resolution: f64,
    /// Largest linear raster a build will allocate.
    pub max_cells: usize,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            smoothing_resolution: 1.0,
            max_cells: 4_000_000,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("scatter has no finite extent")]
    NoExtent,
    #[error("scatter extent below one grid cell")]
    EmptyAxis,
    #[error("grid of {cells} cells exceeds the limit of {limit}")]
    TooLarge { cells: usize, limit: usize },
}

/// Result of one triggered build.
#[derive(Debug)]
pub struct BuildReport {
    /// `None` when the build was skipped.
    pub frame: Option<MosaicFrame>,
    pub skip_reason: Option<String>,
    pub smoothing_error: Option<SmoothingError>,
    pub evicted: usize,
    pub buffer_len: usize,
}

/// Evenly spaced nodes from `lo` to `hi` inclusive. The last node is `hi` exactly.
fn linspace(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (count - 1) as f64;
            let mut nodes: Vec<f64> = (0..count - 1).map(|i| lo + i as f64 * step).collect();
            nodes.push(hi);
            nodes
        }
    }
}

/// Number of nodes on an axis spanning `[lo, hi]` at roughly unit spacing.
fn axis_len(lo: f64, hi: f64) -> f64 {
    (hi - lo).trunc()
}

/// Linearly interpolates the scatter onto a regular grid in the display frame.
///
/// The grid size is checked against `max_cells` before anything is allocated.
pub fn interpolate_grid(scatter: &ScatterSet, max_cells: usize) -> Result<GridRaster, GridError> {
    let (lo_u, hi_u, lo_v, hi_v) = scatter.extent().ok_or(GridError::NoExtent)?;
    let (lo_e, hi_e) = (-hi_u, -lo_u);
    let rows = axis_len(lo_e, hi_e);
    let cols = axis_len(lo_v, hi_v);
    if rows < 1.0 || cols < 1.0 {
        return Err(GridError::EmptyAxis);
    }
    let cells = rows * cols;
    if cells > max_cells as f64 {
        return Err(GridError::TooLarge {
            cells: cells.min(usize::MAX as f64) as usize,
            limit: max_cells,
        });
    }

    let points: Vec<[f64; 2]> = scatter
        .u
        .iter()
        .zip(&scatter.v)
        .map(|(&u, &v)| [-u, v])
        .collect();
    let interpolator = LinearInterpolator::new(&points, &scatter.intensity);

    let e_axis = linspace(lo_e, hi_e, rows as usize);
    let v_axis = linspace(lo_v, hi_v, cols as usize);
    let mut raster = GridRaster::filled(e_axis, v_axis, f64::NAN);
    for (i, &e) in raster.e_axis.iter().enumerate() {
        for (j, &v) in raster.v_axis.iter().enumerate() {
            raster.values[[i, j]] = interpolator.interpolate(e, v);
        }
    }
    Ok(raster)
}

/// Sliding window of georeferenced swaths that periodically becomes a mosaic tile.
pub struct MosaicAssembler {
    buffer: VecDeque<CoordinateFrame>,
    smoother: Box<dyn Smoother>,
    config: MosaicConfig,
    next_index: u64,
    logger: LogManager,
}

impl MosaicAssembler {
    pub fn new(config: MosaicConfig, smoother: Box<dyn Smoother>) -> Self {
        Self {
            buffer: VecDeque::with_capacity(TRIGGER_PERIOD),
            smoother,
            config,
            next_index: 1,
            logger: LogManager::new("sonarcore::mosaic"),
        }
    }

    pub fn push(&mut self, frame: CoordinateFrame) {
        self.buffer.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn should_build(&self) -> bool {
        !self.buffer.is_empty() && self.buffer.len() % TRIGGER_PERIOD == 0
    }

    /// Flattens the window into one scatter, pairing each channel's
    /// coordinates with that channel's intensities.
    pub fn flatten(&self) -> ScatterSet {
        let total: usize = self.buffer.iter().map(|f| 2 * f.len()).sum();
        let mut scatter = ScatterSet::with_capacity(total);
        let channels = [
            (
                CoordinateFrame::X_RIGHT,
                CoordinateFrame::Y_RIGHT,
                CoordinateFrame::INTENSITY_RIGHT,
            ),
            (
                CoordinateFrame::X_LEFT,
                CoordinateFrame::Y_LEFT,
                CoordinateFrame::INTENSITY_LEFT,
            ),
        ];
        for frame in &self.buffer {
            for (x_row, y_row, i_row) in channels {
                let xs = frame.row(x_row);
                let ys = frame.row(y_row);
                let values = frame.row(i_row);
                for s in 0..frame.len() {
                    scatter.push(xs[s], ys[s], values[s]);
                }
            }
        }
        scatter
    }

    /// Builds a mosaic tile from the current window and evicts the oldest frames.
    pub fn build(&mut self) -> BuildReport {
        let swath_count = self.buffer.len();
        let scatter = self.flatten();
        let usable = scatter
            .u
            .iter()
            .zip(&scatter.v)
            .filter(|(u, v)| u.is_finite() && v.is_finite())
            .count();

        let mut report = BuildReport {
            frame: None,
            skip_reason: None,
            smoothing_error: None,
            evicted: 0,
            buffer_len: 0,
        };

        if usable < 3 {
            let reason = format!("{} scatter points, need at least 3", usable);
            self.logger
                .warn(&format!("skipping mosaic over {} swaths: {}", swath_count, reason));
            report.skip_reason = Some(reason);
        } else {
            let linear = match interpolate_grid(&scatter, self.config.max_cells) {
                Ok(raster) => Some(raster),
                Err(err) => {
                    self.logger.warn(&format!("no linear raster this build: {}", err));
                    None
                }
            };

            let easting = scatter.easting();
            let smoothing = match self.smoother.smooth(
                self.config.smoothing_resolution,
                &easting,
                &scatter.v,
                &scatter.intensity,
            ) {
                Ok(products) if products.filtered.len() == scatter.len() => Some(products),
                Ok(products) => {
                    let err = SmoothingError::Backend(format!(
                        "filtered output has {} points for {} inputs",
                        products.filtered.len(),
                        scatter.len()
                    ));
                    self.logger.warn(&format!("discarding smoothing products: {}", err));
                    report.smoothing_error = Some(err);
                    None
                }
                Err(err) => {
                    self.logger.warn(&format!("smoothing failed: {}", err));
                    report.smoothing_error = Some(err);
                    None
                }
            };

            let index = self.next_index;
            self.next_index += 1;
            self.logger.record(&format!(
                "mosaic #{} built from {} swaths, {} points",
                index,
                swath_count,
                scatter.len()
            ));
            report.frame = Some(MosaicFrame {
                index,
                swath_count,
                scatter,
                linear,
                smoothing,
            });
        }

        report.evicted = self.evict();
        report.buffer_len = self.buffer.len();
        report
    }

    fn evict(&mut self) -> usize {
        let count = EVICTION_COUNT.min(self.buffer.len());
        self.buffer.drain(..count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::SonarGeometry;
    use crate::processing::corrector::project;
    use crate::processing::smoothing::KnnSmoother;
    use crate::sonar_interface::{NavigationState, SmoothingProducts, Swath};
    use approx::assert_relative_eq;
    use ndarray::Array2;

    struct FailingSmoother;

    impl Smoother for FailingSmoother {
        fn smooth(
            &self,
            _resolution: f64,
            _e: &[f64],
            _v: &[f64],
            _intensity: &[f64],
        ) -> Result<SmoothingProducts, SmoothingError> {
            Err(SmoothingError::Backend("offline".into()))
        }
    }

    struct TruncatingSmoother;

    impl Smoother for TruncatingSmoother {
        fn smooth(
            &self,
            resolution: f64,
            e: &[f64],
            v: &[f64],
            intensity: &[f64],
        ) -> Result<SmoothingProducts, SmoothingError> {
            let mut products = KnnSmoother::default().smooth(resolution, e, v, intensity)?;
            products.filtered.pop();
            Ok(products)
        }
    }

    fn frame_at(x: f64, samples: usize) -> CoordinateFrame {
        let mut table = Array2::<f64>::zeros((CoordinateFrame::ROWS, samples));
        for s in 0..samples {
            table[[CoordinateFrame::X_RIGHT, s]] = -x;
            table[[CoordinateFrame::X_LEFT, s]] = -x;
            table[[CoordinateFrame::Y_RIGHT, s]] = s as f64;
            table[[CoordinateFrame::Y_LEFT, s]] = -(s as f64);
            table[[CoordinateFrame::INTENSITY_RIGHT, s]] = 1.0;
            table[[CoordinateFrame::INTENSITY_LEFT, s]] = 2.0;
        }
        CoordinateFrame::from_table(table).unwrap()
    }

    fn assembler(smoother: Box<dyn Smoother>) -> MosaicAssembler {
        MosaicAssembler::new(MosaicConfig::default(), smoother)
    }

    #[test]
    fn trigger_fires_on_positive_multiples_only() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        assert!(!mosaic.should_build());
        for i in 0..TRIGGER_PERIOD {
            assert!(!mosaic.should_build());
            mosaic.push(frame_at(i as f64, 3));
        }
        assert!(mosaic.should_build());
        mosaic.push(frame_at(100.0, 3));
        assert!(!mosaic.should_build());
    }

    #[test]
    fn flatten_pairs_channels_with_their_intensity() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        mosaic.push(frame_at(1.0, 3));
        let scatter = mosaic.flatten();
        assert_eq!(scatter.len(), 6);
        assert_eq!(scatter.v[..3], [0.0, 1.0, 2.0]);
        assert_eq!(scatter.intensity[..3], [1.0, 1.0, 1.0]);
        assert_eq!(scatter.v[3..], [0.0, -1.0, -2.0]);
        assert_eq!(scatter.intensity[3..], [2.0, 2.0, 2.0]);
    }

    #[test]
    fn build_evicts_half_the_window() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        for i in 0..TRIGGER_PERIOD {
            mosaic.push(frame_at(i as f64, 4));
        }
        let report = mosaic.build();
        assert_eq!(report.evicted, EVICTION_COUNT);
        assert_eq!(report.buffer_len, TRIGGER_PERIOD - EVICTION_COUNT);
        assert_eq!(mosaic.len(), 50);
        let frame = report.frame.unwrap();
        assert_eq!(frame.index, 1);
        assert_eq!(frame.swath_count, 100);
        assert!(frame.smoothing.is_some());
        // the retained half starts at the 51st swath
        assert_relative_eq!(mosaic.flatten().u[0], -50.0);
    }

    #[test]
    fn interpolation_fills_inside_hull() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        for i in 0..10 {
            mosaic.push(frame_at(i as f64, 4));
        }
        let raster = interpolate_grid(&mosaic.flatten(), 1_000).unwrap();
        // e spans 0..9, v spans -3..3
        assert_eq!(raster.shape(), (9, 6));
        assert_relative_eq!(raster.e_axis[0], 0.0);
        assert_relative_eq!(raster.v_axis[5], 3.0, epsilon = 1e-12);
        // right-channel half is uniformly 1.0
        assert_relative_eq!(raster.values[[4, 4]], 1.0, epsilon = 1e-9);
        assert!(raster.defined_cells() > 0);
    }

    #[test]
    fn linspace_ends_exactly_on_the_upper_bound() {
        let nodes = linspace(-7.5519, 7.5519, 18);
        assert_eq!(nodes.len(), 18);
        assert_eq!(nodes[0], -7.5519);
        assert_eq!(nodes[17], 7.5519);
        assert!(nodes.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn identity_track_reproduces_a_linear_field_everywhere() {
        let geometry = SonarGeometry {
            alpha: 50f64.to_radians(),
            theta: 30f64.to_radians(),
            res: 1.0,
            n_samples: 10,
        };
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        for i in 0..TRIGGER_PERIOD {
            let swath = Swath::new(
                vec![0.0; 10],
                vec![0.0; 10],
                NavigationState::identity_at(i as f64, 0.0),
                5.0,
            );
            let mut frame = project(&swath, &geometry);
            let table = frame.table_mut();
            for s in 0..10 {
                for (u, v, value) in [
                    (
                        CoordinateFrame::X_RIGHT,
                        CoordinateFrame::Y_RIGHT,
                        CoordinateFrame::INTENSITY_RIGHT,
                    ),
                    (
                        CoordinateFrame::X_LEFT,
                        CoordinateFrame::Y_LEFT,
                        CoordinateFrame::INTENSITY_LEFT,
                    ),
                ] {
                    table[[value, s]] = 2.0 * table[[u, s]] - 3.0 * table[[v, s]] + 1.0;
                }
            }
            mosaic.push(frame);
        }

        let raster =
            interpolate_grid(&mosaic.flatten(), MosaicConfig::default().max_cells).unwrap();
        let (rows, cols) = raster.shape();
        assert_eq!((rows, cols), (99, 12));
        assert_eq!(raster.defined_cells(), rows * cols);
        for (i, &e) in raster.e_axis.iter().enumerate() {
            for (j, &v) in raster.v_axis.iter().enumerate() {
                assert_relative_eq!(
                    raster.values[[i, j]],
                    -2.0 * e - 3.0 * v + 1.0,
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn oversized_grid_is_refused_before_allocation() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        for i in 0..TRIGGER_PERIOD - 1 {
            mosaic.push(frame_at(i as f64, 10));
        }
        // a single pose jump stretches the window to 300 km
        mosaic.push(frame_at(300_000.0, 10));

        assert!(matches!(
            interpolate_grid(&mosaic.flatten(), 4_000_000),
            Err(GridError::TooLarge { limit: 4_000_000, .. })
        ));
        let report = mosaic.build();
        let frame = report.frame.unwrap();
        assert!(frame.linear.is_none());
        assert_eq!(frame.scatter.len(), 2_000);
        assert_eq!(report.buffer_len, 50);
    }

    #[test]
    fn sub_cell_extent_has_no_grid() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        mosaic.push(frame_at(0.0, 4));
        assert_eq!(
            interpolate_grid(&mosaic.flatten(), 1_000).unwrap_err(),
            GridError::EmptyAxis
        );
    }

    #[test]
    fn degenerate_window_skips_build_but_still_evicts() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        for _ in 0..TRIGGER_PERIOD {
            mosaic.push(frame_at(0.0, 0));
        }
        let report = mosaic.build();
        assert!(report.frame.is_none());
        assert!(report.skip_reason.is_some());
        assert_eq!(report.buffer_len, 50);
    }

    #[test]
    fn smoothing_failure_keeps_raw_products() {
        let mut mosaic = assembler(Box::new(FailingSmoother));
        for i in 0..TRIGGER_PERIOD {
            mosaic.push(frame_at(i as f64, 4));
        }
        let report = mosaic.build();
        assert!(report.smoothing_error.is_some());
        let frame = report.frame.unwrap();
        assert!(frame.smoothing.is_none());
        assert!(frame.linear.is_some());
        assert_eq!(frame.scatter.len(), 800);
    }

    #[test]
    fn malformed_smoothing_output_is_discarded() {
        let mut mosaic = assembler(Box::new(TruncatingSmoother));
        for i in 0..TRIGGER_PERIOD {
            mosaic.push(frame_at(i as f64, 4));
        }
        let report = mosaic.build();
        assert!(matches!(
            report.smoothing_error,
            Some(SmoothingError::Backend(_))
        ));
        assert!(report.frame.unwrap().smoothing.is_none());
    }

    #[test]
    fn frame_indices_increase_per_build() {
        let mut mosaic = assembler(Box::new(KnnSmoother::default()));
        let mut indices = Vec::new();
        for i in 0..=200 {
            if mosaic.should_build() {
                indices.push(mosaic.build().frame.unwrap().index);
            }
            mosaic.push(frame_at(i as f64, 2));
        }
        assert_eq!(indices, vec![1, 2, 3]);
    }
}
