use ndarray::Array2;
use serde::Serialize;

/// Flattened scatter of every buffered sample: `u`/`v` as captured plus intensity.
#[derive(Debug, Clone, Default)]
pub struct ScatterSet {
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    pub intensity: Vec<f64>,
}

impl ScatterSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            u: Vec::with_capacity(capacity),
            v: Vec::with_capacity(capacity),
            intensity: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, u: f64, v: f64, intensity: f64) {
        self.u.push(u);
        self.v.push(v);
        self.intensity.push(intensity);
    }

    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    /// Mosaic display easting for each point (`e = -u`).
    pub fn easting(&self) -> Vec<f64> {
        self.u.iter().map(|u| -u).collect()
    }

    /// `(min_u, max_u, min_v, max_v)` over the finite coordinates.
    pub fn extent(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self
            .u
            .iter()
            .zip(&self.v)
            .filter(|(u, v)| u.is_finite() && v.is_finite());
        let (&u0, &v0) = points.next()?;
        Some(points.fold((u0, u0, v0, v0), |(lo_u, hi_u, lo_v, hi_v), (&u, &v)| {
            (lo_u.min(u), hi_u.max(u), lo_v.min(v), hi_v.max(v))
        }))
    }
}

/// Regular raster over the display frame; `values[[i, j]]` sits at
/// `(e_axis[i], v_axis[j])`. Undefined cells hold `NaN`.
#[derive(Debug, Clone)]
pub struct GridRaster {
    pub e_axis: Vec<f64>,
    pub v_axis: Vec<f64>,
    pub values: Array2<f64>,
}

impl GridRaster {
    pub fn filled(e_axis: Vec<f64>, v_axis: Vec<f64>, value: f64) -> Self {
        let values = Array2::from_elem((e_axis.len(), v_axis.len()), value);
        Self {
            e_axis,
            v_axis,
            values,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn defined_cells(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    pub fn summary(&self) -> RasterSummary {
        let (rows, cols) = self.shape();
        RasterSummary {
            rows,
            cols,
            origin: [
                self.e_axis.first().copied().unwrap_or(f64::NAN),
                self.v_axis.first().copied().unwrap_or(f64::NAN),
            ],
            defined_cells: self.defined_cells(),
        }
    }
}

/// Local statistics returned by the smoothing collaborator.
#[derive(Debug, Clone)]
pub struct SmoothingProducts {
    pub mean: GridRaster,
    pub variance: GridRaster,
    /// Denoised intensity for each input scatter point, in input order.
    pub filtered: Vec<f64>,
}

/// Everything produced by one mosaic build.
#[derive(Debug, Clone)]
pub struct MosaicFrame {
    pub index: u64,
    pub swath_count: usize,
    pub scatter: ScatterSet,
    pub linear: Option<GridRaster>,
    pub smoothing: Option<SmoothingProducts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RasterSummary {
    pub rows: usize,
    pub cols: usize,
    pub origin: [f64; 2],
    pub defined_cells: usize,
}

/// Compact description of a mosaic build, suitable for manifests and logs.
#[derive(Debug, Clone, Serialize)]
pub struct MosaicManifest {
    pub index: u64,
    pub swath_count: usize,
    pub points: usize,
    pub extent: Option<[f64; 4]>,
    pub linear: Option<RasterSummary>,
    pub smoothed_mean: Option<RasterSummary>,
    pub smoothed_variance: Option<RasterSummary>,
}

impl MosaicFrame {
    pub fn manifest(&self) -> MosaicManifest {
        MosaicManifest {
            index: self.index,
            swath_count: self.swath_count,
            points: self.scatter.len(),
            extent: self
                .scatter
                .extent()
                .map(|(lo_u, hi_u, lo_v, hi_v)| [lo_u, hi_u, lo_v, hi_v]),
            linear: self.linear.as_ref().map(GridRaster::summary),
            smoothed_mean: self.smoothing.as_ref().map(|s| s.mean.summary()),
            smoothed_variance: self.smoothing.as_ref().map(|s| s.variance.summary()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatter_extent_skips_non_finite_coordinates() {
        let mut scatter = ScatterSet::default();
        scatter.push(1.0, -2.0, 0.5);
        scatter.push(f64::NAN, 10.0, 0.5);
        scatter.push(-3.0, 4.0, f64::NAN);
        assert_eq!(scatter.extent(), Some((-3.0, 1.0, -2.0, 4.0)));
        let easting = scatter.easting();
        assert_eq!(easting[0], -1.0);
        assert_eq!(easting[2], 3.0);
    }

    #[test]
    fn empty_scatter_has_no_extent() {
        assert!(ScatterSet::default().extent().is_none());
    }

    #[test]
    fn raster_summary_counts_defined_cells() {
        let mut raster = GridRaster::filled(vec![0.0, 1.0], vec![5.0, 6.0, 7.0], f64::NAN);
        raster.values[[1, 2]] = 3.0;
        let summary = raster.summary();
        assert_eq!((summary.rows, summary.cols), (2, 3));
        assert_eq!(summary.origin, [0.0, 5.0]);
        assert_eq!(summary.defined_cells, 1);
    }
}
