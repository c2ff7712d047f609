use crate::math::matrix::MatrixHelper;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Degree-3 polynomial part of the basis: 1, x, x², x³.
const POLY_TERMS: usize = 4;

/// Settings for the least-squares cubic regression spline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplineConfig {
    /// Number of evenly spaced interior knots.
    pub knots: usize,
    /// Ridge term added to the normal equations.
    pub ridge: f64,
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self {
            knots: 4,
            ridge: 1e-9,
        }
    }
}

/// Cubic regression spline in the truncated power basis.
#[derive(Debug, Clone)]
pub struct CubicRegressionSpline {
    knots: Vec<f64>,
    coefficients: Array1<f64>,
}

impl CubicRegressionSpline {
    /// Fits the spline to the finite `(x, y)` pairs.
    ///
    /// The interior knot count shrinks when there are too few points to
    /// support it. Returns `None` below four usable points or when the
    /// normal equations cannot be solved.
    pub fn fit(xs: &[f64], ys: &[f64], config: &SplineConfig) -> Option<Self> {
        let points: Vec<(f64, f64)> = xs
            .iter()
            .zip(ys)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| (x, y))
            .collect();
        if points.len() < POLY_TERMS {
            return None;
        }

        let (lo, hi) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
                (lo.min(x), hi.max(x))
            });
        let interior = config.knots.min(points.len() - POLY_TERMS);
        let knots: Vec<f64> = (1..=interior)
            .map(|k| lo + (hi - lo) * k as f64 / (interior + 1) as f64)
            .collect();

        let columns = POLY_TERMS + knots.len();
        let mut design = Array2::<f64>::zeros((points.len(), columns));
        for (row, &(x, _)) in points.iter().enumerate() {
            for (col, value) in Self::basis(x, &knots).enumerate() {
                design[[row, col]] = value;
            }
        }
        let target: Array1<f64> = points.iter().map(|&(_, y)| y).collect();

        let coefficients =
            MatrixHelper::least_squares(design.view(), target.view(), config.ridge)?;
        Some(Self {
            knots,
            coefficients,
        })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        Self::basis(x, &self.knots)
            .zip(self.coefficients.iter())
            .map(|(b, c)| b * c)
            .sum()
    }

    pub fn knot_count(&self) -> usize {
        self.knots.len()
    }

    fn basis(x: f64, knots: &[f64]) -> impl Iterator<Item = f64> + '_ {
        let poly = [1.0, x, x * x, x * x * x];
        poly.into_iter()
            .chain(knots.iter().map(move |&k| (x - k).max(0.0).powi(3)))
    }
}
