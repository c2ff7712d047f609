use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

pub struct MatrixHelper;

impl MatrixHelper {
    /// Solve the (ridge-regularized) normal equations `(AᵀA + λI) x = Aᵀb`.
    ///
    /// Returns `None` when the system is empty, mismatched, or singular.
    pub fn least_squares(
        design: ArrayView2<f64>,
        target: ArrayView1<f64>,
        ridge: f64,
    ) -> Option<Array1<f64>> {
        let (rows, cols) = design.dim();
        if rows == 0 || cols == 0 || target.len() != rows {
            return None;
        }

        let gram = design.t().dot(&design);
        let moment = design.t().dot(&target);

        let mut normal = DMatrix::from_fn(cols, cols, |r, c| gram[[r, c]]);
        for i in 0..cols {
            normal[(i, i)] += ridge;
        }
        let rhs = DVector::from_iterator(cols, moment.iter().copied());

        let solution = match normal.clone().cholesky() {
            Some(factor) => factor.solve(&rhs),
            None => normal.lu().solve(&rhs)?,
        };

        if solution.iter().any(|value| !value.is_finite()) {
            return None;
        }
        Some(solution.iter().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn least_squares_recovers_line() {
        let design = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let target = array![1.0, 3.0, 5.0, 7.0];
        let coeffs = MatrixHelper::least_squares(design.view(), target.view(), 0.0).unwrap();
        assert_relative_eq!(coeffs[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(coeffs[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn least_squares_rejects_mismatched_shapes() {
        let design = Array2::<f64>::zeros((3, 2));
        let target = array![1.0, 2.0];
        assert!(MatrixHelper::least_squares(design.view(), target.view(), 0.0).is_none());
    }
}
