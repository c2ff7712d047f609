/// Summary statistics that skip missing (`NaN`) samples.
pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        let (sum_sq, count) = samples
            .iter()
            .filter(|v| v.is_finite())
            .fold((0.0, 0usize), |(acc, n), &v| (acc + v * v, n + 1));
        if count == 0 {
            return 0.0;
        }
        (sum_sq / count as f64).sqrt()
    }

    pub fn mean(samples: &[f64]) -> Option<f64> {
        Self::mean_variance(samples.iter().copied()).map(|(mean, _)| mean)
    }

    /// Population mean and variance of the finite values, `None` if there are none.
    pub fn mean_variance<I>(values: I) -> Option<(f64, f64)>
    where
        I: IntoIterator<Item = f64>,
    {
        // Welford's running update.
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            count += 1;
            let delta = value - mean;
            mean += delta / count as f64;
            m2 += delta * (value - mean);
        }
        (count > 0).then(|| (mean, m2 / count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_ignores_missing_samples() {
        assert_eq!(StatsHelper::rms(&[f64::NAN, 4.0]), 4.0);
    }

    #[test]
    fn mean_variance_skips_nan() {
        let (mean, variance) =
            StatsHelper::mean_variance([1.0, f64::NAN, 3.0, 5.0]).unwrap();
        assert_relative_eq!(mean, 3.0);
        assert_relative_eq!(variance, 8.0 / 3.0, epsilon = 1e-12);
        assert!(StatsHelper::mean_variance([f64::NAN]).is_none());
    }
}
