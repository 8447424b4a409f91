// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::GlmError;

/// Arithmetic mean.
pub fn mean(y: &[f64]) -> Result<f64, GlmError> {
    if y.is_empty() {
        return Err(GlmError::invalid_input("mean requires at least one value"));
    }
    Ok(y.iter().sum::<f64>() / y.len() as f64)
}

/// Population standard deviation (divisor `n`, not `n-1`).
pub fn population_std(y: &[f64]) -> Result<f64, GlmError> {
    let center = mean(y)?;
    let variance = y
        .iter()
        .map(|value| {
            let diff = value - center;
            diff * diff
        })
        .sum::<f64>()
        / y.len() as f64;
    Ok(variance.sqrt())
}

/// Standardizes `y` to mean 0 and population standard deviation 1.
pub fn zscore(y: &[f64]) -> Result<Vec<f64>, GlmError> {
    let center = mean(y)?;
    let spread = population_std(y)?;
    if spread == 0.0 {
        return Err(GlmError::numerical_issue(
            "zscore undefined for constant input",
        ));
    }
    Ok(y.iter().map(|value| (value - center) / spread).collect())
}

/// Median of a sample; averages the middle pair for even lengths.
pub fn median(y: &[f64]) -> Result<f64, GlmError> {
    if y.is_empty() {
        return Err(GlmError::invalid_input("median requires at least one value"));
    }
    if y.iter().any(|value| value.is_nan()) {
        return Err(GlmError::invalid_input("median undefined for NaN input"));
    }
    let mut sorted = y.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Ok(sorted[mid])
    } else {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Median absolute deviation from the median.
pub fn mad_med(y: &[f64]) -> Result<f64, GlmError> {
    let center = median(y)?;
    let deviations: Vec<f64> = y.iter().map(|value| (value - center).abs()).collect();
    median(&deviations)
}

#[cfg(test)]
mod tests {
    use super::{mad_med, mean, median, population_std, zscore};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual}, |diff|={diff}, tol={tol}"
        );
    }

    #[test]
    fn zscore_output_has_zero_mean_unit_population_std() {
        let y = vec![3.0, 7.5, -2.0, 11.0, 0.25, 4.0];
        let z = zscore(&y).expect("zscore should succeed on non-constant input");
        assert_close(mean(&z).expect("mean of z"), 0.0, 1e-12);
        assert_close(population_std(&z).expect("std of z"), 1.0, 1e-12);
    }

    #[test]
    fn zscore_rejects_constant_input() {
        let err = zscore(&[4.0, 4.0, 4.0]).expect_err("constant input must fail");
        assert!(err.to_string().contains("constant input"));
    }

    #[test]
    fn zscore_rejects_empty_input() {
        let err = zscore(&[]).expect_err("empty input must fail");
        assert!(err.to_string().contains("at least one value"));
    }

    #[test]
    fn population_std_uses_n_divisor() {
        // Sample std of [1, 3] is sqrt(2); population std is 1.
        let spread = population_std(&[1.0, 3.0]).expect("std should succeed");
        assert_close(spread, 1.0, 1e-12);
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_close(median(&[5.0, 1.0, 3.0]).expect("odd median"), 3.0, 1e-12);
        assert_close(
            median(&[4.0, 1.0, 3.0, 2.0]).expect("even median"),
            2.5,
            1e-12,
        );
    }

    #[test]
    fn median_rejects_nan() {
        let err = median(&[1.0, f64::NAN]).expect_err("NaN must fail");
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn mad_med_matches_hand_computed_value() {
        // median = 3, |y - 3| = [2, 1, 0, 1, 7], mad = 1.
        let got = mad_med(&[1.0, 2.0, 3.0, 4.0, 10.0]).expect("mad should succeed");
        assert_close(got, 1.0, 1e-12);
    }

    #[test]
    fn mad_med_is_zero_for_constant_input() {
        let got = mad_med(&[2.0, 2.0, 2.0]).expect("mad should succeed");
        assert_close(got, 0.0, 1e-12);
    }
}
