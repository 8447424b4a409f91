// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::GlmError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

const CONFIDENCE_LEVEL: f64 = 0.95;

/// Star rating for a p-value, strictest threshold first.
pub fn significance_stars(p: f64) -> &'static str {
    if p < 0.001 {
        "***"
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else {
        ""
    }
}

/// Test statistic with its p-value, 95% confidence interval, degrees of
/// freedom, and significance annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
    pub confidence_interval: [f64; 2],
    pub degrees_of_freedom: f64,
    pub significance: String,
}

impl TestResult {
    /// The star rating is always derived from this result's own p-value.
    fn new(
        statistic: f64,
        p_value: f64,
        confidence_interval: [f64; 2],
        degrees_of_freedom: f64,
    ) -> Self {
        Self {
            statistic,
            p_value,
            confidence_interval,
            degrees_of_freedom,
            significance: significance_stars(p_value).to_string(),
        }
    }
}

fn students_t(dof: f64) -> Result<StudentsT, GlmError> {
    StudentsT::new(0.0, 1.0, dof).map_err(|err| {
        GlmError::numerical_issue(format!("Student-t distribution with dof={dof}: {err}"))
    })
}

fn two_sided_p(dist: &StudentsT, statistic: f64) -> f64 {
    if statistic.is_infinite() {
        return 0.0;
    }
    2.0 * (1.0 - dist.cdf(statistic.abs()))
}

fn sample_mean_and_variance(y: &[f64]) -> (f64, f64) {
    let n = y.len() as f64;
    let mean = y.iter().sum::<f64>() / n;
    let variance = y
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1.0);
    (mean, variance)
}

/// One-sample t-test of the hypothesis that `y` has zero mean.
pub fn ttest1(y: &[f64]) -> Result<TestResult, GlmError> {
    if y.len() < 2 {
        return Err(GlmError::invalid_input(
            "ttest1 requires at least two observations",
        ));
    }
    let n = y.len() as f64;
    let (mean, variance) = sample_mean_and_variance(y);
    if variance <= 0.0 {
        return Err(GlmError::numerical_issue(
            "ttest1 undefined for zero-variance input",
        ));
    }
    let standard_error = (variance / n).sqrt();
    let statistic = mean / standard_error;
    let dof = n - 1.0;

    let dist = students_t(dof)?;
    let p_value = two_sided_p(&dist, statistic);
    let critical = dist.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);
    let confidence_interval = [
        mean - critical * standard_error,
        mean + critical * standard_error,
    ];

    Ok(TestResult::new(statistic, p_value, confidence_interval, dof))
}

/// Two-sample t-test with pooled variance; the confidence interval covers
/// the difference of means.
pub fn ttest2(y: &[f64], x: &[f64]) -> Result<TestResult, GlmError> {
    if y.len() < 2 || x.len() < 2 {
        return Err(GlmError::invalid_input(
            "ttest2 requires at least two observations per sample",
        ));
    }
    let n1 = y.len() as f64;
    let n2 = x.len() as f64;
    let (mean1, var1) = sample_mean_and_variance(y);
    let (mean2, var2) = sample_mean_and_variance(x);
    let dof = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / dof;
    if pooled <= 0.0 {
        return Err(GlmError::numerical_issue(
            "ttest2 undefined for zero pooled variance",
        ));
    }
    let standard_error = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    let difference = mean1 - mean2;
    let statistic = difference / standard_error;

    let dist = students_t(dof)?;
    let p_value = two_sided_p(&dist, statistic);
    let critical = dist.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);
    let confidence_interval = [
        difference - critical * standard_error,
        difference + critical * standard_error,
    ];

    Ok(TestResult::new(statistic, p_value, confidence_interval, dof))
}

/// Pearson correlation. The statistic is the correlation coefficient; the
/// p-value comes from its t-transform and the confidence interval from the
/// Fisher z-transform.
pub fn correl(y: &[f64], x: &[f64]) -> Result<TestResult, GlmError> {
    if y.len() != x.len() {
        return Err(GlmError::invalid_input(format!(
            "correl requires equal lengths, got {} and {}",
            y.len(),
            x.len()
        )));
    }
    if y.len() < 3 {
        return Err(GlmError::invalid_input(
            "correl requires at least three observations",
        ));
    }

    let n = y.len() as f64;
    let mean_y = y.iter().sum::<f64>() / n;
    let mean_x = x.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut ss_y = 0.0;
    let mut ss_x = 0.0;
    for (lhs, rhs) in y.iter().zip(x.iter()) {
        let dy = lhs - mean_y;
        let dx = rhs - mean_x;
        cov += dy * dx;
        ss_y += dy * dy;
        ss_x += dx * dx;
    }
    if ss_y <= 0.0 || ss_x <= 0.0 {
        return Err(GlmError::numerical_issue(
            "correl undefined for constant input",
        ));
    }
    let r = cov / (ss_y.sqrt() * ss_x.sqrt());

    let dof = n - 2.0;
    let denom = (1.0 - r * r).max(0.0);
    let t_statistic = if denom == 0.0 {
        if r >= 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    } else {
        r * (dof / denom).sqrt()
    };
    let dist = students_t(dof)?;
    let p_value = two_sided_p(&dist, t_statistic);

    let normal = Normal::new(0.0, 1.0)
        .map_err(|err| GlmError::numerical_issue(format!("standard normal: {err}")))?;
    let z_critical = normal.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);
    let z = r.atanh();
    let z_se = if n > 3.0 {
        1.0 / (n - 3.0).sqrt()
    } else {
        f64::INFINITY
    };
    let confidence_interval = [(z - z_critical * z_se).tanh(), (z + z_critical * z_se).tanh()];

    Ok(TestResult::new(r, p_value, confidence_interval, dof))
}
