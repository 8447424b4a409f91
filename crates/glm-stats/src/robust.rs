// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::GlmError;

/// Controls for the iteratively reweighted L1 fit.
///
/// The source algorithm had no iteration cap; `max_iterations` bounds the
/// loop so pathological inputs terminate, surfacing non-convergence on the
/// returned fit instead of spinning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct L1Config {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub residual_floor: f64,
}

impl Default for L1Config {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            residual_floor: 1e-6,
        }
    }
}

/// Result of an L1 (least-absolute-deviation) regression fit.
///
/// `coefficients[0]` is the intercept; the rest follow the predictor
/// columns in their input order (minus a stripped constant lead column).
#[derive(Clone, Debug, PartialEq)]
pub struct L1Fit {
    pub coefficients: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Ordinary least squares with an implicit intercept.
///
/// Returns `[intercept, slope_1, ..., slope_p]` for the given predictor
/// columns.
pub fn ols_regress(y: &[f64], predictors: &[Vec<f64>]) -> Result<Vec<f64>, GlmError> {
    let rows = build_design(y, predictors, false)?;
    weighted_least_squares(&rows, y, None)
}

/// Iteratively reweighted least squares approximating L1 regression.
///
/// A constant leading predictor column is stripped (the intercept is handled
/// separately). Coefficients are initialized by OLS on `[intercept, x]`;
/// each iteration reweights rows by `sqrt(1/max(|residual|, floor))` and
/// re-solves, stopping when the largest coefficient change falls below the
/// tolerance or the iteration cap is reached.
pub fn l1_regress(
    y: &[f64],
    predictors: &[Vec<f64>],
    config: &L1Config,
) -> Result<L1Fit, GlmError> {
    if config.max_iterations == 0 {
        return Err(GlmError::invalid_input(
            "l1_regress requires max_iterations >= 1",
        ));
    }
    let rows = build_design(y, predictors, true)?;
    let mut coefficients = weighted_least_squares(&rows, y, None)?;

    let mut iterations = 0usize;
    let mut converged = false;
    while iterations < config.max_iterations {
        iterations += 1;

        let weights: Vec<f64> = rows
            .iter()
            .zip(y.iter())
            .map(|(row, target)| {
                let residual = target - dot(row, &coefficients);
                1.0 / residual.abs().max(config.residual_floor)
            })
            .collect();

        let updated = weighted_least_squares(&rows, y, Some(&weights))?;
        let max_change = coefficients
            .iter()
            .zip(updated.iter())
            .map(|(old, new)| (old - new).abs())
            .fold(0.0_f64, f64::max);
        coefficients = updated;

        if max_change < config.tolerance {
            converged = true;
            break;
        }
    }

    Ok(L1Fit {
        coefficients,
        iterations,
        converged,
    })
}

fn dot(row: &[f64], coefficients: &[f64]) -> f64 {
    row.iter()
        .zip(coefficients.iter())
        .map(|(lhs, rhs)| lhs * rhs)
        .sum()
}

/// Builds augmented design rows `[1, x_1, ..., x_p]`, optionally stripping a
/// constant leading predictor column.
fn build_design(
    y: &[f64],
    predictors: &[Vec<f64>],
    strip_constant_lead: bool,
) -> Result<Vec<Vec<f64>>, GlmError> {
    let n = y.len();
    if n < 2 {
        return Err(GlmError::invalid_input(
            "regression requires at least two observations",
        ));
    }
    if predictors.is_empty() {
        return Err(GlmError::invalid_input(
            "regression requires at least one predictor column",
        ));
    }
    for (idx, column) in predictors.iter().enumerate() {
        if column.len() != n {
            return Err(GlmError::invalid_input(format!(
                "predictor column {idx} has {} values for {n} observations",
                column.len()
            )));
        }
    }

    let skip_first = strip_constant_lead
        && predictors[0]
            .iter()
            .all(|value| *value == predictors[0][0]);
    let kept: Vec<&Vec<f64>> = predictors.iter().skip(usize::from(skip_first)).collect();

    let width = kept.len() + 1;
    if n < width {
        return Err(GlmError::invalid_input(format!(
            "regression has {width} coefficients but only {n} observations"
        )));
    }

    Ok((0..n)
        .map(|i| {
            let mut row = Vec::with_capacity(width);
            row.push(1.0);
            for column in &kept {
                row.push(column[i]);
            }
            row
        })
        .collect())
}

/// Solves the (optionally weighted) normal equations by in-place Cholesky.
fn weighted_least_squares(
    rows: &[Vec<f64>],
    y: &[f64],
    weights: Option<&[f64]>,
) -> Result<Vec<f64>, GlmError> {
    let p = rows[0].len();
    let mut xtx = vec![0.0; p * p];
    let mut xty = vec![0.0; p];

    for (i, row) in rows.iter().enumerate() {
        let w = weights.map_or(1.0, |w| w[i]);
        for a in 0..p {
            xty[a] += w * row[a] * y[i];
            for b in 0..=a {
                xtx[a * p + b] += w * row[a] * row[b];
            }
        }
    }
    // Mirror the accumulated lower triangle.
    for a in 0..p {
        for b in a + 1..p {
            xtx[a * p + b] = xtx[b * p + a];
        }
    }

    cholesky_solve(&mut xtx, &xty, p)
}

/// In-place Cholesky factorization followed by forward/back substitution.
fn cholesky_solve(matrix: &mut [f64], rhs: &[f64], n: usize) -> Result<Vec<f64>, GlmError> {
    // Pivot floor scaled to the diagonal, so rank deficiency is caught even
    // when rounding leaves a marginally positive pivot.
    let pivot_floor = (0..n)
        .map(|i| matrix[i * n + i].abs())
        .fold(1.0_f64, f64::max)
        * 1e-12;

    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i * n + j];
            for k in 0..j {
                sum -= matrix[i * n + k] * matrix[j * n + k];
            }
            if i == j {
                if !sum.is_finite() || sum <= pivot_floor {
                    return Err(GlmError::numerical_issue(
                        "normal equations are not positive definite",
                    ));
                }
                matrix[i * n + i] = sum.sqrt();
            } else {
                matrix[i * n + j] = sum / matrix[j * n + j];
            }
        }
    }

    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = rhs[i];
        for k in 0..i {
            sum -= matrix[i * n + k] * z[k];
        }
        z[i] = sum / matrix[i * n + i];
    }

    let mut solution = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= matrix[k * n + i] * solution[k];
        }
        solution[i] = sum / matrix[i * n + i];
    }

    Ok(solution)
}
