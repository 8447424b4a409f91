// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{GlmError, NUISANCE_PREFIX};
use serde::{Deserialize, Serialize};

/// Named contrast over design columns. One weight row per contrast row;
/// a multi-row contrast is an F-contrast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contrast {
    pub name: String,
    pub weights: Vec<Vec<f64>>,
}

impl Contrast {
    pub fn n_rows(&self) -> usize {
        self.weights.len()
    }
}

/// Builds the "effects of interest" F-contrast: identity rows spanning every
/// column except the trailing block of nuisance columns and the constant.
///
/// The trailing block size is the number of column names carrying the
/// reserved nuisance marker, plus one for the constant. Assembly guarantees
/// those columns sit contiguously at the end.
pub fn effects_of_interest(column_names: &[String]) -> Result<Contrast, GlmError> {
    let n_cols = column_names.len();
    let trailing = column_names
        .iter()
        .filter(|name| name.contains(NUISANCE_PREFIX))
        .count()
        + 1;
    if trailing >= n_cols {
        return Err(GlmError::invalid_input(
            "effects-of-interest contrast requires at least one non-nuisance column",
        ));
    }
    let span = n_cols - trailing;
    let weights = (0..span)
        .map(|row| {
            let mut coefficients = vec![0.0; n_cols];
            coefficients[row] = 1.0;
            coefficients
        })
        .collect();
    Ok(Contrast {
        name: "effects_of_interest".to_string(),
        weights,
    })
}

/// Number of leading design columns to demean before estimation: the
/// condition-and-regressor block, widened by any later column whose name
/// contains "other".
pub fn demean_column_count(condition_columns: usize, column_names: &[String]) -> usize {
    let extra = column_names
        .iter()
        .skip(condition_columns)
        .filter(|name| name.contains("other"))
        .count();
    condition_columns + extra
}
