// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GlmError;
use serde::{Deserialize, Serialize};

/// Numeric design matrix with named columns, as returned by the design
/// solver. Row-major storage; immutable once estimation begins, except for
/// the optional demeaning pass applied before the solver is invoked.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignMatrix {
    column_names: Vec<String>,
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl DesignMatrix {
    /// Constructs a validated design matrix from row-major values.
    pub fn new(
        column_names: Vec<String>,
        values: Vec<f64>,
        n_rows: usize,
    ) -> Result<Self, GlmError> {
        let n_cols = column_names.len();
        if n_cols == 0 {
            return Err(GlmError::invalid_input(
                "DesignMatrix requires at least one column",
            ));
        }
        let expected = n_rows.checked_mul(n_cols).ok_or_else(|| {
            GlmError::invalid_input("n_rows*n_cols overflow while validating design shape")
        })?;
        if values.len() != expected {
            return Err(GlmError::invalid_input(format!(
                "design value length mismatch: got {}, expected {} (n_rows={}, n_cols={})",
                values.len(),
                expected,
                n_rows,
                n_cols
            )));
        }
        Ok(Self {
            column_names,
            values,
            n_rows,
            n_cols,
        })
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols + col]
    }

    /// Copies one column out of the row-major storage.
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.n_rows).map(|row| self.value(row, col)).collect()
    }

    /// Subtracts the column mean from each of the leading `count` columns.
    ///
    /// Used for the optional demeaning of condition columns before
    /// estimation; nuisance and constant columns are never demeaned.
    pub fn demean_leading_columns(&mut self, count: usize) -> Result<(), GlmError> {
        if count > self.n_cols {
            return Err(GlmError::invalid_input(format!(
                "cannot demean {count} columns of a {}-column design",
                self.n_cols
            )));
        }
        if self.n_rows == 0 {
            return Ok(());
        }
        let n = self.n_rows as f64;
        for col in 0..count {
            let mean: f64 = (0..self.n_rows).map(|row| self.value(row, col)).sum::<f64>() / n;
            for row in 0..self.n_rows {
                self.values[row * self.n_cols + col] -= mean;
            }
        }
        Ok(())
    }
}
