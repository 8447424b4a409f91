// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Stateless statistics routines used for contrast and post-hoc reporting:
//! z-scores, median absolute deviation, iteratively reweighted L1
//! regression, t-tests, and Pearson correlation with significance
//! annotation.

mod descriptive;
mod inference;
mod robust;

pub use descriptive::{mad_med, mean, median, population_std, zscore};
pub use inference::{correl, significance_stars, ttest1, ttest2, TestResult};
pub use robust::{l1_regress, ols_regress, L1Config, L1Fit};
