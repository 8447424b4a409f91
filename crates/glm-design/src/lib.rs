// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Design-side stages of the first-level GLM pipeline: resolving which runs
//! are modeled, rewriting onset/duration/parametric data when runs are
//! excluded, and assembling the ordered model specification handed to the
//! external design solver.

mod assemble;
mod onsets;
mod select;

pub use assemble::{assemble_model, AssembledModel, ConfoundSource, NoConfounds};
pub use onsets::{adjust_condition, adjust_model, adjust_regressor};
pub use select::{select_runs, RunSplit};
