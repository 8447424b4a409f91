// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Orchestration of one subject's first-level model: resolves scan
//! parameters, validates and selects runs, adjusts onsets for excluded
//! volumes, assembles the design, drives the external design and estimation
//! solvers, and persists the resulting artifacts atomically.
//!
//! The heavy numerical work (HRF convolution, voxel-wise estimation) lives
//! behind the collaborator traits in [`collaborators`]; this crate owns the
//! sequencing and its failure semantics. Every failure aborts the subject
//! immediately; there are no retries.

mod collaborators;
mod contrast;
mod orchestrator;
mod persist;

pub use collaborators::{
    DesignSolver, EstimationOutput, EstimationSolver, MaskPolicy, PrepParameterSource, PrepParams,
    ReportRenderer, DEFAULT_IMPLICIT_THRESHOLD,
};
pub use contrast::{demean_column_count, effects_of_interest, Contrast};
pub use orchestrator::{FittedModel, Pipeline, PipelineOutcome, Stage};
pub use persist::write_json_atomic;
