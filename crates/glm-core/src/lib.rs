// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types for first-level GLM modeling: run structure, volume
//! masks, model specifications, design matrices, diagnostics, and the
//! crate-wide error taxonomy.

mod design;
mod diagnostics;
mod error;
mod model;
mod runs;

pub use design::DesignMatrix;
pub use diagnostics::{ModelDiagnostics, DIAGNOSTICS_SCHEMA_VERSION};
pub use error::GlmError;
pub use model::{
    ConditionKind, ConditionSpec, ConfoundToggles, ModelSpec, Parametric, RegressorSpec,
    ScanParams, CONSTANT_COLUMN, NUISANCE_PREFIX,
};
pub use runs::{Run, RunSelection, RunSet, VolumeIndex};
