// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{DesignMatrix, GlmError, RegressorSpec};
use glm_design::AssembledModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::contrast::Contrast;
use crate::orchestrator::FittedModel;

/// Default intensity fraction for implicit masking when no explicit mask
/// image is configured.
pub const DEFAULT_IMPLICIT_THRESHOLD: f64 = 0.8;

/// Parameter record saved by a prior preprocessing stage, keyed by subject.
///
/// The orchestrator reads `nses`/`nvols`/`tr` when the model configuration
/// omits them; the remaining fields are consumed by collaborator
/// implementations (motion regressors through a [`ConfoundSource`][glm_design::ConfoundSource]
/// adapter, functional files and the cleanup flag by the estimation side).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrepParams {
    pub nses: usize,
    pub nvols: Vec<usize>,
    pub tr: f64,
    #[serde(default)]
    pub motion_regressors: Vec<RegressorSpec>,
    #[serde(default)]
    pub functional_files: Vec<PathBuf>,
    #[serde(default)]
    pub cleanup: bool,
}

/// Looks up prep-stage scan parameters for a subject. Returning `Ok(None)`
/// means the prep stage has nothing recorded; the orchestrator then fails
/// with a missing-parameters error.
pub trait PrepParameterSource {
    fn prep_params(&self, subject: &str) -> Result<Option<PrepParams>, GlmError>;
}

/// Builds the numeric design matrix (including HRF convolution) from an
/// assembled model. Column order and count must match
/// `AssembledModel::column_names`.
pub trait DesignSolver {
    fn build_design(&self, model: &AssembledModel) -> Result<DesignMatrix, GlmError>;
}

/// How voxels are admitted into estimation.
///
/// An explicit mask image overrides implicit intensity masking outright: the
/// implicit threshold is forced to negative infinity and implicit masking is
/// disabled, so the mask image alone decides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskPolicy {
    pub explicit_mask: Option<PathBuf>,
    pub implicit_threshold: f64,
    pub implicit_masking: bool,
}

impl MaskPolicy {
    pub fn resolve(explicit_mask: Option<PathBuf>) -> Self {
        match explicit_mask {
            Some(path) => Self {
                explicit_mask: Some(path),
                implicit_threshold: f64::NEG_INFINITY,
                implicit_masking: false,
            },
            None => Self {
                explicit_mask: None,
                implicit_threshold: DEFAULT_IMPLICIT_THRESHOLD,
                implicit_masking: true,
            },
        }
    }
}

/// Summary payload from the estimation solver. Voxel-wise images stay on
/// disk with the solver; only the scalar summary travels through the
/// pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimationOutput {
    pub coefficients: Vec<f64>,
    pub residual_variance: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Fits the assembled design against the functional data.
pub trait EstimationSolver {
    fn estimate(
        &self,
        design: &DesignMatrix,
        mask: &MaskPolicy,
        contrasts: &[Contrast],
    ) -> Result<EstimationOutput, GlmError>;
}

/// Renders human-readable reports for a fitted model. Optional; skipped
/// entirely in design-only mode.
pub trait ReportRenderer {
    fn render(&self, model: &FittedModel, out_dir: &Path) -> Result<(), GlmError>;
}

#[cfg(test)]
mod tests {
    use super::MaskPolicy;
    use std::path::PathBuf;

    #[test]
    fn explicit_mask_disables_implicit_masking() {
        let policy = MaskPolicy::resolve(Some(PathBuf::from("mask.img")));
        assert_eq!(policy.explicit_mask, Some(PathBuf::from("mask.img")));
        assert!(!policy.implicit_masking);
        assert_eq!(policy.implicit_threshold, f64::NEG_INFINITY);
    }

    #[test]
    fn absent_mask_keeps_implicit_defaults() {
        let policy = MaskPolicy::resolve(None);
        assert_eq!(policy.explicit_mask, None);
        assert!(policy.implicit_masking);
        assert_eq!(policy.implicit_threshold, super::DEFAULT_IMPLICIT_THRESHOLD);
    }
}
