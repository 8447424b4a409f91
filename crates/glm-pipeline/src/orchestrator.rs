// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{
    DesignMatrix, GlmError, ModelDiagnostics, ModelSpec, RegressorSpec, RunSet, ScanParams,
    VolumeIndex,
};
use glm_design::{
    adjust_model, adjust_regressor, assemble_model, select_runs, ConfoundSource,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span, warn};

use crate::collaborators::{
    DesignSolver, EstimationOutput, EstimationSolver, MaskPolicy, PrepParameterSource,
    ReportRenderer,
};
use crate::contrast::{demean_column_count, effects_of_interest, Contrast};
use crate::persist::write_json_atomic;

/// Pipeline stages in execution order. `Aborted` is reachable from every
/// other stage; nothing is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResolveParams,
    ValidateRuns,
    AdjustOnsets,
    AssembleModel,
    BuildDesign,
    Estimate,
    DesignOnly,
    Persist,
    Done,
    Aborted,
}

/// Persisted container for one subject's model: the final specification, the
/// solved design, contrasts, the estimation summary (absent in design-only
/// mode), and run diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub spec: ModelSpec,
    pub design: DesignMatrix,
    pub contrasts: Vec<Contrast>,
    pub estimation: Option<EstimationOutput>,
    pub diagnostics: ModelDiagnostics,
}

/// Result of a completed subject run.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutcome {
    pub stage: Stage,
    pub fitted: FittedModel,
    pub artifacts: Vec<PathBuf>,
}

/// External collaborators wired into one pipeline execution. The
/// orchestrator owns sequencing; everything voxel- or file-shaped lives
/// behind these trait objects.
pub struct Pipeline<'a> {
    pub prep: &'a dyn PrepParameterSource,
    pub confounds: &'a dyn ConfoundSource,
    pub design_solver: &'a dyn DesignSolver,
    pub estimation_solver: &'a dyn EstimationSolver,
    pub renderer: Option<&'a dyn ReportRenderer>,
}

/// Confound regressors arrive aligned with the full timeline; this adapter
/// filters them down to the retained volumes before assembly sees them.
struct FilteredConfounds<'a> {
    inner: &'a dyn ConfoundSource,
    index: &'a VolumeIndex,
}

impl FilteredConfounds<'_> {
    fn filter(
        &self,
        mut regressors: Vec<RegressorSpec>,
    ) -> Result<Vec<RegressorSpec>, GlmError> {
        for regressor in &mut regressors {
            adjust_regressor(regressor, self.index)?;
        }
        Ok(regressors)
    }
}

impl ConfoundSource for FilteredConfounds<'_> {
    fn outliers(&self) -> Result<Vec<RegressorSpec>, GlmError> {
        self.filter(self.inner.outliers()?)
    }

    fn nuisance(&self) -> Result<Vec<RegressorSpec>, GlmError> {
        self.filter(self.inner.nuisance()?)
    }

    fn motion(&self) -> Result<Vec<RegressorSpec>, GlmError> {
        self.filter(self.inner.motion()?)
    }
}

impl Pipeline<'_> {
    /// Runs the full state machine for one subject and persists the
    /// resulting artifacts under `out_dir`.
    pub fn run_subject(
        &self,
        subject: &str,
        mut spec: ModelSpec,
        out_dir: &Path,
    ) -> Result<PipelineOutcome, GlmError> {
        let span = info_span!("first_level", subject, glm = %spec.glm_name);
        let _guard = span.enter();
        let started = Instant::now();
        let mut diagnostics = ModelDiagnostics::new(subject, &spec.glm_name);

        info!(stage = ?Stage::ResolveParams, "resolving scan parameters");
        let scan = self.resolve_scan_params(subject, &spec)?;
        spec.scan = Some(scan.clone());
        spec.validate()?;
        let runs = RunSet::uniform(&scan.nvols, scan.tr)?;
        diagnostics.n_runs_total = runs.len();
        diagnostics.n_volumes_total = runs.total_volumes();

        info!(stage = ?Stage::ValidateRuns, "selecting runs");
        let split = select_runs(&spec.include_run, &runs)?;
        diagnostics.n_runs_modeled = split.modeled.len();
        diagnostics.n_volumes_retained = split.volume_index.retained_count();
        if diagnostics.n_runs_modeled < diagnostics.n_runs_total {
            diagnostics.note(format!(
                "{} of {} runs excluded by configuration",
                diagnostics.n_runs_total - diagnostics.n_runs_modeled,
                diagnostics.n_runs_total
            ));
        }

        info!(stage = ?Stage::AdjustOnsets, "adjusting onsets for excluded volumes");
        adjust_model(&mut spec, &split.volume_index)?;

        info!(stage = ?Stage::AssembleModel, "assembling design columns");
        let filtered = FilteredConfounds {
            inner: self.confounds,
            index: &split.volume_index,
        };
        let condition_columns = spec.condition_column_count();
        let design_only = spec.design_only;
        let demean = spec.demean;
        let mask_path = spec.mask_path.clone();
        let assembled = assemble_model(spec, split.modeled, &filtered)?;
        diagnostics.design_columns = assembled.column_names.len();

        info!(stage = ?Stage::BuildDesign, columns = assembled.column_names.len(), "building design matrix");
        let mut design = self.design_solver.build_design(&assembled)?;
        if design.column_names() != assembled.column_names.as_slice() {
            return Err(GlmError::external_solver(
                "design solver returned columns that do not match the assembled model",
            ));
        }
        if design.n_rows() != assembled.n_volumes {
            return Err(GlmError::external_solver(format!(
                "design solver returned {} rows for {} modeled volumes",
                design.n_rows(),
                assembled.n_volumes
            )));
        }

        let (contrasts, estimation) = if design_only {
            info!(stage = ?Stage::DesignOnly, "design-only model, skipping estimation");
            diagnostics.note("design assembled without estimation");
            (vec![], None)
        } else {
            info!(stage = ?Stage::Estimate, "estimating model");
            if demean {
                let count = demean_column_count(condition_columns, design.column_names());
                design.demean_leading_columns(count)?;
                diagnostics.note(format!("demeaned leading {count} design columns"));
            }
            let mask = MaskPolicy::resolve(mask_path);
            let contrasts = vec![effects_of_interest(design.column_names())?];
            let output = self
                .estimation_solver
                .estimate(&design, &mask, &contrasts)?;
            for warning in &output.warnings {
                warn!(warning = %warning, "estimation warning");
                diagnostics.warn(warning.clone());
            }
            (contrasts, Some(output))
        };

        diagnostics.runtime_ms = Some(started.elapsed().as_millis() as u64);
        let fitted = FittedModel {
            spec: assembled.spec.clone(),
            design,
            contrasts,
            estimation,
            diagnostics,
        };

        info!(stage = ?Stage::Persist, "persisting artifacts");
        let artifacts = self.persist(&fitted, design_only, out_dir)?;

        if !design_only {
            if let Some(renderer) = self.renderer {
                renderer.render(&fitted, out_dir)?;
            }
        }

        info!(stage = ?Stage::Done, "subject complete");
        Ok(PipelineOutcome {
            stage: Stage::Done,
            fitted,
            artifacts,
        })
    }

    /// Scan parameters come from the model configuration when present,
    /// otherwise from the prep parameter source. Absent from both is fatal.
    fn resolve_scan_params(
        &self,
        subject: &str,
        spec: &ModelSpec,
    ) -> Result<ScanParams, GlmError> {
        if let Some(scan) = &spec.scan {
            return Ok(scan.clone());
        }
        match self.prep.prep_params(subject)? {
            Some(params) => Ok(ScanParams {
                nses: params.nses,
                nvols: params.nvols,
                tr: params.tr,
            }),
            None => Err(GlmError::missing_parameters(format!(
                "nses/nvols/tr for subject '{subject}' found in neither the model \
                 configuration nor the prep parameters"
            ))),
        }
    }

    fn persist(
        &self,
        fitted: &FittedModel,
        design_only: bool,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, GlmError> {
        let mut artifacts = Vec::new();
        let container = if design_only {
            out_dir.join(format!("{}_design.json", fitted.spec.glm_name))
        } else {
            out_dir.join(format!("{}_fitted.json", fitted.spec.glm_name))
        };
        write_json_atomic(fitted, &container)?;
        artifacts.push(container);

        if !design_only {
            let spec_copy = out_dir.join(format!("{}.json", fitted.spec.glm_name));
            write_json_atomic(&fitted.spec, &spec_copy)?;
            artifacts.push(spec_copy);
        }
        Ok(artifacts)
    }
}
