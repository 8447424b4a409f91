// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{GlmError, ModelDiagnostics, ModelSpec, RunSet};
use glm_design::{adjust_model, assemble_model, select_runs, AssembledModel, NoConfounds};
use serde::{Deserialize, Serialize};

/// Assembled design plus diagnostics for one planned subject, written by the
/// `plan` command and inspectable without any external solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelPlan {
    pub assembled: AssembledModel,
    pub diagnostics: ModelDiagnostics,
}

/// Runs the design-side stages for one subject: validate the specification,
/// select runs, adjust onsets for excluded volumes, and assemble the ordered
/// column plan. No design or estimation solver is involved, so the scan
/// parameters must be present in the specification itself.
pub fn plan_model(subject: &str, mut spec: ModelSpec) -> Result<ModelPlan, GlmError> {
    spec.validate()?;
    let scan = spec.scan.clone().ok_or_else(|| {
        GlmError::missing_parameters(format!(
            "nses/nvols/tr must be present in the model configuration to plan subject '{subject}'"
        ))
    })?;

    let mut diagnostics = ModelDiagnostics::new(subject, &spec.glm_name);
    let runs = RunSet::uniform(&scan.nvols, scan.tr)?;
    diagnostics.n_runs_total = runs.len();
    diagnostics.n_volumes_total = runs.total_volumes();

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

    adjust_model(&mut spec, &split.volume_index)?;
    let assembled = assemble_model(spec, split.modeled, &NoConfounds)?;
    diagnostics.design_columns = assembled.column_names.len();

    Ok(ModelPlan {
        assembled,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::plan_model;
    use glm_core::{
        ConditionKind, ConditionSpec, ModelSpec, RegressorSpec, RunSelection, ScanParams,
    };

    fn spec() -> ModelSpec {
        ModelSpec {
            glm_name: "task-main".to_string(),
            include_run: RunSelection::All,
            events: vec![ConditionSpec::new(
                "go",
                ConditionKind::Event,
                vec![0, 3, 7],
                vec![0.0, 0.0, 0.0],
                vec![],
            )
            .expect("event should be valid")],
            blocks: vec![],
            regressors: vec![RegressorSpec::new("pupil", vec![0.25; 12])],
            confounds: Default::default(),
            mask_path: None,
            demean: false,
            design_only: false,
            scan: Some(ScanParams {
                nses: 2,
                nvols: vec![6, 6],
                tr: 2.0,
            }),
        }
    }

    #[test]
    fn plan_assembles_full_timeline() {
        let plan = plan_model("sub-01", spec()).expect("plan should succeed");
        assert_eq!(
            plan.assembled.column_names,
            vec!["go", "pupil", "constant"]
        );
        assert_eq!(plan.diagnostics.n_runs_modeled, 2);
        assert_eq!(plan.diagnostics.n_volumes_retained, 12);
        assert_eq!(plan.diagnostics.design_columns, 3);
    }

    #[test]
    fn plan_rebases_onsets_for_excluded_runs() {
        let mut spec = spec();
        spec.include_run = RunSelection::Runs(vec![2]);
        let plan = plan_model("sub-01", spec).expect("plan should succeed");
        assert_eq!(plan.assembled.spec.events[0].onsets, vec![1]);
        assert_eq!(plan.assembled.n_volumes, 6);
        assert_eq!(plan.assembled.spec.regressors[0].values.len(), 6);
    }

    #[test]
    fn plan_requires_scan_parameters() {
        let mut spec = spec();
        spec.scan = None;
        let err = plan_model("sub-01", spec).expect_err("missing scan must fail");
        assert_eq!(err.code(), "missing_parameters");
    }
}
