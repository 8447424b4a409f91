// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{GlmError, ModelSpec, RegressorSpec, RunSet, CONSTANT_COLUMN, NUISANCE_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Supplier of prep-stage derived confound regressors (outlier spikes,
/// nuisance signals, motion parameters). Sources hand back one value per
/// acquired volume over the full timeline; the pipeline filters them down
/// to the retained volumes before assembly sees them.
pub trait ConfoundSource {
    fn outliers(&self) -> Result<Vec<RegressorSpec>, GlmError>;
    fn nuisance(&self) -> Result<Vec<RegressorSpec>, GlmError>;
    fn motion(&self) -> Result<Vec<RegressorSpec>, GlmError>;
}

/// Confound source with nothing to contribute; used when no prep-stage
/// signals are available.
pub struct NoConfounds;

impl ConfoundSource for NoConfounds {
    fn outliers(&self) -> Result<Vec<RegressorSpec>, GlmError> {
        Ok(vec![])
    }

    fn nuisance(&self) -> Result<Vec<RegressorSpec>, GlmError> {
        Ok(vec![])
    }

    fn motion(&self) -> Result<Vec<RegressorSpec>, GlmError> {
        Ok(vec![])
    }
}

/// Complete, correctly ordered model handed to the external design solver.
///
/// Column order is load-bearing: events, blocks, regressors (declaration
/// order within each category), then outlier, nuisance, and motion confound
/// columns, then the constant. Contrast construction downstream assumes the
/// nuisance-and-constant columns form a contiguous trailing block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledModel {
    pub spec: ModelSpec,
    pub runs: RunSet,
    pub tr: f64,
    pub n_volumes: usize,
    pub confounds: Vec<RegressorSpec>,
    pub column_names: Vec<String>,
}

/// Merges condition, regressor, and confound specifications into an
/// [`AssembledModel`].
///
/// The spec and runs are taken by value: assembly is the last stage that
/// shapes the model, and the orchestrator threads ownership through it.
pub fn assemble_model(
    spec: ModelSpec,
    runs: RunSet,
    confounds: &dyn ConfoundSource,
) -> Result<AssembledModel, GlmError> {
    spec.validate()?;
    let n_volumes = runs.total_volumes();
    let tr = runs.runs()[0].tr;

    let mut column_names = Vec::new();
    for condition in spec.conditions() {
        if let Some(&onset) = condition
            .onsets
            .iter()
            .find(|&&onset| onset >= n_volumes)
        {
            return Err(GlmError::configuration(format!(
                "condition '{}': onset {onset} beyond modeled volume count {n_volumes}",
                condition.name
            )));
        }
        column_names.push(condition.name.clone());
        for parametric in &condition.parametrics {
            column_names.push(format!("{}_x_{}", condition.name, parametric.name));
        }
    }

    for regressor in &spec.regressors {
        validate_regressor_length(regressor, n_volumes)?;
        column_names.push(regressor.name.clone());
    }

    let mut confound_columns = Vec::new();
    if spec.confounds.outliers {
        append_confounds(&mut confound_columns, confounds.outliers()?, n_volumes)?;
    }
    if spec.confounds.nuisance {
        append_confounds(&mut confound_columns, confounds.nuisance()?, n_volumes)?;
    }
    if spec.confounds.motion {
        append_confounds(&mut confound_columns, confounds.motion()?, n_volumes)?;
    }
    column_names.extend(confound_columns.iter().map(|column| column.name.clone()));

    column_names.push(CONSTANT_COLUMN.to_string());

    let mut seen = HashSet::new();
    for name in &column_names {
        if !seen.insert(name.as_str()) {
            return Err(GlmError::configuration(format!(
                "duplicate design column name '{name}'"
            )));
        }
    }

    Ok(AssembledModel {
        spec,
        runs,
        tr,
        n_volumes,
        confounds: confound_columns,
        column_names,
    })
}

fn validate_regressor_length(
    regressor: &RegressorSpec,
    n_volumes: usize,
) -> Result<(), GlmError> {
    if regressor.values.len() != n_volumes {
        return Err(GlmError::configuration(format!(
            "regressor '{}' has {} values for {} modeled volumes",
            regressor.name,
            regressor.values.len(),
            n_volumes
        )));
    }
    Ok(())
}

/// Appends confound columns, forcing the reserved nuisance prefix onto any
/// name missing it so the trailing nuisance block stays countable.
fn append_confounds(
    collected: &mut Vec<RegressorSpec>,
    supplied: Vec<RegressorSpec>,
    n_volumes: usize,
) -> Result<(), GlmError> {
    for mut regressor in supplied {
        if !regressor.name.contains(NUISANCE_PREFIX) {
            regressor.name = format!("{NUISANCE_PREFIX}{}", regressor.name);
        }
        validate_regressor_length(&regressor, n_volumes)?;
        collected.push(regressor);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{assemble_model, ConfoundSource, NoConfounds};
    use glm_core::{
        ConditionKind, ConditionSpec, ConfoundToggles, GlmError, ModelSpec, Parametric,
        RegressorSpec, RunSelection, RunSet,
    };

    struct FixedConfounds {
        n_volumes: usize,
    }

    impl ConfoundSource for FixedConfounds {
        fn outliers(&self) -> Result<Vec<RegressorSpec>, GlmError> {
            Ok(vec![RegressorSpec::new(
                "outlier_1",
                vec![0.0; self.n_volumes],
            )])
        }

        fn nuisance(&self) -> Result<Vec<RegressorSpec>, GlmError> {
            Ok(vec![RegressorSpec::new(
                "nuisance_csf",
                vec![0.0; self.n_volumes],
            )])
        }

        fn motion(&self) -> Result<Vec<RegressorSpec>, GlmError> {
            Ok(vec![
                RegressorSpec::new("motion_x", vec![0.0; self.n_volumes]),
                RegressorSpec::new("motion_y", vec![0.0; self.n_volumes]),
            ])
        }
    }

    fn base_spec() -> ModelSpec {
        ModelSpec {
            glm_name: "task-main".to_string(),
            include_run: RunSelection::All,
            events: vec![ConditionSpec::new(
                "go",
                ConditionKind::Event,
                vec![0, 4],
                vec![0.0, 0.0],
                vec![Parametric {
                    name: "rt".to_string(),
                    values: vec![0.4, 0.6],
                }],
            )
            .expect("event should be valid")],
            blocks: vec![ConditionSpec::new(
                "rest",
                ConditionKind::Block,
                vec![6],
                vec![4.0],
                vec![],
            )
            .expect("block should be valid")],
            regressors: vec![RegressorSpec::new("pupil", vec![0.0; 10])],
            confounds: ConfoundToggles::default(),
            mask_path: None,
            demean: false,
            design_only: false,
            scan: None,
        }
    }

    fn runs() -> RunSet {
        RunSet::uniform(&[10], 2.0).expect("run set should be valid")
    }

    #[test]
    fn column_order_is_events_blocks_regressors_confounds_constant() {
        let mut spec = base_spec();
        spec.confounds = ConfoundToggles {
            outliers: true,
            nuisance: true,
            motion: true,
        };
        let assembled = assemble_model(spec, runs(), &FixedConfounds { n_volumes: 10 })
            .expect("assembly should succeed");

        assert_eq!(
            assembled.column_names,
            vec![
                "go",
                "go_x_rt",
                "rest",
                "pupil",
                "nuisance_outlier_1",
                "nuisance_csf",
                "nuisance_motion_x",
                "nuisance_motion_y",
                "constant",
            ]
        );
        assert_eq!(assembled.tr, 2.0);
        assert_eq!(assembled.n_volumes, 10);
        assert_eq!(assembled.confounds.len(), 4);
    }

    #[test]
    fn confound_toggles_gate_each_category() {
        let mut spec = base_spec();
        spec.confounds = ConfoundToggles {
            outliers: false,
            nuisance: false,
            motion: true,
        };
        let assembled = assemble_model(spec, runs(), &FixedConfounds { n_volumes: 10 })
            .expect("assembly should succeed");

        assert_eq!(
            assembled.column_names,
            vec![
                "go",
                "go_x_rt",
                "rest",
                "pupil",
                "nuisance_motion_x",
                "nuisance_motion_y",
                "constant",
            ]
        );
    }

    #[test]
    fn no_confounds_leaves_only_declared_columns_and_constant() {
        let assembled = assemble_model(base_spec(), runs(), &NoConfounds)
            .expect("assembly should succeed");
        assert_eq!(
            assembled.column_names,
            vec!["go", "go_x_rt", "rest", "pupil", "constant"]
        );
        assert!(assembled.confounds.is_empty());
    }

    #[test]
    fn already_prefixed_confound_names_are_not_double_prefixed() {
        let mut spec = base_spec();
        spec.confounds.nuisance = true;
        let assembled = assemble_model(spec, runs(), &FixedConfounds { n_volumes: 10 })
            .expect("assembly should succeed");
        assert!(assembled
            .column_names
            .contains(&"nuisance_csf".to_string()));
        assert!(!assembled
            .column_names
            .iter()
            .any(|name| name.contains("nuisance_nuisance")));
    }

    #[test]
    fn regressor_length_mismatch_is_rejected() {
        let mut spec = base_spec();
        spec.regressors[0].values.truncate(7);
        let err = assemble_model(spec, runs(), &NoConfounds)
            .expect_err("short regressor must fail");
        assert!(err.to_string().contains("regressor 'pupil' has 7 values"));
    }

    #[test]
    fn onset_beyond_modeled_volumes_is_rejected() {
        let mut spec = base_spec();
        spec.events[0].onsets = vec![0, 11];
        let err = assemble_model(spec, runs(), &NoConfounds)
            .expect_err("onset past timeline must fail");
        assert!(err.to_string().contains("onset 11 beyond modeled volume count 10"));
    }

    #[test]
    fn duplicate_column_names_are_rejected() {
        let mut spec = base_spec();
        spec.regressors.push(RegressorSpec::new("go", vec![0.0; 10]));
        let err = assemble_model(spec, runs(), &NoConfounds)
            .expect_err("duplicate name must fail");
        assert!(err.to_string().contains("duplicate design column name 'go'"));
    }
}
