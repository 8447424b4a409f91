// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{GlmError, RunSelection};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reserved name prefix marking a regressor as nuisance-type. Columns whose
/// name carries this prefix form the trailing block excluded from the
/// effects-of-interest contrast.
pub const NUISANCE_PREFIX: &str = "nuisance_";

/// Name of the implicit constant/intercept column appended last.
pub const CONSTANT_COLUMN: &str = "constant";

/// How a condition's onsets are turned into predicted signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Brief event at each onset, convolved by the design solver.
    Event,
    /// Box-car of the given duration at each onset.
    Block,
}

/// Parametric modulator aligned 1:1 with a condition's onsets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Parametric {
    pub name: String,
    pub values: Vec<f64>,
}

/// Onsets, durations, and optional parametric modulators for one condition.
///
/// Onsets are 0-based volume indices into the flat concatenation of modeled
/// volumes; durations and every parametric are aligned index-for-index with
/// the onsets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub name: String,
    pub kind: ConditionKind,
    pub onsets: Vec<usize>,
    pub durations: Vec<f64>,
    #[serde(default)]
    pub parametrics: Vec<Parametric>,
}

impl ConditionSpec {
    /// Constructs a validated condition specification.
    pub fn new(
        name: impl Into<String>,
        kind: ConditionKind,
        onsets: Vec<usize>,
        durations: Vec<f64>,
        parametrics: Vec<Parametric>,
    ) -> Result<Self, GlmError> {
        let name = name.into();
        let spec = Self {
            name,
            kind,
            onsets,
            durations,
            parametrics,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Checks alignment and ordering invariants.
    pub fn validate(&self) -> Result<(), GlmError> {
        if self.durations.len() != self.onsets.len() {
            return Err(GlmError::configuration(format!(
                "condition '{}': {} durations for {} onsets",
                self.name,
                self.durations.len(),
                self.onsets.len()
            )));
        }
        if let Some(pair) = self.onsets.windows(2).find(|pair| pair[0] > pair[1]) {
            return Err(GlmError::configuration(format!(
                "condition '{}': onsets must be non-decreasing, found {} before {}",
                self.name, pair[0], pair[1]
            )));
        }
        for parametric in &self.parametrics {
            if parametric.values.len() != self.onsets.len() {
                return Err(GlmError::configuration(format!(
                    "condition '{}': parametric '{}' has {} values for {} onsets",
                    self.name,
                    parametric.name,
                    parametric.values.len(),
                    self.onsets.len()
                )));
            }
        }
        Ok(())
    }

    /// Design columns this condition contributes: one for the condition
    /// itself plus one per parametric modulator.
    pub fn column_count(&self) -> usize {
        1 + self.parametrics.len()
    }
}

/// Continuous covariate with one value per volume; injected into the design
/// directly, without convolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressorSpec {
    pub name: String,
    pub values: Vec<f64>,
}

impl RegressorSpec {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// True when the name carries the reserved nuisance marker.
    pub fn is_nuisance(&self) -> bool {
        self.name.contains(NUISANCE_PREFIX)
    }
}

/// Which prep-stage confound regressors to append to the design.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfoundToggles {
    #[serde(default)]
    pub outliers: bool,
    #[serde(default)]
    pub nuisance: bool,
    #[serde(default)]
    pub motion: bool,
}

/// Scan acquisition parameters: run count, per-run volume counts, TR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    pub nses: usize,
    pub nvols: Vec<usize>,
    pub tr: f64,
}

impl ScanParams {
    pub fn validate(&self) -> Result<(), GlmError> {
        if self.nvols.len() != self.nses {
            return Err(GlmError::configuration(format!(
                "scan parameters list {} per-run volume counts for nses={}",
                self.nvols.len(),
                self.nses
            )));
        }
        Ok(())
    }
}

/// Complete first-level model specification for one subject.
///
/// This is the single context threaded through the pipeline. The
/// orchestrator owns it exclusively; stages take it by value and return the
/// updated specification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub glm_name: String,
    #[serde(default)]
    pub include_run: RunSelection,
    #[serde(default)]
    pub events: Vec<ConditionSpec>,
    #[serde(default)]
    pub blocks: Vec<ConditionSpec>,
    #[serde(default)]
    pub regressors: Vec<RegressorSpec>,
    #[serde(default)]
    pub confounds: ConfoundToggles,
    #[serde(default)]
    pub mask_path: Option<PathBuf>,
    #[serde(default)]
    pub demean: bool,
    #[serde(default)]
    pub design_only: bool,
    #[serde(default)]
    pub scan: Option<ScanParams>,
}

impl ModelSpec {
    /// Validates every condition and the optional scan parameters.
    pub fn validate(&self) -> Result<(), GlmError> {
        if self.glm_name.is_empty() {
            return Err(GlmError::configuration("glm_name must be non-empty"));
        }
        for condition in self.events.iter().chain(self.blocks.iter()) {
            condition.validate()?;
        }
        if let Some(scan) = &self.scan {
            scan.validate()?;
        }
        Ok(())
    }

    /// Every condition in category order: events first, then blocks.
    pub fn conditions(&self) -> impl Iterator<Item = &ConditionSpec> {
        self.events.iter().chain(self.blocks.iter())
    }

    /// Mutable view over every condition, events before blocks.
    pub fn conditions_mut(&mut self) -> impl Iterator<Item = &mut ConditionSpec> {
        self.events.iter_mut().chain(self.blocks.iter_mut())
    }

    /// Total design columns contributed by modeled conditions (events and
    /// blocks, including their parametric modulators) and plain regressors.
    pub fn condition_column_count(&self) -> usize {
        self.conditions()
            .map(ConditionSpec::column_count)
            .sum::<usize>()
            + self.regressors.len()
    }
}
