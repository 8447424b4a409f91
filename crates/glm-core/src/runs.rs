// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GlmError;
use serde::{Deserialize, Serialize};

/// One functional run: a block of consecutively acquired volumes sharing a
/// repetition time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub nvols: usize,
    pub tr: f64,
}

/// Ordered sequence of runs for one subject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSet {
    runs: Vec<Run>,
}

impl RunSet {
    /// Constructs a validated `RunSet`. Every run must have at least one
    /// volume.
    pub fn new(runs: Vec<Run>) -> Result<Self, GlmError> {
        if runs.is_empty() {
            return Err(GlmError::invalid_input("RunSet requires at least one run"));
        }
        if let Some((idx, run)) = runs.iter().enumerate().find(|(_, run)| run.nvols == 0) {
            return Err(GlmError::invalid_input(format!(
                "run {} has nvols=0; every run needs at least one volume",
                idx + 1
            )));
        }
        if let Some((idx, run)) = runs
            .iter()
            .enumerate()
            .find(|(_, run)| !run.tr.is_finite() || run.tr <= 0.0)
        {
            return Err(GlmError::invalid_input(format!(
                "run {} has tr={} but TR must be finite and positive",
                idx + 1,
                run.tr
            )));
        }
        Ok(Self { runs })
    }

    /// Convenience constructor for runs sharing one TR.
    pub fn uniform(nvols_per_run: &[usize], tr: f64) -> Result<Self, GlmError> {
        Self::new(
            nvols_per_run
                .iter()
                .map(|&nvols| Run { nvols, tr })
                .collect(),
        )
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total volume count across all runs.
    pub fn total_volumes(&self) -> usize {
        self.runs.iter().map(|run| run.nvols).sum()
    }
}

/// Which runs to model: either every run or an explicit ordered set of
/// 1-based run indices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunSelection {
    All,
    Runs(Vec<usize>),
}

impl Default for RunSelection {
    fn default() -> Self {
        Self::All
    }
}

impl RunSelection {
    /// Returns true when the selection is the literal "all" token.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// 0/1 mask over the flat concatenation of all runs' volumes. A 1 marks a
/// volume belonging to an included run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeIndex {
    mask: Vec<u8>,
}

impl VolumeIndex {
    /// Constructs a mask, rejecting non-binary bytes.
    pub fn new(mask: Vec<u8>) -> Result<Self, GlmError> {
        if mask.is_empty() {
            return Err(GlmError::invalid_input("VolumeIndex mask must be non-empty"));
        }
        if let Some((idx, val)) = mask
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| *v != 0 && *v != 1)
        {
            return Err(GlmError::invalid_input(format!(
                "VolumeIndex mask must contain only 0/1 bytes: index {idx} has {val}"
            )));
        }
        Ok(Self { mask })
    }

    /// All-ones mask of the given length.
    pub fn all_included(len: usize) -> Result<Self, GlmError> {
        Self::new(vec![1; len])
    }

    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    /// Number of volumes retained after exclusion.
    pub fn retained_count(&self) -> usize {
        self.mask.iter().copied().map(usize::from).sum()
    }

    /// True when no volume is excluded, i.e. adjustment is a no-op.
    pub fn is_complete(&self) -> bool {
        self.mask.iter().all(|&v| v == 1)
    }

    /// Iterates over (global_volume, included) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.mask.iter().enumerate().map(|(idx, &v)| (idx, v == 1))
    }
}

#[cfg(test)]
mod tests {
    use super::{Run, RunSet, VolumeIndex};

    #[test]
    fn run_set_totals_volumes_across_runs() {
        let runs = RunSet::uniform(&[100, 120, 80], 2.0).expect("run set should be valid");
        assert_eq!(runs.len(), 3);
        assert_eq!(runs.total_volumes(), 300);
    }

    #[test]
    fn run_set_rejects_zero_volume_run() {
        let err = RunSet::new(vec![
            Run { nvols: 10, tr: 2.0 },
            Run { nvols: 0, tr: 2.0 },
        ])
        .expect_err("nvols=0 must fail");
        assert!(err.to_string().contains("run 2 has nvols=0"));
    }

    #[test]
    fn run_set_rejects_non_positive_tr() {
        let err = RunSet::new(vec![Run { nvols: 10, tr: 0.0 }]).expect_err("tr=0 must fail");
        assert!(err.to_string().contains("finite and positive"));

        let err =
            RunSet::new(vec![Run { nvols: 10, tr: f64::NAN }]).expect_err("NaN TR must fail");
        assert!(err.to_string().contains("finite and positive"));
    }

    #[test]
    fn run_set_rejects_empty() {
        let err = RunSet::new(vec![]).expect_err("empty run set must fail");
        assert!(err.to_string().contains("at least one run"));
    }

    #[test]
    fn volume_index_counts_retained_volumes() {
        let index = VolumeIndex::new(vec![1, 1, 0, 0, 1]).expect("mask should be valid");
        assert_eq!(index.len(), 5);
        assert_eq!(index.retained_count(), 3);
        assert!(!index.is_complete());
    }

    #[test]
    fn volume_index_all_included_is_complete() {
        let index = VolumeIndex::all_included(4).expect("mask should be valid");
        assert!(index.is_complete());
        assert_eq!(index.retained_count(), 4);
    }

    #[test]
    fn volume_index_rejects_non_binary_bytes() {
        let err = VolumeIndex::new(vec![1, 2, 0]).expect_err("non-binary mask must fail");
        assert!(err.to_string().contains("only 0/1 bytes"));
        assert!(err.to_string().contains("index 1 has 2"));
    }
}
