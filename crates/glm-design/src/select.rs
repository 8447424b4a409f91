// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{GlmError, Run, RunSelection, RunSet, VolumeIndex};

/// Outcome of run selection: the volume mask over the full timeline and the
/// reduced run set containing only modeled runs, in original order.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSplit {
    pub volume_index: VolumeIndex,
    pub modeled: RunSet,
}

/// Resolves which runs and volumes are included.
///
/// `RunSelection::All` short-circuits to an all-ones mask without per-run
/// index-bound validation. Explicit selections use 1-based run indices and
/// must stay within the available run count. All included runs must share
/// one TR.
pub fn select_runs(selection: &RunSelection, runs: &RunSet) -> Result<RunSplit, GlmError> {
    let included: Vec<bool> = match selection {
        RunSelection::All => vec![true; runs.len()],
        RunSelection::Runs(indices) => {
            if indices.is_empty() {
                return Err(GlmError::configuration(
                    "run selection must include at least one run",
                ));
            }
            for &index in indices {
                if index == 0 {
                    return Err(GlmError::configuration(
                        "run indices are 1-based; got run index 0",
                    ));
                }
                if index > runs.len() {
                    return Err(GlmError::configuration(format!(
                        "included run exceeds available runs: run {} of {}",
                        index,
                        runs.len()
                    )));
                }
            }
            (1..=runs.len()).map(|run| indices.contains(&run)).collect()
        }
    };

    validate_tr_consistency(runs.runs(), &included)?;

    let mut mask = Vec::with_capacity(runs.total_volumes());
    let mut modeled = Vec::new();
    for (run, keep) in runs.runs().iter().zip(included.iter()) {
        mask.extend(std::iter::repeat(u8::from(*keep)).take(run.nvols));
        if *keep {
            modeled.push(*run);
        }
    }

    Ok(RunSplit {
        volume_index: VolumeIndex::new(mask)?,
        modeled: RunSet::new(modeled)?,
    })
}

fn validate_tr_consistency(runs: &[Run], included: &[bool]) -> Result<(), GlmError> {
    let mut trs = runs
        .iter()
        .zip(included.iter())
        .filter(|(_, keep)| **keep)
        .map(|(run, _)| run.tr);
    let Some(first) = trs.next() else {
        return Err(GlmError::configuration(
            "run selection must include at least one run",
        ));
    };
    if trs.any(|tr| tr != first) {
        return Err(GlmError::configuration(
            "inconsistent TR across modeled runs",
        ));
    }
    Ok(())
}
