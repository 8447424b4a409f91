// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use glm_core::{ConditionSpec, GlmError, ModelSpec, RegressorSpec, VolumeIndex};

/// Rewrites a condition's onsets, durations, and parametric values for a
/// timeline with excluded volumes.
///
/// The sparse specification is expanded into dense per-volume vectors (a
/// 0/1 marker at onset volumes plus parallel duration and parametric
/// values), excluded positions are dropped, and the result is collapsed
/// back to sparse form re-based against the shortened timeline. Onsets
/// falling on excluded volumes disappear: an event inside an excluded run
/// cannot be modeled.
pub fn adjust_condition(
    condition: &mut ConditionSpec,
    index: &VolumeIndex,
) -> Result<(), GlmError> {
    if index.is_complete() {
        return Ok(());
    }
    let total = index.len();
    if let Some(&onset) = condition.onsets.iter().find(|&&onset| onset >= total) {
        return Err(GlmError::configuration(format!(
            "condition '{}': onset {onset} beyond total volume count {total}",
            condition.name
        )));
    }

    let mut marker = vec![0u8; total];
    let mut dense_durations = vec![0.0; total];
    let mut dense_parametrics = vec![vec![0.0; total]; condition.parametrics.len()];
    for (slot, &onset) in condition.onsets.iter().enumerate() {
        marker[onset] = 1;
        dense_durations[onset] = condition.durations[slot];
        for (parametric, dense) in condition
            .parametrics
            .iter()
            .zip(dense_parametrics.iter_mut())
        {
            dense[onset] = parametric.values[slot];
        }
    }

    let mut onsets = Vec::new();
    let mut durations = Vec::new();
    let mut parametric_values = vec![Vec::new(); condition.parametrics.len()];
    let mut retained = 0usize;
    for (volume, included) in index.iter() {
        if !included {
            continue;
        }
        if marker[volume] == 1 {
            onsets.push(retained);
            durations.push(dense_durations[volume]);
            for (dense, values) in dense_parametrics.iter().zip(parametric_values.iter_mut()) {
                values.push(dense[volume]);
            }
        }
        retained += 1;
    }

    condition.onsets = onsets;
    condition.durations = durations;
    for (parametric, values) in condition
        .parametrics
        .iter_mut()
        .zip(parametric_values.into_iter())
    {
        parametric.values = values;
    }
    Ok(())
}

/// Filters a per-volume regressor down to the retained volumes.
///
/// Regressors are already dense, so exclusion is a direct element-wise
/// filter with no sparse round trip.
pub fn adjust_regressor(
    regressor: &mut RegressorSpec,
    index: &VolumeIndex,
) -> Result<(), GlmError> {
    if regressor.values.len() != index.len() {
        return Err(GlmError::configuration(format!(
            "regressor '{}' has {} values for {} volumes",
            regressor.name,
            regressor.values.len(),
            index.len()
        )));
    }
    if index.is_complete() {
        return Ok(());
    }
    regressor.values = regressor
        .values
        .iter()
        .zip(index.iter())
        .filter(|(_, (_, included))| *included)
        .map(|(value, _)| *value)
        .collect();
    Ok(())
}

/// Adjusts every condition and regressor in the model for the given volume
/// mask. A complete mask makes this a strict no-op.
pub fn adjust_model(spec: &mut ModelSpec, index: &VolumeIndex) -> Result<(), GlmError> {
    if index.is_complete() {
        return Ok(());
    }
    for condition in spec.conditions_mut() {
        adjust_condition(condition, index)?;
    }
    for regressor in &mut spec.regressors {
        adjust_regressor(regressor, index)?;
    }
    Ok(())
}
