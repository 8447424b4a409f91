// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Diagnostics schema version for first-level model run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from one subject's pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDiagnostics {
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub subject: String,
    pub glm_name: String,
    pub n_runs_total: usize,
    pub n_runs_modeled: usize,
    pub n_volumes_total: usize,
    pub n_volumes_retained: usize,
    pub design_columns: usize,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl ModelDiagnostics {
    pub fn new(subject: impl Into<String>, glm_name: impl Into<String>) -> Self {
        Self {
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            subject: subject.into(),
            glm_name: glm_name.into(),
            n_runs_total: 0,
            n_runs_modeled: 0,
            n_volumes_total: 0,
            n_volumes_retained: 0,
            design_columns: 0,
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[cfg(test)]
mod tests {
    use super::{ModelDiagnostics, DIAGNOSTICS_SCHEMA_VERSION};

    #[test]
    fn new_sets_schema_and_engine_version() {
        let diagnostics = ModelDiagnostics::new("sub-01", "task-main");
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn serde_roundtrip_preserves_all_fields() {
        let mut diagnostics = ModelDiagnostics::new("sub-02", "task-rest");
        diagnostics.n_runs_total = 4;
        diagnostics.n_runs_modeled = 3;
        diagnostics.n_volumes_total = 480;
        diagnostics.n_volumes_retained = 360;
        diagnostics.design_columns = 12;
        diagnostics.runtime_ms = Some(40);
        diagnostics.note("run 2 excluded by configuration");
        diagnostics.warn("robust fit hit iteration cap");

        let encoded = serde_json::to_string(&diagnostics).expect("diagnostics should serialize");
        let decoded: ModelDiagnostics =
            serde_json::from_str(&encoded).expect("diagnostics should deserialize");
        assert_eq!(decoded, diagnostics);
    }
}
