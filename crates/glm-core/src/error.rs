// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error taxonomy for the first-level GLM pipeline.
///
/// Configuration problems are user-correctable and abort the single-shot
/// batch run immediately; solver failures are surfaced opaquely and never
/// interpreted further.
#[derive(Debug, Error)]
pub enum GlmError {
    /// Bad or missing user-supplied parameters (TR mismatch, out-of-range
    /// run index, malformed model configuration).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Required scan parameters absent from both the model configuration and
    /// the saved preprocessing parameters.
    #[error("missing required parameters: {0}")]
    MissingParameters(String),

    /// Opaque failure surfaced from a design or estimation collaborator.
    #[error("external solver error: {0}")]
    ExternalSolver(String),

    /// Iterative estimation exceeded its iteration budget.
    #[error("convergence failure: {0}")]
    Convergence(String),

    /// Structurally invalid input to a library routine.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Numerical degeneracy (singular normal equations, non-finite values).
    #[error("numerical issue: {0}")]
    NumericalIssue(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GlmError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn missing_parameters(msg: impl Into<String>) -> Self {
        Self::MissingParameters(msg.into())
    }

    pub fn external_solver(msg: impl Into<String>) -> Self {
        Self::ExternalSolver(msg.into())
    }

    pub fn convergence(msg: impl Into<String>) -> Self {
        Self::Convergence(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    /// Stable machine-readable code for structured CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::MissingParameters(_) => "missing_parameters",
            Self::ExternalSolver(_) => "external_solver",
            Self::Convergence(_) => "convergence",
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
        }
    }
}
