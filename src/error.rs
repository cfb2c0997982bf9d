//! Structured error types for Confluence.
//!
//! All fallible public APIs return `CouplingResult<T>`. Callers can tell
//! registration mistakes (bad intervals, unknown model names) apart from
//! failures raised while a run is in progress (unit mismatches, grid
//! mismatches, wrapped-model failures). Nothing in the crate retries or
//! swallows an error; every variant is fatal to the call that produced it.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::BmiError;

/// The top-level error type for the coupling layer.
#[derive(Debug, Error)]
pub enum CouplingError {
    // ── Registration / configuration errors ───────────────

    /// Invalid registration parameters (non-positive interval, duplicate
    /// event name, malformed configuration).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A symbolic model name could not be resolved in the registry.
    #[error("model '{0}' is not registered")]
    UnknownModel(String),

    // ── Units ─────────────────────────────────────────────

    /// A requested conversion is not possible between two unit strings.
    #[error("cannot convert from '{from}' to '{to}': {reason}")]
    Units {
        from: String,
        to: String,
        reason: String,
    },

    // ── Grids ─────────────────────────────────────────────

    /// No correspondence can be built between two grids.
    #[error("incompatible grids: {0}")]
    IncompatibleGrid(String),

    /// A grid id was referenced that the model never declared.
    #[error("grid {0} is not declared by the model")]
    UnknownGrid(i32),

    // ── Model errors ──────────────────────────────────────

    /// The wrapped model reported a failure.
    #[error("model call {operation}({args}) failed: {source}")]
    Model {
        operation: &'static str,
        args: String,
        #[source]
        source: BmiError,
    },

    /// A variable name was referenced that the model does not declare.
    #[error("variable '{0}' is not declared by the model")]
    UnknownVariable(String),

    /// Values were requested from a variable that is not an output.
    #[error("variable '{0}' is not an output variable")]
    NotAnOutput(String),

    /// An operation that needs an initialized model was called too early.
    #[error("model '{0}' is not initialized")]
    NotInitialized(String),

    /// Time interpolation was requested outside what has been recorded.
    #[error("time interpolation failed for '{name}': {reason}")]
    TimeInterpolation { name: String, reason: String },

    // ── Environment ───────────────────────────────────────

    /// Entering or leaving a model's working directory failed.
    #[error("cannot change working directory to {}: {source}", path.display())]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CouplingError {
    /// Shorthand for a [`CouplingError::Units`] error.
    pub fn units(from: impl Into<String>, to: impl Into<String>, reason: impl Into<String>) -> Self {
        CouplingError::Units {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised by the wrapped model itself.
    pub fn is_model_error(&self) -> bool {
        matches!(self, CouplingError::Model { .. })
    }
}

/// Convenience alias for `Result<T, CouplingError>`.
pub type CouplingResult<T> = Result<T, CouplingError>;
