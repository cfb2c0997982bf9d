//! `BmiError`: failure status reported by a wrapped model.

use thiserror::Error;

/// A non-success status returned by a model component.
///
/// Model components report failures as a status code plus a message. The
/// adapter never interprets the code beyond [`BmiError::is_not_implemented`];
/// everything else is propagated as a `CouplingError::Model`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("status {status}: {message}")]
pub struct BmiError {
    /// Native status code (non-zero).
    pub status: i32,
    /// Human-readable description supplied by the model.
    pub message: String,
}

impl BmiError {
    /// Generic failure status.
    pub const FAILURE: i32 = 1;

    /// Status for operations a model does not provide.
    pub const NOT_IMPLEMENTED: i32 = -1;

    /// Create an error with an explicit status code.
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        BmiError {
            status,
            message: message.into(),
        }
    }

    /// Create a generic failure.
    pub fn failure(message: impl Into<String>) -> Self {
        BmiError::new(Self::FAILURE, message)
    }

    /// Create the status a model returns for an operation it lacks.
    pub fn not_implemented(operation: &str) -> Self {
        BmiError::new(Self::NOT_IMPLEMENTED, format!("{} is not implemented", operation))
    }

    /// Whether this error only signals a missing optional operation.
    pub fn is_not_implemented(&self) -> bool {
        self.status == Self::NOT_IMPLEMENTED
    }
}

/// Convenience alias for results crossing the model boundary.
pub type BmiResult<T> = Result<T, BmiError>;
