use crate::weights::WeightVector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The shared error taxonomy for the engine.
///
/// Every variant names the offending entity (feature, method or algorithm) so
/// callers never receive a bare message. `kind()` exposes the taxonomy as a
/// machine-readable discriminant for transport boundaries.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("Insufficient data for '{entity}': {rows} rows available, {required} required")]
    DataInsufficient {
        entity: String,
        rows: usize,
        required: usize,
    },

    #[error("Feature '{feature}' has zero variance and carries no information")]
    ZeroVariance { feature: String },

    #[error("Numeric instability in '{entity}': {detail}")]
    NumericInstability { entity: String, detail: String },

    #[error("Optimization with '{algorithm}' found no feasible solution: {detail}")]
    OptimizationFailed {
        algorithm: String,
        detail: String,
        /// Best candidate found even though it violates the constraints.
        /// Surfaced for diagnostics, never to be used as a valid result.
        best_infeasible: Option<WeightVector>,
    },

    #[error("Validation method '{method}' is not applicable: {reason}")]
    ValidationInapplicable { method: String, reason: String },

    #[error("Constraint violation on '{entity}': {detail}")]
    ConstraintViolation { entity: String, detail: String },

    #[error("Invalid input for '{entity}': {detail}")]
    InvalidInput { entity: String, detail: String },
}

/// Machine-readable error discriminant, stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataInsufficient,
    NumericInstability,
    OptimizationFailed,
    ValidationInapplicable,
    ConstraintViolation,
    InvalidInput,
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            // Too little variance is a data-quality problem, same bucket as
            // too few rows.
            CoreError::DataInsufficient { .. } | CoreError::ZeroVariance { .. } => {
                ErrorKind::DataInsufficient
            }
            CoreError::NumericInstability { .. } => ErrorKind::NumericInstability,
            CoreError::OptimizationFailed { .. } => ErrorKind::OptimizationFailed,
            CoreError::ValidationInapplicable { .. } => ErrorKind::ValidationInapplicable,
            CoreError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            CoreError::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }

    /// Shorthand used by numeric code when an internal calculation produced
    /// a NaN or divided by zero.
    pub fn unstable(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        CoreError::NumericInstability {
            entity: entity.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            entity: entity.into(),
            detail: detail.into(),
        }
    }
}
