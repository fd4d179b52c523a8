//! Error types for the analysis core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of every failure the core can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed geometry, duplicate tags, missing references
    Input,
    /// Redundant or contradictory constraints, unsupported constraint/handler pairs
    Constraint,
    /// Singular tangent, non-finite residual, indefinite mass
    Numerical,
    /// Iteration budget exhausted
    Convergence,
    /// Factorization or eigen solver failure
    Solver,
    /// Operation invoked outside its allowed lifecycle
    State,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Input => "InputError",
            ErrorKind::Constraint => "ConstraintError",
            ErrorKind::Numerical => "NumericalError",
            ErrorKind::Convergence => "ConvergenceError",
            ErrorKind::Solver => "SolverError",
            ErrorKind::State => "StateError",
        };
        f.write_str(name)
    }
}

/// Main error type for analysis operations
#[derive(Error, Debug)]
pub enum FEAError {
    #[error("Node {0} not found in domain")]
    NodeNotFound(usize),

    #[error("Element {0} not found in domain")]
    ElementNotFound(usize),

    #[error("Constraint {0} not found in domain")]
    ConstraintNotFound(usize),

    #[error("Load pattern {0} not found in domain")]
    PatternNotFound(usize),

    #[error("Material '{0}' not found in handler")]
    MaterialNotFound(String),

    #[error("Section '{0}' not found in handler")]
    SectionNotFound(String),

    #[error("Duplicate {kind} tag {tag}")]
    DuplicateTag { kind: &'static str, tag: usize },

    #[error("Duplicate name '{0}' already exists")]
    DuplicateName(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid DOF {dof} for node {node} with {ndf} DOFs")]
    InvalidDof { node: usize, dof: usize, ndf: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Redundant constraint: {0}")]
    RedundantConstraint(String),

    #[error("Contradictory constraint: {0}")]
    ContradictoryConstraint(String),

    #[error("{handler} handler cannot represent {constraint}")]
    UnsupportedConstraint {
        handler: &'static str,
        constraint: String,
    },

    #[error("Singular matrix - model may be unstable or have insufficient supports")]
    SingularMatrix,

    #[error("Non-finite value in {0}")]
    NonFinite(String),

    #[error("Mass matrix is not positive definite: {0}")]
    MassNotPositiveDefinite(String),

    #[error("Convergence failed after {iterations} iterations (last norm {norm:e})")]
    ConvergenceFailed { iterations: usize, norm: f64 },

    #[error("Solver '{solver}' failed with code {code}: {message}")]
    Solver {
        solver: &'static str,
        code: i32,
        message: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Domain not analyzed - run an analysis first")]
    NotAnalyzed,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FEAError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FEAError::NodeNotFound(_)
            | FEAError::ElementNotFound(_)
            | FEAError::ConstraintNotFound(_)
            | FEAError::PatternNotFound(_)
            | FEAError::MaterialNotFound(_)
            | FEAError::SectionNotFound(_)
            | FEAError::DuplicateTag { .. }
            | FEAError::DuplicateName(_)
            | FEAError::InvalidGeometry(_)
            | FEAError::InvalidDof { .. }
            | FEAError::InvalidInput(_)
            | FEAError::IoError(_)
            | FEAError::SerializationError(_) => ErrorKind::Input,
            FEAError::RedundantConstraint(_)
            | FEAError::ContradictoryConstraint(_)
            | FEAError::UnsupportedConstraint { .. } => ErrorKind::Constraint,
            FEAError::SingularMatrix
            | FEAError::NonFinite(_)
            | FEAError::MassNotPositiveDefinite(_) => ErrorKind::Numerical,
            FEAError::ConvergenceFailed { .. } => ErrorKind::Convergence,
            FEAError::Solver { .. } => ErrorKind::Solver,
            FEAError::InvalidState(_) | FEAError::NotAnalyzed => ErrorKind::State,
        }
    }

    pub(crate) fn solver(solver: &'static str, code: i32, message: impl Into<String>) -> Self {
        FEAError::Solver {
            solver,
            code,
            message: message.into(),
        }
    }
}

/// Result type for analysis operations
pub type FEAResult<T> = Result<T, FEAError>;

/// Status returned by material and section trial updates
///
/// Trial updates never fail with an error; they flag the problem and let the
/// caller decide whether the step is recoverable.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialStatus {
    Ok,
    Failed,
}

impl TrialStatus {
    pub fn is_ok(self) -> bool {
        self == TrialStatus::Ok
    }

    /// Combine two statuses; any failure wins
    pub fn and(self, other: TrialStatus) -> TrialStatus {
        if self.is_ok() && other.is_ok() {
            TrialStatus::Ok
        } else {
            TrialStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(FEAError::NodeNotFound(3).kind(), ErrorKind::Input);
        assert_eq!(FEAError::SingularMatrix.kind(), ErrorKind::Numerical);
        assert_eq!(
            FEAError::ConvergenceFailed {
                iterations: 10,
                norm: 1.0
            }
            .kind(),
            ErrorKind::Convergence
        );
        assert_eq!(FEAError::NotAnalyzed.kind(), ErrorKind::State);
        assert_eq!(ErrorKind::Constraint.to_string(), "ConstraintError");
    }

    #[test]
    fn test_trial_status_combination() {
        assert!(TrialStatus::Ok.and(TrialStatus::Ok).is_ok());
        assert!(!TrialStatus::Ok.and(TrialStatus::Failed).is_ok());
    }
}
