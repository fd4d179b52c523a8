//! Constraint handlers: how SP and MP constraints enter the equations

use serde::{Deserialize, Serialize};

/// Strategy for imposing single- and multi-point constraints
///
/// * `Plain` removes homogeneous SP dofs from the equations and accepts
///   nothing else.
/// * `Transformation` eliminates SP dofs and condenses MP-constrained dofs
///   onto their retained dofs (u = T·u_r).
/// * `Penalty` keeps every dof and adds α·BᵀB stiffness per constraint row.
/// * `Lagrange` adds one multiplier equation per constraint row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConstraintHandler {
    Plain,
    #[default]
    Transformation,
    Penalty { alpha_sp: f64, alpha_mp: f64 },
    Lagrange { alpha: f64 },
}

impl ConstraintHandler {
    pub fn name(&self) -> &'static str {
        match self {
            ConstraintHandler::Plain => "Plain",
            ConstraintHandler::Transformation => "Transformation",
            ConstraintHandler::Penalty { .. } => "Penalty",
            ConstraintHandler::Lagrange { .. } => "Lagrange",
        }
    }

    /// Whether constrained dofs keep their own equations
    pub(crate) fn keeps_all_dofs(&self) -> bool {
        matches!(
            self,
            ConstraintHandler::Penalty { .. } | ConstraintHandler::Lagrange { .. }
        )
    }

    /// Scale of SP and MP rows
    pub(crate) fn row_scales(&self) -> (f64, f64) {
        match *self {
            ConstraintHandler::Penalty { alpha_sp, alpha_mp } => (alpha_sp, alpha_mp),
            ConstraintHandler::Lagrange { alpha } => (alpha, alpha),
            _ => (0.0, 0.0),
        }
    }
}
