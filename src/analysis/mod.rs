//! Solution strategies: equation numbering, constraint handling, linear
//! systems, iteration algorithms, integrators and the analysis drivers

mod algorithm;
mod convergence;
mod driver;
mod eigen;
mod handler;
mod model;
mod numberer;
mod soe;
mod static_integrator;
mod transient_integrator;

use serde::{Deserialize, Serialize};

pub use algorithm::Algorithm;
pub use convergence::{ConvergenceTest, TestKind, TestResult};
pub use driver::{AnalysisFailure, EigenAnalysis, StaticAnalysis, TransientAnalysis};
pub use eigen::{EigenSolution, EigenSolver};
pub use handler::ConstraintHandler;
pub use model::{AnalysisModel, DofSlot, Field, MatrixCoefficients, Tangent};
pub use numberer::Numberer;
pub use soe::{
    BandGeneral, BandSpd, FullGeneral, LinearSoe, SoeKind, SparseGeneral, SparseSpd,
};
pub use static_integrator::StaticIntegrator;
pub use transient_integrator::TransientIntegrator;

use crate::domain::Domain;
use crate::error::FEAResult;
use nalgebra::DVector;

/// Kind of analysis an option set drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisType {
    Static,
    Transient,
    Eigen,
}

/// Integrator choice and parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntegratorOptions {
    /// λ += dλ per step; with `num_iter > 0` the increment adapts by
    /// `num_iter / iterations` within `[min, max]`
    LoadControl {
        d_lambda: f64,
        num_iter: usize,
        min: f64,
        max: f64,
    },
    /// Increment one nodal dof by `du`; λ is an unknown
    DisplacementControl { node: usize, dof: usize, du: f64 },
    /// √(ΔUᵀΔU + ψ·Δλ²·FᵀF) = ΔS
    ArcLength { ds: f64, psi: f64 },
    Newmark { gamma: f64, beta: f64 },
    /// Hilber–Hughes–Taylor with α in [2/3, 1]
    Hht { alpha: f64 },
}

impl IntegratorOptions {
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            IntegratorOptions::Newmark { .. } | IntegratorOptions::Hht { .. } => {
                AnalysisType::Transient
            }
            _ => AnalysisType::Static,
        }
    }
}

/// Complete solution strategy
///
/// Defaults: Newton, NormDispIncr (1e-8, 25 iterations), BandGeneral,
/// Transformation handler, RCM numbering, no step cutbacks, load control
/// with dλ = 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub algorithm: Algorithm,
    pub integrator: IntegratorOptions,
    pub test: ConvergenceTest,
    pub soe: SoeKind,
    pub handler: ConstraintHandler,
    pub numberer: Numberer,
    /// Times a failed static step may be halved before the analysis fails
    pub max_cutbacks: usize,
    pub eigen_solver: EigenSolver,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            integrator: IntegratorOptions::LoadControl {
                d_lambda: 1.0,
                num_iter: 0,
                min: 1.0,
                max: 1.0,
            },
            test: ConvergenceTest::default(),
            soe: SoeKind::default(),
            handler: ConstraintHandler::default(),
            numberer: Numberer::default(),
            max_cutbacks: 0,
            eigen_solver: EigenSolver::default(),
        }
    }
}

impl AnalysisOptions {
    /// Static analysis with a constant load increment
    pub fn static_load_control(d_lambda: f64) -> Self {
        Self {
            integrator: IntegratorOptions::LoadControl {
                d_lambda,
                num_iter: 0,
                min: d_lambda,
                max: d_lambda,
            },
            ..Self::default()
        }
    }

    /// Static analysis whose increment adapts to the iteration count
    pub fn static_adaptive_load_control(d_lambda: f64, num_iter: usize, min: f64, max: f64) -> Self {
        Self {
            integrator: IntegratorOptions::LoadControl {
                d_lambda,
                num_iter,
                min,
                max,
            },
            ..Self::default()
        }
    }

    pub fn static_displacement_control(node: usize, dof: usize, du: f64) -> Self {
        Self {
            integrator: IntegratorOptions::DisplacementControl { node, dof, du },
            ..Self::default()
        }
    }

    pub fn static_arc_length(ds: f64, psi: f64) -> Self {
        Self {
            integrator: IntegratorOptions::ArcLength { ds, psi },
            ..Self::default()
        }
    }

    pub fn transient_newmark(gamma: f64, beta: f64) -> Self {
        Self {
            integrator: IntegratorOptions::Newmark { gamma, beta },
            ..Self::default()
        }
    }

    pub fn transient_hht(alpha: f64) -> Self {
        Self {
            integrator: IntegratorOptions::Hht { alpha },
            ..Self::default()
        }
    }

    /// Options for an eigen analysis
    pub fn eigen(solver: EigenSolver) -> Self {
        Self {
            eigen_solver: solver,
            ..Self::default()
        }
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.integrator.analysis_type()
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_test(mut self, test: ConvergenceTest) -> Self {
        self.test = test;
        self
    }

    /// Set the iteration budget of the convergence test
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.test.max_iter = max_iter;
        self
    }

    /// Set the tolerance of the convergence test
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.test.tol = tol;
        self
    }

    pub fn with_soe(mut self, soe: SoeKind) -> Self {
        self.soe = soe;
        self
    }

    pub fn with_handler(mut self, handler: ConstraintHandler) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_numberer(mut self, numberer: Numberer) -> Self {
        self.numberer = numberer;
        self
    }

    pub fn with_max_cutbacks(mut self, max_cutbacks: usize) -> Self {
        self.max_cutbacks = max_cutbacks;
        self
    }

    pub fn with_eigen_solver(mut self, solver: EigenSolver) -> Self {
        self.eigen_solver = solver;
        self
    }
}

/// Step-level operations the iteration algorithms drive
pub trait Integrator {
    /// Assemble the system matrix for the current trial state
    fn form_tangent(
        &mut self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
        tangent: Tangent,
    ) -> FEAResult<()>;

    /// Assemble the right-hand side for the current trial state
    fn form_unbalance(
        &mut self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
    ) -> FEAResult<()>;

    /// Apply the solution `dx` of the current system and run state
    /// determination; returns the displacement increment actually applied
    fn update(
        &mut self,
        model: &mut AnalysisModel,
        domain: &mut Domain,
        soe: &mut dyn LinearSoe,
        dx: &DVector<f64>,
    ) -> FEAResult<DVector<f64>>;
}
