//! Static, transient and eigen analysis drivers
//!
//! A driver owns the equation map and the linear system and rebuilds both
//! whenever the domain stamp changes. A failed step leaves the domain at
//! its last committed state; the failure is kept in
//! [`last_error`](StaticAnalysis::last_error) and in the domain diagnostics.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::convergence::ConvergenceTest;
use super::eigen::EigenSolution;
use super::handler::ConstraintHandler;
use super::model::AnalysisModel;
use super::soe::LinearSoe;
use super::static_integrator::StaticIntegrator;
use super::transient_integrator::TransientIntegrator;
use super::{AnalysisOptions, AnalysisType};
use crate::domain::Domain;
use crate::error::{ErrorKind, FEAError, FEAResult};
use crate::results::{AnalysisSummary, StepReport};

/// Why the last analysis call stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    /// Zero-based step of the failing call
    pub step: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl AnalysisFailure {
    /// Non-zero status of `analyze` for this failure
    pub fn status_code(&self) -> i32 {
        status_code(self.kind)
    }
}

fn status_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Input => -1,
        ErrorKind::Constraint => -2,
        ErrorKind::Numerical => -3,
        ErrorKind::Convergence => -4,
        ErrorKind::Solver => -5,
        ErrorKind::State => -6,
    }
}

/// Failures a smaller step may cure
fn recoverable(e: &FEAError) -> bool {
    matches!(
        e.kind(),
        ErrorKind::Convergence | ErrorKind::Numerical | ErrorKind::Solver
    )
}

#[derive(Debug)]
struct Workspace {
    model: AnalysisModel,
    soe: Box<dyn LinearSoe>,
}

fn workspace<'a>(
    slot: &'a mut Option<Workspace>,
    domain: &Domain,
    options: &AnalysisOptions,
) -> FEAResult<&'a mut Workspace> {
    let stale = slot.as_ref().map_or(true, |w| !w.model.is_current(domain));
    if stale {
        if matches!(options.handler, ConstraintHandler::Lagrange { .. }) && options.soe.is_spd() {
            // multiplier rows make A indefinite
            return Err(FEAError::UnsupportedConstraint {
                handler: options.handler.name(),
                constraint: format!("{:?} system", options.soe),
            });
        }
        let model = AnalysisModel::build(domain, options.handler, options.numberer)?;
        let mut soe = options.soe.build();
        soe.set_size(model.num_eqn(), model.groups())?;
        log::info!(
            "analysis model: {} equations, {} handler, {} system",
            model.num_eqn(),
            options.handler.name(),
            soe.name()
        );
        *slot = Some(Workspace { model, soe });
    }
    slot.as_mut()
        .ok_or_else(|| FEAError::InvalidState("analysis workspace missing".to_string()))
}

fn record_failure(domain: &mut Domain, step: usize, e: &FEAError) -> AnalysisFailure {
    let failure = AnalysisFailure {
        step,
        kind: e.kind(),
        message: e.to_string(),
    };
    let t = domain.time();
    domain
        .diagnostics_mut()
        .error(failure.kind, format!("step {step}: {}", failure.message), t);
    failure
}

/// Undo the trial state of a failed step
fn revert_domain(domain: &mut Domain) -> FEAResult<()> {
    let t = domain.committed_time();
    domain.apply_load(t)?;
    domain.revert_to_last_commit()
}

// -------------------------------------------------------------------------
// Static
// -------------------------------------------------------------------------

#[derive(Debug)]
pub struct StaticAnalysis {
    options: AnalysisOptions,
    integrator: StaticIntegrator,
    test: ConvergenceTest,
    workspace: Option<Workspace>,
    committed_steps: usize,
    total_iterations: usize,
    reports: Vec<StepReport>,
    last_error: Option<AnalysisFailure>,
}

impl StaticAnalysis {
    /// Set up a static analysis starting from the committed load factor of
    /// `domain`
    pub fn new(options: AnalysisOptions, domain: &Domain) -> FEAResult<Self> {
        if options.analysis_type() != AnalysisType::Static {
            return Err(FEAError::InvalidInput(
                "static analysis needs a static integrator".to_string(),
            ));
        }
        let integrator = StaticIntegrator::new(&options.integrator, domain.committed_time())?;
        Ok(Self {
            test: options.test.clone(),
            options,
            integrator,
            workspace: None,
            committed_steps: 0,
            total_iterations: 0,
            reports: Vec::new(),
            last_error: None,
        })
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn load_factor(&self) -> f64 {
        self.integrator.load_factor()
    }

    pub fn committed_steps(&self) -> usize {
        self.committed_steps
    }

    pub fn last_error(&self) -> Option<&AnalysisFailure> {
        self.last_error.as_ref()
    }

    /// Iteration count and final norm of every committed step
    pub fn step_reports(&self) -> &[StepReport] {
        &self.reports
    }

    /// Norm history of the last step attempted
    pub fn test_history(&self) -> &[f64] {
        self.test.history()
    }

    /// Run `num_steps` steps; stops at the first step that fails
    pub fn run(&mut self, domain: &mut Domain, num_steps: usize) -> FEAResult<AnalysisSummary> {
        self.last_error = None;
        for step in 0..num_steps {
            if let Err(e) = self.step_with_cutbacks(domain, 0) {
                self.last_error = Some(record_failure(domain, step, &e));
                return Err(e);
            }
            self.committed_steps += 1;
        }
        domain.calculate_nodal_reactions(false)?;
        Ok(AnalysisSummary {
            committed_steps: self.committed_steps,
            total_iterations: self.total_iterations,
            time: domain.committed_time(),
        })
    }

    /// Status form of [`run`](Self::run): 0 on success
    pub fn analyze(&mut self, domain: &mut Domain, num_steps: usize) -> i32 {
        match self.run(domain, num_steps) {
            Ok(_) => 0,
            Err(e) => status_code(e.kind()),
        }
    }

    fn step_with_cutbacks(&mut self, domain: &mut Domain, depth: usize) -> FEAResult<()> {
        let Err(e) = self.try_step(domain) else {
            return Ok(());
        };
        revert_domain(domain)?;
        if let Some(w) = self.workspace.as_mut() {
            self.integrator.revert_step(&mut w.model);
        }
        if depth >= self.options.max_cutbacks || !recoverable(&e) {
            return Err(e);
        }
        let scale = self.integrator.scale();
        let t = domain.time();
        domain
            .diagnostics_mut()
            .warn(format!("{e}; retrying as two steps of {} of the increment", scale / 2.0), t);
        self.integrator.set_scale(scale / 2.0);
        let result = self
            .step_with_cutbacks(domain, depth + 1)
            .and_then(|_| self.step_with_cutbacks(domain, depth + 1));
        self.integrator.set_scale(scale);
        result
    }

    fn try_step(&mut self, domain: &mut Domain) -> FEAResult<()> {
        let w = workspace(&mut self.workspace, domain, &self.options)?;
        self.integrator.new_step(&mut w.model, domain, w.soe.as_mut())?;
        let report = self.options.algorithm.solve_current_step(
            &mut w.model,
            domain,
            &mut self.integrator,
            w.soe.as_mut(),
            &mut self.test,
        )?;
        self.integrator.set_iterations(report.iterations);
        self.integrator.commit(&mut w.model, domain);
        self.total_iterations += report.iterations;
        self.reports.push(report);
        log::info!(
            "λ = {:.6}: {} converged in {} iterations ({:e})",
            self.integrator.load_factor(),
            self.options.algorithm.name(),
            report.iterations,
            report.norm
        );
        Ok(())
    }
}

// -------------------------------------------------------------------------
// Transient
// -------------------------------------------------------------------------

#[derive(Debug)]
pub struct TransientAnalysis {
    options: AnalysisOptions,
    integrator: TransientIntegrator,
    test: ConvergenceTest,
    workspace: Option<Workspace>,
    committed_steps: usize,
    total_iterations: usize,
    reports: Vec<StepReport>,
    last_error: Option<AnalysisFailure>,
}

impl TransientAnalysis {
    pub fn new(options: AnalysisOptions) -> FEAResult<Self> {
        if options.analysis_type() != AnalysisType::Transient {
            return Err(FEAError::InvalidInput(
                "transient analysis needs a transient integrator".to_string(),
            ));
        }
        let integrator = TransientIntegrator::new(&options.integrator)?;
        Ok(Self {
            test: options.test.clone(),
            options,
            integrator,
            workspace: None,
            committed_steps: 0,
            total_iterations: 0,
            reports: Vec::new(),
            last_error: None,
        })
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn committed_steps(&self) -> usize {
        self.committed_steps
    }

    pub fn last_error(&self) -> Option<&AnalysisFailure> {
        self.last_error.as_ref()
    }

    pub fn step_reports(&self) -> &[StepReport] {
        &self.reports
    }

    /// Run `num_steps` steps of size `dt`
    pub fn run(&mut self, domain: &mut Domain, num_steps: usize, dt: f64) -> FEAResult<AnalysisSummary> {
        self.last_error = None;
        for step in 0..num_steps {
            if let Err(e) = self.step_with_cutbacks(domain, dt, 0) {
                self.last_error = Some(record_failure(domain, step, &e));
                return Err(e);
            }
            self.committed_steps += 1;
        }
        domain.calculate_nodal_reactions(true)?;
        Ok(AnalysisSummary {
            committed_steps: self.committed_steps,
            total_iterations: self.total_iterations,
            time: domain.committed_time(),
        })
    }

    pub fn analyze(&mut self, domain: &mut Domain, num_steps: usize, dt: f64) -> i32 {
        match self.run(domain, num_steps, dt) {
            Ok(_) => 0,
            Err(e) => status_code(e.kind()),
        }
    }

    fn step_with_cutbacks(&mut self, domain: &mut Domain, dt: f64, depth: usize) -> FEAResult<()> {
        let Err(e) = self.try_step(domain, dt) else {
            return Ok(());
        };
        revert_domain(domain)?;
        if let Some(w) = self.workspace.as_mut() {
            w.model.revert_to_last_commit();
        }
        if depth >= self.options.max_cutbacks || !recoverable(&e) {
            return Err(e);
        }
        let t = domain.time();
        domain
            .diagnostics_mut()
            .warn(format!("{e}; retrying with Δt = {:e}", dt / 2.0), t);
        self.step_with_cutbacks(domain, dt / 2.0, depth + 1)?;
        self.step_with_cutbacks(domain, dt / 2.0, depth + 1)
    }

    fn try_step(&mut self, domain: &mut Domain, dt: f64) -> FEAResult<()> {
        let w = workspace(&mut self.workspace, domain, &self.options)?;
        self.integrator.new_step(&w.model, domain, dt)?;
        let report = self.options.algorithm.solve_current_step(
            &mut w.model,
            domain,
            &mut self.integrator,
            w.soe.as_mut(),
            &mut self.test,
        )?;
        self.integrator.commit(&mut w.model, domain)?;
        self.total_iterations += report.iterations;
        self.reports.push(report);
        log::debug!(
            "t = {:.6}: {} converged in {} iterations ({:e})",
            domain.committed_time(),
            self.integrator.name(),
            report.iterations,
            report.norm
        );
        Ok(())
    }
}

// -------------------------------------------------------------------------
// Eigen
// -------------------------------------------------------------------------

#[derive(Debug)]
pub struct EigenAnalysis {
    options: AnalysisOptions,
    solution: Option<EigenSolution>,
    last_error: Option<AnalysisFailure>,
}

impl EigenAnalysis {
    pub fn new(options: AnalysisOptions) -> FEAResult<Self> {
        if let ConstraintHandler::Lagrange { .. } = options.handler {
            return Err(FEAError::UnsupportedConstraint {
                handler: options.handler.name(),
                constraint: "eigen analysis".to_string(),
            });
        }
        Ok(Self {
            options,
            solution: None,
            last_error: None,
        })
    }

    pub fn last_error(&self) -> Option<&AnalysisFailure> {
        self.last_error.as_ref()
    }

    /// Equation-space solution of the last successful run
    pub fn solution(&self) -> Option<&EigenSolution> {
        self.solution.as_ref()
    }

    /// Solve for the `num_modes` lowest modes and store them in the domain
    pub fn run(&mut self, domain: &mut Domain, num_modes: usize) -> FEAResult<Vec<f64>> {
        self.last_error = None;
        match self.solve(domain, num_modes) {
            Ok(values) => Ok(values),
            Err(e) => {
                self.last_error = Some(record_failure(domain, 0, &e));
                Err(e)
            }
        }
    }

    pub fn analyze(&mut self, domain: &mut Domain, num_modes: usize) -> i32 {
        match self.run(domain, num_modes) {
            Ok(_) => 0,
            Err(e) => status_code(e.kind()),
        }
    }

    fn solve(&mut self, domain: &mut Domain, num_modes: usize) -> FEAResult<Vec<f64>> {
        let model = AnalysisModel::build(domain, self.options.handler, self.options.numberer)?;
        let mut soe = self.options.soe.build();
        soe.set_size(model.num_eqn(), model.groups())?;
        let solver = self.options.eigen_solver;
        let solution = solver.solve(&model, domain, soe.as_mut(), num_modes)?;

        let modes = solution.values.len();
        let mut shapes: BTreeMap<usize, DMatrix<f64>> = BTreeMap::new();
        for c in 0..modes {
            let x = solution.vectors.column(c).rows(0, model.num_dof_equations()).into_owned();
            for (tag, v) in model.expand(domain, &x, false)? {
                let block = shapes
                    .entry(tag)
                    .or_insert_with(|| DMatrix::zeros(v.len(), modes));
                block.set_column(c, &v);
            }
        }
        domain.set_eigen(solution.values.clone(), shapes);
        log::info!(
            "{}: {modes} modes, T1 = {:.4e} s",
            solver.name(),
            domain.periods().first().copied().unwrap_or(0.0)
        );
        let values = solution.values.clone();
        self.solution = Some(solution);
        Ok(values)
    }
}
