//! Solution algorithms for one load or time step

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::convergence::{ConvergenceTest, TestResult};
use super::model::{AnalysisModel, Tangent};
use super::soe::LinearSoe;
use super::Integrator;
use crate::domain::Domain;
use crate::error::{FEAError, FEAResult};
use crate::results::StepReport;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Algorithm {
    /// One solve per step, no convergence check
    Linear,
    /// New tangent every iteration
    Newton { initial_tangent: bool },
    /// Tangent formed once per step
    ModifiedNewton { initial_tangent: bool },
    /// Modified Newton accelerated over a Krylov subspace of past corrections
    KrylovNewton { max_dim: usize },
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Newton {
            initial_tangent: false,
        }
    }
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Linear => "Linear",
            Algorithm::Newton { .. } => "Newton",
            Algorithm::ModifiedNewton { .. } => "ModifiedNewton",
            Algorithm::KrylovNewton { .. } => "KrylovNewton",
        }
    }

    /// Iterate the current step to equilibrium
    ///
    /// On a diverged test the step fails with `ConvergenceFailed`; the
    /// caller owns reverting the domain.
    pub fn solve_current_step(
        &self,
        model: &mut AnalysisModel,
        domain: &mut Domain,
        integrator: &mut dyn Integrator,
        soe: &mut dyn LinearSoe,
        test: &mut ConvergenceTest,
    ) -> FEAResult<StepReport> {
        test.start();
        match *self {
            Algorithm::Linear => {
                integrator.form_tangent(model, domain, soe, Tangent::Current)?;
                integrator.form_unbalance(model, domain, soe)?;
                let dx = soe.solve()?;
                let du = integrator.update(model, domain, soe, &dx)?;
                Ok(StepReport {
                    iterations: 1,
                    norm: du.norm(),
                })
            }
            Algorithm::Newton { initial_tangent } => {
                let tangent = tangent_kind(initial_tangent);
                newton_loop(model, domain, integrator, soe, test, |k| (k == 0 || !initial_tangent).then_some(tangent))
            }
            Algorithm::ModifiedNewton { initial_tangent } => {
                let tangent = tangent_kind(initial_tangent);
                newton_loop(model, domain, integrator, soe, test, |k| (k == 0).then_some(tangent))
            }
            Algorithm::KrylovNewton { max_dim } => {
                krylov_loop(model, domain, integrator, soe, test, max_dim.max(1))
            }
        }
    }
}

fn tangent_kind(initial: bool) -> Tangent {
    if initial {
        Tangent::Initial
    } else {
        Tangent::Current
    }
}

fn failed(test: &ConvergenceTest) -> FEAError {
    FEAError::ConvergenceFailed {
        iterations: test.iterations(),
        norm: test.last_norm(),
    }
}

fn report(test: &ConvergenceTest) -> StepReport {
    StepReport {
        iterations: test.iterations(),
        norm: test.last_norm(),
    }
}

/// Newton iterations; `reform(k)` names the tangent to form before
/// iteration `k`, if any
fn newton_loop(
    model: &mut AnalysisModel,
    domain: &mut Domain,
    integrator: &mut dyn Integrator,
    soe: &mut dyn LinearSoe,
    test: &mut ConvergenceTest,
    reform: impl Fn(usize) -> Option<Tangent>,
) -> FEAResult<StepReport> {
    integrator.form_unbalance(model, domain, soe)?;
    for k in 0.. {
        if let Some(tangent) = reform(k) {
            integrator.form_tangent(model, domain, soe, tangent)?;
        }
        let b = soe.b().clone();
        let dx = soe.solve()?;
        let du = integrator.update(model, domain, soe, &dx)?;
        integrator.form_unbalance(model, domain, soe)?;
        match test.check(&du, &b, soe.b()) {
            TestResult::Converged => return Ok(report(test)),
            TestResult::Diverged => return Err(failed(test)),
            TestResult::Iterating => {}
        }
    }
    Err(failed(test))
}

/// Krylov accelerated modified Newton
///
/// With v_i the past corrections and Av_i = v_i − K⁻¹r_{i+1}, each new
/// correction is K⁻¹r + Σ c_i (v_i − Av_i) where c minimizes
/// ‖Av·c − K⁻¹r‖. The subspace restarts with a fresh tangent once it holds
/// `max_dim` vectors.
fn krylov_loop(
    model: &mut AnalysisModel,
    domain: &mut Domain,
    integrator: &mut dyn Integrator,
    soe: &mut dyn LinearSoe,
    test: &mut ConvergenceTest,
    max_dim: usize,
) -> FEAResult<StepReport> {
    let mut v: Vec<DVector<f64>> = Vec::new();
    let mut av: Vec<DVector<f64>> = Vec::new();
    integrator.form_unbalance(model, domain, soe)?;
    loop {
        if v.is_empty() {
            integrator.form_tangent(model, domain, soe, Tangent::Current)?;
        }
        let b = soe.b().clone();
        let r = soe.solve()?;
        let correction = match v.last() {
            None => r,
            Some(last) => {
                av.push(last - &r);
                let k = av.len();
                let a = DMatrix::from_columns(&av);
                let c = a
                    .svd(true, true)
                    .solve(&r, 1e-12)
                    .map_err(|e| FEAError::solver("KrylovNewton", -1, e))?;
                let mut next = r;
                for i in 0..k {
                    next += (&v[i] - &av[i]) * c[i];
                }
                next
            }
        };
        let du = integrator.update(model, domain, soe, &correction)?;
        v.push(correction);
        integrator.form_unbalance(model, domain, soe)?;
        match test.check(&du, &b, soe.b()) {
            TestResult::Converged => return Ok(report(test)),
            TestResult::Diverged => return Err(failed(test)),
            TestResult::Iterating => {}
        }
        if v.len() > max_dim {
            v.clear();
            av.clear();
        }
    }
}
