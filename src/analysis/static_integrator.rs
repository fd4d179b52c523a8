//! Static integrators: the load factor λ is the pseudo-time of the domain

use nalgebra::DVector;

use super::model::{AnalysisModel, MatrixCoefficients, Tangent};
use super::soe::LinearSoe;
use super::{Integrator, IntegratorOptions};
use crate::domain::Domain;
use crate::error::{FEAError, FEAResult};

#[derive(Debug, Clone)]
enum Control {
    Load {
        d_lambda: f64,
        num_iter: usize,
        min: f64,
        max: f64,
    },
    Displacement {
        node: usize,
        dof: usize,
        du: f64,
        eq: usize,
    },
    ArcLength {
        ds: f64,
        psi: f64,
    },
}

#[derive(Debug, Clone)]
pub struct StaticIntegrator {
    control: Control,
    lambda: f64,
    committed_lambda: f64,
    /// Fraction of the nominal increment used by the current step
    scale: f64,
    last_iterations: usize,
    p_ref: DVector<f64>,
    step_du: DVector<f64>,
    step_dlambda: f64,
    prev_step_du: DVector<f64>,
}

impl StaticIntegrator {
    pub fn new(options: &IntegratorOptions, lambda: f64) -> FEAResult<Self> {
        let control = match *options {
            IntegratorOptions::LoadControl {
                d_lambda,
                num_iter,
                min,
                max,
            } => {
                if !d_lambda.is_finite() || d_lambda == 0.0 {
                    return Err(FEAError::InvalidInput(format!(
                        "load increment {d_lambda} must be finite and non-zero"
                    )));
                }
                if num_iter > 0 && !(min.abs() <= d_lambda.abs() && d_lambda.abs() <= max.abs()) {
                    return Err(FEAError::InvalidInput(format!(
                        "load increment {d_lambda} outside [{min}, {max}]"
                    )));
                }
                Control::Load {
                    d_lambda,
                    num_iter,
                    min: min.abs(),
                    max: max.abs(),
                }
            }
            IntegratorOptions::DisplacementControl { node, dof, du } => {
                if !du.is_finite() || du == 0.0 {
                    return Err(FEAError::InvalidInput(format!(
                        "displacement increment {du} must be finite and non-zero"
                    )));
                }
                Control::Displacement { node, dof, du, eq: 0 }
            }
            IntegratorOptions::ArcLength { ds, psi } => {
                if !(ds > 0.0) || !(psi >= 0.0) {
                    return Err(FEAError::InvalidInput(format!(
                        "arc length needs ΔS > 0 and ψ >= 0, got {ds} and {psi}"
                    )));
                }
                Control::ArcLength { ds, psi }
            }
            IntegratorOptions::Newmark { .. } | IntegratorOptions::Hht { .. } => {
                return Err(FEAError::InvalidInput(
                    "transient integrator given to a static analysis".to_string(),
                ))
            }
        };
        Ok(Self {
            control,
            lambda,
            committed_lambda: lambda,
            scale: 1.0,
            last_iterations: 0,
            p_ref: DVector::zeros(0),
            step_du: DVector::zeros(0),
            step_dlambda: 0.0,
            prev_step_du: DVector::zeros(0),
        })
    }

    /// Current load factor
    pub fn load_factor(&self) -> f64 {
        self.lambda
    }

    /// Nominal increment of the control quantity
    pub fn increment(&self) -> f64 {
        match self.control {
            Control::Load { d_lambda, .. } => d_lambda,
            Control::Displacement { du, .. } => du,
            Control::ArcLength { ds, .. } => ds,
        }
    }

    pub(crate) fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    pub(crate) fn scale(&self) -> f64 {
        self.scale
    }

    pub(crate) fn set_iterations(&mut self, iterations: usize) {
        self.last_iterations = iterations;
    }

    /// Predict the next step
    pub fn new_step(
        &mut self,
        model: &mut AnalysisModel,
        domain: &mut Domain,
        soe: &mut dyn LinearSoe,
    ) -> FEAResult<()> {
        self.step_du = DVector::zeros(model.num_eqn());
        self.step_dlambda = 0.0;
        match self.control.clone() {
            Control::Load { d_lambda, .. } => {
                self.lambda = self.committed_lambda + d_lambda * self.scale;
                domain.apply_load(self.lambda)?;
                model.impose_prescribed(domain)?;
                domain.update()
            }
            Control::Displacement { node, dof, du, .. } => {
                let eq = model.equation(node, dof)?;
                self.control = Control::Displacement { node, dof, du, eq };
                let dxf = self.reference_solution(model, domain, soe)?;
                if dxf[eq].abs() < f64::EPSILON * dxf.amax().max(1.0) {
                    return Err(FEAError::SingularMatrix);
                }
                let dl = du * self.scale / dxf[eq];
                self.advance(model, domain, &(dxf * dl), dl)
            }
            Control::ArcLength { ds, psi } => {
                let dxf = self.reference_solution(model, domain, soe)?;
                let f2 = psi * self.p_ref.norm_squared();
                let mut dl = ds * self.scale / (dxf.norm_squared() + f2).sqrt();
                if self.prev_step_du.len() == dxf.len() && self.prev_step_du.dot(&dxf) < 0.0 {
                    dl = -dl;
                }
                self.advance(model, domain, &(dxf * dl), dl)
            }
        }
    }

    /// Tangent at the committed state and K⁻¹·P_ref
    fn reference_solution(
        &mut self,
        model: &AnalysisModel,
        domain: &mut Domain,
        soe: &mut dyn LinearSoe,
    ) -> FEAResult<DVector<f64>> {
        self.p_ref = reference_load(model, domain, self.committed_lambda)?;
        model.form_tangent(domain, soe, MatrixCoefficients::stiffness(), Tangent::Current)?;
        soe.solve_with(&self.p_ref)
    }

    fn advance(
        &mut self,
        model: &mut AnalysisModel,
        domain: &mut Domain,
        du: &DVector<f64>,
        dl: f64,
    ) -> FEAResult<()> {
        self.lambda += dl;
        self.step_dlambda += dl;
        self.step_du += du;
        domain.apply_load(self.lambda)?;
        model.increment(domain, du)?;
        domain.update()
    }

    pub fn commit(&mut self, model: &mut AnalysisModel, domain: &mut Domain) {
        domain.commit();
        model.commit();
        self.committed_lambda = self.lambda;
        self.prev_step_du = std::mem::replace(&mut self.step_du, DVector::zeros(0));
        if let Control::Load {
            ref mut d_lambda,
            num_iter,
            min,
            max,
        } = self.control
        {
            if num_iter > 0 && self.last_iterations > 0 {
                let next = *d_lambda * num_iter as f64 / self.last_iterations as f64;
                *d_lambda = next.signum() * next.abs().clamp(min, max);
            }
        }
    }

    /// Return to the committed load factor
    pub fn revert_step(&mut self, model: &mut AnalysisModel) {
        self.lambda = self.committed_lambda;
        self.step_du = DVector::zeros(0);
        self.step_dlambda = 0.0;
        model.revert_to_last_commit();
    }
}

/// P(λ + 1) − P(λ) at the current state
fn reference_load(model: &AnalysisModel, domain: &mut Domain, lambda: f64) -> FEAResult<DVector<f64>> {
    domain.apply_load(lambda + 1.0)?;
    let r1 = model.unbalance(domain, false)?;
    domain.apply_load(lambda)?;
    let r0 = model.unbalance(domain, false)?;
    Ok(r1 - r0)
}

impl Integrator for StaticIntegrator {
    fn form_tangent(
        &mut self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
        tangent: Tangent,
    ) -> FEAResult<()> {
        model.form_tangent(domain, soe, MatrixCoefficients::stiffness(), tangent)
    }

    fn form_unbalance(
        &mut self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
    ) -> FEAResult<()> {
        model.form_unbalance(domain, soe, false)
    }

    fn update(
        &mut self,
        model: &mut AnalysisModel,
        domain: &mut Domain,
        soe: &mut dyn LinearSoe,
        dx: &DVector<f64>,
    ) -> FEAResult<DVector<f64>> {
        match self.control {
            Control::Load { .. } => {
                model.increment(domain, dx)?;
                domain.update()?;
                Ok(dx.clone())
            }
            Control::Displacement { eq, .. } => {
                let dxf = soe.solve_with(&self.p_ref)?;
                if dxf[eq] == 0.0 {
                    return Err(FEAError::SingularMatrix);
                }
                let dl = -dx[eq] / dxf[eq];
                let du = dx + dxf * dl;
                self.advance(model, domain, &du, dl)?;
                Ok(du)
            }
            Control::ArcLength { ds, psi } => {
                let dxf = soe.solve_with(&self.p_ref)?;
                let f2 = psi * self.p_ref.norm_squared();
                let base = &self.step_du + dx;
                let a = dxf.norm_squared() + f2;
                let b = 2.0 * (dxf.dot(&base) + f2 * self.step_dlambda);
                let c = base.norm_squared() + f2 * self.step_dlambda.powi(2) - ds * ds * self.scale * self.scale;
                let disc = b * b - 4.0 * a * c;
                if disc < 0.0 || a == 0.0 {
                    return Err(FEAError::solver(
                        "ArcLength",
                        -2,
                        format!("constraint has no real root (discriminant {disc:e})"),
                    ));
                }
                let sq = disc.sqrt();
                let roots = [(-b + sq) / (2.0 * a), (-b - sq) / (2.0 * a)];
                // keep the root whose step increment stays closest in direction
                let alignment = |dl: f64| (&base + &dxf * dl).dot(&self.step_du);
                let dl = if alignment(roots[0]) >= alignment(roots[1]) {
                    roots[0]
                } else {
                    roots[1]
                };
                let du = dx + dxf * dl;
                self.advance(model, domain, &du, dl)?;
                Ok(du)
            }
        }
    }
}
