//! Newmark-family transient integrators

use nalgebra::DVector;

use super::model::{AnalysisModel, Field, MatrixCoefficients, Tangent};
use super::soe::LinearSoe;
use super::{Integrator, IntegratorOptions};
use crate::domain::Domain;
use crate::error::{FEAError, FEAResult};

/// Newmark(γ, β), and HHT(α) which evaluates the internal and damping forces
/// at u_{n+α} = (1 − α)·u_n + α·u_{n+1} with γ = 1.5 − α, β = (2 − α)²/4
#[derive(Debug, Clone)]
pub struct TransientIntegrator {
    name: &'static str,
    gamma: f64,
    beta: f64,
    alpha: f64,
    dt: f64,
    t_n: f64,
    u: DVector<f64>,
    v: DVector<f64>,
    a: DVector<f64>,
    u_n: DVector<f64>,
    v_n: DVector<f64>,
}

impl TransientIntegrator {
    pub fn new(options: &IntegratorOptions) -> FEAResult<Self> {
        let (name, gamma, beta, alpha) = match *options {
            IntegratorOptions::Newmark { gamma, beta } => {
                if !(gamma > 0.0 && beta > 0.0) {
                    return Err(FEAError::InvalidInput(format!(
                        "Newmark needs γ > 0 and β > 0, got {gamma} and {beta}"
                    )));
                }
                ("Newmark", gamma, beta, 1.0)
            }
            IntegratorOptions::Hht { alpha } => {
                if !(2.0 / 3.0..=1.0).contains(&alpha) {
                    return Err(FEAError::InvalidInput(format!(
                        "HHT α must lie in [2/3, 1], got {alpha}"
                    )));
                }
                ("HHT", 1.5 - alpha, (2.0 - alpha).powi(2) / 4.0, alpha)
            }
            _ => {
                return Err(FEAError::InvalidInput(
                    "static integrator given to a transient analysis".to_string(),
                ))
            }
        };
        Ok(Self {
            name,
            gamma,
            beta,
            alpha,
            dt: 0.0,
            t_n: 0.0,
            u: DVector::zeros(0),
            v: DVector::zeros(0),
            a: DVector::zeros(0),
            u_n: DVector::zeros(0),
            v_n: DVector::zeros(0),
        })
    }

    /// Average acceleration: γ = 1/2, β = 1/4
    pub fn average_acceleration() -> IntegratorOptions {
        IntegratorOptions::Newmark {
            gamma: 0.5,
            beta: 0.25,
        }
    }

    /// Linear acceleration: γ = 1/2, β = 1/6
    pub fn linear_acceleration() -> IntegratorOptions {
        IntegratorOptions::Newmark {
            gamma: 0.5,
            beta: 1.0 / 6.0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> (f64, f64, f64) {
        (self.gamma, self.beta, self.alpha)
    }

    fn c2(&self) -> f64 {
        self.gamma / (self.beta * self.dt)
    }

    fn c3(&self) -> f64 {
        1.0 / (self.beta * self.dt * self.dt)
    }

    /// Predictor with Δu = 0 and loads at t_n + α·Δt
    pub fn new_step(&mut self, model: &AnalysisModel, domain: &mut Domain, dt: f64) -> FEAResult<()> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(FEAError::InvalidInput(format!("time step {dt} must be positive")));
        }
        self.dt = dt;
        self.t_n = domain.committed_time();
        let (g, b) = (self.gamma, self.beta);
        self.u_n = model.gather(domain, Field::Disp)?;
        self.v_n = model.gather(domain, Field::Vel)?;
        let a_n = model.gather(domain, Field::Accel)?;
        self.u = self.u_n.clone();
        self.v = &self.v_n * (1.0 - g / b) + &a_n * (dt * (1.0 - g / (2.0 * b)));
        self.a = &self.v_n * (-1.0 / (b * dt)) + &a_n * (1.0 - 1.0 / (2.0 * b));
        domain.apply_load(self.t_n + self.alpha * dt)?;
        self.push_trial(model, domain)?;
        domain.update()
    }

    fn push_trial(&self, model: &AnalysisModel, domain: &mut Domain) -> FEAResult<()> {
        let al = self.alpha;
        let u = &self.u_n * (1.0 - al) + &self.u * al;
        let v = &self.v_n * (1.0 - al) + &self.v * al;
        model.set_trial(domain, Field::Disp, &u)?;
        model.set_trial(domain, Field::Vel, &v)?;
        model.set_trial(domain, Field::Accel, &self.a)
    }

    /// Move the domain to t_{n+1} and commit
    pub fn commit(&mut self, model: &mut AnalysisModel, domain: &mut Domain) -> FEAResult<()> {
        if self.alpha != 1.0 {
            domain.apply_load(self.t_n + self.dt)?;
            model.set_trial(domain, Field::Disp, &self.u)?;
            model.set_trial(domain, Field::Vel, &self.v)?;
            model.set_trial(domain, Field::Accel, &self.a)?;
            domain.update()?;
        }
        domain.commit();
        model.commit();
        Ok(())
    }
}

impl Integrator for TransientIntegrator {
    fn form_tangent(
        &mut self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
        tangent: Tangent,
    ) -> FEAResult<()> {
        let coeffs = MatrixCoefficients {
            k: self.alpha,
            d: self.alpha * self.c2(),
            m: self.c3(),
        };
        model.form_tangent(domain, soe, coeffs, tangent)
    }

    fn form_unbalance(
        &mut self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
    ) -> FEAResult<()> {
        model.form_unbalance(domain, soe, true)
    }

    fn update(
        &mut self,
        model: &mut AnalysisModel,
        domain: &mut Domain,
        _soe: &mut dyn LinearSoe,
        dx: &DVector<f64>,
    ) -> FEAResult<DVector<f64>> {
        let n = model.num_dof_equations();
        if dx.len() != model.num_eqn() {
            return Err(FEAError::InvalidState(format!(
                "increment of length {} for {} equations",
                dx.len(),
                model.num_eqn()
            )));
        }
        let (c2, c3) = (self.c2(), self.c3());
        let du = dx.rows(0, n);
        self.u += du;
        self.v += du * c2;
        self.a += du * c3;
        model.increment_multipliers(dx);
        self.push_trial(model, domain)?;
        domain.update()?;
        Ok(dx.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hht_parameters() {
        let hht = TransientIntegrator::new(&IntegratorOptions::Hht { alpha: 0.9 }).unwrap();
        let (g, b, a) = hht.parameters();
        assert_relative_eq!(g, 0.6);
        assert_relative_eq!(b, 0.3025);
        assert_relative_eq!(a, 0.9);
        assert!(TransientIntegrator::new(&IntegratorOptions::Hht { alpha: 0.5 }).is_err());
        let nm = TransientIntegrator::new(&TransientIntegrator::average_acceleration()).unwrap();
        assert_eq!(nm.parameters(), (0.5, 0.25, 1.0));
    }
}
