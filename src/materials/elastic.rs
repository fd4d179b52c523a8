//! Linear elastic and elastic-perfectly-plastic uniaxial materials

use serde::{Deserialize, Serialize};

use super::UniaxialBehavior;
use crate::error::TrialStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct ElasticState {
    strain: f64,
    rate: f64,
}

/// Linear elastic material with optional viscous term: σ = E·ε + η·ε̇
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elastic {
    pub e: f64,
    pub eta: f64,
    trial: ElasticState,
    committed: ElasticState,
}

impl Elastic {
    pub fn new(e: f64) -> Self {
        Self::with_damping(e, 0.0)
    }

    pub fn with_damping(e: f64, eta: f64) -> Self {
        Self {
            e,
            eta,
            trial: ElasticState::default(),
            committed: ElasticState::default(),
        }
    }
}

impl UniaxialBehavior for Elastic {
    fn class_name(&self) -> &'static str {
        "Elastic"
    }

    fn set_trial_strain(&mut self, strain: f64, rate: f64) -> TrialStatus {
        self.trial = ElasticState { strain, rate };
        TrialStatus::Ok
    }

    fn strain(&self) -> f64 {
        self.trial.strain
    }

    fn stress(&self) -> f64 {
        self.e * self.trial.strain + self.eta * self.trial.rate
    }

    fn tangent(&self) -> f64 {
        self.e
    }

    fn initial_tangent(&self) -> f64 {
        self.e
    }

    fn damping_tangent(&self) -> f64 {
        self.eta
    }

    fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.trial = ElasticState::default();
        self.committed = ElasticState::default();
    }

    fn box_clone(&self) -> Box<dyn UniaxialBehavior> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct PlasticState {
    strain: f64,
    plastic_strain: f64,
    stress: f64,
    tangent: f64,
}

/// Elastic-perfectly-plastic material with (possibly asymmetric) yield stresses
///
/// `fy_neg` is the compressive yield stress and must be negative. Plastic
/// strain only advances on commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticPP {
    pub e: f64,
    pub fy_pos: f64,
    pub fy_neg: f64,
    /// Initial strain offset
    pub eps0: f64,
    trial: PlasticState,
    committed: PlasticState,
}

impl ElasticPP {
    /// Symmetric yield stress ±fy
    pub fn new(e: f64, fy: f64) -> Self {
        Self::asymmetric(e, fy.abs(), -fy.abs())
    }

    pub fn asymmetric(e: f64, fy_pos: f64, fy_neg: f64) -> Self {
        let initial = PlasticState {
            tangent: e,
            ..PlasticState::default()
        };
        Self {
            e,
            fy_pos,
            fy_neg,
            eps0: 0.0,
            trial: initial,
            committed: initial,
        }
    }

    pub fn with_initial_strain(mut self, eps0: f64) -> Self {
        self.eps0 = eps0;
        self
    }

    pub fn plastic_strain(&self) -> f64 {
        self.committed.plastic_strain
    }
}

impl UniaxialBehavior for ElasticPP {
    fn class_name(&self) -> &'static str {
        "ElasticPP"
    }

    fn set_trial_strain(&mut self, strain: f64, _rate: f64) -> TrialStatus {
        let ep = self.committed.plastic_strain;
        let sig = self.e * (strain - self.eps0 - ep);
        let (stress, tangent) = if sig > self.fy_pos {
            (self.fy_pos, 0.0)
        } else if sig < self.fy_neg {
            (self.fy_neg, 0.0)
        } else {
            (sig, self.e)
        };
        self.trial = PlasticState {
            strain,
            plastic_strain: ep,
            stress,
            tangent,
        };
        TrialStatus::Ok
    }

    fn strain(&self) -> f64 {
        self.trial.strain
    }

    fn stress(&self) -> f64 {
        self.trial.stress
    }

    fn tangent(&self) -> f64 {
        self.trial.tangent
    }

    fn initial_tangent(&self) -> f64 {
        self.e
    }

    fn commit_state(&mut self) {
        let sig = self.e * (self.trial.strain - self.eps0 - self.trial.plastic_strain);
        if sig > self.fy_pos {
            self.trial.plastic_strain += (sig - self.fy_pos) / self.e;
        } else if sig < self.fy_neg {
            self.trial.plastic_strain += (sig - self.fy_neg) / self.e;
        }
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        let initial = PlasticState {
            tangent: self.e,
            ..PlasticState::default()
        };
        self.trial = initial;
        self.committed = initial;
    }

    fn box_clone(&self) -> Box<dyn UniaxialBehavior> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_elastic_stress_and_rate() {
        let mut m = Elastic::with_damping(200.0, 2.0);
        assert!(m.set_trial_strain(0.01, 0.5).is_ok());
        assert_relative_eq!(m.stress(), 3.0);
        assert_relative_eq!(m.tangent(), 200.0);
    }

    #[test]
    fn test_elastic_pp_yield_and_unload() {
        let mut m = ElasticPP::new(1000.0, 1.0);
        let _ = m.set_trial_strain(0.003, 0.0);
        assert_relative_eq!(m.stress(), 1.0);
        assert_relative_eq!(m.tangent(), 0.0);
        m.commit_state();
        assert_relative_eq!(m.plastic_strain(), 0.002, epsilon = 1e-15);

        // Unloading is elastic from the shifted origin
        let _ = m.set_trial_strain(0.0025, 0.0);
        assert_relative_eq!(m.stress(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(m.tangent(), 1000.0);
    }

    #[test]
    fn test_elastic_pp_revert_discards_plastic_flow() {
        let mut m = ElasticPP::asymmetric(1000.0, 2.0, -1.0);
        let _ = m.set_trial_strain(-0.004, 0.0);
        assert_relative_eq!(m.stress(), -1.0);
        m.revert_to_last_commit();
        assert_relative_eq!(m.plastic_strain(), 0.0);
        let _ = m.set_trial_strain(0.001, 0.0);
        assert_relative_eq!(m.stress(), 1.0);
    }

    #[test]
    fn test_elastic_pp_trial_is_idempotent() {
        let mut m = ElasticPP::new(1000.0, 1.0);
        let _ = m.set_trial_strain(0.005, 0.0);
        let first = (m.stress(), m.tangent());
        let _ = m.set_trial_strain(0.005, 0.0);
        assert_eq!(first, (m.stress(), m.tangent()));
    }
}
