//! Tension-only cable material with prestress

use serde::{Deserialize, Serialize};

use super::UniaxialBehavior;
use crate::error::TrialStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct CableState {
    strain: f64,
}

/// Tension-only material: σ = max(E·ε + σ₀, 0)
///
/// A slack cable keeps a small fraction of E as tangent so the global
/// system stays non-singular.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cable {
    pub e: f64,
    /// Prestress σ₀
    pub prestress: f64,
    /// Tangent ratio used while slack
    pub slack_ratio: f64,
    trial: CableState,
    committed: CableState,
}

impl Cable {
    pub fn new(e: f64, prestress: f64) -> Self {
        Self {
            e,
            prestress,
            slack_ratio: 1e-8,
            trial: CableState::default(),
            committed: CableState::default(),
        }
    }

    pub fn with_slack_ratio(mut self, ratio: f64) -> Self {
        self.slack_ratio = ratio;
        self
    }

    fn is_taut(&self) -> bool {
        self.e * self.trial.strain + self.prestress > 0.0
    }
}

impl UniaxialBehavior for Cable {
    fn class_name(&self) -> &'static str {
        "Cable"
    }

    fn set_trial_strain(&mut self, strain: f64, _rate: f64) -> TrialStatus {
        self.trial.strain = strain;
        TrialStatus::Ok
    }

    fn strain(&self) -> f64 {
        self.trial.strain
    }

    fn stress(&self) -> f64 {
        (self.e * self.trial.strain + self.prestress).max(0.0)
    }

    fn tangent(&self) -> f64 {
        if self.is_taut() {
            self.e
        } else {
            self.e * self.slack_ratio
        }
    }

    fn initial_tangent(&self) -> f64 {
        self.e
    }

    fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.trial = CableState::default();
        self.committed = CableState::default();
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
    fn test_cable_prestress_at_zero_strain() {
        let mut c = Cable::new(30e6, 1000.0);
        let _ = c.set_trial_strain(0.0, 0.0);
        assert_relative_eq!(c.stress(), 1000.0);
        assert_relative_eq!(c.tangent(), 30e6);
    }

    #[test]
    fn test_cable_goes_slack() {
        let mut c = Cable::new(30e6, 1000.0);
        let _ = c.set_trial_strain(-1e-3, 0.0);
        assert_eq!(c.stress(), 0.0);
        assert!(c.tangent() > 0.0 && c.tangent() < 1.0);
    }
}
