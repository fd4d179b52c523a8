//! Bilinear (Steel01) and Menegotto–Pinto (Steel02) steel models

use serde::{Deserialize, Serialize};

use super::UniaxialBehavior;
use crate::error::TrialStatus;

/// Isotropic hardening parameters shared by both steel models
///
/// `a1`/`a2` shift the compression envelope, `a3`/`a4` the tension one.
/// The defaults (0, 1, 0, 1) give pure kinematic hardening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsotropicHardening {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
}

impl Default for IsotropicHardening {
    fn default() -> Self {
        Self {
            a1: 0.0,
            a2: 1.0,
            a3: 0.0,
            a4: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Steel01State {
    strain: f64,
    stress: f64,
    tangent: f64,
    min_strain: f64,
    max_strain: f64,
    shift_p: f64,
    shift_n: f64,
    loading: i8,
}

impl Steel01State {
    fn initial(e0: f64) -> Self {
        Self {
            strain: 0.0,
            stress: 0.0,
            tangent: e0,
            min_strain: 0.0,
            max_strain: 0.0,
            shift_p: 1.0,
            shift_n: 1.0,
            loading: 0,
        }
    }
}

/// Bilinear steel with kinematic and optional isotropic hardening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Steel01 {
    pub fy: f64,
    pub e0: f64,
    /// Strain-hardening ratio (post-yield slope / E0)
    pub b: f64,
    pub hardening: IsotropicHardening,
    trial: Steel01State,
    committed: Steel01State,
}

impl Steel01 {
    pub fn new(fy: f64, e0: f64, b: f64) -> Self {
        Self {
            fy,
            e0,
            b,
            hardening: IsotropicHardening::default(),
            trial: Steel01State::initial(e0),
            committed: Steel01State::initial(e0),
        }
    }

    pub fn with_isotropic_hardening(mut self, hardening: IsotropicHardening) -> Self {
        self.hardening = hardening;
        self
    }

    fn determine_trial_state(&mut self, d_strain: f64) {
        let fy_one_minus_b = self.fy * (1.0 - self.b);
        let esh = self.b * self.e0;
        let epsy = self.fy / self.e0;
        let c = &self.committed;
        let t = &mut self.trial;

        let c1 = esh * t.strain;
        let c2 = t.shift_n * fy_one_minus_b;
        let c3 = t.shift_p * fy_one_minus_b;
        let elastic = c.stress + self.e0 * d_strain;

        // Clamp the elastic predictor between the two bounding lines
        t.stress = elastic.min(c1 + c3).max(c1 - c2);
        t.tangent = if t.stress == elastic { self.e0 } else { esh };

        if t.loading == 0 && d_strain != 0.0 {
            t.loading = if d_strain > 0.0 { 1 } else { -1 };
        }

        let h = self.hardening;
        if t.loading == 1 && d_strain < 0.0 {
            t.loading = -1;
            if c.strain > t.max_strain {
                t.max_strain = c.strain;
            }
            t.shift_n = 1.0 + h.a1 * ((t.max_strain - t.min_strain) / (2.0 * h.a2 * epsy)).powf(0.8);
        }
        if t.loading == -1 && d_strain > 0.0 {
            t.loading = 1;
            if c.strain < t.min_strain {
                t.min_strain = c.strain;
            }
            t.shift_p = 1.0 + h.a3 * ((t.max_strain - t.min_strain) / (2.0 * h.a4 * epsy)).powf(0.8);
        }
    }
}

impl UniaxialBehavior for Steel01 {
    fn class_name(&self) -> &'static str {
        "Steel01"
    }

    fn set_trial_strain(&mut self, strain: f64, _rate: f64) -> TrialStatus {
        self.trial = self.committed;
        self.trial.strain = strain;
        let d_strain = strain - self.committed.strain;
        if d_strain.abs() > f64::EPSILON {
            self.determine_trial_state(d_strain);
        }
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
        self.e0
    }

    fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.trial = Steel01State::initial(self.e0);
        self.committed = self.trial;
    }

    fn box_clone(&self) -> Box<dyn UniaxialBehavior> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Steel02State {
    eps: f64,
    sig: f64,
    e: f64,
    eps_min: f64,
    eps_max: f64,
    eps_pl: f64,
    eps_s0: f64,
    sig_s0: f64,
    eps_r: f64,
    sig_r: f64,
    /// 0: virgin, 1: loading towards tension, 2: towards compression, 3: at rest
    kon: u8,
}

impl Steel02State {
    fn initial(e0: f64, sig_init: f64) -> Self {
        Self {
            eps: if sig_init != 0.0 { sig_init / e0 } else { 0.0 },
            sig: sig_init,
            e: e0,
            eps_min: 0.0,
            eps_max: 0.0,
            eps_pl: 0.0,
            eps_s0: 0.0,
            sig_s0: 0.0,
            eps_r: 0.0,
            sig_r: 0.0,
            kon: 0,
        }
    }
}

/// Giuffré–Menegotto–Pinto steel with isotropic strain hardening
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Steel02 {
    pub fy: f64,
    pub e0: f64,
    pub b: f64,
    /// Curvature parameters of the transition curve
    pub r0: f64,
    pub cr1: f64,
    pub cr2: f64,
    pub hardening: IsotropicHardening,
    /// Initial (residual) stress
    pub sig_init: f64,
    trial: Steel02State,
    committed: Steel02State,
}

impl Steel02 {
    pub fn new(fy: f64, e0: f64, b: f64) -> Self {
        Self::with_transition(fy, e0, b, 20.0, 0.925, 0.15)
    }

    pub fn with_transition(fy: f64, e0: f64, b: f64, r0: f64, cr1: f64, cr2: f64) -> Self {
        Self {
            fy,
            e0,
            b,
            r0,
            cr1,
            cr2,
            hardening: IsotropicHardening::default(),
            sig_init: 0.0,
            trial: Steel02State::initial(e0, 0.0),
            committed: Steel02State::initial(e0, 0.0),
        }
    }

    pub fn with_isotropic_hardening(mut self, hardening: IsotropicHardening) -> Self {
        self.hardening = hardening;
        self
    }

    pub fn with_initial_stress(mut self, sig_init: f64) -> Self {
        self.sig_init = sig_init;
        self.trial = Steel02State::initial(self.e0, sig_init);
        self.committed = self.trial;
        self
    }

    fn initial_strain(&self) -> f64 {
        if self.sig_init != 0.0 {
            self.sig_init / self.e0
        } else {
            0.0
        }
    }
}

impl UniaxialBehavior for Steel02 {
    fn class_name(&self) -> &'static str {
        "Steel02"
    }

    fn set_trial_strain(&mut self, strain: f64, _rate: f64) -> TrialStatus {
        let esh = self.b * self.e0;
        let epsy = self.fy / self.e0;
        let h = self.hardening;
        let c = self.committed;
        let mut t = c;

        let eps = strain + self.initial_strain();
        let deps = eps - c.eps;
        t.eps = eps;

        if t.kon == 0 || t.kon == 3 {
            if deps.abs() < 10.0 * f64::EPSILON {
                t.e = self.e0;
                t.sig = self.sig_init;
                t.kon = 3;
                self.trial = t;
                return TrialStatus::Ok;
            }
            t.eps_max = epsy;
            t.eps_min = -epsy;
            if deps < 0.0 {
                t.kon = 2;
                t.eps_s0 = t.eps_min;
                t.sig_s0 = -self.fy;
                t.eps_pl = t.eps_min;
            } else {
                t.kon = 1;
                t.eps_s0 = t.eps_max;
                t.sig_s0 = self.fy;
                t.eps_pl = t.eps_max;
            }
        }

        // Load reversal moves the origin of the asymptotes
        if t.kon == 2 && deps > 0.0 {
            t.kon = 1;
            t.eps_r = c.eps;
            t.sig_r = c.sig;
            t.eps_min = t.eps_min.min(c.eps);
            let d1 = (t.eps_max - t.eps_min) / (2.0 * h.a4 * epsy);
            let shift = 1.0 + h.a3 * d1.powf(0.8);
            t.eps_s0 = (self.fy * shift - esh * epsy * shift - t.sig_r + self.e0 * t.eps_r)
                / (self.e0 - esh);
            t.sig_s0 = self.fy * shift + esh * (t.eps_s0 - epsy * shift);
            t.eps_pl = t.eps_max;
        } else if t.kon == 1 && deps < 0.0 {
            t.kon = 2;
            t.eps_r = c.eps;
            t.sig_r = c.sig;
            t.eps_max = t.eps_max.max(c.eps);
            let d1 = (t.eps_max - t.eps_min) / (2.0 * h.a2 * epsy);
            let shift = 1.0 + h.a1 * d1.powf(0.8);
            t.eps_s0 = (-self.fy * shift + esh * epsy * shift - t.sig_r + self.e0 * t.eps_r)
                / (self.e0 - esh);
            t.sig_s0 = -self.fy * shift + esh * (t.eps_s0 + epsy * shift);
            t.eps_pl = t.eps_min;
        }

        let xi = ((t.eps_pl - t.eps_s0) / epsy).abs();
        let r = self.r0 * (1.0 - (self.cr1 * xi) / (self.cr2 + xi));
        let eps_rat = (eps - t.eps_r) / (t.eps_s0 - t.eps_r);
        let dum1 = 1.0 + eps_rat.abs().powf(r);
        let dum2 = dum1.powf(1.0 / r);

        let sig_rat = self.b * eps_rat + (1.0 - self.b) * eps_rat / dum2;
        t.sig = sig_rat * (t.sig_s0 - t.sig_r) + t.sig_r;
        t.e = (self.b + (1.0 - self.b) / (dum1 * dum2)) * (t.sig_s0 - t.sig_r) / (t.eps_s0 - t.eps_r);

        self.trial = t;
        if t.sig.is_finite() && t.e.is_finite() {
            TrialStatus::Ok
        } else {
            self.trial = self.committed;
            TrialStatus::Failed
        }
    }

    fn strain(&self) -> f64 {
        self.trial.eps - self.initial_strain()
    }

    fn stress(&self) -> f64 {
        self.trial.sig
    }

    fn tangent(&self) -> f64 {
        self.trial.e
    }

    fn initial_tangent(&self) -> f64 {
        self.e0
    }

    fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.trial = Steel02State::initial(self.e0, self.sig_init);
        self.committed = self.trial;
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
    fn test_steel01_bilinear_envelope() {
        let mut s = Steel01::new(355e6, 200e9, 0.01);
        let eps_y = 355e6 / 200e9;
        let _ = s.set_trial_strain(0.5 * eps_y, 0.0);
        assert_relative_eq!(s.stress(), 0.5 * 355e6, max_relative = 1e-12);
        assert_relative_eq!(s.tangent(), 200e9);

        let _ = s.set_trial_strain(3.0 * eps_y, 0.0);
        let expected = 355e6 + 0.01 * 200e9 * 2.0 * eps_y;
        assert_relative_eq!(s.stress(), expected, max_relative = 1e-12);
        assert_relative_eq!(s.tangent(), 0.01 * 200e9);
    }

    #[test]
    fn test_steel01_elastic_unloading_after_commit() {
        let mut s = Steel01::new(100.0, 1000.0, 0.0);
        let _ = s.set_trial_strain(0.3, 0.0);
        assert_relative_eq!(s.stress(), 100.0);
        s.commit_state();
        let _ = s.set_trial_strain(0.25, 0.0);
        assert_relative_eq!(s.stress(), 50.0, epsilon = 1e-10);
        assert_relative_eq!(s.tangent(), 1000.0);
    }

    #[test]
    fn test_steel02_monotonic_approaches_asymptote() {
        let mut s = Steel02::new(400.0, 200_000.0, 0.02);
        let _ = s.set_trial_strain(0.0005, 0.0);
        assert_relative_eq!(s.stress(), 100.0, max_relative = 1e-3);
        let _ = s.set_trial_strain(0.02, 0.0);
        let asymptote = 400.0 + 0.02 * 200_000.0 * (0.02 - 0.002);
        assert_relative_eq!(s.stress(), asymptote, max_relative = 1e-2);
        assert!(s.tangent() > 0.0 && s.tangent() < 200_000.0);
    }

    #[test]
    fn test_steel02_revert_to_start() {
        let mut s = Steel02::new(400.0, 200_000.0, 0.02);
        let _ = s.set_trial_strain(0.01, 0.0);
        s.commit_state();
        s.revert_to_start();
        assert_eq!(s.stress(), 0.0);
        assert_eq!(s.strain(), 0.0);
    }
}
