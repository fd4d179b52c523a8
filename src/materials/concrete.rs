//! Concrete models: Kent–Scott–Park without tension (Concrete01) and with
//! linear tension softening (Concrete02)
//!
//! Compressive parameters are negative: `fc`, `eps_c0`, `fcu`, `eps_cu`.

use serde::{Deserialize, Serialize};

use super::UniaxialBehavior;
use crate::error::TrialStatus;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Concrete01State {
    strain: f64,
    stress: f64,
    tangent: f64,
    min_strain: f64,
    end_strain: f64,
    unload_slope: f64,
}

impl Concrete01State {
    fn initial(ec0: f64) -> Self {
        Self {
            strain: 0.0,
            stress: 0.0,
            tangent: ec0,
            min_strain: 0.0,
            end_strain: 0.0,
            unload_slope: ec0,
        }
    }
}

/// Kent–Scott–Park concrete with degraded linear unloading/reloading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concrete01 {
    pub fc: f64,
    pub eps_c0: f64,
    pub fcu: f64,
    pub eps_cu: f64,
    trial: Concrete01State,
    committed: Concrete01State,
}

impl Concrete01 {
    pub fn new(fc: f64, eps_c0: f64, fcu: f64, eps_cu: f64) -> Self {
        // Store compressive values as negative regardless of input sign
        let fc = -fc.abs();
        let eps_c0 = -eps_c0.abs();
        let fcu = -fcu.abs();
        let eps_cu = -eps_cu.abs();
        let ec0 = 2.0 * fc / eps_c0;
        Self {
            fc,
            eps_c0,
            fcu,
            eps_cu,
            trial: Concrete01State::initial(ec0),
            committed: Concrete01State::initial(ec0),
        }
    }

    fn ec0(&self) -> f64 {
        2.0 * self.fc / self.eps_c0
    }

    fn envelope(&mut self) {
        let t = &mut self.trial;
        if t.strain > self.eps_c0 {
            let eta = t.strain / self.eps_c0;
            t.stress = self.fc * (2.0 * eta - eta * eta);
            t.tangent = 2.0 * self.fc / self.eps_c0 * (1.0 - eta);
        } else if t.strain > self.eps_cu {
            t.tangent = (self.fc - self.fcu) / (self.eps_c0 - self.eps_cu);
            t.stress = self.fc + t.tangent * (t.strain - self.eps_c0);
        } else {
            t.stress = self.fcu;
            t.tangent = 0.0;
        }
    }

    fn unload(&mut self) {
        let ec0 = self.ec0();
        let t = &mut self.trial;
        let temp_strain = t.min_strain.max(self.eps_cu);
        let eta = temp_strain / self.eps_c0;
        let ratio = if eta < 2.0 {
            0.145 * eta * eta + 0.13 * eta
        } else {
            0.707 * (eta - 2.0) + 0.834
        };
        t.end_strain = ratio * self.eps_c0;

        let temp1 = t.min_strain - t.end_strain;
        let temp2 = t.stress / ec0;
        if temp1 > -f64::EPSILON {
            t.unload_slope = ec0;
        } else if temp1 <= temp2 {
            t.end_strain = t.min_strain - temp1;
            t.unload_slope = t.stress / temp1;
        } else {
            t.end_strain = t.min_strain - temp2;
            t.unload_slope = ec0;
        }
    }

    fn reload(&mut self) {
        if self.trial.strain <= self.trial.min_strain {
            self.trial.min_strain = self.trial.strain;
            self.envelope();
            self.unload();
        } else if self.trial.strain <= self.trial.end_strain {
            let t = &mut self.trial;
            t.tangent = t.unload_slope;
            t.stress = t.tangent * (t.strain - t.end_strain);
        } else {
            self.trial.stress = 0.0;
            self.trial.tangent = 0.0;
        }
    }
}

impl UniaxialBehavior for Concrete01 {
    fn class_name(&self) -> &'static str {
        "Concrete01"
    }

    fn set_trial_strain(&mut self, strain: f64, _rate: f64) -> TrialStatus {
        self.trial = self.committed;
        let d_strain = strain - self.committed.strain;
        if d_strain.abs() < f64::EPSILON {
            return TrialStatus::Ok;
        }
        self.trial.strain = strain;

        // No tension
        if strain > 0.0 {
            self.trial.stress = 0.0;
            self.trial.tangent = 0.0;
            return TrialStatus::Ok;
        }

        let c = self.committed;
        let temp_stress = c.stress + self.trial.unload_slope * (strain - c.strain);
        if strain < c.strain {
            self.reload();
            if temp_stress > self.trial.stress {
                self.trial.stress = temp_stress;
                self.trial.tangent = self.trial.unload_slope;
            }
        } else if temp_stress <= 0.0 {
            self.trial.stress = temp_stress;
            self.trial.tangent = self.trial.unload_slope;
        } else {
            self.trial.stress = 0.0;
            self.trial.tangent = 0.0;
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
        self.ec0()
    }

    fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.trial = Concrete01State::initial(self.ec0());
        self.committed = self.trial;
    }

    fn box_clone(&self) -> Box<dyn UniaxialBehavior> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Concrete02State {
    eps: f64,
    sig: f64,
    e: f64,
    /// Most compressive strain reached
    ec_min: f64,
    /// Largest tensile strain excursion beyond the crack opening point
    dept: f64,
}

impl Concrete02State {
    fn initial(ec0: f64) -> Self {
        Self {
            eps: 0.0,
            sig: 0.0,
            e: ec0,
            ec_min: 0.0,
            dept: 0.0,
        }
    }
}

/// Concrete with parabolic compression, linear tension softening and
/// linear unloading/reloading with slope degradation ratio `lambda`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concrete02 {
    pub fc: f64,
    pub eps_c0: f64,
    pub fcu: f64,
    pub eps_cu: f64,
    /// Ratio between unloading slope at eps_cu and initial slope
    pub lambda: f64,
    /// Tensile strength (positive)
    pub ft: f64,
    /// Tension softening stiffness (positive)
    pub ets: f64,
    trial: Concrete02State,
    committed: Concrete02State,
}

impl Concrete02 {
    pub fn new(fc: f64, eps_c0: f64, fcu: f64, eps_cu: f64, lambda: f64, ft: f64, ets: f64) -> Self {
        let fc = -fc.abs();
        let eps_c0 = -eps_c0.abs();
        let ec0 = 2.0 * fc / eps_c0;
        Self {
            fc,
            eps_c0,
            fcu: -fcu.abs(),
            eps_cu: -eps_cu.abs(),
            lambda,
            ft: ft.abs(),
            ets: ets.abs(),
            trial: Concrete02State::initial(ec0),
            committed: Concrete02State::initial(ec0),
        }
    }

    fn ec0(&self) -> f64 {
        2.0 * self.fc / self.eps_c0
    }

    fn tension_envelope(&self, eps: f64) -> (f64, f64) {
        let ec0 = self.ec0();
        let eps0 = self.ft / ec0;
        let eps_u = self.ft * (1.0 / self.ets + 1.0 / ec0);
        if eps <= eps0 {
            (eps * ec0, ec0)
        } else if eps <= eps_u {
            (self.ft - self.ets * (eps - eps0), -self.ets)
        } else {
            (1.0e-10, 1.0e-10)
        }
    }

    fn compression_envelope(&self, eps: f64) -> (f64, f64) {
        let ec0 = self.ec0();
        let rat = eps / self.eps_c0;
        if eps >= self.eps_c0 {
            (self.fc * rat * (2.0 - rat), ec0 * (1.0 - rat))
        } else if eps > self.eps_cu {
            let slope = (self.fcu - self.fc) / (self.eps_cu - self.eps_c0);
            (self.fc + slope * (eps - self.eps_c0), slope)
        } else {
            (self.fcu, 1.0e-10)
        }
    }
}

impl UniaxialBehavior for Concrete02 {
    fn class_name(&self) -> &'static str {
        "Concrete02"
    }

    fn set_trial_strain(&mut self, strain: f64, _rate: f64) -> TrialStatus {
        let ec0 = self.ec0();
        let c = self.committed;
        let mut t = c;
        let eps = strain;
        let deps = eps - c.eps;
        t.eps = eps;

        if deps.abs() < f64::EPSILON {
            self.trial = c;
            return TrialStatus::Ok;
        }

        if eps < t.ec_min {
            let (sig, e) = self.compression_envelope(eps);
            t.sig = sig;
            t.e = e;
            t.ec_min = eps;
        } else {
            let eps_r = (self.fcu - self.lambda * ec0 * self.eps_cu) / (ec0 * (1.0 - self.lambda));
            let sig_r = ec0 * eps_r;
            let (sig_m, _) = self.compression_envelope(t.ec_min);
            let er = (sig_m - sig_r) / (t.ec_min - eps_r);
            let ept = t.ec_min - sig_m / er;

            if eps <= ept {
                let sig_min = sig_m + er * (eps - t.ec_min);
                let sig_max = er * 0.5 * (eps - ept);
                t.sig = c.sig + ec0 * deps;
                t.e = ec0;
                if t.sig <= sig_min {
                    t.sig = sig_min;
                    t.e = er;
                }
                if t.sig >= sig_max {
                    t.sig = sig_max;
                    t.e = 0.5 * er;
                }
            } else {
                let epn = ept + t.dept;
                if eps <= epn {
                    let (sicn, _) = self.tension_envelope(t.dept);
                    t.e = if t.dept != 0.0 { sicn / t.dept } else { ec0 };
                    t.sig = t.e * (eps - ept);
                } else {
                    let (sig, e) = self.tension_envelope(eps - ept);
                    t.sig = sig;
                    t.e = e;
                    t.dept = eps - ept;
                }
            }
        }

        self.trial = t;
        if t.sig.is_finite() && t.e.is_finite() {
            TrialStatus::Ok
        } else {
            self.trial = self.committed;
            TrialStatus::Failed
        }
    }

    fn strain(&self) -> f64 {
        self.trial.eps
    }

    fn stress(&self) -> f64 {
        self.trial.sig
    }

    fn tangent(&self) -> f64 {
        self.trial.e
    }

    fn initial_tangent(&self) -> f64 {
        self.ec0()
    }

    fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.trial = Concrete02State::initial(self.ec0());
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
    fn test_concrete01_peak_and_no_tension() {
        let mut c = Concrete01::new(-30e6, -0.002, -6e6, -0.0035);
        let _ = c.set_trial_strain(-0.001, 0.0);
        assert_relative_eq!(c.stress(), -22.5e6, max_relative = 1e-12);
        assert_relative_eq!(c.tangent(), 1.5e10, max_relative = 1e-12);

        // The peak itself belongs to the softening branch
        let _ = c.set_trial_strain(-0.002, 0.0);
        assert_relative_eq!(c.stress(), -30e6, max_relative = 1e-12);
        assert_relative_eq!(c.tangent(), -1.6e10, max_relative = 1e-12);

        let _ = c.set_trial_strain(0.001, 0.0);
        assert_eq!(c.stress(), 0.0);
    }

    #[test]
    fn test_concrete01_softening_branch() {
        let mut c = Concrete01::new(30e6, 0.002, 6e6, 0.0035);
        let _ = c.set_trial_strain(-0.00275, 0.0);
        // Halfway between peak and ultimate strain
        assert_relative_eq!(c.stress(), -18e6, max_relative = 1e-10);
    }

    #[test]
    fn test_concrete01_unloading_is_stiff_and_degraded() {
        let mut c = Concrete01::new(30e6, 0.002, 6e6, 0.0035);
        let _ = c.set_trial_strain(-0.0025, 0.0);
        c.commit_state();
        let _ = c.set_trial_strain(-0.0024, 0.0);
        assert!(c.stress() > -30e6 && c.stress() < 0.0);
        assert!(c.tangent() > 0.0 && c.tangent() <= 2.0 * 30e6 / 0.002);
    }

    #[test]
    fn test_concrete02_tension_branch() {
        let fc = 30e6;
        let eps_c0 = 0.002;
        let ec0 = 2.0 * fc / eps_c0;
        let mut c = Concrete02::new(fc, eps_c0, 6e6, 0.0035, 0.1, 3e6, 3e9);
        let eps_t = 0.5 * 3e6 / ec0;
        let _ = c.set_trial_strain(eps_t, 0.0);
        assert_relative_eq!(c.stress(), 1.5e6, max_relative = 1e-10);
        assert_relative_eq!(c.tangent(), ec0, max_relative = 1e-10);

        // Past the tensile strength the stress softens
        let _ = c.set_trial_strain(3e6 / ec0 + 1e-4, 0.0);
        assert_relative_eq!(c.stress(), 3e6 - 3e9 * 1e-4, max_relative = 1e-8);
    }

    #[test]
    fn test_concrete02_compression_matches_parabola() {
        let mut c = Concrete02::new(30e6, 0.002, 6e6, 0.0035, 0.1, 3e6, 3e9);
        let _ = c.set_trial_strain(-0.001, 0.0);
        assert_relative_eq!(c.stress(), -30e6 * 0.75, max_relative = 1e-10);
    }
}
