//! Elastic membrane-plate section for shell elements
//!
//! Generalized strains are (ε11, ε22, γ12, κ11, κ22, κ12, γ13, γ23) and the
//! conjugate resultants (n1, n2, n12, m1, m2, m12, q13, q23).

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

pub type ShellStrain = SVector<f64, 8>;
pub type ShellTangent = SMatrix<f64, 8, 8>;

/// Shear correction factor for the transverse shear block
const SHEAR_FACTOR: f64 = 5.0 / 6.0;

/// Isotropic linear elastic shell section of uniform thickness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticMembranePlateSection {
    pub e: f64,
    pub nu: f64,
    pub h: f64,
    /// Mass density per unit volume
    pub rho: f64,
    trial: ShellStrain,
    committed: ShellStrain,
}

impl ElasticMembranePlateSection {
    pub fn new(e: f64, nu: f64, h: f64, rho: f64) -> FEAResult<Self> {
        if !(h > 0.0) || !(e > 0.0) || !(-1.0..0.5).contains(&nu) {
            return Err(FEAError::InvalidInput(format!(
                "shell section needs E > 0, h > 0 and -1 <= nu < 0.5 (E={e}, nu={nu}, h={h})"
            )));
        }
        Ok(Self {
            e,
            nu,
            h,
            rho,
            trial: ShellStrain::zeros(),
            committed: ShellStrain::zeros(),
        })
    }

    pub fn shear_modulus(&self) -> f64 {
        self.e / (2.0 * (1.0 + self.nu))
    }

    /// Mass per unit area
    pub fn areal_density(&self) -> f64 {
        self.rho * self.h
    }

    pub fn tangent(&self) -> ShellTangent {
        let mut d = ShellTangent::zeros();
        let nu = self.nu;
        let membrane = self.e * self.h / (1.0 - nu * nu);
        let bending = membrane * self.h * self.h / 12.0;
        for (offset, c) in [(0, membrane), (3, bending)] {
            d[(offset, offset)] = c;
            d[(offset + 1, offset + 1)] = c;
            d[(offset, offset + 1)] = c * nu;
            d[(offset + 1, offset)] = c * nu;
            d[(offset + 2, offset + 2)] = c * 0.5 * (1.0 - nu);
        }
        let shear = SHEAR_FACTOR * self.shear_modulus() * self.h;
        d[(6, 6)] = shear;
        d[(7, 7)] = shear;
        d
    }

    pub fn set_trial_strain(&mut self, strain: &ShellStrain) {
        self.trial = *strain;
    }

    pub fn strain(&self) -> &ShellStrain {
        &self.trial
    }

    pub fn stress_resultant(&self) -> ShellStrain {
        self.tangent() * self.trial
    }

    pub fn commit_state(&mut self) {
        self.committed = self.trial;
    }

    pub fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    pub fn revert_to_start(&mut self) {
        self.trial = ShellStrain::zeros();
        self.committed = ShellStrain::zeros();
    }
}
