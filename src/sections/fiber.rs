//! Fiber sections: plane sections integrated over discrete fibers
//!
//! Each fiber owns its own material instance. The strain in a fiber at
//! (y, z) is ε = ε₀ − y·κz + z·κy, so the fiber's contribution to the
//! resultants is σ·A·(1, −y, z) and to the tangent E·A·b·bᵀ.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{DeformationPlane, ResponseCode, SectionBehavior};
use crate::error::{FEAError, FEAResult, TrialStatus};
use crate::materials::UniaxialMaterial;

/// A single fiber: location, area and its own material state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fiber {
    pub y: f64,
    pub z: f64,
    pub area: f64,
    pub material: UniaxialMaterial,
}

impl Fiber {
    pub fn new(y: f64, z: f64, area: f64, material: UniaxialMaterial) -> Self {
        Self { y, z, area, material }
    }

    pub fn force(&self) -> f64 {
        self.material.stress() * self.area
    }
}

fn check_fibers(fibers: &[Fiber]) -> FEAResult<()> {
    if fibers.is_empty() {
        return Err(FEAError::InvalidInput("fiber section has no fibers".to_string()));
    }
    if let Some(f) = fibers.iter().find(|f| !(f.area > 0.0) || !f.y.is_finite() || !f.z.is_finite()) {
        return Err(FEAError::InvalidGeometry(format!(
            "fiber at ({}, {}) has area {}",
            f.y, f.z, f.area
        )));
    }
    Ok(())
}

/// Area-weighted sums shared by both fiber sections
fn area_moments(fibers: &[Fiber], weight: impl Fn(&Fiber) -> f64) -> (f64, f64, f64) {
    fibers.iter().fold((0.0, 0.0, 0.0), |(w, wy, wz), f| {
        let a = weight(f) * f.area;
        (w + a, wy + a * f.y, wz + a * f.z)
    })
}

/// Planar fiber section with resultants (N, Mz)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiberSection2d {
    fibers: Vec<Fiber>,
    /// Mass per unit length
    density: f64,
    trial: [f64; 2],
    committed: [f64; 2],
}

impl FiberSection2d {
    pub fn new(fibers: Vec<Fiber>) -> FEAResult<Self> {
        check_fibers(&fibers)?;
        Ok(Self {
            fibers,
            density: 0.0,
            trial: [0.0; 2],
            committed: [0.0; 2],
        })
    }

    pub fn with_linear_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn fibers(&self) -> &[Fiber] {
        &self.fibers
    }

    /// Area-weighted centroid ordinate
    pub fn centroid(&self) -> f64 {
        let (a, ay, _) = area_moments(&self.fibers, |_| 1.0);
        ay / a
    }

    /// Second moment of area about the centroid
    pub fn iz(&self) -> f64 {
        let yc = self.centroid();
        self.fibers.iter().map(|f| f.area * (f.y - yc).powi(2)).sum()
    }

    /// Initial axial rigidity Σ E·A
    pub fn ea(&self) -> f64 {
        self.fibers.iter().map(|f| f.material.initial_tangent() * f.area).sum()
    }

    /// Initial flexural rigidity about the elastic centroid
    pub fn eiz(&self) -> f64 {
        let (ea, eay, _) = area_moments(&self.fibers, |f| f.material.initial_tangent());
        let yc = eay / ea;
        self.fibers
            .iter()
            .map(|f| f.material.initial_tangent() * f.area * (f.y - yc).powi(2))
            .sum()
    }

    pub fn deformation_plane(&self) -> DeformationPlane {
        DeformationPlane::new(self.trial[0], self.trial[1], 0.0)
    }

    /// Strain at ordinate `y` for the trial deformation
    pub fn strain_at(&self, y: f64) -> f64 {
        self.deformation_plane().strain(y, 0.0)
    }
}

impl SectionBehavior for FiberSection2d {
    fn class_name(&self) -> &'static str {
        "FiberSection2d"
    }

    fn codes(&self) -> Vec<ResponseCode> {
        vec![ResponseCode::P, ResponseCode::Mz]
    }

    fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus {
        self.trial = [deformation[0], deformation[1]];
        let [eps0, kz] = self.trial;
        self.fibers.iter_mut().fold(TrialStatus::Ok, |status, f| {
            status.and(f.material.set_trial_strain(eps0 - f.y * kz, 0.0))
        })
    }

    fn deformation(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.trial)
    }

    fn stress_resultant(&self) -> DVector<f64> {
        let mut s = DVector::zeros(2);
        for f in &self.fibers {
            let force = f.force();
            s[0] += force;
            s[1] -= f.y * force;
        }
        s
    }

    fn tangent(&self) -> DMatrix<f64> {
        fiber_tangent_2d(&self.fibers, |m| m.tangent())
    }

    fn initial_tangent(&self) -> DMatrix<f64> {
        fiber_tangent_2d(&self.fibers, |m| m.initial_tangent())
    }

    fn commit_state(&mut self) {
        self.fibers.iter_mut().for_each(|f| f.material.commit_state());
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.fibers.iter_mut().for_each(|f| f.material.revert_to_last_commit());
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.fibers.iter_mut().for_each(|f| f.material.revert_to_start());
        self.trial = [0.0; 2];
        self.committed = [0.0; 2];
    }

    fn area(&self) -> f64 {
        self.fibers.iter().map(|f| f.area).sum()
    }

    fn linear_density(&self) -> f64 {
        self.density
    }
}

fn fiber_tangent_2d(fibers: &[Fiber], modulus: impl Fn(&UniaxialMaterial) -> f64) -> DMatrix<f64> {
    let mut k = DMatrix::zeros(2, 2);
    for f in fibers {
        let ea = modulus(&f.material) * f.area;
        k[(0, 0)] += ea;
        k[(0, 1)] -= ea * f.y;
        k[(1, 1)] += ea * f.y * f.y;
    }
    k[(1, 0)] = k[(0, 1)];
    k
}

/// Space-frame fiber section with resultants (N, Mz, My[, T])
///
/// Torsion is uncoupled and linear when a rigidity GJ is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiberSection3d {
    fibers: Vec<Fiber>,
    gj: Option<f64>,
    density: f64,
    trial: [f64; 4],
    committed: [f64; 4],
}

impl FiberSection3d {
    pub fn new(fibers: Vec<Fiber>) -> FEAResult<Self> {
        check_fibers(&fibers)?;
        Ok(Self {
            fibers,
            gj: None,
            density: 0.0,
            trial: [0.0; 4],
            committed: [0.0; 4],
        })
    }

    pub fn with_torsion(mut self, gj: f64) -> Self {
        self.gj = Some(gj);
        self
    }

    pub fn with_linear_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn torsional_rigidity(&self) -> Option<f64> {
        self.gj
    }

    pub fn fibers(&self) -> &[Fiber] {
        &self.fibers
    }

    /// Area-weighted centroid (y, z)
    pub fn centroid(&self) -> (f64, f64) {
        let (a, ay, az) = area_moments(&self.fibers, |_| 1.0);
        (ay / a, az / a)
    }

    /// Second moment of area about the centroidal z axis
    pub fn iz(&self) -> f64 {
        let (yc, _) = self.centroid();
        self.fibers.iter().map(|f| f.area * (f.y - yc).powi(2)).sum()
    }

    /// Second moment of area about the centroidal y axis
    pub fn iy(&self) -> f64 {
        let (_, zc) = self.centroid();
        self.fibers.iter().map(|f| f.area * (f.z - zc).powi(2)).sum()
    }

    pub fn ea(&self) -> f64 {
        self.fibers.iter().map(|f| f.material.initial_tangent() * f.area).sum()
    }

    /// Initial flexural rigidities (EIz, EIy) about the elastic centroid
    pub fn ei(&self) -> (f64, f64) {
        let (ea, eay, eaz) = area_moments(&self.fibers, |f| f.material.initial_tangent());
        let (yc, zc) = (eay / ea, eaz / ea);
        self.fibers.iter().fold((0.0, 0.0), |(eiz, eiy), f| {
            let ea = f.material.initial_tangent() * f.area;
            (eiz + ea * (f.y - yc).powi(2), eiy + ea * (f.z - zc).powi(2))
        })
    }

    pub fn deformation_plane(&self) -> DeformationPlane {
        DeformationPlane::new(self.trial[0], self.trial[1], self.trial[2])
    }

    /// Strain at a point of the section for the trial deformation
    pub fn strain_at(&self, y: f64, z: f64) -> f64 {
        self.deformation_plane().strain(y, z)
    }

    /// Copy with every fiber rotated by `angle` about the member axis, in a
    /// virgin state
    pub fn rotated(&self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut out = self.clone();
        for f in &mut out.fibers {
            let (y, z) = (f.y, f.z);
            f.y = c * y - s * z;
            f.z = s * y + c * z;
        }
        out.revert_to_start();
        out
    }
}

impl SectionBehavior for FiberSection3d {
    fn class_name(&self) -> &'static str {
        "FiberSection3d"
    }

    fn codes(&self) -> Vec<ResponseCode> {
        use ResponseCode::*;
        if self.gj.is_some() {
            vec![P, Mz, My, T]
        } else {
            vec![P, Mz, My]
        }
    }

    fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus {
        self.trial[..deformation.len()].copy_from_slice(deformation.as_slice());
        let [eps0, kz, ky, _] = self.trial;
        self.fibers.iter_mut().fold(TrialStatus::Ok, |status, f| {
            status.and(f.material.set_trial_strain(eps0 - f.y * kz + f.z * ky, 0.0))
        })
    }

    fn deformation(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.trial[..self.order()])
    }

    fn stress_resultant(&self) -> DVector<f64> {
        let mut s = DVector::zeros(self.order());
        for f in &self.fibers {
            let force = f.force();
            s[0] += force;
            s[1] -= f.y * force;
            s[2] += f.z * force;
        }
        if let Some(gj) = self.gj {
            s[3] = gj * self.trial[3];
        }
        s
    }

    fn tangent(&self) -> DMatrix<f64> {
        fiber_tangent_3d(&self.fibers, self.gj, |m| m.tangent())
    }

    fn initial_tangent(&self) -> DMatrix<f64> {
        fiber_tangent_3d(&self.fibers, self.gj, |m| m.initial_tangent())
    }

    fn commit_state(&mut self) {
        self.fibers.iter_mut().for_each(|f| f.material.commit_state());
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.fibers.iter_mut().for_each(|f| f.material.revert_to_last_commit());
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.fibers.iter_mut().for_each(|f| f.material.revert_to_start());
        self.trial = [0.0; 4];
        self.committed = [0.0; 4];
    }

    fn area(&self) -> f64 {
        self.fibers.iter().map(|f| f.area).sum()
    }

    fn linear_density(&self) -> f64 {
        self.density
    }
}

fn fiber_tangent_3d(
    fibers: &[Fiber],
    gj: Option<f64>,
    modulus: impl Fn(&UniaxialMaterial) -> f64,
) -> DMatrix<f64> {
    let n = if gj.is_some() { 4 } else { 3 };
    let mut k = DMatrix::zeros(n, n);
    for f in fibers {
        let ea = modulus(&f.material) * f.area;
        let b = [1.0, -f.y, f.z];
        for r in 0..3 {
            for c in r..3 {
                k[(r, c)] += ea * b[r] * b[c];
            }
        }
    }
    for r in 0..3 {
        for c in 0..r {
            k[(r, c)] = k[(c, r)];
        }
    }
    if let Some(gj) = gj {
        k[(3, 3)] = gj;
    }
    k
}
