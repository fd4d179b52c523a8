//! Linear elastic frame sections

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{CrossSectionProperties, ResponseCode, SectionBehavior};
use crate::error::TrialStatus;

/// Elastic section for planar frames: (P, Mz[, Vy])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticSection2d {
    pub e: f64,
    pub a: f64,
    pub iz: f64,
    /// Shear rigidity G·Av; `None` keeps the section shear rigid
    pub shear_y: Option<f64>,
    pub rho: f64,
    trial: Vec<f64>,
    committed: Vec<f64>,
}

impl ElasticSection2d {
    pub fn new(e: f64, a: f64, iz: f64) -> Self {
        Self {
            e,
            a,
            iz,
            shear_y: None,
            rho: 0.0,
            trial: vec![0.0; 2],
            committed: vec![0.0; 2],
        }
    }

    pub fn from_properties(p: &CrossSectionProperties, include_shear: bool) -> Self {
        let mut s = Self::new(p.e, p.a, p.iz);
        s.rho = p.rho;
        if include_shear {
            if let Some(av) = p.shear_area_y() {
                s = s.with_shear(p.g * av);
            }
        }
        s
    }

    pub fn with_shear(mut self, g_av: f64) -> Self {
        self.shear_y = Some(g_av);
        self.trial = vec![0.0; 3];
        self.committed = vec![0.0; 3];
        self
    }

    pub fn with_density(mut self, rho: f64) -> Self {
        self.rho = rho;
        self
    }

    fn stiffness_diagonal(&self) -> Vec<f64> {
        let mut d = vec![self.e * self.a, self.e * self.iz];
        if let Some(ga) = self.shear_y {
            d.push(ga);
        }
        d
    }
}

impl SectionBehavior for ElasticSection2d {
    fn class_name(&self) -> &'static str {
        "ElasticSection2d"
    }

    fn codes(&self) -> Vec<ResponseCode> {
        let mut c = vec![ResponseCode::P, ResponseCode::Mz];
        if self.shear_y.is_some() {
            c.push(ResponseCode::Vy);
        }
        c
    }

    fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus {
        self.trial = deformation.iter().copied().collect();
        TrialStatus::Ok
    }

    fn deformation(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.trial)
    }

    fn stress_resultant(&self) -> DVector<f64> {
        let k = self.stiffness_diagonal();
        DVector::from_iterator(k.len(), k.iter().zip(&self.trial).map(|(k, e)| k * e))
    }

    fn tangent(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(self.stiffness_diagonal()))
    }

    fn initial_tangent(&self) -> DMatrix<f64> {
        self.tangent()
    }

    fn commit_state(&mut self) {
        self.committed.clone_from(&self.trial);
    }

    fn revert_to_last_commit(&mut self) {
        self.trial.clone_from(&self.committed);
    }

    fn revert_to_start(&mut self) {
        self.trial.iter_mut().for_each(|v| *v = 0.0);
        self.committed.iter_mut().for_each(|v| *v = 0.0);
    }

    fn area(&self) -> f64 {
        self.a
    }

    fn linear_density(&self) -> f64 {
        self.rho * self.a
    }
}

/// Elastic section for space frames: (P, Mz, My, T[, Vy, Vz])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticSection3d {
    pub props: CrossSectionProperties,
    pub include_shear: bool,
    trial: Vec<f64>,
    committed: Vec<f64>,
}

impl ElasticSection3d {
    pub fn new(props: CrossSectionProperties) -> Self {
        Self {
            props,
            include_shear: false,
            trial: vec![0.0; 4],
            committed: vec![0.0; 4],
        }
    }

    /// Adds Vy and Vz with rigidity G·αA; requires non-zero shear factors
    pub fn with_shear(mut self) -> Self {
        self.include_shear = true;
        self.trial = vec![0.0; 6];
        self.committed = vec![0.0; 6];
        self
    }

    fn stiffness_diagonal(&self) -> Vec<f64> {
        let p = &self.props;
        let mut d = vec![p.e * p.a, p.e * p.iz, p.e * p.iy, p.g * p.j];
        if self.include_shear {
            d.push(p.g * p.alpha_y * p.a);
            d.push(p.g * p.alpha_z * p.a);
        }
        d
    }
}

impl SectionBehavior for ElasticSection3d {
    fn class_name(&self) -> &'static str {
        "ElasticSection3d"
    }

    fn codes(&self) -> Vec<ResponseCode> {
        use ResponseCode::*;
        if self.include_shear {
            vec![P, Mz, My, T, Vy, Vz]
        } else {
            vec![P, Mz, My, T]
        }
    }

    fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus {
        self.trial = deformation.iter().copied().collect();
        TrialStatus::Ok
    }

    fn deformation(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.trial)
    }

    fn stress_resultant(&self) -> DVector<f64> {
        let k = self.stiffness_diagonal();
        DVector::from_iterator(k.len(), k.iter().zip(&self.trial).map(|(k, e)| k * e))
    }

    fn tangent(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(self.stiffness_diagonal()))
    }

    fn initial_tangent(&self) -> DMatrix<f64> {
        self.tangent()
    }

    fn commit_state(&mut self) {
        self.committed.clone_from(&self.trial);
    }

    fn revert_to_last_commit(&mut self) {
        self.trial.clone_from(&self.committed);
    }

    fn revert_to_start(&mut self) {
        self.trial.iter_mut().for_each(|v| *v = 0.0);
        self.committed.iter_mut().for_each(|v| *v = 0.0);
    }

    fn area(&self) -> f64 {
        self.props.a
    }

    fn linear_density(&self) -> f64 {
        self.props.linear_density()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_elastic_3d_resultants() {
        let props = CrossSectionProperties::rectangular(0.1, 0.2).with_material(200e9, 80e9, 7850.0);
        let mut s = ElasticSection3d::new(props.clone());
        let e = DVector::from_vec(vec![1e-4, 1e-3, 2e-3, 1e-3]);
        let _ = s.set_trial_deformation(&e);
        let r = s.stress_resultant();
        assert_relative_eq!(r[0], 200e9 * props.a * 1e-4);
        assert_relative_eq!(r[2], 200e9 * props.iy * 2e-3);
        assert_relative_eq!(s.linear_density(), 7850.0 * 0.02, max_relative = 1e-12);
    }

    #[test]
    fn test_elastic_2d_shear_code() {
        let s = ElasticSection2d::new(1.0, 1.0, 1.0).with_shear(0.5);
        assert_eq!(s.codes(), vec![ResponseCode::P, ResponseCode::Mz, ResponseCode::Vy]);
        assert_relative_eq!(s.tangent()[(2, 2)], 0.5);
    }
}
