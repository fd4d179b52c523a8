//! Small-displacement transformations

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{
    add_p0_local, basic_from_local_2d, basic_from_local_3d, check_disp, coords3, not_initialized,
    rotation_2d, rotation_blocks, CrdTransfBehavior,
};
use crate::error::{FEAError, FEAResult};
use crate::math::{default_local_axes, local_axes_from_vecxz, Mat3, Vec3};

/// Linear planar transformation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearCrdTransf2d {
    origin: Vec3,
    length: f64,
    cos: f64,
    sin: f64,
    /// Basic-from-global matrix (3 x 6)
    #[serde(skip)]
    a_global: Option<DMatrix<f64>>,
    ub: [f64; 3],
}

impl LinearCrdTransf2d {
    pub fn new() -> Self {
        Self::default()
    }

    fn a_global(&self) -> FEAResult<&DMatrix<f64>> {
        self.a_global.as_ref().ok_or_else(not_initialized)
    }

    fn rebuild(&mut self) {
        let a = basic_from_local_2d(self.length) * rotation_2d(self.cos, self.sin);
        self.a_global = Some(a);
    }
}

impl CrdTransfBehavior for LinearCrdTransf2d {
    fn class_name(&self) -> &'static str {
        "LinearCrdTransf2d"
    }

    fn node_dofs(&self) -> usize {
        3
    }

    fn initialize(&mut self, xi: &[f64], xj: &[f64]) -> FEAResult<()> {
        let (pi, pj) = (coords3(xi), coords3(xj));
        let d = pj - pi;
        let length = d.norm();
        if length < 1e-10 {
            return Err(FEAError::InvalidGeometry("element has zero length".to_string()));
        }
        self.origin = pi;
        self.length = length;
        self.cos = d.x / length;
        self.sin = d.y / length;
        self.rebuild();
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.length > 0.0
    }

    fn update(&mut self, ui: &[f64], uj: &[f64]) -> FEAResult<()> {
        check_disp(ui, 3)?;
        check_disp(uj, 3)?;
        if self.a_global.is_none() && self.is_initialized() {
            self.rebuild();
        }
        let u = DVector::from_vec(vec![ui[0], ui[1], ui[2], uj[0], uj[1], uj[2]]);
        let ub = self.a_global()? * u;
        self.ub = [ub[0], ub[1], ub[2]];
        Ok(())
    }

    fn initial_length(&self) -> f64 {
        self.length
    }

    fn deformed_length(&self) -> f64 {
        self.length
    }

    fn basic_trial_disp(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.ub)
    }

    fn global_resisting_force(&self, q: &DVector<f64>, p0: &DVector<f64>) -> DVector<f64> {
        let t = rotation_2d(self.cos, self.sin);
        let mut pl = basic_from_local_2d(self.length).transpose() * q;
        add_p0_local(&mut pl, p0);
        t.transpose() * pl
    }

    fn global_stiff(&self, kb: &DMatrix<f64>, _q: &DVector<f64>) -> DMatrix<f64> {
        self.initial_global_stiff(kb)
    }

    fn initial_global_stiff(&self, kb: &DMatrix<f64>) -> DMatrix<f64> {
        let a = basic_from_local_2d(self.length) * rotation_2d(self.cos, self.sin);
        a.transpose() * kb * a
    }

    fn local_axes(&self) -> Mat3 {
        Mat3::new(self.cos, self.sin, 0.0, -self.sin, self.cos, 0.0, 0.0, 0.0, 1.0)
    }

    fn current_origin(&self) -> Vec3 {
        self.origin
    }

    fn commit(&mut self) {}

    fn revert_to_last_commit(&mut self) {}

    fn revert_to_start(&mut self) {
        self.ub = [0.0; 3];
    }
}

/// Linear space-frame transformation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearCrdTransf3d {
    /// Vector in the local x-z plane; `None` uses the default orientation
    pub vec_xz: Option<Vec3>,
    origin: Vec3,
    length: f64,
    axes: Mat3,
    ub: [f64; 6],
}

impl LinearCrdTransf3d {
    pub fn new(vec_xz: Option<Vec3>) -> Self {
        Self {
            vec_xz,
            origin: Vec3::zeros(),
            length: 0.0,
            axes: Mat3::identity(),
            ub: [0.0; 6],
        }
    }

    fn a_global(&self) -> DMatrix<f64> {
        basic_from_local_3d(self.length) * rotation_blocks(&self.axes, 4)
    }
}

/// Local axes for a 3D member from its optional orientation vector
pub(crate) fn member_axes(pi: &Vec3, pj: &Vec3, vec_xz: Option<&Vec3>) -> FEAResult<Mat3> {
    match vec_xz {
        Some(v) => local_axes_from_vecxz(pi, pj, v),
        None => default_local_axes(pi, pj, 0.0),
    }
}

impl CrdTransfBehavior for LinearCrdTransf3d {
    fn class_name(&self) -> &'static str {
        "LinearCrdTransf3d"
    }

    fn node_dofs(&self) -> usize {
        6
    }

    fn initialize(&mut self, xi: &[f64], xj: &[f64]) -> FEAResult<()> {
        let (pi, pj) = (coords3(xi), coords3(xj));
        self.axes = member_axes(&pi, &pj, self.vec_xz.as_ref())?;
        self.origin = pi;
        self.length = (pj - pi).norm();
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.length > 0.0
    }

    fn update(&mut self, ui: &[f64], uj: &[f64]) -> FEAResult<()> {
        if !self.is_initialized() {
            return Err(not_initialized());
        }
        check_disp(ui, 6)?;
        check_disp(uj, 6)?;
        let u = DVector::from_iterator(12, ui[..6].iter().chain(&uj[..6]).copied());
        let ub = self.a_global() * u;
        self.ub.copy_from_slice(ub.as_slice());
        Ok(())
    }

    fn initial_length(&self) -> f64 {
        self.length
    }

    fn deformed_length(&self) -> f64 {
        self.length
    }

    fn basic_trial_disp(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.ub)
    }

    fn global_resisting_force(&self, q: &DVector<f64>, p0: &DVector<f64>) -> DVector<f64> {
        let mut pl = basic_from_local_3d(self.length).transpose() * q;
        add_p0_local(&mut pl, p0);
        rotation_blocks(&self.axes, 4).transpose() * pl
    }

    fn global_stiff(&self, kb: &DMatrix<f64>, _q: &DVector<f64>) -> DMatrix<f64> {
        self.initial_global_stiff(kb)
    }

    fn initial_global_stiff(&self, kb: &DMatrix<f64>) -> DMatrix<f64> {
        let a = self.a_global();
        a.transpose() * kb * a
    }

    fn local_axes(&self) -> Mat3 {
        self.axes
    }

    fn current_origin(&self) -> Vec3 {
        self.origin
    }

    fn commit(&mut self) {}

    fn revert_to_last_commit(&mut self) {}

    fn revert_to_start(&mut self) {
        self.ub = [0.0; 6];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_2d_rigid_body_motion_is_strain_free() {
        let mut t = LinearCrdTransf2d::new();
        t.initialize(&[0.0, 0.0], &[3.0, 4.0]).unwrap();
        let th = 1e-3;
        // Small rigid rotation about node I
        let uj = [-4.0 * th, 3.0 * th, th];
        t.update(&[0.0, 0.0, th], &uj).unwrap();
        for v in t.basic_trial_disp().iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_3d_basic_disp_of_axial_stretch() {
        let mut t = LinearCrdTransf3d::new(None);
        t.initialize(&[0.0, 0.0, 0.0], &[0.0, 0.0, 2.0]).unwrap();
        let mut uj = [0.0; 6];
        uj[2] = 1e-3;
        t.update(&[0.0; 6], &uj).unwrap();
        let ub = t.basic_trial_disp();
        assert_relative_eq!(ub[0], 1e-3, epsilon = 1e-15);
        assert_relative_eq!(ub.rows(1, 5).norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_3d_forces_are_contragredient() {
        let mut t = LinearCrdTransf3d::new(Some(Vec3::new(0.0, 0.0, 1.0)));
        t.initialize(&[1.0, 2.0, 0.0], &[4.0, 6.0, 0.0]).unwrap();
        let ug = DVector::from_fn(12, |i, _| 1e-3 * (i as f64 + 1.0).sin());
        let ui: Vec<f64> = ug.rows(0, 6).iter().copied().collect();
        let uj: Vec<f64> = ug.rows(6, 6).iter().copied().collect();
        t.update(&ui, &uj).unwrap();
        let q = DVector::from_vec(vec![10.0, -3.0, 7.0, 2.0, -5.0, 1.5]);
        let p = t.global_resisting_force(&q, &DVector::zeros(0));
        // Virtual work: qᵀ ub = pᵀ u
        assert_relative_eq!(q.dot(&t.basic_trial_disp()), p.dot(&ug), max_relative = 1e-12);
    }

    #[test]
    fn test_update_before_initialize_fails() {
        let mut t = LinearCrdTransf3d::new(None);
        assert!(t.update(&[0.0; 6], &[0.0; 6]).is_err());
    }
}
