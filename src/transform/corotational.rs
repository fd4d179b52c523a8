//! Corotational transformations for large displacements, small strains
//!
//! Basic deformations are measured in a chord frame that follows the
//! element. The tangent adds the geometric terms of the axial force and the
//! chord end moments to the rotated material stiffness. The reference
//! configuration is the geometry passed to `initialize`.

use nalgebra::{DMatrix, DVector, Matrix3};
use serde::{Deserialize, Serialize};

use super::linear::member_axes;
use super::{
    add_p0_local, basic_from_local_2d, basic_from_local_3d, check_disp, coords3, not_initialized,
    rotation_2d, rotation_blocks, CrdTransfBehavior,
};
use crate::error::{FEAError, FEAResult};
use crate::math::{rotation_from_vector, Mat3, Vec3};

/// Planar corotational transformation (Crisfield)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorotCrdTransf2d {
    xi: Vec3,
    xj: Vec3,
    l0: f64,
    cos0: f64,
    sin0: f64,
    ln: f64,
    cos: f64,
    sin: f64,
    ui: [f64; 3],
    ub: [f64; 3],
}

impl CorotCrdTransf2d {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chord rotation since the reference configuration
    pub fn chord_rotation(&self) -> f64 {
        let s = self.cos0 * self.sin - self.sin0 * self.cos;
        let c = self.cos0 * self.cos + self.sin0 * self.sin;
        s.atan2(c)
    }

    fn b_global(&self) -> DMatrix<f64> {
        let (c, s, l) = (self.cos, self.sin, self.ln);
        DMatrix::from_row_slice(
            3,
            6,
            &[
                -c, -s, 0.0, c, s, 0.0, //
                -s / l, c / l, 1.0, s / l, -c / l, 0.0, //
                -s / l, c / l, 0.0, s / l, -c / l, 1.0,
            ],
        )
    }
}

impl CrdTransfBehavior for CorotCrdTransf2d {
    fn class_name(&self) -> &'static str {
        "CorotCrdTransf2d"
    }

    fn node_dofs(&self) -> usize {
        3
    }

    fn initialize(&mut self, xi: &[f64], xj: &[f64]) -> FEAResult<()> {
        let (pi, pj) = (coords3(xi), coords3(xj));
        let d = pj - pi;
        let l0 = d.norm();
        if l0 < 1e-10 {
            return Err(FEAError::InvalidGeometry("element has zero length".to_string()));
        }
        *self = Self {
            xi: pi,
            xj: pj,
            l0,
            cos0: d.x / l0,
            sin0: d.y / l0,
            ln: l0,
            cos: d.x / l0,
            sin: d.y / l0,
            ui: [0.0; 3],
            ub: [0.0; 3],
        };
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.l0 > 0.0
    }

    fn update(&mut self, ui: &[f64], uj: &[f64]) -> FEAResult<()> {
        if !self.is_initialized() {
            return Err(not_initialized());
        }
        check_disp(ui, 3)?;
        check_disp(uj, 3)?;
        let dx = self.xj.x + uj[0] - self.xi.x - ui[0];
        let dy = self.xj.y + uj[1] - self.xi.y - ui[1];
        let ln = dx.hypot(dy);
        if ln < 1e-10 {
            return Err(FEAError::InvalidGeometry("element collapsed to zero length".to_string()));
        }
        self.ln = ln;
        self.cos = dx / ln;
        self.sin = dy / ln;
        self.ui = [ui[0], ui[1], ui[2]];
        let alpha = self.chord_rotation();
        self.ub = [ln - self.l0, ui[2] - alpha, uj[2] - alpha];
        Ok(())
    }

    fn initial_length(&self) -> f64 {
        self.l0
    }

    fn deformed_length(&self) -> f64 {
        self.ln
    }

    fn basic_trial_disp(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.ub)
    }

    fn global_resisting_force(&self, q: &DVector<f64>, p0: &DVector<f64>) -> DVector<f64> {
        let mut f = self.b_global().transpose() * q;
        if !p0.is_empty() {
            let mut pl = DVector::zeros(6);
            add_p0_local(&mut pl, p0);
            f += rotation_2d(self.cos, self.sin).transpose() * pl;
        }
        f
    }

    fn global_stiff(&self, kb: &DMatrix<f64>, q: &DVector<f64>) -> DMatrix<f64> {
        let b = self.b_global();
        let mut k = b.transpose() * kb * &b;
        let (c, s, l) = (self.cos, self.sin, self.ln);
        let r = DVector::from_row_slice(&[-c, -s, 0.0, c, s, 0.0]);
        let z = DVector::from_row_slice(&[s, -c, 0.0, -s, c, 0.0]);
        k += (&z * z.transpose()) * (q[0] / l);
        k += (&r * z.transpose() + &z * r.transpose()) * ((q[1] + q[2]) / (l * l));
        k
    }

    fn initial_global_stiff(&self, kb: &DMatrix<f64>) -> DMatrix<f64> {
        let a = basic_from_local_2d(self.l0) * rotation_2d(self.cos0, self.sin0);
        a.transpose() * kb * a
    }

    fn local_axes(&self) -> Mat3 {
        Mat3::new(self.cos, self.sin, 0.0, -self.sin, self.cos, 0.0, 0.0, 0.0, 1.0)
    }

    fn current_origin(&self) -> Vec3 {
        self.xi + Vec3::new(self.ui[0], self.ui[1], 0.0)
    }

    fn commit(&mut self) {}

    fn revert_to_last_commit(&mut self) {}

    fn revert_to_start(&mut self) {
        self.ln = self.l0;
        self.cos = self.cos0;
        self.sin = self.sin0;
        self.ui = [0.0; 3];
        self.ub = [0.0; 3];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct NodeTriads {
    /// Columns are the nodal triad axes in global coordinates
    ti: Matrix3<f64>,
    tj: Matrix3<f64>,
    /// Total rotation dofs the triads correspond to
    theta_i: Vec3,
    theta_j: Vec3,
}

/// Space-frame corotational transformation
///
/// Nodal triads are updated incrementally from the rotation dofs:
/// T = exp(θ − θ_committed)·T_committed. The chord frame takes e1 along the
/// deformed chord and e3 normal to e1 and the mean triad y axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorotCrdTransf3d {
    pub vec_xz: Option<Vec3>,
    xi: Vec3,
    xj: Vec3,
    l0: f64,
    axes0: Mat3,
    committed: NodeTriads,
    trial: NodeTriads,
    ln: f64,
    /// Current chord frame as rows (e1, e2, e3)
    frame: Mat3,
    ui: Vec3,
    ub: [f64; 6],
}

impl CorotCrdTransf3d {
    pub fn new(vec_xz: Option<Vec3>) -> Self {
        let triads = NodeTriads {
            ti: Matrix3::identity(),
            tj: Matrix3::identity(),
            theta_i: Vec3::zeros(),
            theta_j: Vec3::zeros(),
        };
        Self {
            vec_xz,
            xi: Vec3::zeros(),
            xj: Vec3::zeros(),
            l0: 0.0,
            axes0: Mat3::identity(),
            committed: triads,
            trial: triads,
            ln: 0.0,
            frame: Mat3::identity(),
            ui: Vec3::zeros(),
            ub: [0.0; 6],
        }
    }

    fn initial_triads(&self) -> NodeTriads {
        let t = self.axes0.transpose();
        NodeTriads {
            ti: t,
            tj: t,
            theta_i: Vec3::zeros(),
            theta_j: Vec3::zeros(),
        }
    }

    fn b_global(&self) -> DMatrix<f64> {
        basic_from_local_3d(self.ln) * rotation_blocks(&self.frame, 4)
    }

    /// Rotation of a nodal triad relative to the chord frame (small angles)
    fn relative_rotation(frame: &Mat3, t: &Matrix3<f64>) -> Vec3 {
        let e1 = frame.row(0).transpose();
        let e2 = frame.row(1).transpose();
        let e3 = frame.row(2).transpose();
        let (t1, t2, t3) = (t.column(0), t.column(1), t.column(2));
        Vec3::new(
            0.5 * (e3.dot(&t2) - e2.dot(&t3)),
            0.5 * (e1.dot(&t3) - e3.dot(&t1)),
            0.5 * (e2.dot(&t1) - e1.dot(&t2)),
        )
    }
}

impl CrdTransfBehavior for CorotCrdTransf3d {
    fn class_name(&self) -> &'static str {
        "CorotCrdTransf3d"
    }

    fn node_dofs(&self) -> usize {
        6
    }

    fn initialize(&mut self, xi: &[f64], xj: &[f64]) -> FEAResult<()> {
        let (pi, pj) = (coords3(xi), coords3(xj));
        self.axes0 = member_axes(&pi, &pj, self.vec_xz.as_ref())?;
        self.xi = pi;
        self.xj = pj;
        self.l0 = (pj - pi).norm();
        self.ln = self.l0;
        self.frame = self.axes0;
        self.committed = self.initial_triads();
        self.trial = self.committed;
        self.ui = Vec3::zeros();
        self.ub = [0.0; 6];
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.l0 > 0.0
    }

    fn update(&mut self, ui: &[f64], uj: &[f64]) -> FEAResult<()> {
        if !self.is_initialized() {
            return Err(not_initialized());
        }
        check_disp(ui, 6)?;
        check_disp(uj, 6)?;
        let di = Vec3::new(ui[0], ui[1], ui[2]);
        let dj = Vec3::new(uj[0], uj[1], uj[2]);
        let theta_i = Vec3::new(ui[3], ui[4], ui[5]);
        let theta_j = Vec3::new(uj[3], uj[4], uj[5]);

        let c = &self.committed;
        let ti = rotation_from_vector(&(theta_i - c.theta_i)) * c.ti;
        let tj = rotation_from_vector(&(theta_j - c.theta_j)) * c.tj;

        let chord = (self.xj + dj) - (self.xi + di);
        let ln = chord.norm();
        if ln < 1e-10 {
            return Err(FEAError::InvalidGeometry("element collapsed to zero length".to_string()));
        }
        let e1 = chord / ln;
        let t2 = 0.5 * (ti.column(1) + tj.column(1));
        let e3 = e1.cross(&t2);
        let n3 = e3.norm();
        if n3 < 1e-12 {
            return Err(FEAError::InvalidGeometry(
                "nodal triads rotated parallel to the chord".to_string(),
            ));
        }
        let e3 = e3 / n3;
        let e2 = e3.cross(&e1);
        let frame = Mat3::from_rows(&[e1.transpose(), e2.transpose(), e3.transpose()]);

        let phi_i = Self::relative_rotation(&frame, &ti);
        let phi_j = Self::relative_rotation(&frame, &tj);

        self.trial = NodeTriads {
            ti,
            tj,
            theta_i,
            theta_j,
        };
        self.frame = frame;
        self.ln = ln;
        self.ui = di;
        self.ub = [
            ln - self.l0,
            phi_i.z,
            phi_j.z,
            phi_i.y,
            phi_j.y,
            phi_j.x - phi_i.x,
        ];
        Ok(())
    }

    fn initial_length(&self) -> f64 {
        self.l0
    }

    fn deformed_length(&self) -> f64 {
        self.ln
    }

    fn basic_trial_disp(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.ub)
    }

    fn global_resisting_force(&self, q: &DVector<f64>, p0: &DVector<f64>) -> DVector<f64> {
        let mut pl = basic_from_local_3d(self.ln).transpose() * q;
        add_p0_local(&mut pl, p0);
        rotation_blocks(&self.frame, 4).transpose() * pl
    }

    fn global_stiff(&self, kb: &DMatrix<f64>, q: &DVector<f64>) -> DMatrix<f64> {
        let b = self.b_global();
        let mut k = b.transpose() * kb * &b;
        let l = self.ln;
        let e1 = self.frame.row(0).transpose();
        let e2 = self.frame.row(1).transpose();
        let e3 = self.frame.row(2).transpose();
        let g = (Mat3::identity() - e1 * e1.transpose()) * (q[0] / l)
            + (e1 * e2.transpose() + e2 * e1.transpose()) * ((q[1] + q[2]) / (l * l))
            - (e1 * e3.transpose() + e3 * e1.transpose()) * ((q[3] + q[4]) / (l * l));
        for (r, c, sign) in [(0, 0, 1.0), (6, 6, 1.0), (0, 6, -1.0), (6, 0, -1.0)] {
            let mut block = k.view_mut((r, c), (3, 3));
            block += g * sign;
        }
        k
    }

    fn initial_global_stiff(&self, kb: &DMatrix<f64>) -> DMatrix<f64> {
        let a = basic_from_local_3d(self.l0) * rotation_blocks(&self.axes0, 4);
        a.transpose() * kb * a
    }

    fn local_axes(&self) -> Mat3 {
        self.frame
    }

    fn current_origin(&self) -> Vec3 {
        self.xi + self.ui
    }

    fn commit(&mut self) {
        self.committed = self.trial;
    }

    fn revert_to_last_commit(&mut self) {
        self.trial = self.committed;
    }

    fn revert_to_start(&mut self) {
        self.committed = self.initial_triads();
        self.trial = self.committed;
        self.frame = self.axes0;
        self.ln = self.l0;
        self.ui = Vec3::zeros();
        self.ub = [0.0; 6];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_2d_large_rigid_rotation_is_strain_free() {
        let mut t = CorotCrdTransf2d::new();
        t.initialize(&[0.0, 0.0], &[2.0, 0.0]).unwrap();
        let th = 0.8_f64;
        let uj = [2.0 * th.cos() - 2.0, 2.0 * th.sin(), th];
        t.update(&[0.0, 0.0, th], &uj).unwrap();
        let ub = t.basic_trial_disp();
        assert_relative_eq!(ub.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(t.chord_rotation(), th, epsilon = 1e-12);
    }

    #[test]
    fn test_2d_tangent_matches_finite_difference() {
        let mut t = CorotCrdTransf2d::new();
        t.initialize(&[0.0, 0.0], &[3.0, 1.0]).unwrap();
        let kb = DMatrix::from_diagonal(&DVector::from_vec(vec![100.0, 40.0, 40.0]));
        let u0 = [0.01, -0.02, 0.05, 0.1, 0.2, -0.03];
        let force = |t: &mut CorotCrdTransf2d, u: &[f64; 6]| {
            t.update(&u[..3], &u[3..]).unwrap();
            let q = &kb * t.basic_trial_disp();
            (t.global_resisting_force(&q, &DVector::zeros(0)), q)
        };
        let (_, q) = force(&mut t, &u0);
        let k = t.global_stiff(&kb, &q);
        let h = 1e-7;
        for j in 0..6 {
            let mut up = u0;
            up[j] += h;
            let mut um = u0;
            um[j] -= h;
            let (fp, _) = force(&mut t, &up);
            let (fm, _) = force(&mut t, &um);
            let col = (fp - fm) / (2.0 * h);
            for i in 0..6 {
                assert_relative_eq!(k[(i, j)], col[i], epsilon = 1e-4, max_relative = 1e-5);
            }
        }
    }

    #[test]
    fn test_3d_rigid_rotation_is_strain_free() {
        let mut t = CorotCrdTransf3d::new(None);
        t.initialize(&[0.0, 0.0, 0.0], &[2.0, 0.0, 0.0]).unwrap();
        let axis = Vec3::new(0.3, -0.5, 0.8).normalize() * 0.6;
        let r = rotation_from_vector(&axis);
        let xj = r * Vec3::new(2.0, 0.0, 0.0);
        let uj = [xj.x - 2.0, xj.y, xj.z, axis.x, axis.y, axis.z];
        let ui = [0.0, 0.0, 0.0, axis.x, axis.y, axis.z];
        t.update(&ui, &uj).unwrap();
        assert_relative_eq!(t.basic_trial_disp().norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(t.i_vector(), xj / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_3d_small_displacement_matches_linear() {
        use crate::transform::LinearCrdTransf3d;
        let mut c = CorotCrdTransf3d::new(None);
        let mut l = LinearCrdTransf3d::new(None);
        c.initialize(&[0.0, 0.0, 0.0], &[0.0, 3.0, 1.0]).unwrap();
        l.initialize(&[0.0, 0.0, 0.0], &[0.0, 3.0, 1.0]).unwrap();
        let ui = [1e-7, -2e-7, 3e-7, 1e-7, 2e-7, -1e-7];
        let uj = [-2e-7, 1e-7, 2e-7, -3e-7, 1e-7, 2e-7];
        c.update(&ui, &uj).unwrap();
        l.update(&ui, &uj).unwrap();
        assert_relative_eq!(c.basic_trial_disp(), l.basic_trial_disp(), epsilon = 1e-12);
    }
}
