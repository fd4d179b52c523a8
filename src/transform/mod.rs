//! Coordinate transformations between global nodal and element basic systems
//!
//! Basic systems are (N, M_I, M_J) in 2D and (N, Mz_I, Mz_J, My_I, My_J, T)
//! in 3D. Nodal vectors are (ux, uy, rz) per node in 2D and
//! (ux, uy, uz, rx, ry, rz) per node in 3D.

pub mod corotational;
pub mod linear;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::{Mat3, Vec3};
use crate::sections::{CrossSectionProperties, SectionAxis};

pub use corotational::{CorotCrdTransf2d, CorotCrdTransf3d};
pub use linear::{LinearCrdTransf2d, LinearCrdTransf3d};

/// Behavior shared by all transformations
pub trait CrdTransfBehavior {
    fn class_name(&self) -> &'static str;

    /// Dofs per node in the global system (3 or 6)
    fn node_dofs(&self) -> usize;

    /// Size of the basic system (3 or 6)
    fn basic_order(&self) -> usize {
        if self.node_dofs() == 3 {
            3
        } else {
            6
        }
    }

    /// Fix the reference geometry from node coordinates
    fn initialize(&mut self, xi: &[f64], xj: &[f64]) -> FEAResult<()>;

    fn is_initialized(&self) -> bool;

    /// Update from trial global displacements of both end nodes
    fn update(&mut self, ui: &[f64], uj: &[f64]) -> FEAResult<()>;

    fn initial_length(&self) -> f64;
    fn deformed_length(&self) -> f64;

    fn basic_trial_disp(&self) -> DVector<f64>;

    /// Global end forces from basic forces plus fixed-end reactions `p0`
    ///
    /// `p0` is (P, V_I, V_J) in 2D and (P, Vy_I, Vy_J, Vz_I, Vz_J) in 3D.
    fn global_resisting_force(&self, q: &DVector<f64>, p0: &DVector<f64>) -> DVector<f64>;

    fn global_stiff(&self, kb: &DMatrix<f64>, q: &DVector<f64>) -> DMatrix<f64>;
    fn initial_global_stiff(&self, kb: &DMatrix<f64>) -> DMatrix<f64>;

    /// Current local axes as rows (x, y, z) in global coordinates
    fn local_axes(&self) -> Mat3;

    /// Global position of end I in the current configuration
    fn current_origin(&self) -> Vec3;

    fn commit(&mut self);
    fn revert_to_last_commit(&mut self);
    fn revert_to_start(&mut self);

    fn i_vector(&self) -> Vec3 {
        self.local_axes().row(0).transpose()
    }

    fn j_vector(&self) -> Vec3 {
        self.local_axes().row(1).transpose()
    }

    fn k_vector(&self) -> Vec3 {
        self.local_axes().row(2).transpose()
    }

    fn vector_global_from_local(&self, v: &Vec3) -> Vec3 {
        self.local_axes().transpose() * v
    }

    fn vector_local_from_global(&self, v: &Vec3) -> Vec3 {
        self.local_axes() * v
    }

    fn point_global_from_local(&self, x_local: &Vec3) -> Vec3 {
        self.current_origin() + self.vector_global_from_local(x_local)
    }

    /// Point at natural coordinate ξ ∈ [0, 1] along the chord
    fn point_global_from_basic(&self, xi: f64) -> Vec3 {
        self.current_origin() + self.i_vector() * (xi * self.deformed_length())
    }
}

/// Closed set of frame transformations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CrdTransf {
    Linear2d(LinearCrdTransf2d),
    Linear3d(LinearCrdTransf3d),
    Corotational2d(CorotCrdTransf2d),
    Corotational3d(CorotCrdTransf3d),
}

macro_rules! dispatch {
    ($self:ident, $t:ident => $e:expr) => {
        match $self {
            CrdTransf::Linear2d($t) => $e,
            CrdTransf::Linear3d($t) => $e,
            CrdTransf::Corotational2d($t) => $e,
            CrdTransf::Corotational3d($t) => $e,
        }
    };
}

impl CrdTransf {
    pub fn linear_2d() -> Self {
        CrdTransf::Linear2d(LinearCrdTransf2d::new())
    }

    /// Linear 3D transformation; `None` selects the default orientation rule
    pub fn linear_3d(vec_xz: Option<Vec3>) -> Self {
        CrdTransf::Linear3d(LinearCrdTransf3d::new(vec_xz))
    }

    pub fn corotational_2d() -> Self {
        CrdTransf::Corotational2d(CorotCrdTransf2d::new())
    }

    pub fn corotational_3d(vec_xz: Option<Vec3>) -> Self {
        CrdTransf::Corotational3d(CorotCrdTransf3d::new(vec_xz))
    }

    pub fn behavior(&self) -> &dyn CrdTransfBehavior {
        dispatch!(self, t => t)
    }

    pub fn behavior_mut(&mut self) -> &mut dyn CrdTransfBehavior {
        dispatch!(self, t => t)
    }

    pub fn is_3d(&self) -> bool {
        self.behavior().node_dofs() == 6
    }

    pub fn is_corotational(&self) -> bool {
        matches!(self, CrdTransf::Corotational2d(_) | CrdTransf::Corotational3d(_))
    }

    /// Global direction of the local axis about which the section is stiffest
    pub fn v_dir_strong_axis(&self, props: &CrossSectionProperties) -> Vec3 {
        match props.strong_axis() {
            SectionAxis::Z => self.behavior().k_vector(),
            SectionAxis::Y => self.behavior().j_vector(),
        }
    }

    pub fn v_dir_weak_axis(&self, props: &CrossSectionProperties) -> Vec3 {
        match props.strong_axis() {
            SectionAxis::Z => self.behavior().j_vector(),
            SectionAxis::Y => self.behavior().k_vector(),
        }
    }
}

/// Pad 2D coordinates to 3D
pub(crate) fn coords3(x: &[f64]) -> Vec3 {
    Vec3::new(
        x.first().copied().unwrap_or(0.0),
        x.get(1).copied().unwrap_or(0.0),
        x.get(2).copied().unwrap_or(0.0),
    )
}

pub(crate) fn check_disp(u: &[f64], n: usize) -> FEAResult<()> {
    if u.len() < n {
        return Err(FEAError::InvalidInput(format!(
            "transformation needs {n} nodal displacements, got {}",
            u.len()
        )));
    }
    Ok(())
}

pub(crate) fn not_initialized() -> FEAError {
    FEAError::InvalidState("coordinate transformation used before initialize".to_string())
}

/// Basic-from-local compatibility matrix in 2D (3 x 6)
pub(crate) fn basic_from_local_2d(l: f64) -> DMatrix<f64> {
    let mut a = DMatrix::zeros(3, 6);
    a[(0, 0)] = -1.0;
    a[(0, 3)] = 1.0;
    for r in 1..3 {
        a[(r, 1)] = 1.0 / l;
        a[(r, 4)] = -1.0 / l;
    }
    a[(1, 2)] = 1.0;
    a[(2, 5)] = 1.0;
    a
}

/// Basic-from-local compatibility matrix in 3D (6 x 12)
pub(crate) fn basic_from_local_3d(l: f64) -> DMatrix<f64> {
    let mut a = DMatrix::zeros(6, 12);
    a[(0, 0)] = -1.0;
    a[(0, 6)] = 1.0;
    for r in 1..3 {
        a[(r, 1)] = 1.0 / l;
        a[(r, 7)] = -1.0 / l;
    }
    a[(1, 5)] = 1.0;
    a[(2, 11)] = 1.0;
    for r in 3..5 {
        a[(r, 2)] = -1.0 / l;
        a[(r, 8)] = 1.0 / l;
    }
    a[(3, 4)] = 1.0;
    a[(4, 10)] = 1.0;
    a[(5, 3)] = -1.0;
    a[(5, 9)] = 1.0;
    a
}

/// Block-diagonal local-from-global rotation with `blocks` copies of `r`
pub(crate) fn rotation_blocks(r: &Mat3, blocks: usize) -> DMatrix<f64> {
    let n = 3 * blocks;
    let mut t = DMatrix::zeros(n, n);
    for b in 0..blocks {
        t.view_mut((3 * b, 3 * b), (3, 3)).copy_from(r);
    }
    t
}

/// 2D local-from-global rotation for both nodes (6 x 6)
pub(crate) fn rotation_2d(c: f64, s: f64) -> DMatrix<f64> {
    let mut t = DMatrix::zeros(6, 6);
    for n in 0..2 {
        let o = 3 * n;
        t[(o, o)] = c;
        t[(o, o + 1)] = s;
        t[(o + 1, o)] = -s;
        t[(o + 1, o + 1)] = c;
        t[(o + 2, o + 2)] = 1.0;
    }
    t
}

/// Add fixed-end reactions to local end forces
pub(crate) fn add_p0_local(pl: &mut DVector<f64>, p0: &DVector<f64>) {
    if p0.is_empty() {
        return;
    }
    if pl.len() == 6 {
        pl[0] += p0[0];
        pl[1] += p0[1];
        pl[4] += p0[2];
    } else {
        pl[0] += p0[0];
        pl[1] += p0[1];
        pl[7] += p0[2];
        pl[2] += p0[3];
        pl[8] += p0[4];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_strong_axis_direction() {
        let mut t = CrdTransf::linear_3d(None);
        t.behavior_mut().initialize(&[0.0, 0.0, 0.0], &[4.0, 0.0, 0.0]).unwrap();
        let props = CrossSectionProperties::rectangular(0.1, 0.3);
        assert_relative_eq!(t.v_dir_strong_axis(&props), Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(t.v_dir_weak_axis(&props), Vec3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_point_from_basic_and_local() {
        let mut t = CrdTransf::linear_2d();
        t.behavior_mut().initialize(&[1.0, 1.0], &[1.0, 5.0]).unwrap();
        let b = t.behavior();
        assert_relative_eq!(b.point_global_from_basic(0.5), Vec3::new(1.0, 3.0, 0.0), epsilon = 1e-12);
        let p = b.point_global_from_local(&Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(p, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(b.vector_local_from_global(&Vec3::y()), Vec3::x(), epsilon = 1e-12);
        assert_eq!(b.basic_order(), 3);
    }
}
