//! Plane-section deformation states

use nalgebra::{DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

/// Linear strain field over a cross section: ε(y, z) = ε₀ − y·κz + z·κy
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeformationPlane {
    pub eps0: f64,
    pub kappa_z: f64,
    pub kappa_y: f64,
}

impl DeformationPlane {
    pub fn new(eps0: f64, kappa_z: f64, kappa_y: f64) -> Self {
        Self {
            eps0,
            kappa_z,
            kappa_y,
        }
    }

    /// Uniform axial strain
    pub fn axial(eps0: f64) -> Self {
        Self::new(eps0, 0.0, 0.0)
    }

    pub fn strain(&self, y: f64, z: f64) -> f64 {
        self.eps0 - y * self.kappa_z + z * self.kappa_y
    }

    /// Plane through three (y, z, strain) points
    pub fn from_three_points(points: [(f64, f64, f64); 3]) -> FEAResult<Self> {
        let a = Matrix3::from_fn(|r, c| match c {
            0 => 1.0,
            1 => -points[r].0,
            _ => points[r].1,
        });
        let b = Vector3::new(points[0].2, points[1].2, points[2].2);
        let x = a.lu().solve(&b).ok_or_else(|| {
            FEAError::InvalidGeometry("deformation plane points are collinear".to_string())
        })?;
        Ok(Self::new(x[0], x[1], x[2]))
    }

    /// True when the point lies on the neutral axis within `tol`
    pub fn is_zero_strain(&self, y: f64, z: f64, tol: f64) -> bool {
        self.strain(y, z).abs() <= tol
    }

    /// Two points on the neutral axis, if the plane is curved
    pub fn neutral_axis(&self) -> Option<((f64, f64), (f64, f64))> {
        let (gy, gz) = (-self.kappa_z, self.kappa_y);
        let g2 = gy * gy + gz * gz;
        if g2 < 1e-30 {
            return None;
        }
        // Foot of the perpendicular from the origin, then one step along the axis
        let p = (-self.eps0 * gy / g2, -self.eps0 * gz / g2);
        Some((p, (p.0 - gz, p.1 + gy)))
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.eps0 * factor, self.kappa_z * factor, self.kappa_y * factor)
    }

    /// Linear interpolation between two planes
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self::new(
            self.eps0 + t * (other.eps0 - self.eps0),
            self.kappa_z + t * (other.kappa_z - self.kappa_z),
            self.kappa_y + t * (other.kappa_y - self.kappa_y),
        )
    }

    /// Section deformation vector (ε₀, κz) for planar sections
    pub fn to_vector_2d(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.eps0, self.kappa_z])
    }

    /// Section deformation vector (ε₀, κz, κy)
    pub fn to_vector_3d(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.eps0, self.kappa_z, self.kappa_y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_strain_sign_convention() {
        let p = DeformationPlane::new(0.0, 1.0, 0.0);
        // Positive κz compresses the +y side
        assert!(p.strain(0.1, 0.0) < 0.0);
        let p = DeformationPlane::new(0.0, 0.0, 1.0);
        assert!(p.strain(0.0, 0.1) > 0.0);
    }

    #[test]
    fn test_from_three_points_recovers_plane() {
        let plane = DeformationPlane::new(1e-3, 2e-3, -5e-4);
        let pts = [(0.1, 0.0), (-0.1, 0.2), (0.05, -0.3)].map(|(y, z)| (y, z, plane.strain(y, z)));
        let back = DeformationPlane::from_three_points(pts).unwrap();
        assert_relative_eq!(back.eps0, plane.eps0, epsilon = 1e-15);
        assert_relative_eq!(back.kappa_z, plane.kappa_z, epsilon = 1e-14);
        assert_relative_eq!(back.kappa_y, plane.kappa_y, epsilon = 1e-14);
    }

    #[test]
    fn test_collinear_points_rejected() {
        let pts = [(0.0, 0.0, 0.0), (1.0, 1.0, 1.0), (2.0, 2.0, 2.0)];
        assert!(DeformationPlane::from_three_points(pts).is_err());
    }

    #[test]
    fn test_neutral_axis_points_have_zero_strain() {
        let p = DeformationPlane::new(1e-3, 4e-3, 2e-3);
        let (a, b) = p.neutral_axis().unwrap();
        assert!(p.is_zero_strain(a.0, a.1, 1e-15));
        assert!(p.is_zero_strain(b.0, b.1, 1e-15));
        assert!(DeformationPlane::axial(1e-3).neutral_axis().is_none());
    }
}
