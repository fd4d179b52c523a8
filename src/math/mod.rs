//! Mathematical utilities shared by elements, sections and solvers

pub mod band;
pub mod quadrature;
pub mod sparse;

use nalgebra::{Matrix3, Vector3};

use crate::error::{FEAError, FEAResult};

// Re-export solver building blocks
pub use band::{BandMatrix, BandSymMatrix};
pub use quadrature::{gauss_legendre, gauss_lobatto};
pub use sparse::{reverse_cuthill_mckee, SparseLu, SparseMatrixBuilder};

pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// Default local axes for a 3D frame element when no orientation vector is given
///
/// Vertical members get local y in the global XY plane (y = -X when pointing
/// up) and local z = global Z. Every other member gets local y as the part of
/// global Y orthogonal to the member axis, so horizontal members have y = Y.
///
/// # Arguments
/// * `i_node` - Start node coordinates [X, Y, Z]
/// * `j_node` - End node coordinates [X, Y, Z]
/// * `rotation` - Member rotation about its longitudinal axis (radians)
///
/// # Returns
/// Rotation matrix whose rows are the local x, y and z axes
pub fn default_local_axes(i_node: &Vec3, j_node: &Vec3, rotation: f64) -> FEAResult<Mat3> {
    let d = j_node - i_node;
    let length = d.norm();
    if length < 1e-10 {
        return Err(FEAError::InvalidGeometry(
            "member has zero length".to_string(),
        ));
    }
    let x = d / length;

    let (y, z) = if x[0].abs() < 1e-10 && x[2].abs() < 1e-10 {
        if x[1] > 0.0 {
            (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0))
        } else {
            (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0))
        }
    } else {
        let up = Vec3::new(0.0, 1.0, 0.0);
        let y = (up - x * x.dot(&up)).normalize();
        (y, x.cross(&y))
    };

    // Rotate about the member axis
    let (y, z) = if rotation.abs() > 1e-10 {
        let (s, c) = rotation.sin_cos();
        (y * c + z * s, -y * s + z * c)
    } else {
        (y, z)
    };

    Ok(Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
}

/// Local axes from an element axis and a vector lying in the local x-z plane
pub fn local_axes_from_vecxz(i_node: &Vec3, j_node: &Vec3, vec_xz: &Vec3) -> FEAResult<Mat3> {
    let d = j_node - i_node;
    let length = d.norm();
    if length < 1e-10 {
        return Err(FEAError::InvalidGeometry(
            "member has zero length".to_string(),
        ));
    }
    let x = d / length;
    let y = vec_xz.cross(&x);
    let ny = y.norm();
    if ny < 1e-10 {
        return Err(FEAError::InvalidGeometry(
            "orientation vector is parallel to the member axis".to_string(),
        ));
    }
    let y = y / ny;
    let z = x.cross(&y);
    Ok(Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
}

/// Skew-symmetric (cross product) matrix of a vector
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v[2], v[1], v[2], 0.0, -v[0], -v[1], v[0], 0.0)
}

/// Rotation matrix for a rotation pseudo-vector (Rodrigues formula)
pub fn rotation_from_vector(theta: &Vec3) -> Mat3 {
    let angle = theta.norm();
    if angle < 1e-14 {
        return Mat3::identity() + skew(theta);
    }
    let k = skew(&(theta / angle));
    Mat3::identity() + k * angle.sin() + k * k * (1.0 - angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_axes_horizontal() {
        let r = default_local_axes(&Vec3::zeros(), &Vec3::new(10.0, 0.0, 0.0), 0.0).unwrap();

        // local x = X, local y = Y, local z = Z
        assert_relative_eq!(r[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[(2, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_default_axes_vertical() {
        let r = default_local_axes(&Vec3::zeros(), &Vec3::new(0.0, 10.0, 0.0), 0.0).unwrap();

        assert_relative_eq!(r[(0, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(r[(1, 0)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(r[(2, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_is_error() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(default_local_axes(&p, &p, 0.0).is_err());
    }

    #[test]
    fn test_vecxz_axes_are_orthonormal() {
        let r = local_axes_from_vecxz(
            &Vec3::zeros(),
            &Vec3::new(1.0, 1.0, 0.0),
            &Vec3::new(0.0, 0.0, 1.0),
        )
        .unwrap();
        let rrt = r * r.transpose();
        assert_relative_eq!(rrt, Mat3::identity(), epsilon = 1e-12);
        // local z stays in the x-z plane of the reference vector
        assert_relative_eq!(r[(2, 2)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_vector_quarter_turn() {
        let r = rotation_from_vector(&Vec3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
        let x = r * Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(x, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }
}
