//! Ultimate-strain interaction diagrams for fiber sections
//!
//! Strain planes are swept between the pivot limits: the most compressed
//! fiber pinned at `eps_cu` or the most stretched fiber pinned at `eps_tu`.
//! Each plane is evaluated on a fresh copy of the section.

use log::warn;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::{DeformationPlane, FiberSection2d, FiberSection3d, SectionBehavior};
use crate::error::{FEAError, FEAResult};

/// Pivot strains; `eps_cu` is negative, `eps_tu` positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainLimits {
    pub eps_cu: f64,
    pub eps_tu: f64,
}

impl StrainLimits {
    pub fn new(eps_cu: f64, eps_tu: f64) -> FEAResult<Self> {
        if !(eps_cu < 0.0 && eps_tu > 0.0) {
            return Err(FEAError::InvalidInput(format!(
                "strain limits need eps_cu < 0 < eps_tu, got {eps_cu} and {eps_tu}"
            )));
        }
        Ok(Self { eps_cu, eps_tu })
    }
}

/// One point of an interaction surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InteractionPoint {
    pub n: f64,
    pub mz: f64,
    pub my: f64,
    pub plane: DeformationPlane,
}

/// Pivot planes for one neutral-axis direction; `s` spans [s_min, s_max]
/// with the compressed side at `s_max`
fn pivot_planes(limits: StrainLimits, s_min: f64, s_max: f64, steps: usize) -> Vec<(f64, f64)> {
    let steps = steps.max(1);
    let (cu, tu) = (limits.eps_cu, limits.eps_tu);
    let mut out = Vec::with_capacity(2 * steps + 1);
    let depth = (s_max - s_min).max(1e-12);
    // Returns (a, g) with ε(s) = a + g·s
    let plane = |top: f64, bot: f64| {
        let g = (top - bot) / depth;
        (bot - g * s_min, g)
    };
    for k in 0..=steps {
        let t = k as f64 / steps as f64;
        out.push(plane(tu + t * (cu - tu), tu));
    }
    for k in 1..=steps {
        let t = k as f64 / steps as f64;
        out.push(plane(cu, tu + t * (cu - tu)));
    }
    out
}

/// (N, Mz, My) surface over `n_angles` neutral-axis directions
pub fn interaction_diagram_3d(
    section: &FiberSection3d,
    limits: StrainLimits,
    n_angles: usize,
    steps: usize,
) -> FEAResult<Vec<InteractionPoint>> {
    let n_angles = n_angles.max(1);
    let mut points = Vec::new();
    let mut trial = section.clone();
    for i in 0..n_angles {
        let theta = 2.0 * std::f64::consts::PI * i as f64 / n_angles as f64;
        let (sin, cos) = theta.sin_cos();
        let (s_min, s_max) = section
            .fibers()
            .iter()
            .map(|f| f.y * cos + f.z * sin)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s), hi.max(s)));
        for (a, g) in pivot_planes(limits, s_min, s_max, steps) {
            let plane = DeformationPlane::new(a, -g * cos, g * sin);
            let mut e = vec![plane.eps0, plane.kappa_z, plane.kappa_y];
            if section.torsional_rigidity().is_some() {
                e.push(0.0);
            }
            trial.revert_to_start();
            if !trial.set_trial_deformation(&DVector::from_vec(e)).is_ok() {
                warn!("interaction plane {plane:?} rejected by a fiber material");
                continue;
            }
            let s = trial.stress_resultant();
            points.push(InteractionPoint {
                n: s[0],
                mz: s[1],
                my: s[2],
                plane,
            });
        }
    }
    Ok(points)
}

/// (N, M) curve of a planar section, both bending directions
pub fn interaction_diagram_2d(
    section: &FiberSection2d,
    limits: StrainLimits,
    steps: usize,
) -> FEAResult<Vec<InteractionPoint>> {
    let mut points = Vec::new();
    let mut trial = section.clone();
    for sign in [1.0, -1.0] {
        let (s_min, s_max) = section
            .fibers()
            .iter()
            .map(|f| sign * f.y)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| (lo.min(s), hi.max(s)));
        for (a, g) in pivot_planes(limits, s_min, s_max, steps) {
            let plane = DeformationPlane::new(a, -g * sign, 0.0);
            trial.revert_to_start();
            if !trial.set_trial_deformation(&plane.to_vector_2d()).is_ok() {
                warn!("interaction plane {plane:?} rejected by a fiber material");
                continue;
            }
            let s = trial.stress_resultant();
            points.push(InteractionPoint {
                n: s[0],
                mz: s[1],
                my: 0.0,
                plane,
            });
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::UniaxialMaterial;
    use crate::sections::geometry::rect_patch;
    use approx::assert_relative_eq;

    fn epp_rect_2d() -> FiberSection2d {
        let m = UniaxialMaterial::elastic_pp(200e9, 250e6);
        FiberSection2d::new(rect_patch(&m, 40, 1, (-0.1, -0.05), (0.1, 0.05))).unwrap()
    }

    #[test]
    fn test_2d_diagram_reaches_squash_and_plastic_moment() {
        let s = epp_rect_2d();
        let limits = StrainLimits::new(-0.05, 0.05).unwrap();
        let pts = interaction_diagram_2d(&s, limits, 20).unwrap();
        let area = 0.02;
        let n_max = pts.iter().map(|p| p.n).fold(f64::NEG_INFINITY, f64::max);
        let n_min = pts.iter().map(|p| p.n).fold(f64::INFINITY, f64::min);
        assert_relative_eq!(n_max, 250e6 * area, max_relative = 1e-9);
        assert_relative_eq!(n_min, -250e6 * area, max_relative = 1e-9);

        let m_max = pts.iter().map(|p| p.mz.abs()).fold(0.0, f64::max);
        let mp = 250e6 * 0.1 * 0.2 * 0.2 / 4.0;
        assert!(m_max <= mp * 1.0001 && m_max > 0.97 * mp);
    }

    #[test]
    fn test_3d_diagram_is_symmetric_for_symmetric_section() {
        let m = UniaxialMaterial::elastic_pp(200e9, 250e6);
        let s = FiberSection3d::new(rect_patch(&m, 10, 10, (-0.1, -0.1), (0.1, 0.1))).unwrap();
        let limits = StrainLimits::new(-0.01, 0.01).unwrap();
        let pts = interaction_diagram_3d(&s, limits, 4, 10).unwrap();
        let mz_max = pts.iter().map(|p| p.mz).fold(f64::NEG_INFINITY, f64::max);
        let my_max = pts.iter().map(|p| p.my).fold(f64::NEG_INFINITY, f64::max);
        assert_relative_eq!(mz_max, my_max, max_relative = 1e-9);
    }

    #[test]
    fn test_bad_limits_rejected() {
        assert!(StrainLimits::new(0.01, 0.01).is_err());
    }
}
