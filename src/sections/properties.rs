//! Elastic cross-section properties for frame elements
//!
//! Local axes follow the element frame: `iz` governs bending in the x-y plane
//! (strain varies with y), `iy` bending in the x-z plane.

use serde::{Deserialize, Serialize};

/// Principal bending axis of a cross section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionAxis {
    Y,
    Z,
}

/// Cross-section and material properties of an elastic frame member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSectionProperties {
    /// Young's modulus
    pub e: f64,
    /// Shear modulus
    pub g: f64,
    /// Area
    pub a: f64,
    /// Second moment of area about local z
    pub iz: f64,
    /// Second moment of area about local y
    pub iy: f64,
    /// Torsional constant
    pub j: f64,
    /// Shear area factor along local y (0 = shear rigid)
    pub alpha_y: f64,
    /// Shear area factor along local z (0 = shear rigid)
    pub alpha_z: f64,
    /// Mass density (mass per unit volume)
    pub rho: f64,
}

impl CrossSectionProperties {
    pub fn new(e: f64, g: f64, a: f64, iz: f64, iy: f64, j: f64) -> Self {
        Self {
            e,
            g,
            a,
            iz,
            iy,
            j,
            alpha_y: 0.0,
            alpha_z: 0.0,
            rho: 0.0,
        }
    }

    /// Geometry only; material set with [`Self::with_material`]
    fn geometric(a: f64, iz: f64, iy: f64, j: f64) -> Self {
        Self::new(0.0, 0.0, a, iz, iy, j)
    }

    pub fn with_material(mut self, e: f64, g: f64, rho: f64) -> Self {
        self.e = e;
        self.g = g;
        self.rho = rho;
        self
    }

    pub fn with_shear_factors(mut self, alpha_y: f64, alpha_z: f64) -> Self {
        self.alpha_y = alpha_y;
        self.alpha_z = alpha_z;
        self
    }

    /// Rectangle of `width` along local z and `depth` along local y
    pub fn rectangular(width: f64, depth: f64) -> Self {
        let a = width * depth;
        let iz = width * depth.powi(3) / 12.0;
        let iy = depth * width.powi(3) / 12.0;
        let (long, short) = if width > depth { (width, depth) } else { (depth, width) };
        let j = long * short.powi(3) / 3.0 * (1.0 - 0.63 * short / long);
        Self::geometric(a, iz, iy, j).with_shear_factors(5.0 / 6.0, 5.0 / 6.0)
    }

    pub fn circular(diameter: f64) -> Self {
        let r = diameter / 2.0;
        let a = std::f64::consts::PI * r.powi(2);
        let i = std::f64::consts::PI * r.powi(4) / 4.0;
        Self::geometric(a, i, i, 2.0 * i).with_shear_factors(0.9, 0.9)
    }

    pub fn pipe(outer_diameter: f64, wall_thickness: f64) -> Self {
        let r_o = outer_diameter / 2.0;
        let r_i = r_o - wall_thickness;
        let a = std::f64::consts::PI * (r_o.powi(2) - r_i.powi(2));
        let i = std::f64::consts::PI * (r_o.powi(4) - r_i.powi(4)) / 4.0;
        Self::geometric(a, i, i, 2.0 * i).with_shear_factors(0.5, 0.5)
    }

    /// Doubly symmetric I shape with the web along local y
    pub fn i_shape(depth: f64, flange_width: f64, flange_thickness: f64, web_thickness: f64) -> Self {
        let (d, bf, tf, tw) = (depth, flange_width, flange_thickness, web_thickness);
        let hw = d - 2.0 * tf;
        let a = 2.0 * bf * tf + hw * tw;
        let iz = (bf * d.powi(3) - (bf - tw) * hw.powi(3)) / 12.0;
        let iy = (2.0 * tf * bf.powi(3) + hw * tw.powi(3)) / 12.0;
        let j = (2.0 * bf * tf.powi(3) + hw * tw.powi(3)) / 3.0;
        let web_share = hw * tw / a;
        Self::geometric(a, iz, iy, j).with_shear_factors(web_share, 1.0 - web_share)
    }

    /// Closed box with uniform wall thickness
    pub fn box_section(width: f64, depth: f64, wall_thickness: f64) -> Self {
        let t = wall_thickness;
        let (b, d) = (width, depth);
        let (bi, di) = (b - 2.0 * t, d - 2.0 * t);
        let a = b * d - bi * di;
        let iz = (b * d.powi(3) - bi * di.powi(3)) / 12.0;
        let iy = (d * b.powi(3) - di * bi.powi(3)) / 12.0;
        let enclosed = (b - t) * (d - t);
        let perimeter = 2.0 * (b + d) - 4.0 * t;
        let j = 4.0 * enclosed.powi(2) * t / perimeter;
        Self::geometric(a, iz, iy, j).with_shear_factors(d / (b + d), b / (b + d))
    }

    pub fn radius_of_gyration_y(&self) -> f64 {
        (self.iy / self.a).sqrt()
    }

    pub fn radius_of_gyration_z(&self) -> f64 {
        (self.iz / self.a).sqrt()
    }

    pub fn polar_inertia(&self) -> f64 {
        self.iy + self.iz
    }

    /// Axis with the larger bending inertia; equal inertias report `Y`
    pub fn strong_axis(&self) -> SectionAxis {
        if self.iz > self.iy {
            SectionAxis::Z
        } else {
            SectionAxis::Y
        }
    }

    /// Same section turned a quarter turn about the member axis
    pub fn rotated_90(&self) -> Self {
        let mut p = self.clone();
        std::mem::swap(&mut p.iy, &mut p.iz);
        std::mem::swap(&mut p.alpha_y, &mut p.alpha_z);
        p
    }

    /// Mass per unit length
    pub fn linear_density(&self) -> f64 {
        self.rho * self.a
    }

    /// Effective shear area along local y, if shear deformable
    pub fn shear_area_y(&self) -> Option<f64> {
        (self.alpha_y > 0.0).then(|| self.alpha_y * self.a)
    }

    pub fn shear_area_z(&self) -> Option<f64> {
        (self.alpha_z > 0.0).then(|| self.alpha_z * self.a)
    }
}

impl Default for CrossSectionProperties {
    fn default() -> Self {
        Self::rectangular(0.2, 0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangular_section() {
        let p = CrossSectionProperties::rectangular(0.3, 0.5);
        assert_relative_eq!(p.a, 0.15);
        assert_relative_eq!(p.iz, 0.3 * 0.5_f64.powi(3) / 12.0);
        assert_eq!(p.strong_axis(), SectionAxis::Z);
        assert_eq!(p.rotated_90().strong_axis(), SectionAxis::Y);
    }

    #[test]
    fn test_circular_section_ties_to_y() {
        let p = CrossSectionProperties::circular(0.5);
        assert_relative_eq!(p.iy, p.iz);
        assert_eq!(p.strong_axis(), SectionAxis::Y);
        assert_relative_eq!(p.polar_inertia(), p.j, max_relative = 1e-12);
    }

    #[test]
    fn test_ipe200_like_shape() {
        let p = CrossSectionProperties::i_shape(0.2, 0.1, 0.0085, 0.0056);
        // Tabulated IPE200 values include the root radius
        assert_relative_eq!(p.a, 28.48e-4, max_relative = 0.08);
        assert_relative_eq!(p.iz, 1943e-8, max_relative = 0.08);
        assert!(p.radius_of_gyration_z() > p.radius_of_gyration_y());
    }
}
