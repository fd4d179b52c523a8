//! Single-point constraints and support conditions

use serde::{Deserialize, Serialize};

/// Prescribed value of one nodal dof
///
/// A constraint owned by a load pattern has its value scaled by the pattern
/// factor each time loads are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpConstraint {
    pub tag: usize,
    pub node: usize,
    pub dof: usize,
    value: f64,
    pub pattern: Option<usize>,
    #[serde(default = "unit")]
    factor: f64,
}

fn unit() -> f64 {
    1.0
}

impl SpConstraint {
    pub fn new(tag: usize, node: usize, dof: usize, value: f64) -> Self {
        Self {
            tag,
            node,
            dof,
            value,
            pattern: None,
            factor: 1.0,
        }
    }

    pub fn homogeneous(tag: usize, node: usize, dof: usize) -> Self {
        Self::new(tag, node, dof, 0.0)
    }

    /// Reference value before pattern scaling
    pub fn reference_value(&self) -> f64 {
        self.value
    }

    /// Value imposed at the current load level
    pub fn value(&self) -> f64 {
        self.value * self.factor
    }

    pub fn is_homogeneous(&self) -> bool {
        self.value == 0.0
    }

    pub(crate) fn set_factor(&mut self, factor: f64) {
        self.factor = factor;
    }
}

/// Support condition at a node, by global axis
///
/// Translations map to the first `ndm` nodal dofs and rotations to the
/// remaining ones: Z only for a planar frame node, X, Y, Z in space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixity {
    pub translations: [bool; 3],
    pub rotations: [bool; 3],
    /// Enforced values, translations then rotations
    pub enforced: [Option<f64>; 6],
}

impl Fixity {
    /// No restraints
    pub fn free() -> Self {
        Self::default()
    }

    /// All dofs restrained
    pub fn fixed() -> Self {
        Self {
            translations: [true; 3],
            rotations: [true; 3],
            ..Default::default()
        }
    }

    /// Translations restrained, rotations free
    pub fn pinned() -> Self {
        Self {
            translations: [true; 3],
            ..Default::default()
        }
    }

    /// Only the X translation restrained
    pub fn roller_x() -> Self {
        Self::translation(0)
    }

    /// Only the Y translation restrained
    pub fn roller_y() -> Self {
        Self::translation(1)
    }

    /// Only the Z translation restrained
    pub fn roller_z() -> Self {
        Self::translation(2)
    }

    fn translation(axis: usize) -> Self {
        let mut f = Self::default();
        f.translations[axis] = true;
        f
    }

    pub fn with_restraints(dx: bool, dy: bool, dz: bool, rx: bool, ry: bool, rz: bool) -> Self {
        Self {
            translations: [dx, dy, dz],
            rotations: [rx, ry, rz],
            ..Default::default()
        }
    }

    /// Restrain translation `axis` (0..3) to `value`
    pub fn with_enforced_translation(mut self, axis: usize, value: f64) -> Self {
        if axis < 3 {
            self.translations[axis] = true;
            self.enforced[axis] = Some(value);
        }
        self
    }

    /// Restrain rotation about `axis` (0..3) to `value`
    pub fn with_enforced_rotation(mut self, axis: usize, value: f64) -> Self {
        if axis < 3 {
            self.rotations[axis] = true;
            self.enforced[3 + axis] = Some(value);
        }
        self
    }

    /// Restrained (dof, value) pairs for a node with `ndm` coordinates and `ndf` dofs
    pub fn restrained_dofs(&self, ndm: usize, ndf: usize) -> Vec<(usize, f64)> {
        let mut dofs = Vec::new();
        for axis in 0..ndm.min(ndf).min(3) {
            if self.translations[axis] {
                dofs.push((axis, self.enforced[axis].unwrap_or(0.0)));
            }
        }
        let rotation_axes: &[usize] = match (ndm, ndf) {
            (2, 3) => &[2],
            (3, 6) => &[0, 1, 2],
            _ => &[],
        };
        for (k, axis) in rotation_axes.iter().enumerate() {
            if self.rotations[*axis] {
                dofs.push((ndm + k, self.enforced[3 + axis].unwrap_or(0.0)));
            }
        }
        dofs
    }

    pub fn is_supported(&self) -> bool {
        self.translations.iter().chain(&self.rotations).any(|r| *r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_planar_node() {
        let dofs = Fixity::fixed().restrained_dofs(2, 3);
        assert_eq!(dofs, vec![(0, 0.0), (1, 0.0), (2, 0.0)]);
    }

    #[test]
    fn test_pinned_space_node() {
        let dofs = Fixity::pinned().restrained_dofs(3, 6);
        assert_eq!(dofs.iter().map(|d| d.0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(Fixity::roller_z().restrained_dofs(2, 3).is_empty());
    }

    #[test]
    fn test_enforced_rotation() {
        let f = Fixity::roller_y().with_enforced_rotation(2, 0.01);
        assert_eq!(f.restrained_dofs(2, 3), vec![(1, 0.0), (2, 0.01)]);
        assert!(!Fixity::free().is_supported());
    }

    #[test]
    fn test_pattern_scaling() {
        let mut sp = SpConstraint::new(1, 3, 0, 0.02);
        sp.set_factor(0.5);
        assert_eq!(sp.value(), 0.01);
        assert!(!sp.is_homogeneous());
    }
}
