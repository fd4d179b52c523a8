//! Cross sections: generalized deformation to stress resultant maps
//!
//! A section reports which resultants it carries through its
//! [`ResponseCode`]s; elements map their basic forces onto those codes, so
//! sections of different order plug into the same element.

pub mod aggregator;
pub mod elastic;
pub mod fiber;
pub mod geometry;
pub mod interaction;
pub mod plane;
pub mod properties;
pub mod shell;

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult, TrialStatus};

pub use aggregator::SectionAggregator;
pub use elastic::{ElasticSection2d, ElasticSection3d};
pub use fiber::{Fiber, FiberSection2d, FiberSection3d};
pub use interaction::{InteractionPoint, StrainLimits};
pub use plane::DeformationPlane;
pub use properties::{CrossSectionProperties, SectionAxis};
pub use shell::{ElasticMembranePlateSection, ShellStrain};

/// Stress resultant carried by a section, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResponseCode {
    /// Axial force
    P,
    /// Bending moment about local z
    Mz,
    /// Bending moment about local y
    My,
    /// Torsion
    T,
    /// Shear along local y
    Vy,
    /// Shear along local z
    Vz,
}

/// Common interface of frame sections
pub trait SectionBehavior {
    fn class_name(&self) -> &'static str;

    fn codes(&self) -> Vec<ResponseCode>;

    fn order(&self) -> usize {
        self.codes().len()
    }

    fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus;

    fn deformation(&self) -> DVector<f64>;
    fn stress_resultant(&self) -> DVector<f64>;
    fn tangent(&self) -> DMatrix<f64>;
    fn initial_tangent(&self) -> DMatrix<f64>;

    fn commit_state(&mut self);
    fn revert_to_last_commit(&mut self);
    fn revert_to_start(&mut self);

    fn area(&self) -> f64;

    /// Mass per unit length
    fn linear_density(&self) -> f64 {
        0.0
    }
}

/// Closed set of frame sections
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Section {
    Elastic2d(ElasticSection2d),
    Elastic3d(ElasticSection3d),
    Fiber2d(FiberSection2d),
    Fiber3d(FiberSection3d),
    Aggregator(SectionAggregator),
}

impl Section {
    fn behavior(&self) -> &dyn SectionBehavior {
        match self {
            Section::Elastic2d(s) => s,
            Section::Elastic3d(s) => s,
            Section::Fiber2d(s) => s,
            Section::Fiber3d(s) => s,
            Section::Aggregator(s) => s,
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn SectionBehavior {
        match self {
            Section::Elastic2d(s) => s,
            Section::Elastic3d(s) => s,
            Section::Fiber2d(s) => s,
            Section::Fiber3d(s) => s,
            Section::Aggregator(s) => s,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.behavior().class_name()
    }

    pub fn codes(&self) -> Vec<ResponseCode> {
        self.behavior().codes()
    }

    pub fn order(&self) -> usize {
        self.behavior().order()
    }

    /// Position of a response code, if the section carries it
    pub fn code_index(&self, code: ResponseCode) -> Option<usize> {
        self.codes().iter().position(|c| *c == code)
    }

    pub fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus {
        if deformation.len() != self.order() || deformation.iter().any(|v| !v.is_finite()) {
            self.revert_to_last_commit();
            return TrialStatus::Failed;
        }
        self.behavior_mut().set_trial_deformation(deformation)
    }

    pub fn deformation(&self) -> DVector<f64> {
        self.behavior().deformation()
    }

    pub fn stress_resultant(&self) -> DVector<f64> {
        self.behavior().stress_resultant()
    }

    pub fn tangent(&self) -> DMatrix<f64> {
        self.behavior().tangent()
    }

    pub fn initial_tangent(&self) -> DMatrix<f64> {
        self.behavior().initial_tangent()
    }

    /// Inverse of the tangent
    pub fn flexibility(&self) -> FEAResult<DMatrix<f64>> {
        let k = self.tangent();
        k.try_inverse().ok_or(FEAError::SingularMatrix)
    }

    pub fn initial_flexibility(&self) -> FEAResult<DMatrix<f64>> {
        self.initial_tangent().try_inverse().ok_or(FEAError::SingularMatrix)
    }

    pub fn commit_state(&mut self) {
        self.behavior_mut().commit_state()
    }

    pub fn revert_to_last_commit(&mut self) {
        self.behavior_mut().revert_to_last_commit()
    }

    pub fn revert_to_start(&mut self) {
        self.behavior_mut().revert_to_start()
    }

    pub fn area(&self) -> f64 {
        self.behavior().area()
    }

    pub fn linear_density(&self) -> f64 {
        self.behavior().linear_density()
    }

    /// True for sections carrying My (three-dimensional frames)
    pub fn is_3d(&self) -> bool {
        self.code_index(ResponseCode::My).is_some()
    }
}

impl From<ElasticSection2d> for Section {
    fn from(s: ElasticSection2d) -> Self {
        Section::Elastic2d(s)
    }
}

impl From<ElasticSection3d> for Section {
    fn from(s: ElasticSection3d) -> Self {
        Section::Elastic3d(s)
    }
}

impl From<FiberSection2d> for Section {
    fn from(s: FiberSection2d) -> Self {
        Section::Fiber2d(s)
    }
}

impl From<FiberSection3d> for Section {
    fn from(s: FiberSection3d) -> Self {
        Section::Fiber3d(s)
    }
}

impl From<SectionAggregator> for Section {
    fn from(s: SectionAggregator) -> Self {
        Section::Aggregator(s)
    }
}

/// Registry of named section prototypes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionHandler {
    sections: BTreeMap<String, Section>,
}

impl SectionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, section: impl Into<Section>) -> FEAResult<()> {
        let name = name.into();
        if self.sections.contains_key(&name) {
            return Err(FEAError::DuplicateName(name));
        }
        self.sections.insert(name, section.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> FEAResult<&Section> {
        self.sections
            .get(name)
            .ok_or_else(|| FEAError::SectionNotFound(name.to_string()))
    }

    /// Independent copy in its initial state, one per integration point
    pub fn instantiate(&self, name: &str) -> FEAResult<Section> {
        let mut s = self.get(name)?.clone();
        s.revert_to_start();
        Ok(s)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrong_order_deformation_fails() {
        let mut s: Section = ElasticSection2d::new(200e9, 0.01, 1e-4).into();
        let bad = DVector::from_vec(vec![1e-3, 0.0, 0.0]);
        assert!(!s.set_trial_deformation(&bad).is_ok());
        assert_relative_eq!(s.stress_resultant().norm(), 0.0);
    }

    #[test]
    fn test_handler_instantiates_fresh_sections() {
        let mut h = SectionHandler::new();
        h.add("beam", ElasticSection2d::new(200e9, 0.01, 1e-4)).unwrap();
        assert!(h.add("beam", ElasticSection2d::new(1.0, 1.0, 1.0)).is_err());
        let s = h.instantiate("beam").unwrap();
        assert_eq!(s.codes(), vec![ResponseCode::P, ResponseCode::Mz]);
        assert!(matches!(h.get("col"), Err(FEAError::SectionNotFound(_))));
    }

    #[test]
    fn test_flexibility_inverts_tangent() {
        let s: Section = ElasticSection2d::new(200e9, 0.01, 1e-4).into();
        let f = s.flexibility().unwrap();
        assert_relative_eq!(f[(0, 0)], 1.0 / (200e9 * 0.01), max_relative = 1e-12);
        assert_relative_eq!(f[(1, 1)], 1.0 / (200e9 * 1e-4), max_relative = 1e-12);
    }
}
