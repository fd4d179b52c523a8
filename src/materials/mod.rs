//! Uniaxial constitutive models
//!
//! Every material follows the same trial/commit lifecycle: `set_trial_strain`
//! may be called any number of times per step and is idempotent for the same
//! argument, only `commit_state` advances history, and the two revert calls
//! discard trial (or all) state.

pub mod cable;
pub mod concrete;
pub mod elastic;
pub mod steel;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult, TrialStatus};

pub use cable::Cable;
pub use concrete::{Concrete01, Concrete02};
pub use elastic::{Elastic, ElasticPP};
pub use steel::{IsotropicHardening, Steel01, Steel02};

/// Stress-strain behavior of a single fiber
pub trait UniaxialBehavior: Send + Sync + fmt::Debug {
    fn class_name(&self) -> &'static str;

    /// Set the trial strain and strain rate and compute the trial response
    fn set_trial_strain(&mut self, strain: f64, rate: f64) -> TrialStatus;

    fn strain(&self) -> f64;
    fn stress(&self) -> f64;
    fn tangent(&self) -> f64;
    fn initial_tangent(&self) -> f64;

    /// Derivative of stress with respect to strain rate
    fn damping_tangent(&self) -> f64 {
        0.0
    }

    fn commit_state(&mut self);
    fn revert_to_last_commit(&mut self);
    fn revert_to_start(&mut self);

    fn box_clone(&self) -> Box<dyn UniaxialBehavior>;
}

impl Clone for Box<dyn UniaxialBehavior> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Closed set of built-in materials plus a non-serializable extension slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UniaxialMaterial {
    Elastic(Elastic),
    ElasticPP(ElasticPP),
    Steel01(Steel01),
    Steel02(Steel02),
    Cable(Cable),
    Concrete01(Concrete01),
    Concrete02(Concrete02),
    #[serde(skip)]
    Custom(Box<dyn UniaxialBehavior>),
}

impl UniaxialMaterial {
    pub fn elastic(e: f64) -> Self {
        Self::Elastic(Elastic::new(e))
    }

    pub fn elastic_pp(e: f64, fy: f64) -> Self {
        Self::ElasticPP(ElasticPP::new(e, fy))
    }

    pub fn steel01(fy: f64, e0: f64, b: f64) -> Self {
        Self::Steel01(Steel01::new(fy, e0, b))
    }

    pub fn steel02(fy: f64, e0: f64, b: f64) -> Self {
        Self::Steel02(Steel02::new(fy, e0, b))
    }

    pub fn cable(e: f64, prestress: f64) -> Self {
        Self::Cable(Cable::new(e, prestress))
    }

    pub fn custom(behavior: Box<dyn UniaxialBehavior>) -> Self {
        Self::Custom(behavior)
    }

    fn behavior(&self) -> &dyn UniaxialBehavior {
        match self {
            Self::Elastic(m) => m,
            Self::ElasticPP(m) => m,
            Self::Steel01(m) => m,
            Self::Steel02(m) => m,
            Self::Cable(m) => m,
            Self::Concrete01(m) => m,
            Self::Concrete02(m) => m,
            Self::Custom(m) => m.as_ref(),
        }
    }

    fn behavior_mut(&mut self) -> &mut dyn UniaxialBehavior {
        match self {
            Self::Elastic(m) => m,
            Self::ElasticPP(m) => m,
            Self::Steel01(m) => m,
            Self::Steel02(m) => m,
            Self::Cable(m) => m,
            Self::Concrete01(m) => m,
            Self::Concrete02(m) => m,
            Self::Custom(m) => m.as_mut(),
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.behavior().class_name()
    }

    /// Set the trial strain
    ///
    /// A non-finite strain, or a model that produces a non-finite response,
    /// reverts the material to its last committed state and reports failure.
    pub fn set_trial_strain(&mut self, strain: f64, rate: f64) -> TrialStatus {
        if !strain.is_finite() || !rate.is_finite() {
            self.revert_to_last_commit();
            return TrialStatus::Failed;
        }
        let status = self.behavior_mut().set_trial_strain(strain, rate);
        if !self.stress().is_finite() || !self.tangent().is_finite() {
            warn!("{} produced a non-finite response at strain {strain:e}", self.class_name());
            self.revert_to_last_commit();
            return TrialStatus::Failed;
        }
        status
    }

    pub fn strain(&self) -> f64 {
        self.behavior().strain()
    }

    pub fn stress(&self) -> f64 {
        self.behavior().stress()
    }

    pub fn tangent(&self) -> f64 {
        self.behavior().tangent()
    }

    pub fn initial_tangent(&self) -> f64 {
        self.behavior().initial_tangent()
    }

    pub fn damping_tangent(&self) -> f64 {
        self.behavior().damping_tangent()
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
}

/// Registry of named material prototypes
///
/// Fibers never share a prototype: `instantiate` hands out an independent
/// copy in its virgin state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaterialHandler {
    materials: BTreeMap<String, UniaxialMaterial>,
}

impl MaterialHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, material: UniaxialMaterial) -> FEAResult<()> {
        let name = name.into();
        if self.materials.contains_key(&name) {
            return Err(FEAError::DuplicateName(name));
        }
        self.materials.insert(name, material);
        Ok(())
    }

    pub fn get(&self, name: &str) -> FEAResult<&UniaxialMaterial> {
        self.materials
            .get(name)
            .ok_or_else(|| FEAError::MaterialNotFound(name.to_string()))
    }

    /// Fresh copy of a prototype for a new fiber
    pub fn instantiate(&self, name: &str) -> FEAResult<UniaxialMaterial> {
        let mut m = self.get(name)?.clone();
        m.revert_to_start();
        Ok(m)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn clear(&mut self) {
        self.materials.clear();
    }
}

/// Constructor for a user-defined material from a flat parameter list
pub type MaterialConstructor =
    Box<dyn Fn(&[f64]) -> FEAResult<Box<dyn UniaxialBehavior>> + Send + Sync>;

/// Maps user class names to constructors for `UniaxialMaterial::Custom`
#[derive(Default)]
pub struct MaterialFactory {
    constructors: HashMap<String, MaterialConstructor>,
}

impl fmt::Debug for MaterialFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("MaterialFactory")
            .field("classes", &names)
            .finish()
    }
}

impl MaterialFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, class_name: impl Into<String>, constructor: F) -> FEAResult<()>
    where
        F: Fn(&[f64]) -> FEAResult<Box<dyn UniaxialBehavior>> + Send + Sync + 'static,
    {
        let class_name = class_name.into();
        if self.constructors.contains_key(&class_name) {
            return Err(FEAError::DuplicateName(class_name));
        }
        self.constructors.insert(class_name, Box::new(constructor));
        Ok(())
    }

    pub fn create(&self, class_name: &str, params: &[f64]) -> FEAResult<UniaxialMaterial> {
        let ctor = self
            .constructors
            .get(class_name)
            .ok_or_else(|| FEAError::MaterialNotFound(class_name.to_string()))?;
        Ok(UniaxialMaterial::Custom(ctor(params)?))
    }

    pub fn is_registered(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_non_finite_strain_keeps_committed_state() {
        let mut m = UniaxialMaterial::steel01(250e6, 200e9, 0.01);
        assert!(m.set_trial_strain(0.0005, 0.0).is_ok());
        m.commit_state();
        let committed = m.stress();

        assert!(!m.set_trial_strain(f64::NAN, 0.0).is_ok());
        assert_relative_eq!(m.stress(), committed);
        assert_relative_eq!(m.tangent(), 200e9);
    }

    #[test]
    fn test_handler_rejects_duplicate_names() {
        let mut h = MaterialHandler::new();
        h.add("steel", UniaxialMaterial::elastic(200e9)).unwrap();
        let err = h.add("steel", UniaxialMaterial::elastic(210e9)).unwrap_err();
        assert!(matches!(err, FEAError::DuplicateName(_)));
        assert!(matches!(h.get("concrete"), Err(FEAError::MaterialNotFound(_))));
    }

    #[test]
    fn test_instantiate_returns_independent_copies() {
        let mut h = MaterialHandler::new();
        h.add("s", UniaxialMaterial::elastic_pp(1000.0, 1.0)).unwrap();
        let mut a = h.instantiate("s").unwrap();
        let b = h.instantiate("s").unwrap();
        let _ = a.set_trial_strain(0.01, 0.0);
        a.commit_state();
        assert_relative_eq!(a.stress(), 1.0);
        assert_relative_eq!(b.stress(), 0.0);
    }

    #[test]
    fn test_serde_tag_round_trip_preserves_kind() {
        let m = UniaxialMaterial::steel02(355e6, 210e9, 0.005);
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"type\":\"Steel02\""));
        let back: UniaxialMaterial = serde_json::from_str(&json).unwrap();
        assert_eq!(back.class_name(), "Steel02");
    }

    #[test]
    fn test_factory_builds_custom_material() {
        let mut f = MaterialFactory::new();
        f.register("Linear", |p: &[f64]| {
            let e = *p
                .first()
                .ok_or_else(|| FEAError::InvalidInput("missing E".to_string()))?;
            Ok(Box::new(Elastic::new(e)) as Box<dyn UniaxialBehavior>)
        })
        .unwrap();
        let mut m = f.create("Linear", &[5.0]).unwrap();
        let _ = m.set_trial_strain(2.0, 0.0);
        assert_relative_eq!(m.stress(), 10.0);
        assert!(f.create("Linear", &[]).is_err());
        assert!(serde_json::to_string(&m).is_err());
    }
}
