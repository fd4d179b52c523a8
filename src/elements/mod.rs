//! Finite elements
//!
//! Every element kind implements [`ElementBehavior`]; the [`Element`] enum
//! is the closed set the domain stores. Element vectors list the dofs of
//! each node in turn, in the node order given at construction.

mod beam;
mod force_beam;
mod node;
mod shell_mitc4;
mod truss;
mod zero_length;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::domain::Rayleigh;
use crate::error::{FEAError, FEAResult};
use crate::loads::ElementLoad;
use crate::math::Vec3;

pub use beam::{ElasticBeam2d, ElasticBeam3d};
pub use force_beam::{BeamIntegration, ForceBeamColumn2d, ForceBeamColumn3d};
pub use node::Node;
pub use shell_mitc4::ShellMitc4;
pub use truss::{CorotTruss, Truss};
pub use zero_length::{ZeroLength, ZeroLengthSection};

/// Mass matrix formulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassType {
    #[default]
    Lumped,
    Consistent,
}

/// Quantities an element can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementResponse {
    /// Resisting force in global coordinates, including element loads
    GlobalForce,
    /// Forces in the element basic system
    BasicForce,
    /// Deformations in the element basic system
    BasicDeformation,
    /// Stress resultant of section / integration point `i`
    SectionForce(usize),
    /// Generalized deformation of section / integration point `i`
    SectionDeformation(usize),
    /// Integration point locations (relative abscissae for beams)
    IntegrationPoints,
    /// Material stresses (trusses, zero-length springs) or shell resultants
    Stresses,
}

/// Behavior shared by all element kinds
pub trait ElementBehavior {
    fn tag(&self) -> usize;
    fn class_name(&self) -> &'static str;
    fn node_tags(&self) -> &[usize];

    /// Size of the element force vector
    fn num_dof(&self) -> usize;

    /// Fix the reference geometry; `nodes` follow `node_tags()`
    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()>;

    fn is_initialized(&self) -> bool;

    /// State determination from the trial nodal response
    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()>;

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>>;
    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>>;

    fn mass(&self) -> FEAResult<DMatrix<f64>> {
        Ok(DMatrix::zeros(self.num_dof(), self.num_dof()))
    }

    /// Damping contributed by rate-dependent materials
    fn damping(&self) -> FEAResult<DMatrix<f64>> {
        Ok(DMatrix::zeros(self.num_dof(), self.num_dof()))
    }

    /// Internal force minus element loads, in global coordinates
    fn resisting_force(&self) -> FEAResult<DVector<f64>>;

    fn accepts_load(&self, load: &ElementLoad) -> bool;

    fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()>;

    fn zero_load(&mut self);

    fn commit_state(&mut self);
    fn revert_to_last_commit(&mut self);
    fn revert_to_start(&mut self);

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>>;

    /// Shape function values at a global point, one per node
    fn shape_functions_at(&self, _point: &Vec3) -> FEAResult<Vec<f64>> {
        Err(FEAError::InvalidInput(format!(
            "{} does not provide shape functions",
            self.class_name()
        )))
    }
}

/// Closed set of element kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Element {
    ElasticBeam2d(ElasticBeam2d),
    ElasticBeam3d(ElasticBeam3d),
    ForceBeamColumn2d(ForceBeamColumn2d),
    ForceBeamColumn3d(ForceBeamColumn3d),
    Truss(Truss),
    CorotTruss(CorotTruss),
    ZeroLength(ZeroLength),
    ZeroLengthSection(ZeroLengthSection),
    ShellMitc4(ShellMitc4),
}

macro_rules! dispatch {
    ($self:ident, $e:ident => $body:expr) => {
        match $self {
            Element::ElasticBeam2d($e) => $body,
            Element::ElasticBeam3d($e) => $body,
            Element::ForceBeamColumn2d($e) => $body,
            Element::ForceBeamColumn3d($e) => $body,
            Element::Truss($e) => $body,
            Element::CorotTruss($e) => $body,
            Element::ZeroLength($e) => $body,
            Element::ZeroLengthSection($e) => $body,
            Element::ShellMitc4($e) => $body,
        }
    };
}

impl Element {
    pub fn behavior(&self) -> &dyn ElementBehavior {
        dispatch!(self, e => e)
    }

    pub fn behavior_mut(&mut self) -> &mut dyn ElementBehavior {
        dispatch!(self, e => e)
    }

    pub fn tag(&self) -> usize {
        self.behavior().tag()
    }

    pub fn class_name(&self) -> &'static str {
        self.behavior().class_name()
    }

    pub fn node_tags(&self) -> &[usize] {
        self.behavior().node_tags()
    }

    pub fn num_dof(&self) -> usize {
        self.behavior().num_dof()
    }

    pub fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        self.behavior_mut().initialize(nodes)
    }

    pub fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        self.behavior_mut().update(nodes)
    }

    pub fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.behavior().tangent_stiff()
    }

    pub fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.behavior().initial_stiff()
    }

    pub fn mass(&self) -> FEAResult<DMatrix<f64>> {
        self.behavior().mass()
    }

    /// Material damping plus the Rayleigh terms
    pub fn damping(&self, rayleigh: Option<&Rayleigh>) -> FEAResult<DMatrix<f64>> {
        let mut c = self.behavior().damping()?;
        if let Some(r) = rayleigh {
            if r.alpha_m != 0.0 {
                c += self.mass()? * r.alpha_m;
            }
            if r.beta_k != 0.0 {
                c += self.tangent_stiff()? * r.beta_k;
            }
            if r.beta_k0 != 0.0 {
                c += self.initial_stiff()? * r.beta_k0;
            }
        }
        Ok(c)
    }

    pub fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        self.behavior().resisting_force()
    }

    /// R + M·a + C·v from the trial nodal response
    pub fn resisting_force_inc_inertia(
        &self,
        nodes: &[&Node],
        rayleigh: Option<&Rayleigh>,
    ) -> FEAResult<DVector<f64>> {
        let mut p = self.resisting_force()?;
        let accel = gather(nodes, Node::trial_accel);
        let vel = gather(nodes, Node::trial_vel);
        if accel.len() != p.len() {
            return Err(FEAError::InvalidState(format!(
                "element {} has {} dofs but its nodes carry {}",
                self.tag(),
                p.len(),
                accel.len()
            )));
        }
        if accel.iter().any(|a| *a != 0.0) {
            p += self.mass()? * &accel;
        }
        if vel.iter().any(|v| *v != 0.0) {
            p += self.damping(rayleigh)? * &vel;
        }
        Ok(p)
    }

    pub fn accepts_load(&self, load: &ElementLoad) -> bool {
        match load {
            ElementLoad::Inertia { .. } => true,
            _ => self.behavior().accepts_load(load),
        }
    }

    pub fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
        if !self.behavior().accepts_load(load) {
            return Err(FEAError::InvalidInput(format!(
                "{} {} cannot take a {} load",
                self.class_name(),
                self.tag(),
                load.kind_name()
            )));
        }
        self.behavior_mut().add_load(load, factor)
    }

    /// Nodal forces −factor·M·r for a uniform acceleration `accel`
    ///
    /// `accel` gives one component per nodal dof and is repeated for every
    /// node of the element.
    pub fn inertia_load(&self, accel: &[f64], factor: f64) -> FEAResult<DVector<f64>> {
        let n = self.num_dof();
        let per_node = n / self.node_tags().len().max(1);
        let r = DVector::from_fn(n, |i, _| accel.get(i % per_node).copied().unwrap_or(0.0));
        Ok(self.mass()? * r * (-factor))
    }

    pub fn zero_load(&mut self) {
        self.behavior_mut().zero_load()
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

    pub fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.behavior().response(which)
    }

    pub fn shape_functions_at(&self, point: &Vec3) -> FEAResult<Vec<f64>> {
        self.behavior().shape_functions_at(point)
    }
}

macro_rules! impl_from_element {
    ($($variant:ident),*) => {
        $(impl From<$variant> for Element {
            fn from(e: $variant) -> Self {
                Element::$variant(e)
            }
        })*
    };
}

impl_from_element!(
    ElasticBeam2d,
    ElasticBeam3d,
    ForceBeamColumn2d,
    ForceBeamColumn3d,
    Truss,
    CorotTruss,
    ZeroLength,
    ZeroLengthSection,
    ShellMitc4
);

/// Stack one nodal vector per node into an element vector
pub(crate) fn gather(nodes: &[&Node], f: fn(&Node) -> &DVector<f64>) -> DVector<f64> {
    let n: usize = nodes.iter().map(|n| n.ndf()).sum();
    DVector::from_iterator(n, nodes.iter().flat_map(|node| f(node).iter().copied()))
}

/// Check the node list passed by the domain against the element connectivity
pub(crate) fn check_nodes(tag: usize, expected: &[usize], nodes: &[&Node]) -> FEAResult<()> {
    if nodes.len() != expected.len() || nodes.iter().zip(expected).any(|(n, t)| n.tag != *t) {
        return Err(FEAError::InvalidInput(format!(
            "element {tag} expects nodes {expected:?}"
        )));
    }
    Ok(())
}

pub(crate) fn not_initialized(tag: usize) -> FEAError {
    FEAError::InvalidState(format!("element {tag} used before initialize"))
}

pub(crate) fn no_section(tag: usize, i: usize) -> FEAError {
    FEAError::InvalidInput(format!("element {tag} has no section {i}"))
}
