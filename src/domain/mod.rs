//! The model: nodes, elements, constraints and load patterns
//!
//! A [`Domain`] is an explicit value passed to analyses. It owns every
//! component of the model plus the material and section handlers, a
//! diagnostics sink and a typed property side-table. Iteration over nodes,
//! elements and constraints is in ascending tag order.

mod diagnostics;
mod persistence;
mod properties;

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::constraints::{Fixity, MpConstraint, SpConstraint};
use crate::elements::{Element, ElementResponse, Node};
use crate::error::{FEAError, FEAResult};
use crate::loads::{ElementLoad, LoadPattern, NodalLoad};
use crate::materials::MaterialHandler;
use crate::sections::SectionHandler;

pub use diagnostics::{DiagnosticLevel, DiagnosticRecord, Diagnostics};
pub use persistence::{DirectoryStore, KeyValueStore, MemoryStore};
pub use properties::{EntityId, PropertyEntry, PropertyTable, PropertyValue};

/// Rayleigh damping C = αM·M + βK·K_T + βK0·K_0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rayleigh {
    pub alpha_m: f64,
    pub beta_k: f64,
    pub beta_k0: f64,
}

impl Rayleigh {
    pub fn new(alpha_m: f64, beta_k: f64, beta_k0: f64) -> Self {
        Self {
            alpha_m,
            beta_k,
            beta_k0,
        }
    }
}

fn lookup<'a>(nodes: &'a BTreeMap<usize, Node>, tags: &[usize]) -> FEAResult<Vec<&'a Node>> {
    tags.iter()
        .map(|t| nodes.get(t).ok_or(FEAError::NodeNotFound(*t)))
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Domain {
    nodes: BTreeMap<usize, Node>,
    elements: BTreeMap<usize, Element>,
    sp_constraints: BTreeMap<usize, SpConstraint>,
    mp_constraints: BTreeMap<usize, MpConstraint>,
    patterns: Vec<LoadPattern>,
    materials: MaterialHandler,
    sections: SectionHandler,
    #[serde(skip)]
    diagnostics: Diagnostics,
    properties: PropertyTable,
    rayleigh: Option<Rayleigh>,
    time: f64,
    committed_time: f64,
    commit_tag: usize,
    /// Bumped on every topology or constraint change
    stamp: u64,
    eigenvalues: Vec<f64>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Building
    // ---------------------------------------------------------------------

    pub fn add_node(&mut self, node: Node) -> FEAResult<()> {
        if self.nodes.contains_key(&node.tag) {
            return Err(FEAError::DuplicateTag {
                kind: "node",
                tag: node.tag,
            });
        }
        self.nodes.insert(node.tag, node);
        self.stamp += 1;
        Ok(())
    }

    /// Add an element and fix its reference configuration
    pub fn add_element(&mut self, element: impl Into<Element>) -> FEAResult<()> {
        let mut element = element.into();
        let tag = element.tag();
        if self.elements.contains_key(&tag) {
            return Err(FEAError::DuplicateTag { kind: "element", tag });
        }
        let nodes = lookup(&self.nodes, element.node_tags())?;
        element.initialize(&nodes)?;
        self.elements.insert(tag, element);
        self.stamp += 1;
        Ok(())
    }

    pub fn add_sp(&mut self, sp: SpConstraint) -> FEAResult<()> {
        if self.sp_constraints.contains_key(&sp.tag) {
            return Err(FEAError::DuplicateTag {
                kind: "constraint",
                tag: sp.tag,
            });
        }
        self.node(sp.node)?.check_dof(sp.dof)?;
        if let Some(other) = self
            .sp_constraints
            .values()
            .find(|o| o.node == sp.node && o.dof == sp.dof)
        {
            return Err(FEAError::RedundantConstraint(format!(
                "dof {} of node {} is already constrained by {}",
                sp.dof, sp.node, other.tag
            )));
        }
        if let Some(pattern) = sp.pattern {
            let p = self.pattern_mut(pattern)?;
            p.push_sp(sp.tag);
        }
        self.sp_constraints.insert(sp.tag, sp);
        self.stamp += 1;
        Ok(())
    }

    /// Single-point constraint owned by a pattern, scaled with its factor
    pub fn add_pattern_sp(&mut self, pattern: usize, mut sp: SpConstraint) -> FEAResult<()> {
        sp.pattern = Some(pattern);
        sp.set_factor(0.0);
        self.add_sp(sp)
    }

    pub fn remove_sp(&mut self, tag: usize) -> FEAResult<SpConstraint> {
        let sp = self
            .sp_constraints
            .remove(&tag)
            .ok_or(FEAError::ConstraintNotFound(tag))?;
        if let Some(p) = sp.pattern {
            if let Ok(pattern) = self.pattern_mut(p) {
                pattern.remove_sp(tag);
            }
        }
        self.stamp += 1;
        Ok(sp)
    }

    /// Expand a support condition into constraints; returns their tags
    pub fn fix(&mut self, node: usize, fixity: Fixity) -> FEAResult<Vec<usize>> {
        let n = self.node(node)?;
        let dofs = fixity.restrained_dofs(n.ndm(), n.ndf());
        let mut next = self.next_constraint_tag();
        let mut tags = Vec::with_capacity(dofs.len());
        for (dof, value) in dofs {
            self.add_sp(SpConstraint::new(next, node, dof, value))?;
            tags.push(next);
            next += 1;
        }
        Ok(tags)
    }

    pub fn add_mp(&mut self, mp: MpConstraint) -> FEAResult<()> {
        if self.mp_constraints.contains_key(&mp.tag) {
            return Err(FEAError::DuplicateTag {
                kind: "constraint",
                tag: mp.tag,
            });
        }
        let cn = self.node(mp.constrained_node)?;
        for d in &mp.constrained_dofs {
            cn.check_dof(*d)?;
        }
        for (node, d) in mp.retained_dofs() {
            self.node(node)?.check_dof(d)?;
        }
        for other in self.mp_constraints.values() {
            if other.constrained_node == mp.constrained_node
                && other.constrained_dofs.iter().any(|d| mp.constrained_dofs.contains(d))
            {
                return Err(FEAError::RedundantConstraint(format!(
                    "node {} is constrained by both {} and {}",
                    mp.constrained_node, other.tag, mp.tag
                )));
            }
        }
        self.mp_constraints.insert(mp.tag, mp);
        self.stamp += 1;
        Ok(())
    }

    pub fn add_pattern(&mut self, pattern: LoadPattern) -> FEAResult<()> {
        if self.patterns.iter().any(|p| p.tag == pattern.tag) {
            return Err(FEAError::DuplicateTag {
                kind: "load pattern",
                tag: pattern.tag,
            });
        }
        pattern.series.validate()?;
        self.patterns.push(pattern);
        Ok(())
    }

    pub fn add_nodal_load(&mut self, pattern: usize, load: NodalLoad) -> FEAResult<()> {
        let node = self.node(load.node)?;
        if load.values.len() != node.ndf() {
            return Err(FEAError::InvalidInput(format!(
                "load on node {} has {} components, node has {} dofs",
                load.node,
                load.values.len(),
                node.ndf()
            )));
        }
        self.pattern_mut(pattern)?.push_nodal_load(load);
        Ok(())
    }

    pub fn add_element_load(
        &mut self,
        pattern: usize,
        element: usize,
        load: ElementLoad,
    ) -> FEAResult<()> {
        let el = self.element(element)?;
        if !el.accepts_load(&load) {
            return Err(FEAError::InvalidInput(format!(
                "{} {element} cannot take a {} load",
                el.class_name(),
                load.kind_name()
            )));
        }
        self.pattern_mut(pattern)?.push_element_load(element, load);
        Ok(())
    }

    pub fn set_rayleigh(&mut self, rayleigh: Option<Rayleigh>) {
        self.rayleigh = rayleigh;
    }

    // ---------------------------------------------------------------------
    // Access
    // ---------------------------------------------------------------------

    pub fn node(&self, tag: usize) -> FEAResult<&Node> {
        self.nodes.get(&tag).ok_or(FEAError::NodeNotFound(tag))
    }

    pub fn node_mut(&mut self, tag: usize) -> FEAResult<&mut Node> {
        self.nodes.get_mut(&tag).ok_or(FEAError::NodeNotFound(tag))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn element(&self, tag: usize) -> FEAResult<&Element> {
        self.elements.get(&tag).ok_or(FEAError::ElementNotFound(tag))
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Nodes of an element in its connectivity order
    pub fn element_nodes(&self, element: &Element) -> FEAResult<Vec<&Node>> {
        lookup(&self.nodes, element.node_tags())
    }

    pub fn sp_constraints(&self) -> impl Iterator<Item = &SpConstraint> {
        self.sp_constraints.values()
    }

    pub fn mp_constraints(&self) -> impl Iterator<Item = &MpConstraint> {
        self.mp_constraints.values()
    }

    pub fn patterns(&self) -> &[LoadPattern] {
        &self.patterns
    }

    pub fn pattern(&self, tag: usize) -> FEAResult<&LoadPattern> {
        self.patterns
            .iter()
            .find(|p| p.tag == tag)
            .ok_or(FEAError::PatternNotFound(tag))
    }

    fn pattern_mut(&mut self, tag: usize) -> FEAResult<&mut LoadPattern> {
        self.patterns
            .iter_mut()
            .find(|p| p.tag == tag)
            .ok_or(FEAError::PatternNotFound(tag))
    }

    fn next_constraint_tag(&self) -> usize {
        self.sp_constraints
            .keys()
            .chain(self.mp_constraints.keys())
            .max()
            .map_or(1, |t| t + 1)
    }

    pub fn materials(&self) -> &MaterialHandler {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialHandler {
        &mut self.materials
    }

    pub fn sections(&self) -> &SectionHandler {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut SectionHandler {
        &mut self.sections
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyTable {
        &mut self.properties
    }

    pub fn rayleigh(&self) -> Option<&Rayleigh> {
        self.rayleigh.as_ref()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn committed_time(&self) -> f64 {
        self.committed_time
    }

    pub(crate) fn set_time(&mut self, t: f64) {
        self.time = t;
    }

    /// Number of commits since the start
    pub fn commit_tag(&self) -> usize {
        self.commit_tag
    }

    /// Change stamp of the topology and constraint set
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    // ---------------------------------------------------------------------
    // Loading and state
    // ---------------------------------------------------------------------

    /// Set time `t` and rebuild all applied loads from the patterns
    pub fn apply_load(&mut self, t: f64) -> FEAResult<()> {
        self.time = t;
        self.nodes.values_mut().for_each(Node::zero_unbalanced_load);
        self.elements.values_mut().for_each(Element::zero_load);
        for pattern in &mut self.patterns {
            let factor = pattern.load_factor(t);
            pattern.set_current_factor(factor);
            for load in pattern.nodal_loads() {
                let node = self
                    .nodes
                    .get_mut(&load.node)
                    .ok_or(FEAError::NodeNotFound(load.node))?;
                node.add_unbalanced_load(&DVector::from_column_slice(&load.values), factor);
            }
            for (tag, load) in pattern.element_loads() {
                let element = self.elements.get_mut(tag).ok_or(FEAError::ElementNotFound(*tag))?;
                match load {
                    ElementLoad::Inertia { accel } => {
                        let p = element.inertia_load(accel, factor)?;
                        let mut offset = 0;
                        for nt in element.node_tags() {
                            let node = self.nodes.get_mut(nt).ok_or(FEAError::NodeNotFound(*nt))?;
                            let ndf = node.ndf();
                            node.add_unbalanced_load(&p.rows(offset, ndf).into_owned(), 1.0);
                            offset += ndf;
                        }
                    }
                    _ => element.add_load(load, factor)?,
                }
            }
            for sp in pattern.sp_tags() {
                if let Some(c) = self.sp_constraints.get_mut(sp) {
                    c.set_factor(factor);
                }
            }
        }
        Ok(())
    }

    /// Element state determination from the trial nodal response
    pub fn update(&mut self) -> FEAResult<()> {
        for element in self.elements.values_mut() {
            let nodes = lookup(&self.nodes, element.node_tags())?;
            element.update(&nodes)?;
        }
        Ok(())
    }

    /// Commit elements, then nodes, then time
    pub fn commit(&mut self) {
        self.elements.values_mut().for_each(Element::commit_state);
        self.nodes.values_mut().for_each(Node::commit_state);
        self.committed_time = self.time;
        self.commit_tag += 1;
        log::debug!("domain committed at t = {} (tag {})", self.time, self.commit_tag);
    }

    pub fn revert_to_last_commit(&mut self) -> FEAResult<()> {
        self.elements.values_mut().for_each(Element::revert_to_last_commit);
        self.nodes.values_mut().for_each(Node::revert_to_last_commit);
        self.time = self.committed_time;
        self.update()
    }

    pub fn revert_to_start(&mut self) -> FEAResult<()> {
        self.elements.values_mut().for_each(Element::revert_to_start);
        self.nodes.values_mut().for_each(Node::revert_to_start);
        self.time = 0.0;
        self.committed_time = 0.0;
        self.commit_tag = 0;
        self.eigenvalues.clear();
        self.apply_load(0.0)?;
        self.update()
    }

    /// Reactions R = resisting force − applied load at every node
    pub fn calculate_nodal_reactions(&mut self, include_inertia: bool) -> FEAResult<()> {
        for node in self.nodes.values_mut() {
            node.zero_reaction();
            let applied = if include_inertia {
                node.unbalanced_load_inc_inertia()
            } else {
                node.unbalanced_load().clone()
            };
            node.add_reaction(&applied, -1.0);
        }
        let rayleigh = self.rayleigh;
        let mut contributions = Vec::with_capacity(self.elements.len());
        for element in self.elements.values() {
            let nodes = lookup(&self.nodes, element.node_tags())?;
            let p = if include_inertia {
                element.resisting_force_inc_inertia(&nodes, rayleigh.as_ref())?
            } else {
                element.resisting_force()?
            };
            contributions.push((element.node_tags().to_vec(), p));
        }
        for (tags, p) in contributions {
            let mut offset = 0;
            for t in tags {
                let node = self.nodes.get_mut(&t).ok_or(FEAError::NodeNotFound(t))?;
                let ndf = node.ndf();
                node.add_reaction(&p.rows(offset, ndf).into_owned(), 1.0);
                offset += ndf;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Results
    // ---------------------------------------------------------------------

    pub fn node_disp(&self, tag: usize) -> FEAResult<&DVector<f64>> {
        Ok(self.node(tag)?.trial_disp())
    }

    pub fn node_reaction(&self, tag: usize) -> FEAResult<&DVector<f64>> {
        Ok(self.node(tag)?.reaction())
    }

    pub fn element_response(&self, tag: usize, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.element(tag)?.response(which)
    }

    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    /// Circular eigenfrequencies divided by 2π
    pub fn frequencies(&self) -> Vec<f64> {
        self.eigenvalues
            .iter()
            .map(|l| l.max(0.0).sqrt() / (2.0 * std::f64::consts::PI))
            .collect()
    }

    pub fn periods(&self) -> Vec<f64> {
        self.frequencies().iter().map(|f| 1.0 / f).collect()
    }

    /// Store an eigen solution; `vectors` maps node tags to ndf × modes blocks
    pub(crate) fn set_eigen(
        &mut self,
        values: Vec<f64>,
        mut vectors: BTreeMap<usize, DMatrix<f64>>,
    ) {
        let modes = values.len();
        for (tag, node) in self.nodes.iter_mut() {
            let v = vectors
                .remove(tag)
                .unwrap_or_else(|| DMatrix::zeros(node.ndf(), modes));
            node.set_eigenvectors(v);
        }
        self.eigenvalues = values;
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    fn snapshot_key(commit_tag: usize) -> String {
        format!("domain-{commit_tag}")
    }

    /// Write a snapshot of the whole domain under `commit_tag`
    pub fn save(&self, store: &mut dyn KeyValueStore, commit_tag: usize) -> FEAResult<()> {
        let json = serde_json::to_string(self)?;
        store.put(&Self::snapshot_key(commit_tag), &json)?;
        log::info!("saved domain snapshot {commit_tag} ({} bytes)", json.len());
        Ok(())
    }

    /// Replace the domain with the snapshot saved under `commit_tag`
    ///
    /// The diagnostics sink is kept.
    pub fn restore(&mut self, store: &dyn KeyValueStore, commit_tag: usize) -> FEAResult<()> {
        let json = store
            .get(&Self::snapshot_key(commit_tag))?
            .ok_or_else(|| FEAError::InvalidInput(format!("no snapshot with tag {commit_tag}")))?;
        let mut restored: Domain = serde_json::from_str(&json)?;
        restored.diagnostics = std::mem::take(&mut self.diagnostics);
        restored.stamp = self.stamp.max(restored.stamp) + 1;
        *self = restored;
        log::info!("restored domain snapshot {commit_tag}");
        Ok(())
    }

    /// Remove every model component; diagnostics are kept
    pub fn clear_all(&mut self) {
        let diagnostics = std::mem::take(&mut self.diagnostics);
        let stamp = self.stamp + 1;
        *self = Domain {
            diagnostics,
            stamp,
            ..Domain::default()
        };
    }
}
