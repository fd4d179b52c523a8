//! Equation map between domain dofs and system unknowns, and assembly
//!
//! Every nodal dof resolves to a list of `(equation, coefficient)` terms
//! plus a list of `(sp tag, coefficient)` terms for prescribed values:
//!
//! * a free dof is its own equation, `[(eq, 1)]`;
//! * a fixed dof has no equation and takes the value of its SP constraint;
//! * a dof condensed by an MP constraint is `Σ C_j · u_rj` over its retained
//!   dofs, each of which is free or fixed.
//!
//! Element matrices are assembled through these lists, which amounts to
//! Tᵀ·K·T for the transformation method. Penalty and Lagrange handlers
//! keep every dof free and add one constraint row B·u = g per SP dof and
//! per MP row.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use super::handler::ConstraintHandler;
use super::numberer::Numberer;
use super::soe::LinearSoe;
use crate::domain::Domain;
use crate::elements::{Element, Node};
use crate::error::{FEAError, FEAResult};

/// What a nodal dof maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofSlot {
    /// Unknown with this equation number
    Free(usize),
    /// Removed; value from the SP constraint with this tag
    Fixed(usize),
    /// Condensed by the MP constraint with this tag
    Combined(usize),
}

/// Nodal response field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Disp,
    Vel,
    Accel,
}

/// Which stiffness enters the system matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tangent {
    #[default]
    Current,
    Initial,
}

/// A = k·K + d·C + m·M
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixCoefficients {
    pub k: f64,
    pub d: f64,
    pub m: f64,
}

impl MatrixCoefficients {
    pub fn stiffness() -> Self {
        Self {
            k: 1.0,
            d: 0.0,
            m: 0.0,
        }
    }

    pub fn mass() -> Self {
        Self {
            k: 0.0,
            d: 0.0,
            m: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
struct DofMap {
    slot: DofSlot,
    eq_terms: Vec<(usize, f64)>,
    sp_terms: Vec<(usize, f64)>,
}

/// Constraint row B·u = g of the penalty and Lagrange handlers
#[derive(Debug, Clone)]
struct ConstraintRow {
    entries: Vec<(usize, f64)>,
    /// SP tag giving g, zero for MP rows
    target: Option<usize>,
    scale: f64,
}

#[derive(Debug, Clone)]
pub struct AnalysisModel {
    handler: ConstraintHandler,
    stamp: u64,
    dofs: BTreeMap<usize, Vec<DofMap>>,
    num_dof_eqn: usize,
    rows: Vec<ConstraintRow>,
    lambda: DVector<f64>,
    lambda_committed: DVector<f64>,
    groups: Vec<Vec<usize>>,
}

impl AnalysisModel {
    /// Number the equations of `domain` under `handler`
    pub fn build(domain: &Domain, handler: ConstraintHandler, numberer: Numberer) -> FEAResult<Self> {
        let sp_at: BTreeMap<(usize, usize), usize> = domain
            .sp_constraints()
            .map(|sp| ((sp.node, sp.dof), sp.tag))
            .collect();
        let mut mp_at: BTreeMap<(usize, usize), (usize, usize)> = BTreeMap::new();
        for mp in domain.mp_constraints() {
            for (row, d) in mp.constrained_dofs.iter().enumerate() {
                mp_at.insert((mp.constrained_node, *d), (mp.tag, row));
            }
        }
        validate(domain, handler, &sp_at, &mp_at)?;

        let keep_all = handler.keeps_all_dofs();
        let mut dofs: BTreeMap<usize, Vec<DofMap>> = BTreeMap::new();
        let mut eq = 0;
        for tag in numberer.order(domain) {
            let node = domain.node(tag)?;
            let mut maps = Vec::with_capacity(node.ndf());
            for dof in 0..node.ndf() {
                let slot = match (sp_at.get(&(tag, dof)), mp_at.get(&(tag, dof))) {
                    _ if keep_all => None,
                    (Some(sp), _) => Some(DofSlot::Fixed(*sp)),
                    (None, Some((mp, _))) => Some(DofSlot::Combined(*mp)),
                    (None, None) => None,
                };
                let map = match slot {
                    None => {
                        eq += 1;
                        DofMap {
                            slot: DofSlot::Free(eq - 1),
                            eq_terms: vec![(eq - 1, 1.0)],
                            sp_terms: Vec::new(),
                        }
                    }
                    Some(s @ DofSlot::Fixed(sp)) => DofMap {
                        slot: s,
                        eq_terms: Vec::new(),
                        sp_terms: vec![(sp, 1.0)],
                    },
                    Some(s) => DofMap {
                        slot: s,
                        eq_terms: Vec::new(),
                        sp_terms: Vec::new(),
                    },
                };
                maps.push(map);
            }
            dofs.insert(tag, maps);
        }
        let num_dof_eqn = eq;

        // condensed dofs after every free and fixed dof is known
        if !keep_all {
            for mp in domain.mp_constraints() {
                let retained = mp.retained_dofs();
                for (row, d) in mp.constrained_dofs.iter().enumerate() {
                    let mut eq_terms = Vec::new();
                    let mut sp_terms = Vec::new();
                    for (col, (rn, rd)) in retained.iter().enumerate() {
                        let c = mp.c[(row, col)];
                        if c == 0.0 {
                            continue;
                        }
                        match dof_map(&dofs, *rn, *rd)?.slot {
                            DofSlot::Free(e) => eq_terms.push((e, c)),
                            DofSlot::Fixed(sp) => sp_terms.push((sp, c)),
                            DofSlot::Combined(other) => {
                                return Err(FEAError::UnsupportedConstraint {
                                    handler: handler.name(),
                                    constraint: format!(
                                        "MP {} retaining dof {rd} of node {rn} condensed by MP {other}",
                                        mp.tag
                                    ),
                                })
                            }
                        }
                    }
                    let map = dof_map_mut(&mut dofs, mp.constrained_node, *d)?;
                    map.eq_terms = eq_terms;
                    map.sp_terms = sp_terms;
                }
            }
        }

        let mut rows = Vec::new();
        if keep_all {
            let (alpha_sp, alpha_mp) = handler.row_scales();
            if !(alpha_sp > 0.0 && alpha_mp > 0.0) {
                return Err(FEAError::InvalidInput(format!(
                    "{} handler needs positive scale factors",
                    handler.name()
                )));
            }
            for sp in domain.sp_constraints() {
                rows.push(ConstraintRow {
                    entries: vec![(free_eq(&dofs, sp.node, sp.dof)?, 1.0)],
                    target: Some(sp.tag),
                    scale: alpha_sp,
                });
            }
            for mp in domain.mp_constraints() {
                let retained = mp.retained_dofs();
                for (row, d) in mp.constrained_dofs.iter().enumerate() {
                    let mut entries = vec![(free_eq(&dofs, mp.constrained_node, *d)?, 1.0)];
                    for (col, (rn, rd)) in retained.iter().enumerate() {
                        let c = mp.c[(row, col)];
                        if c != 0.0 {
                            entries.push((free_eq(&dofs, *rn, *rd)?, -c));
                        }
                    }
                    rows.push(ConstraintRow {
                        entries,
                        target: None,
                        scale: alpha_mp,
                    });
                }
            }
        }

        let num_lambda = if matches!(handler, ConstraintHandler::Lagrange { .. }) {
            rows.len()
        } else {
            0
        };

        let mut model = Self {
            handler,
            stamp: domain.stamp(),
            dofs,
            num_dof_eqn,
            rows,
            lambda: DVector::zeros(num_lambda),
            lambda_committed: DVector::zeros(num_lambda),
            groups: Vec::new(),
        };
        model.groups = model.coupling_groups(domain)?;
        log::debug!(
            "{} handler: {} dof equations, {} constraint rows",
            handler.name(),
            num_dof_eqn,
            model.rows.len()
        );
        Ok(model)
    }

    fn coupling_groups(&self, domain: &Domain) -> FEAResult<Vec<Vec<usize>>> {
        let mut groups = Vec::new();
        for element in domain.elements() {
            let mut g: Vec<usize> = self
                .element_terms(element)?
                .iter()
                .flat_map(|t| t.iter().map(|(e, _)| *e))
                .collect();
            g.sort_unstable();
            g.dedup();
            groups.push(g);
        }
        for maps in self.dofs.values() {
            let mut g: Vec<usize> = maps
                .iter()
                .flat_map(|m| m.eq_terms.iter().map(|(e, _)| *e))
                .collect();
            g.sort_unstable();
            g.dedup();
            groups.push(g);
        }
        for (r, row) in self.rows.iter().enumerate() {
            let mut g: Vec<usize> = row.entries.iter().map(|(e, _)| *e).collect();
            if self.is_lagrange() {
                g.push(self.num_dof_eqn + r);
            }
            groups.push(g);
        }
        Ok(groups)
    }

    fn is_lagrange(&self) -> bool {
        matches!(self.handler, ConstraintHandler::Lagrange { .. })
    }

    pub fn handler(&self) -> ConstraintHandler {
        self.handler
    }

    /// Whether the map still matches the topology of `domain`
    pub fn is_current(&self, domain: &Domain) -> bool {
        self.stamp == domain.stamp()
    }

    /// Total number of equations, multipliers included
    pub fn num_eqn(&self) -> usize {
        self.num_dof_eqn + self.lambda.len()
    }

    /// Number of displacement equations
    pub fn num_dof_equations(&self) -> usize {
        self.num_dof_eqn
    }

    /// Equation groups coupled by elements, nodes and constraint rows
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn slot(&self, node: usize, dof: usize) -> FEAResult<DofSlot> {
        Ok(dof_map(&self.dofs, node, dof)?.slot)
    }

    /// Equation of a free dof
    pub fn equation(&self, node: usize, dof: usize) -> FEAResult<usize> {
        free_eq(&self.dofs, node, dof)
    }

    /// Lagrange multipliers of the current trial state
    pub fn multipliers(&self) -> &DVector<f64> {
        &self.lambda
    }

    pub fn commit(&mut self) {
        self.lambda_committed.copy_from(&self.lambda);
    }

    pub fn revert_to_last_commit(&mut self) {
        self.lambda.copy_from(&self.lambda_committed);
    }

    pub fn revert_to_start(&mut self) {
        self.lambda.fill(0.0);
        self.lambda_committed.fill(0.0);
    }

    fn element_terms<'a>(&'a self, element: &Element) -> FEAResult<Vec<&'a [(usize, f64)]>> {
        let mut terms = Vec::with_capacity(element.num_dof());
        for tag in element.node_tags() {
            let maps = self.dofs.get(tag).ok_or(FEAError::NodeNotFound(*tag))?;
            terms.extend(maps.iter().map(|m| m.eq_terms.as_slice()));
        }
        if terms.len() != element.num_dof() {
            return Err(FEAError::InvalidInput(format!(
                "{} {} has {} dofs but its nodes carry {}",
                element.class_name(),
                element.tag(),
                element.num_dof(),
                terms.len()
            )));
        }
        Ok(terms)
    }

    // ---------------------------------------------------------------------
    // State transfer
    // ---------------------------------------------------------------------

    /// Free-dof values of a nodal field
    pub fn gather(&self, domain: &Domain, field: Field) -> FEAResult<DVector<f64>> {
        let mut x = DVector::zeros(self.num_dof_eqn);
        for (tag, maps) in &self.dofs {
            let node = domain.node(*tag)?;
            let values = field_of(node, field);
            for (dof, m) in maps.iter().enumerate() {
                if let DofSlot::Free(eq) = m.slot {
                    x[eq] = values[dof];
                }
            }
        }
        Ok(x)
    }

    /// Nodal vectors for the equation values `x`
    ///
    /// Prescribed SP values enter only when `with_prescribed` is set.
    pub fn expand(
        &self,
        domain: &Domain,
        x: &DVector<f64>,
        with_prescribed: bool,
    ) -> FEAResult<BTreeMap<usize, DVector<f64>>> {
        let sp_values: BTreeMap<usize, f64> = if with_prescribed {
            domain.sp_constraints().map(|sp| (sp.tag, sp.value())).collect()
        } else {
            BTreeMap::new()
        };
        let mut out = BTreeMap::new();
        for (tag, maps) in &self.dofs {
            let v = DVector::from_iterator(
                maps.len(),
                maps.iter().map(|m| {
                    let free: f64 = m.eq_terms.iter().map(|(e, c)| c * x[*e]).sum();
                    let fixed: f64 = m
                        .sp_terms
                        .iter()
                        .map(|(sp, c)| c * sp_values.get(sp).copied().unwrap_or(0.0))
                        .sum();
                    free + fixed
                }),
            );
            out.insert(*tag, v);
        }
        Ok(out)
    }

    /// Write trial values of every node from the free-dof values `x`
    pub fn set_trial(&self, domain: &mut Domain, field: Field, x: &DVector<f64>) -> FEAResult<()> {
        if x.len() != self.num_dof_eqn {
            return Err(FEAError::InvalidState(format!(
                "{} values for {} dof equations",
                x.len(),
                self.num_dof_eqn
            )));
        }
        let values = self.expand(domain, x, field == Field::Disp)?;
        for (tag, v) in values {
            let node = domain.node_mut(tag)?;
            match field {
                Field::Disp => node.set_trial_disp(&v),
                Field::Vel => node.set_trial_vel(&v),
                Field::Accel => node.set_trial_accel(&v),
            }
        }
        Ok(())
    }

    /// Bring fixed and condensed dofs in line with the current SP values
    pub fn impose_prescribed(&self, domain: &mut Domain) -> FEAResult<()> {
        let x = self.gather(domain, Field::Disp)?;
        self.set_trial(domain, Field::Disp, &x)
    }

    /// Add a system solution increment to the trial displacements and
    /// multipliers
    pub fn increment(&mut self, domain: &mut Domain, dx: &DVector<f64>) -> FEAResult<()> {
        if dx.len() != self.num_eqn() {
            return Err(FEAError::InvalidState(format!(
                "increment of length {} for {} equations",
                dx.len(),
                self.num_eqn()
            )));
        }
        let x = self.gather(domain, Field::Disp)? + dx.rows(0, self.num_dof_eqn);
        self.increment_multipliers(dx);
        self.set_trial(domain, Field::Disp, &x)
    }

    /// Add the multiplier part of a system solution
    pub fn increment_multipliers(&mut self, dx: &DVector<f64>) {
        let n = self.lambda.len();
        if n > 0 && dx.len() == self.num_eqn() {
            self.lambda += dx.rows(self.num_dof_eqn, n);
        }
    }

    // ---------------------------------------------------------------------
    // Assembly
    // ---------------------------------------------------------------------

    /// Feed every entry of k·K + d·C + m·M to `add`
    pub fn assemble_with(
        &self,
        domain: &Domain,
        coeffs: MatrixCoefficients,
        tangent: Tangent,
        add: &mut dyn FnMut(usize, usize, f64) -> FEAResult<()>,
    ) -> FEAResult<()> {
        let rayleigh = domain.rayleigh();
        for element in domain.elements() {
            let n = element.num_dof();
            let mut mat = DMatrix::zeros(n, n);
            if coeffs.k != 0.0 {
                let k = match tangent {
                    Tangent::Current => element.tangent_stiff()?,
                    Tangent::Initial => element.initial_stiff()?,
                };
                mat += k * coeffs.k;
            }
            if coeffs.d != 0.0 {
                mat += element.damping(rayleigh)? * coeffs.d;
            }
            if coeffs.m != 0.0 {
                mat += element.mass()? * coeffs.m;
            }
            if mat.iter().any(|v| !v.is_finite()) {
                return Err(FEAError::NonFinite(format!(
                    "matrix of {} {}",
                    element.class_name(),
                    element.tag()
                )));
            }
            let terms = self.element_terms(element)?;
            scatter_matrix(&mat, &terms, add)?;
        }

        let alpha_m = rayleigh.map_or(0.0, |r| r.alpha_m);
        let node_scale = coeffs.m + coeffs.d * alpha_m;
        if node_scale != 0.0 {
            for (tag, maps) in &self.dofs {
                if let Some(mass) = domain.node(*tag)?.mass() {
                    let terms: Vec<&[(usize, f64)]> =
                        maps.iter().map(|m| m.eq_terms.as_slice()).collect();
                    scatter_matrix(&(mass * node_scale), &terms, add)?;
                }
            }
        }

        if coeffs.k != 0.0 {
            let lagrange = self.is_lagrange();
            for (r, row) in self.rows.iter().enumerate() {
                let s = row.scale * coeffs.k;
                if lagrange {
                    let l = self.num_dof_eqn + r;
                    for (e, c) in &row.entries {
                        add(*e, l, s * c)?;
                        add(l, *e, s * c)?;
                    }
                } else {
                    for (ei, ci) in &row.entries {
                        for (ej, cj) in &row.entries {
                            add(*ei, *ej, s * ci * cj)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Zero A and assemble k·K + d·C + m·M into it
    pub fn form_tangent(
        &self,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
        coeffs: MatrixCoefficients,
        tangent: Tangent,
    ) -> FEAResult<()> {
        soe.zero_a();
        self.assemble_with(domain, coeffs, tangent, &mut |i, j, v| soe.add_a(i, j, v))
    }

    /// Dense copy of k·K + d·C + m·M
    pub fn assemble_dense(
        &self,
        domain: &Domain,
        coeffs: MatrixCoefficients,
        tangent: Tangent,
    ) -> FEAResult<DMatrix<f64>> {
        let n = self.num_eqn();
        let mut a = DMatrix::zeros(n, n);
        self.assemble_with(domain, coeffs, tangent, &mut |i, j, v| {
            a[(i, j)] += v;
            Ok(())
        })?;
        Ok(a)
    }

    /// Out-of-balance vector P − R, with inertia and damping forces when
    /// `inertia` is set, plus the constraint row terms
    pub fn unbalance(&self, domain: &Domain, inertia: bool) -> FEAResult<DVector<f64>> {
        let mut b = DVector::zeros(self.num_eqn());
        let rayleigh = domain.rayleigh();
        let alpha_m = rayleigh.map_or(0.0, |r| r.alpha_m);

        for (tag, maps) in &self.dofs {
            let node = domain.node(*tag)?;
            let mut p = if inertia {
                node.unbalanced_load_inc_inertia()
            } else {
                node.unbalanced_load().clone()
            };
            if inertia && alpha_m != 0.0 {
                if let Some(m) = node.mass() {
                    p -= m * node.trial_vel() * alpha_m;
                }
            }
            for (dof, map) in maps.iter().enumerate() {
                for (e, c) in &map.eq_terms {
                    b[*e] += c * p[dof];
                }
            }
        }

        for element in domain.elements() {
            let f = if inertia {
                let nodes = domain.element_nodes(element)?;
                element.resisting_force_inc_inertia(&nodes, rayleigh)?
            } else {
                element.resisting_force()?
            };
            if f.iter().any(|v| !v.is_finite()) {
                return Err(FEAError::NonFinite(format!(
                    "resisting force of {} {}",
                    element.class_name(),
                    element.tag()
                )));
            }
            let terms = self.element_terms(element)?;
            for (a, t) in terms.iter().enumerate() {
                for (e, c) in t.iter() {
                    b[*e] -= c * f[a];
                }
            }
        }

        if !self.rows.is_empty() {
            let u = self.gather(domain, Field::Disp)?;
            let sp_values: BTreeMap<usize, f64> =
                domain.sp_constraints().map(|sp| (sp.tag, sp.value())).collect();
            for (r, row) in self.rows.iter().enumerate() {
                let target = row.target.and_then(|t| sp_values.get(&t).copied()).unwrap_or(0.0);
                let gap = target - row.entries.iter().map(|(e, c)| c * u[*e]).sum::<f64>();
                if self.is_lagrange() {
                    for (e, c) in &row.entries {
                        b[*e] -= row.scale * c * self.lambda[r];
                    }
                    b[self.num_dof_eqn + r] += row.scale * gap;
                } else {
                    for (e, c) in &row.entries {
                        b[*e] += row.scale * c * gap;
                    }
                }
            }
        }
        Ok(b)
    }

    pub fn form_unbalance(&self, domain: &Domain, soe: &mut dyn LinearSoe, inertia: bool) -> FEAResult<()> {
        let b = self.unbalance(domain, inertia)?;
        soe.set_b(&b)
    }
}

fn validate(
    domain: &Domain,
    handler: ConstraintHandler,
    sp_at: &BTreeMap<(usize, usize), usize>,
    mp_at: &BTreeMap<(usize, usize), (usize, usize)>,
) -> FEAResult<()> {
    match handler {
        ConstraintHandler::Plain => {
            if let Some(mp) = domain.mp_constraints().next() {
                return Err(FEAError::UnsupportedConstraint {
                    handler: handler.name(),
                    constraint: format!("multi-point constraint {}", mp.tag),
                });
            }
            if let Some(sp) = domain.sp_constraints().find(|sp| !sp.is_homogeneous()) {
                return Err(FEAError::UnsupportedConstraint {
                    handler: handler.name(),
                    constraint: format!("non-homogeneous SP {}", sp.tag),
                });
            }
        }
        ConstraintHandler::Transformation => {
            for ((node, dof), (mp, _)) in mp_at {
                if let Some(sp) = sp_at.get(&(*node, *dof)) {
                    return Err(FEAError::ContradictoryConstraint(format!(
                        "dof {dof} of node {node} is fixed by SP {sp} and condensed by MP {mp}"
                    )));
                }
            }
        }
        ConstraintHandler::Penalty { .. } | ConstraintHandler::Lagrange { .. } => {}
    }
    Ok(())
}

fn field_of(node: &Node, field: Field) -> &DVector<f64> {
    match field {
        Field::Disp => node.trial_disp(),
        Field::Vel => node.trial_vel(),
        Field::Accel => node.trial_accel(),
    }
}

fn dof_map(dofs: &BTreeMap<usize, Vec<DofMap>>, node: usize, dof: usize) -> FEAResult<&DofMap> {
    let maps = dofs.get(&node).ok_or(FEAError::NodeNotFound(node))?;
    maps.get(dof).ok_or(FEAError::InvalidDof {
        node,
        dof,
        ndf: maps.len(),
    })
}

fn dof_map_mut(
    dofs: &mut BTreeMap<usize, Vec<DofMap>>,
    node: usize,
    dof: usize,
) -> FEAResult<&mut DofMap> {
    let maps = dofs.get_mut(&node).ok_or(FEAError::NodeNotFound(node))?;
    let ndf = maps.len();
    maps.get_mut(dof).ok_or(FEAError::InvalidDof { node, dof, ndf })
}

fn free_eq(dofs: &BTreeMap<usize, Vec<DofMap>>, node: usize, dof: usize) -> FEAResult<usize> {
    match dof_map(dofs, node, dof)?.slot {
        DofSlot::Free(eq) => Ok(eq),
        other => Err(FEAError::InvalidInput(format!(
            "dof {dof} of node {node} has no equation ({other:?})"
        ))),
    }
}

fn scatter_matrix(
    mat: &DMatrix<f64>,
    terms: &[&[(usize, f64)]],
    add: &mut dyn FnMut(usize, usize, f64) -> FEAResult<()>,
) -> FEAResult<()> {
    for (a, ta) in terms.iter().enumerate() {
        for (b, tb) in terms.iter().enumerate() {
            let v = mat[(a, b)];
            if v == 0.0 {
                continue;
            }
            for (ea, ca) in ta.iter() {
                for (eb, cb) in tb.iter() {
                    add(*ea, *eb, ca * cb * v)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{Fixity, MpConstraint, SpConstraint};
    use crate::elements::Truss;
    use crate::materials::UniaxialMaterial;
    use approx::assert_relative_eq;

    /// Two collinear bars 1-2, 3-4 with node 3 tied to node 2
    fn tied_bars() -> Domain {
        let mut d = Domain::new();
        for (t, x) in [(1, 0.0), (2, 1.0), (3, 1.0), (4, 2.0)] {
            d.add_node(Node::new(t, &[x, 0.0], 2).unwrap()).unwrap();
        }
        let steel = UniaxialMaterial::elastic(100.0);
        d.add_element(Truss::new(1, 1, 2, steel.clone(), 1.0).unwrap()).unwrap();
        d.add_element(Truss::new(2, 3, 4, steel, 1.0).unwrap()).unwrap();
        d.fix(1, Fixity::pinned()).unwrap();
        d.fix(4, Fixity::with_restraints(false, true, false, false, false, false))
            .unwrap();
        let (n2, n3) = (d.node(2).unwrap().clone(), d.node(3).unwrap().clone());
        d.add_mp(MpConstraint::equal_dof(100, &n2, &n3, &[0, 1]).unwrap()).unwrap();
        d
    }

    #[test]
    fn test_transformation_slots() {
        let d = tied_bars();
        let m = AnalysisModel::build(&d, ConstraintHandler::Transformation, Numberer::Plain).unwrap();
        assert_eq!(m.num_eqn(), 3);
        assert!(matches!(m.slot(1, 0).unwrap(), DofSlot::Fixed(_)));
        assert_eq!(m.slot(3, 1).unwrap(), DofSlot::Combined(100));
        assert_eq!(m.equation(2, 0).unwrap(), 0);
        assert!(m.equation(3, 0).is_err());
    }

    #[test]
    fn test_condensed_stiffness_is_series_of_bars() {
        let d = tied_bars();
        let m = AnalysisModel::build(&d, ConstraintHandler::Transformation, Numberer::Plain).unwrap();
        let k = m
            .assemble_dense(&d, MatrixCoefficients::stiffness(), Tangent::Current)
            .unwrap();
        // eq 0: ux2 (= ux3), eq 1: uy2, eq 2: ux4
        assert_relative_eq!(k[(0, 0)], 200.0);
        assert_relative_eq!(k[(0, 2)], -100.0);
        assert_relative_eq!(k[(2, 2)], 100.0);
    }

    #[test]
    fn test_prescribed_values_reach_condensed_dofs() {
        let mut d = tied_bars();
        let n1 = d.node(1).unwrap().clone();
        let n5 = Node::new(5, &[0.0, 0.0], 2).unwrap();
        d.add_node(n5.clone()).unwrap();
        d.add_mp(MpConstraint::equal_dof(101, &n1, &n5, &[0]).unwrap()).unwrap();
        d.remove_sp(1).unwrap();
        d.add_sp(SpConstraint::new(50, 1, 0, 0.25)).unwrap();
        let m = AnalysisModel::build(&d, ConstraintHandler::Transformation, Numberer::Rcm).unwrap();
        m.impose_prescribed(&mut d).unwrap();
        assert_relative_eq!(d.node_disp(1).unwrap()[0], 0.25);
        assert_relative_eq!(d.node_disp(5).unwrap()[0], 0.25);
    }

    #[test]
    fn test_handler_rejections() {
        let d = tied_bars();
        let err = AnalysisModel::build(&d, ConstraintHandler::Plain, Numberer::Plain).unwrap_err();
        assert!(matches!(err, FEAError::UnsupportedConstraint { handler: "Plain", .. }));

        let mut chained = tied_bars();
        let n3 = chained.node(3).unwrap().clone();
        let n6 = Node::new(6, &[2.0, 0.0], 2).unwrap();
        chained.add_node(n6.clone()).unwrap();
        chained.add_mp(MpConstraint::equal_dof(102, &n3, &n6, &[0]).unwrap()).unwrap();
        let err = AnalysisModel::build(&chained, ConstraintHandler::Transformation, Numberer::Plain)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Constraint);

        let mut both = tied_bars();
        both.add_sp(SpConstraint::homogeneous(60, 3, 1)).unwrap();
        let err = AnalysisModel::build(&both, ConstraintHandler::Transformation, Numberer::Plain)
            .unwrap_err();
        assert!(matches!(err, FEAError::ContradictoryConstraint(_)));
    }

    #[test]
    fn test_lagrange_adds_multiplier_equations() {
        let d = tied_bars();
        let m = AnalysisModel::build(&d, ConstraintHandler::Lagrange { alpha: 1.0 }, Numberer::Plain)
            .unwrap();
        // 8 dofs, 3 SP rows, 2 MP rows
        assert_eq!(m.num_dof_equations(), 8);
        assert_eq!(m.num_eqn(), 13);
        let k = m
            .assemble_dense(&d, MatrixCoefficients::stiffness(), Tangent::Current)
            .unwrap();
        assert_relative_eq!(k, k.transpose());
        assert_eq!(k[(12, 12)], 0.0);
    }
}
