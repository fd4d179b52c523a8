//! Elastic beam-columns with closed-form basic stiffness

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{check_nodes, not_initialized, ElementBehavior, ElementResponse, MassType, Node};
use crate::error::{FEAError, FEAResult};
use crate::loads::ElementLoad;
use crate::math::Mat3;
use crate::sections::{CrossSectionProperties, DeformationPlane};
use crate::transform::{CrdTransf, CrdTransfBehavior};

/// Fixed-end forces from element loads
///
/// `q0` lives in the basic system, `p0` holds the end reactions that the
/// basic system cannot carry (axial and shear at each end).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FixedEnd {
    q0: Vec<f64>,
    p0: Vec<f64>,
}

impl FixedEnd {
    fn new(spatial: bool) -> Self {
        if spatial {
            Self {
                q0: vec![0.0; 6],
                p0: vec![0.0; 5],
            }
        } else {
            Self {
                q0: vec![0.0; 3],
                p0: vec![0.0; 3],
            }
        }
    }

    fn spatial(&self) -> bool {
        self.q0.len() == 6
    }

    fn zero(&mut self) {
        self.q0.iter_mut().for_each(|v| *v = 0.0);
        self.p0.iter_mut().for_each(|v| *v = 0.0);
    }

    fn add_uniform(&mut self, l: f64, wx: f64, wy: f64, wz: f64) {
        let v = 0.5 * wy * l;
        let m = v * l / 6.0;
        let p = wx * l;
        self.p0[0] -= p;
        self.p0[1] -= v;
        self.p0[2] -= v;
        self.q0[0] -= 0.5 * p;
        self.q0[1] -= m;
        self.q0[2] += m;
        if self.spatial() {
            let vz = 0.5 * wz * l;
            let my = vz * l / 6.0;
            self.p0[3] -= vz;
            self.p0[4] -= vz;
            self.q0[3] += my;
            self.q0[4] -= my;
        }
    }

    fn add_point(&mut self, l: f64, n: f64, py: f64, pz: f64, x: f64) -> FEAResult<()> {
        if !(0.0..=1.0).contains(&x) {
            return Err(FEAError::InvalidInput(format!(
                "point load position {x} outside [0, 1]"
            )));
        }
        let a = x * l;
        let b = l - a;
        let ab_l2 = a * b / (l * l);
        let vy2 = py * x;
        self.p0[0] -= n;
        self.p0[1] -= py - vy2;
        self.p0[2] -= vy2;
        self.q0[0] -= n * x;
        self.q0[1] -= ab_l2 * b * py;
        self.q0[2] += ab_l2 * a * py;
        if self.spatial() {
            let vz2 = pz * x;
            self.p0[3] -= pz - vz2;
            self.p0[4] -= vz2;
            self.q0[3] += ab_l2 * b * pz;
            self.q0[4] -= ab_l2 * a * pz;
        }
        Ok(())
    }

    /// Restrained imposed deformation: q0 -= kb · v_imposed
    fn add_imposed(&mut self, kb: &DMatrix<f64>, v: &DVector<f64>) {
        let dq = kb * v;
        for (q, d) in self.q0.iter_mut().zip(dq.iter()) {
            *q -= d;
        }
    }
}

/// Basic deformations produced by section deformations varying linearly
/// between `back` (node I) and `front` (node J)
pub(super) fn imposed_basic_deformation(
    l: f64,
    back: &DeformationPlane,
    front: &DeformationPlane,
    spatial: bool,
) -> DVector<f64> {
    let rot = |k1: f64, k2: f64| (l * (-k1 / 3.0 - k2 / 6.0), l * (k1 / 6.0 + k2 / 3.0));
    let axial = 0.5 * l * (back.eps0 + front.eps0);
    let (zi, zj) = rot(back.kappa_z, front.kappa_z);
    if spatial {
        let (yi, yj) = rot(back.kappa_y, front.kappa_y);
        DVector::from_vec(vec![axial, zi, zj, yi, yj, 0.0])
    } else {
        DVector::from_vec(vec![axial, zi, zj])
    }
}

fn apply_beam_load(
    fe: &mut FixedEnd,
    kb: &DMatrix<f64>,
    l: f64,
    load: &ElementLoad,
    factor: f64,
) -> FEAResult<()> {
    match load {
        ElementLoad::BeamUniform {
            axial,
            trans_y,
            trans_z,
        } => {
            fe.add_uniform(l, axial * factor, trans_y * factor, trans_z * factor);
            Ok(())
        }
        ElementLoad::BeamPoint {
            axial,
            trans_y,
            trans_z,
            x,
        } => fe.add_point(l, axial * factor, trans_y * factor, trans_z * factor, *x),
        ElementLoad::BeamStrain { back, front } => {
            let v = imposed_basic_deformation(l, &back.scaled(factor), &front.scaled(factor), fe.spatial());
            fe.add_imposed(kb, &v);
            Ok(())
        }
        _ => Err(FEAError::InvalidInput(format!(
            "beam cannot take a {} load",
            load.kind_name()
        ))),
    }
}

fn is_beam_load(load: &ElementLoad) -> bool {
    matches!(
        load,
        ElementLoad::BeamUniform { .. } | ElementLoad::BeamPoint { .. } | ElementLoad::BeamStrain { .. }
    )
}

fn check_ndf(tag: usize, nodes: &[&Node], ndf: usize) -> FEAResult<()> {
    for n in nodes {
        if n.ndf() != ndf {
            return Err(FEAError::InvalidInput(format!(
                "element {tag} needs nodes with {ndf} dofs, node {} has {}",
                n.tag,
                n.ndf()
            )));
        }
    }
    Ok(())
}

pub(crate) fn initialize_transf(
    tag: usize,
    transf: &mut CrdTransf,
    nodes: &[&Node],
    ndf: usize,
) -> FEAResult<Mat3> {
    check_ndf(tag, nodes, ndf)?;
    transf.behavior_mut().initialize(nodes[0].coords(), nodes[1].coords())?;
    Ok(transf.behavior().local_axes())
}

pub(crate) fn update_transf(tag: usize, transf: &mut CrdTransf, nodes: &[&Node]) -> FEAResult<()> {
    if !transf.behavior().is_initialized() {
        return Err(not_initialized(tag));
    }
    transf
        .behavior_mut()
        .update(nodes[0].trial_disp().as_slice(), nodes[1].trial_disp().as_slice())
}

/// Consistent mass in local coordinates for a planar member
fn consistent_mass_local_2d(m: f64, l: f64) -> DMatrix<f64> {
    let c = m / 420.0;
    let mut ml = DMatrix::zeros(6, 6);
    ml[(0, 0)] = m / 3.0;
    ml[(3, 3)] = m / 3.0;
    ml[(0, 3)] = m / 6.0;
    ml[(3, 0)] = m / 6.0;
    let bend = [
        (1, 1, 156.0),
        (1, 2, 22.0 * l),
        (1, 4, 54.0),
        (1, 5, -13.0 * l),
        (2, 2, 4.0 * l * l),
        (2, 4, 13.0 * l),
        (2, 5, -3.0 * l * l),
        (4, 4, 156.0),
        (4, 5, -22.0 * l),
        (5, 5, 4.0 * l * l),
    ];
    for (i, j, v) in bend {
        ml[(i, j)] = c * v;
        ml[(j, i)] = c * v;
    }
    ml
}

/// Consistent mass in local coordinates for a space member; `jm` is the
/// polar mass moment of inertia per unit length
fn consistent_mass_local_3d(m: f64, jm: f64, l: f64) -> DMatrix<f64> {
    let c = m / 420.0;
    let mut ml = DMatrix::zeros(12, 12);
    let mut set = |i: usize, j: usize, v: f64| {
        ml[(i, j)] = v;
        ml[(j, i)] = v;
    };
    set(0, 0, m / 3.0);
    set(6, 6, m / 3.0);
    set(0, 6, m / 6.0);
    set(3, 3, jm * l / 3.0);
    set(9, 9, jm * l / 3.0);
    set(3, 9, jm * l / 6.0);
    // v, rz
    set(1, 1, 156.0 * c);
    set(1, 5, 22.0 * l * c);
    set(1, 7, 54.0 * c);
    set(1, 11, -13.0 * l * c);
    set(5, 5, 4.0 * l * l * c);
    set(5, 7, 13.0 * l * c);
    set(5, 11, -3.0 * l * l * c);
    set(7, 7, 156.0 * c);
    set(7, 11, -22.0 * l * c);
    set(11, 11, 4.0 * l * l * c);
    // w, ry
    set(2, 2, 156.0 * c);
    set(2, 4, -22.0 * l * c);
    set(2, 8, 54.0 * c);
    set(2, 10, 13.0 * l * c);
    set(4, 4, 4.0 * l * l * c);
    set(4, 8, -13.0 * l * c);
    set(4, 10, -3.0 * l * l * c);
    set(8, 8, 156.0 * c);
    set(8, 10, 22.0 * l * c);
    set(10, 10, 4.0 * l * l * c);
    ml
}

fn lumped_translational_mass(m: f64, ndf: usize, ndm: usize) -> DMatrix<f64> {
    let mut mg = DMatrix::zeros(2 * ndf, 2 * ndf);
    for node in 0..2 {
        for d in 0..ndm {
            mg[(node * ndf + d, node * ndf + d)] = 0.5 * m;
        }
    }
    mg
}

fn basic_force(kb: &DMatrix<f64>, ub: &DVector<f64>, q0: &[f64]) -> DVector<f64> {
    kb * ub + DVector::from_column_slice(q0)
}

/// Planar elastic beam-column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticBeam2d {
    tag: usize,
    nodes: [usize; 2],
    pub props: CrossSectionProperties,
    pub mass_type: MassType,
    transf: CrdTransf,
    fixed_end: FixedEnd,
    axes0: Option<Mat3>,
}

impl ElasticBeam2d {
    pub fn new(
        tag: usize,
        node_i: usize,
        node_j: usize,
        props: CrossSectionProperties,
        transf: CrdTransf,
    ) -> FEAResult<Self> {
        if transf.is_3d() {
            return Err(FEAError::InvalidInput(format!(
                "element {tag}: planar beam needs a 2D transformation"
            )));
        }
        if !(props.e > 0.0 && props.a > 0.0 && props.iz > 0.0) {
            return Err(FEAError::InvalidInput(format!(
                "element {tag}: E, A and Iz must be positive"
            )));
        }
        Ok(Self {
            tag,
            nodes: [node_i, node_j],
            props,
            mass_type: MassType::Lumped,
            transf,
            fixed_end: FixedEnd::new(false),
            axes0: None,
        })
    }

    pub fn with_mass_type(mut self, mass_type: MassType) -> Self {
        self.mass_type = mass_type;
        self
    }

    pub fn transformation(&self) -> &CrdTransf {
        &self.transf
    }

    pub fn length(&self) -> f64 {
        self.transf.behavior().initial_length()
    }

    fn kb(&self) -> DMatrix<f64> {
        let l = self.length();
        let ea = self.props.e * self.props.a / l;
        let ei = self.props.e * self.props.iz / l;
        DMatrix::from_row_slice(3, 3, &[ea, 0.0, 0.0, 0.0, 4.0 * ei, 2.0 * ei, 0.0, 2.0 * ei, 4.0 * ei])
    }

    fn q(&self) -> DVector<f64> {
        basic_force(&self.kb(), &self.transf.behavior().basic_trial_disp(), &self.fixed_end.q0)
    }

    fn axes0(&self) -> FEAResult<&Mat3> {
        self.axes0.as_ref().ok_or_else(|| not_initialized(self.tag))
    }
}

impl ElementBehavior for ElasticBeam2d {
    fn tag(&self) -> usize {
        self.tag
    }

    fn class_name(&self) -> &'static str {
        "ElasticBeam2d"
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        6
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        self.axes0 = Some(initialize_transf(self.tag, &mut self.transf, nodes, 3)?);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.axes0.is_some()
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        update_transf(self.tag, &mut self.transf, nodes)
    }

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.axes0()?;
        Ok(self.transf.behavior().global_stiff(&self.kb(), &self.q()))
    }

    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.axes0()?;
        Ok(self.transf.behavior().initial_global_stiff(&self.kb()))
    }

    fn mass(&self) -> FEAResult<DMatrix<f64>> {
        let axes = self.axes0()?;
        let m = self.props.linear_density() * self.length();
        Ok(match self.mass_type {
            MassType::Lumped => lumped_translational_mass(m, 3, 2),
            MassType::Consistent => {
                let t = crate::transform::rotation_2d(axes[(0, 0)], axes[(0, 1)]);
                t.transpose() * consistent_mass_local_2d(m, self.length()) * t
            }
        })
    }

    fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        self.axes0()?;
        let p0 = DVector::from_column_slice(&self.fixed_end.p0);
        Ok(self.transf.behavior().global_resisting_force(&self.q(), &p0))
    }

    fn accepts_load(&self, load: &ElementLoad) -> bool {
        is_beam_load(load)
    }

    fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
        self.axes0()?;
        let kb = self.kb();
        let length = self.length();
        apply_beam_load(&mut self.fixed_end, &kb, length, load, factor)
    }

    fn zero_load(&mut self) {
        self.fixed_end.zero();
    }

    fn commit_state(&mut self) {
        self.transf.behavior_mut().commit();
    }

    fn revert_to_last_commit(&mut self) {
        self.transf.behavior_mut().revert_to_last_commit();
    }

    fn revert_to_start(&mut self) {
        self.transf.behavior_mut().revert_to_start();
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.axes0()?;
        match which {
            ElementResponse::GlobalForce => self.resisting_force(),
            ElementResponse::BasicForce => Ok(self.q()),
            ElementResponse::BasicDeformation => Ok(self.transf.behavior().basic_trial_disp()),
            other => Err(FEAError::InvalidInput(format!(
                "{} has no {other:?} response",
                self.class_name()
            ))),
        }
    }
}

/// Space elastic beam-column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticBeam3d {
    tag: usize,
    nodes: [usize; 2],
    pub props: CrossSectionProperties,
    pub mass_type: MassType,
    transf: CrdTransf,
    fixed_end: FixedEnd,
    axes0: Option<Mat3>,
}

impl ElasticBeam3d {
    pub fn new(
        tag: usize,
        node_i: usize,
        node_j: usize,
        props: CrossSectionProperties,
        transf: CrdTransf,
    ) -> FEAResult<Self> {
        if !transf.is_3d() {
            return Err(FEAError::InvalidInput(format!(
                "element {tag}: space beam needs a 3D transformation"
            )));
        }
        let p = &props;
        if !(p.e > 0.0 && p.g > 0.0 && p.a > 0.0 && p.iz > 0.0 && p.iy > 0.0 && p.j > 0.0) {
            return Err(FEAError::InvalidInput(format!(
                "element {tag}: E, G, A, Iz, Iy and J must be positive"
            )));
        }
        Ok(Self {
            tag,
            nodes: [node_i, node_j],
            props,
            mass_type: MassType::Lumped,
            transf,
            fixed_end: FixedEnd::new(true),
            axes0: None,
        })
    }

    pub fn with_mass_type(mut self, mass_type: MassType) -> Self {
        self.mass_type = mass_type;
        self
    }

    pub fn transformation(&self) -> &CrdTransf {
        &self.transf
    }

    pub fn length(&self) -> f64 {
        self.transf.behavior().initial_length()
    }

    fn kb(&self) -> DMatrix<f64> {
        let p = &self.props;
        let l = self.length();
        let ez = p.e * p.iz / l;
        let ey = p.e * p.iy / l;
        let mut kb = DMatrix::zeros(6, 6);
        kb[(0, 0)] = p.e * p.a / l;
        kb[(1, 1)] = 4.0 * ez;
        kb[(2, 2)] = 4.0 * ez;
        kb[(1, 2)] = 2.0 * ez;
        kb[(2, 1)] = 2.0 * ez;
        kb[(3, 3)] = 4.0 * ey;
        kb[(4, 4)] = 4.0 * ey;
        kb[(3, 4)] = 2.0 * ey;
        kb[(4, 3)] = 2.0 * ey;
        kb[(5, 5)] = p.g * p.j / l;
        kb
    }

    fn q(&self) -> DVector<f64> {
        basic_force(&self.kb(), &self.transf.behavior().basic_trial_disp(), &self.fixed_end.q0)
    }

    fn axes0(&self) -> FEAResult<&Mat3> {
        self.axes0.as_ref().ok_or_else(|| not_initialized(self.tag))
    }
}

impl ElementBehavior for ElasticBeam3d {
    fn tag(&self) -> usize {
        self.tag
    }

    fn class_name(&self) -> &'static str {
        "ElasticBeam3d"
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        12
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        self.axes0 = Some(initialize_transf(self.tag, &mut self.transf, nodes, 6)?);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.axes0.is_some()
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        update_transf(self.tag, &mut self.transf, nodes)
    }

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.axes0()?;
        Ok(self.transf.behavior().global_stiff(&self.kb(), &self.q()))
    }

    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.axes0()?;
        Ok(self.transf.behavior().initial_global_stiff(&self.kb()))
    }

    fn mass(&self) -> FEAResult<DMatrix<f64>> {
        let axes = self.axes0()?;
        let m = self.props.linear_density() * self.length();
        Ok(match self.mass_type {
            MassType::Lumped => lumped_translational_mass(m, 6, 3),
            MassType::Consistent => {
                let jm = self.props.rho * self.props.polar_inertia();
                let t = crate::transform::rotation_blocks(axes, 4);
                t.transpose() * consistent_mass_local_3d(m, jm, self.length()) * t
            }
        })
    }

    fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        self.axes0()?;
        let p0 = DVector::from_column_slice(&self.fixed_end.p0);
        Ok(self.transf.behavior().global_resisting_force(&self.q(), &p0))
    }

    fn accepts_load(&self, load: &ElementLoad) -> bool {
        is_beam_load(load)
    }

    fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
        self.axes0()?;
        let kb = self.kb();
        let length = self.length();
        apply_beam_load(&mut self.fixed_end, &kb, length, load, factor)
    }

    fn zero_load(&mut self) {
        self.fixed_end.zero();
    }

    fn commit_state(&mut self) {
        self.transf.behavior_mut().commit();
    }

    fn revert_to_last_commit(&mut self) {
        self.transf.behavior_mut().revert_to_last_commit();
    }

    fn revert_to_start(&mut self) {
        self.transf.behavior_mut().revert_to_start();
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.axes0()?;
        match which {
            ElementResponse::GlobalForce => self.resisting_force(),
            ElementResponse::BasicForce => Ok(self.q()),
            ElementResponse::BasicDeformation => Ok(self.transf.behavior().basic_trial_disp()),
            other => Err(FEAError::InvalidInput(format!(
                "{} has no {other:?} response",
                self.class_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use approx::assert_relative_eq;

    fn props_2d() -> CrossSectionProperties {
        CrossSectionProperties::new(2.0e11, 8.0e10, 0.01, 8.0e-6, 8.0e-6, 1.0e-6).with_material(
            2.0e11, 8.0e10, 7850.0,
        )
    }

    fn nodes_2d(l: f64) -> (Node, Node) {
        (
            Node::new(1, &[0.0, 0.0], 3).unwrap(),
            Node::new(2, &[l, 0.0], 3).unwrap(),
        )
    }

    #[test]
    fn test_cantilever_tip_force() {
        let l = 2.0;
        let (n1, mut n2) = nodes_2d(l);
        let mut beam = ElasticBeam2d::new(1, 1, 2, props_2d(), CrdTransf::linear_2d()).unwrap();
        beam.initialize(&[&n1, &n2]).unwrap();
        // Tip deflection of a cantilever under unit tip load
        let ei = 2.0e11 * 8.0e-6;
        let v = l.powi(3) / (3.0 * ei);
        let th = l * l / (2.0 * ei);
        n2.set_trial_disp(&DVector::from_vec(vec![0.0, v, th]));
        beam.update(&[&n1, &n2]).unwrap();
        let p = beam.resisting_force().unwrap();
        assert_relative_eq!(p[4], 1.0, max_relative = 1e-10);
        assert_relative_eq!(p[5], 0.0, epsilon = 1e-9);
        assert_relative_eq!(p[1], -1.0, max_relative = 1e-10);
        assert_relative_eq!(p[2], -l, max_relative = 1e-10);
    }

    #[test]
    fn test_uniform_load_fixed_end_forces() {
        let l = 3.0;
        let (n1, n2) = nodes_2d(l);
        let mut beam = ElasticBeam2d::new(1, 1, 2, props_2d(), CrdTransf::linear_2d()).unwrap();
        beam.initialize(&[&n1, &n2]).unwrap();
        beam.add_load(&ElementLoad::beam_uniform(-10.0, 0.0, 0.0), 1.0).unwrap();
        let p = beam.resisting_force().unwrap();
        assert_relative_eq!(p[1], 15.0, max_relative = 1e-12);
        assert_relative_eq!(p[4], 15.0, max_relative = 1e-12);
        assert_relative_eq!(p[2], 10.0 * l * l / 12.0, max_relative = 1e-12);
        assert_relative_eq!(p[5], -10.0 * l * l / 12.0, max_relative = 1e-12);
        beam.zero_load();
        assert_relative_eq!(beam.resisting_force().unwrap().norm(), 0.0);
    }

    #[test]
    fn test_point_load_equilibrium() {
        let l = 4.0;
        let (n1, n2) = nodes_2d(l);
        let mut beam = ElasticBeam2d::new(1, 1, 2, props_2d(), CrdTransf::linear_2d()).unwrap();
        beam.initialize(&[&n1, &n2]).unwrap();
        beam.add_load(&ElementLoad::beam_point(-8.0, 0.0, 0.25, 2.0), 1.0).unwrap();
        let p = beam.resisting_force().unwrap();
        assert_relative_eq!(p[1] + p[4], 8.0, max_relative = 1e-12);
        assert_relative_eq!(p[0] + p[3], -2.0, max_relative = 1e-12);
        // Moments about node I balance the load at a = 1
        assert_relative_eq!(p[2] + p[5] + p[4] * l, 8.0 * 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_uniform_thermal_strain_is_restrained() {
        let l = 2.0;
        let (n1, n2) = nodes_2d(l);
        let mut beam = ElasticBeam2d::new(1, 1, 2, props_2d(), CrdTransf::linear_2d()).unwrap();
        beam.initialize(&[&n1, &n2]).unwrap();
        beam.add_load(&ElementLoad::beam_strain(DeformationPlane::axial(1e-4)), 1.0).unwrap();
        let q = beam.response(ElementResponse::BasicForce).unwrap();
        assert_relative_eq!(q[0], -2.0e11 * 0.01 * 1e-4, max_relative = 1e-12);
    }

    #[test]
    fn test_mass_total_is_rotation_invariant() {
        let (n1, _) = nodes_2d(1.0);
        let n2 = Node::new(2, &[0.6, 0.8], 3).unwrap();
        let mut beam = ElasticBeam2d::new(1, 1, 2, props_2d(), CrdTransf::linear_2d())
            .unwrap()
            .with_mass_type(MassType::Consistent);
        beam.initialize(&[&n1, &n2]).unwrap();
        let m = beam.mass().unwrap();
        let ux = DVector::from_vec(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_relative_eq!(ux.dot(&(&m * &ux)), 7850.0 * 0.01, max_relative = 1e-12);
    }

    #[test]
    fn test_3d_torsion() {
        let n1 = Node::new(1, &[0.0, 0.0, 0.0], 6).unwrap();
        let mut n2 = Node::new(2, &[1.5, 0.0, 0.0], 6).unwrap();
        let props = CrossSectionProperties::new(2.0e11, 8.0e10, 0.01, 8.0e-6, 4.0e-6, 1.0e-6);
        let mut beam =
            ElasticBeam3d::new(1, 1, 2, props, CrdTransf::linear_3d(Some(Vec3::new(0.0, 0.0, 1.0))))
                .unwrap();
        beam.initialize(&[&n1, &n2]).unwrap();
        let mut u = DVector::zeros(6);
        u[3] = 1e-3;
        n2.set_trial_disp(&u);
        beam.update(&[&n1, &n2]).unwrap();
        let p = beam.resisting_force().unwrap();
        assert_relative_eq!(p[9], 8.0e10 * 1.0e-6 * 1e-3 / 1.5, max_relative = 1e-12);
        assert_relative_eq!(p[3], -p[9], max_relative = 1e-12);
    }

    #[test]
    fn test_results_before_initialize_are_state_errors() {
        let beam = ElasticBeam2d::new(1, 1, 2, props_2d(), CrdTransf::linear_2d()).unwrap();
        let err = beam.resisting_force().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::State);
    }
}
