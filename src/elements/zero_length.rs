//! Zero-length elements between coincident nodes
//!
//! Local directions are numbered 1 to 6: translations along local x, y, z
//! followed by rotations about them. The local frame comes from the vectors
//! `x` and `yp`: z = x × yp and y = z × x.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{check_nodes, no_section, not_initialized, ElementBehavior, ElementResponse, Node};
use crate::error::{FEAError, FEAResult};
use crate::loads::ElementLoad;
use crate::materials::UniaxialMaterial;
use crate::math::{Mat3, Vec3};
use crate::sections::{ResponseCode, Section};

fn orientation(x: &Vec3, yp: &Vec3) -> FEAResult<Mat3> {
    let z = x.cross(yp);
    if z.norm() <= 1e-12 * x.norm() * yp.norm() || x.norm() < 1e-12 {
        return Err(FEAError::InvalidGeometry(
            "orientation vectors x and yp are zero or parallel".to_string(),
        ));
    }
    let y = z.cross(x);
    let (x, y, z) = (x.normalize(), y.normalize(), z.normalize());
    Ok(Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
}

/// Row of the compatibility matrix giving the relative displacement of node
/// J with respect to node I along local direction `dir` (0-based)
fn direction_row(
    axes: &Mat3,
    dir: usize,
    ndm: usize,
    ndf: usize,
    sign: f64,
) -> FEAResult<DVector<f64>> {
    let axis = axes.row(dir % 3);
    let mut row = DVector::zeros(2 * ndf);
    // (global dof, global component) pairs that carry the requested motion
    let slots: Vec<(usize, usize)> = match (dir < 3, ndm, ndf) {
        (true, 2, f) if f >= 2 => vec![(0, 0), (1, 1)],
        (true, 3, f) if f >= 3 => vec![(0, 0), (1, 1), (2, 2)],
        (false, 2, 3) => vec![(2, 2)],
        (false, 3, 6) => vec![(3, 0), (4, 1), (5, 2)],
        _ => {
            return Err(FEAError::InvalidInput(format!(
                "direction {} is not available for ndm {ndm}, ndf {ndf}",
                dir + 1
            )))
        }
    };
    let mut reach = 0.0;
    for (dof, comp) in slots {
        let a = sign * axis[comp];
        row[dof] = -a;
        row[ndf + dof] = a;
        reach += a.abs();
    }
    if reach < 1e-12 {
        return Err(FEAError::InvalidInput(format!(
            "local direction {} has no component in the model plane",
            dir + 1
        )));
    }
    Ok(row)
}

fn check_coincident(tag: usize, nodes: &[&Node]) -> FEAResult<(usize, usize)> {
    let (a, b) = (nodes[0], nodes[1]);
    if a.ndm() != b.ndm() || a.ndf() != b.ndf() {
        return Err(FEAError::InvalidInput(format!(
            "zero-length element {tag} joins incompatible nodes {} and {}",
            a.tag, b.tag
        )));
    }
    let gap = a.distance_to(b);
    if gap > 1e-10 {
        log::warn!("zero-length element {tag} has nodes {gap:e} apart");
    }
    Ok((a.ndm(), a.ndf()))
}

/// Uniaxial springs along local directions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroLength {
    tag: usize,
    nodes: [usize; 2],
    /// (direction 0..=5, material)
    springs: Vec<(usize, UniaxialMaterial)>,
    x: Vec3,
    yp: Vec3,
    ndf: usize,
    /// Compatibility matrix, one row per spring
    b: Option<DMatrix<f64>>,
}

impl ZeroLength {
    /// Springs given as (direction 1..=6, material)
    pub fn new(
        tag: usize,
        node_i: usize,
        node_j: usize,
        springs: Vec<(usize, UniaxialMaterial)>,
    ) -> FEAResult<Self> {
        if springs.is_empty() {
            return Err(FEAError::InvalidInput(format!("zero-length element {tag} has no springs")));
        }
        let mut dirs = Vec::with_capacity(springs.len());
        let mut converted = Vec::with_capacity(springs.len());
        for (dir, mat) in springs {
            if !(1..=6).contains(&dir) || dirs.contains(&dir) {
                return Err(FEAError::InvalidInput(format!(
                    "zero-length element {tag}: invalid or repeated direction {dir}"
                )));
            }
            dirs.push(dir);
            converted.push((dir - 1, mat));
        }
        Ok(Self {
            tag,
            nodes: [node_i, node_j],
            springs: converted,
            x: Vec3::x(),
            yp: Vec3::y(),
            ndf: 0,
            b: None,
        })
    }

    pub fn with_orientation(mut self, x: Vec3, yp: Vec3) -> Self {
        self.x = x;
        self.yp = yp;
        self
    }

    fn b(&self) -> FEAResult<&DMatrix<f64>> {
        self.b.as_ref().ok_or_else(|| not_initialized(self.tag))
    }

    fn diagonal(&self, f: impl Fn(&UniaxialMaterial) -> f64) -> FEAResult<DMatrix<f64>> {
        let b = self.b()?;
        let d = DVector::from_iterator(self.springs.len(), self.springs.iter().map(|(_, m)| f(m)));
        Ok(b.transpose() * DMatrix::from_diagonal(&d) * b)
    }

    fn forces(&self) -> DVector<f64> {
        DVector::from_iterator(self.springs.len(), self.springs.iter().map(|(_, m)| m.stress()))
    }
}

impl ElementBehavior for ZeroLength {
    fn tag(&self) -> usize {
        self.tag
    }

    fn class_name(&self) -> &'static str {
        "ZeroLength"
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        2 * self.ndf
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let (ndm, ndf) = check_coincident(self.tag, nodes)?;
        let axes = orientation(&self.x, &self.yp)?;
        let mut b = DMatrix::zeros(self.springs.len(), 2 * ndf);
        for (k, (dir, _)) in self.springs.iter().enumerate() {
            b.set_row(k, &direction_row(&axes, *dir, ndm, ndf, 1.0)?.transpose());
        }
        self.ndf = ndf;
        self.b = Some(b);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.b.is_some()
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let b = self.b()?.clone();
        let u = super::gather(nodes, Node::trial_disp);
        let v = super::gather(nodes, Node::trial_vel);
        let (strain, rate) = (&b * u, &b * v);
        let mut ok = true;
        for (k, (_, m)) in self.springs.iter_mut().enumerate() {
            ok &= m.set_trial_strain(strain[k], rate[k]).is_ok();
        }
        if !ok {
            return Err(FEAError::NonFinite(format!("spring of element {}", self.tag)));
        }
        Ok(())
    }

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.diagonal(UniaxialMaterial::tangent)
    }

    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.diagonal(UniaxialMaterial::initial_tangent)
    }

    fn damping(&self) -> FEAResult<DMatrix<f64>> {
        self.diagonal(UniaxialMaterial::damping_tangent)
    }

    fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        Ok(self.b()?.transpose() * self.forces())
    }

    fn accepts_load(&self, _load: &ElementLoad) -> bool {
        false
    }

    fn add_load(&mut self, load: &ElementLoad, _factor: f64) -> FEAResult<()> {
        Err(FEAError::InvalidInput(format!(
            "zero-length element cannot take a {} load",
            load.kind_name()
        )))
    }

    fn zero_load(&mut self) {}

    fn commit_state(&mut self) {
        self.springs.iter_mut().for_each(|(_, m)| m.commit_state());
    }

    fn revert_to_last_commit(&mut self) {
        self.springs.iter_mut().for_each(|(_, m)| m.revert_to_last_commit());
    }

    fn revert_to_start(&mut self) {
        self.springs.iter_mut().for_each(|(_, m)| m.revert_to_start());
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.b()?;
        let strains = || {
            DVector::from_iterator(self.springs.len(), self.springs.iter().map(|(_, m)| m.strain()))
        };
        match which {
            ElementResponse::GlobalForce => self.resisting_force(),
            ElementResponse::BasicForce | ElementResponse::Stresses => Ok(self.forces()),
            ElementResponse::BasicDeformation => Ok(strains()),
            other => Err(FEAError::InvalidInput(format!(
                "zero-length element {} has no {other:?} response",
                self.tag
            ))),
        }
    }
}

/// Local direction (0-based) and sign carried by a section response code
///
/// The moment about local z is measured against the rotation about z, so
/// frame sections keep their sign convention when used as a hinge.
fn code_direction(code: ResponseCode) -> (usize, f64) {
    match code {
        ResponseCode::P => (0, 1.0),
        ResponseCode::Vy => (1, 1.0),
        ResponseCode::Vz => (2, 1.0),
        ResponseCode::T => (3, 1.0),
        ResponseCode::My => (4, 1.0),
        ResponseCode::Mz => (5, -1.0),
    }
}

/// A frame section between coincident nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroLengthSection {
    tag: usize,
    nodes: [usize; 2],
    section: Section,
    x: Vec3,
    yp: Vec3,
    ndf: usize,
    a: Option<DMatrix<f64>>,
}

impl ZeroLengthSection {
    pub fn new(tag: usize, node_i: usize, node_j: usize, section: Section) -> Self {
        Self {
            tag,
            nodes: [node_i, node_j],
            section,
            x: Vec3::x(),
            yp: Vec3::y(),
            ndf: 0,
            a: None,
        }
    }

    pub fn with_orientation(mut self, x: Vec3, yp: Vec3) -> Self {
        self.x = x;
        self.yp = yp;
        self
    }

    pub fn section(&self) -> &Section {
        &self.section
    }

    fn a(&self) -> FEAResult<&DMatrix<f64>> {
        self.a.as_ref().ok_or_else(|| not_initialized(self.tag))
    }
}

impl ElementBehavior for ZeroLengthSection {
    fn tag(&self) -> usize {
        self.tag
    }

    fn class_name(&self) -> &'static str {
        "ZeroLengthSection"
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        2 * self.ndf
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let (ndm, ndf) = check_coincident(self.tag, nodes)?;
        let axes = orientation(&self.x, &self.yp)?;
        let codes = self.section.codes();
        let mut a = DMatrix::zeros(codes.len(), 2 * ndf);
        for (k, code) in codes.iter().enumerate() {
            let (dir, sign) = code_direction(*code);
            a.set_row(k, &direction_row(&axes, dir, ndm, ndf, sign)?.transpose());
        }
        self.ndf = ndf;
        self.a = Some(a);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.a.is_some()
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let e = self.a()? * super::gather(nodes, Node::trial_disp);
        if !self.section.set_trial_deformation(&e).is_ok() {
            return Err(FEAError::NonFinite(format!("section of element {}", self.tag)));
        }
        Ok(())
    }

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        let a = self.a()?;
        Ok(a.transpose() * self.section.tangent() * a)
    }

    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        let a = self.a()?;
        Ok(a.transpose() * self.section.initial_tangent() * a)
    }

    fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        Ok(self.a()?.transpose() * self.section.stress_resultant())
    }

    fn accepts_load(&self, _load: &ElementLoad) -> bool {
        false
    }

    fn add_load(&mut self, load: &ElementLoad, _factor: f64) -> FEAResult<()> {
        Err(FEAError::InvalidInput(format!(
            "zero-length section cannot take a {} load",
            load.kind_name()
        )))
    }

    fn zero_load(&mut self) {}

    fn commit_state(&mut self) {
        self.section.commit_state();
    }

    fn revert_to_last_commit(&mut self) {
        self.section.revert_to_last_commit();
    }

    fn revert_to_start(&mut self) {
        self.section.revert_to_start();
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.a()?;
        match which {
            ElementResponse::GlobalForce => self.resisting_force(),
            ElementResponse::BasicForce | ElementResponse::SectionForce(0) => {
                Ok(self.section.stress_resultant())
            }
            ElementResponse::BasicDeformation | ElementResponse::SectionDeformation(0) => {
                Ok(self.section.deformation())
            }
            ElementResponse::SectionForce(i) | ElementResponse::SectionDeformation(i) => {
                Err(no_section(self.tag, i))
            }
            other => Err(FEAError::InvalidInput(format!(
                "zero-length section {} has no {other:?} response",
                self.tag
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::ElasticSection2d;
    use approx::assert_relative_eq;

    fn nodes() -> (Node, Node) {
        (
            Node::new(1, &[1.0, 1.0], 3).unwrap(),
            Node::new(2, &[1.0, 1.0], 3).unwrap(),
        )
    }

    #[test]
    fn test_spring_along_rotated_axis() {
        let (n1, mut n2) = nodes();
        let mut el = ZeroLength::new(1, 1, 2, vec![(1, UniaxialMaterial::elastic(10.0))])
            .unwrap()
            .with_orientation(Vec3::new(0.0, 1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        el.initialize(&[&n1, &n2]).unwrap();
        n2.set_trial_disp(&DVector::from_vec(vec![0.5, 0.2, 0.0]));
        el.update(&[&n1, &n2]).unwrap();
        let p = el.resisting_force().unwrap();
        assert_relative_eq!(p[4], 2.0, max_relative = 1e-12);
        assert_relative_eq!(p[3], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], -2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_invalid_directions() {
        assert!(ZeroLength::new(1, 1, 2, vec![(7, UniaxialMaterial::elastic(1.0))]).is_err());
        let (n1, n2) = nodes();
        let mut el = ZeroLength::new(1, 1, 2, vec![(4, UniaxialMaterial::elastic(1.0))]).unwrap();
        assert!(el.initialize(&[&n1, &n2]).is_err());
    }

    #[test]
    fn test_section_moment_opposes_local_z_rotation() {
        let (n1, mut n2) = nodes();
        let sec = Section::from(ElasticSection2d::new(1.0, 5.0, 3.0));
        let mut el = ZeroLengthSection::new(1, 1, 2, sec);
        el.initialize(&[&n1, &n2]).unwrap();
        n2.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, 0.01]));
        el.update(&[&n1, &n2]).unwrap();
        let e = el.response(ElementResponse::SectionDeformation(0)).unwrap();
        assert_relative_eq!(e[1], -0.01, max_relative = 1e-12);
        let s = el.response(ElementResponse::SectionForce(0)).unwrap();
        assert_relative_eq!(s[1], -0.03, max_relative = 1e-12);
        // The nodal moment still resists the imposed rotation
        let p = el.resisting_force().unwrap();
        assert_relative_eq!(p[5], 0.03, max_relative = 1e-12);
    }
}
