//! Four-node MITC4 shell (flat membrane + Mindlin plate)
//!
//! Nodes are ordered counter-clockwise about the normal g3 and map to the
//! natural corners (−1,−1), (1,−1), (1,1), (−1,1). Transverse shear strains
//! are tied at the edge midpoints (Dvorkin–Bathe) and the drilling rotation
//! is coupled to the in-plane rotation through a Hughes–Brezzi penalty.

use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use super::{check_nodes, no_section, not_initialized, ElementBehavior, ElementResponse, Node};
use crate::error::{FEAError, FEAResult};
use crate::loads::ElementLoad;
use crate::math::{Mat3, Vec3};
use crate::sections::{ElasticMembranePlateSection, ShellStrain};

const CORNERS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
const NDOF: usize = 24;

fn gauss_points() -> [(f64, f64); 4] {
    let g = 1.0 / 3f64.sqrt();
    [(-g, -g), (g, -g), (g, g), (-g, g)]
}

fn shape(xi: f64, eta: f64) -> [f64; 4] {
    CORNERS.map(|(a, b)| 0.25 * (1.0 + a * xi) * (1.0 + b * eta))
}

/// (∂N/∂ξ, ∂N/∂η) per node
fn shape_derivatives(xi: f64, eta: f64) -> [(f64, f64); 4] {
    CORNERS.map(|(a, b)| (0.25 * a * (1.0 + b * eta), 0.25 * b * (1.0 + a * xi)))
}

/// Strain-displacement data of one Gauss point, in local dofs
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GaussPoint {
    /// 8 × 24 generalized strain operator
    b: DMatrix<f64>,
    /// θz − ω operator
    drill: DVector<f64>,
    n: [f64; 4],
    /// det J times the quadrature weight
    da: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Geometry {
    /// Rows g1, g2, g3
    axes: Mat3,
    origin: Vec3,
    /// In-plane local coordinates of the nodes
    xy: [[f64; 2]; 4],
    points: Vec<GaussPoint>,
}

impl Geometry {
    fn new(tag: usize, x: [Vec3; 4]) -> FEAResult<Self> {
        let v1 = (x[2] + x[1] - x[0] - x[3]) * 0.5;
        let v2 = (x[3] + x[2] - x[1] - x[0]) * 0.5;
        if v1.norm() < 1e-14 {
            return Err(FEAError::InvalidGeometry(format!("shell {tag} is degenerate")));
        }
        let g1 = v1.normalize();
        let v2 = v2 - g1 * g1.dot(&v2);
        if v2.norm() < 1e-14 * v1.norm() {
            return Err(FEAError::InvalidGeometry(format!("shell {tag} is degenerate")));
        }
        let g2 = v2.normalize();
        let g3 = g1.cross(&g2);
        let origin = (x[0] + x[1] + x[2] + x[3]) * 0.25;
        let xy = x.map(|p| {
            let d = p - origin;
            [d.dot(&g1), d.dot(&g2)]
        });
        let warp = x
            .iter()
            .map(|p| (p - origin).dot(&g3).abs())
            .fold(0.0, f64::max);
        if warp > 1e-6 * v1.norm() {
            log::warn!("shell {tag} is warped by {warp:e}; nodes are projected on its mean plane");
        }
        let mut geometry = Self {
            axes: Mat3::from_rows(&[g1.transpose(), g2.transpose(), g3.transpose()]),
            origin,
            xy,
            points: Vec::with_capacity(4),
        };
        for (xi, eta) in gauss_points() {
            let point = geometry.gauss_point(tag, xi, eta)?;
            geometry.points.push(point);
        }
        Ok(geometry)
    }

    fn jacobian(&self, xi: f64, eta: f64) -> Matrix2<f64> {
        let dn = shape_derivatives(xi, eta);
        let mut j = Matrix2::zeros();
        for (a, (dxi, deta)) in dn.iter().enumerate() {
            let [x, y] = self.xy[a];
            j[(0, 0)] += dxi * x;
            j[(0, 1)] += dxi * y;
            j[(1, 0)] += deta * x;
            j[(1, 1)] += deta * y;
        }
        j
    }

    /// Covariant transverse shear rows (γξ, γη) at a natural point
    fn covariant_shear(&self, xi: f64, eta: f64) -> (DVector<f64>, DVector<f64>) {
        let j = self.jacobian(xi, eta);
        let n = shape(xi, eta);
        let dn = shape_derivatives(xi, eta);
        let mut g_xi = DVector::zeros(NDOF);
        let mut g_eta = DVector::zeros(NDOF);
        for a in 0..4 {
            let k = 6 * a;
            g_xi[k + 2] = dn[a].0;
            g_xi[k + 3] = -n[a] * j[(0, 1)];
            g_xi[k + 4] = n[a] * j[(0, 0)];
            g_eta[k + 2] = dn[a].1;
            g_eta[k + 3] = -n[a] * j[(1, 1)];
            g_eta[k + 4] = n[a] * j[(1, 0)];
        }
        (g_xi, g_eta)
    }

    fn gauss_point(&self, tag: usize, xi: f64, eta: f64) -> FEAResult<GaussPoint> {
        let j = self.jacobian(xi, eta);
        let det = j.determinant();
        if !(det > 0.0) {
            return Err(FEAError::InvalidGeometry(format!(
                "shell {tag} has a non-positive Jacobian; check the node order"
            )));
        }
        let j_inv = j.try_inverse().ok_or(FEAError::SingularMatrix)?;
        let n = shape(xi, eta);
        let dn = shape_derivatives(xi, eta);
        let mut b = DMatrix::zeros(8, NDOF);
        let mut drill = DVector::zeros(NDOF);
        for a in 0..4 {
            let d = j_inv * Vector2::new(dn[a].0, dn[a].1);
            let (nx, ny) = (d[0], d[1]);
            let k = 6 * a;
            // membrane
            b[(0, k)] = nx;
            b[(1, k + 1)] = ny;
            b[(2, k)] = ny;
            b[(2, k + 1)] = nx;
            // bending, βx = θy and βy = −θx
            b[(3, k + 4)] = nx;
            b[(4, k + 3)] = -ny;
            b[(5, k + 4)] = ny;
            b[(5, k + 3)] = -nx;
            drill[k] = 0.5 * ny;
            drill[k + 1] = -0.5 * nx;
            drill[k + 5] = n[a];
        }
        let (xi_a, _) = self.covariant_shear(0.0, -1.0);
        let (xi_c, _) = self.covariant_shear(0.0, 1.0);
        let (_, eta_d) = self.covariant_shear(-1.0, 0.0);
        let (_, eta_b) = self.covariant_shear(1.0, 0.0);
        let g_xi = xi_a * (0.5 * (1.0 - eta)) + xi_c * (0.5 * (1.0 + eta));
        let g_eta = eta_d * (0.5 * (1.0 - xi)) + eta_b * (0.5 * (1.0 + xi));
        for c in 0..NDOF {
            b[(6, c)] = j_inv[(0, 0)] * g_xi[c] + j_inv[(0, 1)] * g_eta[c];
            b[(7, c)] = j_inv[(1, 0)] * g_xi[c] + j_inv[(1, 1)] * g_eta[c];
        }
        Ok(GaussPoint { b, drill, n, da: det })
    }

    fn area(&self) -> f64 {
        self.points.iter().map(|p| p.da).sum()
    }

    /// Global → local transformation of the element dof vector
    fn transformation(&self) -> DMatrix<f64> {
        let mut t = DMatrix::zeros(NDOF, NDOF);
        for block in 0..8 {
            let o = 3 * block;
            t.view_mut((o, o), (3, 3)).copy_from(&self.axes);
        }
        t
    }

    /// Natural coordinates of the projection of `point` on the mid-plane
    fn natural_coordinates(&self, point: &Vec3) -> FEAResult<(f64, f64)> {
        let d = point - self.origin;
        let target = Vector2::new(d.dot(&self.axes.row(0).transpose()), d.dot(&self.axes.row(1).transpose()));
        let mut s = Vector2::zeros();
        for _ in 0..25 {
            let n = shape(s[0], s[1]);
            let mut x = Vector2::zeros();
            for a in 0..4 {
                x += Vector2::new(self.xy[a][0], self.xy[a][1]) * n[a];
            }
            let r = target - x;
            if r.norm() < 1e-12 * (1.0 + target.norm()) {
                return Ok((s[0], s[1]));
            }
            let j = self.jacobian(s[0], s[1]);
            // x(ξ+Δ) ≈ x + Jᵀ Δ
            let step = j.transpose().try_inverse().ok_or(FEAError::SingularMatrix)? * r;
            s += step;
        }
        Err(FEAError::InvalidGeometry(format!(
            "point ({}, {}, {}) cannot be projected on the shell",
            point[0], point[1], point[2]
        )))
    }
}

/// MITC4 shell with an elastic membrane-plate section at each Gauss point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellMitc4 {
    tag: usize,
    nodes: [usize; 4],
    sections: Vec<ElasticMembranePlateSection>,
    geometry: Option<Geometry>,
    /// Trial displacements in local dofs
    u_local: DVector<f64>,
    /// Imposed generalized strains per Gauss point
    eps0: [ShellStrain; 4],
    /// Equivalent nodal loads, local dofs
    p0: DVector<f64>,
}

impl ShellMitc4 {
    pub fn new(tag: usize, nodes: [usize; 4], section: ElasticMembranePlateSection) -> Self {
        Self {
            tag,
            nodes,
            sections: vec![section; 4],
            geometry: None,
            u_local: DVector::zeros(NDOF),
            eps0: [ShellStrain::zeros(); 4],
            p0: DVector::zeros(NDOF),
        }
    }

    pub fn sections(&self) -> &[ElasticMembranePlateSection] {
        &self.sections
    }

    fn geometry(&self) -> FEAResult<&Geometry> {
        self.geometry.as_ref().ok_or_else(|| not_initialized(self.tag))
    }

    /// Local basis (rows g1, g2, g3)
    pub fn local_axes(&self) -> FEAResult<Mat3> {
        Ok(self.geometry()?.axes)
    }

    pub fn area(&self) -> FEAResult<f64> {
        Ok(self.geometry()?.area())
    }

    /// Natural coordinates (ξ, η) of a point projected onto the mid-surface
    pub fn natural_coordinates(&self, point: &Vec3) -> FEAResult<(f64, f64)> {
        self.geometry()?.natural_coordinates(point)
    }

    fn drilling_stiffness(&self) -> f64 {
        self.sections[0].shear_modulus() * self.sections[0].h
    }

    fn local_stiffness(&self, geometry: &Geometry) -> DMatrix<f64> {
        let gamma = self.drilling_stiffness();
        let mut k = DMatrix::zeros(NDOF, NDOF);
        for (gp, section) in geometry.points.iter().zip(&self.sections) {
            let d = DMatrix::from_iterator(8, 8, section.tangent().iter().copied());
            k += gp.b.transpose() * d * &gp.b * gp.da;
            k += &gp.drill * gp.drill.transpose() * (gamma * gp.da);
        }
        k
    }

    fn resultants(&self) -> impl Iterator<Item = ShellStrain> + '_ {
        self.sections.iter().map(ElasticMembranePlateSection::stress_resultant)
    }
}

impl ElementBehavior for ShellMitc4 {
    fn tag(&self) -> usize {
        self.tag
    }

    fn class_name(&self) -> &'static str {
        "ShellMITC4"
    }

    fn node_tags(&self) -> &[usize] {
        &self.nodes
    }

    fn num_dof(&self) -> usize {
        NDOF
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        if let Some(n) = nodes.iter().find(|n| n.ndm() != 3 || n.ndf() != 6) {
            return Err(FEAError::InvalidInput(format!(
                "shell {} needs 3D nodes with 6 dofs, node {} has ndm {} ndf {}",
                self.tag,
                n.tag,
                n.ndm(),
                n.ndf()
            )));
        }
        let x = [nodes[0].crd3(), nodes[1].crd3(), nodes[2].crd3(), nodes[3].crd3()];
        self.geometry = Some(Geometry::new(self.tag, x)?);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.geometry.is_some()
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let geometry = self.geometry.as_ref().ok_or_else(|| not_initialized(self.tag))?;
        let u = geometry.transformation() * super::gather(nodes, Node::trial_disp);
        if u.iter().any(|v| !v.is_finite()) {
            return Err(FEAError::NonFinite(format!("displacements of shell {}", self.tag)));
        }
        for ((gp, section), eps0) in geometry.points.iter().zip(&mut self.sections).zip(&self.eps0) {
            let e = &gp.b * &u;
            let strain = ShellStrain::from_iterator(e.iter().copied()) - eps0;
            section.set_trial_strain(&strain);
        }
        self.u_local = u;
        Ok(())
    }

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        let geometry = self.geometry()?;
        let t = geometry.transformation();
        Ok(t.transpose() * self.local_stiffness(geometry) * t)
    }

    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.tangent_stiff()
    }

    /// Lumped translational mass
    fn mass(&self) -> FEAResult<DMatrix<f64>> {
        let m = self.sections[0].areal_density() * self.geometry()?.area() / 4.0;
        let mut mass = DMatrix::zeros(NDOF, NDOF);
        for a in 0..4 {
            for k in 0..3 {
                mass[(6 * a + k, 6 * a + k)] = m;
            }
        }
        Ok(mass)
    }

    fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        let geometry = self.geometry()?;
        let gamma = self.drilling_stiffness();
        let mut p = -&self.p0;
        for (gp, s) in geometry.points.iter().zip(self.resultants()) {
            let s = DVector::from_iterator(8, s.iter().copied());
            p += gp.b.transpose() * s * gp.da;
            p += &gp.drill * (gamma * gp.da * gp.drill.dot(&self.u_local));
        }
        Ok(geometry.transformation().transpose() * p)
    }

    fn accepts_load(&self, load: &ElementLoad) -> bool {
        matches!(load, ElementLoad::ShellUniform { .. } | ElementLoad::ShellStrain { .. })
    }

    fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
        match load {
            ElementLoad::ShellUniform { pressure } => {
                let geometry = self.geometry.as_ref().ok_or_else(|| not_initialized(self.tag))?;
                for gp in &geometry.points {
                    for a in 0..4 {
                        self.p0[6 * a + 2] += factor * pressure * gp.n[a] * gp.da;
                    }
                }
                Ok(())
            }
            ElementLoad::ShellStrain { strains } => {
                for (eps0, s) in self.eps0.iter_mut().zip(strains) {
                    *eps0 += ShellStrain::from_row_slice(s) * factor;
                }
                Ok(())
            }
            other => Err(FEAError::InvalidInput(format!(
                "shell {} cannot take a {} load",
                self.tag,
                other.kind_name()
            ))),
        }
    }

    fn zero_load(&mut self) {
        self.p0.fill(0.0);
        self.eps0 = [ShellStrain::zeros(); 4];
    }

    fn commit_state(&mut self) {
        self.sections.iter_mut().for_each(ElasticMembranePlateSection::commit_state);
    }

    fn revert_to_last_commit(&mut self) {
        self.sections
            .iter_mut()
            .for_each(ElasticMembranePlateSection::revert_to_last_commit);
    }

    fn revert_to_start(&mut self) {
        self.sections.iter_mut().for_each(ElasticMembranePlateSection::revert_to_start);
        self.u_local.fill(0.0);
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.geometry()?;
        match which {
            ElementResponse::GlobalForce => self.resisting_force(),
            ElementResponse::Stresses => Ok(DVector::from_iterator(
                32,
                self.resultants().flat_map(|s| s.iter().copied().collect::<Vec<_>>()),
            )),
            ElementResponse::SectionForce(i) => self
                .sections
                .get(i)
                .map(|s| DVector::from_iterator(8, s.stress_resultant().iter().copied()))
                .ok_or_else(|| no_section(self.tag, i)),
            ElementResponse::SectionDeformation(i) => self
                .sections
                .get(i)
                .map(|s| DVector::from_iterator(8, s.strain().iter().copied()))
                .ok_or_else(|| no_section(self.tag, i)),
            ElementResponse::IntegrationPoints => Ok(DVector::from_iterator(
                8,
                gauss_points().iter().flat_map(|(x, y)| [*x, *y]),
            )),
            other => Err(FEAError::InvalidInput(format!(
                "shell {} has no {other:?} response",
                self.tag
            ))),
        }
    }

    fn shape_functions_at(&self, point: &Vec3) -> FEAResult<Vec<f64>> {
        let (xi, eta) = self.natural_coordinates(point)?;
        if xi.abs() > 1.0 + 1e-8 || eta.abs() > 1.0 + 1e-8 {
            log::warn!(
                "point ({}, {}, {}) lies outside shell {}",
                point[0],
                point[1],
                point[2],
                self.tag
            );
        }
        Ok(shape(xi, eta).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(side: f64) -> (ShellMitc4, Vec<Node>) {
        let coords = [[0.0, 0.0], [side, 0.0], [side, side], [0.0, side]];
        let nodes: Vec<Node> = coords
            .iter()
            .enumerate()
            .map(|(i, c)| Node::new(i + 1, &[c[0], c[1], 0.0], 6).unwrap())
            .collect();
        let section = ElasticMembranePlateSection::new(200e9, 0.25, 0.02, 7850.0).unwrap();
        let mut shell = ShellMitc4::new(1, [1, 2, 3, 4], section);
        let refs: Vec<&Node> = nodes.iter().collect();
        shell.initialize(&refs).unwrap();
        (shell, nodes)
    }

    fn impose(shell: &mut ShellMitc4, nodes: &mut [Node], f: impl Fn(f64, f64) -> [f64; 6]) {
        for n in nodes.iter_mut() {
            let c = n.crd3();
            n.set_trial_disp(&DVector::from_row_slice(&f(c[0], c[1])));
        }
        let refs: Vec<&Node> = nodes.iter().collect();
        shell.update(&refs).unwrap();
    }

    #[test]
    fn test_rigid_rotation_is_stress_free() {
        let (mut shell, mut nodes) = square(2.0);
        let th = 1e-3;
        impose(&mut shell, &mut nodes, |x, y| [-th * y, th * x, 0.3e-3 * x - 0.2e-3 * y, -0.2e-3, -0.3e-3, th]);
        let p = shell.resisting_force().unwrap();
        assert!(p.amax() < 1e-6, "rigid motion produced {}", p.amax());
    }

    #[test]
    fn test_uniform_membrane_strain() {
        let (mut shell, mut nodes) = square(2.0);
        let eps = 1e-4;
        impose(&mut shell, &mut nodes, |x, _| [eps * x, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let n1 = 200e9 * 0.02 / (1.0 - 0.0625) * eps;
        let s = shell.response(ElementResponse::Stresses).unwrap();
        for gp in 0..4 {
            assert_relative_eq!(s[8 * gp], n1, max_relative = 1e-10);
            assert_relative_eq!(s[8 * gp + 1], 0.25 * n1, max_relative = 1e-10);
        }
        // Edge x = 2 carries n1·side split over its two nodes
        let p = shell.resisting_force().unwrap();
        assert_relative_eq!(p[6], n1, max_relative = 1e-10);
        assert_relative_eq!(p[12], n1, max_relative = 1e-10);
        assert_relative_eq!(p[0] + p[6] + p[12] + p[18], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_pressure_and_mass_distribution() {
        let (mut shell, _) = square(2.0);
        shell.add_load(&ElementLoad::ShellUniform { pressure: 3.0 }, 2.0).unwrap();
        let p = shell.resisting_force().unwrap();
        for a in 0..4 {
            assert_relative_eq!(p[6 * a + 2], -6.0, max_relative = 1e-12);
        }
        let m = shell.mass().unwrap();
        assert_relative_eq!(m.trace(), 12.0 * 7850.0 * 0.02 * 1.0, max_relative = 1e-12);
        assert!(!shell.accepts_load(&ElementLoad::TrussStrain { eps_i: 0.0, eps_j: 0.0 }));
    }

    #[test]
    fn test_natural_coordinates_of_interior_point() {
        let (shell, _) = square(2.0);
        let (xi, eta) = shell.natural_coordinates(&Vec3::new(1.5, 0.5, 0.1)).unwrap();
        assert_relative_eq!(xi, 0.5, epsilon = 1e-10);
        assert_relative_eq!(eta, -0.5, epsilon = 1e-10);
        let n = shell.shape_functions_at(&Vec3::new(1.5, 0.5, 0.0)).unwrap();
        assert_relative_eq!(n.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(n[1], 0.25 * 1.5 * 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_clockwise_nodes_flip_the_normal() {
        let nodes: Vec<Node> = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
            .iter()
            .enumerate()
            .map(|(i, c)| Node::new(i + 1, &[c[0], c[1], 0.0], 6).unwrap())
            .collect();
        let section = ElasticMembranePlateSection::new(1.0, 0.0, 0.1, 0.0).unwrap();
        let mut shell = ShellMitc4::new(1, [1, 2, 3, 4], section);
        let refs: Vec<&Node> = nodes.iter().collect();
        shell.initialize(&refs).unwrap();
        assert_relative_eq!(shell.local_axes().unwrap()[(2, 2)], -1.0, epsilon = 1e-12);
    }
}
