//! Two-node axial members

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{check_nodes, not_initialized, ElementBehavior, ElementResponse, Node};
use crate::error::{FEAError, FEAResult};
use crate::loads::ElementLoad;
use crate::materials::UniaxialMaterial;
use crate::math::Vec3;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrussCore {
    tag: usize,
    nodes: [usize; 2],
    material: UniaxialMaterial,
    area: f64,
    /// Mass per unit length
    rho: f64,
    corotational: bool,
    ndm: usize,
    ndf: usize,
    /// Undeformed chord vector I→J
    chord0: Vec3,
    l0: f64,
    /// Current unit direction; fixed for the linear truss
    dir: Vec3,
    /// Current length
    ln: f64,
    committed_geometry: (Vec3, f64),
    /// Imposed strain from element loads
    eps0: f64,
}

impl TrussCore {
    fn new(
        tag: usize,
        nodes: [usize; 2],
        material: UniaxialMaterial,
        area: f64,
        corotational: bool,
    ) -> FEAResult<Self> {
        if !(area > 0.0) {
            return Err(FEAError::InvalidInput(format!(
                "truss {tag} needs a positive area, got {area}"
            )));
        }
        Ok(Self {
            tag,
            nodes,
            material,
            area,
            rho: 0.0,
            corotational,
            ndm: 0,
            ndf: 0,
            chord0: Vec3::zeros(),
            l0: 0.0,
            dir: Vec3::zeros(),
            ln: 0.0,
            committed_geometry: (Vec3::zeros(), 0.0),
            eps0: 0.0,
        })
    }

    fn check_initialized(&self) -> FEAResult<()> {
        if self.l0 > 0.0 {
            Ok(())
        } else {
            Err(not_initialized(self.tag))
        }
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let (a, b) = (nodes[0], nodes[1]);
        if a.ndm() != b.ndm() || a.ndf() != b.ndf() || a.ndf() < a.ndm() {
            return Err(FEAError::InvalidInput(format!(
                "truss {} joins incompatible nodes {} and {}",
                self.tag, a.tag, b.tag
            )));
        }
        let d = b.crd3() - a.crd3();
        let l = d.norm();
        if l < 1e-12 {
            return Err(FEAError::InvalidGeometry(format!("truss {} has zero length", self.tag)));
        }
        self.ndm = a.ndm();
        self.ndf = a.ndf();
        self.chord0 = d;
        self.l0 = l;
        self.ln = l;
        self.dir = d / l;
        self.committed_geometry = (self.dir, l);
        Ok(())
    }

    /// Translational part of a nodal vector, padded to three components
    fn translation(&self, v: &DVector<f64>) -> Vec3 {
        let mut t = Vec3::zeros();
        for k in 0..self.ndm {
            t[k] = v[k];
        }
        t
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        self.check_initialized()?;
        let du = self.translation(nodes[1].trial_disp()) - self.translation(nodes[0].trial_disp());
        let dvel = self.translation(nodes[1].trial_vel()) - self.translation(nodes[0].trial_vel());
        let strain = if self.corotational {
            let d = self.chord0 + du;
            self.ln = d.norm();
            if self.ln < 1e-12 {
                return Err(FEAError::InvalidGeometry(format!(
                    "truss {} collapsed to zero length",
                    self.tag
                )));
            }
            self.dir = d / self.ln;
            (self.ln - self.l0) / self.l0
        } else {
            self.dir.dot(&du) / self.l0
        };
        let rate = self.dir.dot(&dvel) / self.l0;
        if !self
            .material
            .set_trial_strain(strain - self.eps0, rate)
            .is_ok()
        {
            return Err(FEAError::NonFinite(format!("material of truss {}", self.tag)));
        }
        Ok(())
    }

    fn initial_stiffness(&self) -> DMatrix<f64> {
        let n0 = self.chord0 / self.l0;
        let k = self.material.initial_tangent() * self.area / self.l0;
        self.stamp(&(n0 * n0.transpose() * k))
    }

    fn commit_state(&mut self) {
        self.material.commit_state();
        self.committed_geometry = (self.dir, self.ln);
    }

    fn revert_to_last_commit(&mut self) {
        self.material.revert_to_last_commit();
        (self.dir, self.ln) = self.committed_geometry;
    }

    fn revert_to_start(&mut self) {
        self.material.revert_to_start();
        if self.l0 > 0.0 {
            self.dir = self.chord0 / self.l0;
            self.ln = self.l0;
            self.committed_geometry = (self.dir, self.ln);
        }
    }

    fn axial_force(&self) -> f64 {
        self.area * self.material.stress()
    }

    /// Stamp ±block into the 2·ndf element matrix on the translational dofs
    fn stamp(&self, block: &nalgebra::Matrix3<f64>) -> DMatrix<f64> {
        let n = 2 * self.ndf;
        let mut k = DMatrix::zeros(n, n);
        for i in 0..self.ndm {
            for j in 0..self.ndm {
                let v = block[(i, j)];
                k[(i, j)] = v;
                k[(i, self.ndf + j)] = -v;
                k[(self.ndf + i, j)] = -v;
                k[(self.ndf + i, self.ndf + j)] = v;
            }
        }
        k
    }

    fn stiffness(&self, e: f64) -> DMatrix<f64> {
        let nn = self.dir * self.dir.transpose();
        let mut block = nn * (e * self.area / self.l0);
        if self.corotational {
            block += (nalgebra::Matrix3::identity() - nn) * (self.axial_force() / self.ln);
        }
        self.stamp(&block)
    }

    fn resisting_force(&self) -> DVector<f64> {
        let mut p = DVector::zeros(2 * self.ndf);
        let f = self.axial_force();
        for k in 0..self.ndm {
            p[k] = -f * self.dir[k];
            p[self.ndf + k] = f * self.dir[k];
        }
        p
    }

    fn mass(&self) -> DMatrix<f64> {
        let n = 2 * self.ndf;
        let mut m = DMatrix::zeros(n, n);
        let half = 0.5 * self.rho * self.l0;
        for k in 0..self.ndm {
            m[(k, k)] = half;
            m[(self.ndf + k, self.ndf + k)] = half;
        }
        m
    }

    fn damping(&self) -> DMatrix<f64> {
        let eta = self.material.damping_tangent();
        let nn = self.dir * self.dir.transpose();
        self.stamp(&(nn * (eta * self.area / self.l0)))
    }

    fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
        match load {
            ElementLoad::TrussStrain { eps_i, eps_j } => {
                self.eps0 += 0.5 * factor * (eps_i + eps_j);
                Ok(())
            }
            other => Err(FEAError::InvalidInput(format!(
                "truss cannot take a {} load",
                other.kind_name()
            ))),
        }
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.check_initialized()?;
        let one = |v: f64| -> FEAResult<DVector<f64>> { Ok(DVector::from_element(1, v)) };
        match which {
            ElementResponse::GlobalForce => Ok(self.resisting_force()),
            ElementResponse::BasicForce => one(self.axial_force()),
            ElementResponse::BasicDeformation => one(self.material.strain() * self.l0),
            ElementResponse::Stresses => one(self.material.stress()),
            ElementResponse::SectionForce(0) => one(self.axial_force()),
            ElementResponse::SectionDeformation(0) => one(self.material.strain()),
            other => Err(FEAError::InvalidInput(format!(
                "truss {} has no {other:?} response",
                self.tag
            ))),
        }
    }
}

macro_rules! truss_element {
    ($name:ident, $class:literal, $corot:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(TrussCore);

        impl $name {
            pub fn new(
                tag: usize,
                node_i: usize,
                node_j: usize,
                material: UniaxialMaterial,
                area: f64,
            ) -> FEAResult<Self> {
                TrussCore::new(tag, [node_i, node_j], material, area, $corot).map(Self)
            }

            /// Mass per unit length
            pub fn with_density(mut self, rho: f64) -> Self {
                self.0.rho = rho;
                self
            }

            pub fn material(&self) -> &UniaxialMaterial {
                &self.0.material
            }

            pub fn area(&self) -> f64 {
                self.0.area
            }

            pub fn axial_force(&self) -> f64 {
                self.0.axial_force()
            }
        }

        impl ElementBehavior for $name {
            fn tag(&self) -> usize {
                self.0.tag
            }

            fn class_name(&self) -> &'static str {
                $class
            }

            fn node_tags(&self) -> &[usize] {
                &self.0.nodes
            }

            fn num_dof(&self) -> usize {
                2 * self.0.ndf
            }

            fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
                self.0.initialize(nodes)
            }

            fn is_initialized(&self) -> bool {
                self.0.l0 > 0.0
            }

            fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
                self.0.update(nodes)
            }

            fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
                self.0.check_initialized()?;
                Ok(self.0.stiffness(self.0.material.tangent()))
            }

            fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
                self.0.check_initialized()?;
                Ok(self.0.initial_stiffness())
            }

            fn mass(&self) -> FEAResult<DMatrix<f64>> {
                self.0.check_initialized()?;
                Ok(self.0.mass())
            }

            fn damping(&self) -> FEAResult<DMatrix<f64>> {
                self.0.check_initialized()?;
                Ok(self.0.damping())
            }

            fn resisting_force(&self) -> FEAResult<DVector<f64>> {
                self.0.check_initialized()?;
                Ok(self.0.resisting_force())
            }

            fn accepts_load(&self, load: &ElementLoad) -> bool {
                matches!(load, ElementLoad::TrussStrain { .. })
            }

            fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
                self.0.add_load(load, factor)
            }

            fn zero_load(&mut self) {
                self.0.eps0 = 0.0;
            }

            fn commit_state(&mut self) {
                self.0.commit_state()
            }

            fn revert_to_last_commit(&mut self) {
                self.0.revert_to_last_commit()
            }

            fn revert_to_start(&mut self) {
                self.0.revert_to_start()
            }

            fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
                self.0.response(which)
            }
        }
    };
}

truss_element!(Truss, "Truss", false, "Small-displacement truss in 2D or 3D");
truss_element!(
    CorotTruss,
    "CorotTruss",
    true,
    "Truss with exact kinematics for large displacements"
);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pair(a: [f64; 2], b: [f64; 2]) -> (Node, Node) {
        (Node::new(1, &a, 2).unwrap(), Node::new(2, &b, 2).unwrap())
    }

    #[test]
    fn test_axial_stiffness_of_inclined_bar() {
        let (n1, n2) = pair([0.0, 0.0], [3.0, 4.0]);
        let mut t = Truss::new(1, 1, 2, UniaxialMaterial::elastic(100.0), 2.0).unwrap();
        t.initialize(&[&n1, &n2]).unwrap();
        let k = t.tangent_stiff().unwrap();
        // EA/L · c², c = 0.6
        assert_relative_eq!(k[(0, 0)], 100.0 * 2.0 / 5.0 * 0.36, max_relative = 1e-12);
        assert_relative_eq!(k[(0, 3)], -100.0 * 2.0 / 5.0 * 0.48, max_relative = 1e-12);
    }

    #[test]
    fn test_strain_load_in_restrained_bar() {
        let (n1, n2) = pair([0.0, 0.0], [2.0, 0.0]);
        let mut t = Truss::new(1, 1, 2, UniaxialMaterial::elastic(200.0), 1.5).unwrap();
        t.initialize(&[&n1, &n2]).unwrap();
        t.add_load(&ElementLoad::TrussStrain { eps_i: 1e-3, eps_j: 3e-3 }, 1.0).unwrap();
        t.update(&[&n1, &n2]).unwrap();
        assert_relative_eq!(t.axial_force(), -1.5 * 200.0 * 2e-3, max_relative = 1e-12);
        let p = t.resisting_force().unwrap();
        assert_relative_eq!(p[0], 0.6, max_relative = 1e-12);
    }

    #[test]
    fn test_corotational_rigid_rotation_is_force_free() {
        let (n1, mut n2) = pair([0.0, 0.0], [1.0, 0.0]);
        let mut t = CorotTruss::new(1, 1, 2, UniaxialMaterial::elastic(1e3), 1.0).unwrap();
        t.initialize(&[&n1, &n2]).unwrap();
        let th: f64 = 0.7;
        n2.set_trial_disp(&DVector::from_vec(vec![th.cos() - 1.0, th.sin()]));
        t.update(&[&n1, &n2]).unwrap();
        assert_relative_eq!(t.axial_force(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_corotational_geometric_stiffness() {
        let (n1, mut n2) = pair([0.0, 0.0], [1.0, 0.0]);
        let mut t = CorotTruss::new(1, 1, 2, UniaxialMaterial::elastic(1e3), 1.0).unwrap();
        t.initialize(&[&n1, &n2]).unwrap();
        n2.set_trial_disp(&DVector::from_vec(vec![0.01, 0.0]));
        t.update(&[&n1, &n2]).unwrap();
        let k = t.tangent_stiff().unwrap();
        let n = t.axial_force();
        assert_relative_eq!(k[(3, 3)], n / 1.01, max_relative = 1e-12);
        assert_relative_eq!(k[(2, 2)], 1e3, max_relative = 1e-12);
    }

    #[test]
    fn test_lumped_mass() {
        let (n1, n2) = pair([0.0, 0.0], [4.0, 0.0]);
        let mut t = Truss::new(1, 1, 2, UniaxialMaterial::elastic(1.0), 1.0)
            .unwrap()
            .with_density(3.0);
        t.initialize(&[&n1, &n2]).unwrap();
        let m = t.mass().unwrap();
        assert_relative_eq!(m.trace(), 4.0 * 3.0 * 2.0);
        assert_relative_eq!(m[(1, 1)], 6.0);
    }
}
