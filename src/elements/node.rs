//! Node - a point of the model carrying response quantities

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::Vec3;

/// Trial/committed pair of a nodal response vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Response {
    trial: DVector<f64>,
    committed: DVector<f64>,
}

impl Response {
    fn zeros(n: usize) -> Self {
        Self {
            trial: DVector::zeros(n),
            committed: DVector::zeros(n),
        }
    }

    fn commit(&mut self) {
        self.committed.copy_from(&self.trial);
    }

    fn revert(&mut self) {
        self.trial.copy_from(&self.committed);
    }

    fn reset(&mut self) {
        self.trial.fill(0.0);
        self.committed.fill(0.0);
    }
}

/// A node of the finite element model
///
/// Coordinates have 1 to 3 components (`ndm`); the node carries `ndf`
/// degrees of freedom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub tag: usize,
    coords: Vec<f64>,
    ndf: usize,
    disp: Response,
    vel: Response,
    accel: Response,
    unbalanced: DVector<f64>,
    reaction: DVector<f64>,
    mass: Option<DMatrix<f64>>,
    /// Mode shapes as columns
    eigenvectors: Option<DMatrix<f64>>,
}

impl Node {
    /// Create a new node at the given coordinates
    pub fn new(tag: usize, coords: &[f64], ndf: usize) -> FEAResult<Self> {
        if coords.is_empty() || coords.len() > 3 {
            return Err(FEAError::InvalidInput(format!(
                "node {tag} needs 1 to 3 coordinates, got {}",
                coords.len()
            )));
        }
        if ndf == 0 || ndf > 6 {
            return Err(FEAError::InvalidInput(format!("node {tag} has invalid ndf {ndf}")));
        }
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(FEAError::InvalidGeometry(format!("node {tag} has non-finite coordinates")));
        }
        Ok(Self {
            tag,
            coords: coords.to_vec(),
            ndf,
            disp: Response::zeros(ndf),
            vel: Response::zeros(ndf),
            accel: Response::zeros(ndf),
            unbalanced: DVector::zeros(ndf),
            reaction: DVector::zeros(ndf),
            mass: None,
            eigenvectors: None,
        })
    }

    /// Lumped mass on the listed dofs
    pub fn with_mass(mut self, diagonal: &[f64]) -> FEAResult<Self> {
        if diagonal.len() != self.ndf {
            return Err(FEAError::InvalidInput(format!(
                "node {} mass needs {} entries, got {}",
                self.tag,
                self.ndf,
                diagonal.len()
            )));
        }
        self.mass = Some(DMatrix::from_diagonal(&DVector::from_column_slice(diagonal)));
        Ok(self)
    }

    pub fn set_mass(&mut self, mass: DMatrix<f64>) -> FEAResult<()> {
        if mass.nrows() != self.ndf || mass.ncols() != self.ndf {
            return Err(FEAError::InvalidInput(format!(
                "node {} mass must be {}x{}",
                self.tag, self.ndf, self.ndf
            )));
        }
        self.mass = Some(mass);
        Ok(())
    }

    pub fn mass(&self) -> Option<&DMatrix<f64>> {
        self.mass.as_ref()
    }

    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Coordinates padded to three components
    pub fn crd3(&self) -> Vec3 {
        let c = |i: usize| self.coords.get(i).copied().unwrap_or(0.0);
        Vec3::new(c(0), c(1), c(2))
    }

    pub fn ndm(&self) -> usize {
        self.coords.len()
    }

    pub fn ndf(&self) -> usize {
        self.ndf
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        (other.crd3() - self.crd3()).norm()
    }

    pub fn check_dof(&self, dof: usize) -> FEAResult<()> {
        if dof >= self.ndf {
            return Err(FEAError::InvalidDof {
                node: self.tag,
                dof,
                ndf: self.ndf,
            });
        }
        Ok(())
    }

    pub fn trial_disp(&self) -> &DVector<f64> {
        &self.disp.trial
    }

    pub fn committed_disp(&self) -> &DVector<f64> {
        &self.disp.committed
    }

    /// Displacement increment since the last commit
    pub fn incr_disp(&self) -> DVector<f64> {
        &self.disp.trial - &self.disp.committed
    }

    pub fn trial_vel(&self) -> &DVector<f64> {
        &self.vel.trial
    }

    pub fn committed_vel(&self) -> &DVector<f64> {
        &self.vel.committed
    }

    pub fn trial_accel(&self) -> &DVector<f64> {
        &self.accel.trial
    }

    pub fn committed_accel(&self) -> &DVector<f64> {
        &self.accel.committed
    }

    pub fn set_trial_disp(&mut self, u: &DVector<f64>) {
        self.disp.trial.copy_from(u);
    }

    pub fn set_trial_disp_dof(&mut self, dof: usize, value: f64) {
        self.disp.trial[dof] = value;
    }

    pub fn incr_trial_disp(&mut self, du: &DVector<f64>) {
        self.disp.trial += du;
    }

    pub fn set_trial_vel(&mut self, v: &DVector<f64>) {
        self.vel.trial.copy_from(v);
    }

    pub fn set_trial_accel(&mut self, a: &DVector<f64>) {
        self.accel.trial.copy_from(a);
    }

    pub fn commit_state(&mut self) {
        self.disp.commit();
        self.vel.commit();
        self.accel.commit();
    }

    pub fn revert_to_last_commit(&mut self) {
        self.disp.revert();
        self.vel.revert();
        self.accel.revert();
    }

    pub fn revert_to_start(&mut self) {
        self.disp.reset();
        self.vel.reset();
        self.accel.reset();
        self.unbalanced.fill(0.0);
        self.reaction.fill(0.0);
        self.eigenvectors = None;
    }

    pub fn zero_unbalanced_load(&mut self) {
        self.unbalanced.fill(0.0);
    }

    pub fn add_unbalanced_load(&mut self, load: &DVector<f64>, factor: f64) {
        self.unbalanced.axpy(factor, load, 1.0);
    }

    pub fn add_unbalanced_load_dof(&mut self, dof: usize, value: f64) {
        self.unbalanced[dof] += value;
    }

    pub fn unbalanced_load(&self) -> &DVector<f64> {
        &self.unbalanced
    }

    /// Applied load minus the nodal inertia force M·a
    pub fn unbalanced_load_inc_inertia(&self) -> DVector<f64> {
        match &self.mass {
            Some(m) => &self.unbalanced - m * &self.accel.trial,
            None => self.unbalanced.clone(),
        }
    }

    pub fn zero_reaction(&mut self) {
        self.reaction.fill(0.0);
    }

    pub fn add_reaction(&mut self, r: &DVector<f64>, factor: f64) {
        self.reaction.axpy(factor, r, 1.0);
    }

    /// Reactions computed by the last call to the domain's reaction routine
    /// Returns [FX, FY, (FZ), MX, ...] in node dof order
    pub fn reaction(&self) -> &DVector<f64> {
        &self.reaction
    }

    pub fn set_eigenvectors(&mut self, vectors: DMatrix<f64>) {
        self.eigenvectors = Some(vectors);
    }

    /// Mode shape `mode` (0-based) restricted to this node
    pub fn eigenvector(&self, mode: usize) -> Option<DVector<f64>> {
        self.eigenvectors
            .as_ref()
            .filter(|v| mode < v.ncols())
            .map(|v| v.column(mode).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_node_creation() {
        let node = Node::new(1, &[1.0, 2.0], 3).unwrap();
        assert_eq!(node.ndm(), 2);
        assert_eq!(node.crd3(), Vec3::new(1.0, 2.0, 0.0));
        assert!(Node::new(2, &[], 3).is_err());
        assert!(Node::new(3, &[0.0], 7).is_err());
    }

    #[test]
    fn test_node_distance() {
        let n1 = Node::new(1, &[0.0, 0.0, 0.0], 6).unwrap();
        let n2 = Node::new(2, &[3.0, 4.0, 0.0], 6).unwrap();
        assert_relative_eq!(n1.distance_to(&n2), 5.0);
    }

    #[test]
    fn test_commit_and_revert() {
        let mut n = Node::new(1, &[0.0, 0.0], 3).unwrap();
        n.incr_trial_disp(&DVector::from_vec(vec![1.0, 0.0, 0.0]));
        n.commit_state();
        n.incr_trial_disp(&DVector::from_vec(vec![0.5, 0.0, 0.0]));
        assert_relative_eq!(n.incr_disp()[0], 0.5);
        n.revert_to_last_commit();
        assert_relative_eq!(n.trial_disp()[0], 1.0);
        n.revert_to_start();
        assert_relative_eq!(n.trial_disp()[0], 0.0);
    }

    #[test]
    fn test_dof_bounds() {
        let n = Node::new(4, &[0.0, 0.0], 2).unwrap();
        assert!(matches!(n.check_dof(2), Err(FEAError::InvalidDof { node: 4, dof: 2, ndf: 2 })));
    }
}
