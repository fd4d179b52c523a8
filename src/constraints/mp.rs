//! Multi-point constraints u_c = C·u_r

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::elements::{Element, Node};
use crate::error::{FEAError, FEAResult};

/// Linear dependence of constrained dofs on retained dofs
///
/// `C` has one row per constrained dof and one column per retained dof,
/// the retained dofs being listed node by node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpConstraint {
    pub tag: usize,
    pub constrained_node: usize,
    pub constrained_dofs: Vec<usize>,
    pub retained: Vec<(usize, Vec<usize>)>,
    pub c: DMatrix<f64>,
}

impl MpConstraint {
    pub fn new(
        tag: usize,
        constrained_node: usize,
        constrained_dofs: Vec<usize>,
        retained: Vec<(usize, Vec<usize>)>,
        c: DMatrix<f64>,
    ) -> FEAResult<Self> {
        let cols: usize = retained.iter().map(|(_, d)| d.len()).sum();
        if c.nrows() != constrained_dofs.len() || c.ncols() != cols {
            return Err(FEAError::InvalidInput(format!(
                "constraint {tag}: C is {}x{}, expected {}x{cols}",
                c.nrows(),
                c.ncols(),
                constrained_dofs.len()
            )));
        }
        if retained.iter().any(|(n, _)| *n == constrained_node) {
            return Err(FEAError::ContradictoryConstraint(format!(
                "constraint {tag} retains its own constrained node {constrained_node}"
            )));
        }
        let mut seen = constrained_dofs.clone();
        seen.sort_unstable();
        seen.dedup();
        if seen.len() != constrained_dofs.len() {
            return Err(FEAError::RedundantConstraint(format!(
                "constraint {tag} lists a constrained dof twice"
            )));
        }
        Ok(Self {
            tag,
            constrained_node,
            constrained_dofs,
            retained,
            c,
        })
    }

    /// Rigid link carrying translations and rotations of `retained`
    pub fn rigid_beam(tag: usize, retained: &Node, constrained: &Node) -> FEAResult<Self> {
        same_kind(tag, retained, constrained)?;
        let r = constrained.crd3() - retained.crd3();
        let c = match (retained.ndm(), retained.ndf()) {
            (2, 3) => DMatrix::from_row_slice(3, 3, &[
                1.0, 0.0, -r[1],
                0.0, 1.0, r[0],
                0.0, 0.0, 1.0,
            ]),
            (3, 6) => {
                let mut c = DMatrix::identity(6, 6);
                c[(0, 4)] = r[2];
                c[(0, 5)] = -r[1];
                c[(1, 3)] = -r[2];
                c[(1, 5)] = r[0];
                c[(2, 3)] = r[1];
                c[(2, 4)] = -r[0];
                c
            }
            (ndm, ndf) => {
                return Err(FEAError::InvalidInput(format!(
                    "rigid beam {tag} needs frame nodes, got ndm {ndm} ndf {ndf}"
                )))
            }
        };
        let dofs: Vec<usize> = (0..retained.ndf()).collect();
        Self::new(tag, constrained.tag, dofs.clone(), vec![(retained.tag, dofs)], c)
    }

    /// Equal translations, rotations left free
    pub fn rigid_rod(tag: usize, retained: &Node, constrained: &Node) -> FEAResult<Self> {
        same_kind(tag, retained, constrained)?;
        let dofs: Vec<usize> = (0..retained.ndm().min(retained.ndf())).collect();
        Self::equal_dof(tag, retained, constrained, &dofs)
    }

    pub fn equal_dof(
        tag: usize,
        retained: &Node,
        constrained: &Node,
        dofs: &[usize],
    ) -> FEAResult<Self> {
        if dofs.is_empty() {
            return Err(FEAError::InvalidInput(format!("equalDOF {tag} lists no dofs")));
        }
        for d in dofs {
            retained.check_dof(*d)?;
            constrained.check_dof(*d)?;
        }
        let n = dofs.len();
        Self::new(
            tag,
            constrained.tag,
            dofs.to_vec(),
            vec![(retained.tag, dofs.to_vec())],
            DMatrix::identity(n, n),
        )
    }

    /// Slave `node` to the interpolation of `element` at its projection
    ///
    /// Each listed dof of the node equals the shape-function weighted sum of
    /// the same dof at the element nodes.
    pub fn glue_node_to_element(
        tag: usize,
        node: &Node,
        element: &Element,
        element_nodes: &[&Node],
        dofs: &[usize],
    ) -> FEAResult<Self> {
        let weights = element.shape_functions_at(&node.crd3())?;
        if weights.len() != element_nodes.len() {
            return Err(FEAError::InvalidInput(format!(
                "element {} returned {} shape functions for {} nodes",
                element.tag(),
                weights.len(),
                element_nodes.len()
            )));
        }
        if dofs.is_empty() {
            return Err(FEAError::InvalidInput(format!("glue constraint {tag} lists no dofs")));
        }
        for d in dofs {
            node.check_dof(*d)?;
            for n in element_nodes {
                n.check_dof(*d)?;
            }
        }
        let n = dofs.len();
        let mut c = DMatrix::zeros(n, n * element_nodes.len());
        for (a, w) in weights.iter().enumerate() {
            for k in 0..n {
                c[(k, a * n + k)] = *w;
            }
        }
        let retained = element_nodes.iter().map(|en| (en.tag, dofs.to_vec())).collect();
        Self::new(tag, node.tag, dofs.to_vec(), retained, c)
    }

    pub fn retained_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.retained.iter().map(|(n, _)| *n)
    }

    /// Retained (node, dof) pairs in column order of C
    pub fn retained_dofs(&self) -> Vec<(usize, usize)> {
        self.retained
            .iter()
            .flat_map(|(n, dofs)| dofs.iter().map(move |d| (*n, *d)))
            .collect()
    }
}

fn same_kind(tag: usize, a: &Node, b: &Node) -> FEAResult<()> {
    if a.ndm() != b.ndm() || a.ndf() != b.ndf() {
        return Err(FEAError::InvalidInput(format!(
            "constraint {tag} joins nodes {} and {} of different kinds",
            a.tag, b.tag
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn test_rigid_beam_3d_small_rotation() {
        let r = Node::new(1, &[0.0, 0.0, 0.0], 6).unwrap();
        let s = Node::new(2, &[1.0, 2.0, 3.0], 6).unwrap();
        let mp = MpConstraint::rigid_beam(1, &r, &s).unwrap();
        let ur = DVector::from_vec(vec![0.0, 0.0, 0.0, 0.01, 0.02, 0.03]);
        let uc = &mp.c * ur;
        // θ × r
        assert_relative_eq!(uc[0], 0.02 * 3.0 - 0.03 * 2.0, epsilon = 1e-15);
        assert_relative_eq!(uc[1], 0.03 * 1.0 - 0.01 * 3.0, epsilon = 1e-15);
        assert_relative_eq!(uc[2], 0.01 * 2.0 - 0.02 * 1.0, epsilon = 1e-15);
        assert_relative_eq!(uc[5], 0.03);
    }

    #[test]
    fn test_rigid_beam_2d() {
        let r = Node::new(1, &[0.0, 0.0], 3).unwrap();
        let s = Node::new(2, &[2.0, 1.0], 3).unwrap();
        let mp = MpConstraint::rigid_beam(1, &r, &s).unwrap();
        let uc = &mp.c * DVector::from_vec(vec![0.0, 0.0, 0.1]);
        assert_relative_eq!(uc[0], -0.1);
        assert_relative_eq!(uc[1], 0.2);
    }

    #[test]
    fn test_invalid_constraints() {
        let a = Node::new(1, &[0.0, 0.0], 2).unwrap();
        let b = Node::new(2, &[0.0, 0.0], 3).unwrap();
        assert!(MpConstraint::rigid_beam(1, &a, &b).is_err());
        assert!(MpConstraint::equal_dof(1, &b, &b, &[0]).is_err());
        assert!(MpConstraint::equal_dof(1, &a, &b, &[2]).is_err());
        let rod = MpConstraint::rigid_rod(1, &b, &Node::new(3, &[1.0, 0.0], 3).unwrap()).unwrap();
        assert_eq!(rod.constrained_dofs, vec![0, 1]);
    }
}
