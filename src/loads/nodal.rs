//! Nodal loads - forces and moments applied directly to nodes

use serde::{Deserialize, Serialize};

/// A reference load applied to a node, one component per nodal dof
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodalLoad {
    pub node: usize,
    pub values: Vec<f64>,
}

impl NodalLoad {
    pub fn new(node: usize, values: Vec<f64>) -> Self {
        Self { node, values }
    }

    /// Planar force/moment (FX, FY, MZ)
    pub fn planar(node: usize, fx: f64, fy: f64, mz: f64) -> Self {
        Self::new(node, vec![fx, fy, mz])
    }

    /// Space-frame force/moment (FX, FY, FZ, MX, MY, MZ)
    pub fn spatial(node: usize, force: [f64; 3], moment: [f64; 3]) -> Self {
        let mut values = force.to_vec();
        values.extend_from_slice(&moment);
        Self::new(node, values)
    }

    /// Single component load; an out-of-range `dof` yields a load the
    /// domain rejects
    pub fn dof(node: usize, ndf: usize, dof: usize, value: f64) -> Self {
        let mut values = vec![0.0; ndf.max(dof + 1)];
        values[dof] = value;
        Self::new(node, values)
    }
}
