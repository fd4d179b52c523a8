//! Result views over an analyzed domain

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::elements::ElementResponse;
use crate::error::FEAResult;

/// Outcome of one converged step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub iterations: usize,
    /// Last norm seen by the convergence test
    pub norm: f64,
}

/// Outcome of a successful `run`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Steps committed by the analysis object so far
    pub committed_steps: usize,
    pub total_iterations: usize,
    /// Committed pseudo-time or time of the domain
    pub time: f64,
}

/// Displacements at a node, padded to six components
///
/// Two-dimensional nodes with three dofs map (ux, uy, θz) onto
/// (dx, dy, rz).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDisplacement {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
}

impl NodeDisplacement {
    /// Create from array [DX, DY, DZ, RX, RY, RZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            dx: arr[0],
            dy: arr[1],
            dz: arr[2],
            rx: arr[3],
            ry: arr[4],
            rz: arr[5],
        }
    }

    /// Committed displacement of node `tag`
    pub fn of(domain: &Domain, tag: usize) -> FEAResult<Self> {
        let node = domain.node(tag)?;
        Ok(Self::from_array(padded(node.committed_disp(), node.ndm())))
    }

    pub fn translation_magnitude(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }

    pub fn rotation_magnitude(&self) -> f64 {
        (self.rx.powi(2) + self.ry.powi(2) + self.rz.powi(2)).sqrt()
    }
}

/// Reactions at a node, laid out like [`NodeDisplacement`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reactions {
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    pub mx: f64,
    pub my: f64,
    pub mz: f64,
}

impl Reactions {
    /// Create from array [FX, FY, FZ, MX, MY, MZ]
    pub fn from_array(arr: [f64; 6]) -> Self {
        Self {
            fx: arr[0],
            fy: arr[1],
            fz: arr[2],
            mx: arr[3],
            my: arr[4],
            mz: arr[5],
        }
    }

    /// Reaction of node `tag` from the last reaction calculation
    pub fn of(domain: &Domain, tag: usize) -> FEAResult<Self> {
        let node = domain.node(tag)?;
        Ok(Self::from_array(padded(node.reaction(), node.ndm())))
    }

    pub fn force_magnitude(&self) -> f64 {
        (self.fx.powi(2) + self.fy.powi(2) + self.fz.powi(2)).sqrt()
    }

    pub fn moment_magnitude(&self) -> f64 {
        (self.mx.powi(2) + self.my.powi(2) + self.mz.powi(2)).sqrt()
    }
}

/// Component-wise sum of all nodal reactions; moments are not transferred
/// to a common point
pub fn total_reaction(domain: &Domain) -> Reactions {
    let mut sum = [0.0; 6];
    for node in domain.nodes() {
        for (s, r) in sum.iter_mut().zip(padded(node.reaction(), node.ndm())) {
            *s += r;
        }
    }
    Reactions::from_array(sum)
}

fn padded(v: &DVector<f64>, ndm: usize) -> [f64; 6] {
    let mut out = [0.0; 6];
    match (ndm, v.len()) {
        (2, 3) => {
            out[0] = v[0];
            out[1] = v[1];
            out[5] = v[2];
        }
        _ => {
            for (o, x) in out.iter_mut().zip(v.iter()) {
                *o = *x;
            }
        }
    }
    out
}

/// Element forces in the basic and global systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementForces {
    pub basic: DVector<f64>,
    pub global: DVector<f64>,
}

impl ElementForces {
    pub fn of(domain: &Domain, tag: usize) -> FEAResult<Self> {
        Ok(Self {
            basic: domain.element_response(tag, ElementResponse::BasicForce)?,
            global: domain.element_response(tag, ElementResponse::GlobalForce)?,
        })
    }
}

/// Largest committed translation over all nodes, with the node tag
pub fn max_translation(domain: &Domain) -> Option<(usize, f64)> {
    domain
        .nodes()
        .map(|n| {
            let d = NodeDisplacement::from_array(padded(n.committed_disp(), n.ndm()));
            (n.tag, d.translation_magnitude())
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
