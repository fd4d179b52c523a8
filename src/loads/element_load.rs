//! Loads applied through elements

use serde::{Deserialize, Serialize};

use crate::sections::DeformationPlane;

/// Element load kinds
///
/// Beam load components act in the local element axes; `x` of a point load
/// is the relative position along the element (0 at node I, 1 at node J).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementLoad {
    BeamUniform {
        axial: f64,
        trans_y: f64,
        #[serde(default)]
        trans_z: f64,
    },
    BeamPoint {
        axial: f64,
        trans_y: f64,
        #[serde(default)]
        trans_z: f64,
        x: f64,
    },
    /// Imposed section deformations varying linearly from node I to node J
    BeamStrain {
        back: DeformationPlane,
        front: DeformationPlane,
    },
    /// Imposed axial strain at each end of a truss
    TrussStrain { eps_i: f64, eps_j: f64 },
    /// Pressure along the shell normal g3
    ShellUniform { pressure: f64 },
    /// Imposed generalized strains at the four Gauss points
    ShellStrain { strains: [[f64; 8]; 4] },
    /// Uniform acceleration, in nodal dof components, applied to the element mass
    Inertia { accel: Vec<f64> },
}

impl ElementLoad {
    pub fn beam_uniform(trans_y: f64, trans_z: f64, axial: f64) -> Self {
        ElementLoad::BeamUniform {
            axial,
            trans_y,
            trans_z,
        }
    }

    pub fn beam_point(trans_y: f64, trans_z: f64, x: f64, axial: f64) -> Self {
        ElementLoad::BeamPoint {
            axial,
            trans_y,
            trans_z,
            x,
        }
    }

    /// Uniform imposed deformation over the element
    pub fn beam_strain(plane: DeformationPlane) -> Self {
        ElementLoad::BeamStrain {
            back: plane,
            front: plane,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ElementLoad::BeamUniform { .. } => "BeamUniform",
            ElementLoad::BeamPoint { .. } => "BeamPoint",
            ElementLoad::BeamStrain { .. } => "BeamStrain",
            ElementLoad::TrussStrain { .. } => "TrussStrain",
            ElementLoad::ShellUniform { .. } => "ShellUniform",
            ElementLoad::ShellStrain { .. } => "ShellStrain",
            ElementLoad::Inertia { .. } => "Inertia",
        }
    }
}
