//! Fiber FEA - a nonlinear finite element core for frames and shells
//!
//! The crate provides:
//! - Uniaxial materials (elastic, steel, concrete, cable) with trial/commit state
//! - Elastic, fiber and aggregated sections with a moment-curvature solver
//! - Elastic and force-based beam-columns, trusses, zero-length elements
//!   and MITC4 shells
//! - Linear and corotational coordinate transformations
//! - Single- and multi-point constraints with plain, transformation,
//!   penalty and Lagrange handlers
//! - Static (load, displacement, arc-length control), transient
//!   (Newmark, HHT) and eigen analyses
//!
//! ## Example
//! ```rust
//! use fiber_fea::prelude::*;
//!
//! let mut domain = Domain::new();
//! domain.add_node(Node::new(1, &[0.0, 0.0], 2).unwrap()).unwrap();
//! domain.add_node(Node::new(2, &[1.0, 0.0], 2).unwrap()).unwrap();
//!
//! let steel = UniaxialMaterial::elastic(200e9);
//! domain.add_element(Truss::new(1, 1, 2, steel, 0.01).unwrap()).unwrap();
//! domain.fix(1, Fixity::pinned()).unwrap();
//! domain.fix(2, Fixity::roller_y()).unwrap();
//!
//! domain.add_pattern(LoadPattern::new(1, TimeSeries::Linear { factor: 1.0 })).unwrap();
//! domain.add_nodal_load(1, NodalLoad::new(2, vec![1000.0, 0.0])).unwrap();
//!
//! let mut analysis = StaticAnalysis::new(AnalysisOptions::default(), &domain).unwrap();
//! analysis.run(&mut domain, 1).unwrap();
//! let u = domain.node_disp(2).unwrap()[0];
//! assert!((u - 1000.0 / (200e9 * 0.01)).abs() < 1e-12);
//! ```

pub mod analysis;
pub mod constraints;
pub mod domain;
pub mod elements;
pub mod error;
pub mod loads;
pub mod materials;
pub mod math;
pub mod results;
pub mod sections;
pub mod transform;

// Re-export common types
pub mod prelude {
    pub use crate::analysis::{
        Algorithm, AnalysisOptions, AnalysisType, ConstraintHandler, ConvergenceTest,
        EigenAnalysis, EigenSolver, IntegratorOptions, Numberer, SoeKind, StaticAnalysis,
        TransientAnalysis,
    };
    pub use crate::constraints::{Fixity, MpConstraint, SpConstraint};
    pub use crate::domain::{Domain, Rayleigh};
    pub use crate::elements::{
        BeamIntegration, CorotTruss, ElasticBeam2d, ElasticBeam3d, Element, ElementResponse,
        ForceBeamColumn2d, ForceBeamColumn3d, MassType, Node, ShellMitc4, Truss, ZeroLength,
        ZeroLengthSection,
    };
    pub use crate::error::{ErrorKind, FEAError, FEAResult};
    pub use crate::loads::{ElementLoad, LoadPattern, NodalLoad, TimeSeries};
    pub use crate::materials::{
        Cable, Concrete01, Concrete02, Elastic, ElasticPP, Steel01, Steel02, UniaxialMaterial,
    };
    pub use crate::results::{AnalysisSummary, ElementForces, NodeDisplacement, Reactions};
    pub use crate::sections::{
        CrossSectionProperties, ElasticMembranePlateSection, ElasticSection2d, ElasticSection3d,
        FiberSection2d, FiberSection3d, Section, SectionAggregator,
    };
    pub use crate::transform::CrdTransf;
}
