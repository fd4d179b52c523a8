//! Prestressed cable between two fixed supports

use approx::assert_relative_eq;
use fiber_fea::prelude::*;

const SIGMA0: f64 = 1000.0;
const AREA: f64 = 2.0;
const E: f64 = 30e6;
const SEGMENT: f64 = 10.0;

/// Node 1 is the right support, node 2 the left one, node 3 the middle
fn cable() -> Domain {
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[2.0 * SEGMENT, 0.0], 2).unwrap()).unwrap();
    domain.add_node(Node::new(2, &[0.0, 0.0], 2).unwrap()).unwrap();
    domain.add_node(Node::new(3, &[SEGMENT, 0.0], 2).unwrap()).unwrap();
    domain.fix(1, Fixity::pinned()).unwrap();
    domain.fix(2, Fixity::pinned()).unwrap();
    domain.fix(3, Fixity::roller_y()).unwrap();

    let material = UniaxialMaterial::cable(E, SIGMA0);
    domain.add_element(Truss::new(1, 2, 3, material.clone(), AREA).unwrap()).unwrap();
    domain.add_element(Truss::new(2, 3, 1, material, AREA).unwrap()).unwrap();
    domain.add_pattern(LoadPattern::new(1, TimeSeries::linear(1.0))).unwrap();
    domain
}

#[test]
fn test_prestress_reactions() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut domain = cable();
    let mut analysis = StaticAnalysis::new(AnalysisOptions::default(), &domain).unwrap();
    assert_eq!(analysis.analyze(&mut domain, 1), 0);

    let r1 = Reactions::of(&domain, 1).unwrap();
    let r2 = Reactions::of(&domain, 2).unwrap();
    assert_relative_eq!(r1.fx, SIGMA0 * AREA, max_relative = 1e-5);
    assert_relative_eq!(r2.fx, -SIGMA0 * AREA, max_relative = 1e-5);
    assert_relative_eq!(domain.node_disp(3).unwrap()[0], 0.0, epsilon = 1e-12);

    for tag in [1, 2] {
        let n = ElementForces::of(&domain, tag).unwrap().basic[0];
        assert_relative_eq!(n, SIGMA0 * AREA, max_relative = 1e-10);
    }
}

#[test]
fn test_middle_load_redistributes_tension() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut domain = cable();
    let p = 1000.0;
    domain.add_nodal_load(1, NodalLoad::new(3, vec![p, 0.0])).unwrap();

    let mut analysis = StaticAnalysis::new(AnalysisOptions::default(), &domain).unwrap();
    analysis.run(&mut domain, 1).unwrap();

    // Both segments stay taut, the load splits evenly between them
    let u = domain.node_disp(3).unwrap()[0];
    assert_relative_eq!(u, p * SEGMENT / (2.0 * E * AREA), max_relative = 1e-9);
    let left = ElementForces::of(&domain, 1).unwrap().basic[0];
    let right = ElementForces::of(&domain, 2).unwrap().basic[0];
    assert_relative_eq!(left, SIGMA0 * AREA + p / 2.0, max_relative = 1e-9);
    assert_relative_eq!(right, SIGMA0 * AREA - p / 2.0, max_relative = 1e-9);
}
