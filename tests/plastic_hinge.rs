//! Fiber cantilever loaded close to its plastic moment

use approx::assert_relative_eq;
use fiber_fea::prelude::*;
use fiber_fea::sections::geometry::i_shape;

// IPE200
const DEPTH: f64 = 0.200;
const FLANGE_WIDTH: f64 = 0.100;
const FLANGE_THICKNESS: f64 = 0.0085;
const WEB_THICKNESS: f64 = 0.0056;
const W_PL: f64 = 220.6e-6;

// S355JR
const FY: f64 = 355e6;
const E: f64 = 210e9;

const L: f64 = 1.0;

fn ipe200() -> FiberSection2d {
    let steel = UniaxialMaterial::steel01(FY, E, 0.001);
    let fibers = i_shape(&steel, DEPTH, FLANGE_WIDTH, FLANGE_THICKNESS, WEB_THICKNESS, 6, 20, 8);
    FiberSection2d::new(fibers).unwrap()
}

fn cantilever(section: FiberSection2d, f: f64) -> Domain {
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[0.0, 0.0], 3).unwrap()).unwrap();
    domain.add_node(Node::new(2, &[L, 0.0], 3).unwrap()).unwrap();
    domain.fix(1, Fixity::fixed()).unwrap();
    let beam = ForceBeamColumn2d::uniform(1, 1, 2, CrdTransf::linear_2d(), 5, Section::from(section)).unwrap();
    domain.add_element(beam).unwrap();
    domain.add_pattern(LoadPattern::new(1, TimeSeries::linear(1.0))).unwrap();
    domain.add_nodal_load(1, NodalLoad::new(2, vec![0.0, -f, 0.0])).unwrap();
    domain
}

#[test]
fn test_base_moment_after_ten_increments() {
    let _ = env_logger::builder().is_test(true).try_init();
    let section = ipe200();
    let eiz = section.eiz();
    let f = 0.87 * W_PL * FY;
    let mut domain = cantilever(section, f);

    let options = AnalysisOptions::static_load_control(0.1)
        .with_max_iter(50)
        .with_max_cutbacks(2);
    let mut analysis = StaticAnalysis::new(options, &domain).unwrap();
    assert_eq!(analysis.analyze(&mut domain, 10), 0);
    assert_eq!(analysis.committed_steps(), 10);
    assert!(analysis.last_error().is_none());
    assert_relative_eq!(domain.committed_time(), 1.0, epsilon = 1e-12);

    let m0_theory = f * L;
    let m0 = domain.element_response(1, ElementResponse::SectionForce(0)).unwrap()[1].abs();
    assert!((m0 - m0_theory).abs() / m0_theory < 0.2, "M0 = {m0}, expected {m0_theory}");

    let base = Reactions::of(&domain, 1).unwrap();
    assert_relative_eq!(base.mz.abs(), m0_theory, max_relative = 1e-6);

    // The base fibers yield, so the tip moves more than the elastic estimate
    let elastic = f * L.powi(3) / (3.0 * eiz);
    let tip = NodeDisplacement::of(&domain, 2).unwrap();
    assert!(tip.dy < 0.0);
    assert!(tip.dy.abs() > elastic, "tip {} vs elastic {elastic}", tip.dy);
}

#[test]
fn test_hinge_response_is_path_dependent() {
    let _ = env_logger::builder().is_test(true).try_init();
    let section = ipe200();
    let w_pl: f64 = section.fibers().iter().map(|fb| fb.y.abs() * fb.area).sum();
    let f = 0.97 * w_pl * FY;
    let mut domain = cantilever(section, f);

    // Load to F, then unload to zero; the hinge leaves a permanent set
    let options = AnalysisOptions::static_load_control(0.1)
        .with_max_iter(50)
        .with_max_cutbacks(3);
    let mut up = StaticAnalysis::new(options, &domain).unwrap();
    up.run(&mut domain, 10).unwrap();
    let mut down = StaticAnalysis::new(AnalysisOptions::static_load_control(-0.1), &domain).unwrap();
    down.run(&mut domain, 10).unwrap();

    assert_relative_eq!(domain.committed_time(), 0.0, epsilon = 1e-12);
    let residual = NodeDisplacement::of(&domain, 2).unwrap();
    assert!(residual.dy < -1e-6, "permanent set {}", residual.dy);

    let m0 = domain.element_response(1, ElementResponse::SectionForce(0)).unwrap()[1];
    assert!(m0.abs() < 1e-3 * f * L);
}
