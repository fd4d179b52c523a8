//! Displacement control, arc length, iteration schemes and large rotations

use approx::assert_relative_eq;
use fiber_fea::prelude::*;
use fiber_fea::sections::geometry::rect_patch;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Horizontal bar along X, free to move axially at node 2
fn bar(material: UniaxialMaterial, p: f64) -> Domain {
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[0.0, 0.0], 2).unwrap()).unwrap();
    domain.add_node(Node::new(2, &[1.0, 0.0], 2).unwrap()).unwrap();
    domain.fix(1, Fixity::pinned()).unwrap();
    domain.fix(2, Fixity::roller_y()).unwrap();
    domain.add_element(Truss::new(1, 1, 2, material, 1.0).unwrap()).unwrap();
    domain.add_pattern(LoadPattern::new(1, TimeSeries::linear(1.0))).unwrap();
    domain.add_nodal_load(1, NodalLoad::new(2, vec![p, 0.0])).unwrap();
    domain
}

#[test]
fn test_displacement_control_linear_bar() {
    init_logging();
    let (k, p) = (1.0e6, 1000.0);
    let mut domain = bar(UniaxialMaterial::elastic(k), p);
    let options = AnalysisOptions::static_displacement_control(2, 0, 1e-3);
    let mut analysis = StaticAnalysis::new(options, &domain).unwrap();
    analysis.run(&mut domain, 4).unwrap();

    let u = domain.node_disp(2).unwrap()[0];
    assert_relative_eq!(u, 4e-3, max_relative = 1e-12);
    assert_relative_eq!(analysis.load_factor(), k * u / p, max_relative = 1e-10);
    assert_relative_eq!(domain.committed_time(), analysis.load_factor());
}

#[test]
fn test_displacement_control_through_yield() {
    init_logging();
    // Bilinear bar: yield at u = 0.01, hardening 1 % of E after that
    let (e, fy, b) = (1000.0, 10.0, 0.01);
    let mut domain = bar(UniaxialMaterial::steel01(fy, e, b), 1.0);
    let options = AnalysisOptions::static_displacement_control(2, 0, 4e-3);
    let mut analysis = StaticAnalysis::new(options, &domain).unwrap();
    analysis.run(&mut domain, 5).unwrap();

    let u = domain.node_disp(2).unwrap()[0];
    assert_relative_eq!(u, 0.02, max_relative = 1e-12);
    let expected = fy + b * e * (u - fy / e);
    assert_relative_eq!(analysis.load_factor(), expected, max_relative = 1e-8);
}

#[test]
fn test_arc_length_on_linear_cantilever() {
    init_logging();
    let (e, i, l, p) = (2.0e11, 8.0e-6, 2.0, 1000.0);
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[0.0, 0.0], 3).unwrap()).unwrap();
    domain.add_node(Node::new(2, &[l, 0.0], 3).unwrap()).unwrap();
    domain.fix(1, Fixity::fixed()).unwrap();
    let props = CrossSectionProperties::new(e, e / 2.6, 0.01, i, i, 1e-6);
    domain
        .add_element(ElasticBeam2d::new(1, 1, 2, props, CrdTransf::linear_2d()).unwrap())
        .unwrap();
    domain.add_pattern(LoadPattern::new(1, TimeSeries::linear(1.0))).unwrap();
    domain.add_nodal_load(1, NodalLoad::new(2, vec![0.0, -p, 0.0])).unwrap();

    let ds = 1e-3;
    let options = AnalysisOptions::static_arc_length(ds, 0.0);
    let mut analysis = StaticAnalysis::new(options, &domain).unwrap();
    analysis.run(&mut domain, 5).unwrap();

    let lambda = analysis.load_factor();
    assert!(lambda > 0.0);
    let u = domain.node_disp(2).unwrap();
    assert_relative_eq!(u[1] / lambda, -p * l.powi(3) / (3.0 * e * i), max_relative = 1e-8);
    assert_relative_eq!(u[2] / lambda, -p * l * l / (2.0 * e * i), max_relative = 1e-8);
    // Each step moves the free dofs by ΔS along the same direction
    assert_relative_eq!(u.norm(), 5.0 * ds, max_relative = 1e-8);
}

fn fiber_column() -> Domain {
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[0.0, 0.0], 3).unwrap()).unwrap();
    domain.add_node(Node::new(2, &[0.0, 3.0], 3).unwrap()).unwrap();
    domain.fix(1, Fixity::fixed()).unwrap();
    let steel = UniaxialMaterial::steel02(300e6, 200e9, 0.01);
    let fibers = rect_patch(&steel, 16, 1, (-0.1, -0.05), (0.1, 0.05));
    let section = Section::from(FiberSection2d::new(fibers).unwrap());
    let column = ForceBeamColumn2d::uniform(1, 1, 2, CrdTransf::linear_2d(), 4, section).unwrap();
    domain.add_element(column).unwrap();
    domain.add_pattern(LoadPattern::new(1, TimeSeries::linear(1.0))).unwrap();
    domain.add_nodal_load(1, NodalLoad::new(2, vec![60_000.0, -100_000.0, 0.0])).unwrap();
    domain
}

#[test]
fn test_iteration_schemes_agree_on_fiber_column() {
    init_logging();
    let solve = |algorithm: Algorithm| {
        let mut domain = fiber_column();
        let options = AnalysisOptions::static_load_control(0.25)
            .with_algorithm(algorithm)
            .with_max_iter(100);
        let mut analysis = StaticAnalysis::new(options, &domain).unwrap();
        let summary = analysis.run(&mut domain, 4).unwrap();
        assert_eq!(summary.committed_steps, 4);
        domain.node_disp(2).unwrap().clone()
    };

    let newton = solve(Algorithm::Newton { initial_tangent: false });
    assert!(newton[0] > 0.0);
    for algorithm in [
        Algorithm::ModifiedNewton { initial_tangent: false },
        Algorithm::KrylovNewton { max_dim: 3 },
    ] {
        let u = solve(algorithm);
        for k in 0..3 {
            assert_relative_eq!(u[k], newton[k], max_relative = 1e-6, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_corotational_cantilever_bends_into_a_circle() {
    init_logging();
    let (e, a, i, l, n) = (2.0e11, 0.01, 1.0e-5, 1.0, 10);
    let mut domain = Domain::new();
    for k in 0..=n {
        let x = l * k as f64 / n as f64;
        domain.add_node(Node::new(k + 1, &[x, 0.0], 3).unwrap()).unwrap();
    }
    domain.fix(1, Fixity::fixed()).unwrap();
    let props = CrossSectionProperties::new(e, e / 2.6, a, i, i, 1e-6);
    for k in 1..=n {
        let beam = ElasticBeam2d::new(k, k, k + 1, props.clone(), CrdTransf::corotational_2d()).unwrap();
        domain.add_element(beam).unwrap();
    }

    // End moment giving curvature κ = 1/L: the tip turns through one radian
    let kappa = 1.0 / l;
    let m = kappa * e * i;
    domain.add_pattern(LoadPattern::new(1, TimeSeries::linear(1.0))).unwrap();
    domain.add_nodal_load(1, NodalLoad::new(n + 1, vec![0.0, 0.0, m])).unwrap();

    let options = AnalysisOptions::static_load_control(0.1).with_max_iter(50);
    let mut analysis = StaticAnalysis::new(options, &domain).unwrap();
    analysis.run(&mut domain, 10).unwrap();
    let tip = domain.node_disp(n + 1).unwrap();

    assert_relative_eq!(tip[2], kappa * l, max_relative = 1e-8);

    // Chords of equal length turning by κ·Le each
    let le = l / n as f64;
    let (mut x, mut y) = (0.0, 0.0);
    for k in 0..n {
        let angle = (k as f64 + 0.5) * kappa * le;
        x += le * angle.cos();
        y += le * angle.sin();
    }
    assert_relative_eq!(tip[0], x - l, max_relative = 1e-6);
    assert_relative_eq!(tip[1], y, max_relative = 1e-6);

    // and the same within discretization error of the exact arc
    assert!((tip[0] - ((kappa * l).sin() / kappa - l)).abs() < 1e-3);
    assert!((tip[1] - (1.0 - (kappa * l).cos()) / kappa).abs() < 1e-3);
}
