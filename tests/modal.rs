//! Natural frequencies of an inclined cantilever

use std::f64::consts::PI;

use approx::assert_relative_eq;
use fiber_fea::prelude::*;

const L: f64 = 1.0;
const B: f64 = 0.05;
const H: f64 = 0.10;
const RHO: f64 = 7800.0;
const E: f64 = 2e11;
const LAMBDA1: f64 = 1.87510407;

fn inertia() -> f64 {
    H * B.powi(3) / 12.0
}

fn inclined_cantilever(n: usize) -> Domain {
    let mut domain = Domain::new();
    let (s, c) = (PI / 6.0).sin_cos();
    for k in 0..=n {
        let x = L * k as f64 / n as f64;
        domain.add_node(Node::new(k + 1, &[x * c, x * s], 3).unwrap()).unwrap();
    }
    domain.fix(1, Fixity::fixed()).unwrap();

    let g = E / 2.6;
    let props = CrossSectionProperties::new(E, g, B * H, inertia(), inertia(), 1e-6).with_material(E, g, RHO);
    for k in 1..=n {
        let beam = ElasticBeam2d::new(k, k, k + 1, props.clone(), CrdTransf::linear_2d())
            .unwrap()
            .with_mass_type(MassType::Consistent);
        domain.add_element(beam).unwrap();
    }
    domain
}

fn first_frequency_theory() -> f64 {
    LAMBDA1.powi(2) / (2.0 * PI * L * L) * (E * inertia() / (RHO * B * H)).sqrt()
}

#[test]
fn test_first_frequency_full_solver() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut domain = inclined_cantilever(10);
    let mut modes = EigenAnalysis::new(AnalysisOptions::eigen(EigenSolver::FullGenEigen)).unwrap();
    assert_eq!(modes.analyze(&mut domain, 3), 0);

    let f = domain.frequencies();
    assert_eq!(f.len(), 3);
    let expected = first_frequency_theory();
    assert!((f[0] - expected).abs() / expected < 0.005, "f1 = {}, expected {expected}", f[0]);
    assert!(f.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_lanczos_matches_full_solver() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut full = inclined_cantilever(10);
    let mut lanczos = full.clone();

    let mut a = EigenAnalysis::new(AnalysisOptions::eigen(EigenSolver::FullGenEigen)).unwrap();
    let va = a.run(&mut full, 4).unwrap();
    let solver = EigenSolver::ShiftInvertLanczos { shift: 0.0 };
    let mut b = EigenAnalysis::new(AnalysisOptions::eigen(solver).with_soe(SoeKind::BandSpd)).unwrap();
    let vb = b.run(&mut lanczos, 4).unwrap();
    for (x, y) in va.iter().zip(&vb) {
        assert_relative_eq!(*x, *y, max_relative = 1e-8);
    }

    // Tip motion of the first mode is normal to the member axis
    let tip = lanczos.node(11).unwrap().eigenvector(0).unwrap();
    let (s, c) = (PI / 6.0).sin_cos();
    let axial = tip[0] * c + tip[1] * s;
    let transverse = -tip[0] * s + tip[1] * c;
    assert!(axial.abs() < 1e-6 * transverse.abs());
}

#[test]
fn test_eigen_requires_mass() {
    let _ = env_logger::builder().is_test(true).try_init();
    let g = E / 2.6;
    let props = CrossSectionProperties::new(E, g, B * H, inertia(), inertia(), 1e-6);
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[0.0, 0.0], 3).unwrap()).unwrap();
    domain.add_node(Node::new(2, &[1.0, 0.0], 3).unwrap()).unwrap();
    domain.fix(1, Fixity::fixed()).unwrap();
    domain
        .add_element(ElasticBeam2d::new(1, 1, 2, props, CrdTransf::linear_2d()).unwrap())
        .unwrap();

    let mut modes = EigenAnalysis::new(AnalysisOptions::eigen(EigenSolver::FullGenEigen)).unwrap();
    let err = modes.run(&mut domain, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Numerical);
    assert_eq!(modes.analyze(&mut domain, 1), -3);
    assert_eq!(modes.last_error().map(|e| e.kind), Some(ErrorKind::Numerical));
    assert!(domain.diagnostics().last_error().is_some());
}

#[test]
fn test_lagrange_handler_is_rejected() {
    let options = AnalysisOptions::eigen(EigenSolver::FullGenEigen)
        .with_handler(ConstraintHandler::Lagrange { alpha: 1.0 });
    let err = EigenAnalysis::new(options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Constraint);
}
