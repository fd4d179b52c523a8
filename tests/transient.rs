//! Single degree of freedom oscillator under a suddenly applied load

use std::f64::consts::PI;

use approx::assert_relative_eq;
use fiber_fea::prelude::*;

const K: f64 = 1000.0;
const M: f64 = 10.0;
const P: f64 = 50.0;

fn oscillator() -> Domain {
    let mut domain = Domain::new();
    domain.add_node(Node::new(1, &[0.0, 0.0], 2).unwrap()).unwrap();
    domain
        .add_node(Node::new(2, &[1.0, 0.0], 2).unwrap().with_mass(&[M, M]).unwrap())
        .unwrap();
    domain.fix(1, Fixity::pinned()).unwrap();
    domain.fix(2, Fixity::roller_y()).unwrap();
    domain
        .add_element(Truss::new(1, 1, 2, UniaxialMaterial::elastic(K), 1.0).unwrap())
        .unwrap();
    domain.add_pattern(LoadPattern::new(1, TimeSeries::constant(1.0))).unwrap();
    domain.add_nodal_load(1, NodalLoad::new(2, vec![P, 0.0])).unwrap();
    domain
}

fn period() -> f64 {
    2.0 * PI * (M / K).sqrt()
}

#[test]
fn test_newmark_step_load_response() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut domain = oscillator();
    let dt = period() / 200.0;
    let options = AnalysisOptions::transient_newmark(0.5, 0.25);
    let mut analysis = TransientAnalysis::new(options).unwrap();

    // u(t) = P/k (1 − cos ωt): peak 2P/k at half a period, back to rest after one
    analysis.run(&mut domain, 100, dt).unwrap();
    let u_half = domain.node_disp(2).unwrap()[0];
    assert_relative_eq!(u_half, 2.0 * P / K, max_relative = 0.01);

    analysis.run(&mut domain, 100, dt).unwrap();
    let u_full = domain.node_disp(2).unwrap()[0];
    assert!(u_full.abs() < 0.01 * P / K, "u(T) = {u_full}");
    assert_eq!(analysis.committed_steps(), 200);
    assert_relative_eq!(domain.committed_time(), period(), max_relative = 1e-9);
}

#[test]
fn test_hht_dissipates_less_than_it_keeps() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut domain = oscillator();
    let dt = period() / 100.0;
    let mut analysis = TransientAnalysis::new(AnalysisOptions::transient_hht(0.9)).unwrap();
    analysis.run(&mut domain, 50, dt).unwrap();
    let u_half = domain.node_disp(2).unwrap()[0];
    assert!(u_half > 1.9 * P / K && u_half < 2.0 * P / K + 1e-9, "u(T/2) = {u_half}");
}

#[test]
fn test_rayleigh_damping_settles_at_static_solution() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut domain = oscillator();
    // 20 % of critical through the mass term alone
    let omega = (K / M).sqrt();
    domain.set_rayleigh(Some(Rayleigh::new(2.0 * 0.2 * omega, 0.0, 0.0)));
    let dt = period() / 50.0;
    let mut analysis = TransientAnalysis::new(AnalysisOptions::transient_newmark(0.5, 0.25)).unwrap();
    analysis.run(&mut domain, 1000, dt).unwrap();
    let u = domain.node_disp(2).unwrap()[0];
    assert_relative_eq!(u, P / K, max_relative = 1e-4);
    let v = domain.node(2).unwrap().trial_vel()[0];
    assert!(v.abs() < 1e-6);
}

#[test]
fn test_static_integrator_rejected() {
    let err = TransientAnalysis::new(AnalysisOptions::static_load_control(0.1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    let code = TransientAnalysis::new(AnalysisOptions::transient_newmark(0.5, 0.25))
        .unwrap()
        .analyze(&mut oscillator(), 1, -0.1);
    assert_eq!(code, -1);
}
