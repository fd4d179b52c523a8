//! Fiber-section portal frame: gravity, lateral pushover, then modes

use anyhow::{Context, Result};
use fiber_fea::prelude::*;
use fiber_fea::results::{max_translation, total_reaction};
use fiber_fea::sections::geometry::i_shape;

const HEIGHT: f64 = 4.0;
const SPAN: f64 = 6.0;
const STOREY_MASS: f64 = 20_000.0;

fn build_frame() -> Result<Domain> {
    let mut domain = Domain::new();

    //     3 -------- 4
    //     |          |
    //     1          2
    let m = STOREY_MASS / 2.0;
    domain.add_node(Node::new(1, &[0.0, 0.0], 3)?)?;
    domain.add_node(Node::new(2, &[SPAN, 0.0], 3)?)?;
    domain.add_node(Node::new(3, &[0.0, HEIGHT], 3)?.with_mass(&[m, m, 0.0])?)?;
    domain.add_node(Node::new(4, &[SPAN, HEIGHT], 3)?.with_mass(&[m, m, 0.0])?)?;
    domain.fix(1, Fixity::fixed())?;
    domain.fix(2, Fixity::fixed())?;

    // IPE300-like fibers in S355
    let steel = UniaxialMaterial::steel02(355e6, 200e9, 0.01);
    let fibers = i_shape(&steel, 0.300, 0.150, 0.0107, 0.0071, 4, 12, 8);
    let section = Section::from(FiberSection2d::new(fibers)?);

    let transf = CrdTransf::corotational_2d();
    domain.add_element(ForceBeamColumn2d::uniform(1, 1, 3, transf.clone(), 5, section.clone())?)?;
    domain.add_element(ForceBeamColumn2d::uniform(2, 2, 4, transf.clone(), 5, section.clone())?)?;
    domain.add_element(ForceBeamColumn2d::uniform(3, 3, 4, transf, 5, section)?)?;

    // Gravity ramps to full value at λ = 1 and holds
    let gravity = TimeSeries::path_time(vec![0.0, 1.0], vec![0.0, 1.0], 1.0)?.with_use_last(true);
    domain.add_pattern(LoadPattern::new(1, gravity))?;
    let w = -SPAN * 20_000.0 / 2.0;
    domain.add_nodal_load(1, NodalLoad::new(3, vec![0.0, w, 0.0]))?;
    domain.add_nodal_load(1, NodalLoad::new(4, vec![0.0, w, 0.0]))?;

    // Lateral reference load grows with λ − 1
    let lateral = TimeSeries::path_time(vec![1.0, 1001.0], vec![0.0, 1000.0], 1.0)?;
    domain.add_pattern(LoadPattern::new(2, lateral))?;
    domain.add_nodal_load(2, NodalLoad::new(3, vec![1000.0, 0.0, 0.0]))?;

    Ok(domain)
}

fn main() -> Result<()> {
    env_logger::init();
    let mut domain = build_frame()?;

    println!("=== Gravity ===");
    let options = AnalysisOptions::static_load_control(0.1).with_tolerance(1e-10);
    let mut gravity = StaticAnalysis::new(options, &domain)?;
    gravity.run(&mut domain, 10).context("gravity analysis")?;
    let r = total_reaction(&domain);
    println!("  λ = {:.3}, base shear {:.2} kN, base axial {:.2} kN", domain.committed_time(), r.fx / 1e3, r.fy / 1e3);

    println!("\n=== Pushover ===");
    let options = AnalysisOptions::static_displacement_control(3, 0, 0.002)
        .with_max_iter(50)
        .with_max_cutbacks(4);
    let mut pushover = StaticAnalysis::new(options, &domain)?;
    for _ in 0..10 {
        pushover.run(&mut domain, 5).context("pushover")?;
        let u = NodeDisplacement::of(&domain, 3)?;
        println!(
            "  roof drift {:7.2} mm   lateral load {:8.2} kN",
            u.dx * 1e3,
            (domain.committed_time() - 1.0)
        );
    }
    if let Some((tag, d)) = max_translation(&domain) {
        println!("  largest translation {:.2} mm at node {tag}", d * 1e3);
    }
    let column = ElementForces::of(&domain, 1)?;
    println!("  column 1 basic forces {:?}", column.basic.as_slice());

    println!("\n=== Modes at the deformed state ===");
    let mut modes = EigenAnalysis::new(AnalysisOptions::eigen(EigenSolver::FullGenEigen))?;
    modes.run(&mut domain, 2).context("eigen analysis")?;
    for (k, t) in domain.periods().iter().enumerate() {
        println!("  T{} = {:.4} s", k + 1, t);
    }

    Ok(())
}
