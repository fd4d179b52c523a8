//! Force-based beam-columns with distributed plasticity
//!
//! Section forces follow from the basic forces through exact equilibrium
//! interpolation, so the element needs an inner iteration to find the basic
//! forces compatible with the imposed basic deformations. Each integration
//! point carries its own section.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::beam::{imposed_basic_deformation, initialize_transf, update_transf};
use super::{check_nodes, no_section, not_initialized, ElementBehavior, ElementResponse, Node};
use crate::error::{FEAError, FEAResult};
use crate::loads::ElementLoad;
use crate::math::quadrature::{gauss_legendre, gauss_lobatto};
use crate::sections::{ResponseCode, Section};
use crate::transform::{CrdTransf, CrdTransfBehavior};

const SUBDIVISIONS: [usize; 5] = [1, 2, 4, 8, 16];

/// Integration rule along the element, on [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamIntegration {
    pub points: Vec<f64>,
    pub weights: Vec<f64>,
}

impl BeamIntegration {
    /// Gauss–Lobatto rule with `n` points, 2 ≤ n ≤ 10
    pub fn lobatto(n: usize) -> FEAResult<Self> {
        if !(2..=10).contains(&n) {
            return Err(FEAError::InvalidInput(format!(
                "force-based beam needs 2 to 10 integration points, got {n}"
            )));
        }
        let (points, weights) = gauss_lobatto(n)?;
        Ok(Self { points, weights })
    }

    /// Gauss–Legendre rule with `n` points; no section at the element ends
    pub fn legendre(n: usize) -> FEAResult<Self> {
        if !(1..=10).contains(&n) {
            return Err(FEAError::InvalidInput(format!(
                "force-based beam needs 1 to 10 integration points, got {n}"
            )));
        }
        let (xs, ws) = gauss_legendre(n)?;
        Ok(Self {
            points: xs.iter().map(|x| 0.5 * (x + 1.0)).collect(),
            weights: ws.iter().map(|w| 0.5 * w).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Section force interpolation matrix b(ξ) for the given section codes
fn force_interpolation(codes: &[ResponseCode], xi: f64, l: f64, nq: usize) -> DMatrix<f64> {
    let mut b = DMatrix::zeros(codes.len(), nq);
    for (r, code) in codes.iter().enumerate() {
        match code {
            ResponseCode::P => b[(r, 0)] = 1.0,
            ResponseCode::Mz => {
                b[(r, 1)] = xi - 1.0;
                b[(r, 2)] = xi;
            }
            ResponseCode::Vy => {
                b[(r, 1)] = 1.0 / l;
                b[(r, 2)] = 1.0 / l;
            }
            ResponseCode::My if nq == 6 => {
                b[(r, 3)] = xi - 1.0;
                b[(r, 4)] = xi;
            }
            ResponseCode::Vz if nq == 6 => {
                b[(r, 3)] = 1.0 / l;
                b[(r, 4)] = 1.0 / l;
            }
            ResponseCode::T if nq == 6 => b[(r, 5)] = 1.0,
            _ => {}
        }
    }
    b
}

/// Section forces of a simply supported member under one element load
///
/// Returned as (N, Mz, Vy, My, Vz) at abscissa `x`.
fn particular_forces(load: &ElementLoad, factor: f64, l: f64, x: f64) -> [f64; 5] {
    match load {
        ElementLoad::BeamUniform {
            axial,
            trans_y,
            trans_z,
        } => {
            let (wa, wy, wz) = (axial * factor, trans_y * factor, trans_z * factor);
            [
                wa * (l - x),
                0.5 * wy * x * (x - l),
                wy * (x - 0.5 * l),
                0.5 * wz * x * (l - x),
                wz * (0.5 * l - x),
            ]
        }
        ElementLoad::BeamPoint {
            axial,
            trans_y,
            trans_z,
            x: xr,
        } => {
            let (n, py, pz) = (axial * factor, trans_y * factor, trans_z * factor);
            let a = xr * l;
            let (vy2, vz2) = (py * xr, pz * xr);
            let (vy1, vz1) = (py - vy2, pz - vz2);
            if x <= a {
                [n, -x * vy1, -vy1, x * vz1, vz1]
            } else {
                [0.0, -(l - x) * vy2, vy2, (l - x) * vz2, -vz2]
            }
        }
        _ => [0.0; 5],
    }
}

/// End reactions of the simply supported member (P, Vy_I, Vy_J[, Vz_I, Vz_J])
fn add_reactions(p0: &mut DVector<f64>, load: &ElementLoad, factor: f64, l: f64) {
    let spatial = p0.len() == 5;
    match load {
        ElementLoad::BeamUniform {
            axial,
            trans_y,
            trans_z,
        } => {
            p0[0] -= axial * factor * l;
            p0[1] -= 0.5 * trans_y * factor * l;
            p0[2] -= 0.5 * trans_y * factor * l;
            if spatial {
                p0[3] -= 0.5 * trans_z * factor * l;
                p0[4] -= 0.5 * trans_z * factor * l;
            }
        }
        ElementLoad::BeamPoint {
            axial,
            trans_y,
            trans_z,
            x,
        } => {
            let (py, pz) = (trans_y * factor, trans_z * factor);
            p0[0] -= axial * factor;
            p0[1] -= py * (1.0 - x);
            p0[2] -= py * x;
            if spatial {
                p0[3] -= pz * (1.0 - x);
                p0[4] -= pz * x;
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BasicState {
    q: DVector<f64>,
    kv: DMatrix<f64>,
    vr: DVector<f64>,
    v: DVector<f64>,
}

impl BasicState {
    fn zeros(nq: usize) -> Self {
        Self {
            q: DVector::zeros(nq),
            kv: DMatrix::zeros(nq, nq),
            vr: DVector::zeros(nq),
            v: DVector::zeros(nq),
        }
    }
}

/// State shared by the planar and spatial force-based elements
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ForceBeamCore {
    tag: usize,
    nodes: [usize; 2],
    transf: CrdTransf,
    integration: BeamIntegration,
    sections: Vec<Section>,
    /// Element-level torsional rigidity when the sections carry no torsion
    torsion_gj: Option<f64>,
    tol: f64,
    max_iter: usize,
    trial: BasicState,
    committed: BasicState,
    kv_initial: DMatrix<f64>,
    loads: Vec<(ElementLoad, f64)>,
    p0: DVector<f64>,
    /// Imposed basic deformations from strain loads
    v0: DVector<f64>,
    needs_update: bool,
    initialized: bool,
}

impl ForceBeamCore {
    fn new(
        tag: usize,
        nodes: [usize; 2],
        transf: CrdTransf,
        integration: BeamIntegration,
        sections: Vec<Section>,
    ) -> FEAResult<Self> {
        if sections.len() != integration.len() {
            return Err(FEAError::InvalidInput(format!(
                "element {tag} has {} sections for {} integration points",
                sections.len(),
                integration.len()
            )));
        }
        let spatial = transf.is_3d();
        for s in &sections {
            let foreign = s.codes().into_iter().any(|c| {
                !spatial && matches!(c, ResponseCode::My | ResponseCode::T | ResponseCode::Vz)
            });
            if foreign {
                return Err(FEAError::InvalidInput(format!(
                    "element {tag}: planar element cannot use {} section",
                    s.class_name()
                )));
            }
        }
        let nq = if spatial { 6 } else { 3 };
        Ok(Self {
            tag,
            nodes,
            transf,
            integration,
            sections,
            torsion_gj: None,
            tol: 1e-12,
            max_iter: 10,
            trial: BasicState::zeros(nq),
            committed: BasicState::zeros(nq),
            kv_initial: DMatrix::zeros(nq, nq),
            loads: Vec::new(),
            p0: DVector::zeros(if spatial { 5 } else { 3 }),
            v0: DVector::zeros(nq),
            needs_update: true,
            initialized: false,
        })
    }

    fn nq(&self) -> usize {
        self.trial.q.len()
    }

    fn spatial(&self) -> bool {
        self.nq() == 6
    }

    fn length(&self) -> f64 {
        self.transf.behavior().initial_length()
    }

    fn element_torsion(&self) -> bool {
        self.spatial()
            && !self
                .sections
                .iter()
                .any(|s| s.code_index(ResponseCode::T).is_some())
    }

    fn check_initialized(&self) -> FEAResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(not_initialized(self.tag))
        }
    }

    fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        let ndf = if self.spatial() { 6 } else { 3 };
        initialize_transf(self.tag, &mut self.transf, nodes, ndf)?;
        if self.element_torsion() && self.torsion_gj.is_none() {
            return Err(FEAError::InvalidInput(format!(
                "element {}: sections carry no torsion and no GJ was given",
                self.tag
            )));
        }
        let kv = self.initial_flexibility()?.try_inverse().ok_or(FEAError::SingularMatrix)?;
        self.kv_initial = kv.clone();
        self.trial = BasicState::zeros(self.nq());
        self.trial.kv = kv;
        self.committed = self.trial.clone();
        self.initialized = true;
        self.needs_update = true;
        Ok(())
    }

    fn initial_flexibility(&self) -> FEAResult<DMatrix<f64>> {
        let (l, nq) = (self.length(), self.nq());
        let mut f = DMatrix::zeros(nq, nq);
        for (i, s) in self.sections.iter().enumerate() {
            let b = force_interpolation(&s.codes(), self.integration.points[i], l, nq);
            let fs = s.initial_flexibility()?;
            f += b.transpose() * fs * &b * (self.integration.weights[i] * l);
        }
        if let (true, Some(gj)) = (self.element_torsion(), self.torsion_gj) {
            f[(5, 5)] += l / gj;
        }
        Ok(f)
    }

    fn section_load_forces(&self, codes: &[ResponseCode], xi: f64) -> DVector<f64> {
        let l = self.length();
        let mut acc = [0.0; 5];
        for (load, factor) in &self.loads {
            let f = particular_forces(load, *factor, l, xi * l);
            for (a, v) in acc.iter_mut().zip(f) {
                *a += v;
            }
        }
        DVector::from_iterator(
            codes.len(),
            codes.iter().map(|c| match c {
                ResponseCode::P => acc[0],
                ResponseCode::Mz => acc[1],
                ResponseCode::Vy => acc[2],
                ResponseCode::My => acc[3],
                ResponseCode::Vz => acc[4],
                ResponseCode::T => 0.0,
            }),
        )
    }

    /// Update sections from the current basic forces; returns (f, vr)
    fn integrate_sections(&mut self) -> FEAResult<(DMatrix<f64>, DVector<f64>)> {
        let (l, nq) = (self.length(), self.nq());
        let q = self.trial.q.clone();
        let targets: Vec<(DMatrix<f64>, DVector<f64>)> = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let codes = s.codes();
                let xi = self.integration.points[i];
                let b = force_interpolation(&codes, xi, l, nq);
                let s_target = &b * &q + self.section_load_forces(&codes, xi);
                (b, s_target)
            })
            .collect();

        let mut f = DMatrix::zeros(nq, nq);
        let mut vr = DVector::zeros(nq);
        for (i, (sec, (b, s))) in self.sections.iter_mut().zip(targets).enumerate() {
            let fs = sec.flexibility()?;
            let e = sec.deformation() + fs * (&s - sec.stress_resultant());
            if !sec.set_trial_deformation(&e).is_ok() {
                return Err(FEAError::NonFinite(format!(
                    "section {i} of element {}",
                    self.tag
                )));
            }
            let fs = sec.flexibility()?;
            let e_res = &e + &fs * (&s - sec.stress_resultant());
            let wl = self.integration.weights[i] * l;
            f += b.transpose() * fs * &b * wl;
            vr += b.transpose() * e_res * wl;
        }
        if let (true, Some(gj)) = (self.element_torsion(), self.torsion_gj) {
            f[(5, 5)] += l / gj;
            vr[5] += l * q[5] / gj;
        }
        Ok((f, vr))
    }

    /// Iterate the basic forces towards compatibility with `v_target`
    fn iterate(&mut self, v_target: &DVector<f64>) -> FEAResult<()> {
        let mut dv = v_target - &self.v0 - &self.trial.vr;
        let mut dw_ref = 0.0f64;
        let mut dw = 0.0;
        for _ in 0..self.max_iter {
            let dq = &self.trial.kv * &dv;
            dw_ref = dw_ref.max(dv.dot(&dq).abs());
            self.trial.q += dq;
            let (f, vr) = self.integrate_sections()?;
            self.trial.kv = f.try_inverse().ok_or(FEAError::SingularMatrix)?;
            self.trial.vr = vr;
            dv = v_target - &self.v0 - &self.trial.vr;
            dw = dv.dot(&(&self.trial.kv * &dv)).abs();
            if !dw.is_finite() {
                return Err(FEAError::NonFinite(format!("element {} basic forces", self.tag)));
            }
            let roundoff = 16.0 * f64::EPSILON * v_target.norm().max(self.trial.vr.norm());
            if dw <= self.tol * dw_ref || dv.norm() <= roundoff {
                return Ok(());
            }
            dw_ref = dw_ref.max(dw);
        }
        Err(FEAError::ConvergenceFailed {
            iterations: self.max_iter,
            norm: dw,
        })
    }

    fn state_determination(&mut self, v_target: DVector<f64>) -> FEAResult<()> {
        let start = self.trial.clone();
        let start_e: Vec<DVector<f64>> = self.sections.iter().map(|s| s.deformation()).collect();
        let dv = &v_target - &start.v;
        let mut last_err = None;
        for nsub in SUBDIVISIONS {
            let mut result = Ok(());
            for j in 1..=nsub {
                let target = &start.v + &dv * (j as f64 / nsub as f64);
                result = self.iterate(&target);
                if result.is_err() {
                    break;
                }
            }
            match result {
                Ok(()) => {
                    if nsub > 1 {
                        log::debug!("element {} converged with {nsub} subdivisions", self.tag);
                    }
                    self.trial.v = v_target;
                    return Ok(());
                }
                Err(e) => {
                    self.trial = start.clone();
                    for (i, (s, e0)) in self.sections.iter_mut().zip(&start_e).enumerate() {
                        if !s.set_trial_deformation(e0).is_ok() {
                            return Err(FEAError::NonFinite(format!(
                                "section {i} of element {} could not be restored",
                                self.tag
                            )));
                        }
                    }
                    last_err = Some(e);
                }
            }
        }
        let err = last_err.unwrap_or(FEAError::ConvergenceFailed {
            iterations: self.max_iter,
            norm: f64::NAN,
        });
        log::warn!("element {} state determination failed: {err}", self.tag);
        Err(err)
    }

    fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
        check_nodes(self.tag, &self.nodes, nodes)?;
        self.check_initialized()?;
        update_transf(self.tag, &mut self.transf, nodes)?;
        let v = self.transf.behavior().basic_trial_disp();
        if !self.needs_update && (&v - &self.trial.v).norm() == 0.0 {
            return Ok(());
        }
        self.state_determination(v)?;
        self.needs_update = false;
        Ok(())
    }

    fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.check_initialized()?;
        Ok(self.transf.behavior().global_stiff(&self.trial.kv, &self.trial.q))
    }

    fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
        self.check_initialized()?;
        Ok(self.transf.behavior().initial_global_stiff(&self.kv_initial))
    }

    fn mass(&self) -> FEAResult<DMatrix<f64>> {
        self.check_initialized()?;
        let (ndf, ndm) = if self.spatial() { (6, 3) } else { (3, 2) };
        let rho: f64 = self
            .sections
            .iter()
            .zip(&self.integration.weights)
            .map(|(s, w)| w * s.linear_density())
            .sum();
        let half = 0.5 * rho * self.length();
        let mut m = DMatrix::zeros(2 * ndf, 2 * ndf);
        for node in 0..2 {
            for d in 0..ndm {
                m[(node * ndf + d, node * ndf + d)] = half;
            }
        }
        Ok(m)
    }

    fn resisting_force(&self) -> FEAResult<DVector<f64>> {
        self.check_initialized()?;
        Ok(self.transf.behavior().global_resisting_force(&self.trial.q, &self.p0))
    }

    fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
        self.check_initialized()?;
        let l = self.length();
        match load {
            ElementLoad::BeamUniform { .. } => {}
            ElementLoad::BeamPoint { x, .. } => {
                if !(0.0..=1.0).contains(x) {
                    return Err(FEAError::InvalidInput(format!(
                        "point load position {x} outside [0, 1]"
                    )));
                }
            }
            ElementLoad::BeamStrain { back, front } => {
                self.v0 += imposed_basic_deformation(
                    l,
                    &back.scaled(factor),
                    &front.scaled(factor),
                    self.spatial(),
                );
                self.needs_update = true;
                return Ok(());
            }
            other => {
                return Err(FEAError::InvalidInput(format!(
                    "force-based beam cannot take a {} load",
                    other.kind_name()
                )))
            }
        }
        add_reactions(&mut self.p0, load, factor, l);
        self.loads.push((load.clone(), factor));
        self.needs_update = true;
        Ok(())
    }

    fn zero_load(&mut self) {
        if !self.loads.is_empty() || self.v0.norm() > 0.0 {
            self.needs_update = true;
        }
        self.loads.clear();
        self.p0.fill(0.0);
        self.v0.fill(0.0);
    }

    fn commit_state(&mut self) {
        for s in &mut self.sections {
            s.commit_state();
        }
        self.transf.behavior_mut().commit();
        self.committed = self.trial.clone();
    }

    fn revert_to_last_commit(&mut self) {
        for s in &mut self.sections {
            s.revert_to_last_commit();
        }
        self.transf.behavior_mut().revert_to_last_commit();
        self.trial = self.committed.clone();
        self.needs_update = true;
    }

    fn revert_to_start(&mut self) {
        for s in &mut self.sections {
            s.revert_to_start();
        }
        self.transf.behavior_mut().revert_to_start();
        self.trial = BasicState::zeros(self.nq());
        self.trial.kv = self.kv_initial.clone();
        self.committed = self.trial.clone();
        self.needs_update = true;
    }

    fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
        self.check_initialized()?;
        match which {
            ElementResponse::GlobalForce => self.resisting_force(),
            ElementResponse::BasicForce => Ok(self.trial.q.clone()),
            ElementResponse::BasicDeformation => Ok(self.transf.behavior().basic_trial_disp()),
            ElementResponse::SectionForce(i) => self
                .sections
                .get(i)
                .map(|s| s.stress_resultant())
                .ok_or_else(|| no_section(self.tag, i)),
            ElementResponse::SectionDeformation(i) => self
                .sections
                .get(i)
                .map(|s| s.deformation())
                .ok_or_else(|| no_section(self.tag, i)),
            ElementResponse::IntegrationPoints => {
                let l = self.length();
                Ok(DVector::from_iterator(
                    self.integration.len(),
                    self.integration.points.iter().map(|x| x * l),
                ))
            }
            ElementResponse::Stresses => Err(FEAError::InvalidInput(format!(
                "force-based beam {} reports section results instead of stresses",
                self.tag
            ))),
        }
    }
}

macro_rules! force_beam_element {
    ($name:ident, $class:literal, $ndf:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(ForceBeamCore);

        impl $name {
            pub fn sections(&self) -> &[Section] {
                &self.0.sections
            }

            pub fn integration(&self) -> &BeamIntegration {
                &self.0.integration
            }

            pub fn transformation(&self) -> &CrdTransf {
                &self.0.transf
            }

            /// Energy tolerance and iteration cap of the element state determination
            pub fn with_iteration(mut self, tol: f64, max_iter: usize) -> Self {
                self.0.tol = tol;
                self.0.max_iter = max_iter.max(1);
                self
            }
        }

        impl ElementBehavior for $name {
            fn tag(&self) -> usize {
                self.0.tag
            }

            fn class_name(&self) -> &'static str {
                $class
            }

            fn node_tags(&self) -> &[usize] {
                &self.0.nodes
            }

            fn num_dof(&self) -> usize {
                2 * $ndf
            }

            fn initialize(&mut self, nodes: &[&Node]) -> FEAResult<()> {
                self.0.initialize(nodes)
            }

            fn is_initialized(&self) -> bool {
                self.0.initialized
            }

            fn update(&mut self, nodes: &[&Node]) -> FEAResult<()> {
                self.0.update(nodes)
            }

            fn tangent_stiff(&self) -> FEAResult<DMatrix<f64>> {
                self.0.tangent_stiff()
            }

            fn initial_stiff(&self) -> FEAResult<DMatrix<f64>> {
                self.0.initial_stiff()
            }

            fn mass(&self) -> FEAResult<DMatrix<f64>> {
                self.0.mass()
            }

            fn resisting_force(&self) -> FEAResult<DVector<f64>> {
                self.0.resisting_force()
            }

            fn accepts_load(&self, load: &ElementLoad) -> bool {
                matches!(
                    load,
                    ElementLoad::BeamUniform { .. }
                        | ElementLoad::BeamPoint { .. }
                        | ElementLoad::BeamStrain { .. }
                )
            }

            fn add_load(&mut self, load: &ElementLoad, factor: f64) -> FEAResult<()> {
                self.0.add_load(load, factor)
            }

            fn zero_load(&mut self) {
                self.0.zero_load()
            }

            fn commit_state(&mut self) {
                self.0.commit_state()
            }

            fn revert_to_last_commit(&mut self) {
                self.0.revert_to_last_commit()
            }

            fn revert_to_start(&mut self) {
                self.0.revert_to_start()
            }

            fn response(&self, which: ElementResponse) -> FEAResult<DVector<f64>> {
                self.0.response(which)
            }
        }
    };
}

force_beam_element!(
    ForceBeamColumn2d,
    "ForceBeamColumn2d",
    3,
    "Planar force-based beam-column"
);
force_beam_element!(
    ForceBeamColumn3d,
    "ForceBeamColumn3d",
    6,
    "Space force-based beam-column"
);

impl ForceBeamColumn2d {
    pub fn new(
        tag: usize,
        node_i: usize,
        node_j: usize,
        transf: CrdTransf,
        integration: BeamIntegration,
        sections: Vec<Section>,
    ) -> FEAResult<Self> {
        if transf.is_3d() {
            return Err(FEAError::InvalidInput(format!(
                "element {tag}: planar beam needs a 2D transformation"
            )));
        }
        ForceBeamCore::new(tag, [node_i, node_j], transf, integration, sections).map(Self)
    }

    /// Same section at every point of an `n`-point Lobatto rule
    pub fn uniform(
        tag: usize,
        node_i: usize,
        node_j: usize,
        transf: CrdTransf,
        n: usize,
        section: Section,
    ) -> FEAResult<Self> {
        Self::new(tag, node_i, node_j, transf, BeamIntegration::lobatto(n)?, vec![section; n])
    }
}

impl ForceBeamColumn3d {
    pub fn new(
        tag: usize,
        node_i: usize,
        node_j: usize,
        transf: CrdTransf,
        integration: BeamIntegration,
        sections: Vec<Section>,
    ) -> FEAResult<Self> {
        if !transf.is_3d() {
            return Err(FEAError::InvalidInput(format!(
                "element {tag}: space beam needs a 3D transformation"
            )));
        }
        ForceBeamCore::new(tag, [node_i, node_j], transf, integration, sections).map(Self)
    }

    pub fn uniform(
        tag: usize,
        node_i: usize,
        node_j: usize,
        transf: CrdTransf,
        n: usize,
        section: Section,
    ) -> FEAResult<Self> {
        Self::new(tag, node_i, node_j, transf, BeamIntegration::lobatto(n)?, vec![section; n])
    }

    /// Torsional rigidity for sections without a torsion response
    pub fn with_torsion(mut self, gj: f64) -> Self {
        self.0.torsion_gj = Some(gj);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::UniaxialMaterial;
    use crate::sections::geometry::rect_patch;
    use crate::sections::{ElasticSection2d, FiberSection2d};
    use approx::assert_relative_eq;

    const E: f64 = 2.0e11;
    const A: f64 = 0.01;
    const IZ: f64 = 8.0e-6;

    fn elastic_beam(n: usize) -> (ForceBeamColumn2d, Node, Node) {
        let n1 = Node::new(1, &[0.0, 0.0], 3).unwrap();
        let n2 = Node::new(2, &[2.0, 0.0], 3).unwrap();
        let sec = Section::from(ElasticSection2d::new(E, A, IZ));
        let mut el = ForceBeamColumn2d::uniform(1, 1, 2, CrdTransf::linear_2d(), n, sec).unwrap();
        el.initialize(&[&n1, &n2]).unwrap();
        (el, n1, n2)
    }

    #[test]
    fn test_initial_stiffness_matches_closed_form() {
        let (el, _, _) = elastic_beam(5);
        let k = el.initial_stiff().unwrap();
        let l: f64 = 2.0;
        assert_relative_eq!(k[(0, 0)], E * A / l, max_relative = 1e-10);
        assert_relative_eq!(k[(1, 1)], 12.0 * E * IZ / l.powi(3), max_relative = 1e-10);
        assert_relative_eq!(k[(2, 2)], 4.0 * E * IZ / l, max_relative = 1e-10);
        assert_relative_eq!(k[(2, 5)], 2.0 * E * IZ / l, max_relative = 1e-10);
    }

    #[test]
    fn test_cantilever_tip_load() {
        let (mut el, n1, mut n2) = elastic_beam(4);
        let l: f64 = 2.0;
        let ei = E * IZ;
        n2.set_trial_disp(&DVector::from_vec(vec![0.0, l.powi(3) / (3.0 * ei), l * l / (2.0 * ei)]));
        el.update(&[&n1, &n2]).unwrap();
        let p = el.resisting_force().unwrap();
        assert_relative_eq!(p[4], 1.0, max_relative = 1e-8);
        assert_relative_eq!(p[2], -l, max_relative = 1e-8);
        let s0 = el.response(ElementResponse::SectionForce(0)).unwrap();
        assert_relative_eq!(s0[1], l, max_relative = 1e-8);
    }

    #[test]
    fn test_uniform_load_on_clamped_member() {
        let (mut el, n1, n2) = elastic_beam(5);
        let l: f64 = 2.0;
        el.add_load(&ElementLoad::beam_uniform(-6.0, 0.0, 0.0), 1.0).unwrap();
        el.update(&[&n1, &n2]).unwrap();
        let p = el.resisting_force().unwrap();
        assert_relative_eq!(p[1], 6.0, max_relative = 1e-8);
        assert_relative_eq!(p[2], 6.0 * l * l / 12.0, max_relative = 1e-8);
        assert_relative_eq!(p[5], -6.0 * l * l / 12.0, max_relative = 1e-8);
    }

    #[test]
    fn test_fiber_moment_is_bounded_by_plastic_moment() {
        let (b, h, fy) = (0.1, 0.2, 250e6);
        let mat = UniaxialMaterial::elastic_pp(E, fy);
        let fibers = rect_patch(&mat, 20, 1, (-h / 2.0, -b / 2.0), (h / 2.0, b / 2.0));
        let sec = Section::from(FiberSection2d::new(fibers).unwrap());
        let n1 = Node::new(1, &[0.0, 0.0], 3).unwrap();
        let mut n2 = Node::new(2, &[1.0, 0.0], 3).unwrap();
        let mut el = ForceBeamColumn2d::uniform(1, 1, 2, CrdTransf::linear_2d(), 5, sec).unwrap();
        el.initialize(&[&n1, &n2]).unwrap();
        let mp = fy * b * h * h / 4.0;
        let kappa_y = 2.0 * fy / (E * h);
        // Opposite end rotations give uniform bending with curvature 2θ/L
        for step in 1..=25 {
            let th = 0.1 * kappa_y * step as f64;
            let mut n1 = n1.clone();
            n1.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, -th]));
            n2.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, th]));
            el.update(&[&n1, &n2]).unwrap();
            el.commit_state();
        }
        let q = el.response(ElementResponse::BasicForce).unwrap();
        assert!(q[2] <= mp * (1.0 + 1e-9));
        assert!(q[2] > 0.95 * mp);
        assert_relative_eq!(q[1], -q[2], max_relative = 1e-6);
    }

    #[test]
    fn test_failed_update_restores_sections() {
        let (b, h, fy) = (0.1, 0.2, 250e6);
        let mat = UniaxialMaterial::elastic_pp(E, fy);
        let fibers = rect_patch(&mat, 20, 1, (-h / 2.0, -b / 2.0), (h / 2.0, b / 2.0));
        let sec = Section::from(FiberSection2d::new(fibers).unwrap());
        let mut n1 = Node::new(1, &[0.0, 0.0], 3).unwrap();
        let mut n2 = Node::new(2, &[1.0, 0.0], 3).unwrap();
        let mut el = ForceBeamColumn2d::uniform(1, 1, 2, CrdTransf::linear_2d(), 5, sec).unwrap();
        el.initialize(&[&n1, &n2]).unwrap();
        let kappa_y = 2.0 * fy / (E * h);

        let th = 0.3 * kappa_y;
        n1.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, -th]));
        n2.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, th]));
        el.update(&[&n1, &n2]).unwrap();
        el.commit_state();
        let q_before = el.response(ElementResponse::BasicForce).unwrap();
        let e_before: Vec<_> = (0..5)
            .map(|i| el.response(ElementResponse::SectionDeformation(i)).unwrap())
            .collect();

        // One iteration per attempt cannot follow a deep plastic excursion
        let mut el = el.with_iteration(1e-300, 1);
        let th = 20.0 * kappa_y;
        n1.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, -th]));
        n2.set_trial_disp(&DVector::from_vec(vec![0.0, 0.0, th]));
        assert!(el.update(&[&n1, &n2]).is_err());

        assert_relative_eq!(el.response(ElementResponse::BasicForce).unwrap(), q_before);
        for (i, e) in e_before.iter().enumerate() {
            let now = el.response(ElementResponse::SectionDeformation(i)).unwrap();
            assert_relative_eq!(now, *e, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_revert_restores_committed_forces() {
        let (mut el, n1, mut n2) = elastic_beam(3);
        n2.set_trial_disp(&DVector::from_vec(vec![1e-4, 0.0, 0.0]));
        el.update(&[&n1, &n2]).unwrap();
        el.commit_state();
        let q_c = el.response(ElementResponse::BasicForce).unwrap();
        n2.set_trial_disp(&DVector::from_vec(vec![3e-4, 0.0, 0.0]));
        el.update(&[&n1, &n2]).unwrap();
        el.revert_to_last_commit();
        assert_relative_eq!(el.response(ElementResponse::BasicForce).unwrap(), q_c);
    }

    #[test]
    fn test_integration_point_count_is_checked() {
        assert!(BeamIntegration::lobatto(1).is_err());
        assert!(BeamIntegration::lobatto(11).is_err());
        let r = BeamIntegration::lobatto(4).unwrap();
        assert_relative_eq!(r.weights.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
    }
}
