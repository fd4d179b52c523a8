//! Generalized eigenproblem K·φ = λ·M·φ

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use serde::{Deserialize, Serialize};

use super::model::{AnalysisModel, MatrixCoefficients, Tangent};
use super::soe::LinearSoe;
use crate::domain::Domain;
use crate::error::{FEAError, FEAResult};
use crate::math::SparseMatrixBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EigenSolver {
    /// Dense Cholesky reduction to a standard symmetric problem
    FullGenEigen,
    /// Lanczos on (K − σM)⁻¹·M with full reorthogonalization; finds the
    /// modes nearest `shift`
    ShiftInvertLanczos { shift: f64 },
}

impl Default for EigenSolver {
    fn default() -> Self {
        EigenSolver::ShiftInvertLanczos { shift: 0.0 }
    }
}

/// Eigenvalues in ascending order with M-normalized vectors as columns
#[derive(Debug, Clone)]
pub struct EigenSolution {
    pub values: Vec<f64>,
    pub vectors: DMatrix<f64>,
}

impl EigenSolver {
    pub fn name(&self) -> &'static str {
        match self {
            EigenSolver::FullGenEigen => "FullGenEigen",
            EigenSolver::ShiftInvertLanczos { .. } => "ShiftInvertLanczos",
        }
    }

    pub fn solve(
        &self,
        model: &AnalysisModel,
        domain: &Domain,
        soe: &mut dyn LinearSoe,
        num_modes: usize,
    ) -> FEAResult<EigenSolution> {
        let n = model.num_eqn();
        if num_modes == 0 || num_modes > n {
            return Err(FEAError::InvalidInput(format!(
                "{num_modes} modes requested from {n} equations"
            )));
        }
        match *self {
            EigenSolver::FullGenEigen => full_gen_eigen(model, domain, num_modes),
            EigenSolver::ShiftInvertLanczos { shift } => {
                shift_invert_lanczos(model, domain, soe, num_modes, shift)
            }
        }
    }
}

fn check_mass_diagonal(diag: impl Iterator<Item = f64>) -> FEAResult<()> {
    let mut any = false;
    for (i, m) in diag.enumerate() {
        if m < 0.0 || !m.is_finite() {
            return Err(FEAError::MassNotPositiveDefinite(format!(
                "diagonal entry {m:e} at equation {i}"
            )));
        }
        any |= m > 0.0;
    }
    if !any {
        return Err(FEAError::MassNotPositiveDefinite("model has no mass".to_string()));
    }
    Ok(())
}

fn full_gen_eigen(model: &AnalysisModel, domain: &Domain, num_modes: usize) -> FEAResult<EigenSolution> {
    let k = model.assemble_dense(domain, MatrixCoefficients::stiffness(), Tangent::Current)?;
    let m = model.assemble_dense(domain, MatrixCoefficients::mass(), Tangent::Current)?;
    check_mass_diagonal(m.diagonal().iter().copied())?;
    let l = k
        .cholesky()
        .ok_or_else(|| FEAError::solver("FullGenEigen", -1, "stiffness is not positive definite"))?
        .l();
    let singular = || FEAError::solver("FullGenEigen", -2, "triangular solve failed");
    // S = L⁻¹·M·L⁻ᵀ, whose eigenvalues are 1/λ
    let lm = l.solve_lower_triangular(&m).ok_or_else(singular)?;
    let s = l.solve_lower_triangular(&lm.transpose()).ok_or_else(singular)?;
    let s = (&s + s.transpose()) * 0.5;
    let eig = SymmetricEigen::new(s);

    let mu_max = eig.eigenvalues.iter().fold(0.0f64, |a, v| a.max(*v));
    let mut order: Vec<usize> = (0..eig.eigenvalues.len())
        .filter(|i| eig.eigenvalues[*i] > 1e-12 * mu_max)
        .collect();
    order.sort_by(|a, b| eig.eigenvalues[*b].total_cmp(&eig.eigenvalues[*a]));
    if order.len() < num_modes {
        return Err(FEAError::solver(
            "FullGenEigen",
            -3,
            format!("only {} finite modes, {num_modes} requested", order.len()),
        ));
    }

    let lt = l.transpose();
    let mut values = Vec::with_capacity(num_modes);
    let mut vectors = DMatrix::zeros(m.nrows(), num_modes);
    for (c, i) in order.iter().take(num_modes).enumerate() {
        values.push(1.0 / eig.eigenvalues[*i]);
        let y = eig.eigenvectors.column(*i).into_owned();
        let phi = lt.solve_upper_triangular(&y).ok_or_else(singular)?;
        let scale = phi.dot(&(&m * &phi)).sqrt();
        vectors.set_column(c, &(phi / scale));
    }
    Ok(EigenSolution { values, vectors })
}

fn shift_invert_lanczos(
    model: &AnalysisModel,
    domain: &Domain,
    soe: &mut dyn LinearSoe,
    num_modes: usize,
    shift: f64,
) -> FEAResult<EigenSolution> {
    let n = model.num_eqn();
    let mut mass = SparseMatrixBuilder::new(n);
    model.assemble_with(domain, MatrixCoefficients::mass(), Tangent::Current, &mut |i, j, v| {
        mass.add(i, j, v);
        Ok(())
    })?;
    let dense_diag = {
        let csc = mass.to_csc();
        (0..n)
            .map(|i| csc.get_entry(i, i).map_or(0.0, |e| e.into_value()))
            .collect::<Vec<_>>()
    };
    check_mass_diagonal(dense_diag.into_iter())?;

    let coeffs = MatrixCoefficients {
        k: 1.0,
        d: 0.0,
        m: -shift,
    };
    model.form_tangent(domain, soe, coeffs, Tangent::Current)?;

    let mut steps = n.min((2 * num_modes + 10).max(20));
    loop {
        let (values, vectors, converged) = lanczos(soe, &mass, steps, num_modes, shift)?;
        if converged || steps == n {
            if values.len() < num_modes {
                return Err(FEAError::solver(
                    "ShiftInvertLanczos",
                    -3,
                    format!("only {} modes found, {num_modes} requested", values.len()),
                ));
            }
            log::debug!("Lanczos converged with {steps} vectors");
            return Ok(EigenSolution { values, vectors });
        }
        steps = n.min(2 * steps);
    }
}

/// One Lanczos run of `steps` vectors; returns the modes nearest the shift
/// and whether all requested Ritz pairs met the residual tolerance
fn lanczos(
    soe: &mut dyn LinearSoe,
    mass: &SparseMatrixBuilder,
    steps: usize,
    num_modes: usize,
    shift: f64,
) -> FEAResult<(Vec<f64>, DMatrix<f64>, bool)> {
    let n = mass.size();
    // start inside the range of the operator so massless dofs drop out
    let start = DVector::from_fn(n, |i, _| 1.0 + (i as f64 * 0.618_033_988_75).fract());
    let mut r = soe.solve_with(&mass.mul_vec(&start))?;
    let mut p = mass.mul_vec(&r);
    let mut beta = r.dot(&p).max(0.0).sqrt();
    if beta == 0.0 {
        return Err(FEAError::MassNotPositiveDefinite(
            "starting vector has no mass".to_string(),
        ));
    }

    let mut q: Vec<DVector<f64>> = Vec::with_capacity(steps);
    let mut mq: Vec<DVector<f64>> = Vec::with_capacity(steps);
    let mut alphas = Vec::with_capacity(steps);
    let mut betas = Vec::with_capacity(steps);
    for j in 0..steps {
        q.push(&r / beta);
        mq.push(&p / beta);
        r = soe.solve_with(&mq[j])?;
        if j > 0 {
            r -= &q[j - 1] * beta;
        }
        let alpha = mq[j].dot(&r);
        r -= &q[j] * alpha;
        for _ in 0..2 {
            for i in 0..=j {
                let h = mq[i].dot(&r);
                r -= &q[i] * h;
            }
        }
        p = mass.mul_vec(&r);
        alphas.push(alpha);
        beta = r.dot(&p).max(0.0).sqrt();
        if beta <= 1e-12 * alpha.abs() {
            beta = 0.0;
            break;
        }
        if j + 1 < steps {
            betas.push(beta);
        }
    }

    let m = alphas.len();
    let mut t = DMatrix::zeros(m, m);
    for i in 0..m {
        t[(i, i)] = alphas[i];
        if i + 1 < m {
            t[(i, i + 1)] = betas[i];
            t[(i + 1, i)] = betas[i];
        }
    }
    let eig = SymmetricEigen::new(t);

    // θ = 1/(λ − σ); the largest |θ| are nearest the shift
    let mut order: Vec<usize> = (0..m).filter(|i| eig.eigenvalues[*i] != 0.0).collect();
    order.sort_by(|a, b| eig.eigenvalues[*b].abs().total_cmp(&eig.eigenvalues[*a].abs()));
    order.truncate(num_modes);

    let mut converged = order.len() == num_modes;
    let mut modes: Vec<(f64, DVector<f64>)> = Vec::with_capacity(order.len());
    for i in order {
        let theta = eig.eigenvalues[i];
        let s = eig.eigenvectors.column(i);
        if beta * s[m - 1].abs() > 1e-10 * theta.abs() {
            converged = false;
        }
        let mut phi = DVector::zeros(n);
        for (j, qj) in q.iter().enumerate().take(m) {
            phi += qj * s[j];
        }
        let norm = phi.dot(&mass.mul_vec(&phi)).sqrt();
        if norm > 0.0 {
            phi /= norm;
        }
        modes.push((shift + 1.0 / theta, phi));
    }
    modes.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut vectors = DMatrix::zeros(n, modes.len());
    let values = modes
        .into_iter()
        .enumerate()
        .map(|(c, (lambda, phi))| {
            vectors.set_column(c, &phi);
            lambda
        })
        .collect();
    Ok((values, vectors, converged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ConstraintHandler, Numberer, SoeKind};
    use crate::constraints::Fixity;
    use crate::elements::{Node, Truss};
    use crate::materials::UniaxialMaterial;
    use approx::assert_relative_eq;

    /// Fixed-free chain of three unit masses and springs k = 100
    fn chain() -> Domain {
        let mut d = Domain::new();
        for i in 0..4 {
            let node = Node::new(i + 1, &[i as f64, 0.0], 2)
                .unwrap()
                .with_mass(&[1.0, 1.0])
                .unwrap();
            d.add_node(node).unwrap();
            d.fix(i + 1, Fixity::with_restraints(i == 0, true, false, false, false, false))
                .unwrap();
        }
        for i in 0..3 {
            let bar = Truss::new(i + 1, i + 1, i + 2, UniaxialMaterial::elastic(100.0), 1.0).unwrap();
            d.add_element(bar).unwrap();
        }
        d
    }

    fn exact(j: usize) -> f64 {
        let x = (2 * j - 1) as f64 * std::f64::consts::PI / 7.0;
        200.0 * (1.0 - x.cos())
    }

    #[test]
    fn test_solvers_match_chain_frequencies() {
        let d = chain();
        let model = AnalysisModel::build(&d, ConstraintHandler::Transformation, Numberer::Plain).unwrap();
        for solver in [
            EigenSolver::FullGenEigen,
            EigenSolver::ShiftInvertLanczos { shift: 0.0 },
        ] {
            let mut soe = SoeKind::BandSpd.build();
            soe.set_size(model.num_eqn(), model.groups()).unwrap();
            let sol = solver.solve(&model, &d, soe.as_mut(), 3).unwrap();
            for j in 0..3 {
                assert_relative_eq!(sol.values[j], exact(j + 1), max_relative = 1e-9);
            }
            // M-normalized
            let phi = sol.vectors.column(0);
            assert_relative_eq!(phi.norm_squared(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_too_many_modes() {
        let d = chain();
        let model = AnalysisModel::build(&d, ConstraintHandler::Transformation, Numberer::Plain).unwrap();
        let mut soe = SoeKind::BandGeneral.build();
        soe.set_size(model.num_eqn(), model.groups()).unwrap();
        let err = EigenSolver::FullGenEigen.solve(&model, &d, soe.as_mut(), 4).unwrap_err();
        assert!(matches!(err, FEAError::InvalidInput(_)));
    }
}
