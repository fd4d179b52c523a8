//! Linear systems of equations A·x = b behind one interface
//!
//! Each adapter keeps its factorization until A is touched again, so
//! modified Newton and the two-solve integrators reuse it.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};
use crate::math::{BandMatrix, BandSymMatrix, SparseLu, SparseMatrixBuilder};

/// Storage and factorization scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoeKind {
    FullGeneral,
    #[default]
    BandGeneral,
    BandSpd,
    SparseGeneral,
    SparseSpd,
}

impl SoeKind {
    pub fn build(self) -> Box<dyn LinearSoe> {
        match self {
            SoeKind::FullGeneral => Box::new(FullGeneral::default()),
            SoeKind::BandGeneral => Box::new(BandGeneral::default()),
            SoeKind::BandSpd => Box::new(BandSpd::default()),
            SoeKind::SparseGeneral => Box::new(SparseGeneral::default()),
            SoeKind::SparseSpd => Box::new(SparseSpd::default()),
        }
    }

    /// Whether the scheme needs a symmetric positive definite A
    pub fn is_spd(self) -> bool {
        matches!(self, SoeKind::BandSpd | SoeKind::SparseSpd)
    }
}

pub trait LinearSoe: std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Size the system; `groups` lists the equations coupled by each
    /// element or constraint row and fixes the bandwidth
    fn set_size(&mut self, num_eqn: usize, groups: &[Vec<usize>]) -> FEAResult<()>;

    fn num_eqn(&self) -> usize;

    fn zero_a(&mut self);

    fn add_a(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()>;

    fn zero_b(&mut self);

    fn add_b(&mut self, i: usize, value: f64);

    fn set_b(&mut self, b: &DVector<f64>) -> FEAResult<()> {
        if b.len() != self.num_eqn() {
            return Err(FEAError::InvalidInput(format!(
                "right-hand side of length {} for {} equations",
                b.len(),
                self.num_eqn()
            )));
        }
        self.zero_b();
        for (i, v) in b.iter().enumerate() {
            self.add_b(i, *v);
        }
        Ok(())
    }

    fn b(&self) -> &DVector<f64>;

    /// Solve A·x = b, factoring A if it changed
    fn solve(&mut self) -> FEAResult<DVector<f64>> {
        let b = self.b().clone();
        self.solve_with(&b)
    }

    /// Solve A·x = rhs with the current A, leaving b untouched
    fn solve_with(&mut self, rhs: &DVector<f64>) -> FEAResult<DVector<f64>>;
}

fn check_solution(x: DVector<f64>) -> FEAResult<DVector<f64>> {
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FEAError::SingularMatrix)
    }
}

fn check_rhs(rhs: &DVector<f64>, n: usize) -> FEAResult<()> {
    if rhs.len() != n {
        return Err(FEAError::InvalidInput(format!(
            "right-hand side of length {} for {n} equations",
            rhs.len()
        )));
    }
    if rhs.iter().any(|v| !v.is_finite()) {
        return Err(FEAError::NonFinite("right-hand side".to_string()));
    }
    Ok(())
}

/// Largest |i − j| over equations coupled in one group
fn half_bandwidth(groups: &[Vec<usize>]) -> usize {
    groups
        .iter()
        .filter_map(|g| {
            let lo = g.iter().min()?;
            let hi = g.iter().max()?;
            Some(hi - lo)
        })
        .max()
        .unwrap_or(0)
}

// -------------------------------------------------------------------------
// Dense
// -------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FullGeneral {
    a: DMatrix<f64>,
    b: DVector<f64>,
    lu: Option<nalgebra::LU<f64, nalgebra::Dyn, nalgebra::Dyn>>,
}

impl FullGeneral {
    /// Current A before factorization
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.a
    }
}

impl LinearSoe for FullGeneral {
    fn name(&self) -> &'static str {
        "FullGeneral"
    }

    fn set_size(&mut self, num_eqn: usize, _groups: &[Vec<usize>]) -> FEAResult<()> {
        self.a = DMatrix::zeros(num_eqn, num_eqn);
        self.b = DVector::zeros(num_eqn);
        self.lu = None;
        Ok(())
    }

    fn num_eqn(&self) -> usize {
        self.b.len()
    }

    fn zero_a(&mut self) {
        self.a.fill(0.0);
        self.lu = None;
    }

    fn add_a(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        self.a[(i, j)] += value;
        self.lu = None;
        Ok(())
    }

    fn zero_b(&mut self) {
        self.b.fill(0.0);
    }

    fn add_b(&mut self, i: usize, value: f64) {
        self.b[i] += value;
    }

    fn b(&self) -> &DVector<f64> {
        &self.b
    }

    fn solve_with(&mut self, rhs: &DVector<f64>) -> FEAResult<DVector<f64>> {
        check_rhs(rhs, self.num_eqn())?;
        if self.lu.is_none() {
            self.lu = Some(self.a.clone().lu());
        }
        let lu = self.lu.as_ref().ok_or(FEAError::SingularMatrix)?;
        let x = lu.solve(rhs).ok_or(FEAError::SingularMatrix)?;
        check_solution(x)
    }
}

// -------------------------------------------------------------------------
// Band
// -------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BandGeneral {
    a: BandMatrix,
    b: DVector<f64>,
}

impl Default for BandGeneral {
    fn default() -> Self {
        Self {
            a: BandMatrix::new(0, 0, 0),
            b: DVector::zeros(0),
        }
    }
}

impl BandGeneral {
    pub fn bandwidths(&self) -> (usize, usize) {
        self.a.bandwidths()
    }
}

impl LinearSoe for BandGeneral {
    fn name(&self) -> &'static str {
        "BandGeneral"
    }

    fn set_size(&mut self, num_eqn: usize, groups: &[Vec<usize>]) -> FEAResult<()> {
        let hb = half_bandwidth(groups);
        self.a = BandMatrix::new(num_eqn, hb, hb);
        self.b = DVector::zeros(num_eqn);
        log::debug!("BandGeneral sized to {num_eqn} equations, half bandwidth {hb}");
        Ok(())
    }

    fn num_eqn(&self) -> usize {
        self.b.len()
    }

    fn zero_a(&mut self) {
        self.a.zero();
    }

    fn add_a(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        self.a.add(i, j, value)
    }

    fn zero_b(&mut self) {
        self.b.fill(0.0);
    }

    fn add_b(&mut self, i: usize, value: f64) {
        self.b[i] += value;
    }

    fn b(&self) -> &DVector<f64> {
        &self.b
    }

    fn solve_with(&mut self, rhs: &DVector<f64>) -> FEAResult<DVector<f64>> {
        check_rhs(rhs, self.num_eqn())?;
        if self.num_eqn() == 0 {
            return Ok(DVector::zeros(0));
        }
        if !self.a.is_factored() {
            self.a.factor()?;
        }
        check_solution(self.a.solve(rhs)?)
    }
}

#[derive(Debug, Clone)]
pub struct BandSpd {
    a: BandSymMatrix,
    b: DVector<f64>,
}

impl Default for BandSpd {
    fn default() -> Self {
        Self {
            a: BandSymMatrix::new(0, 0),
            b: DVector::zeros(0),
        }
    }
}

impl LinearSoe for BandSpd {
    fn name(&self) -> &'static str {
        "BandSPD"
    }

    fn set_size(&mut self, num_eqn: usize, groups: &[Vec<usize>]) -> FEAResult<()> {
        let hb = half_bandwidth(groups);
        self.a = BandSymMatrix::new(num_eqn, hb);
        self.b = DVector::zeros(num_eqn);
        Ok(())
    }

    fn num_eqn(&self) -> usize {
        self.b.len()
    }

    fn zero_a(&mut self) {
        self.a.zero();
    }

    fn add_a(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        self.a.add(i, j, value)
    }

    fn zero_b(&mut self) {
        self.b.fill(0.0);
    }

    fn add_b(&mut self, i: usize, value: f64) {
        self.b[i] += value;
    }

    fn b(&self) -> &DVector<f64> {
        &self.b
    }

    fn solve_with(&mut self, rhs: &DVector<f64>) -> FEAResult<DVector<f64>> {
        check_rhs(rhs, self.num_eqn())?;
        if self.num_eqn() == 0 {
            return Ok(DVector::zeros(0));
        }
        if !self.a.is_factored() {
            self.a.factor()?;
        }
        check_solution(self.a.solve(rhs)?)
    }
}

// -------------------------------------------------------------------------
// Sparse
// -------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SparseGeneral {
    a: SparseMatrixBuilder,
    b: DVector<f64>,
    lu: Option<SparseLu>,
}

impl Default for SparseGeneral {
    fn default() -> Self {
        Self {
            a: SparseMatrixBuilder::new(0),
            b: DVector::zeros(0),
            lu: None,
        }
    }
}

impl LinearSoe for SparseGeneral {
    fn name(&self) -> &'static str {
        "SparseGeneral"
    }

    fn set_size(&mut self, num_eqn: usize, _groups: &[Vec<usize>]) -> FEAResult<()> {
        self.a = SparseMatrixBuilder::new(num_eqn);
        self.b = DVector::zeros(num_eqn);
        self.lu = None;
        Ok(())
    }

    fn num_eqn(&self) -> usize {
        self.b.len()
    }

    fn zero_a(&mut self) {
        self.a.clear();
        self.lu = None;
    }

    fn add_a(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        self.a.add(i, j, value);
        self.lu = None;
        Ok(())
    }

    fn zero_b(&mut self) {
        self.b.fill(0.0);
    }

    fn add_b(&mut self, i: usize, value: f64) {
        self.b[i] += value;
    }

    fn b(&self) -> &DVector<f64> {
        &self.b
    }

    fn solve_with(&mut self, rhs: &DVector<f64>) -> FEAResult<DVector<f64>> {
        check_rhs(rhs, self.num_eqn())?;
        if self.lu.is_none() {
            let lu = SparseLu::factor(&self.a.to_csc())?;
            log::debug!("SparseGeneral factored, {} nonzeros in L+U", lu.nnz());
            self.lu = Some(lu);
        }
        let lu = self.lu.as_ref().ok_or(FEAError::SingularMatrix)?;
        check_solution(lu.solve(rhs))
    }
}

#[derive(Debug, Clone)]
pub struct SparseSpd {
    a: SparseMatrixBuilder,
    b: DVector<f64>,
    chol: Option<CscCholesky<f64>>,
}

impl Default for SparseSpd {
    fn default() -> Self {
        Self {
            a: SparseMatrixBuilder::new(0),
            b: DVector::zeros(0),
            chol: None,
        }
    }
}

impl LinearSoe for SparseSpd {
    fn name(&self) -> &'static str {
        "SparseSPD"
    }

    fn set_size(&mut self, num_eqn: usize, _groups: &[Vec<usize>]) -> FEAResult<()> {
        self.a = SparseMatrixBuilder::new(num_eqn);
        self.b = DVector::zeros(num_eqn);
        self.chol = None;
        Ok(())
    }

    fn num_eqn(&self) -> usize {
        self.b.len()
    }

    fn zero_a(&mut self) {
        self.a.clear();
        self.chol = None;
    }

    fn add_a(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        self.a.add(i, j, value);
        self.chol = None;
        Ok(())
    }

    fn zero_b(&mut self) {
        self.b.fill(0.0);
    }

    fn add_b(&mut self, i: usize, value: f64) {
        self.b[i] += value;
    }

    fn b(&self) -> &DVector<f64> {
        &self.b
    }

    fn solve_with(&mut self, rhs: &DVector<f64>) -> FEAResult<DVector<f64>> {
        let n = self.num_eqn();
        check_rhs(rhs, n)?;
        if n == 0 {
            return Ok(DVector::zeros(0));
        }
        if self.chol.is_none() {
            let chol = CscCholesky::factor(&self.a.to_csc())
                .map_err(|e| FEAError::solver("SparseSPD", -1, e.to_string()))?;
            self.chol = Some(chol);
        }
        let chol = self.chol.as_ref().ok_or(FEAError::SingularMatrix)?;
        let x = chol.solve(&DMatrix::from_column_slice(n, 1, rhs.as_slice()));
        check_solution(x.column(0).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tridiagonal(soe: &mut dyn LinearSoe, n: usize) {
        let groups: Vec<Vec<usize>> = (0..n - 1).map(|i| vec![i, i + 1]).collect();
        soe.set_size(n, &groups).unwrap();
        for i in 0..n {
            soe.add_a(i, i, 4.0).unwrap();
            if i + 1 < n {
                soe.add_a(i, i + 1, -1.0).unwrap();
                soe.add_a(i + 1, i, -1.0).unwrap();
            }
            soe.add_b(i, 1.0);
        }
    }

    #[test]
    fn test_all_schemes_agree() {
        let n = 6;
        let mut reference = FullGeneral::default();
        tridiagonal(&mut reference, n);
        let x_ref = reference.solve().unwrap();
        let a = reference.matrix().clone();
        let residual = &a * &x_ref - DVector::from_element(n, 1.0);
        assert!(residual.norm() < 1e-12);

        for kind in [
            SoeKind::BandGeneral,
            SoeKind::BandSpd,
            SoeKind::SparseGeneral,
            SoeKind::SparseSpd,
        ] {
            let mut soe = kind.build();
            tridiagonal(soe.as_mut(), n);
            let x = soe.solve().unwrap();
            for i in 0..n {
                assert_relative_eq!(x[i], x_ref[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_factorization_reused_for_second_rhs() {
        let mut soe = BandGeneral::default();
        tridiagonal(&mut soe, 4);
        let x1 = soe.solve().unwrap();
        let x2 = soe.solve_with(&DVector::from_element(4, 2.0)).unwrap();
        assert_relative_eq!(x2[0], 2.0 * x1[0], epsilon = 1e-14);
        assert_eq!(soe.b()[0], 1.0);
    }

    #[test]
    fn test_singular_and_indefinite() {
        let mut soe = FullGeneral::default();
        soe.set_size(2, &[vec![0, 1]]).unwrap();
        soe.add_a(0, 0, 1.0).unwrap();
        soe.add_a(0, 1, 1.0).unwrap();
        soe.add_a(1, 0, 1.0).unwrap();
        soe.add_a(1, 1, 1.0).unwrap();
        soe.add_b(0, 1.0);
        assert!(matches!(soe.solve(), Err(FEAError::SingularMatrix)));

        let mut spd = BandSpd::default();
        spd.set_size(2, &[vec![0, 1]]).unwrap();
        spd.add_a(0, 0, -1.0).unwrap();
        spd.add_a(1, 1, 1.0).unwrap();
        let err = spd.solve().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Solver);
    }

    #[test]
    fn test_band_entry_outside_declared_band() {
        let mut soe = BandGeneral::default();
        soe.set_size(4, &[vec![0, 1]]).unwrap();
        assert_eq!(soe.bandwidths(), (1, 1));
        assert!(soe.add_a(0, 3, 1.0).is_err());
    }
}
