//! Convergence tests for the equilibrium iterations

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Norm a test watches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    /// ‖Δu‖
    #[default]
    NormDispIncr,
    /// ‖b‖ after the update
    NormUnbalance,
    /// ‖Δu‖ / ‖Δu₀‖
    RelativeNormDispIncr,
    /// ½·|Δuᵀ·b|
    EnergyIncr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResult {
    Converged,
    Iterating,
    Diverged,
}

/// Tolerance, iteration budget and norm history of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceTest {
    pub kind: TestKind,
    pub tol: f64,
    pub max_iter: usize,
    #[serde(skip)]
    history: Vec<f64>,
    #[serde(skip)]
    reference: f64,
}

impl PartialEq for ConvergenceTest {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.tol == other.tol && self.max_iter == other.max_iter
    }
}

impl Default for ConvergenceTest {
    fn default() -> Self {
        Self::new(TestKind::NormDispIncr, 1e-8, 25)
    }
}

impl ConvergenceTest {
    pub fn new(kind: TestKind, tol: f64, max_iter: usize) -> Self {
        Self {
            kind,
            tol,
            max_iter: max_iter.max(1),
            history: Vec::new(),
            reference: 0.0,
        }
    }

    pub fn norm_disp_incr(tol: f64, max_iter: usize) -> Self {
        Self::new(TestKind::NormDispIncr, tol, max_iter)
    }

    pub fn norm_unbalance(tol: f64, max_iter: usize) -> Self {
        Self::new(TestKind::NormUnbalance, tol, max_iter)
    }

    pub fn relative_norm_disp_incr(tol: f64, max_iter: usize) -> Self {
        Self::new(TestKind::RelativeNormDispIncr, tol, max_iter)
    }

    pub fn energy_incr(tol: f64, max_iter: usize) -> Self {
        Self::new(TestKind::EnergyIncr, tol, max_iter)
    }

    /// Reset the history at the start of a step
    pub fn start(&mut self) {
        self.history.clear();
        self.reference = 0.0;
    }

    /// Record one iteration
    ///
    /// `du` is the applied increment, `b_before` the right-hand side it was
    /// solved from and `b_after` the unbalance after the update.
    pub fn check(&mut self, du: &DVector<f64>, b_before: &DVector<f64>, b_after: &DVector<f64>) -> TestResult {
        let norm = match self.kind {
            TestKind::NormDispIncr => du.norm(),
            TestKind::NormUnbalance => b_after.norm(),
            TestKind::RelativeNormDispIncr => {
                let n = du.norm();
                if self.history.is_empty() {
                    self.reference = n;
                }
                if self.reference > 0.0 {
                    n / self.reference
                } else {
                    n
                }
            }
            TestKind::EnergyIncr => {
                let m = du.len().min(b_before.len());
                0.5 * du.rows(0, m).dot(&b_before.rows(0, m)).abs()
            }
        };
        self.history.push(norm);
        log::trace!("{:?} iteration {}: {norm:e}", self.kind, self.history.len());

        if !norm.is_finite() {
            TestResult::Diverged
        } else if norm <= self.tol {
            TestResult::Converged
        } else if self.history.len() >= self.max_iter {
            TestResult::Diverged
        } else {
            TestResult::Iterating
        }
    }

    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn last_norm(&self) -> f64 {
        self.history.last().copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(x)
    }

    #[test]
    fn test_budget_and_history() {
        let mut t = ConvergenceTest::norm_disp_incr(1e-6, 3);
        t.start();
        let b = v(&[1.0]);
        assert_eq!(t.check(&v(&[1.0]), &b, &b), TestResult::Iterating);
        assert_eq!(t.check(&v(&[0.1]), &b, &b), TestResult::Iterating);
        assert_eq!(t.check(&v(&[0.01]), &b, &b), TestResult::Diverged);
        assert_eq!(t.history().len(), 3);
        t.start();
        assert_eq!(t.check(&v(&[1e-9]), &b, &b), TestResult::Converged);
        assert_eq!(t.iterations(), 1);
    }

    #[test]
    fn test_norms() {
        let du = v(&[3.0, 4.0]);
        let before = v(&[1.0, 1.0]);
        let after = v(&[0.0, 1e-12]);

        let mut e = ConvergenceTest::energy_incr(1.0, 5);
        e.start();
        e.check(&du, &before, &after);
        assert_eq!(e.last_norm(), 3.5);

        let mut u = ConvergenceTest::norm_unbalance(1e-10, 5);
        u.start();
        assert_eq!(u.check(&du, &before, &after), TestResult::Converged);

        let mut r = ConvergenceTest::relative_norm_disp_incr(0.1, 5);
        r.start();
        assert_eq!(r.check(&du, &before, &after), TestResult::Iterating);
        assert_eq!(r.check(&(du * 0.05), &before, &after), TestResult::Converged);
    }

    #[test]
    fn test_non_finite_diverges() {
        let mut t = ConvergenceTest::default();
        t.start();
        let b = v(&[0.0]);
        assert_eq!(t.check(&v(&[f64::NAN]), &b, &b), TestResult::Diverged);
    }
}
