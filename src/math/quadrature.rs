//! Quadrature rules on the unit interval and the reference square

use crate::error::{FEAError, FEAResult};

/// Legendre polynomial P_n and its derivative at x
fn legendre(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let kf = k as f64;
        let p2 = ((2.0 * kf - 1.0) * x * p1 - (kf - 1.0) * p0) / kf;
        p0 = p1;
        p1 = p2;
    }
    // Derivative from the three-term identity; only used away from the end points
    let dp = n as f64 * (p0 - x * p1) / (1.0 - x * x);
    (p1, dp)
}

/// Gauss–Lobatto points and weights mapped to [0, 1]
///
/// The end points are always included, which places a section at each end of
/// a force-based beam. Weights sum to one.
pub fn gauss_lobatto(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    if !(2..=20).contains(&n) {
        return Err(FEAError::InvalidInput(format!(
            "Gauss-Lobatto rule needs 2..=20 points, got {n}"
        )));
    }
    let m = n - 1;
    let mut xs = vec![0.0; n];
    xs[0] = -1.0;
    xs[m] = 1.0;

    // Interior points are the roots of P'_{n-1}; start from Chebyshev-Gauss-Lobatto guesses
    for i in 1..m {
        let mut x = -(std::f64::consts::PI * i as f64 / m as f64).cos();
        for _ in 0..100 {
            // Newton on (1 - x^2) P'_m(x) = m (P_{m-1} - x P_m)
            let (p, _) = legendre(m, x);
            let (pm1, _) = legendre(m - 1, x);
            let f = pm1 - x * p;
            let df = -(m as f64 + 1.0) * p;
            let dx = f / df;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        xs[i] = x;
    }

    let mf = m as f64;
    let mut pts = Vec::with_capacity(n);
    let mut wts = Vec::with_capacity(n);
    for &x in &xs {
        let (p, _) = legendre(m, x);
        let w = 2.0 / (mf * (mf + 1.0) * p * p);
        pts.push(0.5 * (x + 1.0));
        wts.push(0.5 * w);
    }
    Ok((pts, wts))
}

/// Gauss–Legendre points and weights on [-1, 1]
pub fn gauss_legendre(n: usize) -> FEAResult<(Vec<f64>, Vec<f64>)> {
    if !(1..=20).contains(&n) {
        return Err(FEAError::InvalidInput(format!(
            "Gauss-Legendre rule needs 1..=20 points, got {n}"
        )));
    }
    let mut pts = Vec::with_capacity(n);
    let mut wts = Vec::with_capacity(n);
    for i in 0..n {
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        for _ in 0..100 {
            let (p, dp) = legendre(n, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        let (_, dp) = legendre(n, x);
        pts.push(-x);
        wts.push(2.0 / ((1.0 - x * x) * dp * dp));
    }
    Ok((pts, wts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lobatto_three_points() {
        let (x, w) = gauss_lobatto(3).unwrap();
        assert_relative_eq!(x[0], 0.0, epsilon = 1e-14);
        assert_relative_eq!(x[1], 0.5, epsilon = 1e-14);
        assert_relative_eq!(x[2], 1.0, epsilon = 1e-14);
        assert_relative_eq!(w[0], 1.0 / 6.0, epsilon = 1e-14);
        assert_relative_eq!(w[1], 4.0 / 6.0, epsilon = 1e-14);
    }

    #[test]
    fn test_lobatto_integrates_polynomials() {
        // n points integrate degree 2n - 3 exactly
        for n in 2..=10 {
            let (x, w) = gauss_lobatto(n).unwrap();
            let degree = 2 * n - 3;
            let integral: f64 = x.iter().zip(&w).map(|(xi, wi)| wi * xi.powi(degree as i32)).sum();
            assert_relative_eq!(integral, 1.0 / (degree as f64 + 1.0), epsilon = 1e-12);
            assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_legendre_two_points() {
        let (x, w) = gauss_legendre(2).unwrap();
        let g = 1.0 / 3.0f64.sqrt();
        assert_relative_eq!(x[0], -g, epsilon = 1e-14);
        assert_relative_eq!(x[1], g, epsilon = 1e-14);
        assert_relative_eq!(w[0], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rule_bounds() {
        assert!(gauss_lobatto(1).is_err());
        assert!(gauss_legendre(0).is_err());
    }
}
