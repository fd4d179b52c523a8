//! Banded matrix storage with LU and Cholesky factorizations

use nalgebra::DVector;

use crate::error::{FEAError, FEAResult};

/// General band matrix with partial-pivoting LU
///
/// Row `i` stores columns `i - kl ..= i + ku + kl`; the extra `kl`
/// superdiagonals hold fill created by row interchanges.
#[derive(Debug, Clone)]
pub struct BandMatrix {
    n: usize,
    kl: usize,
    ku: usize,
    width: usize,
    data: Vec<f64>,
    pivots: Vec<usize>,
    factored: bool,
}

impl BandMatrix {
    pub fn new(n: usize, kl: usize, ku: usize) -> Self {
        let width = 2 * kl + ku + 1;
        Self {
            n,
            kl,
            ku,
            width,
            data: vec![0.0; n * width],
            pivots: vec![0; n],
            factored: false,
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn bandwidths(&self) -> (usize, usize) {
        (self.kl, self.ku)
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> Option<usize> {
        let offset = j as isize - i as isize + self.kl as isize;
        if offset < 0 || offset as usize >= self.width {
            None
        } else {
            Some(i * self.width + offset as usize)
        }
    }

    /// Entry (i, j); zero outside the band
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(0.0, |k| self.data[k])
    }

    /// Accumulate into (i, j); entries outside the declared band are an error
    pub fn add(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        let in_band = j + self.kl >= i && j <= i + self.ku;
        match self.index(i, j) {
            Some(k) if in_band => {
                self.data[k] += value;
                self.factored = false;
                Ok(())
            }
            _ => Err(FEAError::InvalidInput(format!(
                "entry ({i}, {j}) outside band (kl={}, ku={})",
                self.kl, self.ku
            ))),
        }
    }

    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
        self.factored = false;
    }

    pub fn is_factored(&self) -> bool {
        self.factored
    }

    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.n);
        for i in 0..self.n {
            let lo = i.saturating_sub(self.kl);
            let hi = (i + self.ku).min(self.n - 1);
            for j in lo..=hi {
                y[i] += self.get(i, j) * x[j];
            }
        }
        y
    }

    /// LU factorization in place
    pub fn factor(&mut self) -> FEAResult<()> {
        let n = self.n;
        let reach = self.kl + self.ku;
        let scale = self.data.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-300);
        for k in 0..n {
            let last_row = (k + self.kl).min(n - 1);
            let last_col = (k + reach).min(n - 1);

            let mut p = k;
            let mut best = self.get(k, k).abs();
            for i in k + 1..=last_row {
                let v = self.get(i, k).abs();
                if v > best {
                    best = v;
                    p = i;
                }
            }
            if best <= 1e-14 * scale {
                return Err(FEAError::SingularMatrix);
            }
            self.pivots[k] = p;
            if p != k {
                for j in k..=last_col {
                    if let (Some(a), Some(b)) = (self.index(k, j), self.index(p, j)) {
                        self.data.swap(a, b);
                    }
                }
            }

            let pivot = self.get(k, k);
            for i in k + 1..=last_row {
                let Some(ik) = self.index(i, k) else { continue };
                let l = self.data[ik] / pivot;
                self.data[ik] = l;
                if l == 0.0 {
                    continue;
                }
                for j in k + 1..=last_col {
                    if let (Some(ij), Some(kj)) = (self.index(i, j), self.index(k, j)) {
                        self.data[ij] -= l * self.data[kj];
                    }
                }
            }
        }
        self.factored = true;
        Ok(())
    }

    /// Solve with existing factors
    pub fn solve(&self, b: &DVector<f64>) -> FEAResult<DVector<f64>> {
        if !self.factored {
            return Err(FEAError::InvalidState("band matrix not factored".to_string()));
        }
        let n = self.n;
        let mut x = b.clone();
        for k in 0..n {
            let p = self.pivots[k];
            if p != k {
                x.swap_rows(k, p);
            }
            let xk = x[k];
            for i in k + 1..=(k + self.kl).min(n - 1) {
                x[i] -= self.get(i, k) * xk;
            }
        }
        for k in (0..n).rev() {
            let mut s = x[k];
            for j in k + 1..=(k + self.kl + self.ku).min(n - 1) {
                s -= self.get(k, j) * x[j];
            }
            x[k] = s / self.get(k, k);
        }
        Ok(x)
    }
}

/// Symmetric band matrix (lower band stored) with Cholesky factorization
#[derive(Debug, Clone)]
pub struct BandSymMatrix {
    n: usize,
    bw: usize,
    data: Vec<f64>,
    factored: bool,
}

impl BandSymMatrix {
    pub fn new(n: usize, half_bandwidth: usize) -> Self {
        Self {
            n,
            bw: half_bandwidth,
            data: vec![0.0; n * (half_bandwidth + 1)],
            factored: false,
        }
    }

    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> Option<usize> {
        let (i, j) = if j > i { (j, i) } else { (i, j) };
        if i - j > self.bw {
            None
        } else {
            Some(i * (self.bw + 1) + (i - j))
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(0.0, |k| self.data[k])
    }

    /// Accumulate into the lower triangle only; upper entries are ignored
    pub fn add(&mut self, i: usize, j: usize, value: f64) -> FEAResult<()> {
        if j > i {
            return Ok(());
        }
        match self.index(i, j) {
            Some(k) => {
                self.data[k] += value;
                self.factored = false;
                Ok(())
            }
            None => Err(FEAError::InvalidInput(format!(
                "entry ({i}, {j}) outside half bandwidth {}",
                self.bw
            ))),
        }
    }

    pub fn zero(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
        self.factored = false;
    }

    pub fn is_factored(&self) -> bool {
        self.factored
    }

    /// Cholesky factorization in place; fails on a non-positive pivot
    pub fn factor(&mut self) -> FEAResult<()> {
        let n = self.n;
        for j in 0..n {
            let lo = j.saturating_sub(self.bw);
            let mut s = self.get(j, j);
            for k in lo..j {
                let l = self.get(j, k);
                s -= l * l;
            }
            if !(s > 0.0) || !s.is_finite() {
                return Err(FEAError::solver(
                    "BandSpd",
                    j as i32 + 1,
                    format!("non-positive pivot {s:e} at equation {j}"),
                ));
            }
            let d = s.sqrt();
            if let Some(jj) = self.index(j, j) {
                self.data[jj] = d;
            }
            for i in j + 1..=(j + self.bw).min(n - 1) {
                let lo_i = i.saturating_sub(self.bw).max(lo);
                let mut s = self.get(i, j);
                for k in lo_i..j {
                    s -= self.get(i, k) * self.get(j, k);
                }
                if let Some(ij) = self.index(i, j) {
                    self.data[ij] = s / d;
                }
            }
        }
        self.factored = true;
        Ok(())
    }

    pub fn solve(&self, b: &DVector<f64>) -> FEAResult<DVector<f64>> {
        if !self.factored {
            return Err(FEAError::InvalidState("band matrix not factored".to_string()));
        }
        let n = self.n;
        let mut x = b.clone();
        for i in 0..n {
            let mut s = x[i];
            for k in i.saturating_sub(self.bw)..i {
                s -= self.get(i, k) * x[k];
            }
            x[i] = s / self.get(i, i);
        }
        for i in (0..n).rev() {
            let mut s = x[i];
            for k in i + 1..=(i + self.bw).min(n - 1) {
                s -= self.get(k, i) * x[k];
            }
            x[i] = s / self.get(i, i);
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tridiagonal() -> (BandMatrix, BandSymMatrix) {
        let n = 5;
        let mut g = BandMatrix::new(n, 1, 1);
        let mut s = BandSymMatrix::new(n, 1);
        for i in 0..n {
            g.add(i, i, 4.0).unwrap();
            s.add(i, i, 4.0).unwrap();
            if i + 1 < n {
                g.add(i, i + 1, -1.0).unwrap();
                g.add(i + 1, i, -1.0).unwrap();
                s.add(i + 1, i, -1.0).unwrap();
            }
        }
        (g, s)
    }

    #[test]
    fn test_band_lu_and_cholesky_agree() {
        let (mut g, mut s) = tridiagonal();
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let original = g.clone();
        g.factor().unwrap();
        s.factor().unwrap();
        let xg = g.solve(&b).unwrap();
        let xs = s.solve(&b).unwrap();
        assert_relative_eq!(xg, xs, epsilon = 1e-12);
        assert_relative_eq!(original.mul_vec(&xg), b, epsilon = 1e-12);
    }

    #[test]
    fn test_band_lu_pivots_zero_diagonal() {
        let mut g = BandMatrix::new(3, 1, 1);
        g.add(0, 1, 1.0).unwrap();
        g.add(1, 0, 1.0).unwrap();
        g.add(1, 2, 1.0).unwrap();
        g.add(2, 1, 1.0).unwrap();
        g.add(2, 2, 1.0).unwrap();
        let original = g.clone();
        g.factor().unwrap();
        let b = DVector::from_vec(vec![1.0, 1.0, 1.0]);
        let x = g.solve(&b).unwrap();
        assert_relative_eq!(original.mul_vec(&x), b, epsilon = 1e-12);
    }

    #[test]
    fn test_band_outside_entry_rejected() {
        let mut g = BandMatrix::new(4, 1, 1);
        assert!(g.add(0, 3, 1.0).is_err());
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let mut s = BandSymMatrix::new(2, 1);
        s.add(0, 0, 1.0).unwrap();
        s.add(1, 1, -1.0).unwrap();
        assert!(s.factor().is_err());
    }
}
