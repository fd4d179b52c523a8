//! Sparse matrix utilities for assembly, factorization and reordering
//!
//! Stiffness matrices of frame and shell models are overwhelmingly sparse.
//! Assembly goes through a COO builder; factorizations work on CSC storage.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::{FEAError, FEAResult};

/// Sparse matrix builder using COO format
/// More efficient for incremental assembly
#[derive(Debug, Clone)]
pub struct SparseMatrixBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl SparseMatrixBuilder {
    /// Create a new sparse matrix builder
    pub fn new(size: usize) -> Self {
        // 6 DOFs per node, roughly 10 coupled DOFs per row
        let estimated_nnz = size * 60;
        Self {
            size,
            entries: Vec::with_capacity(estimated_nnz),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Add a value to the matrix (accumulates if already exists)
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value != 0.0 {
            self.entries.push((row, col, value));
        }
    }

    /// Drop all entries, keeping the size
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Convert to CSC format (duplicates are summed)
    pub fn to_csc(&self) -> CscMatrix<f64> {
        CscMatrix::from(&self.to_coo())
    }

    fn to_coo(&self) -> CooMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        coo
    }

    /// Convert to dense matrix (for comparison/debugging)
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.size, self.size);
        for &(row, col, val) in &self.entries {
            mat[(row, col)] += val;
        }
        mat
    }

    /// Sparse matrix-vector product without forming the matrix
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.size);
        for &(row, col, val) in &self.entries {
            y[row] += val * x[col];
        }
        y
    }

    /// Get estimated non-zero count
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// Sparse LU factorization with partial pivoting (left-looking)
///
/// Factors P·A = L·U column by column. L has a unit diagonal and is stored
/// by columns with original row indices; U is stored by columns with pivot
/// step indices.
#[derive(Debug, Clone)]
pub struct SparseLu {
    n: usize,
    /// Original row chosen as pivot at each step
    perm: Vec<usize>,
    l_cols: Vec<Vec<(usize, f64)>>,
    u_cols: Vec<Vec<(usize, f64)>>,
    u_diag: Vec<f64>,
}

impl SparseLu {
    /// Factor a square CSC matrix
    pub fn factor(a: &CscMatrix<f64>) -> FEAResult<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(FEAError::InvalidInput("sparse LU needs a square matrix".to_string()));
        }

        let mut perm = Vec::with_capacity(n);
        let mut pivot_step: Vec<Option<usize>> = vec![None; n];
        let mut l_cols: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut u_cols: Vec<Vec<(usize, f64)>> = Vec::with_capacity(n);
        let mut u_diag = Vec::with_capacity(n);

        let mut x = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();
        let mut mark = vec![false; n];

        let scale = a.values().iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-300);

        for j in 0..n {
            let col = a.col(j);
            for (&row, &val) in col.row_indices().iter().zip(col.values()) {
                x[row] += val;
                if !mark[row] {
                    mark[row] = true;
                    touched.push(row);
                }
            }

            let mut u_col = Vec::new();
            for k in 0..j {
                let ukj = x[perm[k]];
                if ukj == 0.0 {
                    continue;
                }
                u_col.push((k, ukj));
                for &(row, lik) in &l_cols[k] {
                    x[row] -= lik * ukj;
                    if !mark[row] {
                        mark[row] = true;
                        touched.push(row);
                    }
                }
            }

            // Partial pivoting over rows not yet used
            let mut pivot_row = None;
            let mut pivot_abs = 0.0;
            for &row in &touched {
                if pivot_step[row].is_none() && x[row].abs() > pivot_abs {
                    pivot_abs = x[row].abs();
                    pivot_row = Some(row);
                }
            }
            let pivot_row = match pivot_row {
                Some(r) if pivot_abs > 1e-14 * scale => r,
                _ => return Err(FEAError::SingularMatrix),
            };
            let pivot = x[pivot_row];

            let mut l_col = Vec::new();
            for &row in &touched {
                if pivot_step[row].is_none() && row != pivot_row && x[row] != 0.0 {
                    l_col.push((row, x[row] / pivot));
                }
            }

            pivot_step[pivot_row] = Some(j);
            perm.push(pivot_row);
            u_diag.push(pivot);
            u_cols.push(u_col);
            l_cols.push(l_col);

            for &row in &touched {
                x[row] = 0.0;
                mark[row] = false;
            }
            touched.clear();
        }

        Ok(Self {
            n,
            perm,
            l_cols,
            u_cols,
            u_diag,
        })
    }

    /// Solve A·x = b with the stored factors
    pub fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut w = b.clone();
        let mut y = DVector::zeros(self.n);
        for k in 0..self.n {
            let yk = w[self.perm[k]];
            y[k] = yk;
            if yk != 0.0 {
                for &(row, l) in &self.l_cols[k] {
                    w[row] -= l * yk;
                }
            }
        }
        for j in (0..self.n).rev() {
            let zj = y[j] / self.u_diag[j];
            y[j] = zj;
            for &(k, u) in &self.u_cols[j] {
                y[k] -= u * zj;
            }
        }
        y
    }

    /// Fill of the factors
    pub fn nnz(&self) -> usize {
        self.n
            + self.l_cols.iter().map(Vec::len).sum::<usize>()
            + self.u_cols.iter().map(Vec::len).sum::<usize>()
    }
}

/// Bandwidth reduction using Reverse Cuthill-McKee algorithm
///
/// `adj` lists the neighbours of every vertex. Returns the vertices in their
/// new order (position -> vertex).
pub fn reverse_cuthill_mckee(adj: &[Vec<usize>]) -> Vec<usize> {
    let n = adj.len();
    if n == 0 {
        return vec![];
    }

    let degrees: Vec<usize> = adj.iter().map(|v| v.len()).collect();
    let mut sorted: Vec<Vec<usize>> = adj.to_vec();
    for neighbors in &mut sorted {
        neighbors.sort_by_key(|&i| (degrees[i], i));
        neighbors.dedup();
    }

    let mut visited = vec![false; n];
    let mut result = Vec::with_capacity(n);
    let mut queue = std::collections::VecDeque::new();

    while result.len() < n {
        // Each component starts from its unvisited vertex of minimum degree
        let start = (0..n)
            .filter(|&i| !visited[i])
            .min_by_key(|&i| (degrees[i], i));
        let Some(start) = start else { break };
        queue.push_back(start);
        visited[start] = true;

        while let Some(vertex) = queue.pop_front() {
            result.push(vertex);
            for &neighbor in &sorted[vertex] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    result.reverse();
    result
}

/// Create inverse permutation
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (new_idx, &old_idx) in perm.iter().enumerate() {
        inv[old_idx] = new_idx;
    }
    inv
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sparse_builder() {
        let mut builder = SparseMatrixBuilder::new(4);
        builder.add(0, 0, 4.0);
        builder.add(0, 1, 1.0);
        builder.add(1, 0, 1.0);
        builder.add(1, 1, 3.0);
        builder.add(1, 1, 1.0);
        builder.add(3, 3, 1.0);

        let dense = builder.to_dense();
        assert_relative_eq!(dense[(0, 0)], 4.0);
        assert_relative_eq!(dense[(1, 1)], 4.0);
        // the two (1, 1) entries merge
        assert_eq!(builder.to_csc().nnz(), 5);
    }

    #[test]
    fn test_sparse_lu_needs_pivoting() {
        // Zero leading diagonal, as produced by Lagrange multipliers
        let mut builder = SparseMatrixBuilder::new(3);
        builder.add(0, 1, 1.0);
        builder.add(1, 0, 1.0);
        builder.add(1, 1, 2.0);
        builder.add(1, 2, -1.0);
        builder.add(2, 1, -1.0);
        builder.add(2, 2, 2.0);

        let lu = SparseLu::factor(&builder.to_csc()).unwrap();
        let b = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let x = lu.solve(&b);
        let ax = builder.mul_vec(&x);
        assert_relative_eq!(ax, b, epsilon = 1e-12);
    }

    #[test]
    fn test_sparse_lu_singular() {
        let mut builder = SparseMatrixBuilder::new(2);
        builder.add(0, 0, 1.0);
        builder.add(0, 1, 1.0);
        builder.add(1, 0, 1.0);
        builder.add(1, 1, 1.0);
        assert!(matches!(
            SparseLu::factor(&builder.to_csc()),
            Err(FEAError::SingularMatrix)
        ));
    }

    #[test]
    fn test_rcm_path_graph() {
        // 0 - 2 - 1 - 3 path scrambled; RCM must walk it end to end
        let adj = vec![vec![2], vec![2, 3], vec![0, 1], vec![1]];
        let order = reverse_cuthill_mckee(&adj);
        assert_eq!(order.len(), 4);
        let pos = inverse_permutation(&order);
        for (v, nbrs) in adj.iter().enumerate() {
            for &w in nbrs {
                assert_eq!((pos[v] as i64 - pos[w] as i64).abs(), 1);
            }
        }
    }
}
