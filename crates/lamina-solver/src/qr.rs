//! Column-pivoted QR of the weighted Jacobian and the damped least-squares
//! solve used by the trust-region step.
//!
//! The factorisation $\mathbf{J}\mathbf{P} = \mathbf{Q}\mathbf{R}$ comes from
//! [`nalgebra::linalg::ColPivQR`]. Negligible diagonal entries of
//! $\mathbf{R}$ mark the directions the data cannot resolve.

use std::cmp::Ordering;

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

/// Relative size below which a diagonal entry of R counts as zero.
const RANK_TOLERANCE: f64 = 100.0 * f64::EPSILON;

/// Result of [`PivotedQr::solve_damped`].
#[derive(Debug, Clone)]
pub(crate) struct DampedSolution {
    /// Minimiser of $\|\mathbf{J}x - b\|^2 + \|\mathbf{D}x\|^2$.
    pub x: Array1<f64>,
    /// Strict lower triangle holds the transposed triangular factor $\mathbf{S}$
    /// of the augmented system.
    pub s: DMatrix<f64>,
    /// Diagonal of $\mathbf{S}$.
    pub s_diag: DVector<f64>,
}

/// Factorisation of an `m × n` matrix (`m ≥ n`) together with $\mathbf{Q}^T b$.
#[derive(Debug, Clone)]
pub(crate) struct PivotedQr {
    /// `n × n` upper triangular factor.
    r: DMatrix<f64>,
    /// `permutation[j]` is the original column now in position `j`.
    permutation: Vec<usize>,
    /// First `n` components of $\mathbf{Q}^T b$.
    qtb: DVector<f64>,
    /// `false` where the diagonal of R is negligible.
    resolved: Vec<bool>,
}

impl PivotedQr {
    /// Factorise `a` (consumed) and transform `b`.
    pub fn factorize(a: DMatrix<f64>, b: &DVector<f64>) -> Self {
        let (m, n) = a.shape();
        assert!(m >= n, "QR factorisation needs at least as many rows as columns");
        assert_eq!(b.len(), m, "right-hand side length must match row count");

        let decomposition = a.col_piv_qr();
        let r = decomposition.r();

        let mut order = DMatrix::from_fn(1, n, |_, j| j);
        decomposition.p().permute_columns(&mut order);
        let permutation: Vec<usize> = order.iter().copied().collect();

        let mut qtb = b.clone();
        decomposition.q_tr_mul(&mut qtb);
        let qtb = qtb.rows(0, n).into_owned();

        let largest = r.diagonal().iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));
        let threshold = RANK_TOLERANCE * m as f64 * largest;
        let resolved = r.diagonal().iter().map(|d| d.abs() > threshold).collect();

        Self {
            r,
            permutation,
            qtb,
            resolved,
        }
    }

    pub fn n(&self) -> usize {
        self.permutation.len()
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn qtb(&self) -> &DVector<f64> {
        &self.qtb
    }

    /// Number of resolved directions.
    pub fn rank(&self) -> usize {
        self.resolved.iter().filter(|&&resolved| resolved).count()
    }

    pub fn is_rank_deficient(&self) -> bool {
        self.rank() < self.n()
    }

    /// Undamped Gauss-Newton step $\mathbf{J}x \approx b$.
    ///
    /// Components along unresolved directions are set to zero and the rest
    /// of the triangular system is solved (the basic solution).
    pub fn gauss_newton_step(&self) -> Array1<f64> {
        let n = self.n();
        let mut w = DVector::zeros(n);
        for j in (0..n).rev() {
            if !self.resolved[j] {
                continue;
            }
            let sum: f64 = (j + 1..n).map(|i| self.r[(j, i)] * w[i]).sum();
            w[j] = (self.qtb[j] - sum) / self.r[(j, j)];
        }
        self.unpermute(&w)
    }

    fn unpermute(&self, w: &DVector<f64>) -> Array1<f64> {
        let mut x = Array1::zeros(self.n());
        for (j, &l) in self.permutation.iter().enumerate() {
            x[l] = w[j];
        }
        x
    }

    /// Solve $\min \|\mathbf{J}x - b\|^2 + \|\mathbf{D}x\|^2$ for a diagonal
    /// `diag` (indexed by original column), using Givens rotations to
    /// eliminate $\mathbf{D}$ against $\mathbf{R}$.
    pub fn solve_damped(&self, diag: &Array1<f64>) -> DampedSolution {
        let n = self.n();
        let mut s = self.r.clone();
        let mut w = self.qtb.clone();
        let saved_diag = self.r.diagonal();

        for j in 0..n {
            for i in j + 1..n {
                s[(i, j)] = s[(j, i)];
            }
        }

        let mut s_diag = DVector::zeros(n);
        for j in 0..n {
            let l = self.permutation[j];
            if diag[l] != 0.0 {
                s_diag.rows_mut(j, n - j).fill(0.0);
                s_diag[j] = diag[l];

                let mut qtbpj = 0.0;
                for k in j..n {
                    if s_diag[k] == 0.0 {
                        continue;
                    }
                    let (cos, sin) = givens(s[(k, k)], s_diag[k]);
                    s[(k, k)] = cos * s[(k, k)] + sin * s_diag[k];
                    let rotated = cos * w[k] + sin * qtbpj;
                    qtbpj = -sin * w[k] + cos * qtbpj;
                    w[k] = rotated;
                    for i in k + 1..n {
                        let rotated = cos * s[(i, k)] + sin * s_diag[i];
                        s_diag[i] = -sin * s[(i, k)] + cos * s_diag[i];
                        s[(i, k)] = rotated;
                    }
                }
            }
            s_diag[j] = s[(j, j)];
            s[(j, j)] = saved_diag[j];
        }

        let singular_at = s_diag.iter().position(|&d| d == 0.0).unwrap_or(n);
        w.rows_mut(singular_at, n - singular_at).fill(0.0);
        for j in (0..singular_at).rev() {
            let sum: f64 = (j + 1..singular_at).map(|i| s[(i, j)] * w[i]).sum();
            w[j] = (w[j] - sum) / s_diag[j];
        }

        DampedSolution {
            x: self.unpermute(&w),
            s,
            s_diag,
        }
    }

    /// $\mathbf{R}\mathbf{P}^T x$, used for the predicted reduction.
    pub fn r_times(&self, x: &Array1<f64>) -> DVector<f64> {
        let permuted = DVector::from_fn(self.n(), |j, _| x[self.permutation[j]]);
        &self.r * permuted
    }
}

/// Rotation `(cos, sin)` that annihilates `b` against `a`.
fn givens(a: f64, b: f64) -> (f64, f64) {
    match a.abs().partial_cmp(&b.abs()) {
        Some(Ordering::Less) => {
            let cotan = a / b;
            let sin = 0.5 / (0.25 + 0.25 * cotan * cotan).sqrt();
            (sin * cotan, sin)
        }
        _ => {
            let tan = b / a;
            let cos = 0.5 / (0.25 + 0.25 * tan * tan).sqrt();
            (cos, cos * tan)
        }
    }
}
