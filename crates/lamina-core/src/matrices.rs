//! Characteristic (Abeles) matrices.
//!
//! For every wavelength, a [`Matrices`] holds one 2×2 complex matrix per
//! polarization plane. A single layer of index $N$ and thickness $d$ has
//!
//! $$
//! \mathbf{M} = \begin{pmatrix} \cos\varphi & i \sin\varphi / \tilde{N} \\
//! i \tilde{N} \sin\varphi & \cos\varphi \end{pmatrix},
//! \qquad \varphi = \frac{2\pi}{\lambda} d N_s
//! $$
//!
//! with $\tilde{N} = N_s$ or $N_p$. A stack is the ordered product of its
//! layer matrices, front to back.
//!
//! Entry indices 0..3 follow `[A, B; C, D]` row-major order.

use nalgebra::Matrix2;
use num_complex::Complex64;

use crate::types::{effective_indices, wavenumber, Grid, IndexArray, Plane, Sin2};

pub(crate) const I: Complex64 = Complex64::new(0.0, 1.0);

/// Per-wavelength s and p characteristic matrices.
#[derive(Debug, Clone)]
pub struct Matrices {
    grid: Grid,
    pub(crate) s: Vec<Matrix2<Complex64>>,
    pub(crate) p: Vec<Matrix2<Complex64>>,
}

impl Matrices {
    /// Identity matrices on `grid`.
    pub fn new(grid: Grid) -> Self {
        let len = grid.len();
        Self {
            grid,
            s: vec![Matrix2::identity(); len],
            p: vec![Matrix2::identity(); len],
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s.is_empty()
    }

    /// Matrices of one plane.
    pub fn plane(&self, plane: Plane) -> &[Matrix2<Complex64>] {
        match plane {
            Plane::S => &self.s,
            Plane::P => &self.p,
        }
    }

    /// Entry `index` (0..3, row-major) of the matrix at wavelength `wvl`.
    pub fn entry(&self, plane: Plane, wvl: usize, index: usize) -> Complex64 {
        let m = &self.plane(plane)[wvl];
        m[(index / 2, index % 2)]
    }

    pub fn set_unity(&mut self) {
        self.s.iter_mut().for_each(|m| *m = Matrix2::identity());
        self.p.iter_mut().for_each(|m| *m = Matrix2::identity());
    }

    pub fn copy_from(&mut self, other: &Matrices) {
        self.check_grid(other.len());
        self.s.copy_from_slice(&other.s);
        self.p.copy_from_slice(&other.p);
    }

    /// Set to the matrix of a single layer.
    pub fn set_matrices(&mut self, n: &IndexArray, thickness: f64, sin2: &Sin2) {
        self.check_grid(n.len());
        self.check_grid(sin2.values().len());
        for (wvl, (&n, &sin2)) in n.values().iter().zip(sin2.values()).enumerate() {
            let (n_s, n_p) = effective_indices(n, sin2);
            let phi = wavenumber(self.grid[wvl]) * thickness * n_s;
            let (sin, cos) = (phi.sin(), phi.cos());
            self.s[wvl] = layer_matrix(cos, sin, n_s);
            self.p[wvl] = layer_matrix(cos, sin, n_p);
        }
    }

    /// `self = self · other` for both planes.
    pub fn multiply(&mut self, other: &Matrices) {
        self.check_grid(other.len());
        for (m, o) in self.s.iter_mut().zip(&other.s) {
            *m *= o;
        }
        for (m, o) in self.p.iter_mut().zip(&other.p) {
            *m *= o;
        }
    }

    pub(crate) fn check_grid(&self, len: usize) {
        assert_eq!(
            self.len(),
            len,
            "per-wavelength arrays must share the same wavelength grid"
        );
    }
}

fn layer_matrix(cos: Complex64, sin: Complex64, n: Complex64) -> Matrix2<Complex64> {
    Matrix2::new(cos, I * sin / n, I * n * sin, cos)
}
