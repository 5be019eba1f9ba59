//! Partial products of a stack's layer matrices.
//!
//! For layers `M_0 … M_{n−1}` (front to back):
//!
//! - `pre[i] = M_0 ⋯ M_{i−1}`
//! - `post[i] = M_{i+1} ⋯ M_{n−1}`
//! - `global = M_0 ⋯ M_{n−1}`
//!
//! so that `pre[i] · M_i · post[i] == global` for every layer. Both sweeps
//! are linear in the number of layers.

use crate::matrices::Matrices;
use crate::types::{Grid, IndexArray, Sin2};

#[derive(Debug, Clone)]
pub struct PrePostMatrices {
    layers: Vec<Matrices>,
    pre: Vec<Matrices>,
    post: Vec<Matrices>,
    global: Matrices,
}

impl PrePostMatrices {
    pub fn new(grid: Grid, nb_layers: usize) -> Self {
        let identity = Matrices::new(grid.clone());
        Self {
            layers: vec![identity.clone(); nb_layers],
            pre: vec![identity.clone(); nb_layers],
            post: vec![identity.clone(); nb_layers],
            global: identity,
        }
    }

    pub fn nb_layers(&self) -> usize {
        self.layers.len()
    }

    /// Set the matrix of one layer. Call [`multiply`](Self::multiply) once all
    /// layers are set.
    pub fn set_layer_matrices(
        &mut self,
        layer: usize,
        n: &IndexArray,
        thickness: f64,
        sin2: &Sin2,
    ) {
        self.layers[layer].set_matrices(n, thickness, sin2);
    }

    pub fn layer(&self, layer: usize) -> &Matrices {
        &self.layers[layer]
    }

    pub fn pre(&self, layer: usize) -> &Matrices {
        &self.pre[layer]
    }

    pub fn post(&self, layer: usize) -> &Matrices {
        &self.post[layer]
    }

    pub fn global(&self) -> &Matrices {
        &self.global
    }

    /// Recompute `pre`, `post` and `global` from the layer matrices.
    pub fn multiply(&mut self) {
        let n = self.layers.len();
        if n == 0 {
            self.global.set_unity();
            return;
        }

        self.pre[0].set_unity();
        for i in 1..n {
            let (done, rest) = self.pre.split_at_mut(i);
            rest[0].copy_from(&done[i - 1]);
            rest[0].multiply(&self.layers[i - 1]);
        }

        self.post[n - 1].set_unity();
        for i in (0..n - 1).rev() {
            let (head, tail) = self.post.split_at_mut(i + 1);
            head[i].copy_from(&self.layers[i + 1]);
            head[i].multiply(&tail[0]);
        }

        self.global.copy_from(&self.pre[n - 1]);
        self.global.multiply(&self.layers[n - 1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::grid;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn test_pre_layer_post_reproduces_global() {
        let g = grid(&[480.0, 633.0]);
        let medium = IndexArray::constant(g.clone(), Complex64::new(1.0, 0.0));
        let sin2 = Sin2::new(&medium, 40.0);
        let indices = [
            Complex64::new(2.1, -0.01),
            Complex64::new(1.45, 0.0),
            Complex64::new(2.1, -0.01),
            Complex64::new(1.38, 0.0),
        ];
        let thicknesses = [55.0, 92.0, 61.0, 110.0];

        let mut pp = PrePostMatrices::new(g.clone(), indices.len());
        for (i, (&n, &d)) in indices.iter().zip(&thicknesses).enumerate() {
            pp.set_layer_matrices(i, &IndexArray::constant(g.clone(), n), d, &sin2);
        }
        pp.multiply();

        for i in 0..indices.len() {
            let mut product = pp.pre(i).clone();
            product.multiply(pp.layer(i));
            product.multiply(pp.post(i));
            for (a, b) in product.s.iter().zip(&pp.global().s) {
                for k in 0..4 {
                    let (row, col) = (k / 2, k % 2);
                    assert_relative_eq!(a[(row, col)].re, b[(row, col)].re, epsilon = 1e-12);
                    assert_relative_eq!(a[(row, col)].im, b[(row, col)].im, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_empty_stack_is_identity() {
        let g = grid(&[500.0]);
        let mut pp = PrePostMatrices::new(g, 0);
        pp.multiply();
        assert_eq!(pp.global().entry(crate::types::Plane::P, 0, 0), Complex64::new(1.0, 0.0));
    }
}
