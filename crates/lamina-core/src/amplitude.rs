//! Amplitude reflection and transmission coefficients.
//!
//! For a stack matrix $\mathbf{M}$ between an incidence medium of effective
//! index $\eta_i$ and an exit medium $\eta_e$:
//!
//! $$
//! r = \frac{\eta_i M_0 - \eta_e M_3 + \eta_e \eta_i M_1 - M_2}
//!          {\eta_i M_0 + \eta_e M_3 + \eta_e \eta_i M_1 + M_2},
//! \qquad t = \frac{2 \eta_i}{\eta_i M_0 + \eta_e M_3 + \eta_e \eta_i M_1 + M_2}
//! $$

use num_complex::Complex64;

use crate::matrices::Matrices;
use crate::types::{effective_indices, Grid, IndexArray, Plane, Sin2};

/// `r` and `t` for s and p at every wavelength.
#[derive(Debug, Clone)]
pub struct RAndT {
    grid: Grid,
    pub(crate) r_s: Vec<Complex64>,
    pub(crate) t_s: Vec<Complex64>,
    pub(crate) r_p: Vec<Complex64>,
    pub(crate) t_p: Vec<Complex64>,
}

impl RAndT {
    pub fn new(grid: Grid) -> Self {
        let zero = vec![Complex64::new(0.0, 0.0); grid.len()];
        Self {
            grid,
            r_s: zero.clone(),
            t_s: zero.clone(),
            r_p: zero.clone(),
            t_p: zero,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.r_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r_s.is_empty()
    }

    pub fn r(&self, plane: Plane) -> &[Complex64] {
        match plane {
            Plane::S => &self.r_s,
            Plane::P => &self.r_p,
        }
    }

    pub fn t(&self, plane: Plane) -> &[Complex64] {
        match plane {
            Plane::S => &self.t_s,
            Plane::P => &self.t_p,
        }
    }

    /// Coefficients for light incident from `n_i` through `m` into `n_e`.
    pub fn calculate_r_and_t(
        &mut self,
        m: &Matrices,
        n_i: &IndexArray,
        n_e: &IndexArray,
        sin2: &Sin2,
    ) {
        self.fill(m, n_i, n_e, sin2, false);
    }

    /// Coefficients for light travelling backwards, from `n_e` into `n_i`.
    ///
    /// The reversed stack matrix is `m` reflected about its anti-diagonal, so
    /// only the two diagonal entries swap.
    pub fn calculate_r_and_t_reverse(
        &mut self,
        m: &Matrices,
        n_i: &IndexArray,
        n_e: &IndexArray,
        sin2: &Sin2,
    ) {
        self.fill(m, n_e, n_i, sin2, true);
    }

    fn fill(
        &mut self,
        m: &Matrices,
        n_in: &IndexArray,
        n_out: &IndexArray,
        sin2: &Sin2,
        reverse: bool,
    ) {
        m.check_grid(self.len());
        let sin2 = sin2.values();
        for wvl in 0..self.len() {
            let (in_s, in_p) = effective_indices(n_in.values()[wvl], sin2[wvl]);
            let (out_s, out_p) = effective_indices(n_out.values()[wvl], sin2[wvl]);
            let (r, t) = amplitudes(&m.s[wvl], in_s, out_s, reverse);
            self.r_s[wvl] = r;
            self.t_s[wvl] = t;
            let (r, t) = amplitudes(&m.p[wvl], in_p, out_p, reverse);
            self.r_p[wvl] = r;
            self.t_p[wvl] = t;
        }
    }
}

/// Entries `[M0, M1, M2, M3]`, with the diagonal swapped for reverse
/// propagation.
pub(crate) fn entries(m: &nalgebra::Matrix2<Complex64>, reverse: bool) -> [Complex64; 4] {
    if reverse {
        [m[(1, 1)], m[(0, 1)], m[(1, 0)], m[(0, 0)]]
    } else {
        [m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]]
    }
}

fn amplitudes(
    m: &nalgebra::Matrix2<Complex64>,
    eta_i: Complex64,
    eta_e: Complex64,
    reverse: bool,
) -> (Complex64, Complex64) {
    let [m0, m1, m2, m3] = entries(m, reverse);
    let denominator = eta_i * m0 + eta_e * m3 + eta_e * eta_i * m1 + m2;
    let r = (eta_i * m0 - eta_e * m3 + eta_e * eta_i * m1 - m2) / denominator;
    let t = 2.0 * eta_i / denominator;
    (r, t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::grid;
    use approx::assert_relative_eq;

    #[test]
    fn test_bare_interface_fresnel() {
        let g = grid(&[600.0]);
        let air = IndexArray::constant(g.clone(), Complex64::new(1.0, 0.0));
        let glass = IndexArray::constant(g.clone(), Complex64::new(1.5, 0.0));
        let m = Matrices::new(g.clone());
        let mut rt = RAndT::new(g.clone());
        rt.calculate_r_and_t(&m, &air, &glass, &Sin2::normal_incidence(g));
        assert_relative_eq!(rt.r(Plane::S)[0].re, -0.2, epsilon = 1e-14);
        assert_relative_eq!(rt.t(Plane::S)[0].re, 0.8, epsilon = 1e-14);
    }

    #[test]
    fn test_reverse_of_bare_interface_flips_r() {
        let g = grid(&[600.0]);
        let air = IndexArray::constant(g.clone(), Complex64::new(1.0, 0.0));
        let glass = IndexArray::constant(g.clone(), Complex64::new(1.5, 0.0));
        let m = Matrices::new(g.clone());
        let mut rt = RAndT::new(g.clone());
        rt.calculate_r_and_t_reverse(&m, &air, &glass, &Sin2::normal_incidence(g));
        assert_relative_eq!(rt.r(Plane::P)[0].re, 0.2, epsilon = 1e-14);
        assert_relative_eq!(rt.t(Plane::P)[0].re, 1.2, epsilon = 1e-14);
    }

    /// Product of the layer matrices, front layer first.
    fn product(layers: &[(Complex64, f64)], g: &Grid, sin2: &Sin2) -> Matrices {
        let mut global = Matrices::new(g.clone());
        let mut layer = Matrices::new(g.clone());
        for &(n, thickness) in layers {
            layer.set_matrices(&IndexArray::constant(g.clone(), n), thickness, sin2);
            global.multiply(&layer);
        }
        global
    }

    #[test]
    fn test_reverse_matches_literally_reversed_absorbing_stack() {
        let g = grid(&[480.0, 550.0, 690.0]);
        let medium = IndexArray::constant(g.clone(), Complex64::new(1.0, 0.0));
        let substrate = IndexArray::constant(g.clone(), Complex64::new(1.52, -0.01));
        let sin2 = Sin2::new(&medium, 40.0);
        let layers = [
            (Complex64::new(2.3, -0.05), 73.0),
            (Complex64::new(1.46, 0.0), 118.0),
            (Complex64::new(3.1, -0.8), 12.0),
        ];
        let reversed: Vec<_> = layers.iter().rev().copied().collect();

        let mut backwards = RAndT::new(g.clone());
        let forward_product = product(&layers, &g, &sin2);
        backwards.calculate_r_and_t_reverse(&forward_product, &medium, &substrate, &sin2);
        let mut literal = RAndT::new(g.clone());
        literal.calculate_r_and_t(&product(&reversed, &g, &sin2), &substrate, &medium, &sin2);

        for plane in [Plane::S, Plane::P] {
            let pairs = [
                (backwards.r(plane), literal.r(plane)),
                (backwards.t(plane), literal.t(plane)),
            ];
            for (computed, expected) in pairs {
                for (a, b) in computed.iter().zip(expected) {
                    assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
                    assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
                }
            }
        }
    }
}
