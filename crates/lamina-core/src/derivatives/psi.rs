//! Sensitivity of `r` and `t` to the entries of the global matrix.
//!
//! With `n` and `d` the numerator and denominator of `r`,
//!
//! ```text
//! dr = Σ ψr[k]·dM[k],   ψr = [ηi(d−n), ηiηe(d−n), −(d+n), −ηe(d+n)] / d²
//! dt = Σ ψt[k]·dM[k],   ψt = −2ηi [ηi, ηiηe, 1, ηe] / d²
//! ```
//!
//! The coefficients depend only on the whole stack, so they are computed once
//! and combined with the `dM` of every parameter.

use num_complex::Complex64;

use crate::amplitude::{entries, RAndT};
use crate::matrices::Matrices;
use crate::types::{effective_indices, Grid, IndexArray, Sin2};

type Coefficients = [Complex64; 4];

/// ψ coefficients for s and p at every wavelength.
#[derive(Debug, Clone)]
pub struct PsiMatrices {
    psi_r_s: Vec<Coefficients>,
    psi_t_s: Vec<Coefficients>,
    psi_r_p: Vec<Coefficients>,
    psi_t_p: Vec<Coefficients>,
}

impl PsiMatrices {
    pub fn new(grid: Grid) -> Self {
        let zero = vec![[Complex64::new(0.0, 0.0); 4]; grid.len()];
        Self {
            psi_r_s: zero.clone(),
            psi_t_s: zero.clone(),
            psi_r_p: zero.clone(),
            psi_t_p: zero,
        }
    }

    pub fn len(&self) -> usize {
        self.psi_r_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.psi_r_s.is_empty()
    }

    /// Coefficients for light incident from `n_i`.
    pub fn calculate_psi_matrices(
        &mut self,
        m: &Matrices,
        n_i: &IndexArray,
        n_e: &IndexArray,
        sin2: &Sin2,
    ) {
        self.fill(m, n_i, n_e, sin2, false);
    }

    /// Coefficients for light incident from `n_e`, expressed against the
    /// diagonal-swapped (reversed) matrix.
    pub fn calculate_psi_matrices_reverse(
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
        for wvl in 0..self.len() {
            let sin2 = sin2.values()[wvl];
            let (in_s, in_p) = effective_indices(n_in.values()[wvl], sin2);
            let (out_s, out_p) = effective_indices(n_out.values()[wvl], sin2);
            let (r, t) = coefficients(entries(&m.s[wvl], reverse), in_s, out_s);
            self.psi_r_s[wvl] = r;
            self.psi_t_s[wvl] = t;
            let (r, t) = coefficients(entries(&m.p[wvl], reverse), in_p, out_p);
            self.psi_r_p[wvl] = r;
            self.psi_t_p[wvl] = t;
        }
    }
}

fn coefficients(
    m: [Complex64; 4],
    eta_i: Complex64,
    eta_e: Complex64,
) -> (Coefficients, Coefficients) {
    let [m0, m1, m2, m3] = m;
    let numerator = eta_i * m0 - eta_e * m3 + eta_e * eta_i * m1 - m2;
    let denominator = eta_i * m0 + eta_e * m3 + eta_e * eta_i * m1 + m2;
    let d2 = denominator * denominator;

    let plus = (denominator - numerator) / d2;
    let minus = (-denominator - numerator) / d2;
    let psi_r = [eta_i * plus, eta_i * eta_e * plus, minus, eta_e * minus];

    let factor = -2.0 * eta_i / d2;
    let psi_t = [factor * eta_i, factor * eta_i * eta_e, factor, factor * eta_e];
    (psi_r, psi_t)
}

fn contract(psi: &Coefficients, dm: [Complex64; 4]) -> Complex64 {
    psi.iter().zip(dm).map(|(p, d)| p * d).sum()
}

impl RAndT {
    /// `dr` and `dt` from the stack matrix derivative `dm`.
    pub fn calculate_dr_and_dt(&mut self, dm: &Matrices, psi: &PsiMatrices) {
        self.fill_derivatives(dm, psi, false);
    }

    /// Reverse-direction `dr` and `dt`; `psi` must come from
    /// [`PsiMatrices::calculate_psi_matrices_reverse`].
    pub fn calculate_dr_and_dt_reverse(&mut self, dm: &Matrices, psi: &PsiMatrices) {
        self.fill_derivatives(dm, psi, true);
    }

    fn fill_derivatives(&mut self, dm: &Matrices, psi: &PsiMatrices, reverse: bool) {
        dm.check_grid(self.len());
        for wvl in 0..self.len() {
            let d_s = entries(&dm.s[wvl], reverse);
            let d_p = entries(&dm.p[wvl], reverse);
            self.r_s[wvl] = contract(&psi.psi_r_s[wvl], d_s);
            self.t_s[wvl] = contract(&psi.psi_t_s[wvl], d_s);
            self.r_p[wvl] = contract(&psi.psi_r_p[wvl], d_p);
            self.t_p[wvl] = contract(&psi.psi_t_p[wvl], d_p);
        }
    }
}
