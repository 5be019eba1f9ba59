//! Derivatives of characteristic matrices.
//!
//! `dMi` is the derivative of one layer matrix with respect to a scalar
//! parameter of that layer; the derivative of the whole stack follows from
//! the chain rule for a product with one varying factor,
//! `dM = pre[i] · dMi · post[i]`.

use nalgebra::Matrix2;
use num_complex::Complex64;

use super::pre_post::PrePostMatrices;
use crate::matrices::{Matrices, I};
use crate::types::{wavenumber, IndexArray, Sin2};

impl Matrices {
    /// Derivative of a layer matrix with respect to its thickness.
    pub fn set_dmi_thickness(&mut self, n: &IndexArray, thickness: f64, sin2: &Sin2) {
        self.check_grid(n.len());
        for (wvl, (&n, &sin2)) in n.values().iter().zip(sin2.values()).enumerate() {
            let (n_s, n_p) = crate::types::effective_indices(n, sin2);
            let k = wavenumber(self.grid()[wvl]);
            let phi = k * thickness * n_s;
            let d_phi = k * n_s;
            let (sin, cos) = (phi.sin(), phi.cos());
            self.s[wvl] = thickness_derivative(sin, cos, d_phi, n_s);
            self.p[wvl] = thickness_derivative(sin, cos, d_phi, n_p);
        }
    }

    /// Derivative of a layer matrix with respect to the index parameter of
    /// its material; `dn` is the dispersion model's `dN/dp`.
    pub fn set_dmi_index(&mut self, n: &IndexArray, dn: &IndexArray, thickness: f64, sin2: &Sin2) {
        self.set_dmi_index_and_thickness(n, dn, thickness, 0.0, sin2);
    }

    /// Index derivative when the thickness follows the index so that the
    /// optical thickness at a reference wavelength stays constant.
    ///
    /// `n_ref` and `dn_ref` are the index and its derivative at that
    /// reference wavelength.
    pub fn set_dmi_index_with_constant_ot(
        &mut self,
        n: &IndexArray,
        dn: &IndexArray,
        thickness: f64,
        sin2: &Sin2,
        n_ref: Complex64,
        dn_ref: Complex64,
    ) {
        let d_thickness = -thickness * dn_ref.re / n_ref.re;
        self.set_dmi_index_and_thickness(n, dn, thickness, d_thickness, sin2);
    }

    fn set_dmi_index_and_thickness(
        &mut self,
        n: &IndexArray,
        dn: &IndexArray,
        thickness: f64,
        d_thickness: f64,
        sin2: &Sin2,
    ) {
        self.check_grid(n.len());
        self.check_grid(dn.len());
        for wvl in 0..self.len() {
            let n = n.values()[wvl];
            let dn = dn.values()[wvl];
            let n2 = n * n;

            let mut n_s = (n2 - sin2.values()[wvl]).sqrt();
            let mut n_p = n2 / n_s;
            let mut dn_s = n * dn / n_s;
            let mut dn_p = 2.0 * n * dn / n_s - n2 * dn_s / (n_s * n_s);
            if n_s.re == 0.0 {
                n_s = -n_s;
                n_p = -n_p;
                dn_s = -dn_s;
                dn_p = -dn_p;
            }

            let k = wavenumber(self.grid()[wvl]);
            let phi = k * thickness * n_s;
            let d_phi = k * (thickness * dn_s + d_thickness * n_s);
            let (sin, cos) = (phi.sin(), phi.cos());
            self.s[wvl] = index_derivative(sin, cos, d_phi, n_s, dn_s);
            self.p[wvl] = index_derivative(sin, cos, d_phi, n_p, dn_p);
        }
    }

    /// `self = pre[layer] · dmi · post[layer]`.
    pub fn calculate_dm(&mut self, dmi: &Matrices, pre_post: &PrePostMatrices, layer: usize) {
        self.check_grid(dmi.len());
        let pre = pre_post.pre(layer);
        let post = pre_post.post(layer);
        for wvl in 0..self.len() {
            self.s[wvl] = pre.s[wvl] * dmi.s[wvl] * post.s[wvl];
            self.p[wvl] = pre.p[wvl] * dmi.p[wvl] * post.p[wvl];
        }
    }
}

fn thickness_derivative(
    sin: Complex64,
    cos: Complex64,
    d_phi: Complex64,
    n: Complex64,
) -> Matrix2<Complex64> {
    Matrix2::new(
        -sin * d_phi,
        I * cos * d_phi / n,
        I * n * cos * d_phi,
        -sin * d_phi,
    )
}

fn index_derivative(
    sin: Complex64,
    cos: Complex64,
    d_phi: Complex64,
    n: Complex64,
    dn: Complex64,
) -> Matrix2<Complex64> {
    Matrix2::new(
        -sin * d_phi,
        I * (cos * d_phi / n - sin * dn / (n * n)),
        I * (dn * sin + n * cos * d_phi),
        -sin * d_phi,
    )
}
