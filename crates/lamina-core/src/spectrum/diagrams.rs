//! Quantities behind admittance, circle and electric-field diagrams.
//!
//! All of them derive from the field vector
//! $(B, C)^T = \mathbf{M} (1, \eta_{sub})^T$ of the partial stack lying
//! between a depth and the substrate.

use num_complex::Complex64;

use super::{ComplexSpectrum, Spectrum};
use crate::amplitude::RAndT;
use crate::matrices::Matrices;
use crate::types::{effective_index, IndexArray, Plane, Sin2};

fn field_vector(
    m: &Matrices,
    n_sub: &IndexArray,
    sin2: &Sin2,
    plane: Plane,
    wvl: usize,
) -> (Complex64, Complex64) {
    let eta = effective_index(n_sub.values()[wvl], sin2.values()[wvl], plane);
    let mat = &m.plane(plane)[wvl];
    let b = mat[(0, 0)] + mat[(0, 1)] * eta;
    let c = mat[(1, 0)] + mat[(1, 1)] * eta;
    (b, c)
}

impl ComplexSpectrum {
    /// Optical admittance `Y = C/B` looking into the partial stack `m`.
    pub fn calculate_admittance(
        &mut self,
        m: &Matrices,
        n_sub: &IndexArray,
        sin2: &Sin2,
        plane: Plane,
    ) {
        m.check_grid(self.len());
        for wvl in 0..self.len() {
            let (b, c) = field_vector(m, n_sub, sin2, plane, wvl);
            self.values[wvl] = c / b;
        }
    }

    /// Reflection amplitude of a partial stack, as traced in a circle
    /// diagram.
    pub fn calculate_circle(&mut self, r_and_t: &RAndT, plane: Plane) {
        assert_eq!(self.len(), r_and_t.len(), "spectra must share the same wavelength grid");
        self.values.copy_from_slice(r_and_t.r(plane));
    }
}

impl Spectrum {
    /// Tangential electric-field intensity at the front of `m_partial`,
    /// normalised to the incident field of the complete stack `m_total`.
    pub fn calculate_electric_field(
        &mut self,
        m_partial: &Matrices,
        m_total: &Matrices,
        n_i: &IndexArray,
        n_sub: &IndexArray,
        sin2: &Sin2,
        plane: Plane,
    ) {
        m_partial.check_grid(self.len());
        m_total.check_grid(self.len());
        for wvl in 0..self.len() {
            let eta_i = effective_index(n_i.values()[wvl], sin2.values()[wvl], plane);
            let (b_front, c_front) = field_vector(m_total, n_sub, sin2, plane, wvl);
            let (b, _) = field_vector(m_partial, n_sub, sin2, plane, wvl);
            let incident = (eta_i * b_front + c_front) / (2.0 * eta_i);
            self.values[wvl] = (b / incident).norm_sqr();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::grid;
    use approx::assert_relative_eq;

    #[test]
    fn test_bare_substrate_admittance_is_its_index() {
        let g = grid(&[550.0]);
        let sin2 = Sin2::normal_incidence(g.clone());
        let sub = IndexArray::constant(g.clone(), Complex64::new(1.52, 0.0));
        let mut y = ComplexSpectrum::new(g.clone());
        y.calculate_admittance(&Matrices::new(g), &sub, &sin2, Plane::S);
        assert_relative_eq!(y.values()[0].re, 1.52, epsilon = 1e-14);
    }

    #[test]
    fn test_field_at_bare_interface_is_transmitted_amplitude() {
        let g = grid(&[550.0]);
        let sin2 = Sin2::normal_incidence(g.clone());
        let air = IndexArray::constant(g.clone(), Complex64::new(1.0, 0.0));
        let sub = IndexArray::constant(g.clone(), Complex64::new(1.5, 0.0));
        let identity = Matrices::new(g.clone());
        let mut e = Spectrum::new(g);
        e.calculate_electric_field(&identity, &identity, &air, &sub, &sin2, Plane::P);
        // |t|² = (2/2.5)².
        assert_relative_eq!(e.values()[0], 0.64, epsilon = 1e-14);
    }
}
