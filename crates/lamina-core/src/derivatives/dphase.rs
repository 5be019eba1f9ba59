//! Derivatives of phase, group delay and GDD.
//!
//! The GD and GDD derivatives go through the same frequency-derivative
//! routine as GD and GDD themselves, fed with the phase derivative.

use num_complex::Complex64;

use crate::amplitude::RAndT;
use crate::spectrum::Spectrum;
use crate::types::Plane;

impl Spectrum {
    /// Derivative of the phase of `r` (degrees per unit parameter).
    pub fn calculate_dr_phase(&mut self, r_and_t: &RAndT, dr_and_dt: &RAndT, plane: Plane) {
        self.set_d_phase(r_and_t.r(plane), dr_and_dt.r(plane));
    }

    pub fn calculate_dt_phase(&mut self, r_and_t: &RAndT, dr_and_dt: &RAndT, plane: Plane) {
        self.set_d_phase(r_and_t.t(plane), dr_and_dt.t(plane));
    }

    /// `d atan(u) = du / (1 + u²)` with `u = Im/Re`, expanded by the
    /// quotient rule and cleared of the `Re²` factor.
    fn set_d_phase(&mut self, amplitudes: &[Complex64], derivatives: &[Complex64]) {
        self.check_len(amplitudes.len());
        for (v, (a, da)) in self.values.iter_mut().zip(amplitudes.iter().zip(derivatives)) {
            let numerator = da.im * a.re - a.im * da.re;
            *v = (numerator / (a.re * a.re + a.im * a.im)).to_degrees();
        }
    }

    /// Derivative of the group delay from the derivative of the phase.
    pub fn calculate_d_group_delay(&mut self, d_phase: &Spectrum) {
        self.set_group_delay(d_phase, false);
    }

    /// Derivative of the GDD from the derivative of the group delay.
    pub fn calculate_d_gdd(&mut self, d_group_delay: &Spectrum) {
        self.calculate_gdd(d_group_delay);
    }
}
