//! Derivatives of intensities with respect to one stack parameter.
//!
//! The backside variants differentiate the incoherent substrate formulas,
//! either for a parameter of the front coating or, with the `_2` suffix, for
//! a parameter of the back side with the front quantities held fixed.

use crate::amplitude::RAndT;
use crate::spectrum::{admittance_ratios, BacksideSpectra, Spectrum, Substrate};
use crate::types::{IndexArray, Polarization, Sin2};

impl Spectrum {
    /// `dR = 2·Re(conj(r)·dr)`, mixed like [`Spectrum::calculate_reflectance`].
    pub fn calculate_d_reflectance(
        &mut self,
        r_and_t: &RAndT,
        dr_and_dt: &RAndT,
        polarization: Polarization,
    ) {
        self.check_len(r_and_t.len());
        let (w_s, w_p) = polarization.weights();
        for (wvl, v) in self.values.iter_mut().enumerate() {
            let d_s = 2.0 * (r_and_t.r_s[wvl].conj() * dr_and_dt.r_s[wvl]).re;
            let d_p = 2.0 * (r_and_t.r_p[wvl].conj() * dr_and_dt.r_p[wvl]).re;
            *v = w_s * d_s + w_p * d_p;
        }
    }

    pub fn calculate_d_transmittance(
        &mut self,
        r_and_t: &RAndT,
        dr_and_dt: &RAndT,
        n_i: &IndexArray,
        n_e: &IndexArray,
        sin2: &Sin2,
        polarization: Polarization,
    ) {
        self.check_len(r_and_t.len());
        let (w_s, w_p) = polarization.weights();
        for (wvl, v) in self.values.iter_mut().enumerate() {
            let [ratio_s, ratio_p] = admittance_ratios(n_i, n_e, sin2, wvl);
            let d_s = ratio_s * 2.0 * (r_and_t.t_s[wvl].conj() * dr_and_dt.t_s[wvl]).re;
            let d_p = ratio_p * 2.0 * (r_and_t.t_p[wvl].conj() * dr_and_dt.t_p[wvl]).re;
            *v = w_s * d_s + w_p * d_p;
        }
    }

    /// `dA = −dR − dT`.
    pub fn calculate_d_absorptance(
        &mut self,
        d_reflectance: &Spectrum,
        d_transmittance: &Spectrum,
    ) {
        self.check_len(d_reflectance.len());
        for (v, (dr, dt)) in self
            .values
            .iter_mut()
            .zip(d_reflectance.values.iter().zip(&d_transmittance.values))
        {
            *v = -dr - dt;
        }
    }

    /// Derivative of the backside reflectance for a parameter of the front
    /// coating. `derivatives` holds the front quantities' derivatives; its
    /// back-side fields are unused.
    pub fn calculate_d_reflectance_with_backside(
        &mut self,
        sides: BacksideSpectra<'_>,
        derivatives: BacksideSpectra<'_>,
        substrate: Substrate<'_>,
    ) {
        self.check_len(sides.r_front.len());
        for wvl in 0..self.len() {
            let (_, e4) = substrate.attenuation(wvl, self.grid()[wvl]);
            let tf = sides.t_front.values[wvl];
            let rfr = sides.r_front_reverse.values[wvl];
            let tfr = sides.t_front_reverse.values[wvl];
            let rb = sides.r_back.values[wvl];
            let drf = derivatives.r_front.values[wvl];
            let dtf = derivatives.t_front.values[wvl];
            let drfr = derivatives.r_front_reverse.values[wvl];
            let dtfr = derivatives.t_front_reverse.values[wvl];

            let denominator = 1.0 - rfr * rb * e4;
            let numerator = (dtf * tfr + tf * dtfr) * rb * e4 * denominator
                + tf * tfr * rb * e4 * drfr * rb * e4;
            self.values[wvl] = drf + numerator / (denominator * denominator);
        }
    }

    pub fn calculate_d_transmittance_with_backside(
        &mut self,
        sides: BacksideSpectra<'_>,
        derivatives: BacksideSpectra<'_>,
        substrate: Substrate<'_>,
    ) {
        self.check_len(sides.t_front.len());
        for wvl in 0..self.len() {
            let (e2, e4) = substrate.attenuation(wvl, self.grid()[wvl]);
            let tf = sides.t_front.values[wvl];
            let rfr = sides.r_front_reverse.values[wvl];
            let rb = sides.r_back.values[wvl];
            let tb = sides.t_back.values[wvl];
            let dtf = derivatives.t_front.values[wvl];
            let drfr = derivatives.r_front_reverse.values[wvl];

            let denominator = 1.0 - rfr * rb * e4;
            let numerator = dtf * tb * e2 * denominator + tf * tb * e2 * drfr * rb * e4;
            self.values[wvl] = numerator / (denominator * denominator);
        }
    }

    /// Derivative of the backside reflectance for a parameter of the back
    /// side; only `derivatives.r_back` is read.
    pub fn calculate_d_reflectance_with_backside_2(
        &mut self,
        sides: BacksideSpectra<'_>,
        derivatives: BacksideSpectra<'_>,
        substrate: Substrate<'_>,
    ) {
        self.check_len(sides.r_front.len());
        for wvl in 0..self.len() {
            let (_, e4) = substrate.attenuation(wvl, self.grid()[wvl]);
            let tf = sides.t_front.values[wvl];
            let rfr = sides.r_front_reverse.values[wvl];
            let tfr = sides.t_front_reverse.values[wvl];
            let rb = sides.r_back.values[wvl];
            let drb = derivatives.r_back.values[wvl];

            let denominator = 1.0 - rfr * rb * e4;
            self.values[wvl] = tf * tfr * e4 * drb / (denominator * denominator);
        }
    }

    /// Back-side parameter variant for transmittance; reads
    /// `derivatives.r_back` and `derivatives.t_back`.
    pub fn calculate_d_transmittance_with_backside_2(
        &mut self,
        sides: BacksideSpectra<'_>,
        derivatives: BacksideSpectra<'_>,
        substrate: Substrate<'_>,
    ) {
        self.check_len(sides.t_front.len());
        for wvl in 0..self.len() {
            let (e2, e4) = substrate.attenuation(wvl, self.grid()[wvl]);
            let tf = sides.t_front.values[wvl];
            let rfr = sides.r_front_reverse.values[wvl];
            let rb = sides.r_back.values[wvl];
            let tb = sides.t_back.values[wvl];
            let drb = derivatives.r_back.values[wvl];
            let dtb = derivatives.t_back.values[wvl];

            let denominator = 1.0 - rfr * rb * e4;
            let numerator = dtb * denominator + tb * rfr * e4 * drb;
            self.values[wvl] = tf * e2 * numerator / (denominator * denominator);
        }
    }
}
