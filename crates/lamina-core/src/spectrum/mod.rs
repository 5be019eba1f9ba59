//! Real and complex spectra derived from amplitudes and matrices.
//!
//! Intensities follow
//!
//! $$ R = |r|^2, \qquad T = \frac{\mathrm{Re}(\eta_e)}{\mathrm{Re}(\eta_i)} |t|^2,
//! \qquad A = 1 - R - T $$
//!
//! mixed over s and p with [`Polarization::weights`]. A thick substrate is
//! handled incoherently: the front coating and the back interface are
//! combined as a geometric series of intensities.

mod diagrams;
mod phase;

pub use phase::{angular_frequency, SPEED_OF_LIGHT};

use num_complex::Complex64;

use crate::amplitude::RAndT;
use crate::types::{effective_indices, wavenumber, Grid, IndexArray, Polarization, Sin2};

/// One real value per wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    grid: Grid,
    pub(crate) values: Vec<f64>,
}

/// One complex value per wavelength.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexSpectrum {
    grid: Grid,
    pub(crate) values: Vec<Complex64>,
}

/// Front and back intensities of one pure polarization, as seen from inside
/// the substrate.
#[derive(Debug, Clone, Copy)]
pub struct BacksideSpectra<'a> {
    pub r_front: &'a Spectrum,
    pub t_front: &'a Spectrum,
    pub r_front_reverse: &'a Spectrum,
    pub t_front_reverse: &'a Spectrum,
    pub r_back: &'a Spectrum,
    pub t_back: &'a Spectrum,
}

/// Substrate traversed between the front coating and the back interface.
#[derive(Debug, Clone, Copy)]
pub struct Substrate<'a> {
    pub n: &'a IndexArray,
    pub thickness: f64,
    pub sin2: &'a Sin2,
}

impl Substrate<'_> {
    /// `(exp(2·Im β), exp(4·Im β))` with `β = (2π/λ)·d·N_s`.
    pub(crate) fn attenuation(&self, wvl: usize, wavelength_nm: f64) -> (f64, f64) {
        let (n_s, _) = effective_indices(self.n.values()[wvl], self.sin2.values()[wvl]);
        let beta = wavenumber(wavelength_nm) * self.thickness * n_s;
        ((2.0 * beta.im).exp(), (4.0 * beta.im).exp())
    }
}

impl Spectrum {
    pub fn new(grid: Grid) -> Self {
        let values = vec![0.0; grid.len()];
        Self { grid, values }
    }

    pub fn from_values(grid: Grid, values: Vec<f64>) -> Self {
        assert_eq!(grid.len(), values.len(), "spectrum length must match its grid");
        Self { grid, values }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn check_len(&self, len: usize) {
        assert_eq!(self.len(), len, "spectra must share the same wavelength grid");
    }

    /// Weighted sum of an s and a p spectrum.
    pub fn combine(&mut self, s: &Spectrum, p: &Spectrum, polarization: Polarization) {
        self.check_len(s.len());
        self.check_len(p.len());
        let (w_s, w_p) = polarization.weights();
        for (v, (s, p)) in self.values.iter_mut().zip(s.values.iter().zip(&p.values)) {
            *v = w_s * s + w_p * p;
        }
    }

    pub fn calculate_reflectance(&mut self, r_and_t: &RAndT, polarization: Polarization) {
        self.check_len(r_and_t.len());
        let (w_s, w_p) = polarization.weights();
        for (wvl, v) in self.values.iter_mut().enumerate() {
            *v = w_s * r_and_t.r_s[wvl].norm_sqr() + w_p * r_and_t.r_p[wvl].norm_sqr();
        }
    }

    pub fn calculate_transmittance(
        &mut self,
        r_and_t: &RAndT,
        n_i: &IndexArray,
        n_e: &IndexArray,
        sin2: &Sin2,
        polarization: Polarization,
    ) {
        self.check_len(r_and_t.len());
        let (w_s, w_p) = polarization.weights();
        for (wvl, v) in self.values.iter_mut().enumerate() {
            let [ratio_s, ratio_p] = admittance_ratios(n_i, n_e, sin2, wvl);
            *v = w_s * ratio_s * r_and_t.t_s[wvl].norm_sqr()
                + w_p * ratio_p * r_and_t.t_p[wvl].norm_sqr();
        }
    }

    pub fn calculate_absorptance(&mut self, reflectance: &Spectrum, transmittance: &Spectrum) {
        self.check_len(reflectance.len());
        self.check_len(transmittance.len());
        let sides = reflectance.values.iter().zip(&transmittance.values);
        for (v, (r, t)) in self.values.iter_mut().zip(sides) {
            *v = 1.0 - r - t;
        }
    }

    /// Reflectance of a coated substrate whose back side reflects
    /// incoherently.
    pub fn calculate_reflectance_with_backside(
        &mut self,
        sides: BacksideSpectra<'_>,
        substrate: Substrate<'_>,
    ) {
        self.check_len(sides.r_front.len());
        for wvl in 0..self.len() {
            let (_, e4) = substrate.attenuation(wvl, self.grid[wvl]);
            let rf = sides.r_front.values[wvl];
            let tf = sides.t_front.values[wvl];
            let rfr = sides.r_front_reverse.values[wvl];
            let tfr = sides.t_front_reverse.values[wvl];
            let rb = sides.r_back.values[wvl];
            self.values[wvl] = rf + tf * tfr * rb * e4 / (1.0 - rfr * rb * e4);
        }
    }

    pub fn calculate_transmittance_with_backside(
        &mut self,
        sides: BacksideSpectra<'_>,
        substrate: Substrate<'_>,
    ) {
        self.check_len(sides.t_front.len());
        for wvl in 0..self.len() {
            let (e2, e4) = substrate.attenuation(wvl, self.grid[wvl]);
            let tf = sides.t_front.values[wvl];
            let rfr = sides.r_front_reverse.values[wvl];
            let rb = sides.r_back.values[wvl];
            let tb = sides.t_back.values[wvl];
            self.values[wvl] = tf * tb * e2 / (1.0 - rfr * rb * e4);
        }
    }
}

/// `Re(η_e)/Re(η_i)` for s and p.
pub(crate) fn admittance_ratios(
    n_i: &IndexArray,
    n_e: &IndexArray,
    sin2: &Sin2,
    wvl: usize,
) -> [f64; 2] {
    let sin2 = sin2.values()[wvl];
    let (in_s, in_p) = effective_indices(n_i.values()[wvl], sin2);
    let (out_s, out_p) = effective_indices(n_e.values()[wvl], sin2);
    [out_s.re / in_s.re, out_p.re / in_p.re]
}

impl ComplexSpectrum {
    pub fn new(grid: Grid) -> Self {
        let values = vec![Complex64::new(0.0, 0.0); grid.len()];
        Self { grid, values }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn values(&self) -> &[Complex64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
