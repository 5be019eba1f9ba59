//! Phase, group delay and group delay dispersion.
//!
//! Phases are in degrees. With $\omega = 2\pi c/\lambda$,
//! $\mathrm{GD} = -\partial\varphi/\partial\omega$ (fs) and
//! $\mathrm{GDD} = \partial\,\mathrm{GD}/\partial\omega$ (fs²). Frequency
//! derivatives are taken on the wavelength grid by finite differences,
//! central inside and one-sided at the ends.

use std::f64::consts::PI;

use num_complex::Complex64;

use super::Spectrum;
use crate::amplitude::RAndT;
use crate::types::Plane;

/// Speed of light (nm/fs).
pub const SPEED_OF_LIGHT: f64 = 299.792458;

/// Angular frequency (rad/fs) of a wavelength in nm.
pub fn angular_frequency(wavelength_nm: f64) -> f64 {
    2.0 * PI * SPEED_OF_LIGHT / wavelength_nm
}

impl Spectrum {
    /// Phase of `r` in `plane` (degrees, in (−180, 180]).
    pub fn calculate_r_phase(&mut self, r_and_t: &RAndT, plane: Plane) {
        self.set_phase(r_and_t.r(plane));
    }

    /// Phase of `t` in `plane` (degrees).
    pub fn calculate_t_phase(&mut self, r_and_t: &RAndT, plane: Plane) {
        self.set_phase(r_and_t.t(plane));
    }

    fn set_phase(&mut self, amplitudes: &[Complex64]) {
        self.check_len(amplitudes.len());
        for (v, a) in self.values.iter_mut().zip(amplitudes) {
            *v = a.im.atan2(a.re).to_degrees();
        }
    }

    /// Group delay from a phase spectrum. The phase is unwrapped first.
    pub fn calculate_group_delay(&mut self, phase: &Spectrum) {
        self.set_group_delay(phase, true);
    }

    /// Group delay dispersion from a group delay spectrum.
    pub fn calculate_gdd(&mut self, group_delay: &Spectrum) {
        self.check_len(group_delay.len());
        self.values = frequency_derivative(&self.grid, &group_delay.values);
    }

    /// `−dφ/dω` of a phase-like spectrum in degrees. Shared with the
    /// group delay derivative, which skips unwrapping.
    pub(crate) fn set_group_delay(&mut self, phase: &Spectrum, unwrap: bool) {
        self.check_len(phase.len());
        let degrees = if unwrap {
            unwrap_degrees(&phase.values)
        } else {
            phase.values.clone()
        };
        let radians: Vec<f64> = degrees.iter().map(|d| d.to_radians()).collect();
        self.values = frequency_derivative(&self.grid, &radians)
            .into_iter()
            .map(|d| -d)
            .collect();
    }
}

/// Remove 360° jumps between consecutive samples.
fn unwrap_degrees(values: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(values.len());
    let mut offset = 0.0;
    let mut previous: Option<f64> = None;
    for &v in values {
        if let Some(prev) = previous {
            let jump = v - prev;
            offset -= 360.0 * (jump / 360.0).round();
        }
        previous = Some(v);
        unwrapped.push(v + offset);
    }
    unwrapped
}

/// `d values / dω` on the wavelength grid. A single-point grid has no
/// derivative and yields NaN.
fn frequency_derivative(grid: &[f64], values: &[f64]) -> Vec<f64> {
    let n = grid.len();
    if n < 2 {
        return vec![f64::NAN; n];
    }
    let omega: Vec<f64> = grid.iter().map(|&wvl| angular_frequency(wvl)).collect();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(1);
            let hi = (i + 1).min(n - 1);
            (values[hi] - values[lo]) / (omega[hi] - omega[lo])
        })
        .collect()
}
