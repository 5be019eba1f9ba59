//! Core types shared across the Lamina engine.
//!
//! Every per-wavelength container is built on a [`Grid`], an immutable
//! wavelength sequence shared by reference. Containers built on the same grid
//! are indexed in lockstep.

use std::f64::consts::PI;
use std::sync::Arc;

use lamina_materials::{DispersionModel, MaterialError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wavelength grid (nm), shared by every array of a calculation.
pub type Grid = Arc<[f64]>;

/// Build a grid from any wavelength list.
pub fn grid(wavelengths_nm: &[f64]) -> Grid {
    Arc::from(wavelengths_nm)
}

/// Errors raised by optical calculations.
#[derive(Debug, Error)]
pub enum OpticsError {
    #[error("Wavelength grid is empty")]
    EmptyGrid,

    #[error("Array has {actual} values but the wavelength grid has {expected}")]
    GridMismatch { expected: usize, actual: usize },

    #[error("Material '{material}': {source}")]
    Material {
        material: String,
        #[source]
        source: MaterialError,
    },

    #[error("Invalid stack: {0}")]
    InvalidStack(String),

    #[error("{0} is only defined for s or p polarization")]
    PlaneRequired(String),
}

/// Polarization of the incident light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarization {
    /// Electric field perpendicular to the plane of incidence.
    S,
    /// Electric field parallel to the plane of incidence.
    P,
    /// Equal mix of s and p.
    Unpolarized,
    /// Linear polarization at angle Ψ (degrees) from the plane of
    /// incidence: s weight sin²Ψ, p weight cos²Ψ.
    Other(f64),
}

impl Polarization {
    /// Weights `(w_s, w_p)` applied to s and p intensities.
    pub fn weights(self) -> (f64, f64) {
        match self {
            Polarization::S => (1.0, 0.0),
            Polarization::P => (0.0, 1.0),
            Polarization::Unpolarized => (0.5, 0.5),
            Polarization::Other(psi_deg) => {
                let (sin, cos) = (psi_deg * PI / 180.0).sin_cos();
                (sin * sin, cos * cos)
            }
        }
    }

    /// The single plane this polarization lies in, if it is pure.
    pub fn plane(self) -> Option<Plane> {
        match self {
            Polarization::S => Some(Plane::S),
            Polarization::P => Some(Plane::P),
            Polarization::Unpolarized | Polarization::Other(_) => None,
        }
    }
}

/// A pure polarization plane. Phase quantities only exist per plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    S,
    P,
}

impl Plane {
    pub const BOTH: [Plane; 2] = [Plane::S, Plane::P];
}

impl From<Plane> for Polarization {
    fn from(plane: Plane) -> Self {
        match plane {
            Plane::S => Polarization::S,
            Plane::P => Polarization::P,
        }
    }
}

/// Complex refractive index `n − ik` at every wavelength of a grid.
#[derive(Debug, Clone)]
pub struct IndexArray {
    grid: Grid,
    values: Vec<Complex64>,
}

impl IndexArray {
    pub fn new(grid: Grid, values: Vec<Complex64>) -> Result<Self, OpticsError> {
        if values.len() != grid.len() {
            return Err(OpticsError::GridMismatch {
                expected: grid.len(),
                actual: values.len(),
            });
        }
        Ok(Self { grid, values })
    }

    /// The same index at every wavelength.
    pub fn constant(grid: Grid, n: Complex64) -> Self {
        let values = vec![n; grid.len()];
        Self { grid, values }
    }

    /// Sample a dispersion model on the grid.
    pub fn from_material(material: &dyn DispersionModel, grid: Grid) -> Result<Self, OpticsError> {
        let values = grid
            .iter()
            .map(|&wvl| material.refractive_index(wvl))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| material_error(material, source))?;
        Ok(Self { grid, values })
    }

    /// Sample the derivative of a dispersion model with respect to its
    /// refinable parameter.
    pub fn derivative_from_material(
        material: &dyn DispersionModel,
        grid: Grid,
    ) -> Result<Self, OpticsError> {
        let values = grid
            .iter()
            .map(|&wvl| material.index_derivative(wvl))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| material_error(material, source))?;
        Ok(Self { grid, values })
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

pub(crate) fn material_error(material: &dyn DispersionModel, source: MaterialError) -> OpticsError {
    OpticsError::Material {
        material: material.name().to_string(),
        source,
    }
}

/// Snell invariant `(N_medium · sin θ)²` at every wavelength.
///
/// The effective index of any medium is `sqrt(N² − sin2)`, so the invariant
/// is zero at normal incidence.
#[derive(Debug, Clone)]
pub struct Sin2 {
    grid: Grid,
    values: Vec<Complex64>,
}

impl Sin2 {
    /// Invariant for light arriving from `medium` at `angle_deg`.
    pub fn new(medium: &IndexArray, angle_deg: f64) -> Self {
        let sin = (angle_deg * PI / 180.0).sin();
        let values = medium.values().iter().map(|&n| (n * sin).powi(2)).collect();
        Self {
            grid: medium.grid().clone(),
            values,
        }
    }

    pub fn normal_incidence(grid: Grid) -> Self {
        let values = vec![Complex64::new(0.0, 0.0); grid.len()];
        Self { grid, values }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn values(&self) -> &[Complex64] {
        &self.values
    }
}

/// Effective indices `(N_s, N_p)` of a medium of index `n`.
///
/// When the real part of `N_s` is exactly zero both are negated, which picks
/// the square-root branch with non-negative absorption.
#[inline]
pub fn effective_indices(n: Complex64, sin2: Complex64) -> (Complex64, Complex64) {
    let n2 = n * n;
    let mut n_s = (n2 - sin2).sqrt();
    let mut n_p = n2 / n_s;
    if n_s.re == 0.0 {
        n_s = -n_s;
        n_p = -n_p;
    }
    (n_s, n_p)
}

/// Effective index of `n` in `plane`.
#[inline]
pub fn effective_index(n: Complex64, sin2: Complex64, plane: Plane) -> Complex64 {
    let (n_s, n_p) = effective_indices(n, sin2);
    match plane {
        Plane::S => n_s,
        Plane::P => n_p,
    }
}

/// Free-space wavenumber `2π/λ` (nm⁻¹).
#[inline]
pub fn wavenumber(wavelength_nm: f64) -> f64 {
    2.0 * PI / wavelength_nm
}

/// Optical response of a stack at one wavelength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralSample {
    /// Wavelength (nm).
    pub wavelength_nm: f64,
    pub reflectance: f64,
    pub transmittance: f64,
    pub absorptance: f64,
    /// Reflection phase for s and p (degrees).
    pub r_phase_s: f64,
    pub r_phase_p: f64,
    /// Reflection group delay for s and p (fs).
    pub gd_s: f64,
    pub gd_p: f64,
    /// Reflection group delay dispersion for s and p (fs²).
    pub gdd_s: f64,
    pub gdd_p: f64,
}

/// One sample of a depth profile through a stack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramPoint {
    /// Physical depth from the front of the stack (nm).
    pub depth_nm: f64,
    /// Layer containing the sample; `None` at the substrate interface.
    pub layer: Option<usize>,
    pub admittance_re: f64,
    pub admittance_im: f64,
    /// Reflection amplitude of the partial stack behind this depth.
    pub circle_re: f64,
    pub circle_im: f64,
    /// Tangential field intensity normalised to the incident field.
    pub field_intensity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_polarization_weights() {
        assert_eq!(Polarization::S.weights(), (1.0, 0.0));
        assert_eq!(Polarization::P.weights(), (0.0, 1.0));
        let (ws, wp) = Polarization::Other(90.0).weights();
        assert_relative_eq!(ws, 1.0, epsilon = 1e-15);
        assert_relative_eq!(wp, 0.0, epsilon = 1e-15);
        let (ws, wp) = Polarization::Other(45.0).weights();
        assert_relative_eq!(ws, 0.5, epsilon = 1e-15);
        assert_relative_eq!(wp, 0.5, epsilon = 1e-15);
        assert_eq!(Polarization::Unpolarized.plane(), None);
    }

    #[test]
    fn test_effective_indices_normal_incidence() {
        let n = Complex64::new(2.0, -0.1);
        let (n_s, n_p) = effective_indices(n, Complex64::new(0.0, 0.0));
        assert_relative_eq!(n_s.re, n.re, epsilon = 1e-14);
        assert_relative_eq!(n_s.im, n.im, epsilon = 1e-14);
        assert_relative_eq!(n_p.re, n.re, epsilon = 1e-14);
    }

    #[test]
    fn test_branch_correction_beyond_critical_angle() {
        // Total internal reflection: N² − sin2 is a negative real number.
        let (n_s, n_p) = effective_indices(Complex64::new(1.0, 0.0), Complex64::new(2.25, 0.0));
        assert_eq!(n_s.re, 0.0);
        assert!(n_s.im < 0.0, "evanescent branch must decay, got {n_s}");
        assert!(n_p.im > 0.0);
    }

    #[test]
    fn test_sin2_matches_snell() {
        let g = grid(&[500.0, 600.0]);
        let medium = IndexArray::constant(g, Complex64::new(1.5, 0.0));
        let sin2 = Sin2::new(&medium, 30.0);
        assert_relative_eq!(sin2.values()[0].re, (1.5 * 0.5_f64).powi(2), epsilon = 1e-12);
    }

    #[test]
    fn test_index_array_rejects_wrong_length() {
        let g = grid(&[500.0, 600.0]);
        let err = IndexArray::new(g, vec![Complex64::new(1.0, 0.0)]);
        assert!(matches!(err, Err(OpticsError::GridMismatch { expected: 2, actual: 1 })));
    }
}
