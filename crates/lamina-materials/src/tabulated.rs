//! Tabulated optical constants.
//!
//! Measured $(n, k)$ tables are interpolated with natural cubic splines. The
//! refinable parameter is a real offset added to $n$ at every wavelength, so
//! refining the index of a tabulated material shifts the whole curve.

use std::sync::Arc;

use num_complex::Complex64;

use crate::provider::{DispersionModel, MaterialError};
use crate::spline::CubicSpline;

/// Spline-interpolated `(n, k)` table.
#[derive(Debug, Clone)]
pub struct TabulatedIndex {
    name: String,
    spline_n: CubicSpline,
    spline_k: CubicSpline,
    offset: f64,
}

impl TabulatedIndex {
    /// Construct from tabulated data.
    ///
    /// # Arguments
    /// * `wavelengths_nm` - Strictly increasing wavelengths (nm).
    /// * `n` - Real index at each wavelength.
    /// * `k` - Extinction coefficient at each wavelength (k ≥ 0).
    pub fn new(
        name: impl Into<String>,
        wavelengths_nm: Vec<f64>,
        n: Vec<f64>,
        k: Vec<f64>,
    ) -> Result<Self, MaterialError> {
        if let Some(bad) = k.iter().find(|&&k| k < 0.0) {
            return Err(MaterialError::InvalidData(format!(
                "extinction coefficient must be non-negative, got {bad}"
            )));
        }
        let spline_n = CubicSpline::new(wavelengths_nm.clone(), n)?;
        let spline_k = CubicSpline::new(wavelengths_nm, k)?;
        Ok(Self {
            name: name.into(),
            spline_n,
            spline_k,
            offset: 0.0,
        })
    }
}

impl DispersionModel for TabulatedIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn wavelength_range(&self) -> (f64, f64) {
        (self.spline_n.x_min(), self.spline_n.x_max())
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        self.check_range(wavelength_nm)?;
        let n = self.spline_n.evaluate(wavelength_nm) + self.offset;
        // Spline overshoot must not create gain.
        let k = self.spline_k.evaluate(wavelength_nm).max(0.0);
        Ok(Complex64::new(n, -k))
    }

    fn index_derivative(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        self.check_range(wavelength_nm)?;
        Ok(Complex64::new(1.0, 0.0))
    }

    fn parameter(&self) -> f64 {
        self.offset
    }

    fn parameter_name(&self) -> &'static str {
        "n_offset"
    }

    fn with_parameter(&self, parameter: f64) -> Arc<dyn DispersionModel> {
        Arc::new(Self {
            offset: parameter,
            ..self.clone()
        })
    }

    fn parameter_bounds(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titania() -> TabulatedIndex {
        TabulatedIndex::new(
            "TiO2",
            vec![400.0, 500.0, 600.0, 700.0, 800.0],
            vec![2.65, 2.48, 2.42, 2.38, 2.36],
            vec![0.01, 0.0, 0.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_range_is_enforced() {
        let m = titania();
        assert!(m.refractive_index(350.0).is_err());
        assert!(m.refractive_index(850.0).is_err());
        assert!(m.refractive_index(550.0).is_ok());
    }

    #[test]
    fn test_offset_shifts_real_part_only() {
        let m = titania();
        let shifted = m.with_parameter(0.05);
        let a = m.refractive_index(555.0).unwrap();
        let b = shifted.refractive_index(555.0).unwrap();
        assert!((b.re - a.re - 0.05).abs() < 1e-12);
        assert_eq!(a.im, b.im);
        assert_eq!(shifted.parameter_name(), "n_offset");
    }

    #[test]
    fn test_negative_k_rejected() {
        let err = TabulatedIndex::new("bad", vec![400.0, 500.0], vec![1.5, 1.5], vec![0.0, -0.1]);
        assert!(err.is_err());
    }
}
