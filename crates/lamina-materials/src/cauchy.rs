//! Cauchy dispersion for transparent dielectrics.
//!
//! $$ n(\lambda) = A + \frac{B}{\lambda^2} + \frac{C}{\lambda^4} $$
//!
//! with $\lambda$ in micrometres. A constant extinction coefficient can be
//! added for weakly absorbing films.

use std::sync::Arc;

use num_complex::Complex64;

use crate::provider::{DispersionModel, MaterialError};

/// Cauchy material. The refinable parameter is the constant term `A`, so the
/// index derivative is one at every wavelength.
#[derive(Debug, Clone)]
pub struct Cauchy {
    name: String,
    a: f64,
    b: f64,
    c: f64,
    k: f64,
}

impl Cauchy {
    /// # Arguments
    /// * `a` - Constant term (dimensionless).
    /// * `b` - Second-order coefficient (µm²).
    /// * `c` - Fourth-order coefficient (µm⁴).
    /// * `k` - Constant extinction coefficient.
    pub fn new(name: impl Into<String>, a: f64, b: f64, c: f64, k: f64) -> Self {
        Self {
            name: name.into(),
            a,
            b,
            c,
            k,
        }
    }

    fn n(&self, wavelength_nm: f64) -> f64 {
        let l2 = (wavelength_nm * 1e-3).powi(2);
        self.a + self.b / l2 + self.c / (l2 * l2)
    }
}

impl DispersionModel for Cauchy {
    fn name(&self) -> &str {
        &self.name
    }

    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        if wavelength_nm <= 0.0 {
            return Err(MaterialError::OutOfRange {
                wavelength_nm,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(Complex64::new(self.n(wavelength_nm), -self.k))
    }

    fn index_derivative(&self, _wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        Ok(Complex64::new(1.0, 0.0))
    }

    fn parameter(&self) -> f64 {
        self.a
    }

    fn parameter_name(&self) -> &'static str {
        "a"
    }

    fn with_parameter(&self, parameter: f64) -> Arc<dyn DispersionModel> {
        Arc::new(Self {
            a: parameter,
            ..self.clone()
        })
    }
}
