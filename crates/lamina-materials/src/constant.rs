//! Non-dispersive material.

use std::sync::Arc;

use num_complex::Complex64;

use crate::provider::{DispersionModel, MaterialError};

/// A material whose index does not depend on wavelength.
///
/// The refinable parameter is the real index `n`.
#[derive(Debug, Clone)]
pub struct ConstantIndex {
    name: String,
    n: f64,
    k: f64,
}

impl ConstantIndex {
    pub fn new(name: impl Into<String>, n: f64, k: f64) -> Self {
        Self {
            name: name.into(),
            n,
            k,
        }
    }

    /// A lossless material of index `n`.
    pub fn lossless(n: f64) -> Self {
        Self::new(format!("n={n}"), n, 0.0)
    }
}

impl DispersionModel for ConstantIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn refractive_index(&self, _wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        Ok(Complex64::new(self.n, -self.k))
    }

    fn index_derivative(&self, _wavelength_nm: f64) -> Result<Complex64, MaterialError> {
        Ok(Complex64::new(1.0, 0.0))
    }

    fn parameter(&self) -> f64 {
        self.n
    }

    fn with_parameter(&self, parameter: f64) -> Arc<dyn DispersionModel> {
        Arc::new(Self {
            name: self.name.clone(),
            n: parameter,
            k: self.k,
        })
    }
}
