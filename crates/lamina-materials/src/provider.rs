//! Dispersion model trait.
//!
//! All material data sources implement [`DispersionModel`], which returns the
//! wavelength-dependent complex refractive index together with its derivative
//! with respect to the single real parameter that controls the dispersion
//! curve. The derivative is what the thin-film derivative engine consumes when
//! a layer's index is refined.
//!
//! # Sign convention
//!
//! Indices are returned as $\tilde{N} = n - ik$ with $k \geq 0$, so absorption
//! appears as a *negative* imaginary part.

use std::fmt::Debug;
use std::sync::Arc;

use num_complex::Complex64;
use thiserror::Error;

/// Errors from dispersion models.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Wavelength {wavelength_nm} nm is outside the data range [{min}, {max}] nm")]
    OutOfRange {
        wavelength_nm: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid material data: {0}")]
    InvalidData(String),
}

/// Provides a wavelength-dependent complex refractive index.
///
/// Implementations are immutable; refining the index parameter produces a new
/// model through [`with_parameter`](DispersionModel::with_parameter).
pub trait DispersionModel: Send + Sync + Debug {
    /// Human-readable name of this material.
    fn name(&self) -> &str;

    /// Wavelength range over which the model is defined (nm).
    fn wavelength_range(&self) -> (f64, f64) {
        (0.0, f64::INFINITY)
    }

    /// Complex refractive index $n - ik$ at a given wavelength.
    fn refractive_index(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError>;

    /// Derivative of the complex index with respect to [`parameter`](DispersionModel::parameter).
    fn index_derivative(&self, wavelength_nm: f64) -> Result<Complex64, MaterialError>;

    /// Current value of the refinable parameter.
    fn parameter(&self) -> f64;

    /// Short label of the refinable parameter, as written in job files.
    fn parameter_name(&self) -> &'static str {
        "n"
    }

    /// A copy of this model with the refinable parameter replaced.
    fn with_parameter(&self, parameter: f64) -> Arc<dyn DispersionModel>;

    /// Physically meaningful range of the refinable parameter.
    fn parameter_bounds(&self) -> (f64, f64) {
        (1.0, f64::INFINITY)
    }

    /// Check that `wavelength_nm` lies inside
    /// [`wavelength_range`](DispersionModel::wavelength_range).
    fn check_range(&self, wavelength_nm: f64) -> Result<(), MaterialError> {
        let (min, max) = self.wavelength_range();
        if wavelength_nm < min || wavelength_nm > max {
            return Err(MaterialError::OutOfRange {
                wavelength_nm,
                min,
                max,
            });
        }
        Ok(())
    }
}
