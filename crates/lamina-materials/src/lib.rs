//! # Lamina Materials
//!
//! Dispersion models for the Lamina thin-film engine. All materials implement
//! the [`DispersionModel`](provider::DispersionModel) trait, which provides
//! the complex refractive index and its derivative with respect to one
//! refinable parameter.
//!
//! ## Available models
//!
//! | Model | Module | Refinable parameter |
//! |-------|--------|---------------------|
//! | Constant `n − ik` | [`constant`] | `n` |
//! | Cauchy | [`cauchy`] | constant term `A` |
//! | Tabulated `(n, k)` | [`tabulated`] | offset added to `n` |
//!
//! ## Interpolation
//!
//! Tabulated data is interpolated using natural cubic splines
//! ([`spline::CubicSpline`]).

pub mod cauchy;
pub mod constant;
pub mod provider;
pub mod spline;
pub mod tabulated;

pub use cauchy::Cauchy;
pub use constant::ConstantIndex;
pub use provider::{DispersionModel, MaterialError};
pub use tabulated::TabulatedIndex;
