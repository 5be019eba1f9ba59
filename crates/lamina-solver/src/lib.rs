//! # Lamina Solver
//!
//! Bounded, inequality-aware Levenberg-Marquardt trust-region solver for
//! nonlinear least squares.
//!
//! The caller supplies a [`CurveModel`] that evaluates the model values
//! $Y(a)$ and the Jacobian $\partial Y_i / \partial a_j$; the solver
//! minimises
//!
//! $$ \chi^2 = \sum_i \left( \frac{Y^{target}_i - Y_i(a)}{\sigma_i} \right)^2 $$
//!
//! over the points that are not excluded by a satisfied inequality, while
//! keeping every parameter inside its box constraints.
//!
//! ## Components
//!
//! - [`LevenbergMarquardt`]: the session object (`prepare`, `iterate`, `go`).
//! - `qr`: column-pivoted Householder QR with a distinct rank-deficient solve.
//! - `step`: Moré's computation of the Levenberg parameter for a trust radius.

mod levenberg_marquardt;
mod qr;
mod step;

use std::fmt;

use ndarray::{Array1, Array2};
use thiserror::Error;

pub use levenberg_marquardt::{LevenbergMarquardt, Stats};

/// Errors raised while configuring or running an optimisation session.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("At least one parameter is required")]
    EmptyParameters,

    #[error("Length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Weight {index} must be positive and finite, got {value}")]
    InvalidSigma { index: usize, value: f64 },

    #[error("Invalid bounds for parameter {index}: [{min}, {max}]")]
    InvalidLimits { index: usize, min: f64, max: f64 },

    #[error("The session must be prepared before iterating")]
    NotPrepared,

    #[error("Model returned {what} of shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Model evaluation failed: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Outcome of one call to [`LevenbergMarquardt::iterate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Improving,
    MinimumFound,
    Chi2IsOk,
    Chi2ChangeTooSmall,
    DeltaIsTooSmall,
    AllParametersAreStuck,
    /// Reserved; the current algorithm handles singular systems through the
    /// rank-deficient path and never reports this.
    SingularMatrix,
}

impl Status {
    /// Every status except [`Status::Improving`] ends the session.
    pub fn is_terminal(self) -> bool {
        self != Status::Improving
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Improving => "improving",
            Status::MinimumFound => "minimum found",
            Status::Chi2IsOk => "chi² is acceptable",
            Status::Chi2ChangeTooSmall => "chi² change too small",
            Status::DeltaIsTooSmall => "trust region too small",
            Status::AllParametersAreStuck => "all parameters are stuck at their bounds",
            Status::SingularMatrix => "singular matrix",
        };
        f.write_str(text)
    }
}

/// How a target point contributes to chi².
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inequality {
    /// Always counted.
    #[default]
    Equal,
    /// The value should be at most the target; ignored once it is below.
    Smaller,
    /// The value should be at least the target; ignored once it is above.
    Larger,
}

impl Inequality {
    /// Whether a point with model value `y` and target `target` is left out
    /// of chi².
    pub fn excludes(self, y: f64, target: f64) -> bool {
        match self {
            Inequality::Equal => false,
            Inequality::Smaller => y < target,
            Inequality::Larger => y > target,
        }
    }
}

/// The function being fitted.
///
/// Both methods take `&mut self` so that implementations can reuse internal
/// work buffers between evaluations.
pub trait CurveModel {
    /// Model values at every target point.
    fn values(&mut self, a: &Array1<f64>) -> Result<Array1<f64>, OptimizerError>;

    /// Jacobian with shape `(n_parameters, n_points)`: row `j` holds
    /// $\partial Y / \partial a_j$.
    fn jacobian(&mut self, a: &Array1<f64>) -> Result<Array2<f64>, OptimizerError>;
}

/// [`CurveModel`] backed by a pair of closures.
pub struct FnModel<F, J> {
    values: F,
    jacobian: J,
}

impl<F, J> FnModel<F, J>
where
    F: FnMut(&Array1<f64>) -> Array1<f64>,
    J: FnMut(&Array1<f64>) -> Array2<f64>,
{
    pub fn new(values: F, jacobian: J) -> Self {
        Self { values, jacobian }
    }
}

impl<F, J> CurveModel for FnModel<F, J>
where
    F: FnMut(&Array1<f64>) -> Array1<f64>,
    J: FnMut(&Array1<f64>) -> Array2<f64>,
{
    fn values(&mut self, a: &Array1<f64>) -> Result<Array1<f64>, OptimizerError> {
        Ok((self.values)(a))
    }

    fn jacobian(&mut self, a: &Array1<f64>) -> Result<Array2<f64>, OptimizerError> {
        Ok((self.jacobian)(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_improving_continues() {
        assert!(!Status::Improving.is_terminal());
        for status in [
            Status::MinimumFound,
            Status::Chi2IsOk,
            Status::Chi2ChangeTooSmall,
            Status::DeltaIsTooSmall,
            Status::AllParametersAreStuck,
            Status::SingularMatrix,
        ] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn test_inequality_exclusion_direction() {
        assert!(Inequality::Smaller.excludes(0.2, 0.5));
        assert!(!Inequality::Smaller.excludes(0.7, 0.5));
        assert!(Inequality::Larger.excludes(0.7, 0.5));
        assert!(!Inequality::Larger.excludes(0.2, 0.5));
        assert!(!Inequality::Equal.excludes(0.2, 0.5));
    }
}
