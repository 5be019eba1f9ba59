//! Natural cubic spline used to interpolate tabulated optical constants.

use crate::provider::MaterialError;

/// Natural cubic spline through the knots $(x_i, y_i)$.
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots.
    curvature: Vec<f64>,
}

impl CubicSpline {
    /// Build the spline, rejecting malformed knot sets.
    ///
    /// `xs` must be strictly increasing and hold at least two points.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, MaterialError> {
        if xs.len() != ys.len() {
            return Err(MaterialError::InvalidData(format!(
                "{} abscissae but {} ordinates",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(MaterialError::InvalidData(
                "at least two tabulated points are required".into(),
            ));
        }
        if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
            return Err(MaterialError::InvalidData(format!(
                "wavelengths must be strictly increasing (index {})",
                i + 1
            )));
        }

        let n = xs.len();
        let mut curvature = vec![0.0; n];
        let mut u = vec![0.0; n];

        // Tridiagonal forward elimination with natural end conditions.
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * curvature[i - 1] + 2.0;
            curvature[i] = (sig - 1.0) / p;
            let slope_jump = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * slope_jump / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }
        for i in (0..n - 1).rev() {
            curvature[i] = curvature[i] * curvature[i + 1] + u[i];
        }

        Ok(Self { xs, ys, curvature })
    }

    pub fn x_min(&self) -> f64 {
        self.xs[0]
    }

    pub fn x_max(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    /// Evaluate the spline at `x`. Outside the knots the end polynomials are
    /// extended.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (lo, hi) = self.interval(x);
        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;
        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.curvature[lo] + (b * b * b - b) * self.curvature[hi]) * h * h
                / 6.0
    }

    fn interval(&self, x: f64) -> (usize, usize) {
        let mut lo = 0;
        let mut hi = self.xs.len() - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        (lo, hi)
    }
}
