//! Trust-region Levenberg-Marquardt session.
//!
//! A session owns the model, the current parameter estimate and all the
//! adaptive state (trust radius, Levenberg parameter, scaling). Each call to
//! [`LevenbergMarquardt::iterate`] evaluates the Jacobian once and then tries
//! steps of decreasing length until one lowers chi² or the trust region
//! collapses.

use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::qr::PivotedQr;
use crate::step::levenberg_step;
use crate::{CurveModel, Inequality, OptimizerError, Status};

/// Initial trust radius relative to the scaled parameter norm.
const INITIAL_RADIUS_FACTOR: f64 = 0.01;

/// Evaluation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub nb_f_eval: usize,
    pub nb_df_eval: usize,
}

/// Bounded, inequality-aware Levenberg-Marquardt optimiser.
pub struct LevenbergMarquardt<M: CurveModel> {
    model: M,
    a: Array1<f64>,
    yi: Array1<f64>,
    sigma: Array1<f64>,
    a_min: Array1<f64>,
    a_max: Array1<f64>,
    inequalities: Vec<Inequality>,

    min_gradient: f64,
    acceptable_chi_2: f64,
    min_chi_2_change: f64,

    /// Model values at the current `a`; `None` until prepared.
    y: Option<Array1<f64>>,
    chi_2: f64,
    norm_gradient: f64,
    /// Moré scaling, set on the first iteration and only grown afterwards.
    d: Option<Array1<f64>>,
    delta: f64,
    alpha: f64,
    stats: Stats,
}

impl<M: CurveModel> LevenbergMarquardt<M> {
    /// Create a session.
    ///
    /// # Arguments
    /// * `model` - Values and Jacobian of the fitted function.
    /// * `a` - Starting parameters.
    /// * `yi` - Target value at every point.
    /// * `sigma` - Positive weight (tolerance) at every point.
    pub fn new(
        model: M,
        a: Vec<f64>,
        yi: Vec<f64>,
        sigma: Vec<f64>,
    ) -> Result<Self, OptimizerError> {
        if a.is_empty() {
            return Err(OptimizerError::EmptyParameters);
        }
        if sigma.len() != yi.len() {
            return Err(OptimizerError::LengthMismatch {
                what: "sigma",
                expected: yi.len(),
                actual: sigma.len(),
            });
        }
        if let Some((index, &value)) = sigma
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && **s > 0.0))
        {
            return Err(OptimizerError::InvalidSigma { index, value });
        }

        let n_par = a.len();
        let n_points = yi.len();
        Ok(Self {
            model,
            a: Array1::from(a),
            yi: Array1::from(yi),
            sigma: Array1::from(sigma),
            a_min: Array1::from_elem(n_par, f64::NEG_INFINITY),
            a_max: Array1::from_elem(n_par, f64::INFINITY),
            inequalities: vec![Inequality::Equal; n_points],
            min_gradient: 1e-10,
            acceptable_chi_2: 0.0,
            min_chi_2_change: 1e-10,
            y: None,
            chi_2: 0.0,
            norm_gradient: 0.0,
            d: None,
            delta: 0.0,
            alpha: 0.0,
            stats: Stats::default(),
        })
    }

    pub fn set_stop_criteria(
        &mut self,
        min_gradient: f64,
        acceptable_chi_2: f64,
        min_chi_2_change: f64,
    ) {
        self.min_gradient = min_gradient;
        self.acceptable_chi_2 = acceptable_chi_2;
        self.min_chi_2_change = min_chi_2_change;
    }

    /// Set box constraints. Starting values outside the box are clamped.
    pub fn set_limits(&mut self, a_min: Vec<f64>, a_max: Vec<f64>) -> Result<(), OptimizerError> {
        let n_par = self.a.len();
        for (what, v) in [("a_min", &a_min), ("a_max", &a_max)] {
            if v.len() != n_par {
                return Err(OptimizerError::LengthMismatch {
                    what,
                    expected: n_par,
                    actual: v.len(),
                });
            }
        }
        for (index, (&min, &max)) in a_min.iter().zip(&a_max).enumerate() {
            if min.is_nan() || max.is_nan() || min > max {
                return Err(OptimizerError::InvalidLimits { index, min, max });
            }
        }

        for (index, value) in self.a.iter_mut().enumerate() {
            let clamped = value.clamp(a_min[index], a_max[index]);
            if clamped != *value {
                log::warn!(
                    "Parameter {index} = {value} lies outside [{}, {}], clamped to {clamped}",
                    a_min[index],
                    a_max[index]
                );
                *value = clamped;
            }
        }
        self.a_min = Array1::from(a_min);
        self.a_max = Array1::from(a_max);
        // Values at the old parameters no longer apply.
        self.y = None;
        Ok(())
    }

    pub fn set_inequalities(
        &mut self,
        inequalities: Vec<Inequality>,
    ) -> Result<(), OptimizerError> {
        if inequalities.len() != self.yi.len() {
            return Err(OptimizerError::LengthMismatch {
                what: "inequalities",
                expected: self.yi.len(),
                actual: inequalities.len(),
            });
        }
        self.inequalities = inequalities;
        Ok(())
    }

    /// Evaluate the model at the starting point and compute the initial chi².
    pub fn prepare(&mut self) -> Result<(), OptimizerError> {
        let y = self.evaluate(&self.a.clone())?;
        self.chi_2 = self.chi_2_of(&y);
        self.y = Some(y);
        log::debug!("Initial chi² = {:.6e}", self.chi_2);
        Ok(())
    }

    /// One trust-region iteration.
    pub fn iterate(&mut self) -> Result<Status, OptimizerError> {
        let y = self.y.clone().ok_or(OptimizerError::NotPrepared)?;
        let n_par = self.a.len();
        let n_points = self.yi.len();

        // Weighted residuals, zero where an inequality is satisfied.
        let included = self.included_points(&y);
        let b: Array1<f64> = (0..n_points)
            .map(|i| {
                if included[i] {
                    (self.yi[i] - y[i]) / self.sigma[i]
                } else {
                    0.0
                }
            })
            .collect();

        let jacobian = self.evaluate_jacobian()?;
        let weighted = self.weighted_jacobian(&jacobian, &included);

        // Gradient and active set.
        let beta: Array1<f64> = (0..n_par).map(|p| weighted.row(p).dot(&b)).collect();
        let free: Vec<usize> = (0..n_par)
            .filter(|&p| {
                let stuck_low = self.a[p] <= self.a_min[p] && beta[p] < 0.0;
                let stuck_high = self.a[p] >= self.a_max[p] && beta[p] > 0.0;
                !(stuck_low || stuck_high)
            })
            .collect();
        if free.is_empty() {
            log::info!("All parameters are stuck at their bounds");
            return Ok(Status::AllParametersAreStuck);
        }

        self.norm_gradient = free.iter().map(|&p| beta[p] * beta[p]).sum::<f64>().sqrt();
        if self.norm_gradient == 0.0 || self.norm_gradient < self.min_gradient {
            log::info!("Minimum found (|gradient| = {:.3e})", self.norm_gradient);
            return Ok(Status::MinimumFound);
        }

        // Free columns of the weighted Jacobian, padded to a square system
        // when there are fewer points than free parameters.
        let n_free = free.len();
        let rows = n_points.max(n_free);
        let system = DMatrix::from_fn(rows, n_free, |i, k| {
            if i < n_points {
                weighted[[free[k], i]]
            } else {
                0.0
            }
        });
        let rhs = DVector::from_fn(rows, |i, _| if i < n_points { b[i] } else { 0.0 });
        let qr = PivotedQr::factorize(system, &rhs);
        if qr.is_rank_deficient() {
            log::debug!("Jacobian rank {} < {n_free} free parameters", qr.rank());
        }

        let column_norms: Array1<f64> = (0..n_par)
            .map(|p| weighted.row(p).dot(&weighted.row(p)).sqrt())
            .collect();
        let d = self.update_scaling(&column_norms);
        let free_diag: Array1<f64> = free.iter().map(|&p| d[p]).collect();

        let chi = self.chi_2.sqrt();
        loop {
            let step = levenberg_step(&qr, &free_diag, self.delta, self.alpha);
            self.alpha = step.alpha;

            // Apply and clamp, keeping `da` equal to the applied change.
            let saved_a = self.a.clone();
            let mut da = Array1::zeros(n_par);
            for (k, &p) in free.iter().enumerate() {
                let proposed = saved_a[p] + step.x[k];
                let applied = proposed.clamp(self.a_min[p], self.a_max[p]);
                if applied != proposed {
                    log::trace!("Parameter {p} clamped to {applied}");
                }
                self.a[p] = applied;
                da[p] = applied - saved_a[p];
            }
            let da_free: Array1<f64> = free.iter().map(|&p| da[p]).collect();
            let step_norm = (&d * &da).dot(&(&d * &da)).sqrt();

            let new_y = self.evaluate(&self.a.clone())?;
            let new_chi_2 = self.chi_2_of(&new_y);

            let actual_reduction = 1.0 - new_chi_2 / self.chi_2;
            let linear = qr.r_times(&da_free);
            let part1 = (linear.norm() / chi).powi(2);
            let part2 = self.alpha * (step_norm / chi).powi(2);
            let predicted_reduction = part1 + 2.0 * part2;
            let directional_derivative = -(part1 + part2);
            let rho = if predicted_reduction != 0.0 {
                actual_reduction / predicted_reduction
            } else {
                0.0
            };

            if !(rho > 0.25) {
                let mut mu = if actual_reduction >= 0.0 {
                    0.5
                } else {
                    0.5 * directional_derivative / (directional_derivative + 0.5 * actual_reduction)
                };
                if !(new_chi_2 <= 10.0 * self.chi_2) || !(mu >= 0.1) {
                    mu = 0.1;
                }
                self.delta = mu * self.delta.min(step_norm / 0.1);
                self.alpha /= mu;
            } else if self.alpha == 0.0 || rho >= 0.75 {
                self.delta = 2.0 * step_norm;
                self.alpha *= 0.5;
            }

            log::debug!(
                "chi² {:.6e} -> {:.6e}, rho = {rho:.3}, delta = {:.3e}, alpha = {:.3e}",
                self.chi_2,
                new_chi_2,
                self.delta,
                self.alpha
            );

            if new_chi_2 < self.chi_2 {
                self.chi_2 = new_chi_2;
                self.y = Some(new_y);
                let status = if self.chi_2 <= self.acceptable_chi_2 {
                    Status::Chi2IsOk
                } else if actual_reduction.abs() < self.min_chi_2_change
                    && predicted_reduction < self.min_chi_2_change
                {
                    Status::Chi2ChangeTooSmall
                } else {
                    Status::Improving
                };
                if status.is_terminal() {
                    log::info!("Optimisation stopped: {status} (chi² = {:.6e})", self.chi_2);
                }
                return Ok(status);
            }

            self.a = saved_a;
            let x_norm = (&d * &self.a).dot(&(&d * &self.a)).sqrt();
            if self.delta <= f64::EPSILON * x_norm || self.delta <= f64::MIN_POSITIVE {
                log::info!("Trust region collapsed (delta = {:.3e})", self.delta);
                return Ok(Status::DeltaIsTooSmall);
            }
        }
    }

    /// Iterate until a terminal status, `max_iterations`, or cancellation.
    ///
    /// `cancel` is checked before every iteration; a cancelled or capped run
    /// reports [`Status::Improving`].
    pub fn go(
        &mut self,
        max_iterations: usize,
        cancel: &AtomicBool,
    ) -> Result<Status, OptimizerError> {
        if self.y.is_none() {
            self.prepare()?;
        }
        for iteration in 0..max_iterations {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Optimisation cancelled after {iteration} iteration(s)");
                return Ok(Status::Improving);
            }
            let status = self.iterate()?;
            if status.is_terminal() {
                return Ok(status);
            }
        }
        Ok(Status::Improving)
    }

    pub fn chi_2(&self) -> f64 {
        self.chi_2
    }

    /// Norm of the gradient over the free parameters at the last iteration.
    pub fn norm_gradient(&self) -> f64 {
        self.norm_gradient
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn parameters(&self) -> &Array1<f64> {
        &self.a
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// Pearson correlation between the weighted Jacobian columns of every
    /// pair of parameters, over the points currently included in chi².
    ///
    /// Degenerate pairs (a constant column, or a non-finite result) are 0.
    pub fn correlation_matrix(&mut self) -> Result<Array2<f64>, OptimizerError> {
        let y = match self.y.clone() {
            Some(y) => y,
            None => self.evaluate(&self.a.clone())?,
        };
        let included = self.included_points(&y);
        let jacobian = self.checked_jacobian()?;
        let weighted = self.weighted_jacobian(&jacobian, &included);

        let n_par = self.a.len();
        let points: Vec<usize> = (0..self.yi.len()).filter(|&i| included[i]).collect();
        let n = points.len() as f64;
        let mut correlation = Array2::zeros((n_par, n_par));
        for p in 0..n_par {
            for q in 0..n_par {
                let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
                for &i in &points {
                    let x = weighted[[p, i]];
                    let y = weighted[[q, i]];
                    sx += x;
                    sy += y;
                    sxx += x * x;
                    syy += y * y;
                    sxy += x * y;
                }
                let denominator = ((n * sxx - sx * sx) * (n * syy - sy * sy)).sqrt();
                let value = (n * sxy - sx * sy) / denominator;
                correlation[[p, q]] = if denominator != 0.0 && value.is_finite() {
                    value
                } else {
                    0.0
                };
            }
        }
        Ok(correlation)
    }

    fn evaluate(&mut self, a: &Array1<f64>) -> Result<Array1<f64>, OptimizerError> {
        self.stats.nb_f_eval += 1;
        let y = self.model.values(a)?;
        if y.len() != self.yi.len() {
            return Err(OptimizerError::ShapeMismatch {
                what: "values",
                expected: (self.yi.len(), 1),
                actual: (y.len(), 1),
            });
        }
        Ok(y)
    }

    fn evaluate_jacobian(&mut self) -> Result<Array2<f64>, OptimizerError> {
        self.stats.nb_df_eval += 1;
        self.checked_jacobian()
    }

    /// Jacobian at the current parameters, not counted in [`Stats`].
    fn checked_jacobian(&mut self) -> Result<Array2<f64>, OptimizerError> {
        let jacobian = self.model.jacobian(&self.a)?;
        let expected = (self.a.len(), self.yi.len());
        if jacobian.dim() != expected {
            return Err(OptimizerError::ShapeMismatch {
                what: "jacobian",
                expected,
                actual: jacobian.dim(),
            });
        }
        Ok(jacobian)
    }

    fn included_points(&self, y: &Array1<f64>) -> Vec<bool> {
        self.inequalities
            .iter()
            .enumerate()
            .map(|(i, inequality)| !inequality.excludes(y[i], self.yi[i]))
            .collect()
    }

    fn chi_2_of(&self, y: &Array1<f64>) -> f64 {
        self.included_points(y)
            .iter()
            .enumerate()
            .filter(|(_, &included)| included)
            .map(|(i, _)| ((self.yi[i] - y[i]) / self.sigma[i]).powi(2))
            .sum()
    }

    /// `dY / sigma` with excluded points zeroed.
    fn weighted_jacobian(&self, jacobian: &Array2<f64>, included: &[bool]) -> Array2<f64> {
        let mut weighted = jacobian.clone();
        for ((_, i), value) in weighted.indexed_iter_mut() {
            *value = if included[i] { *value / self.sigma[i] } else { 0.0 };
        }
        weighted
    }

    /// Initialise the scaling and trust radius on first use, then grow the
    /// scaling to the current column norms.
    fn update_scaling(&mut self, column_norms: &Array1<f64>) -> Array1<f64> {
        let d = match self.d.take() {
            Some(d) => d,
            None => {
                let d: Array1<f64> = column_norms.mapv(|c| if c == 0.0 { 1.0 } else { c });
                let x_norm = (&d * &self.a).dot(&(&d * &self.a)).sqrt();
                self.delta = if x_norm != 0.0 {
                    INITIAL_RADIUS_FACTOR * x_norm
                } else {
                    INITIAL_RADIUS_FACTOR
                };
                d
            }
        };
        let d = ndarray::Zip::from(&d)
            .and(column_norms)
            .map_collect(|&d, &c| d.max(c));
        self.d = Some(d.clone());
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnModel;
    use ndarray::array;

    fn line_model(
    ) -> FnModel<impl FnMut(&Array1<f64>) -> Array1<f64>, impl FnMut(&Array1<f64>) -> Array2<f64>> {
        let xs = array![0.0, 1.0, 2.0, 3.0];
        let xs_j = xs.clone();
        FnModel::new(
            move |a: &Array1<f64>| xs.mapv(|x| a[0] + a[1] * x),
            move |_a: &Array1<f64>| {
                let mut j = Array2::zeros((2, 4));
                for (i, &x) in xs_j.iter().enumerate() {
                    j[[0, i]] = 1.0;
                    j[[1, i]] = x;
                }
                j
            },
        )
    }

    #[test]
    fn test_iterate_requires_prepare() {
        let mut lm = LevenbergMarquardt::new(line_model(), vec![0.0; 2], vec![1.0; 4], vec![1.0; 4])
            .unwrap();
        assert!(matches!(lm.iterate(), Err(OptimizerError::NotPrepared)));
    }

    #[test]
    fn test_scaling_never_shrinks() {
        let mut lm = LevenbergMarquardt::new(line_model(), vec![0.0; 2], vec![1.0; 4], vec![1.0; 4])
            .unwrap();
        let first = lm.update_scaling(&array![2.0, 0.0]);
        assert_eq!(first, array![2.0, 1.0]);
        let second = lm.update_scaling(&array![1.0, 3.0]);
        assert_eq!(second, array![2.0, 3.0]);
        // Zero parameters: radius falls back to the bare factor.
        assert_eq!(lm.delta, INITIAL_RADIUS_FACTOR);
    }

    #[test]
    fn test_line_fit_converges() {
        let targets = vec![1.0, 3.0, 5.0, 7.0];
        let mut lm =
            LevenbergMarquardt::new(line_model(), vec![0.5, 0.5], targets, vec![1.0; 4]).unwrap();
        lm.set_stop_criteria(1e-12, 1e-20, 0.0);
        let status = lm.go(100, &AtomicBool::new(false)).unwrap();
        assert!(status.is_terminal());
        assert!((lm.parameters()[0] - 1.0).abs() < 1e-6);
        assert!((lm.parameters()[1] - 2.0).abs() < 1e-6);
    }
}
