//! End-to-end behaviour of the Levenberg-Marquardt session.

use std::sync::atomic::AtomicBool;

use approx::assert_relative_eq;
use lamina_solver::{CurveModel, FnModel, Inequality, LevenbergMarquardt, OptimizerError, Status};
use ndarray::{Array1, Array2};

fn sample_points() -> Array1<f64> {
    Array1::linspace(0.0, 10.0, 21)
}

/// `y = A·exp(−k·x)` with parameters `[A, k]`.
fn exponential(
) -> FnModel<impl FnMut(&Array1<f64>) -> Array1<f64>, impl FnMut(&Array1<f64>) -> Array2<f64>> {
    let xs = sample_points();
    let xs_j = xs.clone();
    FnModel::new(
        move |a: &Array1<f64>| xs.mapv(|x| a[0] * (-a[1] * x).exp()),
        move |a: &Array1<f64>| {
            let mut j = Array2::zeros((2, xs_j.len()));
            for (i, &x) in xs_j.iter().enumerate() {
                let e = (-a[1] * x).exp();
                j[[0, i]] = e;
                j[[1, i]] = -a[0] * x * e;
            }
            j
        },
    )
}

fn exponential_targets() -> Vec<f64> {
    sample_points().iter().map(|x| 3.0 * (-0.5 * x).exp()).collect()
}

/// Session fitting [`exponential`] to `3·exp(−0.5·x)` with uniform `sigma`.
fn exponential_fit(a: Vec<f64>, sigma: f64) -> LevenbergMarquardt<impl CurveModel> {
    let n = sample_points().len();
    LevenbergMarquardt::new(exponential(), a, exponential_targets(), vec![sigma; n]).unwrap()
}

#[test]
fn test_chi_2_is_monotone_and_converges() {
    let mut lm = exponential_fit(vec![1.0, 0.1], 0.01);
    lm.set_stop_criteria(1e-10, 1e-12, 1e-14);
    lm.prepare().unwrap();

    let mut previous = lm.chi_2();
    let mut status = Status::Improving;
    let mut iterations = 0;
    while !status.is_terminal() && iterations < 100 {
        status = lm.iterate().unwrap();
        assert!(lm.chi_2() <= previous, "chi² increased: {} -> {}", previous, lm.chi_2());
        previous = lm.chi_2();
        iterations += 1;
    }

    assert!(iterations < 100, "did not terminate, last status {status}");
    assert!(
        matches!(status, Status::Chi2IsOk | Status::MinimumFound | Status::Chi2ChangeTooSmall),
        "unexpected status {status}"
    );
    assert_relative_eq!(lm.parameters()[0], 3.0, epsilon = 1e-5);
    assert_relative_eq!(lm.parameters()[1], 0.5, epsilon = 1e-5);
    assert!(lm.stats().nb_f_eval >= iterations);
    assert_eq!(lm.stats().nb_df_eval, iterations);
}

#[test]
fn test_bounds_are_never_left() {
    let mut lm = exponential_fit(vec![1.0, 0.1], 0.01);
    // The unconstrained optimum A = 3 lies outside the box.
    lm.set_limits(vec![0.5, 0.0], vec![2.0, 1.0]).unwrap();
    lm.prepare().unwrap();
    for _ in 0..100 {
        let status = lm.iterate().unwrap();
        let a = lm.parameters();
        assert!((0.5..=2.0).contains(&a[0]), "A = {} out of bounds", a[0]);
        assert!((0.0..=1.0).contains(&a[1]), "k = {} out of bounds", a[1]);
        if status.is_terminal() {
            break;
        }
    }
    assert!(lm.chi_2().is_finite());
}

#[test]
fn test_starting_point_is_clamped_into_limits() {
    let mut lm = exponential_fit(vec![5.0, 0.1], 1.0);
    lm.set_limits(vec![0.0, 0.0], vec![4.0, 1.0]).unwrap();
    assert_eq!(lm.parameters()[0], 4.0);
}

#[test]
fn test_satisfied_inequalities_cost_nothing() {
    let model = FnModel::new(
        |a: &Array1<f64>| Array1::from_elem(3, a[0]),
        |_a: &Array1<f64>| Array2::from_elem((1, 3), 1.0),
    );
    let mut lm =
        LevenbergMarquardt::new(model, vec![1.0], vec![5.0, 5.0, 0.5], vec![1.0; 3]).unwrap();
    lm.set_inequalities(vec![Inequality::Smaller, Inequality::Smaller, Inequality::Larger])
        .unwrap();
    lm.prepare().unwrap();
    assert_eq!(lm.chi_2(), 0.0);
    assert_eq!(lm.iterate().unwrap(), Status::MinimumFound);
}

#[test]
fn test_unmet_inequality_is_fitted_to_its_edge() {
    let model = FnModel::new(
        |a: &Array1<f64>| Array1::from_elem(1, a[0]),
        |_a: &Array1<f64>| Array2::from_elem((1, 1), 1.0),
    );
    let mut lm = LevenbergMarquardt::new(model, vec![3.0], vec![1.0], vec![0.1]).unwrap();
    lm.set_inequalities(vec![Inequality::Smaller]).unwrap();
    let status = lm.go(100, &AtomicBool::new(false)).unwrap();
    assert!(status.is_terminal());
    assert!(lm.parameters()[0] <= 1.0 + 1e-6, "a = {}", lm.parameters()[0]);
}

#[test]
fn test_rank_deficient_problem_converges() {
    // Only the sum of the two parameters is observable.
    let xs = sample_points();
    let xs_j = xs.clone();
    let model = FnModel::new(
        move |a: &Array1<f64>| xs.mapv(|x| (a[0] + a[1]) * x),
        move |_a: &Array1<f64>| {
            let mut j = Array2::zeros((2, xs_j.len()));
            for (i, &x) in xs_j.iter().enumerate() {
                j[[0, i]] = x;
                j[[1, i]] = x;
            }
            j
        },
    );
    let targets: Vec<f64> = sample_points().iter().map(|x| 2.0 * x).collect();
    let n = targets.len();
    let mut lm = LevenbergMarquardt::new(model, vec![0.3, 0.2], targets, vec![1.0; n]).unwrap();
    lm.set_stop_criteria(1e-10, 1e-16, 0.0);
    let status = lm.go(200, &AtomicBool::new(false)).unwrap();
    assert!(status.is_terminal(), "status {status}");
    let a = lm.parameters();
    assert_relative_eq!(a[0] + a[1], 2.0, epsilon = 1e-6);
}

#[test]
fn test_all_parameters_stuck() {
    let model = FnModel::new(
        |a: &Array1<f64>| Array1::from_elem(1, a[0]),
        |_a: &Array1<f64>| Array2::from_elem((1, 1), 1.0),
    );
    let mut lm = LevenbergMarquardt::new(model, vec![0.0], vec![-5.0], vec![1.0]).unwrap();
    lm.set_limits(vec![0.0], vec![10.0]).unwrap();
    lm.prepare().unwrap();
    assert_eq!(lm.iterate().unwrap(), Status::AllParametersAreStuck);
}

#[test]
fn test_correlation_matrix() {
    let xs = Array1::linspace(0.0, 1.0, 5);
    let xs_j = xs.clone();
    // Third parameter has no influence.
    let model = FnModel::new(
        move |a: &Array1<f64>| xs.mapv(|x| a[0] * x + 2.0 * a[1] * x),
        move |_a: &Array1<f64>| {
            let mut j = Array2::zeros((3, xs_j.len()));
            for (i, &x) in xs_j.iter().enumerate() {
                j[[0, i]] = x;
                j[[1, i]] = 2.0 * x;
            }
            j
        },
    );
    let mut lm =
        LevenbergMarquardt::new(model, vec![1.0, 1.0, 1.0], vec![0.0; 5], vec![1.0; 5]).unwrap();
    let c = lm.correlation_matrix().unwrap();
    assert_relative_eq!(c[[0, 1]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(c[[1, 0]], 1.0, epsilon = 1e-12);
    for k in 0..3 {
        assert_eq!(c[[2, k]], 0.0);
        assert_eq!(c[[k, 2]], 0.0);
    }
    assert!(c.iter().all(|v| v.is_finite()));
}

#[test]
fn test_correlation_after_fit_leaves_counters_alone() {
    let mut lm = exponential_fit(vec![1.0, 0.1], 0.01);
    lm.go(100, &AtomicBool::new(false)).unwrap();
    let stats = lm.stats();

    let c = lm.correlation_matrix().unwrap();
    assert_eq!(lm.stats(), stats);
    assert_relative_eq!(c[[0, 0]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(c[[0, 1]], c[[1, 0]], epsilon = 1e-12);
}

#[test]
fn test_configuration_errors() {
    let model = || {
        FnModel::new(
            |a: &Array1<f64>| Array1::from_elem(2, a[0]),
            |_a: &Array1<f64>| Array2::from_elem((1, 2), 1.0),
        )
    };
    assert!(matches!(
        LevenbergMarquardt::new(model(), vec![], vec![1.0, 1.0], vec![1.0, 1.0]),
        Err(OptimizerError::EmptyParameters)
    ));
    assert!(matches!(
        LevenbergMarquardt::new(model(), vec![1.0], vec![1.0, 1.0], vec![1.0]),
        Err(OptimizerError::LengthMismatch { .. })
    ));
    assert!(matches!(
        LevenbergMarquardt::new(model(), vec![1.0], vec![1.0, 1.0], vec![1.0, 0.0]),
        Err(OptimizerError::InvalidSigma { index: 1, .. })
    ));

    let mut lm =
        LevenbergMarquardt::new(model(), vec![1.0], vec![1.0, 1.0], vec![1.0, 1.0]).unwrap();
    assert!(matches!(
        lm.set_limits(vec![2.0], vec![1.0]),
        Err(OptimizerError::InvalidLimits { index: 0, .. })
    ));
    assert!(matches!(
        lm.set_inequalities(vec![Inequality::Equal]),
        Err(OptimizerError::LengthMismatch { .. })
    ));
}

#[test]
fn test_cancellation_stops_before_iterating() {
    let mut lm = exponential_fit(vec![1.0, 0.1], 0.01);
    let status = lm.go(100, &AtomicBool::new(true)).unwrap();
    assert_eq!(status, Status::Improving);
    assert_eq!(lm.stats().nb_df_eval, 0);
    assert_eq!(lm.parameters()[0], 1.0);
}
