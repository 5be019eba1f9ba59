//! Integration tests for the thin-film engine.
//!
//! - Energy conservation and reciprocity for lossless stacks
//! - Quarter-wave antireflection reference value
//! - Backside reflection with an index-matched exit medium
//! - Analytic derivatives of every quantity against central differences,
//!   for thickness, index and index at constant optical thickness
//! - Thickness recovery through the refinement front-end

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use approx::assert_relative_eq;

use lamina_core::stack::{Layer, Quantity, Stack, StackParameter, Workspace};
use lamina_core::types::{Plane, Polarization};
use lamina_core::{Refinement, Target};
use lamina_materials::{Cauchy, ConstantIndex, DispersionModel};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

fn constant(n: f64, k: f64) -> Arc<dyn DispersionModel> {
    Arc::new(ConstantIndex::new("constant", n, k))
}

fn wavelengths(start: f64, stop: f64, count: usize) -> Vec<f64> {
    let step = (stop - start) / (count - 1) as f64;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Three-layer stack with one weakly absorbing, dispersive layer.
fn test_stack(absorbing: bool) -> Stack {
    let mut stack = Stack::new(constant(1.0, 0.0), constant(1.52, 0.0));
    let k = if absorbing { 0.02 } else { 0.0 };
    stack.layers.push(Layer::new(constant(2.1, 0.0), 83.0));
    stack.layers.push(Layer::new(Arc::new(Cauchy::new("cauchy", 1.45, 0.004, 0.0, k)), 121.0));
    stack.layers.push(Layer::new(constant(2.3, k), 57.0));
    stack
}

fn with_backside(mut stack: Stack) -> Stack {
    stack.consider_backside = true;
    stack.substrate = constant(1.52, 1e-7);
    stack.substrate_thickness = 1e6;
    stack
}

fn value(
    stack: &Stack,
    quantity: Quantity,
    polarization: Polarization,
    wvls: &[f64],
    angle: f64,
) -> Vec<f64> {
    Workspace::new(stack, wvls, angle)
        .unwrap()
        .value(quantity, polarization)
        .unwrap()
        .values()
        .to_vec()
}

fn numeric_derivative(
    stack: &Stack,
    parameter: StackParameter,
    quantity: Quantity,
    polarization: Polarization,
    wvls: &[f64],
    angle: f64,
    h: f64,
) -> Vec<f64> {
    let base = stack.parameter_value(parameter);
    let shifted = |sign: f64| {
        let mut copy = stack.clone();
        copy.set_parameter(parameter, base + sign * h).unwrap();
        value(&copy, quantity, polarization, wvls, angle)
    };
    let plus = shifted(1.0);
    let minus = shifted(-1.0);
    plus.iter().zip(&minus).map(|(p, m)| (p - m) / (2.0 * h)).collect()
}

fn analytic_derivative(
    stack: &Stack,
    parameter: StackParameter,
    quantity: Quantity,
    polarization: Polarization,
    wvls: &[f64],
    angle: f64,
) -> Vec<f64> {
    let mut ws = Workspace::new(stack, wvls, angle).unwrap();
    ws.set_parameter_derivative(stack, parameter).unwrap();
    ws.derivative(quantity, polarization).unwrap().values().to_vec()
}

/// Compare analytic and central-difference derivatives at normal and
/// oblique incidence.
fn check_derivatives(stack: &Stack, quantities: &[Quantity], polarizations: &[Polarization]) {
    let wvls = wavelengths(500.0, 620.0, 13);
    let parameters = [
        (StackParameter::Thickness(1), 1e-4),
        (StackParameter::Index(1), 1e-6),
        (StackParameter::IndexConstantOt(2), 1e-6),
    ];
    for angle in [0.0, 35.0] {
        for &(parameter, h) in &parameters {
            for &quantity in quantities {
                for &polarization in polarizations {
                    let analytic =
                        analytic_derivative(stack, parameter, quantity, polarization, &wvls, angle);
                    let numeric = numeric_derivative(
                        stack,
                        parameter,
                        quantity,
                        polarization,
                        &wvls,
                        angle,
                        h,
                    );
                    for (i, (a, n)) in analytic.iter().zip(&numeric).enumerate() {
                        assert!(
                            (a - n).abs() <= 1e-6 + 1e-5 * n.abs(),
                            "{parameter} {quantity} {polarization:?} at {} nm, {angle}°: \
                             analytic {a}, numeric {n}",
                            wvls[i]
                        );
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────

#[test]
fn test_energy_conservation_for_lossless_stacks() {
    let wvls = wavelengths(400.0, 800.0, 41);
    for stack in [test_stack(false), with_backside(test_stack(false))] {
        let mut stack = stack;
        stack.substrate = constant(1.52, 0.0);
        for polarization in [Polarization::S, Polarization::P, Polarization::Other(30.0)] {
            for angle in [0.0, 45.0, 70.0] {
                let r = value(&stack, Quantity::Reflectance, polarization, &wvls, angle);
                let t = value(&stack, Quantity::Transmittance, polarization, &wvls, angle);
                for (r, t) in r.iter().zip(&t) {
                    assert_relative_eq!(r + t, 1.0, epsilon = 1e-12);
                }
            }
        }
    }
}

#[test]
fn test_absorbing_stack_has_positive_absorptance() {
    let wvls = wavelengths(400.0, 800.0, 21);
    let a = value(&test_stack(true), Quantity::Absorptance, Polarization::Unpolarized, &wvls, 20.0);
    assert!(a.iter().all(|&a| a > 0.0 && a < 1.0));
}

#[test]
fn test_transmittance_is_reciprocal() {
    let wvls = wavelengths(450.0, 650.0, 11);
    let forward = test_stack(true);
    let mut reverse = Stack::new(forward.substrate.clone(), forward.medium.clone());
    reverse.layers = forward.layers.iter().rev().cloned().collect();

    // Same Snell invariant on both sides.
    let angle = 40.0_f64;
    let inside = (angle.to_radians().sin() / 1.52).asin().to_degrees();
    for polarization in [Polarization::S, Polarization::P] {
        let t_forward = value(&forward, Quantity::Transmittance, polarization, &wvls, angle);
        let t_reverse = value(&reverse, Quantity::Transmittance, polarization, &wvls, inside);
        for (a, b) in t_forward.iter().zip(&t_reverse) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_quarter_wave_antireflection() {
    let mut stack = Stack::new(constant(1.0, 0.0), constant(1.52, 0.0));
    stack.layers.push(Layer::new(constant(2.0, 0.0), 550.0 / 8.0));
    let r = value(&stack, Quantity::Reflectance, Polarization::S, &[550.0], 0.0);
    let y: f64 = 4.0 / 1.52;
    assert_relative_eq!(r[0], ((1.0 - y) / (1.0 + y)).powi(2), epsilon = 1e-6);
}

#[test]
fn test_backside_with_matched_exit_equals_front_side() {
    let wvls = wavelengths(450.0, 650.0, 11);
    let front = test_stack(true);
    let mut back = front.clone();
    back.consider_backside = true;
    back.exit = back.substrate.clone();
    for polarization in [Polarization::S, Polarization::P, Polarization::Unpolarized] {
        for quantity in [Quantity::Reflectance, Quantity::Transmittance] {
            let a = value(&front, quantity, polarization, &wvls, 30.0);
            let b = value(&back, quantity, polarization, &wvls, 30.0);
            for (a, b) in a.iter().zip(&b) {
                assert_relative_eq!(a, b, epsilon = 1e-12);
            }
        }
    }
}

#[test]
fn test_bare_substrate_backside_adds_second_reflection() {
    let mut stack = with_backside(Stack::new(constant(1.0, 0.0), constant(1.52, 0.0)));
    stack.substrate = constant(1.52, 0.0);
    let r = value(&stack, Quantity::Reflectance, Polarization::S, &[550.0], 0.0);
    let rf = (0.52_f64 / 2.52).powi(2);
    let expected = rf + (1.0 - rf).powi(2) * rf / (1.0 - rf * rf);
    assert_relative_eq!(r[0], expected, epsilon = 1e-12);
}

#[test]
fn test_spectrum_reports_phase_and_dispersion() {
    let wvls = wavelengths(700.0, 900.0, 21);
    let samples = test_stack(false).spectrum(&wvls, 0.0, Polarization::Unpolarized).unwrap();
    assert_eq!(samples.len(), 21);
    for sample in &samples {
        // s and p coincide at normal incidence.
        assert_relative_eq!(sample.gd_s, sample.gd_p, epsilon = 1e-9);
        assert!(sample.gdd_s.is_finite());
        assert_relative_eq!(
            sample.reflectance + sample.transmittance + sample.absorptance,
            1.0,
            epsilon = 1e-12
        );
    }
}

#[test]
fn test_single_wavelength_group_delay_is_nan() {
    let gd = value(&test_stack(false), Quantity::ReflectionGd, Polarization::S, &[600.0], 0.0);
    assert!(gd[0].is_nan());
}

// ─────────────────────────────────────────────────────────────
// Derivatives
// ─────────────────────────────────────────────────────────────

#[test]
fn test_intensity_derivatives_match_finite_differences() {
    check_derivatives(
        &test_stack(true),
        &[Quantity::Reflectance, Quantity::Transmittance, Quantity::Absorptance],
        &[Polarization::S, Polarization::P, Polarization::Other(60.0)],
    );
}

#[test]
fn test_backside_derivatives_match_finite_differences() {
    check_derivatives(
        &with_backside(test_stack(true)),
        &[Quantity::Reflectance, Quantity::Transmittance, Quantity::Absorptance],
        &[Polarization::S, Polarization::Unpolarized],
    );
}

#[test]
fn test_phase_derivatives_match_finite_differences() {
    check_derivatives(
        &test_stack(true),
        &[
            Quantity::ReflectionPhase,
            Quantity::TransmissionPhase,
            Quantity::ReflectionGd,
            Quantity::TransmissionGd,
            Quantity::ReflectionGdd,
        ],
        &[Polarization::S, Polarization::P],
    );
}

#[test]
fn test_phase_derivative_needs_a_plane() {
    let stack = test_stack(false);
    let mut ws = Workspace::new(&stack, &[500.0, 510.0], 0.0).unwrap();
    ws.set_parameter_derivative(&stack, StackParameter::Thickness(0)).unwrap();
    assert!(ws.derivative(Quantity::ReflectionPhase, Polarization::Unpolarized).is_err());
    assert!(ws.derivative(Quantity::ReflectionPhase, Plane::P.into()).is_ok());
}

// ─────────────────────────────────────────────────────────────
// Refinement
// ─────────────────────────────────────────────────────────────

#[test]
fn test_refinement_recovers_thickness() {
    let wvls = wavelengths(400.0, 700.0, 31);
    let mut truth = Stack::new(constant(1.0, 0.0), constant(1.52, 0.0));
    truth.layers.push(Layer::new(constant(2.0, 0.0), 120.0));
    let measured = value(&truth, Quantity::Reflectance, Polarization::S, &wvls, 0.0);

    let mut start = truth.clone();
    start.layers[0].thickness = 110.0;
    start.layers[0].refine_thickness = true;
    let mut target = Target::new(Quantity::Reflectance, 0.0, Polarization::S, wvls, measured);
    target.deltas = vec![0.01; target.len()];

    let refinement = Refinement::new(start, vec![target]).unwrap();
    let mut solver = refinement.into_solver().unwrap();
    let status = solver.go(100, &AtomicBool::new(false)).unwrap();
    assert!(status.is_terminal());
    assert!(solver.chi_2() < 1e-12, "chi² = {}", solver.chi_2());

    let a = solver.parameters().clone();
    let refined = solver.into_model().into_stack(&a).unwrap();
    assert_relative_eq!(refined.layers[0].thickness, 120.0, epsilon = 1e-4);
}
