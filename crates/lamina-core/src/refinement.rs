//! Refinement of stack parameters against measured or desired spectra.
//!
//! A [`Refinement`] gathers every parameter flagged on the stack's layers,
//! evaluates each [`Target`] on its own [`Workspace`], and exposes the
//! concatenated values and analytic Jacobian as a [`CurveModel`] for the
//! Levenberg-Marquardt solver.

use log::{debug, info};
use ndarray::{Array1, Array2};
use thiserror::Error;

use lamina_solver::{CurveModel, Inequality, LevenbergMarquardt, OptimizerError};

use crate::stack::{Quantity, Stack, StackParameter, Workspace};
use crate::types::{OpticsError, Polarization};

/// One spectral target.
#[derive(Debug, Clone)]
pub struct Target {
    pub kind: Quantity,
    /// Angle of incidence (degrees).
    pub angle: f64,
    pub polarization: Polarization,
    pub wavelengths: Vec<f64>,
    pub values: Vec<f64>,
    /// Tolerance per point; the residual is divided by it.
    pub deltas: Vec<f64>,
    pub inequality: Inequality,
}

impl Target {
    /// A target with unit tolerance everywhere.
    pub fn new(
        kind: Quantity,
        angle: f64,
        polarization: Polarization,
        wavelengths: Vec<f64>,
        values: Vec<f64>,
    ) -> Self {
        let deltas = vec![1.0; wavelengths.len()];
        Self {
            kind,
            angle,
            polarization,
            wavelengths,
            values,
            deltas,
            inequality: Inequality::Equal,
        }
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }
}

/// Problems detected while setting up a refinement.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("No targets were given")]
    NoTargets,

    #[error("No layer parameter is marked for refinement")]
    NoParameters,

    #[error("Target {target}: {kind} needs s or p polarization")]
    PhaseNeedsPlane { target: usize, kind: Quantity },

    #[error("Target {target}: {what} has {actual} values for {expected} wavelengths")]
    LengthMismatch {
        target: usize,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Target {target}: delta {index} must be positive, got {value}")]
    InvalidDelta { target: usize, index: usize, value: f64 },

    #[error("Layer {0}: constant optical thickness cannot be combined with thickness refinement")]
    ConflictingOpticalThickness(usize),

    #[error(transparent)]
    Optics(#[from] OpticsError),
}

/// A stack together with its targets, usable as a [`CurveModel`].
#[derive(Debug)]
pub struct Refinement {
    stack: Stack,
    targets: Vec<Target>,
    parameters: Vec<StackParameter>,
    workspaces: Vec<Workspace>,
    current: Option<Array1<f64>>,
}

impl Refinement {
    pub fn new(stack: Stack, targets: Vec<Target>) -> Result<Self, ConfigurationError> {
        if targets.is_empty() {
            return Err(ConfigurationError::NoTargets);
        }
        for (i, layer) in stack.layers.iter().enumerate() {
            if layer.preserve_ot && layer.refine_index && layer.refine_thickness {
                return Err(ConfigurationError::ConflictingOpticalThickness(i));
            }
        }
        let parameters = stack.refinable_parameters();
        if parameters.is_empty() {
            return Err(ConfigurationError::NoParameters);
        }

        for (t, target) in targets.iter().enumerate() {
            if target.kind.needs_plane() && target.polarization.plane().is_none() {
                return Err(ConfigurationError::PhaseNeedsPlane {
                    target: t,
                    kind: target.kind,
                });
            }
            let lengths = [("values", target.values.len()), ("deltas", target.deltas.len())];
            for (what, actual) in lengths {
                if actual != target.len() {
                    return Err(ConfigurationError::LengthMismatch {
                        target: t,
                        what,
                        expected: target.len(),
                        actual,
                    });
                }
            }
            if let Some((index, &value)) = target
                .deltas
                .iter()
                .enumerate()
                .find(|(_, d)| !(d.is_finite() && **d > 0.0))
            {
                return Err(ConfigurationError::InvalidDelta { target: t, index, value });
            }
        }

        let workspaces = targets
            .iter()
            .map(|target| Workspace::new(&stack, &target.wavelengths, target.angle))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            "Refinement of {} parameters against {} targets ({} points)",
            parameters.len(),
            targets.len(),
            targets.iter().map(Target::len).sum::<usize>()
        );
        Ok(Self {
            stack,
            targets,
            parameters,
            workspaces,
            current: None,
        })
    }

    pub fn parameters(&self) -> &[StackParameter] {
        &self.parameters
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn nb_points(&self) -> usize {
        self.targets.iter().map(Target::len).sum()
    }

    pub fn initial_values(&self) -> Vec<f64> {
        self.parameters.iter().map(|&p| self.stack.parameter_value(p)).collect()
    }

    /// Lower and upper bounds of every parameter.
    pub fn bounds(&self) -> (Vec<f64>, Vec<f64>) {
        self.parameters
            .iter()
            .map(|&p| self.stack.parameter_bounds(p))
            .unzip()
    }

    pub fn target_values(&self) -> Vec<f64> {
        self.targets.iter().flat_map(|t| t.values.iter().copied()).collect()
    }

    pub fn target_deltas(&self) -> Vec<f64> {
        self.targets.iter().flat_map(|t| t.deltas.iter().copied()).collect()
    }

    /// One inequality per point.
    pub fn target_inequalities(&self) -> Vec<Inequality> {
        self.targets
            .iter()
            .flat_map(|t| std::iter::repeat(t.inequality).take(t.len()))
            .collect()
    }

    /// Write `a` into the stack and refresh every workspace.
    pub fn apply(&mut self, a: &Array1<f64>) -> Result<(), OpticsError> {
        if self.current.as_ref() == Some(a) {
            return Ok(());
        }
        self.current = None;
        for (&parameter, &value) in self.parameters.iter().zip(a.iter()) {
            self.stack.set_parameter(parameter, value)?;
        }
        for workspace in &mut self.workspaces {
            workspace.update(&self.stack)?;
        }
        self.current = Some(a.clone());
        Ok(())
    }

    /// A solver over this refinement, with bounds and inequalities set.
    pub fn into_solver(self) -> Result<LevenbergMarquardt<Self>, OptimizerError> {
        let a = self.initial_values();
        let (a_min, a_max) = self.bounds();
        let yi = self.target_values();
        let sigma = self.target_deltas();
        let inequalities = self.target_inequalities();
        let mut solver = LevenbergMarquardt::new(self, a, yi, sigma)?;
        solver.set_limits(a_min, a_max)?;
        solver.set_inequalities(inequalities)?;
        Ok(solver)
    }

    /// The stack at parameters `a`.
    pub fn into_stack(mut self, a: &Array1<f64>) -> Result<Stack, OpticsError> {
        for (&parameter, &value) in self.parameters.iter().zip(a.iter()) {
            self.stack.set_parameter(parameter, value)?;
        }
        Ok(self.stack)
    }
}

fn model_error(error: OpticsError) -> OptimizerError {
    OptimizerError::Model(Box::new(error))
}

impl CurveModel for Refinement {
    fn values(&mut self, a: &Array1<f64>) -> Result<Array1<f64>, OptimizerError> {
        self.apply(a).map_err(model_error)?;
        let mut values = Vec::with_capacity(self.nb_points());
        for (target, workspace) in self.targets.iter().zip(&self.workspaces) {
            let spectrum = workspace
                .value(target.kind, target.polarization)
                .map_err(model_error)?;
            values.extend_from_slice(spectrum.values());
        }
        Ok(Array1::from(values))
    }

    fn jacobian(&mut self, a: &Array1<f64>) -> Result<Array2<f64>, OptimizerError> {
        self.apply(a).map_err(model_error)?;
        let mut jacobian = Array2::zeros((self.parameters.len(), self.nb_points()));
        for (row, &parameter) in self.parameters.iter().enumerate() {
            let mut column = 0;
            for (target, workspace) in self.targets.iter().zip(self.workspaces.iter_mut()) {
                workspace
                    .set_parameter_derivative(&self.stack, parameter)
                    .map_err(model_error)?;
                let derivative = workspace
                    .derivative(target.kind, target.polarization)
                    .map_err(model_error)?;
                for (k, &d) in derivative.values().iter().enumerate() {
                    jacobian[[row, column + k]] = d;
                }
                column += target.len();
            }
        }
        debug!("Jacobian evaluated for {} parameters", self.parameters.len());
        Ok(jacobian)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::stack::Layer;
    use lamina_materials::{ConstantIndex, DispersionModel};

    fn constant(n: f64) -> Arc<dyn DispersionModel> {
        Arc::new(ConstantIndex::lossless(n))
    }

    fn one_layer(refine_thickness: bool) -> Stack {
        let mut stack = Stack::new(constant(1.0), constant(1.52));
        let mut layer = Layer::new(constant(2.0), 100.0);
        layer.refine_thickness = refine_thickness;
        stack.layers.push(layer);
        stack
    }

    fn reflectance_target() -> Target {
        Target::new(
            Quantity::Reflectance,
            0.0,
            Polarization::Unpolarized,
            vec![500.0, 600.0],
            vec![0.1, 0.1],
        )
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            Refinement::new(one_layer(true), vec![]),
            Err(ConfigurationError::NoTargets)
        ));
        assert!(matches!(
            Refinement::new(one_layer(false), vec![reflectance_target()]),
            Err(ConfigurationError::NoParameters)
        ));

        let mut phase = reflectance_target();
        phase.kind = Quantity::ReflectionPhase;
        assert!(matches!(
            Refinement::new(one_layer(true), vec![phase]),
            Err(ConfigurationError::PhaseNeedsPlane { target: 0, .. })
        ));

        let mut short = reflectance_target();
        short.values.pop();
        assert!(matches!(
            Refinement::new(one_layer(true), vec![short]),
            Err(ConfigurationError::LengthMismatch { what: "values", .. })
        ));

        let mut zero = reflectance_target();
        zero.deltas[1] = 0.0;
        assert!(matches!(
            Refinement::new(one_layer(true), vec![zero]),
            Err(ConfigurationError::InvalidDelta { index: 1, .. })
        ));

        let mut conflicting = one_layer(true);
        conflicting.layers[0].refine_index = true;
        conflicting.layers[0].preserve_ot = true;
        assert!(matches!(
            Refinement::new(conflicting, vec![reflectance_target()]),
            Err(ConfigurationError::ConflictingOpticalThickness(0))
        ));
    }

    #[test]
    fn test_layout_of_values_and_jacobian() {
        let mut stack = one_layer(true);
        stack.layers[0].refine_index = true;
        let mut transmission = reflectance_target();
        transmission.kind = Quantity::Transmittance;
        transmission.wavelengths.push(700.0);
        transmission.values.push(0.9);
        transmission.deltas.push(1.0);
        let targets = vec![reflectance_target(), transmission];
        let mut refinement = Refinement::new(stack, targets).unwrap();

        assert_eq!(refinement.initial_values(), vec![100.0, 2.0]);
        let (lower, upper) = refinement.bounds();
        assert_eq!(lower, vec![0.0, 1.0]);
        assert!(upper.iter().all(|u| u.is_infinite()));
        assert_eq!(refinement.target_inequalities().len(), 5);

        let a = Array1::from(refinement.initial_values());
        let values = refinement.values(&a).unwrap();
        let jacobian = refinement.jacobian(&a).unwrap();
        assert_eq!(values.len(), 5);
        assert_eq!(jacobian.dim(), (2, 5));

        // Lossless: R + T = 1, so dR = −dT at shared wavelengths.
        for k in 0..2 {
            assert!((jacobian[[0, k]] + jacobian[[0, 2 + k]]).abs() < 1e-12);
        }
    }
}
