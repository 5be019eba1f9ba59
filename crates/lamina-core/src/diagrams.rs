//! Depth profiles through a stack at one wavelength.
//!
//! The stack is sampled from the front surface towards the substrate. At a
//! depth `x` inside layer `i` the partial stack is the remaining `d_i − x` of
//! that layer followed by every layer behind it, i.e. `M_i(d_i − x)·post[i]`.

use std::sync::Arc;

use log::debug;
use num_complex::Complex64;

use crate::amplitude::RAndT;
use crate::matrices::Matrices;
use crate::spectrum::{ComplexSpectrum, Spectrum};
use crate::stack::{Stack, Workspace};
use crate::types::{DiagramPoint, Grid, IndexArray, OpticsError, Plane};

/// Admittance, circle and field intensity at `samples_per_layer` depths in
/// every layer, plus a final point at the substrate interface.
pub fn depth_profile(
    stack: &Stack,
    wavelength_nm: f64,
    angle_deg: f64,
    plane: Plane,
    samples_per_layer: usize,
) -> Result<Vec<DiagramPoint>, OpticsError> {
    if samples_per_layer == 0 {
        return Err(OpticsError::InvalidStack("samples_per_layer must be positive".to_string()));
    }
    let ws = Workspace::new(stack, &[wavelength_nm], angle_deg)?;
    let grid: Grid = Arc::clone(ws.grid());
    let pre_post = ws.pre_post();

    let mut points = Vec::with_capacity(stack.layers.len() * samples_per_layer + 1);
    let mut partial = Matrices::new(grid.clone());
    let mut remainder = Matrices::new(grid.clone());
    let mut depth = 0.0;

    for (i, layer) in stack.layers.iter().enumerate() {
        let n = IndexArray::from_material(layer.material.as_ref(), grid.clone())?;
        let step = layer.thickness / samples_per_layer as f64;
        for j in 0..samples_per_layer {
            let x = j as f64 * step;
            remainder.set_matrices(&n, layer.thickness - x, ws.sin2());
            partial.copy_from(&remainder);
            partial.multiply(pre_post.post(i));
            points.push(sample(&ws, &partial, depth + x, Some(i), plane));
        }
        depth += layer.thickness;
    }

    partial.set_unity();
    points.push(sample(&ws, &partial, depth, None, plane));
    debug!(
        "Depth profile at {wavelength_nm} nm: {} points over {depth} nm",
        points.len()
    );
    Ok(points)
}

fn sample(
    ws: &Workspace,
    partial: &Matrices,
    depth_nm: f64,
    layer: Option<usize>,
    plane: Plane,
) -> DiagramPoint {
    let grid = ws.grid().clone();
    let global = ws.pre_post().global();

    let mut admittance = ComplexSpectrum::new(grid.clone());
    admittance.calculate_admittance(partial, ws.substrate_index(), ws.sin2(), plane);

    let mut r_and_t = RAndT::new(grid.clone());
    r_and_t.calculate_r_and_t(partial, ws.medium_index(), ws.substrate_index(), ws.sin2());
    let mut circle = ComplexSpectrum::new(grid.clone());
    circle.calculate_circle(&r_and_t, plane);

    let mut field = Spectrum::new(grid);
    field.calculate_electric_field(
        partial,
        global,
        ws.medium_index(),
        ws.substrate_index(),
        ws.sin2(),
        plane,
    );

    let y: Complex64 = admittance.values()[0];
    let r: Complex64 = circle.values()[0];
    DiagramPoint {
        depth_nm,
        layer,
        admittance_re: y.re,
        admittance_im: y.im,
        circle_re: r.re,
        circle_im: r.im,
        field_intensity: field.values()[0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::Layer;
    use approx::assert_relative_eq;
    use lamina_materials::{ConstantIndex, DispersionModel};

    fn constant(n: f64) -> Arc<dyn DispersionModel> {
        Arc::new(ConstantIndex::lossless(n))
    }

    fn quarter_wave_stack() -> Stack {
        let mut stack = Stack::new(constant(1.0), constant(1.52));
        stack.layers.push(Layer::new(constant(2.0), 68.75));
        stack.layers.push(Layer::new(constant(1.46), 550.0 / (4.0 * 1.46)));
        stack
    }

    #[test]
    fn test_profile_shape_and_end_points() {
        let stack = quarter_wave_stack();
        let points = depth_profile(&stack, 550.0, 0.0, Plane::S, 10).unwrap();
        assert_eq!(points.len(), 21);
        assert_eq!(points[0].layer, Some(0));
        assert_eq!(points[20].layer, None);

        // At the substrate the admittance is the substrate index.
        assert_relative_eq!(points[20].admittance_re, 1.52, epsilon = 1e-12);
        assert_relative_eq!(points[20].admittance_im, 0.0, epsilon = 1e-12);

        // The first point sees the whole stack.
        let samples = stack.spectrum(&[550.0], 0.0, crate::types::Polarization::S).unwrap();
        let r = Complex64::new(points[0].circle_re, points[0].circle_im);
        assert_relative_eq!(r.norm_sqr(), samples[0].reflectance, epsilon = 1e-12);
    }

    #[test]
    fn test_field_at_front_is_one_plus_r() {
        let stack = quarter_wave_stack();
        let points = depth_profile(&stack, 550.0, 0.0, Plane::S, 4).unwrap();
        let r = Complex64::new(points[0].circle_re, points[0].circle_im);
        assert_relative_eq!(points[0].field_intensity, (1.0 + r).norm_sqr(), epsilon = 1e-10);
    }

    #[test]
    fn test_zero_samples_is_rejected() {
        let stack = quarter_wave_stack();
        assert!(depth_profile(&stack, 550.0, 0.0, Plane::S, 0).is_err());
    }
}
