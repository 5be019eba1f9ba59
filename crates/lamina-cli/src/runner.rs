//! Job runner: ties together configuration, materials, the thin-film engine
//! and the solver.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;

use lamina_core::stack::{Layer, Quantity, Stack, StackParameter};
use lamina_core::types::{DiagramPoint, Plane, Polarization, SpectralSample};
use lamina_core::{Refinement, Target};
use lamina_materials::{Cauchy, ConstantIndex, DispersionModel, TabulatedIndex};
use lamina_solver::{Inequality, Status};

use crate::config::{
    JobConfig, MaterialConfig, PointValues, PolarizationSpec, TargetConfig, WavelengthSpec,
};

/// Outcome of an optimization run.
pub struct OptimizationOutput {
    pub stack: Stack,
    pub parameters: Vec<(StackParameter, f64, f64)>,
    pub status: Status,
    pub chi_2: f64,
    pub iterations: usize,
    pub correlation: Option<ndarray::Array2<f64>>,
}

/// Expand a wavelength specification into a grid.
pub fn wavelengths(spec: &WavelengthSpec) -> Result<Vec<f64>> {
    let wavelengths = match spec {
        WavelengthSpec::Range { range, points } => {
            let start = range[0];
            let end = range[1];
            (0..*points)
                .map(|i| start + (end - start) * i as f64 / (*points - 1).max(1) as f64)
                .collect::<Vec<_>>()
        }
        WavelengthSpec::List { values } => values.clone(),
    };
    if wavelengths.is_empty() {
        bail!("Wavelength grid is empty");
    }
    Ok(wavelengths)
}

pub fn polarization(spec: &PolarizationSpec) -> Result<Polarization> {
    match spec {
        PolarizationSpec::Angle(psi) => Ok(Polarization::Other(*psi)),
        PolarizationSpec::Name(name) => match name.to_ascii_lowercase().as_str() {
            "s" => Ok(Polarization::S),
            "p" => Ok(Polarization::P),
            "unpolarized" | "unpolarised" => Ok(Polarization::Unpolarized),
            other => bail!(
                "Unknown polarization '{other}'. \
                 Valid values: s, p, unpolarized, or an angle in degrees"
            ),
        },
    }
}

fn plane(name: &str) -> Result<Plane> {
    match name.to_ascii_lowercase().as_str() {
        "s" => Ok(Plane::S),
        "p" => Ok(Plane::P),
        other => bail!("Diagrams need s or p polarization, got '{other}'"),
    }
}

fn material(config: &MaterialConfig, name: &str) -> Result<Arc<dyn DispersionModel>> {
    Ok(match config {
        MaterialConfig::Constant { n, k } => Arc::new(ConstantIndex::new(name, *n, *k)),
        MaterialConfig::Cauchy { a, b, c, k } => Arc::new(Cauchy::new(name, *a, *b, *c, *k)),
        MaterialConfig::Tabulated { wavelengths, n, k } => Arc::new(
            TabulatedIndex::new(name, wavelengths.clone(), n.clone(), k.clone())
                .with_context(|| format!("Material '{name}'"))?,
        ),
    })
}

/// Build the stack described by the `[stack]` table.
pub fn build_stack(job: &JobConfig) -> Result<Stack> {
    let config = &job.stack;
    let medium = material(&config.medium, "medium")?;
    let substrate = material(&config.substrate, "substrate")?;
    let mut stack = Stack::new(medium, substrate);
    if let Some(exit) = &config.exit {
        stack.exit = material(exit, "exit")?;
    }
    stack.substrate_thickness = config.substrate_thickness;
    stack.consider_backside = config.consider_backside;
    stack.reference_wavelength = config.reference_wavelength;

    for (i, layer_config) in config.layers.iter().enumerate() {
        let name = layer_config
            .name
            .clone()
            .unwrap_or_else(|| format!("layer {}", i + 1));
        let model = material(&layer_config.material, &name)?;
        let mut layer = Layer::new(model, layer_config.thickness);
        layer.refine_thickness = layer_config.refine_thickness;
        layer.refine_index = layer_config.refine_index;
        layer.preserve_ot = layer_config.preserve_ot;
        stack.layers.push(layer);
    }
    stack.validate()?;
    Ok(stack)
}

fn quantity(kind: &str) -> Result<Quantity> {
    Ok(match kind {
        "reflectance" => Quantity::Reflectance,
        "transmittance" => Quantity::Transmittance,
        "absorptance" => Quantity::Absorptance,
        "reflection_phase" => Quantity::ReflectionPhase,
        "transmission_phase" => Quantity::TransmissionPhase,
        "reflection_gd" => Quantity::ReflectionGd,
        "transmission_gd" => Quantity::TransmissionGd,
        "reflection_gdd" => Quantity::ReflectionGdd,
        "transmission_gdd" => Quantity::TransmissionGdd,
        other => bail!(
            "Unknown target kind '{other}'. Valid kinds: reflectance, transmittance, \
             absorptance, reflection_phase, transmission_phase, reflection_gd, \
             transmission_gd, reflection_gdd, transmission_gdd"
        ),
    })
}

fn inequality(name: &str) -> Result<Inequality> {
    Ok(match name {
        "equal" => Inequality::Equal,
        "smaller" => Inequality::Smaller,
        "larger" => Inequality::Larger,
        other => bail!("Unknown inequality '{other}'. Valid values: equal, smaller, larger"),
    })
}

fn expand(values: &PointValues, len: usize) -> Vec<f64> {
    match values {
        PointValues::Constant(v) => vec![*v; len],
        PointValues::List(values) => values.clone(),
    }
}

pub fn build_target(config: &TargetConfig) -> Result<Target> {
    let wavelengths = wavelengths(&config.wavelengths)?;
    let len = wavelengths.len();
    let mut target = Target::new(
        quantity(&config.kind)?,
        config.angle,
        polarization(&config.polarization)?,
        wavelengths,
        expand(&config.values, len),
    );
    target.deltas = expand(&config.deltas, len);
    target.inequality = inequality(&config.inequality)?;
    Ok(target)
}

/// Compute the spectrum of the configured stack.
pub fn run_spectrum(job: &JobConfig) -> Result<Vec<SpectralSample>> {
    let stack = build_stack(job)?;
    let wavelengths = wavelengths(&job.simulation.wavelengths)?;
    let polarization = polarization(&job.simulation.polarization)?;
    println!(
        "  {} layers, {} wavelengths, angle {}°, {:?}",
        stack.layers.len(),
        wavelengths.len(),
        job.simulation.angle,
        polarization
    );
    let samples = stack.spectrum(&wavelengths, job.simulation.angle, polarization)?;
    Ok(samples)
}

/// Refine the flagged parameters against the configured targets.
pub fn run_optimization(job: &JobConfig, cancel: &AtomicBool) -> Result<OptimizationOutput> {
    let stack = build_stack(job)?;
    let targets = job
        .targets
        .iter()
        .enumerate()
        .map(|(i, t)| build_target(t).with_context(|| format!("Target {}", i + 1)))
        .collect::<Result<Vec<_>>>()?;

    let refinement = Refinement::new(stack, targets)?;
    let parameters = refinement.parameters().to_vec();
    let initial = refinement.initial_values();
    println!(
        "  {} parameters, {} target points",
        parameters.len(),
        refinement.nb_points()
    );

    let optimizer = &job.optimizer;
    let mut solver = refinement.into_solver()?;
    solver.set_stop_criteria(
        optimizer.min_gradient,
        optimizer.acceptable_chi_2,
        optimizer.min_chi_2_change,
    );
    solver.prepare()?;
    println!("  Initial chi² = {:.6e}", solver.chi_2());

    let status = solver.go(optimizer.max_iterations, cancel)?;
    let iterations = solver.stats().nb_df_eval;
    info!("Optimization stopped after {iterations} iterations: {status}");
    println!("  [{iterations}] chi² = {:.6e} ({status})", solver.chi_2());

    let chi_2 = solver.chi_2();
    let correlation = match solver.correlation_matrix() {
        Ok(matrix) => Some(matrix),
        Err(e) => {
            eprintln!("Warning: correlation matrix unavailable: {e}");
            None
        }
    };
    let a = solver.parameters().clone();
    let stack = solver.into_model().into_stack(&a)?;

    let parameters = parameters
        .into_iter()
        .zip(initial)
        .zip(a.iter().copied())
        .map(|((p, before), after)| (p, before, after))
        .collect();

    Ok(OptimizationOutput {
        stack,
        parameters,
        status,
        chi_2,
        iterations,
        correlation,
    })
}

/// Depth profile of the configured stack at one wavelength.
pub fn run_diagram(job: &JobConfig, wavelength_nm: f64) -> Result<Vec<DiagramPoint>> {
    let stack = build_stack(job)?;
    let plane = plane(&job.diagram.polarization)?;
    let points = lamina_core::diagrams::depth_profile(
        &stack,
        wavelength_nm,
        job.simulation.angle,
        plane,
        job.diagram.samples_per_layer,
    )?;
    Ok(points)
}

fn create_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path).with_context(|| format!("Cannot create {}", path.display()))
}

fn write_header(file: &mut std::fs::File, title: &str, job: &JobConfig) -> Result<()> {
    writeln!(file, "# Lamina thin-film engine: {title}")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# angle_deg: {}", job.simulation.angle)?;
    writeln!(file, "# layers: {}", job.stack.layers.len())?;
    for (i, layer) in job.stack.layers.iter().enumerate() {
        writeln!(
            file,
            "# layer {}: {}, thickness={} nm",
            i + 1,
            layer.name.as_deref().unwrap_or("-"),
            layer.thickness
        )?;
    }
    writeln!(file, "#")?;
    Ok(())
}

/// Write R/T/A spectra to a CSV file with a metadata header.
pub fn write_spectra_csv(samples: &[SpectralSample], path: &Path, job: &JobConfig) -> Result<()> {
    let mut file = create_file(path)?;
    write_header(&mut file, "Spectra", job)?;
    writeln!(file, "wavelength_nm,reflectance,transmittance,absorptance")?;
    for s in samples {
        writeln!(
            file,
            "{:.4},{:.8},{:.8},{:.8}",
            s.wavelength_nm, s.reflectance, s.transmittance, s.absorptance
        )?;
    }
    println!("Spectra written to: {}", path.display());
    Ok(())
}

/// Write reflection phase, GD and GDD for both planes.
pub fn write_phase_csv(samples: &[SpectralSample], path: &Path, job: &JobConfig) -> Result<()> {
    let mut file = create_file(path)?;
    write_header(&mut file, "Reflection phase and dispersion", job)?;
    writeln!(file, "wavelength_nm,phase_s_deg,phase_p_deg,gd_s_fs,gd_p_fs,gdd_s_fs2,gdd_p_fs2")?;
    for s in samples {
        writeln!(
            file,
            "{:.4},{:.6},{:.6},{:.6e},{:.6e},{:.6e},{:.6e}",
            s.wavelength_nm, s.r_phase_s, s.r_phase_p, s.gd_s, s.gd_p, s.gdd_s, s.gdd_p
        )?;
    }
    println!("Phase written to: {}", path.display());
    Ok(())
}

/// Write spectra to a JSON file.
pub fn write_spectra_json(samples: &[SpectralSample], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(samples).context("JSON serialisation error")?;
    std::fs::write(path, json)?;
    println!("Spectra (JSON) written to: {}", path.display());
    Ok(())
}

/// Write a depth profile to a CSV file.
pub fn write_diagram_csv(
    points: &[DiagramPoint],
    wavelength_nm: f64,
    path: &Path,
    job: &JobConfig,
) -> Result<()> {
    let mut file = create_file(path)?;
    write_header(&mut file, "Depth profile", job)?;
    writeln!(file, "# wavelength_nm: {wavelength_nm}")?;
    writeln!(
        file,
        "depth_nm,layer,admittance_re,admittance_im,circle_re,circle_im,field_intensity"
    )?;
    for p in points {
        let layer = p.layer.map_or_else(|| "substrate".to_string(), |i| (i + 1).to_string());
        writeln!(
            file,
            "{:.4},{},{:.8},{:.8},{:.8},{:.8},{:.8}",
            p.depth_nm,
            layer,
            p.admittance_re,
            p.admittance_im,
            p.circle_re,
            p.circle_im,
            p.field_intensity
        )?;
    }
    println!("Diagram written to: {}", path.display());
    Ok(())
}

/// Print the refined stack as a `[stack]`-style summary.
pub fn print_optimized_stack(output: &OptimizationOutput) {
    println!();
    println!(
        "Status: {} after {} iterations, chi² = {:.6e}",
        output.status, output.iterations, output.chi_2
    );
    println!();
    println!("# Refined parameters");
    for (parameter, before, after) in &output.parameters {
        println!("#   {parameter}: {before:.6} -> {after:.6}");
    }
    println!();
    for (i, layer) in output.stack.layers.iter().enumerate() {
        println!("{}", layer_summary(i, layer));
    }
    if let Some(correlation) = &output.correlation {
        println!("# Correlation matrix");
        for row in correlation.rows() {
            let line = row.iter().map(|c| format!("{c:+.4}")).collect::<Vec<_>>().join(" ");
            println!("#   {line}");
        }
    }
}

/// TOML-like block describing one refined layer.
fn layer_summary(i: usize, layer: &Layer) -> String {
    let material = &layer.material;
    format!(
        "[[stack.layer]]  # {}\nmaterial = \"{}\"\n{} = {:.6}\nthickness = {:.6}\n",
        i + 1,
        material.name(),
        material.parameter_name(),
        material.parameter(),
        layer.thickness
    )
}
