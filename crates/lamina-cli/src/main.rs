//! Lamina command-line interface.
//!
//! Run thin-film jobs from TOML configuration files:
//! ```sh
//! lamina spectrum job.toml
//! lamina optimize job.toml -o results/
//! lamina diagram job.toml --wavelength 550
//! lamina validate job.toml
//! ```

mod config;
mod runner;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lamina")]
#[command(about = "Lamina: multilayer thin-film optics and refinement")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute R/T/A, phase, GD and GDD of the configured stack.
    Spectrum {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Refine the flagged layer parameters against the configured targets.
    Optimize {
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Admittance, circle and electric-field profiles at one wavelength.
    Diagram {
        config: PathBuf,
        /// Wavelength in nm.
        #[arg(short, long)]
        wavelength: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running it.
    Validate {
        config: PathBuf,
    },
}

fn write_spectra(
    job: &config::JobConfig,
    out_dir: &std::path::Path,
    samples: &[lamina_core::SpectralSample],
) -> anyhow::Result<()> {
    if job.output.save_spectra {
        runner::write_spectra_csv(samples, &out_dir.join("spectra.csv"), job)?;
        runner::write_phase_csv(samples, &out_dir.join("phase.csv"), job)?;
    }
    if job.output.save_json {
        runner::write_spectra_json(samples, &out_dir.join("spectra.json"))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Spectrum { config, output } => {
            println!("Lamina thin-film engine");
            println!("=======================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let samples = runner::run_spectrum(&job)?;
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            write_spectra(&job, &out_dir, &samples)?;

            println!("Spectrum complete.");
            Ok(())
        }
        Commands::Optimize { config, output } => {
            println!("Lamina refinement");
            println!("=================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_optimization(&job, &AtomicBool::new(false))?;
            runner::print_optimized_stack(&result);

            let wavelengths = runner::wavelengths(&job.simulation.wavelengths)?;
            let polarization = runner::polarization(&job.simulation.polarization)?;
            let samples = result
                .stack
                .spectrum(&wavelengths, job.simulation.angle, polarization)?;
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            write_spectra(&job, &out_dir, &samples)?;

            println!("Optimization complete.");
            Ok(())
        }
        Commands::Diagram {
            config,
            wavelength,
            output,
        } => {
            let job = config::load_config(&config)?;
            let points = runner::run_diagram(&job, wavelength)?;
            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));
            runner::write_diagram_csv(&points, wavelength, &out_dir.join("diagram.csv"), &job)?;
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let stack = runner::build_stack(&job)?;
            runner::wavelengths(&job.simulation.wavelengths)?;
            runner::polarization(&job.simulation.polarization)?;
            for (i, target) in job.targets.iter().enumerate() {
                runner::build_target(target).map_err(|e| e.context(format!("Target {}", i + 1)))?;
            }
            println!(
                "Configuration is valid: {} ({} layers, {} refinable parameters, {} targets)",
                config.display(),
                stack.layers.len(),
                stack.refinable_parameters().len(),
                job.targets.len()
            );
            Ok(())
        }
    }
}
