//! TOML configuration deserialisation for thin-film jobs.

use serde::Deserialize;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub simulation: SimulationConfig,
    pub stack: StackConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub diagram: DiagramConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Spectral calculation parameters.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    pub wavelengths: WavelengthSpec,
    /// Angle of incidence in degrees (default: 0).
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_polarization")]
    pub polarization: PolarizationSpec,
}

fn default_polarization() -> PolarizationSpec {
    PolarizationSpec::Name("unpolarized".into())
}

/// Wavelength specification: either a range or explicit list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WavelengthSpec {
    Range { range: [f64; 2], points: usize },
    List { values: Vec<f64> },
}

/// `"s"`, `"p"`, `"unpolarized"`, or a polarization angle in degrees.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PolarizationSpec {
    Angle(f64),
    Name(String),
}

/// Dispersion model of a medium or layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MaterialConfig {
    Constant {
        n: f64,
        #[serde(default)]
        k: f64,
    },
    Cauchy {
        a: f64,
        #[serde(default)]
        b: f64,
        #[serde(default)]
        c: f64,
        #[serde(default)]
        k: f64,
    },
    Tabulated {
        wavelengths: Vec<f64>,
        n: Vec<f64>,
        k: Vec<f64>,
    },
}

/// The filter: media, substrate and layers from the incidence side.
#[derive(Debug, Deserialize)]
pub struct StackConfig {
    pub medium: MaterialConfig,
    pub substrate: MaterialConfig,
    /// Medium behind the substrate (default: same as `medium`).
    pub exit: Option<MaterialConfig>,
    #[serde(default = "default_substrate_thickness")]
    pub substrate_thickness: f64,
    #[serde(default)]
    pub consider_backside: bool,
    #[serde(default = "default_reference_wavelength")]
    pub reference_wavelength: f64,
    #[serde(default, rename = "layer")]
    pub layers: Vec<LayerConfig>,
}

fn default_substrate_thickness() -> f64 {
    1e6
}
fn default_reference_wavelength() -> f64 {
    550.0
}

#[derive(Debug, Deserialize)]
pub struct LayerConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub material: MaterialConfig,
    /// Physical thickness in nm.
    pub thickness: f64,
    #[serde(default)]
    pub refine_thickness: bool,
    #[serde(default)]
    pub refine_index: bool,
    #[serde(default)]
    pub preserve_ot: bool,
}

/// A scalar applied to every point, or one value per point.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PointValues {
    Constant(f64),
    List(Vec<f64>),
}

/// A refinement target.
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// `reflectance`, `transmittance`, `absorptance`, `reflection_phase`,
    /// `transmission_phase`, `reflection_gd`, `transmission_gd`,
    /// `reflection_gdd` or `transmission_gdd`.
    pub kind: String,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_polarization")]
    pub polarization: PolarizationSpec,
    pub wavelengths: WavelengthSpec,
    pub values: PointValues,
    #[serde(default = "default_delta")]
    pub deltas: PointValues,
    /// `equal`, `smaller` or `larger` (default: `equal`).
    #[serde(default = "default_inequality")]
    pub inequality: String,
}

fn default_delta() -> PointValues {
    PointValues::Constant(1.0)
}
fn default_inequality() -> String {
    "equal".into()
}

/// Stop criteria of the Levenberg-Marquardt solver.
#[derive(Debug, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_min_gradient")]
    pub min_gradient: f64,
    #[serde(default)]
    pub acceptable_chi_2: f64,
    #[serde(default = "default_min_chi_2_change")]
    pub min_chi_2_change: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            min_gradient: default_min_gradient(),
            acceptable_chi_2: 0.0,
            min_chi_2_change: default_min_chi_2_change(),
        }
    }
}

fn default_max_iterations() -> usize {
    100
}
fn default_min_gradient() -> f64 {
    1e-10
}
fn default_min_chi_2_change() -> f64 {
    1e-10
}

/// Depth-profile settings.
#[derive(Debug, Deserialize)]
pub struct DiagramConfig {
    #[serde(default = "default_samples_per_layer")]
    pub samples_per_layer: usize,
    /// `"s"` or `"p"` (default: `"s"`).
    #[serde(default = "default_plane")]
    pub polarization: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            samples_per_layer: default_samples_per_layer(),
            polarization: default_plane(),
        }
    }
}

fn default_samples_per_layer() -> usize {
    20
}
fn default_plane() -> String {
    "s".into()
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save spectra as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_spectra: bool,
    /// Whether to also save spectra as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_spectra: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    Ok(config)
}
