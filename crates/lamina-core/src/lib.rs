//! # Lamina Core
//!
//! Characteristic-matrix optics for multilayer thin films, with analytic
//! derivatives of every optical quantity and a refinement front-end for the
//! Levenberg-Marquardt solver in `lamina-solver`.
//!
//! ## Architecture
//!
//! Every calculation runs on a shared wavelength [`Grid`](types::Grid). Layer
//! matrices ([`matrices`]) are multiplied into partial products
//! ([`derivatives::PrePostMatrices`]), turned into amplitudes
//! ([`amplitude`]) and then into intensities, phases and dispersion
//! ([`spectrum`]). A [`stack::Workspace`] owns all of these buffers for one
//! stack on one grid at one angle.
//!
//! ## Modules
//!
//! - [`types`]: grids, index arrays, polarization and output records.
//! - [`matrices`]: per-wavelength 2×2 characteristic matrices.
//! - [`amplitude`]: `r` and `t` for both planes, forward and reverse.
//! - [`spectrum`]: R/T/A, backside, phase, GD, GDD and diagram primitives.
//! - [`derivatives`]: `dM`, ψ coefficients and derivative spectra.
//! - [`stack`]: the stack model and [`stack::Workspace`].
//! - [`diagrams`]: depth profiles at one wavelength.
//! - [`refinement`]: targets and the [`lamina_solver::CurveModel`] adapter.

pub mod amplitude;
pub mod derivatives;
pub mod diagrams;
pub mod matrices;
pub mod refinement;
pub mod spectrum;
pub mod stack;
pub mod types;

pub use refinement::{ConfigurationError, Refinement, Target};
pub use stack::{Layer, Quantity, Stack, StackParameter, Workspace};
pub use types::{DiagramPoint, OpticsError, Plane, Polarization, SpectralSample};
