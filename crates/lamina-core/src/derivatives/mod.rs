//! Analytic derivatives of every optical quantity with respect to one layer
//! parameter (thickness, index, or index at constant optical thickness).
//!
//! The pipeline for one parameter of layer `i` is:
//!
//! 1. `dMi` from [`Matrices::set_dmi_thickness`](crate::matrices::Matrices::set_dmi_thickness)
//!    or one of the index variants.
//! 2. `dM = pre[i] · dMi · post[i]` with [`PrePostMatrices`].
//! 3. `dr`, `dt` from `dM` and the stack-wide [`PsiMatrices`].
//! 4. `dR`, `dT`, `dA`, phase, GD and GDD derivatives on [`Spectrum`](crate::spectrum::Spectrum).
//!
//! Steps 2 to 4 cost O(1) per layer once the pre/post products and the ψ
//! coefficients are known, so a full Jacobian is linear in the number of
//! layers.

mod dm;
mod dphase;
mod dspectrum;
mod pre_post;
mod psi;

pub use pre_post::PrePostMatrices;
pub use psi::PsiMatrices;
