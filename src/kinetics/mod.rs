//! Mineral reaction kinetics
//!
//! - **`traits`**: the [`KineticModel`] trait, right-hand side of the ODE
//!   system integrated by [`crate::solver`]
//! - **`rates`**: rate-law evaluation (Arrhenius × activity powers × surface area)
//! - **`model`**: [`MineralKinetics`], mineral amounts coupled to an
//!   equilibrated fluid by operator splitting

pub mod model;
pub mod rates;
pub mod traits;

pub use model::MineralKinetics;
pub use traits::KineticModel;
