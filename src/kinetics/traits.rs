//! Kinetic model trait
//!
//! A kinetic model supplies the right-hand side of `dy/dt = f(t, y)`. It does
//! NOT integrate it (that's the solver's job): the model provides the
//! chemistry, the solver provides the numerics.

use crate::error::ModelError;
use nalgebra::DVector;

/// Trait for kinetic models
///
/// # Responsibility
///
/// Evaluates the rates of change of the kinetic variables at a given time
/// and state. Rate evaluation may fail (for instance when the underlying
/// equilibrium calculation does not converge); the integrator treats every
/// [`ModelError`] as a reason to retry with a smaller step.
///
/// # Thread safety
///
/// Models are shared between threads behind `Arc`, hence `Send + Sync`.
/// Interior caches must use synchronized cells.
pub trait KineticModel: Send + Sync {
    /// Number of kinetic variables.
    fn dimension(&self) -> usize;

    /// Rates of change `dy/dt` at time `t` (s) and state `y`.
    ///
    /// # Errors
    ///
    /// Any [`ModelError`]; the step that requested the evaluation is rejected.
    fn rates(&self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ModelError>;

    /// State at the start of the run.
    fn initial_state(&self) -> DVector<f64>;

    /// Map a candidate state back onto the model domain, in place.
    ///
    /// Called on every candidate (and on the midpoint of a doubled step)
    /// before [`KineticModel::check_state`]. Models whose variables stop at a
    /// bound, like a mineral amount reaching zero, clip here so that a step
    /// crossing the bound lands on it instead of being rejected. The default
    /// leaves the state unchanged.
    fn project_state(&self, _y: &mut DVector<f64>) {}

    /// Check that a candidate state lies in the model domain.
    ///
    /// Called by the integrator on every candidate before it is accepted.
    /// The default only rejects NaN and infinity.
    fn check_state(&self, y: &DVector<f64>) -> Result<(), ModelError> {
        match y.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(ModelError::OutOfDomain(format!("component {} is not finite", i))),
            None => Ok(()),
        }
    }

    /// Name of the model (used for display and logging).
    fn name(&self) -> &str;

    /// Description of the model (optional).
    fn description(&self) -> Option<&str> {
        None
    }
}
