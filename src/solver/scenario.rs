//! Simulation scenario definition
//!
//! A scenario combines a kinetic model with the time interval to cover.
use crate::kinetics::KineticModel;
use nalgebra::DVector;
use std::sync::Arc;

/// Simulation scenario
///
/// Defines a specific case to simulate:
/// - Kinetic model (equations)
/// - Time interval `[start, end]` (s)
/// - Initial state
///
/// # Design
///
/// The same scenario can be solved with different numerical methods.
/// This is the "WHAT to solve" (not "HOW to solve").
///
/// # Examples
///
/// ```rust,ignore
/// let scenario = Scenario::new(model, 0.0, 3600.0);
///
/// let euler = EulerSolver.solve(&scenario, &config)?;
/// let rk4 = RK4Solver.solve(&scenario, &config)?;
/// ```
#[derive(Clone)]
pub struct Scenario {
    /// Kinetic model (equations)
    pub model: Arc<dyn KineticModel>,

    /// Start time (s)
    pub start: f64,

    /// End time (s)
    pub end: f64,

    /// State at `start`
    pub initial: DVector<f64>,
}

impl Scenario {
    /// Create a scenario starting from the model's initial state
    pub fn new(model: Arc<dyn KineticModel>, start: f64, end: f64) -> Self {
        let initial = model.initial_state();
        Self { model, start, end, initial }
    }

    /// Replace the initial state
    pub fn with_initial(mut self, initial: DVector<f64>) -> Self {
        self.initial = initial;
        self
    }

    /// Verifying scenario content
    pub fn validate(&self) -> Result<(), String> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err("Start and end times must be finite".to_string());
        }
        if self.end < self.start {
            return Err(format!("End time {} precedes start time {}", self.end, self.start));
        }
        if self.initial.len() != self.model.dimension() {
            return Err(format!(
                "Initial state has {} components, model {} expects {}",
                self.initial.len(),
                self.model.name(),
                self.model.dimension()
            ));
        }
        if self.initial.iter().any(|v| !v.is_finite()) {
            return Err("Initial state contains NaN or Inf".to_string());
        }
        Ok(())
    }

    /// Get model name
    pub fn get_model_name(&self) -> &str {
        self.model.name()
    }

    /// Length of the time interval (s)
    pub fn span(&self) -> f64 {
        self.end - self.start
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.get_model_name())
            .field("dimension", &self.model.dimension())
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

// ================================================================================================
// Tests
// ================================================================================================
