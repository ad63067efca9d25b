//! Numerical solver traits and types
//!
//! # Design
//!
//! - Central enum [`SolverType`] defines how time steps are chosen
//! - [`SolverConfiguration`] wraps it with the limits shared by every type
//! - [`SimulationResult`] carries the accepted trajectory, the run status and
//!   free-form metadata
//! - [`Solver`] is the one-step method; stepping policy lives in
//!   [`crate::solver::integrate`]

use crate::error::{ModelError, SolverError};
use crate::kinetics::KineticModel;
use crate::solver::integrate::{CancelFlag, integrate};
use crate::solver::scenario::Scenario;
use nalgebra::DVector;
use serde::Deserialize;
use std::collections::HashMap;

// =================================================================================================
// Solver type
// =================================================================================================

/// How the integrator chooses its time steps
///
/// # Examples
///
/// ```rust
/// use kinpath::solver::SolverType;
///
/// let adaptive = SolverType::Adaptive {
///     relative_tolerance: 1e-4,
///     absolute_tolerance: 1e-9,
///     initial_step: 1.0,
///     min_step: 1e-6,
///     max_step: f64::INFINITY,
/// };
/// assert!(adaptive.validate().is_ok());
///
/// let fixed = SolverType::FixedStep { time_steps: 0 };
/// assert!(fixed.validate().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SolverType {
    /// Step-doubling error control
    ///
    /// # Parameters
    /// - `relative_tolerance`, `absolute_tolerance`: local error bound
    ///   `|e| ≤ atol + rtol·|y|` per component
    /// - `initial_step`: first trial step (s)
    /// - `min_step`: the run fails when a rejected step would go below this (s)
    /// - `max_step`: upper bound on accepted steps (s)
    Adaptive {
        relative_tolerance: f64,
        absolute_tolerance: f64,
        initial_step: f64,
        min_step: f64,
        max_step: f64,
    },

    /// Uniform steps `dt = (end − start) / time_steps`
    ///
    /// A rejected step is halved and retried, then the nominal step resumes.
    FixedStep { time_steps: usize },
}

impl SolverType {
    /// Get name identifier
    pub fn name(&self) -> &str {
        match self {
            SolverType::Adaptive { .. } => "Adaptive",
            SolverType::FixedStep { .. } => "FixedStep",
        }
    }

    /// Validate that parameters are meaningful
    pub fn validate(&self) -> Result<(), String> {
        match self {
            SolverType::Adaptive { relative_tolerance, absolute_tolerance, initial_step, min_step, max_step } => {
                if !(*relative_tolerance > 0.0) || !relative_tolerance.is_finite() {
                    return Err("Relative tolerance must be positive".to_string());
                }
                if *absolute_tolerance < 0.0 || !absolute_tolerance.is_finite() {
                    return Err("Absolute tolerance cannot be negative".to_string());
                }
                if !(*min_step > 0.0) || !min_step.is_finite() {
                    return Err("Minimum step must be positive".to_string());
                }
                if !(*max_step >= *min_step) {
                    return Err("Maximum step must not be smaller than minimum step".to_string());
                }
                if !(*initial_step >= *min_step) || !initial_step.is_finite() {
                    return Err("Initial step must be finite and not smaller than minimum step".to_string());
                }
                Ok(())
            }
            SolverType::FixedStep { time_steps } => {
                if *time_steps == 0 {
                    return Err("TimeSteps must be greater than 0".to_string());
                }
                Ok(())
            }
        }
    }
}

// =================================================================================================
// Solver configuration
// =================================================================================================

/// Configuration for the time integrator
///
/// # Examples
///
/// ```rust
/// use kinpath::solver::SolverConfiguration;
///
/// let config = SolverConfiguration::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_retries, 25);
///
/// let config = SolverConfiguration::fixed_step(1000);
/// assert_eq!(config.solver_type.name(), "FixedStep");
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverConfiguration {
    /// Type of step control and its parameters
    pub solver_type: SolverType,

    /// Consecutive rejections tolerated before the run fails
    pub max_retries: usize,

    /// Upper bound on accepted + rejected steps
    pub max_steps: usize,
}

impl Default for SolverConfiguration {
    fn default() -> Self {
        Self::adaptive(1e-4, 1e-9)
    }
}

impl SolverConfiguration {
    /// Create a new configuration with a given solver type
    pub fn new(solver_type: SolverType) -> Self {
        Self { solver_type, max_retries: 25, max_steps: 1_000_000 }
    }

    /// Create an adaptive configuration with default step bounds
    pub fn adaptive(relative_tolerance: f64, absolute_tolerance: f64) -> Self {
        Self::new(SolverType::Adaptive {
            relative_tolerance,
            absolute_tolerance,
            initial_step: 1.0,
            min_step: 1e-6,
            max_step: f64::INFINITY,
        })
    }

    /// Create a fixed-step configuration
    pub fn fixed_step(time_steps: usize) -> Self {
        Self::new(SolverType::FixedStep { time_steps })
    }

    /// Builder pattern: set the retry limit
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_steps == 0 {
            return Err("Maximum number of steps must be positive".to_string());
        }
        self.solver_type.validate()
    }
}

// =================================================================================================
// Simulation result
// =================================================================================================

/// How a run ended
#[derive(Clone, Debug, PartialEq)]
pub enum RunStatus {
    /// The end time was reached.
    Completed,
    /// Integration stopped early; the trajectory holds every accepted step.
    Failed(SolverError),
}

impl RunStatus {
    /// Whether the run reached its end time.
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

/// Result of an integration
///
/// `time_points[i]` is the time of `trajectory[i]`. The first entry is always
/// the initial condition; the trajectory is a prefix of the requested run
/// when the status is [`RunStatus::Failed`].
#[derive(Clone, Debug)]
pub struct SimulationResult {
    /// Accepted times (s)
    pub time_points: Vec<f64>,

    /// Accepted states
    pub trajectory: Vec<DVector<f64>>,

    /// Last accepted state
    pub final_state: DVector<f64>,

    /// Free-form run information (solver name, step counts...)
    pub metadata: HashMap<String, String>,

    /// How the run ended
    pub status: RunStatus,

    /// Accepted steps
    pub accepted: usize,

    /// Rejected steps
    pub rejected: usize,
}

impl SimulationResult {
    /// Create a completed result
    pub fn new(time_points: Vec<f64>, trajectory: Vec<DVector<f64>>, final_state: DVector<f64>) -> Self {
        Self {
            time_points,
            trajectory,
            final_state,
            metadata: HashMap::new(),
            status: RunStatus::Completed,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Add a metadata entry
    pub fn add_metadata(&mut self, key: &str, value: &str) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    /// Get a metadata entry
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Number of stored states
    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    /// Whether nothing was stored
    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    /// Time of the last accepted state
    pub fn final_time(&self) -> f64 {
        self.time_points.last().copied().unwrap_or(0.0)
    }
}

// =================================================================================================
// Solver trait
// =================================================================================================

/// One-step method for `dy/dt = f(t, y)`
///
/// Implementors only provide [`Solver::step`]; error estimation and the full
/// integration loop are provided.
pub trait Solver: Send + Sync {
    /// Advance `y` from `t` to `t + dt`.
    fn step(&self, model: &dyn KineticModel, t: f64, y: &DVector<f64>, dt: f64) -> Result<DVector<f64>, ModelError>;

    /// Order of accuracy of [`Solver::step`].
    fn order(&self) -> u32;

    /// Name of the method
    fn name(&self) -> &'static str;

    /// Advance with a local error estimate by step doubling.
    ///
    /// One step of `dt` gives `y1`, two steps of `dt/2` give `y2`;
    /// Richardson extrapolation estimates the error of `y2` as
    /// `(y2 − y1) / (2^p − 1)`. Returns `(y2, error)`.
    ///
    /// Both candidates and the midpoint go through
    /// [`KineticModel::project_state`], so two candidates clipped to the same
    /// bound carry no error.
    fn step_with_error(
        &self,
        model: &dyn KineticModel,
        t: f64,
        y: &DVector<f64>,
        dt: f64,
    ) -> Result<(DVector<f64>, DVector<f64>), ModelError> {
        let mut full = self.step(model, t, y, dt)?;
        let mut half = self.step(model, t, y, dt / 2.0)?;
        model.project_state(&mut full);
        model.project_state(&mut half);
        let mut double = self.step(model, t + dt / 2.0, &half, dt / 2.0)?;
        model.project_state(&mut double);

        let scale = 2f64.powi(self.order() as i32) - 1.0;
        let error = (&double - &full) / scale;
        Ok((double, error))
    }

    /// Integrate a scenario without sampling or cancellation.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidConfiguration`] if the configuration or the
    /// scenario is rejected. Failures during the run are reported in
    /// [`SimulationResult::status`].
    fn solve(&self, scenario: &Scenario, config: &SolverConfiguration) -> Result<SimulationResult, SolverError> {
        integrate(self, scenario, config, &CancelFlag::new(), &mut |_, _| Ok(()))
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = SolverConfiguration::default();
        assert!(config.validate().is_ok());
        match config.solver_type {
            SolverType::Adaptive { relative_tolerance, absolute_tolerance, initial_step, min_step, max_step } => {
                assert_eq!(relative_tolerance, 1e-4);
                assert_eq!(absolute_tolerance, 1e-9);
                assert_eq!(initial_step, 1.0);
                assert_eq!(min_step, 1e-6);
                assert!(max_step.is_infinite());
            }
            other => panic!("unexpected solver type {:?}", other),
        }
        assert_eq!(config.max_steps, 1_000_000);
    }

    #[test]
    fn test_invalid_adaptive_parameters() {
        let mut config = SolverConfiguration::adaptive(0.0, 1e-9);
        assert!(config.validate().is_err());

        config = SolverConfiguration::adaptive(1e-4, -1.0);
        assert!(config.validate().is_err());

        config = SolverConfiguration::new(SolverType::Adaptive {
            relative_tolerance: 1e-4,
            absolute_tolerance: 1e-9,
            initial_step: 1.0,
            min_step: 10.0,
            max_step: 5.0,
        });
        assert!(config.validate().unwrap_err().contains("Maximum step"));
    }

    #[test]
    fn test_fixed_step_validation() {
        assert!(SolverConfiguration::fixed_step(10).validate().is_ok());
        assert!(SolverConfiguration::fixed_step(0).validate().is_err());
    }

    #[test]
    fn test_solver_type_from_toml() {
        let parsed: SolverType = toml::from_str(
            "type = \"adaptive\"\nrelative_tolerance = 1e-6\nabsolute_tolerance = 1e-12\ninitial_step = 0.5\nmin_step = 1e-8\nmax_step = 3600.0\n",
        )
        .unwrap();
        assert_eq!(parsed.name(), "Adaptive");

        let parsed: SolverType = toml::from_str("type = \"fixed_step\"\ntime_steps = 100\n").unwrap();
        assert_eq!(parsed, SolverType::FixedStep { time_steps: 100 });
    }

    #[test]
    fn test_result_metadata() {
        let mut result = SimulationResult::new(vec![0.0], vec![DVector::zeros(1)], DVector::zeros(1));
        result.add_metadata("solver", "RK4");
        assert_eq!(result.get_metadata("solver"), Some("RK4"));
        assert_eq!(result.len(), 1);
        assert!(result.status.is_success());
        assert_eq!(result.final_time(), 0.0);
    }
}
