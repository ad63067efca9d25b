//! Integration loop
//!
//! Drives any [`Solver`] over a [`Scenario`]:
//!
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            │ cancelled? ── yes ──► Failed(Cancelled)      │
//!            │ t = end?   ── yes ──► Completed              │
//!            ▼                                              │
//!      trial step (t, y, dt) ──► candidate y'               │
//!            │                                              │
//!   project y' onto the model domain                        │
//!            │                                              │
//!   model error / non-finite / error > tol /                │
//!   out of domain / on_accept failed                        │
//!        │                       │                          │
//!       yes                      no                         │
//!        ▼                       ▼                          │
//!   dt ← dt/2, retries += 1   accept: t ← t + dt, y ← y'    │
//!   retries > max? ─► Failed  grow dt (adaptive only) ──────┘
//! ```
//!
//! Every accepted state is kept, so a failed or cancelled run still returns
//! the prefix it managed to compute.

use crate::error::{ModelError, SolverError};
use crate::solver::scenario::Scenario;
use crate::solver::traits::{RunStatus, SimulationResult, Solver, SolverConfiguration, SolverType};
use nalgebra::DVector;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

/// Relative slack for treating the remaining interval as one last step.
const END_SNAP: f64 = 1e-9;

/// Largest step growth after an accepted step.
const MAX_GROWTH: f64 = 2.0;

/// Safety factor of the step-size controller.
const SAFETY: f64 = 0.9;

// =================================================================================================
// Cancellation
// =================================================================================================

/// Shareable request to stop a run
///
/// Checked at the top of every step; a cancelled run returns the trajectory
/// accepted so far with a [`SolverError::Cancelled`] status.
///
/// ```rust
/// use kinpath::solver::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let handle = flag.clone();
/// handle.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// =================================================================================================
// Integration
// =================================================================================================

/// Scaled local error: `max_i |e_i| / (atol + rtol · max(|y_i|, |y'_i|))`.
///
/// Values above 1 mean the step is too inaccurate.
fn error_norm(error: &DVector<f64>, y: &DVector<f64>, y_new: &DVector<f64>, rtol: f64, atol: f64) -> f64 {
    let mut norm: f64 = 0.0;
    for i in 0..error.len() {
        let scale = atol + rtol * y[i].abs().max(y_new[i].abs());
        let e = error[i].abs();
        let ratio = if scale > 0.0 {
            e / scale
        } else if e == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        norm = norm.max(ratio);
    }
    norm
}

/// Integrate `scenario` with `solver`.
///
/// `on_accept` is called with every candidate `(t, y)` that passed the
/// solver's own checks; returning an error rejects the step like any other
/// failure. The path driver uses it to re-equilibrate and sample.
///
/// # Errors
///
/// Only [`SolverError::InvalidConfiguration`]: run failures end up in
/// [`SimulationResult::status`] with the partial trajectory.
pub fn integrate<S: Solver + ?Sized>(
    solver: &S,
    scenario: &Scenario,
    config: &SolverConfiguration,
    cancel: &CancelFlag,
    on_accept: &mut dyn FnMut(f64, &DVector<f64>) -> Result<(), ModelError>,
) -> Result<SimulationResult, SolverError> {
    // ====== Step 1: Validation ======

    config.validate().map_err(SolverError::InvalidConfiguration)?;
    scenario.validate().map_err(SolverError::InvalidConfiguration)?;

    // ====== Step 2: Setup ======

    let model = scenario.model.as_ref();
    let end = scenario.end;
    let span = scenario.span();

    let (mut dt, nominal_step) = match config.solver_type {
        SolverType::Adaptive { initial_step, max_step, .. } => (initial_step.min(max_step), None),
        SolverType::FixedStep { time_steps } => {
            let dt = span / time_steps as f64;
            (dt, Some(dt))
        }
    };

    let mut t = scenario.start;
    let mut y = scenario.initial.clone();
    let mut time_points = vec![t];
    let mut trajectory = vec![y.clone()];

    let mut accepted = 0;
    let mut rejected = 0;
    let mut retries = 0;
    let mut steps = 0;

    // ====== Step 3: Time Integration ======

    let status = loop {
        if cancel.is_cancelled() {
            break RunStatus::Failed(SolverError::Cancelled { time: t });
        }
        if t >= end {
            break RunStatus::Completed;
        }
        if steps >= config.max_steps {
            break RunStatus::Failed(SolverError::KineticPathFailed {
                time: t,
                retries,
                reason: format!("step limit of {} reached", config.max_steps),
            });
        }
        steps += 1;

        let remaining = end - t;
        let last = remaining <= dt * (1.0 + END_SNAP);
        let h = if last { remaining } else { dt };
        let t_new = if last { end } else { t + h };

        // ====== Trial step ======

        let attempt: Result<(DVector<f64>, Option<f64>), String> = match config.solver_type {
            SolverType::Adaptive { relative_tolerance, absolute_tolerance, .. } => solver
                .step_with_error(model, t, &y, h)
                .map(|(y_new, error)| {
                    let norm = error_norm(&error, &y, &y_new, relative_tolerance, absolute_tolerance);
                    (y_new, Some(norm))
                })
                .map_err(|e| e.to_string()),
            SolverType::FixedStep { .. } => {
                solver.step(model, t, &y, h).map(|y_new| (y_new, None)).map_err(|e| e.to_string())
            }
        };

        let outcome = attempt.and_then(|(mut y_new, norm)| {
            model.project_state(&mut y_new);
            if y_new.iter().any(|v| !v.is_finite()) {
                return Err(SolverError::NonFinite { step: steps }.to_string());
            }
            if let Some(norm) = norm
                && !(norm <= 1.0)
            {
                return Err(format!("local error {:.3e} times tolerance", norm));
            }
            model.check_state(&y_new).map_err(|e| e.to_string())?;
            on_accept(t_new, &y_new).map_err(|e| e.to_string())?;
            Ok((y_new, norm))
        });

        match outcome {
            Ok((y_new, norm)) => {
                // ====== Accept ======

                t = t_new;
                y = y_new;
                time_points.push(t);
                trajectory.push(y.clone());
                accepted += 1;
                retries = 0;

                debug!(t, dt = h, error = ?norm, "step accepted");

                dt = match (&config.solver_type, nominal_step) {
                    (_, Some(nominal)) => nominal,
                    (SolverType::Adaptive { min_step, max_step, .. }, None) => {
                        let exponent = -1.0 / (solver.order() as f64 + 1.0);
                        let factor = match norm {
                            Some(norm) if norm > 0.0 => (SAFETY * norm.powf(exponent)).min(MAX_GROWTH),
                            _ => MAX_GROWTH,
                        };
                        (h * factor).clamp(*min_step, *max_step)
                    }
                    (SolverType::FixedStep { .. }, None) => dt,
                };
            }
            Err(reason) => {
                // ====== Reject ======

                rejected += 1;
                retries += 1;
                dt = h / 2.0;

                warn!(t, dt = h, retries, %reason, "step rejected");

                let below_minimum = match config.solver_type {
                    SolverType::Adaptive { min_step, .. } => dt < min_step,
                    SolverType::FixedStep { .. } => false,
                };
                if retries > config.max_retries || below_minimum {
                    break RunStatus::Failed(SolverError::KineticPathFailed { time: t, retries, reason });
                }
            }
        }

        trace!(t, dt, accepted, rejected, "integration state");
    };

    // ====== Step 4: Build Result ======

    let mut result = SimulationResult::new(time_points, trajectory, y);
    result.status = status;
    result.accepted = accepted;
    result.rejected = rejected;

    result.add_metadata("solver", solver.name());
    result.add_metadata("step control", config.solver_type.name());
    result.add_metadata("model", model.name());
    result.add_metadata("accepted steps", &accepted.to_string());
    result.add_metadata("rejected steps", &rejected.to_string());
    result.add_metadata("final time", &t.to_string());

    Ok(result)
}

// =================================================================================================
// Tests
// =================================================================================================
