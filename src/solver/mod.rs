//! Numerical solvers
//!
//! This module integrates the ODE system `dy/dt = f(t, y)` of a
//! [`KineticModel`](crate::kinetics::KineticModel) over a time interval, and
//! drives complete kinetic paths on top of it.
//!
//! # Core Concepts
//!
//! ## The Architecture (WHAT vs HOW)
//!
//! 1. **Scenario** ([`Scenario`]) - WHAT to solve
//!    - Kinetic model (equations)
//!    - Time interval and initial state
//!
//! 2. **Configuration** ([`SolverConfiguration`]) - HOW to solve
//!    - Step control ([`SolverType`]: adaptive or fixed step)
//!    - Retry and step limits
//!
//! 3. **Solver** ([`Solver`] trait) - The numerical method
//!    - One step of the scheme, plus a step-doubling error estimate
//!    - Independent of chemistry
//!
//! The stepping policy (acceptance, rejection, step size) lives in one place,
//! [`integrate`], and is shared by every method.
//!
//! # Module Organization
//!
//! - **`traits`**: `Solver`, `SolverType`, `SolverConfiguration`, `SimulationResult`, `RunStatus`
//! - **`scenario`**: `Scenario`
//! - **`methods`**: `EulerSolver`, `RK4Solver`, `SolverMethod`
//! - **`integrate`**: the integration loop and `CancelFlag`
//! - **`path`**: kinetic path driver (`run_kinetic_path`, `RunOptions`, `RunOutcome`)
//!
//! # Quick Start Example
//!
//! ```rust
//! use kinpath::error::ModelError;
//! use kinpath::kinetics::KineticModel;
//! use kinpath::solver::{RK4Solver, Scenario, Solver, SolverConfiguration};
//! use nalgebra::DVector;
//! use std::sync::Arc;
//!
//! struct Decay;
//!
//! impl KineticModel for Decay {
//!     fn dimension(&self) -> usize { 1 }
//!     fn rates(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ModelError> { Ok(-y) }
//!     fn initial_state(&self) -> DVector<f64> { DVector::from_element(1, 1.0) }
//!     fn name(&self) -> &str { "Decay" }
//! }
//!
//! // 1. Create scenario (WHAT to solve)
//! let scenario = Scenario::new(Arc::new(Decay), 0.0, 1.0);
//!
//! // 2. Create configuration (HOW to solve)
//! let config = SolverConfiguration::fixed_step(100);
//!
//! // 3. Solve
//! let result = RK4Solver.solve(&scenario, &config)?;
//!
//! assert!(result.status.is_success());
//! assert!((result.final_state[0] - (-1.0f64).exp()).abs() < 1e-9);
//! # Ok::<(), kinpath::error::SolverError>(())
//! ```
//!
//! # Workflow Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │  Kinetic Model  │  (equations)
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ Scenario        │ ← WHAT to solve
//! │ (model + span)  │
//! └────────┬────────┘
//!          │
//! ┌────────▼─────────────┐
//! │ Solver Configuration │ ← HOW to solve
//! └────────┬─────────────┘
//!          │
//! ┌────────▼────────┐
//! │ Numerical Solver│ ← The method
//! │ (Euler, RK4)    │
//! └────────┬────────┘
//!          │
//! ┌────────▼────────────┐
//! │ Simulation Result   │ ← The solution
//! │ (trajectory + meta) │
//! └─────────────────────┘
//! ```
//!
//! # Error Handling
//!
//! Invalid configurations are rejected up front with
//! [`SolverError::InvalidConfiguration`](crate::error::SolverError). Anything
//! that goes wrong during a run (retries exhausted, cancellation) is reported
//! in [`SimulationResult::status`] together with the accepted prefix of the
//! trajectory.

// =================================================================================================
// Module Declarations
// =================================================================================================

mod integrate;
mod methods;
mod path;
mod scenario;
mod traits;

// =================================================================================================
// Public Re-exports
// =================================================================================================

pub use traits::{RunStatus, SimulationResult, Solver, SolverConfiguration, SolverType};

pub use scenario::Scenario;

pub use methods::{EulerSolver, RK4Solver, SolverMethod};

pub use integrate::{CancelFlag, integrate};

pub use path::{KineticPathSpec, RunOptions, RunOutcome, initial_speciation, run_kinetic_path};
