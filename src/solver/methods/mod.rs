//! One-step methods
//!
//! Concrete implementations of the [`Solver`] trait. Adding a method means
//! adding a file and a [`SolverMethod`] variant; the integration loop never
//! changes.
//!
//! - **[`EulerSolver`]**: Forward Euler, first order, 1 rate evaluation per step
//! - **[`RK4Solver`]**: Classical fourth-order Runge-Kutta, 4 evaluations per step
//!
//! Both are explicit. Mineral dissolution over months is at most mildly
//! stiff once the fast aqueous chemistry is removed by equilibration, which
//! is what makes explicit methods viable here.
//!
//! # Example
//!
//! ```rust
//! use kinpath::solver::SolverMethod;
//!
//! let method: SolverMethod = "euler".parse().unwrap();
//! assert_eq!(method.solver().name(), "Forward Euler");
//! assert_eq!(SolverMethod::default(), SolverMethod::Rk4);
//! ```

mod euler;
mod rk4;

pub use euler::EulerSolver;
pub use rk4::RK4Solver;

use crate::solver::Solver;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Selectable integration method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// [`EulerSolver`]
    Euler,
    /// [`RK4Solver`]
    #[default]
    Rk4,
}

impl SolverMethod {
    /// Instantiate the solver
    pub fn solver(&self) -> Box<dyn Solver> {
        match self {
            SolverMethod::Euler => Box::new(EulerSolver::new()),
            SolverMethod::Rk4 => Box::new(RK4Solver::new()),
        }
    }
}

impl FromStr for SolverMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "euler" => Ok(SolverMethod::Euler),
            "rk4" => Ok(SolverMethod::Rk4),
            other => Err(format!("unknown method '{}' (expected 'euler' or 'rk4')", other)),
        }
    }
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverMethod::Euler => "euler",
            SolverMethod::Rk4 => "rk4",
        })
    }
}
