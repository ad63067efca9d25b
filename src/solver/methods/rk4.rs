//! Runge-Kutta 4 (RK4) numerical solver
//!
//! # Mathematical Background
//!
//! The classical fourth-order Runge-Kutta method uses a weighted average of
//! four slope estimates:
//!
//! ```text
//! k₁ = f(tₙ,        yₙ)
//! k₂ = f(tₙ + dt/2, yₙ + dt/2 · k₁)
//! k₃ = f(tₙ + dt/2, yₙ + dt/2 · k₂)
//! k₄ = f(tₙ + dt,   yₙ + dt · k₃)
//!
//! yₙ₊₁ = yₙ + dt/6 · (k₁ + 2k₂ + 2k₃ + k₄)
//! ```
//!
//! # Characteristics
//!
//! - **Order**: Fourth-order accurate (global error ~ O(dt⁴))
//! - **Cost**: 4 rate evaluations per step, 12 with step-doubling error control
//! - **Stability**: Larger stability region than Euler
//!
//! Each rate evaluation of a mineral kinetics model is an equilibrium solve,
//! so the cost per step matters. RK4 still wins for any tolerance tighter
//! than a few percent because it takes far fewer steps.
//!
//! | Method | Order | Evals/Step | Error |
//! |--------|-------|------------|-------|
//! | Euler  | 1     | 1          | O(dt) |
//! | RK4    | 4     | 4          | O(dt⁴)|

use crate::error::ModelError;
use crate::kinetics::KineticModel;
use crate::solver::Solver;
use nalgebra::DVector;

// =================================================================================================
// RK4 Solver
// =================================================================================================

/// Classical fourth-order Runge-Kutta solver
///
/// # Stability
///
/// For `dy/dt = λy`, RK4 is stable when
///
/// ```text
/// |1 + z + z²/2 + z³/6 + z⁴/24| ≤ 1,    z = λ·dt
/// ```
///
/// which allows ~2.78× larger steps than Euler.
///
/// # Example
///
/// ```rust
/// use kinpath::solver::{RK4Solver, Solver};
///
/// let solver = RK4Solver::new();
/// assert_eq!(solver.name(), "Runge Kutta (RK4)");
/// assert_eq!(solver.order(), 4);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RK4Solver;

impl RK4Solver {
    /// Create a new RK4 solver
    pub fn new() -> Self {
        Self
    }
}

impl Solver for RK4Solver {
    fn step(&self, model: &dyn KineticModel, t: f64, y: &DVector<f64>, dt: f64) -> Result<DVector<f64>, ModelError> {
        let half = dt / 2.0;

        // ====== RK4 Stages ======

        let k1 = model.rates(t, y)?;
        let k2 = model.rates(t + half, &(y + &k1 * half))?;
        let k3 = model.rates(t + half, &(y + &k2 * half))?;
        let k4 = model.rates(t + dt, &(y + &k3 * dt))?;

        // ====== RK4 Update ======

        // Simpson weights: 1/6 at the ends, 1/3 at the midpoint
        let weighted_slope = k1 + k2 * 2.0 + k3 * 2.0 + k4;
        Ok(y + weighted_slope * (dt / 6.0))
    }

    fn order(&self) -> u32 {
        4
    }

    fn name(&self) -> &'static str {
        "Runge Kutta (RK4)"
    }
}

// =================================================================================================
// Tests
// =================================================================================================
