//! Forward Euler numerical solver
//!
//! # Mathematical Background
//!
//! The simplest explicit time-stepping scheme for
//!
//! ```text
//! dy/dt = f(t, y)
//! ```
//!
//! approximates the solution at `t_{n+1} = t_n + dt` with
//!
//! ```text
//! y_{n+1} = y_n + dt · f(t_n, y_n)
//! ```
//!
//! # Characteristics
//!
//! - **Order**: First-order accurate (error ~ O(dt))
//! - **Cost**: 1 rate evaluation per step, 3 with step-doubling error control
//! - **Stability**: Conditionally stable (requires small time steps)
//!
//! # When to Use
//!
//! - Quick exploratory runs
//! - Checking that a result does not depend on the method
//!
//! Production runs should prefer [`RK4Solver`](crate::solver::RK4Solver).

use crate::error::ModelError;
use crate::kinetics::KineticModel;
use crate::solver::Solver;
use nalgebra::DVector;

// =================================================================================================
// Forward Euler Solver
// =================================================================================================

/// Forward Euler time-stepping solver
///
/// ```rust
/// use kinpath::solver::{EulerSolver, Solver};
///
/// let solver = EulerSolver::new();
/// assert_eq!(solver.name(), "Forward Euler");
/// assert_eq!(solver.order(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerSolver;

impl EulerSolver {
    /// Create a new forward Euler solver
    pub fn new() -> Self {
        Self
    }
}

impl Solver for EulerSolver {
    fn step(&self, model: &dyn KineticModel, t: f64, y: &DVector<f64>, dt: f64) -> Result<DVector<f64>, ModelError> {
        let slope = model.rates(t, y)?;
        Ok(y + slope * dt)
    }

    fn order(&self) -> u32 {
        1
    }

    fn name(&self) -> &'static str {
        "Forward Euler"
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Scenario, SolverConfiguration};
    use std::sync::Arc;

    /// dy/dt = -k·y, y(t) = exp(-k·t)
    struct ExponentialDecay {
        decay_rate: f64,
    }

    impl KineticModel for ExponentialDecay {
        fn dimension(&self) -> usize {
            1
        }

        fn rates(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
            Ok(y * -self.decay_rate)
        }

        fn initial_state(&self) -> DVector<f64> {
            DVector::from_element(1, 1.0)
        }

        fn name(&self) -> &str {
            "Exponential Decay"
        }
    }

    /// dy/dt = c
    struct ConstantGrowth {
        growth_rate: f64,
    }

    impl KineticModel for ConstantGrowth {
        fn dimension(&self) -> usize {
            2
        }

        fn rates(&self, _t: f64, _y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
            Ok(DVector::from_element(2, self.growth_rate))
        }

        fn initial_state(&self) -> DVector<f64> {
            DVector::zeros(2)
        }

        fn name(&self) -> &str {
            "Constant Growth"
        }
    }

    #[test]
    fn test_euler_single_step() {
        let model = ExponentialDecay { decay_rate: 0.5 };
        let y = EulerSolver.step(&model, 0.0, &DVector::from_element(1, 2.0), 0.1).unwrap();
        assert!((y[0] - 1.9).abs() < 1e-14);
    }

    #[test]
    fn test_euler_constant_growth() {
        // Euler is exact for constant slopes
        let scenario = Scenario::new(Arc::new(ConstantGrowth { growth_rate: 2.0 }), 0.0, 10.0);
        let result = EulerSolver.solve(&scenario, &SolverConfiguration::fixed_step(100)).unwrap();

        assert!(result.status.is_success());
        assert!((result.final_state[0] - 20.0).abs() < 1e-10);
        assert_eq!(result.len(), 101);
    }

    #[test]
    fn test_euler_exponential_decay() {
        let scenario = Scenario::new(Arc::new(ExponentialDecay { decay_rate: 0.1 }), 0.0, 10.0);
        let result = EulerSolver.solve(&scenario, &SolverConfiguration::fixed_step(1000)).unwrap();

        let expected = (-1.0f64).exp();
        // first order: error ~ dt
        assert!((result.final_state[0] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_euler_error_estimate_is_first_order() {
        let model = ExponentialDecay { decay_rate: 1.0 };
        let y = DVector::from_element(1, 1.0);

        let (_, coarse) = EulerSolver.step_with_error(&model, 0.0, &y, 0.1).unwrap();
        let (_, fine) = EulerSolver.step_with_error(&model, 0.0, &y, 0.05).unwrap();

        // local error of a first-order method scales as dt²
        let ratio = coarse[0].abs() / fine[0].abs();
        assert!(ratio > 3.5 && ratio < 4.5, "ratio {}", ratio);
    }

    #[test]
    fn test_euler_time_points_hit_end() {
        let scenario = Scenario::new(Arc::new(ConstantGrowth { growth_rate: 1.0 }), 0.0, 1.0);
        let result = EulerSolver.solve(&scenario, &SolverConfiguration::fixed_step(10)).unwrap();

        assert_eq!(result.time_points.first(), Some(&0.0));
        assert_eq!(*result.time_points.last().unwrap(), 1.0);
        for pair in result.time_points.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
}
