//! Mock kinetic models for testing
//!
//! These models have known analytical solutions, making them
//! ideal for validating numerical solver accuracy.

use kinpath::error::ModelError;
use kinpath::kinetics::KineticModel;
use nalgebra::DVector;

// =================================================================================================
// Exponential Decay: dy/dt = -k*y
// =================================================================================================

/// Exponential decay model: dy/dt = -k*y
///
/// Analytical solution: y(t) = y₀ * exp(-k*t)
pub struct ExponentialDecay {
    pub dimension: usize,
    pub decay_rate: f64, // k in dy/dt = -k*y
}

impl ExponentialDecay {
    pub fn new(dimension: usize, decay_rate: f64) -> Self {
        Self { dimension, decay_rate }
    }

    /// Compute analytical solution at time t
    pub fn analytical_solution(&self, t: f64, y0: f64) -> f64 {
        y0 * (-self.decay_rate * t).exp()
    }
}

impl KineticModel for ExponentialDecay {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn rates(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        Ok(y * -self.decay_rate)
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::from_element(self.dimension, 1.0)
    }

    fn name(&self) -> &str {
        "Exponential Decay"
    }
}

// =================================================================================================
// Constant Growth: dy/dt = c
// =================================================================================================

/// Constant growth model: dy/dt = c
///
/// Euler is exact for this problem, RK4 should also be exact.
pub struct ConstantGrowth {
    pub dimension: usize,
    pub growth_rate: f64,
}

impl ConstantGrowth {
    pub fn new(dimension: usize, growth_rate: f64) -> Self {
        Self { dimension, growth_rate }
    }

    /// Compute analytical solution at time t
    pub fn analytical_solution(&self, t: f64, y0: f64) -> f64 {
        y0 + self.growth_rate * t
    }
}

impl KineticModel for ConstantGrowth {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn rates(&self, _t: f64, _y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        Ok(DVector::from_element(self.dimension, self.growth_rate))
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::zeros(self.dimension)
    }

    fn name(&self) -> &str {
        "Constant Growth"
    }
}

// =================================================================================================
// Depletion: dy/dt = -c, leaves the domain at y < 0
// =================================================================================================

/// Linear depletion of a stock that cannot go negative
///
/// Like a dissolving mineral at constant rate: the integrator must stop
/// short of the time where `y` crosses zero.
pub struct Depletion {
    pub stock: f64,
    pub rate: f64,
}

impl Depletion {
    pub fn new(stock: f64, rate: f64) -> Self {
        Self { stock, rate }
    }

    /// Time at which the stock is exhausted
    pub fn exhaustion_time(&self) -> f64 {
        self.stock / self.rate
    }
}

impl KineticModel for Depletion {
    fn dimension(&self) -> usize {
        1
    }

    fn rates(&self, _t: f64, _y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        Ok(DVector::from_element(1, -self.rate))
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::from_element(1, self.stock)
    }

    fn check_state(&self, y: &DVector<f64>) -> Result<(), ModelError> {
        if y[0] < 0.0 {
            return Err(ModelError::OutOfDomain(format!("negative stock {}", y[0])));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Depletion"
    }
}
