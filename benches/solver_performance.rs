//! Performance benchmarks for the kinetic path pipeline
//!
//! # What We're Measuring
//!
//! 1. **One-step methods** on a cheap linear model:
//!    - Euler: 1 rate evaluation per step
//!    - RK4: 4 rate evaluations per step
//!
//! 2. **Front end**: parsing and building the demo document
//!
//! 3. **Equilibrium**: one speciation of the demo initial state
//!
//! 4. **Full path**: calcite dissolving in acid for one hour, where every
//!    accepted step re-equilibrates the fluid
//!
//! # Expected Results
//!
//! **Performance ratio**: RK4 ≈ 4× slower than Euler per fixed step.
//! On the full path the equilibrium solves dominate; the method matters
//! mostly through the number of steps adaptive control takes.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench --bench solver_performance
//!
//! # Only the one-step method comparison
//! cargo bench --bench solver_performance comparison
//! ```

use criterion::{BenchmarkId, Criterion, SamplingMode, criterion_group, criterion_main};
use kinpath::chemistry::BuiltinProvider;
use kinpath::error::ModelError;
use kinpath::interpreter::{build, check, interpret_with, parse};
use kinpath::kinetics::KineticModel;
use kinpath::solver::{
    CancelFlag, EulerSolver, RK4Solver, RunOptions, Scenario, Solver, SolverConfiguration, SolverMethod,
    initial_speciation,
};
use nalgebra::DVector;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

const DEMO: &str = include_str!("../data/demo3.kin");

const CALCITE: &str = "
ChemicalSystem:
    AqueousPhase:
        Species: H2O(l) H+ OH- HCO3- CO3-2 CO2(aq) Ca+2 Na+ Cl-
    MineralPhases: Calcite
ReactionSystem:
    MineralReaction Calcite:
        Equation: -1:Calcite -1:H+ 1:Ca+2 1:HCO3-
        SpecificSurfaceArea: 9.8 cm2/g
        Mechanism Acid:
            RateConstant: 10**(-0.30) mol/(m2*s)
            ActivationEnergy: 14.4 kJ/mol
            ActivityPower H+: 1.0
Equilibrium State:
    Mixture:
        H2O: 1 kg
        NaCl: 0.1 mol
        HCl: 10 mmol
    InertSpecies:
        Calcite: 10 g
KineticPath:
    To: 1 h
    KineticSpecies: Calcite
    Plot 1:
        x: t:min
        y: n[Calcite]
";

// =================================================================================================
// Simple Model for Benchmarking
// =================================================================================================

/// Exponential decay dy/dt = -k*y over `dimension` independent variables
///
/// Cheap enough that the measured time is the solver overhead.
struct SimpleModel {
    dimension: usize,
}

impl KineticModel for SimpleModel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn rates(&self, _t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        Ok(y * -0.1)
    }

    fn initial_state(&self) -> DVector<f64> {
        DVector::from_element(self.dimension, 1.0)
    }

    fn name(&self) -> &str {
        "Benchmark Model"
    }
}

// =================================================================================================
// Benchmarks
// =================================================================================================

fn benchmark_solver_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("Solver Comparison");

    // (variables, time_steps)
    for (dimension, time_steps) in [(2, 100), (20, 1000), (200, 5000)] {
        let scenario = Scenario::new(Arc::new(SimpleModel { dimension }), 0.0, time_steps as f64 * 0.1);
        let config = SolverConfiguration::fixed_step(time_steps);
        let label = format!("{}x{}", dimension, time_steps);

        let euler = EulerSolver::new();
        group.throughput(criterion::Throughput::Elements((dimension * time_steps) as u64));
        group.bench_with_input(BenchmarkId::new("euler", &label), &scenario, |b, scenario| {
            b.iter(|| euler.solve(black_box(scenario), black_box(&config)).unwrap())
        });

        let rk4 = RK4Solver::new();
        group.throughput(criterion::Throughput::Elements((dimension * time_steps * 4) as u64));
        group.bench_with_input(BenchmarkId::new("rk4", &label), &scenario, |b, scenario| {
            b.iter(|| rk4.solve(black_box(scenario), black_box(&config)).unwrap())
        });
    }

    group.finish();
}

fn benchmark_front_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("Front End");

    group.bench_function("parse demo", |b| b.iter(|| parse(black_box(DEMO)).unwrap()));

    let document = parse(DEMO).unwrap();
    group.bench_function("build demo", |b| b.iter(|| build(black_box(&document), &BuiltinProvider).unwrap()));

    group.finish();
}

fn benchmark_equilibrium(c: &mut Criterion) {
    let model = check(DEMO, &BuiltinProvider).unwrap();
    let state = model.state("State").unwrap().clone();
    let options = RunOptions::default().equilibrium;

    c.bench_function("demo initial speciation", |b| {
        b.iter(|| initial_speciation(black_box(&model.system), black_box(&state), options).unwrap())
    });
}

fn benchmark_kinetic_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("Kinetic Path");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    for method in [SolverMethod::Euler, SolverMethod::Rk4] {
        let options = RunOptions { method, ..RunOptions::default() };
        group.bench_function(BenchmarkId::new("calcite 1 h", method), |b| {
            b.iter(|| interpret_with(black_box(CALCITE), &BuiltinProvider, &options, &CancelFlag::new()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_solver_comparison,
    benchmark_front_end,
    benchmark_equilibrium,
    benchmark_kinetic_path,
);
criterion_main!(benches);
