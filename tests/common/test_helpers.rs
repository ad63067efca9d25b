//! Helper functions for integration tests

use kinpath::chemistry::{InMemoryDatabase, MapProvider, ThermoDatabase, builtin_database};
use kinpath::kinetics::KineticModel;
use kinpath::solver::Scenario;
use std::sync::Arc;

/// Calcite dissolving in dilute hydrochloric acid, one hour.
pub const CALCITE_DOCUMENT: &str = "
ChemicalSystem:
    Database: supcrt98.xml
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
        Mechanism Neutral:
            RateConstant: 10**(-5.81) mol/(m2*s)
            ActivationEnergy: 23.5 kJ/mol

Equilibrium State:
    Temperature: 25 celsius
    Pressure: 1 bar
    Mixture:
        H2O: 1 kg
        NaCl: 0.1 mol
        HCl: 10 mmol
    InertSpecies:
        Calcite: 10 g

KineticPath:
    From: 0
    To: 1 h
    InitialCondition: State
    KineticSpecies: Calcite
    Plot 1:
        x: t:min
        y: n[Calcite]
    Plot 2:
        x: t:min
        y: pH
";

/// Path to a file shipped in `data/`.
pub fn data_file(name: &str) -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

/// Provider serving a copy of the built-in records under `mock`.
pub fn mock_provider() -> MapProvider {
    let builtin = builtin_database();
    let mut database = InMemoryDatabase::new("mock");
    for name in ["H2O(l)", "H+", "OH-", "Na+", "Cl-", "Halite"] {
        if let Ok(record) = builtin.species(name) {
            database.insert(record.clone());
        }
    }
    MapProvider::new().with("mock", Arc::new(database))
}

/// Create a scenario over `[0, end]` from the model's initial state
pub fn create_simple_scenario(model: Arc<dyn KineticModel>, end: f64) -> Scenario {
    Scenario::new(model, 0.0, end)
}

/// Compute relative error: |actual - expected| / |expected|
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}

/// Assert that a series never increases
pub fn assert_non_increasing(values: &[f64], message: &str) {
    for (i, pair) in values.windows(2).enumerate() {
        assert!(pair[1] <= pair[0] + 1e-12, "{}: sample {} rises from {} to {}", message, i + 1, pair[0], pair[1]);
    }
}
