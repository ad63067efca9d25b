//! Thermodynamic databases
//!
//! The core only needs, per species, its formula, the kind of phase it can
//! live in, and a standard chemical potential as a function of temperature.
//! Those are served by a [`ThermoDatabase`]; databases are obtained by name
//! through a [`DatabaseProvider`] that callers inject into the interpreter.
//!
//! Loaded databases are shared behind `Arc` and never mutated afterwards, so
//! one instance can serve any number of concurrent runs.
//!
//! # Built-in data
//!
//! [`BuiltinProvider`] serves a small carbonate/brine dataset under the name
//! `supcrt98.xml`. Values are standard Gibbs energies and enthalpies of
//! formation at 298.15 K and 1 bar. The chemical potential at another
//! temperature assumes a constant enthalpy of reaction:
//!
//! ```text
//! G(T) = H + (G° − H) · T / 298.15
//! ```

use crate::chemistry::formula::Formula;
use crate::chemistry::species::PhaseKind;
use crate::error::{DatabaseError, FormulaError};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Reference temperature of tabulated data (K).
pub const REFERENCE_TEMPERATURE: f64 = 298.15;

/// Universal gas constant (J/(mol·K)).
pub const GAS_CONSTANT: f64 = 8.314462618;

// =================================================================================================
// Species records
// =================================================================================================

/// Thermodynamic record of one species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesRecord {
    /// Species name as used in documents (`Ca+2`, `CO2(g)`, `Calcite`).
    pub name: String,

    /// Chemical formula (for minerals this differs from the name).
    pub formula: String,

    /// Phase kind the species belongs to.
    pub kind: PhaseKind,

    /// Standard Gibbs energy of formation at 298.15 K (J/mol).
    pub gibbs_energy: f64,

    /// Standard enthalpy of formation at 298.15 K (J/mol).
    pub enthalpy: f64,
}

impl SpeciesRecord {
    /// Create a record from values in kJ/mol.
    pub fn new(name: &str, formula: &str, kind: PhaseKind, gibbs_kj: f64, enthalpy_kj: f64) -> Self {
        Self {
            name: name.to_string(),
            formula: formula.to_string(),
            kind,
            gibbs_energy: gibbs_kj * 1e3,
            enthalpy: enthalpy_kj * 1e3,
        }
    }

    /// Standard chemical potential (J/mol) at `temperature` (K).
    pub fn standard_potential(&self, temperature: f64) -> f64 {
        self.enthalpy + (self.gibbs_energy - self.enthalpy) * temperature / REFERENCE_TEMPERATURE
    }

    /// Parsed formula.
    pub fn parsed_formula(&self) -> Result<Formula, FormulaError> {
        Formula::parse(&self.formula)
    }
}

// =================================================================================================
// Database traits
// =================================================================================================

/// Read-only source of species records.
pub trait ThermoDatabase: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Record of the named species.
    fn species(&self, name: &str) -> Result<&SpeciesRecord, DatabaseError>;

    /// Whether the database knows the species.
    fn contains(&self, name: &str) -> bool {
        self.species(name).is_ok()
    }
}

/// Resolves a database name (as written in a document) to a loaded database.
pub trait DatabaseProvider: Send + Sync {
    /// Load, or fetch from cache, the database called `name`.
    fn load(&self, name: &str) -> Result<Arc<dyn ThermoDatabase>, DatabaseError>;
}

// =================================================================================================
// In-memory database
// =================================================================================================

/// A database held entirely in memory.
///
/// Used for the built-in dataset and for custom or mock databases.
///
/// ```rust
/// use kinpath::chemistry::{InMemoryDatabase, PhaseKind, SpeciesRecord, ThermoDatabase};
///
/// let db = InMemoryDatabase::new("mock")
///     .with_species(SpeciesRecord::new("Na+", "Na+", PhaseKind::Aqueous, -261.91, -240.12));
/// assert!(db.contains("Na+"));
/// assert!(!db.contains("K+"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryDatabase {
    name: String,
    records: HashMap<String, SpeciesRecord>,
}

impl InMemoryDatabase {
    /// Create an empty database.
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), records: HashMap::new() }
    }

    /// Add a record, replacing any previous record of the same name.
    pub fn with_species(mut self, record: SpeciesRecord) -> Self {
        self.insert(record);
        self
    }

    /// Add a record in place.
    pub fn insert(&mut self, record: SpeciesRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the database has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ThermoDatabase for InMemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn species(&self, name: &str) -> Result<&SpeciesRecord, DatabaseError> {
        self.records.get(name).ok_or_else(|| DatabaseError::UnknownSpecies(name.to_string()))
    }
}

// =================================================================================================
// Providers
// =================================================================================================

/// Name under which the built-in dataset is served.
pub const BUILTIN_DATABASE_NAME: &str = "supcrt98.xml";

/// ΔGf° and ΔHf° (kJ/mol) at 298.15 K.
const BUILTIN_RECORDS: &[(&str, &str, PhaseKind, f64, f64)] = &[
    ("H2O(l)", "H2O", PhaseKind::Aqueous, -237.18, -285.83),
    ("H+", "H+", PhaseKind::Aqueous, 0.0, 0.0),
    ("OH-", "OH-", PhaseKind::Aqueous, -157.22, -229.99),
    ("HCO3-", "HCO3-", PhaseKind::Aqueous, -586.77, -691.99),
    ("CO3-2", "CO3-2", PhaseKind::Aqueous, -527.81, -677.14),
    ("CO2(aq)", "CO2", PhaseKind::Aqueous, -385.98, -413.80),
    ("Ca+2", "Ca+2", PhaseKind::Aqueous, -553.58, -542.83),
    ("Mg+2", "Mg+2", PhaseKind::Aqueous, -454.80, -466.85),
    ("Na+", "Na+", PhaseKind::Aqueous, -261.91, -240.12),
    ("K+", "K+", PhaseKind::Aqueous, -282.49, -252.14),
    ("Cl-", "Cl-", PhaseKind::Aqueous, -131.23, -167.16),
    ("SiO2(aq)", "SiO2", PhaseKind::Aqueous, -833.41, -887.86),
    ("N2(aq)", "N2", PhaseKind::Aqueous, 18.70, -10.54),
    ("H2O(g)", "H2O", PhaseKind::Gaseous, -228.57, -241.82),
    ("CO2(g)", "CO2", PhaseKind::Gaseous, -394.36, -393.51),
    ("N2(g)", "N2", PhaseKind::Gaseous, 0.0, 0.0),
    ("Calcite", "CaCO3", PhaseKind::Mineral, -1128.79, -1206.92),
    ("Dolomite", "CaMg(CO3)2", PhaseKind::Mineral, -2161.30, -2324.50),
    ("Magnesite", "MgCO3", PhaseKind::Mineral, -1012.10, -1095.80),
    ("Halite", "NaCl", PhaseKind::Mineral, -384.14, -411.15),
    ("Quartz", "SiO2", PhaseKind::Mineral, -856.64, -910.94),
];

/// The built-in dataset, loaded once and shared.
pub fn builtin_database() -> Arc<InMemoryDatabase> {
    static BUILTIN: OnceLock<Arc<InMemoryDatabase>> = OnceLock::new();

    BUILTIN
        .get_or_init(|| {
            let mut db = InMemoryDatabase::new(BUILTIN_DATABASE_NAME);
            for (name, formula, kind, g, h) in BUILTIN_RECORDS {
                db.insert(SpeciesRecord::new(name, formula, *kind, *g, *h));
            }
            Arc::new(db)
        })
        .clone()
}

/// Serves the built-in dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProvider;

impl DatabaseProvider for BuiltinProvider {
    fn load(&self, name: &str) -> Result<Arc<dyn ThermoDatabase>, DatabaseError> {
        match name {
            BUILTIN_DATABASE_NAME | "supcrt98" | "builtin" => Ok(builtin_database()),
            other => Err(DatabaseError::DatabaseLoadError {
                name: other.to_string(),
                reason: format!("only '{}' is available", BUILTIN_DATABASE_NAME),
            }),
        }
    }
}

/// Serves a fixed set of named databases.
///
/// Typically used to inject mock databases in tests.
#[derive(Clone, Default)]
pub struct MapProvider {
    databases: HashMap<String, Arc<dyn ThermoDatabase>>,
}

impl MapProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `database` under `name`.
    pub fn with(mut self, name: &str, database: Arc<dyn ThermoDatabase>) -> Self {
        self.databases.insert(name.to_string(), database);
        self
    }
}

impl DatabaseProvider for MapProvider {
    fn load(&self, name: &str) -> Result<Arc<dyn ThermoDatabase>, DatabaseError> {
        self.databases.get(name).cloned().ok_or_else(|| DatabaseError::DatabaseLoadError {
            name: name.to_string(),
            reason: "no such database registered".to_string(),
        })
    }
}
