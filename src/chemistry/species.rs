//! Species, phases and chemical systems
//!
//! A [`ChemicalSystem`] is an ordered list of [`Phase`]s, each owning a
//! contiguous range of [`Species`]. Species are numbered globally in phase
//! order; every vector of amounts or activities in the crate uses this
//! numbering.
//!
//! The system also carries the formula matrix `A` (components × species),
//! whose rows are the elements present in the system (in order of first
//! appearance) followed by one row for electrical charge:
//!
//! ```text
//!            H2O(l)  H+  OH-  Ca+2  Calcite
//!      H   [   2      1    1    0      0   ]
//!      O   [   1      0    1    0      3   ]
//!      Ca  [   0      0    0    1      1   ]
//!      C   [   0      0    0    0      1   ]
//!      Z   [   0      1   -1    2      0   ]
//! ```

use crate::chemistry::database::{GAS_CONSTANT, SpeciesRecord, ThermoDatabase};
use crate::chemistry::formula::Formula;
use crate::error::SystemError;
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Name of the aqueous solvent species.
pub const WATER: &str = "H2O(l)";

/// Label of the charge row of the formula matrix.
pub const CHARGE_COMPONENT: &str = "Z";

// =================================================================================================
// Phases and species
// =================================================================================================

/// Kind of a phase, which fixes its activity model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Electrolyte solution (molality scale, `H2O(l)` solvent).
    Aqueous,
    /// Ideal gas mixture.
    Gaseous,
    /// Pure solid, one species per phase.
    Mineral,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PhaseKind::Aqueous => "aqueous",
            PhaseKind::Gaseous => "gaseous",
            PhaseKind::Mineral => "mineral",
        })
    }
}

/// One chemical species of a system. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    name: String,
    formula: Formula,
    phase: usize,
    molar_mass: f64,
    record: SpeciesRecord,
}

impl Species {
    /// Species name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Elemental composition and charge.
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Electrical charge.
    pub fn charge(&self) -> f64 {
        self.formula.charge()
    }

    /// Index of the owning phase.
    pub fn phase(&self) -> usize {
        self.phase
    }

    /// Molar mass (kg/mol).
    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }

    /// Thermodynamic record the species was resolved from.
    pub fn record(&self) -> &SpeciesRecord {
        &self.record
    }
}

/// A named group of species sharing an activity model.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    name: String,
    kind: PhaseKind,
    species: Range<usize>,
}

impl Phase {
    /// Phase name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Phase kind.
    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Global indices of the species of this phase.
    pub fn species(&self) -> Range<usize> {
        self.species.clone()
    }
}

/// Declaration of a phase before the system is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpec {
    /// Phase name.
    pub name: String,
    /// Phase kind.
    pub kind: PhaseKind,
    /// Species names, in order.
    pub species: Vec<String>,
}

impl PhaseSpec {
    /// The aqueous phase.
    pub fn aqueous<S: AsRef<str>>(species: &[S]) -> Self {
        Self::new("Aqueous", PhaseKind::Aqueous, species)
    }

    /// The gaseous phase.
    pub fn gaseous<S: AsRef<str>>(species: &[S]) -> Self {
        Self::new("Gaseous", PhaseKind::Gaseous, species)
    }

    /// A pure mineral phase named after its single species.
    pub fn mineral(name: &str) -> Self {
        Self::new(name, PhaseKind::Mineral, &[name])
    }

    fn new<S: AsRef<str>>(name: &str, kind: PhaseKind, species: &[S]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            species: species.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

// =================================================================================================
// Chemical system
// =================================================================================================

/// Ordered set of phases with the database they were resolved against.
pub struct ChemicalSystem {
    database: Arc<dyn ThermoDatabase>,
    species: Vec<Species>,
    phases: Vec<Phase>,
    components: Vec<String>,
    formula_matrix: DMatrix<f64>,
    water: Option<usize>,
}

impl ChemicalSystem {
    /// Resolve every species of `phases` in `database` and assemble the system.
    ///
    /// # Errors
    ///
    /// - [`SystemError::Database`] for a species unknown to the database
    /// - [`SystemError::DuplicateSpecies`] when phases overlap
    /// - [`SystemError::PhaseMismatch`] for e.g. a mineral in the aqueous phase
    /// - [`SystemError::MissingSolvent`] for an aqueous phase without `H2O(l)`
    pub fn new(database: Arc<dyn ThermoDatabase>, phases: &[PhaseSpec]) -> Result<Self, SystemError> {
        let mut species = Vec::new();
        let mut built_phases = Vec::with_capacity(phases.len());
        let mut seen = HashSet::new();
        let mut water = None;

        for (phase_index, spec) in phases.iter().enumerate() {
            if spec.species.is_empty() {
                return Err(SystemError::EmptyPhase(spec.name.clone()));
            }

            let start = species.len();
            for name in &spec.species {
                if !seen.insert(name.clone()) {
                    return Err(SystemError::DuplicateSpecies(name.clone()));
                }

                let record = database.species(name)?;
                if record.kind != spec.kind {
                    return Err(SystemError::PhaseMismatch {
                        species: name.clone(),
                        expected: spec.kind,
                        found: record.kind,
                    });
                }

                let formula = record
                    .parsed_formula()
                    .map_err(|source| SystemError::Formula { species: name.clone(), source })?;

                if spec.kind == PhaseKind::Aqueous && name == WATER {
                    water = Some(species.len());
                }

                species.push(Species {
                    name: name.clone(),
                    molar_mass: formula.molar_mass(),
                    formula,
                    phase: phase_index,
                    record: record.clone(),
                });
            }

            if spec.kind == PhaseKind::Aqueous && !spec.species.iter().any(|s| s == WATER) {
                return Err(SystemError::MissingSolvent(spec.name.clone()));
            }

            built_phases.push(Phase {
                name: spec.name.clone(),
                kind: spec.kind,
                species: start..species.len(),
            });
        }

        let mut components: Vec<String> = Vec::new();
        for s in &species {
            for symbol in s.formula.elements().keys() {
                if !components.iter().any(|c| c == symbol) {
                    components.push(symbol.to_string());
                }
            }
        }
        components.push(CHARGE_COMPONENT.to_string());

        let formula_matrix = DMatrix::from_fn(components.len(), species.len(), |row, col| {
            let formula = &species[col].formula;
            if row == components.len() - 1 {
                formula.charge()
            } else {
                formula.count(&components[row])
            }
        });

        Ok(Self { database, species, phases: built_phases, components, formula_matrix, water })
    }

    /// Database the species were resolved against.
    pub fn database(&self) -> &Arc<dyn ThermoDatabase> {
        &self.database
    }

    /// All species in global order.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// Species at `index`.
    pub fn species_at(&self, index: usize) -> &Species {
        &self.species[index]
    }

    /// Number of species.
    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    /// All phases in order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase owning species `index`.
    pub fn phase_of(&self, index: usize) -> &Phase {
        &self.phases[self.species[index].phase]
    }

    /// Global index of a species by name.
    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    /// Index of the aqueous solvent, if the system has an aqueous phase.
    pub fn water_index(&self) -> Option<usize> {
        self.water
    }

    /// Component labels (element symbols, then `Z`).
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Row index of an element (or `Z`).
    pub fn component_index(&self, symbol: &str) -> Option<usize> {
        self.components.iter().position(|c| c == symbol)
    }

    /// Formula matrix (components × species).
    pub fn formula_matrix(&self) -> &DMatrix<f64> {
        &self.formula_matrix
    }

    /// Component totals `b = A n` of a vector of species amounts.
    pub fn component_amounts(&self, amounts: &DVector<f64>) -> DVector<f64> {
        &self.formula_matrix * amounts
    }

    /// Component vector of an arbitrary formula, or `None` if the formula
    /// contains an element the system does not know.
    pub fn component_vector(&self, formula: &Formula) -> Option<DVector<f64>> {
        let mut vector = DVector::zeros(self.components.len());
        for (symbol, count) in formula.elements() {
            let row = self.component_index(symbol)?;
            vector[row] += count;
        }
        vector[self.components.len() - 1] = formula.charge();
        Some(vector)
    }

    /// Standard chemical potentials divided by RT, at `temperature` (K).
    pub fn standard_potentials(&self, temperature: f64) -> DVector<f64> {
        let rt = GAS_CONSTANT * temperature;
        DVector::from_iterator(
            self.species.len(),
            self.species.iter().map(|s| s.record.standard_potential(temperature) / rt),
        )
    }
}

impl fmt::Debug for ChemicalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChemicalSystem")
            .field("database", &self.database.name())
            .field("phases", &self.phases.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("species", &self.species.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("components", &self.components)
            .finish()
    }
}
