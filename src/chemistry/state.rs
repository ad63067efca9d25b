//! Equilibrium state specifications and speciations
//!
//! An [`EquilibriumStateSpec`] is what a document declares: conditions, a bulk
//! mixture of compounds, and species whose amounts are imposed. Running it
//! through the equilibrium solver yields a [`Speciation`].
//!
//! Every species of the system has a [`SpeciesRole`] in an equilibrium
//! calculation. Fixed species keep their amount; the solver only distributes
//! the remaining component totals among the fast species.

use crate::chemistry::species::{ChemicalSystem, PhaseKind};
use nalgebra::DVector;

/// Role of a species in an equilibrium calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeciesRole {
    /// Amount imposed from outside (inert or kinetically controlled).
    Fixed,
    /// Amount determined by instantaneous equilibrium.
    #[default]
    FastEquilibrium,
}

/// One compound of a bulk mixture, already converted to moles and components.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureEntry {
    /// Compound as written (species name or formula).
    pub compound: String,
    /// Amount (mol).
    pub amount: f64,
    /// Component vector of one mole of the compound (elements then charge).
    pub components: DVector<f64>,
}

/// A declared equilibrium state.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumStateSpec {
    /// State name (`State` in `Equilibrium State`).
    pub name: String,
    /// Temperature (K).
    pub temperature: f64,
    /// Pressure (Pa).
    pub pressure: f64,
    /// Bulk composition.
    pub mixture: Vec<MixtureEntry>,
    /// Species held at a fixed amount (global index, mol).
    pub inert: Vec<(usize, f64)>,
}

impl EquilibriumStateSpec {
    /// Component totals contributed by the mixture.
    pub fn mixture_totals(&self, system: &ChemicalSystem) -> DVector<f64> {
        let mut totals = DVector::zeros(system.components().len());
        for entry in &self.mixture {
            totals.axpy(entry.amount, &entry.components, 1.0);
        }
        totals
    }

    /// Imposed amount of a species, if it is inert in this state.
    pub fn inert_amount(&self, index: usize) -> Option<f64> {
        self.inert.iter().find(|(i, _)| *i == index).map(|(_, n)| *n)
    }
}

/// Amounts and activities of every species at one instant.
///
/// Produced by the equilibrium solver and owned by whoever requested it.
#[derive(Debug, Clone, PartialEq)]
pub struct Speciation {
    /// Temperature (K).
    pub temperature: f64,
    /// Pressure (Pa).
    pub pressure: f64,
    /// Amount of each species (mol).
    pub amounts: DVector<f64>,
    /// Natural log of the activity of each species.
    pub ln_activities: DVector<f64>,
    /// Molality of aqueous species (mol/kg), zero elsewhere.
    pub molalities: DVector<f64>,
    /// Ionic strength of the aqueous phase (mol/kg).
    pub ionic_strength: f64,
    /// Role each species played in the calculation.
    pub roles: Vec<SpeciesRole>,
    /// Component chemical potentials divided by RT, one per component
    /// (zero for components that were dependent or absent).
    pub potentials: DVector<f64>,
    /// Newton iterations spent.
    pub iterations: usize,
}

impl Speciation {
    /// Amount of species `index` (mol).
    pub fn amount(&self, index: usize) -> f64 {
        self.amounts[index]
    }

    /// Activity of species `index`.
    pub fn activity(&self, index: usize) -> f64 {
        self.ln_activities[index].exp()
    }

    /// Molality of species `index` (mol/kg).
    pub fn molality(&self, index: usize) -> f64 {
        self.molalities[index]
    }

    /// `-log10 a(H+)`, if the system has an `H+` species.
    pub fn ph(&self, system: &ChemicalSystem) -> Option<f64> {
        system
            .species_index("H+")
            .map(|i| -self.ln_activities[i] / std::f64::consts::LN_10)
    }

    /// Total amount of each mineral species (mol), by name.
    pub fn mineral_amounts<'a>(&self, system: &'a ChemicalSystem) -> Vec<(&'a str, f64)> {
        system
            .phases()
            .iter()
            .filter(|p| p.kind() == PhaseKind::Mineral)
            .flat_map(|p| p.species())
            .map(|i| (system.species_at(i).name(), self.amounts[i]))
            .collect()
    }
}
