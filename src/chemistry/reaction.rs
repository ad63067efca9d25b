//! Kinetically controlled mineral reactions
//!
//! A [`MineralReaction`] couples a mineral of the system to a rate law made of
//! additive [`Mechanism`]s:
//!
//! ```text
//! r = Σ_i k_i · exp(−Ea_i/R · (1/T − 1/298.15)) · Π_j a_j^p_ij      (mol/(m²·s))
//! ```
//!
//! `r > 0` means dissolution. The absolute rate in mol/s is `r` times the
//! reactive surface area given by the reaction's [`SurfaceAreaModel`].

use crate::chemistry::species::ChemicalSystem;

/// Tolerance on stoichiometric balance of reaction equations.
const BALANCE_TOLERANCE: f64 = 1e-8;

/// A `Π a^p` factor of a mechanism.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityPower {
    /// Species name.
    pub species: String,
    /// Global species index.
    pub index: usize,
    /// Exponent.
    pub exponent: f64,
}

/// One additive term of a rate law.
#[derive(Debug, Clone, PartialEq)]
pub struct Mechanism {
    /// Mechanism name (`Acid`, `Neutral`, ...).
    pub name: String,
    /// Rate constant at 298.15 K (mol/(m²·s)).
    pub rate_constant: f64,
    /// Activation energy (J/mol).
    pub activation_energy: f64,
    /// Activity factors.
    pub activity_powers: Vec<ActivityPower>,
}

impl Mechanism {
    /// A mechanism without activity factors.
    pub fn new(name: &str, rate_constant: f64, activation_energy: f64) -> Self {
        Self {
            name: name.to_string(),
            rate_constant,
            activation_energy,
            activity_powers: Vec::new(),
        }
    }

    /// Add an activity factor.
    pub fn with_activity_power(mut self, species: &str, index: usize, exponent: f64) -> Self {
        self.activity_powers.push(ActivityPower { species: species.to_string(), index, exponent });
        self
    }
}

/// How the reactive surface area follows the mineral amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceAreaModel {
    /// Area per unit mineral mass (m²/kg): `A = s · n · M`, shrinking with the mineral.
    Specific(f64),
    /// Fixed absolute area (m²).
    Constant(f64),
}

impl SurfaceAreaModel {
    /// Surface area (m²) for `amount` mol of a mineral of molar mass `molar_mass` (kg/mol).
    pub fn area(&self, amount: f64, molar_mass: f64) -> f64 {
        match self {
            SurfaceAreaModel::Specific(specific) => specific * amount.max(0.0) * molar_mass,
            SurfaceAreaModel::Constant(area) => *area,
        }
    }
}

/// Stoichiometric term of a reaction equation.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationTerm {
    /// Species name.
    pub species: String,
    /// Global species index.
    pub index: usize,
    /// Signed coefficient (reactants negative).
    pub coefficient: f64,
}

/// A kinetically controlled mineral reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct MineralReaction {
    /// Mineral name.
    pub mineral: String,
    /// Global index of the mineral species.
    pub mineral_index: usize,
    /// Reaction equation.
    pub equation: Vec<EquationTerm>,
    /// Surface area model.
    pub surface_area: SurfaceAreaModel,
    /// Rate law terms.
    pub mechanisms: Vec<Mechanism>,
}

impl MineralReaction {
    /// Check that the equation conserves every element and charge.
    ///
    /// Returns the imbalance of the first offending component as
    /// `(component, net amount)`.
    pub fn check_balance(&self, system: &ChemicalSystem) -> Result<(), (String, f64)> {
        let a = system.formula_matrix();

        for (row, component) in system.components().iter().enumerate() {
            let net: f64 = self.equation.iter().map(|term| term.coefficient * a[(row, term.index)]).sum();
            if net.abs() > BALANCE_TOLERANCE {
                return Err((component.clone(), net));
            }
        }

        Ok(())
    }

    /// Coefficient of the mineral in the equation (conventionally −1).
    pub fn mineral_coefficient(&self) -> Option<f64> {
        self.equation.iter().find(|t| t.index == self.mineral_index).map(|t| t.coefficient)
    }
}

/// Mineral reactions keyed by mineral name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionSystem {
    reactions: Vec<MineralReaction>,
}

impl ReactionSystem {
    /// Create an empty reaction system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reaction. Returns `false` (and keeps the existing one) if the
    /// mineral already has a reaction.
    pub fn insert(&mut self, reaction: MineralReaction) -> bool {
        if self.get(&reaction.mineral).is_some() {
            return false;
        }
        self.reactions.push(reaction);
        true
    }

    /// Reaction of a mineral.
    pub fn get(&self, mineral: &str) -> Option<&MineralReaction> {
        self.reactions.iter().find(|r| r.mineral == mineral)
    }

    /// Reactions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &MineralReaction> {
        self.reactions.iter()
    }

    /// Number of reactions.
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    /// Whether there are no reactions.
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}
