//! Kinetic model of minerals dissolving into an equilibrated fluid
//!
//! The state vector holds the amounts (mol) of the kinetic minerals. At any
//! state the fluid composition follows from mass conservation:
//!
//! ```text
//! b_fluid(y) = b_mixture + Σ_m A_m · (n_m(0) − y_m)
//! ```
//!
//! where `A_m` is the column of the formula matrix of mineral `m`. The fluid
//! is equilibrated with every kinetic and inert species held fixed, then each
//! reaction contributes
//!
//! ```text
//! dy_m/dt = ν_m · r_m · S_m(y_m)
//! ```
//!
//! with `ν_m` the (negative) mineral coefficient of its equation, `r_m` the
//! net specific rate and `S_m` the reactive surface area.

use crate::chemistry::{ChemicalSystem, EquilibriumStateSpec, MineralReaction, Speciation};
use crate::equilibrium::{EquilibriumConditions, EquilibriumOptions, EquilibriumSolver};
use crate::error::ModelError;
use crate::kinetics::rates;
use crate::kinetics::traits::KineticModel;
use nalgebra::DVector;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Amounts below this are treated as round-off, not as a negative state.
const NEGATIVE_AMOUNT_TOLERANCE: f64 = 1e-12;

/// Last equilibrated state, reused as a warm start and returned as is when the
/// same kinetic state is requested again.
#[derive(Debug, Clone)]
struct Cached {
    state: DVector<f64>,
    speciation: Speciation,
}

/// Operator-split mineral kinetics: rates from an equilibrium speciation of
/// the fluid at the current mineral amounts.
pub struct MineralKinetics {
    system: Arc<ChemicalSystem>,
    reactions: Vec<MineralReaction>,
    solver: EquilibriumSolver,
    temperature: f64,
    pressure: f64,
    mixture_totals: DVector<f64>,
    fixed: Vec<(usize, f64)>,
    initial: DVector<f64>,
    cache: Mutex<Option<Cached>>,
}

impl MineralKinetics {
    /// Build the model from the reactions of the kinetic minerals (in state
    /// vector order), the equilibrium state the run starts from, and the
    /// initial speciation computed from it.
    pub fn new(
        system: Arc<ChemicalSystem>,
        reactions: Vec<MineralReaction>,
        state: &EquilibriumStateSpec,
        initial_speciation: Speciation,
        options: EquilibriumOptions,
    ) -> Self {
        let initial = DVector::from_iterator(
            reactions.len(),
            reactions.iter().map(|r| initial_speciation.amounts[r.mineral_index]),
        );
        let cache = Cached { state: initial.clone(), speciation: initial_speciation };

        Self {
            mixture_totals: state.mixture_totals(&system),
            fixed: state.inert.clone(),
            temperature: state.temperature,
            pressure: state.pressure,
            system,
            reactions,
            solver: EquilibriumSolver::new(options),
            initial,
            cache: Mutex::new(Some(cache)),
        }
    }

    /// Chemical system of the model.
    pub fn system(&self) -> &Arc<ChemicalSystem> {
        &self.system
    }

    /// Kinetic reactions, in state vector order.
    pub fn reactions(&self) -> &[MineralReaction] {
        &self.reactions
    }

    /// Component totals available to the fast species at mineral amounts `y`.
    pub fn fluid_totals(&self, y: &DVector<f64>) -> DVector<f64> {
        let a = self.system.formula_matrix();
        let mut totals = self.mixture_totals.clone();
        for (k, reaction) in self.reactions.iter().enumerate() {
            let transferred = self.initial[k] - y[k].max(0.0);
            totals.axpy(transferred, &a.column(reaction.mineral_index), 1.0);
        }
        totals
    }

    /// Speciation of the whole system at mineral amounts `y`.
    pub fn equilibrate(&self, y: &DVector<f64>) -> Result<Speciation, ModelError> {
        let cached = self.cache.lock().map(|guard| guard.clone()).unwrap_or(None);
        if let Some(cached) = &cached
            && cached.state == *y
        {
            return Ok(cached.speciation.clone());
        }

        let mut conditions =
            EquilibriumConditions::new(&self.system, self.temperature, self.pressure, self.fluid_totals(y));
        for &(index, amount) in &self.fixed {
            conditions = conditions.fix(index, amount);
        }
        for (k, reaction) in self.reactions.iter().enumerate() {
            conditions = conditions.fix(reaction.mineral_index, y[k].max(0.0));
        }

        let speciation = self
            .solver
            .solve(&self.system, &conditions, cached.as_ref().map(|c| &c.speciation))?;

        if let Ok(mut guard) = self.cache.lock() {
            *guard = Some(Cached { state: y.clone(), speciation: speciation.clone() });
        }
        Ok(speciation)
    }
}

impl KineticModel for MineralKinetics {
    fn dimension(&self) -> usize {
        self.reactions.len()
    }

    fn rates(&self, t: f64, y: &DVector<f64>) -> Result<DVector<f64>, ModelError> {
        let speciation = self.equilibrate(y)?;

        let mut dydt = DVector::zeros(self.reactions.len());
        for (k, reaction) in self.reactions.iter().enumerate() {
            let rate = rates::absolute_rate(reaction, &self.system, &speciation)?;
            let coefficient = reaction.mineral_coefficient().unwrap_or(-1.0);
            dydt[k] = coefficient * rate;
        }

        debug!(t, rates = ?dydt.as_slice(), "kinetic rates");
        Ok(dydt)
    }

    fn initial_state(&self) -> DVector<f64> {
        self.initial.clone()
    }

    /// An exhausted mineral stops dissolving, so a step that dissolves past
    /// zero ends with the mineral at zero.
    fn project_state(&self, y: &mut DVector<f64>) {
        for (k, reaction) in self.reactions.iter().enumerate() {
            if y[k] < 0.0 {
                debug!(mineral = %reaction.mineral, overshoot = y[k], "mineral exhausted");
                y[k] = 0.0;
            }
        }
    }

    fn check_state(&self, y: &DVector<f64>) -> Result<(), ModelError> {
        for (k, reaction) in self.reactions.iter().enumerate() {
            let scale = self.initial[k].abs().max(1.0);
            if !y[k].is_finite() || y[k] < -NEGATIVE_AMOUNT_TOLERANCE * scale {
                return Err(ModelError::OutOfDomain(format!(
                    "amount of {} would become {:e} mol",
                    reaction.mineral, y[k]
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Mineral kinetics"
    }
}

impl std::fmt::Debug for MineralKinetics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MineralKinetics")
            .field("minerals", &self.reactions.iter().map(|r| r.mineral.as_str()).collect::<Vec<_>>())
            .field("temperature", &self.temperature)
            .field("pressure", &self.pressure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::{
        EquationTerm, Formula, Mechanism, MixtureEntry, PhaseSpec, SurfaceAreaModel, builtin_database,
    };

    fn system() -> Arc<ChemicalSystem> {
        Arc::new(
            ChemicalSystem::new(
                builtin_database(),
                &[
                    PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "HCO3-", "CO3-2", "CO2(aq)", "Ca+2", "Na+", "Cl-"]),
                    PhaseSpec::mineral("Calcite"),
                ],
            )
            .unwrap(),
        )
    }

    fn term(system: &ChemicalSystem, name: &str, coefficient: f64) -> EquationTerm {
        EquationTerm { species: name.to_string(), index: system.species_index(name).unwrap(), coefficient }
    }

    fn model() -> MineralKinetics {
        let system = system();
        let calcite = system.species_index("Calcite").unwrap();
        let entry = |compound: &str, amount: f64| MixtureEntry {
            compound: compound.to_string(),
            amount,
            components: system.component_vector(&Formula::parse(compound).unwrap()).unwrap(),
        };
        let state = EquilibriumStateSpec {
            name: "State".to_string(),
            temperature: 298.15,
            pressure: 1e5,
            mixture: vec![entry("H2O", 55.508), entry("HCl", 0.01), entry("NaCl", 0.1)],
            inert: vec![(calcite, 3.0)],
        };

        let reaction = MineralReaction {
            mineral: "Calcite".to_string(),
            mineral_index: calcite,
            equation: vec![
                term(&system, "Calcite", -1.0),
                term(&system, "H+", -1.0),
                term(&system, "Ca+2", 1.0),
                term(&system, "HCO3-", 1.0),
            ],
            surface_area: SurfaceAreaModel::Specific(0.98),
            mechanisms: vec![Mechanism::new("Neutral", 10f64.powf(-5.81), 23_500.0)],
        };

        let mut conditions = EquilibriumConditions::new(&system, 298.15, 1e5, state.mixture_totals(&system));
        conditions = conditions.fix(calcite, 3.0);
        let initial = EquilibriumSolver::default().solve(&system, &conditions, None).unwrap();

        MineralKinetics::new(system, vec![reaction], &state, initial, EquilibriumOptions::default())
    }

    #[test]
    fn test_initial_state_is_mineral_amount() {
        let model = model();
        assert_eq!(model.dimension(), 1);
        assert_eq!(model.initial_state()[0], 3.0);
    }

    #[test]
    fn test_dissolution_moves_calcium_into_fluid() {
        let model = model();
        let system = model.system().clone();
        let ca = system.component_index("Ca").unwrap();

        let before = model.fluid_totals(&DVector::from_element(1, 3.0));
        let after = model.fluid_totals(&DVector::from_element(1, 2.5));
        assert_eq!(before[ca], 0.0);
        assert!((after[ca] - 0.5).abs() < 1e-12);

        let speciation = model.equilibrate(&DVector::from_element(1, 2.5)).unwrap();
        let ca_ion = system.species_index("Ca+2").unwrap();
        assert!((speciation.amounts[ca_ion] - 0.5).abs() < 1e-8);
        assert_eq!(speciation.amounts[system.species_index("Calcite").unwrap()], 2.5);
    }

    #[test]
    fn test_rates_are_dissolution() {
        let model = model();
        let rates = model.rates(0.0, &model.initial_state()).unwrap();
        assert!(rates[0] < 0.0);

        let molar_mass = model.system().species_at(model.reactions()[0].mineral_index).molar_mass();
        let expected = -10f64.powf(-5.81) * 0.98 * 3.0 * molar_mass;
        assert!((rates[0] - expected).abs() < 1e-15);
    }

    #[test]
    fn test_overshoot_is_clipped_to_zero() {
        let model = model();
        let mut y = DVector::from_element(1, -4.9e-11);
        model.project_state(&mut y);
        assert_eq!(y[0], 0.0);
        assert!(model.check_state(&y).is_ok());

        let mut y = DVector::from_element(1, 1.5);
        model.project_state(&mut y);
        assert_eq!(y[0], 1.5);
    }

    #[test]
    fn test_check_state_rejects_negative_amounts() {
        let model = model();
        assert!(model.check_state(&DVector::from_element(1, 0.0)).is_ok());
        assert!(model.check_state(&DVector::from_element(1, -1e-3)).is_err());
    }
}
