//! Rate laws of mineral reactions
//!
//! For a mechanism `i` of a reaction:
//!
//! ```text
//! r_i = k_i · exp(−Ea_i/R · (1/T − 1/T_ref)) · Π_j a_j^p_ij         mol/(m²·s)
//! ```
//!
//! The product is evaluated in log space from the speciation's `ln a`, so a
//! species with zero activity (`ln a = −∞`) and a positive exponent gives an
//! exact zero. A negative exponent on a zero activity gives `+∞`, reported as
//! [`KineticsError::Computation`].
//!
//! Every function here is pure: the result depends only on its arguments.

use crate::chemistry::database::{GAS_CONSTANT, REFERENCE_TEMPERATURE};
use crate::chemistry::{ChemicalSystem, Mechanism, MineralReaction, Speciation};
use crate::error::KineticsError;

/// Arrhenius factor relative to the reference temperature.
///
/// ```rust
/// use kinpath::kinetics::rates::arrhenius_factor;
///
/// assert_eq!(arrhenius_factor(23_500.0, 298.15), 1.0);
/// assert!(arrhenius_factor(23_500.0, 333.15) > 1.0);
/// ```
pub fn arrhenius_factor(activation_energy: f64, temperature: f64) -> f64 {
    (-activation_energy / GAS_CONSTANT * (1.0 / temperature - 1.0 / REFERENCE_TEMPERATURE)).exp()
}

/// Specific rate (mol/(m²·s)) of one mechanism.
pub fn mechanism_rate(
    reaction: &MineralReaction,
    mechanism: &Mechanism,
    speciation: &Speciation,
) -> Result<f64, KineticsError> {
    let mut ln_product = 0.0;
    for power in &mechanism.activity_powers {
        if power.exponent == 0.0 {
            continue;
        }
        ln_product += power.exponent * speciation.ln_activities[power.index];
    }

    let rate = mechanism.rate_constant
        * arrhenius_factor(mechanism.activation_energy, speciation.temperature)
        * ln_product.exp();

    if !rate.is_finite() {
        return Err(KineticsError::Computation {
            reaction: reaction.mineral.clone(),
            mechanism: mechanism.name.clone(),
            message: format!("rate evaluated to {}", rate),
        });
    }

    Ok(rate)
}

/// Net specific rate (mol/(m²·s)) of a reaction, positive for dissolution.
pub fn net_specific_rate(reaction: &MineralReaction, speciation: &Speciation) -> Result<f64, KineticsError> {
    reaction
        .mechanisms
        .iter()
        .map(|mechanism| mechanism_rate(reaction, mechanism, speciation))
        .sum()
}

/// Absolute reaction rate (mol/s): net specific rate times the current
/// reactive surface area of the mineral.
///
/// A mineral that is fully consumed cannot dissolve further, so a positive
/// rate is cut to zero once its amount reaches zero.
pub fn absolute_rate(
    reaction: &MineralReaction,
    system: &ChemicalSystem,
    speciation: &Speciation,
) -> Result<f64, KineticsError> {
    let amount = speciation.amounts[reaction.mineral_index];
    let molar_mass = system.species_at(reaction.mineral_index).molar_mass();
    let area = reaction.surface_area.area(amount, molar_mass);

    let specific = net_specific_rate(reaction, speciation)?;
    if specific > 0.0 && amount <= 0.0 {
        return Ok(0.0);
    }

    let rate = specific * area;
    if !rate.is_finite() {
        return Err(KineticsError::Computation {
            reaction: reaction.mineral.clone(),
            mechanism: "surface area".to_string(),
            message: format!("rate evaluated to {}", rate),
        });
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::{
        EquationTerm, Mechanism, PhaseSpec, SpeciesRole, SurfaceAreaModel, builtin_database,
    };
    use nalgebra::DVector;

    fn system() -> ChemicalSystem {
        ChemicalSystem::new(
            builtin_database(),
            &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "HCO3-", "Ca+2"]), PhaseSpec::mineral("Calcite")],
        )
        .unwrap()
    }

    fn speciation(ln_h: f64, calcite: f64, temperature: f64) -> Speciation {
        let mut ln_activities = DVector::zeros(6);
        ln_activities[1] = ln_h;
        let mut amounts = DVector::from_element(6, 1e-3);
        amounts[5] = calcite;
        Speciation {
            temperature,
            pressure: 1e5,
            amounts,
            ln_activities,
            molalities: DVector::zeros(6),
            ionic_strength: 0.0,
            roles: vec![SpeciesRole::FastEquilibrium; 6],
            potentials: DVector::zeros(5),
            iterations: 0,
        }
    }

    fn calcite(mechanisms: Vec<Mechanism>) -> MineralReaction {
        MineralReaction {
            mineral: "Calcite".to_string(),
            mineral_index: 5,
            equation: vec![
                EquationTerm { species: "Calcite".to_string(), index: 5, coefficient: -1.0 },
                EquationTerm { species: "H+".to_string(), index: 1, coefficient: -1.0 },
                EquationTerm { species: "Ca+2".to_string(), index: 4, coefficient: 1.0 },
                EquationTerm { species: "HCO3-".to_string(), index: 3, coefficient: 1.0 },
            ],
            surface_area: SurfaceAreaModel::Specific(0.98),
            mechanisms,
        }
    }

    fn neutral(k: f64) -> Mechanism {
        Mechanism::new("Neutral", k, 23_500.0)
    }

    fn acid(k: f64, exponent: f64) -> Mechanism {
        Mechanism::new("Acid", k, 14_400.0).with_activity_power("H+", 1, exponent)
    }

    #[test]
    fn test_neutral_rate_at_reference_temperature() {
        let reaction = calcite(vec![neutral(10f64.powf(-5.81))]);
        let rate = net_specific_rate(&reaction, &speciation(-7.0 * std::f64::consts::LN_10, 3.0, 298.15)).unwrap();
        assert!((rate - 10f64.powf(-5.81)).abs() < 1e-18);
    }

    #[test]
    fn test_zero_activity_gives_zero_rate() {
        let reaction = calcite(vec![acid(10f64.powf(-0.30), 1.0)]);
        let rate = net_specific_rate(&reaction, &speciation(f64::NEG_INFINITY, 3.0, 298.15)).unwrap();
        assert_eq!(rate, 0.0);
    }

    #[test]
    fn test_negative_exponent_on_zero_activity_fails() {
        let reaction = calcite(vec![acid(1.0, -0.5)]);
        let result = net_specific_rate(&reaction, &speciation(f64::NEG_INFINITY, 3.0, 298.15));
        match result {
            Err(KineticsError::Computation { reaction, mechanism, .. }) => {
                assert_eq!(reaction, "Calcite");
                assert_eq!(mechanism, "Acid");
            }
            other => panic!("expected computation error, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_monotonic_in_rate_constant() {
        let state = speciation(-4.0 * std::f64::consts::LN_10, 3.0, 333.15);
        let mut previous = 0.0;
        for k in [1e-9, 1e-7, 1e-5, 1e-3] {
            let rate = net_specific_rate(&calcite(vec![neutral(1e-6), acid(k, 1.0)]), &state).unwrap();
            assert!(rate > previous);
            previous = rate;
        }
    }

    #[test]
    fn test_mechanisms_add() {
        let state = speciation(-3.0 * std::f64::consts::LN_10, 3.0, 298.15);
        let a = net_specific_rate(&calcite(vec![neutral(1e-6)]), &state).unwrap();
        let b = net_specific_rate(&calcite(vec![acid(0.5, 1.0)]), &state).unwrap();
        let both = net_specific_rate(&calcite(vec![neutral(1e-6), acid(0.5, 1.0)]), &state).unwrap();
        assert!((both - (a + b)).abs() < 1e-15);
        // a(H+) = 1e-3
        assert!((b - 0.5e-3).abs() < 1e-12);
    }

    #[test]
    fn test_absolute_rate_uses_surface_area() {
        let system = system();
        let reaction = calcite(vec![neutral(1e-6)]);
        let state = speciation(0.0, 2.0, 298.15);
        let molar_mass = system.species_at(5).molar_mass();
        let rate = absolute_rate(&reaction, &system, &state).unwrap();
        assert!((rate - 1e-6 * 0.98 * 2.0 * molar_mass).abs() < 1e-15);

        // exhausted mineral stops dissolving
        let empty = speciation(0.0, 0.0, 298.15);
        assert_eq!(absolute_rate(&reaction, &system, &empty).unwrap(), 0.0);
    }
}
