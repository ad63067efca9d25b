//! Activity models
//!
//! | Phase    | ln a                                        |
//! |----------|---------------------------------------------|
//! | Aqueous  | solute: `ln γ + ln m`, water: `ln x_w`      |
//! | Gaseous  | `ln x + ln(P / P°)`                         |
//! | Mineral  | `0` (pure phase)                            |
//!
//! Activity coefficients of aqueous solutes follow the Davies equation with a
//! temperature-dependent Debye–Hückel parameter:
//!
//! ```text
//! log10 γ = −A z² (√I / (1 + √I) − 0.3 I)
//! A       = 1.82e6 (ε T)^−1.5
//! ε       = 87.74 − 0.40008 t + 9.398e-4 t² − 1.41e-6 t³     (t in °C)
//! ```
//!
//! The equilibrium solver treats γ as constant within one Newton iteration, so
//! [`ln_activity_jacobian`] only differentiates the ideal part.

use crate::chemistry::{ChemicalSystem, PhaseKind};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::LN_10;

/// Standard-state pressure of gases (Pa).
pub const STANDARD_PRESSURE: f64 = 1e5;

/// Ionic strength above which Davies coefficients are frozen.
///
/// The equation is fitted for dilute solutions; past this point its `0.3 I`
/// term grows without bound.
pub const MAX_DAVIES_IONIC_STRENGTH: f64 = 3.0;

/// Activities, molalities and ionic strength of every species.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvaluation {
    /// Natural log of the activity (−∞ for absent species).
    pub ln_activities: DVector<f64>,
    /// Natural log of the activity coefficient (0 outside the aqueous phase).
    pub ln_gammas: DVector<f64>,
    /// Molality (mol/kg) of aqueous species, zero elsewhere.
    pub molalities: DVector<f64>,
    /// Ionic strength (mol/kg).
    pub ionic_strength: f64,
}

/// Debye–Hückel `A` parameter (kg^½/mol^½) at `temperature` (K).
///
/// ```rust
/// use kinpath::equilibrium::activity::debye_huckel_a;
///
/// assert!((debye_huckel_a(298.15) - 0.51).abs() < 0.005);
/// ```
pub fn debye_huckel_a(temperature: f64) -> f64 {
    let t = temperature - 273.15;
    let epsilon = 87.74 - 0.40008 * t + 9.398e-4 * t * t - 1.41e-6 * t * t * t;
    1.82e6 * (epsilon * temperature).powf(-1.5)
}

/// Davies `ln γ` of an ion of charge `charge`.
pub fn davies_ln_gamma(charge: f64, ionic_strength: f64, a: f64) -> f64 {
    let i = ionic_strength.clamp(0.0, MAX_DAVIES_IONIC_STRENGTH);
    let sqrt_i = i.sqrt();
    -a * charge * charge * (sqrt_i / (1.0 + sqrt_i) - 0.3 * i) * LN_10
}

fn ln_or_neg_infinity(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { f64::NEG_INFINITY }
}

/// Evaluate the activity of every species for the amounts `n`.
pub fn evaluate(system: &ChemicalSystem, n: &DVector<f64>, temperature: f64, pressure: f64) -> ActivityEvaluation {
    let count = system.num_species();
    let mut ln_activities = DVector::zeros(count);
    let mut ln_gammas = DVector::zeros(count);
    let mut molalities = DVector::zeros(count);
    let mut ionic_strength = 0.0;

    for phase in system.phases() {
        let range = phase.species();
        let total: f64 = range.clone().map(|i| n[i]).sum();

        match phase.kind() {
            PhaseKind::Aqueous => {
                // MissingSolvent is rejected when the system is built
                let Some(w) = system.water_index() else { continue };
                let solvent_mass = n[w] * system.species_at(w).molar_mass();

                for i in range.clone().filter(|&i| i != w) {
                    molalities[i] = if solvent_mass > 0.0 { n[i] / solvent_mass } else { 0.0 };
                    let z = system.species_at(i).charge();
                    ionic_strength += 0.5 * molalities[i] * z * z;
                }

                let a = debye_huckel_a(temperature);
                for i in range {
                    if i == w {
                        ln_activities[i] = ln_or_neg_infinity(n[w] / total);
                    } else {
                        ln_gammas[i] = davies_ln_gamma(system.species_at(i).charge(), ionic_strength, a);
                        ln_activities[i] = ln_gammas[i] + ln_or_neg_infinity(molalities[i]);
                    }
                }
            }
            PhaseKind::Gaseous => {
                let ln_p = (pressure / STANDARD_PRESSURE).ln();
                for i in range {
                    ln_activities[i] = if total > 0.0 { ln_or_neg_infinity(n[i] / total) + ln_p } else { f64::NEG_INFINITY };
                }
            }
            PhaseKind::Mineral => {
                for i in range {
                    ln_activities[i] = 0.0;
                }
            }
        }
    }

    ActivityEvaluation { ln_activities, ln_gammas, molalities, ionic_strength }
}

/// `∂ ln a_i / ∂ ln n_j` restricted to the species in `active`, with activity
/// coefficients held constant.
///
/// Only species of the same phase interact:
///
/// - aqueous solute `i`: `δ_ij − δ_jw`
/// - water `w`: `δ_wj − n_j / N_aq`
/// - gas `i`: `δ_ij − n_j / N_g`
/// - mineral: `0`
pub fn ln_activity_jacobian(system: &ChemicalSystem, n: &DVector<f64>, active: &[usize]) -> DMatrix<f64> {
    let size = active.len();
    let mut jacobian = DMatrix::zeros(size, size);
    let totals: Vec<f64> = system.phases().iter().map(|p| p.species().map(|i| n[i]).sum()).collect();
    let water = system.water_index();

    for (row, &i) in active.iter().enumerate() {
        let phase_index = system.species_at(i).phase();
        let phase = &system.phases()[phase_index];
        let total = totals[phase_index];

        for (col, &j) in active.iter().enumerate() {
            if system.species_at(j).phase() != phase_index {
                continue;
            }
            let delta = if i == j { 1.0 } else { 0.0 };

            jacobian[(row, col)] = match phase.kind() {
                PhaseKind::Aqueous if Some(i) == water => delta - n[j] / total,
                PhaseKind::Aqueous => delta - if Some(j) == water { 1.0 } else { 0.0 },
                PhaseKind::Gaseous => delta - n[j] / total,
                PhaseKind::Mineral => 0.0,
            };
        }
    }

    jacobian
}
