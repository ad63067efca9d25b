//! Gibbs energy minimization for the fast species
//!
//! # Problem
//!
//! Given component totals `b` for the fast species, find amounts `n > 0`
//! minimizing the Gibbs energy subject to `A n = b`. The first-order
//! conditions are
//!
//! ```text
//! f_i = μ°_i/RT + ln a_i(n) − Σ_r A_ri λ_r − τ/n_i = 0      (every fast species i)
//! g_r = Σ_i A_ri n_i − b_r                       = 0      (every independent component r)
//! ```
//!
//! where `λ` are component potentials. The `τ/n_i` barrier applies to gas and
//! mineral species only: it keeps a phase that should vanish at a tiny
//! positive amount instead of driving its logarithm to −∞.
//!
//! # Method
//!
//! Newton iterations on `(y, λ)` with `y = ln n`:
//!
//! ```text
//! ┌               ┐ ┌    ┐     ┌   ┐
//! │ H      −Aᵀ    │ │ Δy │ = − │ f │        H = ∂ln a/∂ln n + diag(τ/n)
//! │ A·diag(n)  0  │ │ Δλ │     │ g │
//! └               ┘ └    ┘     └   ┘
//! ```
//!
//! - Activity coefficients are lagged (re-evaluated every iteration, held
//!   constant inside the Jacobian).
//! - The step is scaled so that no `|Δy|` exceeds `max_log_step`.
//! - The formula matrix is usually rank deficient (oxygen is often a
//!   combination of the other rows); only linearly independent rows enter `g`.
//! - Species containing an element whose total is zero are removed.
//! - When there are as many fast species as independent rows, `A n = b` fixes
//!   the amounts directly and no iteration is needed.
//!
//! # Starting point
//!
//! Without a warm start the amounts start uniform, are projected onto
//! `A n = b` in the least-norm sense and floored at a small positive value;
//! `λ` is then the least-squares solution of `f = 0`. The guess depends only on
//! the inputs, so results are reproducible.

use crate::chemistry::{ChemicalSystem, PhaseKind, Speciation, SpeciesRole};
use crate::equilibrium::activity::{self, ActivityEvaluation};
use crate::error::EquilibriumError;
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use tracing::{debug, trace, warn};

/// Lower bound on `ln n` (≈ 1e-300 mol).
const LN_AMOUNT_FLOOR: f64 = -690.0;

/// Relative threshold under which a component total counts as zero.
const ZERO_TOTAL: f64 = 1e-14;

/// Relative pivot threshold when selecting independent components.
const RANK_TOLERANCE: f64 = 1e-10;

// =================================================================================================
// Options
// =================================================================================================

/// Numerical options of the equilibrium solver.
///
/// ```rust
/// use kinpath::equilibrium::EquilibriumOptions;
///
/// let options = EquilibriumOptions::default();
/// assert!(options.validate().is_ok());
/// assert_eq!(options.max_iterations, 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct EquilibriumOptions {
    /// Convergence threshold on the scaled residual.
    pub tolerance: f64,
    /// Newton iteration limit.
    pub max_iterations: usize,
    /// Largest change of any `ln n` in one iteration.
    pub max_log_step: f64,
    /// Barrier weight `τ` for gas and mineral species (mol).
    pub barrier: f64,
}

impl Default for EquilibriumOptions {
    fn default() -> Self {
        Self { tolerance: 1e-10, max_iterations: 200, max_log_step: 2.0, barrier: 1e-14 }
    }
}

impl EquilibriumOptions {
    /// Check that every option is usable.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err("Equilibrium tolerance must be positive".to_string());
        }
        if self.max_iterations == 0 {
            return Err("Equilibrium iteration limit must be at least 1".to_string());
        }
        if !(self.max_log_step > 0.0 && self.max_log_step.is_finite()) {
            return Err("Maximum log step must be positive".to_string());
        }
        if !(self.barrier > 0.0 && self.barrier.is_finite()) {
            return Err("Barrier weight must be positive".to_string());
        }
        Ok(())
    }
}

// =================================================================================================
// Conditions
// =================================================================================================

/// Inputs of one equilibrium calculation.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumConditions {
    /// Temperature (K).
    pub temperature: f64,
    /// Pressure (Pa).
    pub pressure: f64,
    /// Component totals to distribute among the fast species.
    pub totals: DVector<f64>,
    /// Role of each species.
    pub roles: Vec<SpeciesRole>,
    /// Amounts of the fixed species (entries of fast species are ignored).
    pub fixed_amounts: DVector<f64>,
}

impl EquilibriumConditions {
    /// All species fast, nothing fixed.
    pub fn new(system: &ChemicalSystem, temperature: f64, pressure: f64, totals: DVector<f64>) -> Self {
        let count = system.num_species();
        Self {
            temperature,
            pressure,
            totals,
            roles: vec![SpeciesRole::FastEquilibrium; count],
            fixed_amounts: DVector::zeros(count),
        }
    }

    /// Hold species `index` at `amount`.
    pub fn fix(mut self, index: usize, amount: f64) -> Self {
        self.roles[index] = SpeciesRole::Fixed;
        self.fixed_amounts[index] = amount;
        self
    }
}

// =================================================================================================
// Solver
// =================================================================================================

/// Equilibrium solver for a fixed set of options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquilibriumSolver {
    options: EquilibriumOptions,
}

/// Reduced problem: fast species that can exist, and independent components.
struct Reduced {
    active: Vec<usize>,
    rows: Vec<usize>,
    matrix: DMatrix<f64>,
    totals: DVector<f64>,
    barrier: Vec<bool>,
}

impl EquilibriumSolver {
    /// Create a solver.
    pub fn new(options: EquilibriumOptions) -> Self {
        Self { options }
    }

    /// Solver options.
    pub fn options(&self) -> &EquilibriumOptions {
        &self.options
    }

    /// Compute the speciation of the fast species.
    ///
    /// `guess` is a previous speciation of the same system used as a warm
    /// start; it never changes the converged answer beyond the tolerance.
    ///
    /// # Errors
    ///
    /// - [`EquilibriumError::InfeasibleTotals`] if a total is negative
    /// - [`EquilibriumError::Singular`] if a Newton system cannot be factorized
    /// - [`EquilibriumError::NotConverged`] after `max_iterations`
    pub fn solve(
        &self,
        system: &ChemicalSystem,
        conditions: &EquilibriumConditions,
        guess: Option<&Speciation>,
    ) -> Result<Speciation, EquilibriumError> {
        let reduced = self.reduce(system, conditions)?;

        let mut n = DVector::zeros(system.num_species());
        for (i, role) in conditions.roles.iter().enumerate() {
            if *role == SpeciesRole::Fixed {
                n[i] = conditions.fixed_amounts[i].max(0.0);
            }
        }

        if reduced.active.is_empty() {
            return self.solve_without_fast_species(system, conditions, &reduced, n);
        }

        if reduced.active.len() == reduced.rows.len() {
            return self.solve_determined(system, conditions, &reduced, n);
        }

        self.solve_newton(system, conditions, &reduced, n, guess)
    }

    /// Remove impossible species and dependent components.
    fn reduce(&self, system: &ChemicalSystem, conditions: &EquilibriumConditions) -> Result<Reduced, EquilibriumError> {
        let a = system.formula_matrix();
        let components = system.components();
        let charge_row = components.len() - 1;
        let scale = conditions.totals.iter().fold(1.0f64, |acc, b| acc.max(b.abs()));

        let mut absent = vec![false; components.len()];
        for (r, total) in conditions.totals.iter().enumerate() {
            if r == charge_row {
                continue;
            }
            if *total < -ZERO_TOTAL * scale {
                return Err(EquilibriumError::InfeasibleTotals { component: components[r].clone(), total: *total });
            }
            absent[r] = total.abs() <= ZERO_TOTAL * scale;
        }

        let active: Vec<usize> = (0..system.num_species())
            .filter(|&i| conditions.roles[i] == SpeciesRole::FastEquilibrium)
            .filter(|&i| (0..charge_row).all(|r| !(absent[r] && a[(r, i)] != 0.0)))
            .collect();

        let rows = independent_rows(a, &active);
        let matrix = DMatrix::from_fn(rows.len(), active.len(), |r, c| a[(rows[r], active[c])]);
        let totals = DVector::from_iterator(rows.len(), rows.iter().map(|&r| conditions.totals[r]));
        let barrier = active
            .iter()
            .map(|&i| system.phase_of(i).kind() != PhaseKind::Aqueous)
            .collect();

        Ok(Reduced { active, rows, matrix, totals, barrier })
    }

    fn solve_without_fast_species(
        &self,
        system: &ChemicalSystem,
        conditions: &EquilibriumConditions,
        reduced: &Reduced,
        n: DVector<f64>,
    ) -> Result<Speciation, EquilibriumError> {
        let scale = conditions.totals.iter().fold(1.0f64, |acc, b| acc.max(b.abs()));
        if let Some((r, total)) = conditions.totals.iter().enumerate().find(|(_, b)| b.abs() > ZERO_TOTAL * scale) {
            return Err(EquilibriumError::InfeasibleTotals {
                component: system.components()[r].clone(),
                total: *total,
            });
        }
        let eval = activity::evaluate(system, &n, conditions.temperature, conditions.pressure);
        Ok(self.speciation(system, conditions, reduced, n, eval, &DVector::zeros(0), 0))
    }

    /// As many fast species as independent components: `A n = b` has one solution.
    fn solve_determined(
        &self,
        system: &ChemicalSystem,
        conditions: &EquilibriumConditions,
        reduced: &Reduced,
        mut n: DVector<f64>,
    ) -> Result<Speciation, EquilibriumError> {
        let lu = reduced.matrix.clone().lu();
        let amounts = lu.solve(&reduced.totals).ok_or(EquilibriumError::Singular { iteration: 0 })?;

        let scale = reduced.totals.iter().fold(1.0f64, |acc, b| acc.max(b.abs()));
        for (k, &i) in reduced.active.iter().enumerate() {
            if amounts[k] < -self.options.tolerance * scale {
                return Err(EquilibriumError::InfeasibleTotals {
                    component: system.species_at(i).name().to_string(),
                    total: amounts[k],
                });
            }
            n[i] = amounts[k].max(0.0);
        }

        let eval = activity::evaluate(system, &n, conditions.temperature, conditions.pressure);

        // λ from Aᵀ λ = μ + ln a when every activity is defined
        let mu = system.standard_potentials(conditions.temperature);
        let rhs = DVector::from_iterator(
            reduced.active.len(),
            reduced.active.iter().map(|&i| mu[i] + eval.ln_activities[i]),
        );
        let lambda = if rhs.iter().all(|v| v.is_finite()) {
            reduced.matrix.transpose().lu().solve(&rhs).unwrap_or_else(|| DVector::zeros(reduced.rows.len()))
        } else {
            DVector::zeros(reduced.rows.len())
        };

        debug!(species = reduced.active.len(), "equilibrium determined by mass balance");
        Ok(self.speciation(system, conditions, reduced, n, eval, &lambda, 0))
    }

    fn solve_newton(
        &self,
        system: &ChemicalSystem,
        conditions: &EquilibriumConditions,
        reduced: &Reduced,
        mut n: DVector<f64>,
        guess: Option<&Speciation>,
    ) -> Result<Speciation, EquilibriumError> {
        let active = &reduced.active;
        let size = active.len();
        let rank = reduced.rows.len();
        let tau = self.options.barrier;

        let mu_all = system.standard_potentials(conditions.temperature);
        let mu = DVector::from_iterator(size, active.iter().map(|&i| mu_all[i]));

        let (mut y, mut lambda) = match guess {
            Some(previous) if previous.amounts.len() == n.len() => self.warm_start(reduced, previous),
            _ => self.cold_start(system, conditions, reduced, &mu, &n),
        };

        let mut residual = f64::INFINITY;

        for iteration in 0..self.options.max_iterations {
            for (k, &i) in active.iter().enumerate() {
                n[i] = y[k].exp();
            }
            let eval = activity::evaluate(system, &n, conditions.temperature, conditions.pressure);

            // ====== Residuals ======

            let amounts = DVector::from_iterator(size, active.iter().map(|&i| n[i]));
            let mut f = &mu - reduced.matrix.transpose() * &lambda;
            for (k, &i) in active.iter().enumerate() {
                f[k] += eval.ln_activities[i];
                if reduced.barrier[k] {
                    f[k] -= tau / amounts[k];
                }
            }
            let g = &reduced.matrix * &amounts - &reduced.totals;

            residual = f.amax();
            for r in 0..rank {
                let scale = reduced
                    .matrix
                    .row(r)
                    .iter()
                    .zip(amounts.iter())
                    .map(|(a, n)| a.abs() * n)
                    .sum::<f64>()
                    .max(reduced.totals[r].abs())
                    .max(f64::MIN_POSITIVE);
                residual = residual.max(g[r].abs() / scale);
            }

            trace!(iteration, residual, ionic_strength = eval.ionic_strength, "newton iteration");

            if !residual.is_finite() {
                break;
            }
            if residual < self.options.tolerance {
                debug!(iterations = iteration, residual, "equilibrium converged");
                return Ok(self.speciation(system, conditions, reduced, n, eval, &lambda, iteration));
            }

            // ====== Newton system ======

            let h = activity::ln_activity_jacobian(system, &n, active);
            let mut jacobian = DMatrix::zeros(size + rank, size + rank);
            jacobian.view_mut((0, 0), (size, size)).copy_from(&h);
            for k in 0..size {
                if reduced.barrier[k] {
                    jacobian[(k, k)] += tau / amounts[k];
                }
            }
            jacobian.view_mut((0, size), (size, rank)).copy_from(&(-reduced.matrix.transpose()));
            let scaled = DMatrix::from_fn(rank, size, |r, c| reduced.matrix[(r, c)] * amounts[c]);
            jacobian.view_mut((size, 0), (rank, size)).copy_from(&scaled);

            let mut rhs = DVector::zeros(size + rank);
            rhs.rows_mut(0, size).copy_from(&(-&f));
            rhs.rows_mut(size, rank).copy_from(&(-&g));

            let delta = jacobian.lu().solve(&rhs).ok_or(EquilibriumError::Singular { iteration })?;

            // ====== Damped update ======

            let dy = delta.rows(0, size);
            let largest = dy.amax();
            let alpha = if largest > self.options.max_log_step { self.options.max_log_step / largest } else { 1.0 };

            for k in 0..size {
                y[k] = (y[k] + alpha * dy[k]).max(LN_AMOUNT_FLOOR);
            }
            lambda += delta.rows(size, rank) * alpha;
        }

        warn!(iterations = self.options.max_iterations, residual, "equilibrium did not converge");
        Err(EquilibriumError::NotConverged { iterations: self.options.max_iterations, residual })
    }

    /// Previous amounts and potentials. Species absent from the previous
    /// speciation restart from a small fraction of the mean amount.
    fn warm_start(&self, reduced: &Reduced, previous: &Speciation) -> (DVector<f64>, DVector<f64>) {
        let present: Vec<f64> = reduced.active.iter().map(|&i| previous.amounts[i]).filter(|v| *v > 0.0).collect();
        let mean = if present.is_empty() { 1.0 } else { present.iter().sum::<f64>() / present.len() as f64 };

        let y = DVector::from_iterator(
            reduced.active.len(),
            reduced.active.iter().map(|&i| {
                let amount = previous.amounts[i];
                if amount > 0.0 { amount.ln().max(LN_AMOUNT_FLOOR) } else { (1e-10 * mean).ln() }
            }),
        );
        let lambda = DVector::from_iterator(
            reduced.rows.len(),
            reduced.rows.iter().map(|&r| previous.potentials.get(r).copied().unwrap_or(0.0)),
        );
        (y, lambda)
    }

    /// Uniform amounts projected onto `A n = b`, then least-squares `λ`.
    fn cold_start(
        &self,
        system: &ChemicalSystem,
        conditions: &EquilibriumConditions,
        reduced: &Reduced,
        mu: &DVector<f64>,
        fixed: &DVector<f64>,
    ) -> (DVector<f64>, DVector<f64>) {
        let size = reduced.active.len();
        let a = &reduced.matrix;
        let positive: f64 = reduced.totals.iter().filter(|b| **b > 0.0).sum();
        let uniform = (positive / size as f64).max(1e-6);

        let mut amounts = DVector::from_element(size, uniform);
        let gram = a * a.transpose();
        if let Some(correction) = gram.lu().solve(&(&reduced.totals - a * &amounts)) {
            amounts += a.transpose() * correction;
        }
        let floor = 1e-3 * uniform;
        amounts.apply(|v| *v = v.max(floor));

        let mut n = fixed.clone();
        for (k, &i) in reduced.active.iter().enumerate() {
            n[i] = amounts[k];
        }
        let eval = activity::evaluate(system, &n, conditions.temperature, conditions.pressure);
        let target = DVector::from_iterator(size, reduced.active.iter().enumerate().map(|(k, &i)| mu[k] + eval.ln_activities[i]));

        let lambda = (a * a.transpose())
            .lu()
            .solve(&(a * target))
            .unwrap_or_else(|| DVector::zeros(reduced.rows.len()));

        (amounts.map(f64::ln), lambda)
    }

    #[allow(clippy::too_many_arguments)]
    fn speciation(
        &self,
        system: &ChemicalSystem,
        conditions: &EquilibriumConditions,
        reduced: &Reduced,
        amounts: DVector<f64>,
        eval: ActivityEvaluation,
        lambda: &DVector<f64>,
        iterations: usize,
    ) -> Speciation {
        let mut potentials = DVector::zeros(system.components().len());
        for (k, &r) in reduced.rows.iter().enumerate() {
            potentials[r] = lambda.get(k).copied().unwrap_or(0.0);
        }

        Speciation {
            temperature: conditions.temperature,
            pressure: conditions.pressure,
            amounts,
            ln_activities: eval.ln_activities,
            molalities: eval.molalities,
            ionic_strength: eval.ionic_strength,
            roles: conditions.roles.clone(),
            potentials,
            iterations,
        }
    }
}

/// Rows of `A` (restricted to `columns`) forming a basis of its row space.
///
/// Rows are taken greedily in order, so element rows win over the charge row
/// when both are equivalent.
fn independent_rows(a: &DMatrix<f64>, columns: &[usize]) -> Vec<usize> {
    let mut basis: Vec<(DVector<f64>, usize)> = Vec::new();
    let mut rows = Vec::new();

    for r in 0..a.nrows() {
        let mut v = DVector::from_iterator(columns.len(), columns.iter().map(|&c| a[(r, c)]));
        let norm = v.amax();
        if norm == 0.0 {
            continue;
        }
        for (pivot_row, pivot) in &basis {
            let factor = v[*pivot] / pivot_row[*pivot];
            if factor != 0.0 {
                v.axpy(-factor, pivot_row, 1.0);
            }
        }
        let pivot = v.iamax();
        if v[pivot].abs() > RANK_TOLERANCE * norm {
            basis.push((v, pivot));
            rows.push(r);
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chemistry::{Formula, PhaseSpec, builtin_database};

    fn water_amount(kg: f64) -> f64 {
        kg / Formula::parse("H2O").unwrap().molar_mass()
    }

    fn totals_of(system: &ChemicalSystem, compounds: &[(&str, f64)]) -> DVector<f64> {
        let mut b = DVector::zeros(system.components().len());
        for (formula, amount) in compounds {
            let v = system.component_vector(&Formula::parse(formula).unwrap()).unwrap();
            b.axpy(*amount, &v, 1.0);
        }
        b
    }

    fn conservation_error(system: &ChemicalSystem, speciation: &Speciation, b: &DVector<f64>) -> f64 {
        let fast: DVector<f64> = DVector::from_iterator(
            system.num_species(),
            (0..system.num_species()).map(|i| {
                if speciation.roles[i] == SpeciesRole::FastEquilibrium { speciation.amounts[i] } else { 0.0 }
            }),
        );
        (system.component_amounts(&fast) - b).amax()
    }

    #[test]
    fn test_independent_rows_skip_dependent_oxygen() {
        // H2O only: H and O rows are proportional
        let a = DMatrix::from_row_slice(3, 1, &[2.0, 1.0, 0.0]);
        assert_eq!(independent_rows(&a, &[0]), vec![0]);

        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, -1.0]);
        assert_eq!(independent_rows(&a, &[0, 1]), vec![0, 1]);
    }

    #[test]
    fn test_options_validation() {
        assert!(EquilibriumOptions::default().validate().is_ok());
        let bad = EquilibriumOptions { tolerance: 0.0, ..Default::default() };
        assert!(bad.validate().is_err());
        let bad = EquilibriumOptions { max_iterations: 0, ..Default::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_trivial_fixed_point() {
        // one species per component: nothing can react
        let system = ChemicalSystem::new(
            builtin_database(),
            &[PhaseSpec::gaseous(&["N2(g)"]), PhaseSpec::mineral("Quartz")],
        )
        .unwrap();
        let b = totals_of(&system, &[("N2", 0.7), ("SiO2", 2.5)]);
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b);

        let speciation = EquilibriumSolver::default().solve(&system, &conditions, None).unwrap();
        assert_eq!(speciation.iterations, 0);
        assert!((speciation.amounts[0] - 0.7).abs() < 1e-14);
        assert!((speciation.amounts[1] - 2.5).abs() < 1e-14);
    }

    #[test]
    fn test_pure_water() {
        let system = ChemicalSystem::new(builtin_database(), &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-"])]).unwrap();
        let b = totals_of(&system, &[("H2O", water_amount(1.0))]);
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b.clone());

        let speciation = EquilibriumSolver::default().solve(&system, &conditions, None).unwrap();
        let ph = speciation.ph(&system).unwrap();
        assert!((ph - 7.0).abs() < 0.05, "pH of pure water was {}", ph);
        assert!(conservation_error(&system, &speciation, &b) < 1e-8);

        // charge balance: [H+] = [OH-]
        assert!((speciation.amounts[1] - speciation.amounts[2]).abs() < 1e-12);
    }

    #[test]
    fn test_zero_total_removes_species() {
        let system = ChemicalSystem::new(
            builtin_database(),
            &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "Ca+2", "Cl-"])],
        )
        .unwrap();
        let b = totals_of(&system, &[("H2O", water_amount(1.0)), ("HCl", 0.01)]);
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b);

        let speciation = EquilibriumSolver::default().solve(&system, &conditions, None).unwrap();
        assert_eq!(speciation.amounts[3], 0.0);
        assert_eq!(speciation.activity(3), 0.0);
        // strong acid: pH close to 2
        let ph = speciation.ph(&system).unwrap();
        assert!((ph - 2.0).abs() < 0.1, "pH was {}", ph);
    }

    #[test]
    fn test_negative_total_is_infeasible() {
        let system = ChemicalSystem::new(builtin_database(), &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-"])]).unwrap();
        let mut b = totals_of(&system, &[("H2O", 10.0)]);
        b[0] = -1.0;
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b);

        let result = EquilibriumSolver::default().solve(&system, &conditions, None);
        assert!(matches!(result, Err(EquilibriumError::InfeasibleTotals { .. })));
    }

    #[test]
    fn test_fixed_species_keep_their_amount() {
        let system = ChemicalSystem::new(
            builtin_database(),
            &[
                PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "HCO3-", "CO2(aq)", "Ca+2"]),
                PhaseSpec::mineral("Calcite"),
            ],
        )
        .unwrap();
        let b = totals_of(&system, &[("H2O", water_amount(1.0)), ("CO2", 0.1)]);
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b.clone()).fix(6, 3.0);

        let speciation = EquilibriumSolver::default().solve(&system, &conditions, None).unwrap();
        assert_eq!(speciation.amounts[6], 3.0);
        assert_eq!(speciation.roles[6], SpeciesRole::Fixed);
        // no calcium in the fluid
        assert_eq!(speciation.amounts[5], 0.0);
        assert!(conservation_error(&system, &speciation, &b) < 1e-8);
        // carbonic acid solution is acidic
        let ph = speciation.ph(&system).unwrap();
        assert!(ph > 3.0 && ph < 6.0, "pH was {}", ph);
    }

    #[test]
    fn test_temperature_changes_activities_not_totals() {
        let system = ChemicalSystem::new(
            builtin_database(),
            &[
                PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "HCO3-", "CO2(aq)", "Ca+2", "Na+", "Cl-"]),
                PhaseSpec::gaseous(&["H2O(g)", "CO2(g)"]),
            ],
        )
        .unwrap();
        let b = totals_of(
            &system,
            &[("H2O", water_amount(1.0)), ("CO2", 0.5), ("NaCl", 0.1), ("CaCl2", 0.01), ("CaCO3", 0.01)],
        );
        let solver = EquilibriumSolver::default();

        let cold = solver.solve(&system, &EquilibriumConditions::new(&system, 298.15, 1e5, b.clone()), None).unwrap();
        let hot = solver.solve(&system, &EquilibriumConditions::new(&system, 353.15, 5e5, b.clone()), None).unwrap();

        assert!(conservation_error(&system, &cold, &b) < 1e-8);
        assert!(conservation_error(&system, &hot, &b) < 1e-8);
        assert!((cold.ln_activities[1] - hot.ln_activities[1]).abs() > 1e-6);
    }

    #[test]
    fn test_warm_start_agrees_with_cold_start() {
        let system = ChemicalSystem::new(
            builtin_database(),
            &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "HCO3-", "CO3-2", "CO2(aq)", "Na+"])],
        )
        .unwrap();
        let solver = EquilibriumSolver::default();

        let b1 = totals_of(&system, &[("H2O", water_amount(1.0)), ("NaHCO3", 0.01)]);
        let first = solver.solve(&system, &EquilibriumConditions::new(&system, 298.15, 1e5, b1), None).unwrap();

        let b2 = totals_of(&system, &[("H2O", water_amount(1.0)), ("NaHCO3", 0.011)]);
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b2);
        let warm = solver.solve(&system, &conditions, Some(&first)).unwrap();
        let cold = solver.solve(&system, &conditions, None).unwrap();

        assert!(warm.iterations <= cold.iterations);
        for i in 0..system.num_species() {
            let scale = cold.amounts[i].abs().max(1e-30);
            assert!(((warm.amounts[i] - cold.amounts[i]) / scale).abs() < 1e-6);
        }
    }

    #[test]
    fn test_deterministic() {
        let system = ChemicalSystem::new(builtin_database(), &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "Na+", "Cl-"])]).unwrap();
        let b = totals_of(&system, &[("H2O", water_amount(1.0)), ("NaCl", 1.0)]);
        let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, b);
        let solver = EquilibriumSolver::default();

        let a = solver.solve(&system, &conditions, None).unwrap();
        let b = solver.solve(&system, &conditions, None).unwrap();
        assert_eq!(a, b);
    }
}
