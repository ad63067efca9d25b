//! Kinetic path driver
//!
//! Couples the pieces of a run:
//!
//! ```text
//!  Equilibrium State ──► initial speciation (inert species fixed)
//!                               │
//!                               ▼
//!              MineralKinetics ──► Scenario [From, To]
//!                               │
//!                  integrate ◄──┘
//!                     │  every accepted step:
//!                     │    re-equilibrate at the new mineral amounts
//!                     │    sample every plot at t − From
//!                     ▼
//!                 RunOutcome (series, status, stop time)
//! ```
//!
//! A step whose re-equilibration fails is rejected and retried with half the
//! step, like any other rejected step.

use crate::chemistry::{ChemicalSystem, EquilibriumStateSpec, MineralReaction, ReactionSystem, Speciation};
use crate::equilibrium::{EquilibriumConditions, EquilibriumOptions, EquilibriumSolver};
use crate::error::{KinpathError, SolverError};
use crate::kinetics::MineralKinetics;
use crate::output::{PlotSeries, PlotSpec, Sampler};
use crate::solver::integrate::{CancelFlag, integrate};
use crate::solver::methods::SolverMethod;
use crate::solver::scenario::Scenario;
use crate::solver::traits::{RunStatus, SolverConfiguration};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

// =================================================================================================
// Specification and options
// =================================================================================================

/// A declared kinetic path.
#[derive(Debug, Clone, PartialEq)]
pub struct KineticPathSpec {
    /// Name of the equilibrium state the path starts from.
    pub initial_condition: String,
    /// Start time (s).
    pub from: f64,
    /// End time (s).
    pub to: f64,
    /// Global indices of the kinetically controlled minerals.
    pub kinetic_species: Vec<usize>,
    /// Requested plots, in declaration order.
    pub plots: Vec<PlotSpec>,
}

/// Every numerical option of a run
///
/// Loaded from TOML by the command line; every field has a default.
///
/// ```rust
/// use kinpath::solver::{RunOptions, SolverMethod};
///
/// let options: RunOptions = toml::from_str("method = \"euler\"\n[equilibrium]\ntolerance = 1e-8\n").unwrap();
/// assert_eq!(options.method, SolverMethod::Euler);
/// assert_eq!(options.equilibrium.tolerance, 1e-8);
/// assert_eq!(options.equilibrium.max_iterations, 200);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Time integration.
    pub solver: SolverConfiguration,
    /// One-step method.
    pub method: SolverMethod,
    /// Equilibrium solves.
    pub equilibrium: EquilibriumOptions,
}

impl RunOptions {
    /// Validate both solver and equilibrium options
    pub fn validate(&self) -> Result<(), String> {
        self.solver.validate()?;
        self.equilibrium.validate()
    }
}

// =================================================================================================
// Outcome
// =================================================================================================

/// Everything a run produced, including the prefix of a failed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// One series per declared plot, in declaration order.
    pub plots: Vec<PlotSeries>,
    /// How the integration ended.
    pub status: RunStatus,
    /// Absolute time of the last accepted state (s).
    pub stop_time: f64,
    /// Speciation the path started from.
    pub initial_speciation: Speciation,
    /// Speciation at `stop_time`.
    pub final_speciation: Speciation,
    /// Accepted steps.
    pub accepted_steps: usize,
    /// Rejected steps.
    pub rejected_steps: usize,
}

impl RunOutcome {
    /// Whether the path reached its end time.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Series of the plot named `name` (e.g. `Plot 1`).
    pub fn series(&self, name: &str) -> Option<&PlotSeries> {
        self.plots.iter().find(|series| series.name == name)
    }
}

// =================================================================================================
// Driver
// =================================================================================================

/// Speciation of an equilibrium state with its inert species held fixed.
pub fn initial_speciation(
    system: &ChemicalSystem,
    state: &EquilibriumStateSpec,
    options: EquilibriumOptions,
) -> Result<Speciation, KinpathError> {
    let mut conditions =
        EquilibriumConditions::new(system, state.temperature, state.pressure, state.mixture_totals(system));
    for &(index, amount) in &state.inert {
        conditions = conditions.fix(index, amount);
    }
    Ok(EquilibriumSolver::new(options).solve(system, &conditions, None)?)
}

/// Run a kinetic path from `state`.
///
/// # Errors
///
/// - [`KinpathError::Equilibrium`] if the initial condition cannot be equilibrated
/// - [`KinpathError::Solver`] for invalid options or a kinetic species without reaction
///
/// Failures during integration are not errors: they end up in
/// [`RunOutcome::status`] next to the partial series.
pub fn run_kinetic_path(
    system: Arc<ChemicalSystem>,
    reactions: &ReactionSystem,
    state: &EquilibriumStateSpec,
    path: &KineticPathSpec,
    options: &RunOptions,
    cancel: &CancelFlag,
) -> Result<RunOutcome, KinpathError> {
    // ====== Step 1: Initial condition ======

    options.validate().map_err(SolverError::InvalidConfiguration)?;

    let initial = initial_speciation(&system, state, options.equilibrium)?;

    let kinetic: Vec<MineralReaction> = path
        .kinetic_species
        .iter()
        .map(|&index| {
            let name = system.species_at(index).name();
            reactions.get(name).cloned().ok_or_else(|| {
                SolverError::InvalidConfiguration(format!("no mineral reaction for kinetic species '{}'", name))
            })
        })
        .collect::<Result<_, _>>()?;

    info!(
        state = %state.name,
        species = system.num_species(),
        kinetic = kinetic.len(),
        plots = path.plots.len(),
        from = path.from,
        to = path.to,
        method = %options.method,
        "starting kinetic path"
    );

    // ====== Step 2: Model and scenario ======

    let model = Arc::new(MineralKinetics::new(
        Arc::clone(&system),
        kinetic,
        state,
        initial.clone(),
        options.equilibrium,
    ));
    let scenario = Scenario::new(model.clone(), path.from, path.to);

    // ====== Step 3: Integration with sampling ======

    let mut sampler = Sampler::new(&path.plots);
    sampler.record(0.0, &initial);

    let mut current = initial.clone();
    let solver = options.method.solver();
    let result = integrate(solver.as_ref(), &scenario, &options.solver, cancel, &mut |t, y| {
        let speciation = model.equilibrate(y)?;
        sampler.record(t - path.from, &speciation);
        current = speciation;
        Ok(())
    })?;

    // ====== Step 4: Outcome ======

    match &result.status {
        RunStatus::Completed => info!(
            accepted = result.accepted,
            rejected = result.rejected,
            samples = sampler.samples(),
            minerals = ?current.mineral_amounts(&system),
            "kinetic path completed"
        ),
        RunStatus::Failed(error) => warn!(
            stop_time = result.final_time(),
            accepted = result.accepted,
            rejected = result.rejected,
            minerals = ?current.mineral_amounts(&system),
            %error,
            "kinetic path stopped early"
        ),
    }

    Ok(RunOutcome {
        plots: sampler.into_series(),
        stop_time: result.final_time(),
        status: result.status,
        initial_speciation: initial,
        final_speciation: current,
        accepted_steps: result.accepted,
        rejected_steps: result.rejected,
    })
}

// =================================================================================================
// Tests
// =================================================================================================
