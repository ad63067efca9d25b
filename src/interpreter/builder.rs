//! Model builder
//!
//! Turns a syntax tree into validated domain entities, one pass per
//! top-level block kind, in dependency order:
//!
//! ```text
//! ChemicalSystem ──► ReactionSystem ──► Equilibrium <Name> ──► KineticPath
//!   (database,         (equations,        (conditions,          (interval,
//!    phases)            mechanisms)        mixture, inert)       kinetic species,
//!                                                                plots)
//! ```
//!
//! Every name is resolved against what earlier passes built, so a document
//! that builds can be run without further lookups.

use crate::chemistry::database::{BUILTIN_DATABASE_NAME, REFERENCE_TEMPERATURE};
use crate::chemistry::{
    ChemicalSystem, DatabaseProvider, EquationTerm, EquilibriumStateSpec, Formula, Mechanism, MineralReaction,
    MixtureEntry, PhaseKind, PhaseSpec, ReactionSystem, SurfaceAreaModel,
};
use crate::equilibrium::activity::STANDARD_PRESSURE;
use crate::error::{BuildError, ReferenceKind};
use crate::interpreter::syntax::{Block, Document, Entry, SyntaxNode};
use crate::interpreter::units::{QuantityClass, parse_number, parse_quantity, parse_quantity_as};
use crate::output::{PlotExpression, PlotSpec};
use crate::solver::KineticPathSpec;
use nalgebra::DVector;
use std::sync::Arc;
use tracing::debug;

/// Lowest supported temperature (K).
pub const MIN_TEMPERATURE: f64 = 273.15;
/// Highest supported temperature (K).
pub const MAX_TEMPERATURE: f64 = 573.15;
/// Lowest supported pressure (Pa).
pub const MIN_PRESSURE: f64 = 1e3;
/// Highest supported pressure (Pa).
pub const MAX_PRESSURE: f64 = 1e8;

/// Everything a document declares.
#[derive(Debug, Clone)]
pub struct Model {
    pub system: Arc<ChemicalSystem>,
    pub reactions: ReactionSystem,
    /// Equilibrium states in declaration order.
    pub states: Vec<EquilibriumStateSpec>,
    pub path: Option<KineticPathSpec>,
}

impl Model {
    /// State named `name`.
    pub fn state(&self, name: &str) -> Option<&EquilibriumStateSpec> {
        self.states.iter().find(|s| s.name == name)
    }
}

// =================================================================================================
// Helpers
// =================================================================================================

fn set_once<'a>(slot: &mut Option<&'a Block>, block: &'a Block) -> Result<(), BuildError> {
    if let Some(first) = slot {
        return Err(BuildError::validation(
            block.line,
            format!("duplicate {} block (first at line {})", block.keyword(), first.line),
        ));
    }
    *slot = Some(block);
    Ok(())
}

/// Reject unknown and repeated entries, and unknown sub-blocks.
fn check_children(block: &Block, entries: &[&str], blocks: &[&str]) -> Result<(), BuildError> {
    let mut seen: Vec<String> = Vec::new();
    for node in &block.children {
        match node {
            SyntaxNode::Entry(entry) => {
                let key = entry.key.join(" ");
                if !entries.contains(&entry.keyword()) {
                    return Err(BuildError::validation(
                        entry.line,
                        format!("unexpected entry '{}' in {}", key, block.title()),
                    ));
                }
                if seen.contains(&key) {
                    return Err(BuildError::validation(entry.line, format!("duplicate entry '{}' in {}", key, block.title())));
                }
                seen.push(key);
            }
            SyntaxNode::Block(child) => {
                if !blocks.contains(&child.keyword()) {
                    return Err(BuildError::validation(
                        child.line,
                        format!("unexpected block '{}' in {}", child.title(), block.title()),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Blocks holding only `Name: amount` entries (Mixture, InertSpecies).
fn check_entries_only(block: &Block) -> Result<(), BuildError> {
    match block.blocks().next() {
        Some(child) => Err(BuildError::validation(
            child.line,
            format!("'{}' in {} needs a value", child.title(), block.title()),
        )),
        None => Ok(()),
    }
}

fn required<'a>(block: &'a Block, key: &str) -> Result<&'a Entry, BuildError> {
    block
        .entry(key)
        .ok_or_else(|| BuildError::validation(block.line, format!("{} requires '{}'", block.title(), key)))
}

fn quantity(entry: &Entry, class: QuantityClass) -> Result<f64, BuildError> {
    parse_quantity(&entry.value, class).map_err(|source| BuildError::Unit { source, line: entry.line })
}

fn species_index(system: &ChemicalSystem, name: &str, line: usize) -> Result<usize, BuildError> {
    system
        .species_index(name)
        .ok_or_else(|| BuildError::reference(ReferenceKind::Species, name, line))
}

/// Amount of `entry` in mol, given in mol or by mass.
fn amount(entry: &Entry, molar_mass: f64) -> Result<f64, BuildError> {
    let (value, class) = parse_quantity_as(&entry.value, &[QuantityClass::Amount, QuantityClass::Mass])
        .map_err(|source| BuildError::Unit { source, line: entry.line })?;
    let moles = match class {
        QuantityClass::Mass => value / molar_mass,
        _ => value,
    };
    if !(moles >= 0.0 && moles.is_finite()) {
        return Err(BuildError::validation(
            entry.line,
            format!("amount of {} must be non-negative", entry.key.join(" ")),
        ));
    }
    Ok(moles)
}

// =================================================================================================
// Chemical system
// =================================================================================================

fn build_system(block: &Block, provider: &dyn DatabaseProvider) -> Result<ChemicalSystem, BuildError> {
    check_children(block, &["Database", "MineralPhases"], &["AqueousPhase", "GaseousPhase"])?;

    let database = match block.entry("Database") {
        Some(entry) => provider.load(&entry.value).map_err(|e| BuildError::validation(entry.line, e.to_string()))?,
        None => provider
            .load(BUILTIN_DATABASE_NAME)
            .map_err(|e| BuildError::validation(block.line, e.to_string()))?,
    };

    let mut phases = Vec::new();
    for phase in block.blocks() {
        check_children(phase, &["Species"], &[])?;
        let species: Vec<&str> = required(phase, "Species")?.values().collect();
        phases.push(match phase.keyword() {
            "AqueousPhase" => PhaseSpec::aqueous(&species),
            _ => PhaseSpec::gaseous(&species),
        });
    }
    if let Some(entry) = block.entry("MineralPhases") {
        phases.extend(entry.values().map(PhaseSpec::mineral));
    }

    ChemicalSystem::new(database, &phases).map_err(|e| BuildError::validation(block.line, e.to_string()))
}

// =================================================================================================
// Reactions
// =================================================================================================

fn parse_equation(entry: &Entry, system: &ChemicalSystem) -> Result<Vec<EquationTerm>, BuildError> {
    let mut terms: Vec<EquationTerm> = Vec::new();

    for token in entry.values() {
        let (coefficient, name) = token.split_once(':').ok_or_else(|| {
            BuildError::validation(entry.line, format!("equation term '{}' is not 'coefficient:Species'", token))
        })?;
        let coefficient =
            parse_number(coefficient).map_err(|source| BuildError::Unit { source, line: entry.line })?;
        let index = species_index(system, name, entry.line)?;

        if terms.iter().any(|t| t.index == index) {
            return Err(BuildError::validation(entry.line, format!("species '{}' appears twice in equation", name)));
        }
        terms.push(EquationTerm { species: name.to_string(), index, coefficient });
    }

    if terms.is_empty() {
        return Err(BuildError::validation(entry.line, "empty equation"));
    }
    Ok(terms)
}

fn build_mechanism(block: &Block, system: &ChemicalSystem) -> Result<Mechanism, BuildError> {
    if let Some(power) = block.block("ActivityPower") {
        return Err(BuildError::validation(power.line, format!("{} requires an exponent", power.title())));
    }
    check_children(block, &["RateConstant", "ActivationEnergy", "ActivityPower"], &[])?;

    let name = block.argument().unwrap_or_else(|| block.keyword().to_string());

    let rate_entry = required(block, "RateConstant")?;
    let rate_constant = quantity(rate_entry, QuantityClass::Rate)?;
    if rate_constant < 0.0 {
        return Err(BuildError::validation(rate_entry.line, "rate constant must be non-negative"));
    }

    let activation_energy = match block.entry("ActivationEnergy") {
        Some(entry) => quantity(entry, QuantityClass::MolarEnergy)?,
        None => 0.0,
    };

    let mut mechanism = Mechanism::new(&name, rate_constant, activation_energy);
    for entry in block.entries().filter(|e| e.keyword() == "ActivityPower") {
        let species = entry
            .argument()
            .ok_or_else(|| BuildError::validation(entry.line, "ActivityPower needs a species name"))?;
        let index = species_index(system, &species, entry.line)?;
        let exponent = parse_number(&entry.value).map_err(|source| BuildError::Unit { source, line: entry.line })?;
        mechanism = mechanism.with_activity_power(&species, index, exponent);
    }

    Ok(mechanism)
}

fn build_reaction(block: &Block, system: &ChemicalSystem) -> Result<MineralReaction, BuildError> {
    let mineral = block
        .argument()
        .ok_or_else(|| BuildError::validation(block.line, "MineralReaction needs a mineral name"))?;
    let mineral_index = species_index(system, &mineral, block.line)?;
    if system.phase_of(mineral_index).kind() != PhaseKind::Mineral {
        return Err(BuildError::validation(block.line, format!("'{}' is not a mineral", mineral)));
    }

    check_children(block, &["Equation", "SpecificSurfaceArea", "SurfaceArea"], &["Mechanism"])?;

    // ====== Equation ======

    let equation_entry = required(block, "Equation")?;
    let equation = parse_equation(equation_entry, system)?;
    match equation.iter().find(|t| t.index == mineral_index) {
        Some(term) if term.coefficient < 0.0 => {}
        Some(_) => {
            return Err(BuildError::validation(
                equation_entry.line,
                format!("{} must have a negative coefficient (dissolution direction)", mineral),
            ));
        }
        None => {
            return Err(BuildError::validation(
                equation_entry.line,
                format!("equation does not contain {}", mineral),
            ));
        }
    }

    // ====== Surface area ======

    let surface_area = match (block.entry("SpecificSurfaceArea"), block.entry("SurfaceArea")) {
        (Some(entry), None) => SurfaceAreaModel::Specific(quantity(entry, QuantityClass::SpecificArea)?),
        (None, Some(entry)) => SurfaceAreaModel::Constant(quantity(entry, QuantityClass::Area)?),
        (Some(_), Some(entry)) => {
            return Err(BuildError::validation(entry.line, "give SpecificSurfaceArea or SurfaceArea, not both"));
        }
        (None, None) => {
            return Err(BuildError::validation(
                block.line,
                format!("{} requires SpecificSurfaceArea or SurfaceArea", block.title()),
            ));
        }
    };
    if surface_area.area(1.0, 1.0) < 0.0 {
        return Err(BuildError::validation(block.line, "surface area must be non-negative"));
    }

    // ====== Mechanisms ======

    let mechanisms = block
        .blocks()
        .map(|mechanism| build_mechanism(mechanism, system))
        .collect::<Result<Vec<_>, _>>()?;
    if mechanisms.is_empty() {
        return Err(BuildError::validation(block.line, format!("{} has no Mechanism", block.title())));
    }

    let reaction = MineralReaction { mineral, mineral_index, equation, surface_area, mechanisms };

    if let Err((component, net)) = reaction.check_balance(system) {
        return Err(BuildError::validation(
            equation_entry.line,
            format!("equation of {} is unbalanced in {} by {:+}", reaction.mineral, component, net),
        ));
    }

    Ok(reaction)
}

fn build_reactions(block: &Block, system: &ChemicalSystem) -> Result<ReactionSystem, BuildError> {
    check_children(block, &[], &["MineralReaction"])?;

    let mut reactions = ReactionSystem::new();
    for child in block.blocks() {
        let reaction = build_reaction(child, system)?;
        let mineral = reaction.mineral.clone();
        if !reactions.insert(reaction) {
            return Err(BuildError::validation(child.line, format!("duplicate MineralReaction for {}", mineral)));
        }
    }
    Ok(reactions)
}

// =================================================================================================
// Equilibrium states
// =================================================================================================

fn mixture_entry(entry: &Entry, system: &ChemicalSystem) -> Result<MixtureEntry, BuildError> {
    let compound = entry.key.join(" ");

    let (components, molar_mass): (DVector<f64>, f64) = match system.species_index(&compound) {
        Some(index) => (
            system.formula_matrix().column(index).into_owned(),
            system.species_at(index).molar_mass(),
        ),
        None => {
            let formula = Formula::parse(&compound)
                .map_err(|_| BuildError::reference(ReferenceKind::Species, &compound, entry.line))?;
            let components = system.component_vector(&formula).ok_or_else(|| {
                BuildError::validation(
                    entry.line,
                    format!("compound '{}' contains elements absent from the chemical system", compound),
                )
            })?;
            (components, formula.molar_mass())
        }
    };

    Ok(MixtureEntry { amount: amount(entry, molar_mass)?, compound, components })
}

fn build_state(block: &Block, system: &ChemicalSystem) -> Result<EquilibriumStateSpec, BuildError> {
    let name = block.argument().ok_or_else(|| {
        BuildError::validation(block.line, "Equilibrium block needs a name, as in 'Equilibrium State'")
    })?;
    check_children(block, &["Temperature", "Pressure"], &["Mixture", "InertSpecies"])?;

    let temperature = match block.entry("Temperature") {
        Some(entry) => {
            let t = quantity(entry, QuantityClass::Temperature)?;
            if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&t) {
                return Err(BuildError::validation(
                    entry.line,
                    format!("temperature {} K outside supported range {} to {} K", t, MIN_TEMPERATURE, MAX_TEMPERATURE),
                ));
            }
            t
        }
        None => REFERENCE_TEMPERATURE,
    };

    let pressure = match block.entry("Pressure") {
        Some(entry) => {
            let p = quantity(entry, QuantityClass::Pressure)?;
            if !(MIN_PRESSURE..=MAX_PRESSURE).contains(&p) {
                return Err(BuildError::validation(
                    entry.line,
                    format!("pressure {} Pa outside supported range {} to {} Pa", p, MIN_PRESSURE, MAX_PRESSURE),
                ));
            }
            p
        }
        None => STANDARD_PRESSURE,
    };

    let mut mixture = Vec::new();
    for list in block.blocks().filter(|b| b.keyword() == "Mixture") {
        check_entries_only(list)?;
        for entry in list.entries() {
            mixture.push(mixture_entry(entry, system)?);
        }
    }

    let mut inert: Vec<(usize, f64)> = Vec::new();
    for list in block.blocks().filter(|b| b.keyword() == "InertSpecies") {
        check_entries_only(list)?;
        for entry in list.entries() {
            let species = entry.key.join(" ");
            let index = species_index(system, &species, entry.line)?;
            if inert.iter().any(|(i, _)| *i == index) {
                return Err(BuildError::validation(entry.line, format!("'{}' is listed twice", species)));
            }
            inert.push((index, amount(entry, system.species_at(index).molar_mass())?));
        }
    }

    Ok(EquilibriumStateSpec { name, temperature, pressure, mixture, inert })
}

// =================================================================================================
// Kinetic path
// =================================================================================================

fn build_path(
    block: &Block,
    system: &ChemicalSystem,
    reactions: &ReactionSystem,
    states: &[EquilibriumStateSpec],
) -> Result<KineticPathSpec, BuildError> {
    check_children(block, &["From", "To", "InitialCondition", "KineticSpecies"], &["Plot"])?;

    // ====== Interval ======

    let from = match block.entry("From") {
        Some(entry) => quantity(entry, QuantityClass::Time)?,
        None => 0.0,
    };
    let to_entry = required(block, "To")?;
    let to = quantity(to_entry, QuantityClass::Time)?;
    if to < from {
        return Err(BuildError::validation(to_entry.line, format!("To ({} s) precedes From ({} s)", to, from)));
    }

    // ====== Initial condition ======

    let state = match (block.entry("InitialCondition"), states) {
        (Some(entry), _) => states
            .iter()
            .find(|s| s.name == entry.value)
            .ok_or_else(|| BuildError::reference(ReferenceKind::EquilibriumState, &entry.value, entry.line))?,
        (None, [only]) => only,
        (None, _) => return Err(BuildError::validation(block.line, "KineticPath requires 'InitialCondition'")),
    };

    // ====== Kinetic species ======

    let mut kinetic_species = Vec::new();
    if let Some(entry) = block.entry("KineticSpecies") {
        for name in entry.values() {
            let index = species_index(system, name, entry.line)?;
            if reactions.get(name).is_none() {
                return Err(BuildError::reference(ReferenceKind::MineralReaction, name, entry.line));
            }
            if state.inert_amount(index).is_none() {
                return Err(BuildError::validation(
                    entry.line,
                    format!("kinetic species '{}' needs an initial amount under InertSpecies of '{}'", name, state.name),
                ));
            }
            if kinetic_species.contains(&index) {
                return Err(BuildError::validation(entry.line, format!("'{}' is listed twice", name)));
            }
            kinetic_species.push(index);
        }
    }

    // ====== Plots ======

    let mut plots: Vec<PlotSpec> = Vec::new();
    for plot in block.blocks() {
        check_children(plot, &["x", "y"], &[])?;
        let x = required(plot, "x")?;
        let y = required(plot, "y")?;

        let name = plot.title();
        if plots.iter().any(|p| p.name == name) {
            return Err(BuildError::validation(plot.line, format!("duplicate plot '{}'", name)));
        }
        plots.push(PlotSpec {
            name,
            x: PlotExpression::parse(&x.value, system, x.line)?,
            y: PlotExpression::parse(&y.value, system, y.line)?,
        });
    }

    Ok(KineticPathSpec { initial_condition: state.name.clone(), from, to, kinetic_species, plots })
}

// =================================================================================================
// Entry point
// =================================================================================================

/// Build every entity a document declares.
///
/// `provider` resolves the `Database` entry of the chemical system.
///
/// # Errors
///
/// [`BuildError`] for the first problem found, with its line.
pub fn build(document: &Document, provider: &dyn DatabaseProvider) -> Result<Model, BuildError> {
    // ====== Step 1: Classify top-level blocks ======

    let mut system_block = None;
    let mut reaction_block = None;
    let mut path_block = None;
    let mut state_blocks = Vec::new();

    for node in &document.nodes {
        match node {
            SyntaxNode::Entry(entry) => {
                return Err(BuildError::validation(
                    entry.line,
                    format!("entry '{}' outside of any block", entry.key.join(" ")),
                ));
            }
            SyntaxNode::Block(block) => match block.keyword() {
                "ChemicalSystem" => set_once(&mut system_block, block)?,
                "ReactionSystem" => set_once(&mut reaction_block, block)?,
                "KineticPath" => set_once(&mut path_block, block)?,
                "Equilibrium" => state_blocks.push(block),
                _ => return Err(BuildError::reference(ReferenceKind::Block, block.title(), block.line)),
            },
        }
    }

    // ====== Step 2: One pass per entity kind ======

    let system_block =
        system_block.ok_or_else(|| BuildError::validation(1, "document has no ChemicalSystem block"))?;
    let system = build_system(system_block, provider)?;

    let reactions = match reaction_block {
        Some(block) => build_reactions(block, &system)?,
        None => ReactionSystem::new(),
    };

    let mut states: Vec<EquilibriumStateSpec> = Vec::new();
    for block in state_blocks {
        let state = build_state(block, &system)?;
        if states.iter().any(|s| s.name == state.name) {
            return Err(BuildError::validation(block.line, format!("duplicate equilibrium state '{}'", state.name)));
        }
        states.push(state);
    }

    let path = path_block.map(|block| build_path(block, &system, &reactions, &states)).transpose()?;

    debug!(
        species = system.num_species(),
        components = system.components().len(),
        reactions = reactions.len(),
        states = states.len(),
        plots = path.as_ref().map_or(0, |p| p.plots.len()),
        "document built"
    );

    Ok(Model { system: Arc::new(system), reactions, states, path })
}

// =================================================================================================
// Tests
// =================================================================================================
