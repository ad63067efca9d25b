//! Error types for the `kinpath` crate.
//!
//! Each stage of the pipeline owns its error enum. [`KinpathError`] is the
//! umbrella type returned by the top-level entry points; every stage error
//! converts into it with `?`.
//!
//! | Stage                 | Error                 |
//! |-----------------------|-----------------------|
//! | Quantity literals     | [`UnitError`]         |
//! | Document structure    | [`SyntaxError`]       |
//! | Model building        | [`BuildError`]        |
//! | Species lookup        | [`DatabaseError`]     |
//! | Chemical formulas     | [`FormulaError`]      |
//! | System assembly       | [`SystemError`]       |
//! | Equilibrium solve     | [`EquilibriumError`]  |
//! | Rate evaluation       | [`KineticsError`]     |
//! | Time integration      | [`SolverError`]       |
//! | File export           | [`ExportError`]       |

use crate::chemistry::PhaseKind;
use std::fmt;

/// Errors raised while converting a quantity literal to SI units.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    /// The numeric part of the literal could not be evaluated.
    #[error("malformed number in '{literal}': {reason}")]
    MalformedNumber {
        /// The offending literal.
        literal: String,
        /// What went wrong.
        reason: String,
    },

    /// A unit symbol is not in the unit table.
    #[error("unknown unit '{unit}'")]
    UnknownUnit {
        /// The unrecognized symbol.
        unit: String,
    },

    /// The unit expression is syntactically broken (unbalanced parentheses, dangling operator).
    #[error("malformed unit expression '{expression}'")]
    MalformedUnit {
        /// The unit expression.
        expression: String,
    },

    /// The unit is valid but measures a different kind of quantity.
    #[error("unit '{unit}' is not a {expected} unit")]
    IncompatibleUnit {
        /// The unit expression.
        unit: String,
        /// The quantity class the field expects.
        expected: &'static str,
    },
}

/// A structural error in a document, located at a 1-based line number.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("syntax error at line {line}: {message}")]
pub struct SyntaxError {
    /// 1-based line number.
    pub line: usize,
    /// Description.
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

/// The kind of entity an unresolved name was expected to denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// A species of the chemical system.
    Species,
    /// A mineral with a kinetic reaction.
    MineralReaction,
    /// A named equilibrium state.
    EquilibriumState,
    /// A top-level block.
    Block,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Species => "species",
            ReferenceKind::MineralReaction => "mineral reaction",
            ReferenceKind::EquilibriumState => "equilibrium state",
            ReferenceKind::Block => "block",
        };
        f.write_str(name)
    }
}

/// Errors raised while turning a syntax tree into domain entities.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// A name does not resolve to a known entity.
    #[error("line {line}: unknown {kind} '{name}'")]
    Reference {
        /// What the name should have denoted.
        kind: ReferenceKind,
        /// The unresolved name.
        name: String,
        /// 1-based line number.
        line: usize,
    },

    /// A plot expression names a quantity the system cannot provide.
    #[error("line {line}: cannot resolve plot expression '{expression}'")]
    UnknownExpression {
        /// The expression text.
        expression: String,
        /// 1-based line number.
        line: usize,
    },

    /// The document is well formed but semantically inconsistent.
    #[error("line {line}: {message}")]
    Validation {
        /// Description.
        message: String,
        /// 1-based line number.
        line: usize,
    },

    /// A quantity literal failed to convert.
    #[error("line {line}: {source}")]
    Unit {
        /// The conversion failure.
        #[source]
        source: UnitError,
        /// 1-based line number.
        line: usize,
    },
}

impl BuildError {
    pub(crate) fn validation(line: usize, message: impl Into<String>) -> Self {
        BuildError::Validation { message: message.into(), line }
    }

    pub(crate) fn reference(kind: ReferenceKind, name: impl Into<String>, line: usize) -> Self {
        BuildError::Reference { kind, name: name.into(), line }
    }
}

/// Errors reported by a thermodynamic database provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// The database has no record for the species.
    #[error("species '{0}' not found in database")]
    UnknownSpecies(String),

    /// The database itself could not be loaded.
    #[error("cannot load database '{name}': {reason}")]
    DatabaseLoadError {
        /// Requested database name.
        name: String,
        /// Why loading failed.
        reason: String,
    },
}

/// Errors raised while parsing a chemical formula.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    /// Unexpected character or structure.
    #[error("malformed formula '{formula}': {reason}")]
    Malformed {
        /// The formula.
        formula: String,
        /// What went wrong.
        reason: String,
    },

    /// An element symbol not in the periodic table subset.
    #[error("unknown element '{element}' in formula '{formula}'")]
    UnknownElement {
        /// The formula.
        formula: String,
        /// The symbol.
        element: String,
    },
}

/// Errors raised while assembling a chemical system from database records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SystemError {
    /// Species lookup failed.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A database formula could not be parsed.
    #[error("species '{species}': {source}")]
    Formula {
        /// Species name.
        species: String,
        /// Parse failure.
        #[source]
        source: FormulaError,
    },

    /// The same species appears in two phases, or twice in one phase.
    #[error("species '{0}' is listed more than once")]
    DuplicateSpecies(String),

    /// A species is placed in a phase of the wrong kind.
    #[error("species '{species}' is a {found} species and cannot be placed in a {expected} phase")]
    PhaseMismatch {
        /// Species name.
        species: String,
        /// Kind of the phase being built.
        expected: PhaseKind,
        /// Kind recorded in the database.
        found: PhaseKind,
    },

    /// A phase without species.
    #[error("phase '{0}' has no species")]
    EmptyPhase(String),

    /// An aqueous phase without `H2O(l)`, so molalities are undefined.
    #[error("aqueous phase '{0}' must contain the solvent H2O(l)")]
    MissingSolvent(String),
}

/// Errors raised by the equilibrium solver.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EquilibriumError {
    /// Newton iterations exhausted before the residual met the tolerance.
    #[error("equilibrium not converged after {iterations} iterations (residual {residual:e})")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
        /// Final scaled residual.
        residual: f64,
    },

    /// A conserved total is negative beyond round-off.
    #[error("negative total {total:e} for component '{component}'")]
    InfeasibleTotals {
        /// Element symbol or `Z` for charge.
        component: String,
        /// The offending total.
        total: f64,
    },

    /// The Newton system could not be factorized.
    #[error("singular equilibrium Jacobian at iteration {iteration}")]
    Singular {
        /// Iteration at which the factorization failed.
        iteration: usize,
    },
}

/// Errors raised while evaluating reaction rates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KineticsError {
    /// A rate evaluated to NaN or infinity.
    #[error("non-finite rate in reaction '{reaction}', mechanism '{mechanism}': {message}")]
    Computation {
        /// Mineral of the reaction.
        reaction: String,
        /// Mechanism name.
        mechanism: String,
        /// Description.
        message: String,
    },
}

/// Errors that a kinetic model reports to the integrator.
///
/// All of them are recoverable by reducing the step size.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Re-speciation failed.
    #[error(transparent)]
    Equilibrium(#[from] EquilibriumError),

    /// Rate evaluation failed.
    #[error(transparent)]
    Kinetics(#[from] KineticsError),

    /// The candidate state is outside the model domain (for example a negative amount).
    #[error("state outside model domain: {0}")]
    OutOfDomain(String),
}

/// Errors raised by numerical solvers and the kinetic path driver.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// Solver configuration rejected by validation.
    #[error("invalid solver configuration: {0}")]
    InvalidConfiguration(String),

    /// NaN or infinity in the integrated state.
    #[error("non-finite value in state at step {step}")]
    NonFinite {
        /// Step index.
        step: usize,
    },

    /// Integration could not proceed past `time` after exhausting retries.
    #[error("kinetic path failed at t = {time} s after {retries} retries: {reason}")]
    KineticPathFailed {
        /// Last successfully reached time (s).
        time: f64,
        /// Consecutive rejections before giving up.
        retries: usize,
        /// Last rejection cause.
        reason: String,
    },

    /// The run was aborted through its cancellation flag.
    #[error("run cancelled at t = {time} s")]
    Cancelled {
        /// Last successfully reached time (s).
        time: f64,
    },
}

/// Errors raised while writing result files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Nothing to write.
    #[error("empty series '{0}'")]
    Empty(String),

    /// NaN or infinity in a series.
    #[error("non-finite value in series '{0}'")]
    NonFinite(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the public entry points.
#[derive(Debug, thiserror::Error)]
pub enum KinpathError {
    /// Document structure.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// Model building.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Initial equilibrium calculation.
    #[error("initial condition: {0}")]
    Equilibrium(#[from] EquilibriumError),

    /// Integration setup.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// Result export.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Option file parsing.
    #[error("invalid options: {0}")]
    Config(String),

    /// File access.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
