//! Document interpreter
//!
//! From text to results in three stages:
//!
//! ```text
//! text ──syntax::parse──► Document ──builder::build──► Model ──run_kinetic_path──► RunOutcome
//!        SyntaxError                 BuildError              equilibrium / solver errors
//! ```
//!
//! - **`syntax`**: indentation-structured blocks and `Key: Value` entries
//! - **`units`**: quantity literals with units, converted to SI
//! - **`builder`**: name resolution and validation into domain entities
//!
//! # Example
//!
//! ```rust,no_run
//! use kinpath::interpreter::interpret;
//!
//! let text = std::fs::read_to_string("data/demo3.kin")?;
//! let outcome = interpret(&text)?;
//! for series in &outcome.plots {
//!     println!("{}: {} samples", series.name, series.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod syntax;
pub mod units;

pub use builder::{Model, build};
pub use syntax::{Block, Document, Entry, SyntaxNode, parse};

use crate::chemistry::{BuiltinProvider, DatabaseProvider};
use crate::error::{BuildError, KinpathError};
use crate::solver::{CancelFlag, RunOptions, RunOutcome, run_kinetic_path};
use tracing::debug;

/// Parse and build a document without running it.
///
/// # Errors
///
/// [`KinpathError::Syntax`] or [`KinpathError::Build`] for the first problem found.
pub fn check(text: &str, provider: &dyn DatabaseProvider) -> Result<Model, KinpathError> {
    let document = parse(text)?;
    debug!(nodes = document.nodes.len(), "document parsed");
    Ok(build(&document, provider)?)
}

/// Run the kinetic path of a document with the built-in database and default options.
pub fn interpret(text: &str) -> Result<RunOutcome, KinpathError> {
    interpret_with(text, &BuiltinProvider, &RunOptions::default(), &CancelFlag::new())
}

/// Run the kinetic path of a document.
///
/// # Errors
///
/// - [`KinpathError::Syntax`] / [`KinpathError::Build`] for an invalid document,
///   including one without a `KineticPath` block
/// - [`KinpathError::Equilibrium`] if the initial condition cannot be equilibrated
/// - [`KinpathError::Solver`] for invalid options
///
/// A path that fails part-way is not an error; see [`RunOutcome::status`].
pub fn interpret_with(
    text: &str,
    provider: &dyn DatabaseProvider,
    options: &RunOptions,
    cancel: &CancelFlag,
) -> Result<RunOutcome, KinpathError> {
    let model = check(text, provider)?;

    let path = model
        .path
        .as_ref()
        .ok_or_else(|| BuildError::validation(1, "document has no KineticPath block"))?;
    let state = model
        .state(&path.initial_condition)
        .ok_or_else(|| BuildError::validation(1, format!("no equilibrium state '{}'", path.initial_condition)))?;

    run_kinetic_path(model.system.clone(), &model.reactions, state, path, options, cancel)
}

/// Run several documents, in parallel when the `parallel` feature is enabled.
///
/// Results come back in input order; one failing document does not stop the others.
pub fn interpret_batch<S: AsRef<str> + Sync>(
    texts: &[S],
    provider: &dyn DatabaseProvider,
    options: &RunOptions,
    cancel: &CancelFlag,
) -> Vec<Result<RunOutcome, KinpathError>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        texts
            .par_iter()
            .map(|text| interpret_with(text.as_ref(), provider, options, cancel))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        texts.iter().map(|text| interpret_with(text.as_ref(), provider, options, cancel)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyntaxError;

    const WATER_ONLY: &str = "
ChemicalSystem:
    AqueousPhase:
        Species: H2O(l) H+ OH- Na+ Cl-
Equilibrium Brine:
    Mixture:
        H2O: 1 kg
        NaCl: 0.1 mol
";

    #[test]
    fn test_check_reports_syntax_line() {
        let result = check("ChemicalSystem:\n\tDatabase: x\n", &BuiltinProvider);
        assert!(matches!(result, Err(KinpathError::Syntax(SyntaxError { line: 2, .. }))));
    }

    #[test]
    fn test_missing_kinetic_path() {
        assert!(check(WATER_ONLY, &BuiltinProvider).is_ok());
        match interpret(WATER_ONLY) {
            Err(KinpathError::Build(BuildError::Validation { message, .. })) => {
                assert!(message.contains("KineticPath"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_zero_length_path_has_single_sample() {
        let text = format!(
            "{}KineticPath:\n    From: 0\n    To: 0\n    Plot 1:\n        x: t\n        y: pH\n",
            WATER_ONLY
        );
        let outcome = interpret(&text).unwrap();

        assert!(outcome.is_success());
        let series = outcome.series("Plot 1").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.xs(), vec![0.0]);
        assert!((series.ys()[0] - 7.0).abs() < 0.5);
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let good = format!("{}KineticPath:\n    To: 0\n    Plot A:\n        x: t\n        y: I\n", WATER_ONLY);
        let texts = vec![good.clone(), "Broken\n".to_string(), good];

        let results = interpret_batch(&texts, &BuiltinProvider, &RunOptions::default(), &CancelFlag::new());

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(KinpathError::Syntax(_))));
        assert!(results[2].is_ok());
    }
}
