//! Chemical equilibrium
//!
//! - **`activity`**: activity models per phase kind (Davies for aqueous
//!   solutes, ideal mixing for gases, unit activity for minerals)
//! - **`solver`**: Gibbs energy minimization of the fast species under mass
//!   and charge conservation
//!
//! ```rust
//! use kinpath::chemistry::{ChemicalSystem, Formula, PhaseSpec, builtin_database};
//! use kinpath::equilibrium::{EquilibriumConditions, EquilibriumSolver};
//!
//! let system = ChemicalSystem::new(
//!     builtin_database(),
//!     &[PhaseSpec::aqueous(&["H2O(l)", "H+", "OH-", "Na+", "Cl-"])],
//! )?;
//!
//! let water = system.component_vector(&Formula::parse("H2O")?).unwrap();
//! let salt = system.component_vector(&Formula::parse("NaCl")?).unwrap();
//! let totals = water * 55.5 + salt * 0.1;
//!
//! let conditions = EquilibriumConditions::new(&system, 298.15, 1e5, totals);
//! let speciation = EquilibriumSolver::default().solve(&system, &conditions, None)?;
//!
//! assert!((speciation.ionic_strength - 0.1).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod activity;
pub mod solver;

pub use activity::ActivityEvaluation;
pub use solver::{EquilibriumConditions, EquilibriumOptions, EquilibriumSolver};
