//! kinpath: Declarative Mineral Kinetics
//!
//! A small language for describing a chemical system, its kinetically
//! controlled mineral reactions, an initial equilibrium state and a kinetic
//! path, plus the numerical machinery that runs it.
//!
//! # Architecture
//!
//! kinpath is built on two core principles:
//!
//! 1. **Separation of Chemistry and Numerics**
//!    - Chemical entities describe what reacts and how fast
//!    - Equilibrium and ODE solvers provide the methods
//!
//! 2. **Resolution Before Execution**
//!    - Every name in a document is resolved and validated before any solve
//!    - A document that builds runs without further lookups
//!
//! # Quick Start
//!
//! ```rust
//! use kinpath::interpreter::interpret;
//!
//! let document = "
//! ChemicalSystem:
//!     AqueousPhase:
//!         Species: H2O(l) H+ OH- HCO3- CO2(aq) Ca+2 Cl-
//!     MineralPhases: Calcite
//! ReactionSystem:
//!     MineralReaction Calcite:
//!         Equation: -1:Calcite -1:H+ 1:Ca+2 1:HCO3-
//!         SpecificSurfaceArea: 9.8 cm2/g
//!         Mechanism Acid:
//!             RateConstant: 10**(-0.30) mol/(m2*s)
//!             ActivityPower H+: 1.0
//! Equilibrium State:
//!     Mixture:
//!         H2O: 1 kg
//!         HCl: 1 mmol
//!     InertSpecies:
//!         Calcite: 1 g
//! KineticPath:
//!     To: 1 min
//!     KineticSpecies: Calcite
//!     Plot 1:
//!         x: t:s
//!         y: n[Calcite]
//! ";
//!
//! let outcome = interpret(document)?;
//! assert!(outcome.is_success());
//! let calcite = outcome.series("Plot 1").unwrap();
//! assert!(calcite.ys().last() < calcite.ys().first());
//! # Ok::<(), kinpath::error::KinpathError>(())
//! ```
//!
//! # Modules
//!
//! - [`interpreter`]: document syntax, units and model building
//! - [`chemistry`]: species, phases, reactions and states
//! - [`equilibrium`]: Gibbs energy minimization with fixed inert species
//! - [`kinetics`]: rate laws and the mineral kinetics ODE model
//! - [`solver`]: time integration and the kinetic path driver
//! - [`output`]: sampling of plot expressions and CSV export
//! - [`error`]: error types of every stage

// Core modules
pub mod chemistry;
pub mod equilibrium;
pub mod error;
pub mod kinetics;
pub mod solver;

// Front and back ends
pub mod interpreter;
pub mod output;

pub mod prelude {
    //! Convenient imports for common usage
    //!
    //! ```rust
    //! use kinpath::prelude::*;
    //! ```
    pub use crate::chemistry::{ChemicalSystem, DatabaseProvider, ReactionSystem, Speciation};
    pub use crate::error::KinpathError;
    pub use crate::interpreter::{check, interpret, interpret_batch, interpret_with};
    pub use crate::output::{CsvConfig, CsvExporter, Exporter, PlotSeries};
    pub use crate::solver::{
        CancelFlag, EulerSolver, RK4Solver, RunOptions, RunOutcome, RunStatus, Solver, SolverConfiguration,
        SolverMethod, SolverType,
    };
}
