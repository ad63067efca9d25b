//! Chemical entities
//!
//! Everything the numerical layers need to know about chemistry, and nothing
//! about how it is solved:
//!
//! - **`formula`**: element counts and charge from formula strings
//! - **`database`**: species records and the injectable database provider
//! - **`species`**: species, phases and the [`ChemicalSystem`] with its formula matrix
//! - **`reaction`**: kinetically controlled mineral reactions and their rate-law mechanisms
//! - **`state`**: declared equilibrium states and computed speciations

pub mod database;
pub mod formula;
pub mod reaction;
pub mod species;
pub mod state;

pub use database::{
    BuiltinProvider, DatabaseProvider, GAS_CONSTANT, InMemoryDatabase, MapProvider, SpeciesRecord,
    ThermoDatabase, builtin_database,
};
pub use formula::Formula;
pub use reaction::{ActivityPower, EquationTerm, Mechanism, MineralReaction, ReactionSystem, SurfaceAreaModel};
pub use species::{ChemicalSystem, Phase, PhaseKind, PhaseSpec, Species};
pub use state::{EquilibriumStateSpec, MixtureEntry, Speciation, SpeciesRole};
