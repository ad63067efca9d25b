//! Output of kinetic path results
//!
//! - **Sampling**: plot expressions resolved at build time and evaluated after
//!   every accepted step
//! - **Export**: CSV files for external analysis and plotting
//!
//! # Architecture
//!
//! ```text
//! output/
//! ├── mod.rs              ← This file
//! ├── sampler.rs          ← Plot expressions, series accumulation
//! └── export/             ← Data export
//!     ├── mod.rs
//!     └── csv.rs
//! ```
//!
//! Rendering plots is left to external tools; series are plain `(x, y)`
//! vectors so any plotting library can consume them.

pub mod export;
pub mod sampler;

pub use export::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
pub use sampler::{AxisUnit, PlotExpression, PlotSeries, PlotSpec, Sampler, SpeciesRef};
