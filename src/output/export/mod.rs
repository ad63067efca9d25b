//! Export module for plot series.
//!
//! # Architecture
//!
//! This module defines the [`Exporter`] trait that abstracts the export format.
//! Each format is an independent implementation in its own sub-module;
//! adding a new format means adding a file, without modifying existing code.
//!
//! # Available formats
//!
//! | Format  | Module          |
//! |---------|-----------------|
//! | CSV     | [`csv`]         |
//!
//! # Usage example
//!
//! ```rust,ignore
//! use kinpath::output::export::{CsvExporter, Exporter};
//!
//! let written = CsvExporter::default().export_all(&outcome.plots, Path::new("results"))?;
//! ```

pub mod csv;

pub use csv::{CsvConfig, CsvExporter, CsvMetadata, export_series_csv, write_series_csv};

use crate::output::sampler::PlotSeries;
use std::path::{Path, PathBuf};

/// File stem for a plot name: `Plot 1` → `plot_1`.
pub fn file_stem(plot: &str) -> String {
    let stem: String = plot
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if stem.is_empty() { "plot".to_string() } else { stem }
}

/// Abstraction trait for all export formats.
///
/// # Associated type `Error`
///
/// Each format manages its own errors via the associated type, so callers can
/// react precisely to the failure.
pub trait Exporter {
    /// Error type specific to this export format.
    type Error: std::error::Error;

    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    /// Export one series to `path`.
    fn export(&self, series: &PlotSeries, path: &Path) -> Result<(), Self::Error>;

    /// Export every series into `directory`, one file per plot named after it.
    ///
    /// Returns the written paths in series order.
    fn export_all(&self, series: &[PlotSeries], directory: &Path) -> Result<Vec<PathBuf>, Self::Error> {
        let mut written = Vec::with_capacity(series.len());
        for s in series {
            let path = directory.join(format!("{}.{}", file_stem(&s.name), self.extension()));
            self.export(s, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Plot 1"), "plot_1");
        assert_eq!(file_stem("  pH/time "), "ph_time");
        assert_eq!(file_stem(""), "plot");
    }
}
