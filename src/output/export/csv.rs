//! CSV export of plot series
//!
//! One file per plot, two columns named after the plot expressions. The
//! format is readable by spreadsheets, pandas and most plotting tools.
//!
//! # Minimal Export
//!
//! ```rust,ignore
//! use kinpath::output::export::export_series_csv;
//!
//! export_series_csv(&outcome.plots[0], "plot_1.csv", None)?;
//! ```
//!
//! **Output** (`plot_1.csv`):
//! ```csv
//! t:month,n[Calcite]
//! 0.000000e0,3.000000e0
//! 1.269406e-6,2.999999e0
//! ...
//! ```
//!
//! # With Metadata
//!
//! ```csv
//! # Kinetic Path Data
//! # Generated: 2026-10-19T09:12:44+00:00
//! # Plot: Plot 1
//! # Method: rk4
//! # Status: completed
//! # Stop Time: 2629800 s
//! # Accepted Steps: 214
//! #
//! t:month,n[Calcite]
//! ...
//! ```

use crate::error::ExportError;
use crate::output::export::Exporter;
use crate::output::sampler::PlotSeries;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Example
///
/// ```rust
/// use kinpath::output::export::CsvConfig;
///
/// let config = CsvConfig { delimiter: ';', precision: 10, ..Default::default() };
/// assert_eq!(config.decimal_separator, '.');
/// ```
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Significant digits after the point, scientific notation (default: 6)
    pub precision: usize,

    /// Include metadata header comments (default: false)
    pub include_metadata: bool,

    /// Metadata to include in header
    pub metadata: Option<CsvMetadata>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self { delimiter: ',', decimal_separator: '.', precision: 6, include_metadata: false, metadata: None }
    }
}

impl CsvConfig {
    /// Semicolon delimiter with a decimal comma
    pub fn european() -> Self {
        Self { delimiter: ';', decimal_separator: ',', ..Default::default() }
    }

    /// 12 digits after the point
    pub fn high_precision() -> Self {
        Self { precision: 12, ..Default::default() }
    }

    /// Builder pattern: set delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder pattern: set precision
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Builder pattern: enable metadata
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.include_metadata = true;
        self.metadata = Some(metadata);
        self
    }
}

/// Metadata for CSV header comments
///
/// Only fields that are set end up in the header.
#[derive(Debug, Clone, Default)]
pub struct CsvMetadata {
    /// Integration method (e.g. "rk4")
    pub method: Option<String>,

    /// "completed" or the failure message
    pub status: Option<String>,

    /// Time at which integration stopped (s)
    pub stop_time: Option<f64>,

    /// Accepted steps
    pub accepted_steps: Option<usize>,

    /// Rejected steps
    pub rejected_steps: Option<usize>,

    /// Additional custom parameters
    pub custom: Vec<(String, String)>,
}

impl CsvMetadata {
    /// Metadata describing a finished run
    pub fn from_run(method: &str, status: &str, stop_time: f64, accepted: usize, rejected: usize) -> Self {
        Self {
            method: Some(method.to_string()),
            status: Some(status.to_string()),
            stop_time: Some(stop_time),
            accepted_steps: Some(accepted),
            rejected_steps: Some(rejected),
            custom: Vec::new(),
        }
    }

    /// Add custom parameter
    pub fn add_custom(&mut self, key: &str, value: &str) {
        self.custom.push((key.to_string(), value.to_string()));
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Write metadata header comments
fn write_metadata_header<W: Write>(writer: &mut W, plot: &str, metadata: &CsvMetadata) -> std::io::Result<()> {
    writeln!(writer, "# Kinetic Path Data")?;
    writeln!(writer, "# Generated: {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(writer, "# Plot: {}", plot)?;

    if let Some(method) = &metadata.method {
        writeln!(writer, "# Method: {}", method)?;
    }
    if let Some(status) = &metadata.status {
        writeln!(writer, "# Status: {}", status)?;
    }
    if let Some(stop_time) = metadata.stop_time {
        writeln!(writer, "# Stop Time: {} s", stop_time)?;
    }
    if let Some(accepted) = metadata.accepted_steps {
        writeln!(writer, "# Accepted Steps: {}", accepted)?;
    }
    if let Some(rejected) = metadata.rejected_steps {
        writeln!(writer, "# Rejected Steps: {}", rejected)?;
    }

    for (key, value) in &metadata.custom {
        writeln!(writer, "# {}: {}", key, value)?;
    }

    writeln!(writer, "#")
}

/// Format number with configured precision and decimal separator
fn format_number(value: f64, config: &CsvConfig) -> String {
    let formatted = format!("{:.prec$e}", value, prec = config.precision);

    if config.decimal_separator != '.' {
        formatted.replace('.', &config.decimal_separator.to_string())
    } else {
        formatted
    }
}

// =============================================================================
// Export Functions
// =============================================================================

/// Write one series as CSV to any writer
///
/// # Errors
///
/// - [`ExportError::Empty`] for a series without samples
/// - [`ExportError::NonFinite`] if a sample is NaN or infinite
/// - [`ExportError::Io`] on write failure
pub fn write_series_csv<W: Write>(
    writer: &mut W,
    series: &PlotSeries,
    configuration: Option<&CsvConfig>,
) -> Result<(), ExportError> {
    // ============================= Validation =============================

    if series.is_empty() {
        return Err(ExportError::Empty(series.name.clone()));
    }
    if series.points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(ExportError::NonFinite(series.name.clone()));
    }

    let binding = CsvConfig::default();
    let configuration = configuration.unwrap_or(&binding);

    // ============================= Write Metadata =========================

    if configuration.include_metadata
        && let Some(metadata) = &configuration.metadata
    {
        write_metadata_header(writer, &series.name, metadata)?;
    }

    // ============================= Write Header ===========================

    writeln!(writer, "{}{}{}", series.x_label, configuration.delimiter, series.y_label)?;

    // ============================= Write Data =============================

    for (x, y) in &series.points {
        writeln!(
            writer,
            "{}{}{}",
            format_number(*x, configuration),
            configuration.delimiter,
            format_number(*y, configuration)
        )?;
    }

    Ok(())
}

/// Export one series to a CSV file
pub fn export_series_csv<P: AsRef<Path>>(
    series: &PlotSeries,
    output_path: P,
    configuration: Option<&CsvConfig>,
) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    write_series_csv(&mut writer, series, configuration)?;
    writer.flush()?;
    Ok(())
}

/// [`Exporter`] writing CSV files
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    pub config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }
}

impl Exporter for CsvExporter {
    type Error = ExportError;

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn export(&self, series: &PlotSeries, path: &Path) -> Result<(), Self::Error> {
        export_series_csv(series, path, Some(&self.config))
    }
}

// =================================================================================================
// Tests
// =================================================================================================
