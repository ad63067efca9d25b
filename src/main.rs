//! kinpath command line
//!
//! ```text
//! kinpath run data/demo3.kin --output-dir results -v
//! kinpath check data/demo3.kin
//! ```

use clap::{Parser, Subcommand};
use kinpath::chemistry::BuiltinProvider;
use kinpath::error::KinpathError;
use kinpath::interpreter::{check, interpret_with};
use kinpath::output::{CsvConfig, CsvExporter, CsvMetadata, Exporter};
use kinpath::solver::{CancelFlag, RunOptions, RunStatus, SolverMethod};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kinpath", version, about = "Run kinetic path documents")]
struct Cli {
    /// More output (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the kinetic path of a document and write one CSV file per plot
    Run {
        /// Document to run
        file: PathBuf,

        /// TOML file with solver and equilibrium options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Integration method (euler, rk4); overrides the config file
        #[arg(long)]
        method: Option<SolverMethod>,

        /// Directory for the CSV files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Parse and validate a document without running it
    Check {
        /// Document to check
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_options(path: Option<&Path>) -> Result<RunOptions, KinpathError> {
    let Some(path) = path else {
        return Ok(RunOptions::default());
    };
    let text = std::fs::read_to_string(path)?;
    let options: RunOptions = toml::from_str(&text).map_err(|e| KinpathError::Config(e.to_string()))?;
    options.validate().map_err(KinpathError::Config)?;
    Ok(options)
}

fn run(file: &Path, config: Option<&Path>, method: Option<SolverMethod>, output_dir: &Path) -> Result<bool, KinpathError> {
    let mut options = load_options(config)?;
    if let Some(method) = method {
        options.method = method;
    }

    let text = std::fs::read_to_string(file)?;
    let outcome = interpret_with(&text, &BuiltinProvider, &options, &CancelFlag::new())?;

    let status = match &outcome.status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Failed(error) => error.to_string(),
    };
    let mut metadata = CsvMetadata::from_run(
        &options.method.to_string(),
        &status,
        outcome.stop_time,
        outcome.accepted_steps,
        outcome.rejected_steps,
    );
    metadata.add_custom("Document", &file.display().to_string());

    std::fs::create_dir_all(output_dir)?;
    let exporter = CsvExporter::new(CsvConfig::default().with_metadata(metadata));
    let written = exporter.export_all(&outcome.plots, output_dir)?;
    for path in &written {
        info!(path = %path.display(), "series written");
    }

    if let RunStatus::Failed(error) = &outcome.status {
        error!(stop_time = outcome.stop_time, %error, "kinetic path did not reach its end time");
    }
    Ok(outcome.is_success())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Command::Run { file, config, method, output_dir } => run(file, config.as_deref(), *method, output_dir),
        Command::Check { file } => std::fs::read_to_string(file)
            .map_err(KinpathError::from)
            .and_then(|text| check(&text, &BuiltinProvider))
            .map(|model| {
                info!(
                    species = model.system.num_species(),
                    reactions = model.reactions.len(),
                    states = model.states.len(),
                    plots = model.path.as_ref().map_or(0, |p| p.plots.len()),
                    "document is valid"
                );
                true
            }),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
