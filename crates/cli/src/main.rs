// smerge - merge summit detections from several DEMs and reconcile them
// against a reference list.

mod exit_codes;
mod import;
mod merge;
mod prominence;
mod reconcile;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sotamerge_io::IoError;
use sotamerge_recon::ReconError;
use tracing_subscriber::EnvFilter;

use exit_codes::{input_exit_code, recon_exit_code, EXIT_ERROR, EXIT_OUTPUT_WRITE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "smerge")]
#[command(about = "Merge DEM summit detections and reconcile them with a reference list")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a Landserf summit list into a detection layer by sampling a DEM
    #[command(after_help = "\
Examples:
  smerge import fagaras_srtm.lst --dem srtm.asc -o fagaras_srtm.csv
  smerge import peaks.lst --dem alos.asc -o peaks_alos.csv --bbox 400000,430000,460000,470000
  smerge import peaks.lst --dem alos.asc -o peaks_alos.csv --json")]
    Import(import::ImportArgs),

    /// Merge detection layers into ranked canonical summits
    #[command(subcommand)]
    Merge(merge::MergeCommands),

    /// Reconcile merged summits with a reference list
    #[command(subcommand)]
    Reconcile(reconcile::ReconcileCommands),

    /// Recompute prominence of merged summits on each DEM
    #[command(after_help = "\
Examples:
  smerge prominence merged.csv --dem SRTM=srtm.asc --dem ALOS=alos.asc -o prominence.csv")]
    Prominence(prominence::ProminenceArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Also installs the `log` bridge, so engine and IO crates report through here.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Import(args) => import::cmd_import(args),
        Commands::Merge(cmd) => merge::cmd_merge(cmd),
        Commands::Reconcile(cmd) => reconcile::cmd_reconcile(cmd),
        Commands::Prominence(args) => prominence::cmd_prominence(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Engine error with the exit code from the registry.
    pub fn recon(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::UnknownSource { .. } | ReconError::AmbiguousSource { .. } => {
                Some("layer names must contain exactly one of SRTM, ASTER, ALOS, TDX, GLO30".to_string())
            }
            ReconError::DuplicateSource { .. } => {
                Some("each DEM may be merged only once; drop or rename one of the layers".to_string())
            }
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }

    /// Failure reading `path`.
    pub fn input(path: &Path, err: IoError) -> Self {
        Self {
            code: input_exit_code(&err),
            message: format!("{}: {err}", path.display()),
            hint: None,
        }
    }

    /// Failure writing `path`.
    pub fn output(path: &Path, err: IoError) -> Self {
        Self {
            code: EXIT_OUTPUT_WRITE,
            message: format!("cannot write {}: {err}", path.display()),
            hint: None,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Read a config file, mapping failures to the input exit codes.
pub fn read_config(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::input(path, IoError::Io(e)))
}

/// Directory config-relative paths resolve against.
pub fn config_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Output destination: the command-line flag wins, else the config entry
/// resolved against the config directory.
pub fn output_path(flag: Option<PathBuf>, configured: Option<&str>, base: &Path) -> Option<PathBuf> {
    flag.or_else(|| configured.map(|p| base.join(p)))
}

/// Pretty JSON to an optional file and, with `--json`, to stdout.
pub fn emit_json<T: serde::Serialize>(value: &T, file: Option<&Path>, stdout: bool) -> Result<(), CliError> {
    if let Some(path) = file {
        sotamerge_io::json::export(value, path).map_err(|e| CliError::output(path, e))?;
        eprintln!("wrote {}", path.display());
    }
    if stdout {
        let text = serde_json::to_string_pretty(value).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{text}");
    }
    Ok(())
}
