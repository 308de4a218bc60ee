//! `smerge reconcile`: match merged summits against a reference list.

use std::path::PathBuf;

use clap::Subcommand;
use sotamerge_recon::{NoFeedback, ReconcileConfig};

use crate::{config_dir, emit_json, output_path, read_config, CliError};

#[derive(Subcommand)]
pub enum ReconcileCommands {
    /// Reconcile merged summits using a TOML config
    #[command(after_help = "\
Examples:
  smerge reconcile run topo25.reconcile.toml
  smerge reconcile run sota.reconcile.toml --csv final.csv --remainder unmatched.csv
  smerge reconcile run topo25.reconcile.toml --json")]
    Run {
        /// Path to the reconcile config
        config: PathBuf,

        /// Write reconciled summits to this CSV (overrides [output] csv)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write unmatched reference entries to this CSV (overrides [output] remainder)
        #[arg(long)]
        remainder: Option<PathBuf>,

        /// Write the JSON result to this file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the JSON result to stdout
        #[arg(long)]
        json: bool,
    },

    /// Check a reconcile config without reading any layer
    #[command(after_help = "\
Examples:
  smerge reconcile validate topo25.reconcile.toml")]
    Validate {
        /// Path to the reconcile config
        config: PathBuf,
    },
}

pub fn cmd_reconcile(cmd: ReconcileCommands) -> Result<(), CliError> {
    match cmd {
        ReconcileCommands::Run { config, csv, remainder, output, json } => {
            cmd_reconcile_run(config, csv, remainder, output, json)
        }
        ReconcileCommands::Validate { config } => cmd_reconcile_validate(config),
    }
}

fn cmd_reconcile_run(
    config_path: PathBuf,
    csv_file: Option<PathBuf>,
    remainder_file: Option<PathBuf>,
    json_file: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config_str = read_config(&config_path)?;
    let config = ReconcileConfig::from_toml(&config_str).map_err(CliError::recon)?;
    let base_dir = config_dir(&config_path);

    let csv_path = output_path(csv_file, config.output.csv.as_deref(), base_dir);
    let remainder_path = output_path(remainder_file, config.output.remainder.as_deref(), base_dir);
    let json_path = output_path(json_file, config.output.json.as_deref(), base_dir);
    if csv_path.is_none() && json_path.is_none() && !json_output {
        return Err(CliError::args("no output selected")
            .with_hint("set [output] csv/json in the config, or pass --csv, --output or --json"));
    }

    let input_path = base_dir.join(&config.input);
    let detections = sotamerge_io::read_entities(&input_path).map_err(|e| CliError::input(&input_path, e))?;
    let reference_path = base_dir.join(&config.reference);
    let references =
        sotamerge_io::read_references(&reference_path).map_err(|e| CliError::input(&reference_path, e))?;

    let result = sotamerge_recon::run_reconcile(&config, detections, &references, &NoFeedback)
        .map_err(CliError::recon)?;

    if let Some(path) = &csv_path {
        sotamerge_io::write_entities(path, &result.entities).map_err(|e| CliError::output(path, e))?;
        eprintln!("wrote {}", path.display());
    }
    if let Some(path) = &remainder_path {
        sotamerge_io::write_remainder(path, &result.remainder).map_err(|e| CliError::output(path, e))?;
        eprintln!("wrote {}", path.display());
    }
    emit_json(&result, json_path.as_deref(), json_output)?;

    let s = &result.summary;
    eprintln!(
        "{} reconcile '{}': {} of {} summits matched {} reference entries, {} remain ({} with candidates)",
        result.mode,
        result.meta.config_name,
        s.matched,
        s.detections,
        s.references,
        s.remainder,
        s.candidates,
    );
    Ok(())
}

fn cmd_reconcile_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = read_config(&config_path)?;
    let config = ReconcileConfig::from_toml(&config_str).map_err(CliError::recon)?;
    eprintln!(
        "valid: {} reconcile '{}' of {} against {}",
        config.mode, config.name, config.input, config.reference,
    );
    Ok(())
}
