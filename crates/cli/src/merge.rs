//! `smerge merge`: config-driven multi-DEM summit merge.

use std::path::PathBuf;

use clap::Subcommand;
use sotamerge_recon::{MergeConfig, NoFeedback, SourceLayer};

use crate::{config_dir, emit_json, output_path, read_config, CliError};

#[derive(Subcommand)]
pub enum MergeCommands {
    /// Merge the detection layers listed in a TOML config
    #[command(after_help = "\
Examples:
  smerge merge run fagaras.merge.toml
  smerge merge run fagaras.merge.toml --csv merged.csv
  smerge merge run fagaras.merge.toml --json > merged.json")]
    Run {
        /// Path to the merge config
        config: PathBuf,

        /// Write merged summits to this CSV (overrides [output] csv)
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the JSON result to this file (overrides [output] json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the JSON result to stdout
        #[arg(long)]
        json: bool,
    },

    /// Check a merge config without reading any layer
    #[command(after_help = "\
Examples:
  smerge merge validate fagaras.merge.toml")]
    Validate {
        /// Path to the merge config
        config: PathBuf,
    },
}

pub fn cmd_merge(cmd: MergeCommands) -> Result<(), CliError> {
    match cmd {
        MergeCommands::Run { config, csv, output, json } => cmd_merge_run(config, csv, output, json),
        MergeCommands::Validate { config } => cmd_merge_validate(config),
    }
}

fn cmd_merge_run(
    config_path: PathBuf,
    csv_file: Option<PathBuf>,
    json_file: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config_str = read_config(&config_path)?;
    let config = MergeConfig::from_toml(&config_str).map_err(CliError::recon)?;
    let base_dir = config_dir(&config_path);

    let csv_path = output_path(csv_file, config.output.csv.as_deref(), base_dir);
    let json_path = output_path(json_file, config.output.json.as_deref(), base_dir);
    if csv_path.is_none() && json_path.is_none() && !json_output {
        return Err(CliError::args("no output selected")
            .with_hint("set [output] csv/json in the config, or pass --csv, --output or --json"));
    }

    let mut layers: Vec<SourceLayer> = Vec::with_capacity(config.layers.len());
    for layer in &config.layers {
        let path = base_dir.join(&layer.file);
        let loaded = sotamerge_io::read_layer(&path, &layer.name, layer.crs.clone())
            .map_err(|e| CliError::input(&path, e))?;
        layers.push(loaded);
    }

    let result = sotamerge_recon::run_merge(&config, layers, &NoFeedback).map_err(CliError::recon)?;

    if let Some(path) = &csv_path {
        sotamerge_io::write_entities(path, &result.entities).map_err(|e| CliError::output(path, e))?;
        eprintln!("wrote {}", path.display());
    }
    emit_json(&result, json_path.as_deref(), json_output)?;

    let s = &result.summary;
    eprintln!(
        "merge '{}': {} records ({} skipped) -> {} summits, {} merged groups, {} merge / {} cross links",
        result.meta.config_name,
        s.input_records,
        s.skipped_records,
        s.entities,
        s.merged_groups,
        s.merge_links,
        s.cross_links,
    );
    Ok(())
}

fn cmd_merge_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = read_config(&config_path)?;
    let config = MergeConfig::from_toml(&config_str).map_err(CliError::recon)?;
    let tags = config.layer_tags().map_err(CliError::recon)?;
    let described: Vec<String> = tags.iter().map(|(tag, layer)| format!("{tag}={}", layer.name)).collect();
    eprintln!(
        "valid: merge '{}' with {} layer(s) [{}], distance {}",
        config.name,
        config.layers.len(),
        described.join(", "),
        config.distance,
    );
    Ok(())
}
