//! `smerge prominence`: per-DEM prominence of merged summits.

use std::path::PathBuf;

use clap::Args;
use sotamerge_core::SourceTag;
use sotamerge_io::{AsciiGrid, ElevationSampler};

use crate::CliError;

#[derive(Args)]
pub struct ProminenceArgs {
    /// Merged summit CSV
    input: PathBuf,

    /// DEM to sample, as TAG=PATH (repeatable)
    #[arg(long = "dem", value_name = "TAG=PATH", required = true)]
    dems: Vec<String>,

    /// Prominence table CSV to write
    #[arg(long, short = 'o')]
    output: PathBuf,
}

fn parse_dem_arg(arg: &str) -> Result<(SourceTag, PathBuf), CliError> {
    let (tag, path) = arg
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("--dem '{arg}' is not TAG=PATH")))?;
    let tag: SourceTag = tag.parse().map_err(CliError::args)?;
    Ok((tag, PathBuf::from(path)))
}

pub fn cmd_prominence(args: ProminenceArgs) -> Result<(), CliError> {
    let mut specs = Vec::with_capacity(args.dems.len());
    for arg in &args.dems {
        let (tag, path) = parse_dem_arg(arg)?;
        if specs.iter().any(|(t, _)| *t == tag) {
            return Err(CliError::args(format!("--dem {tag} given twice")));
        }
        specs.push((tag, path));
    }

    let entities = sotamerge_io::read_entities(&args.input).map_err(|e| CliError::input(&args.input, e))?;

    let mut grids = Vec::with_capacity(specs.len());
    for (tag, path) in &specs {
        let grid = AsciiGrid::read(path).map_err(|e| CliError::input(path, e))?;
        grids.push((*tag, grid));
    }
    let samplers: Vec<(SourceTag, &dyn ElevationSampler)> =
        grids.iter().map(|(tag, g)| (*tag, g as &dyn ElevationSampler)).collect();
    let tags: Vec<SourceTag> = specs.iter().map(|(t, _)| *t).collect();

    let rows = sotamerge_io::check_prominence(&entities, &samplers);
    sotamerge_io::write_prominence(&args.output, &tags, &rows).map_err(|e| CliError::output(&args.output, e))?;
    eprintln!("wrote {}", args.output.display());
    eprintln!(
        "prominence: {} of {} summits checked on {} DEM(s)",
        rows.len(),
        entities.len(),
        tags.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dem_arg_forms() {
        let (tag, path) = parse_dem_arg("alos=dem/alos.asc").unwrap();
        assert_eq!(tag, SourceTag::Alos);
        assert_eq!(path, PathBuf::from("dem/alos.asc"));
        assert!(parse_dem_arg("alos.asc").is_err());
        assert!(parse_dem_arg("lidar=x.asc").is_err());
    }
}
