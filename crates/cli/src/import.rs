//! `smerge import`: Landserf summit list + DEM -> detection layer CSV.

use std::path::PathBuf;

use clap::Args;
use sotamerge_core::{ClipArea, Point, Polygon};
use sotamerge_io::AsciiGrid;
use sotamerge_recon::NoFeedback;

use crate::{emit_json, CliError};

#[derive(Args)]
pub struct ImportArgs {
    /// Landserf vector summit list (.lst)
    lst: PathBuf,

    /// DEM the summits were extracted from (ESRI ASCII grid)
    #[arg(long)]
    dem: PathBuf,

    /// Detection layer CSV to write
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Keep only summits inside MINX,MINY,MAXX,MAXY
    #[arg(long, value_name = "MINX,MINY,MAXX,MAXY")]
    bbox: Option<String>,

    /// Print the import summary as JSON to stdout
    #[arg(long)]
    json: bool,
}

fn parse_bbox(text: &str) -> Result<ClipArea, CliError> {
    let values: Vec<f64> = text
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CliError::args(format!("--bbox: {e}")))?;
    let &[minx, miny, maxx, maxy] = values.as_slice() else {
        return Err(CliError::args(format!("--bbox needs 4 values, got {}", values.len())));
    };
    if !(minx < maxx && miny < maxy) {
        return Err(CliError::args("--bbox: min must be below max").with_hint("order is MINX,MINY,MAXX,MAXY"));
    }
    let ring = vec![
        Point::new(minx, miny),
        Point::new(maxx, miny),
        Point::new(maxx, maxy),
        Point::new(minx, maxy),
    ];
    let polygon = Polygon::new(ring).ok_or_else(|| CliError::args("--bbox: degenerate box"))?;
    Ok(ClipArea::new(vec![polygon]))
}

pub fn cmd_import(args: ImportArgs) -> Result<(), CliError> {
    let clip = args.bbox.as_deref().map(parse_bbox).transpose()?;

    let summits = sotamerge_io::read_lst(&args.lst).map_err(|e| CliError::input(&args.lst, e))?;
    let dem = AsciiGrid::read(&args.dem).map_err(|e| CliError::input(&args.dem, e))?;
    let (cols, rows) = dem.size();
    log::info!("DEM {} is {cols} x {rows} cells", args.dem.display());

    let result = sotamerge_io::import_summits(&summits, &dem, clip.as_ref(), &NoFeedback);
    sotamerge_io::write_layer(&args.output, &result.records).map_err(|e| CliError::output(&args.output, e))?;
    eprintln!("wrote {}", args.output.display());

    emit_json(&result.summary, None, args.json)?;

    let s = &result.summary;
    eprintln!(
        "import: {} of {} summits ({} outside bbox, {} unsampled, {} col at DEM minimum)",
        s.imported, s.summits, s.outside_clip, s.sample_failed, s.col_at_minimum,
    );
    Ok(())
}
