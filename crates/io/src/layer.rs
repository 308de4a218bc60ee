//! Detection layers: one summit→col ridge line per row.
//!
//! Columns: `ID`, `Name`, `Elevation`, `Col elevation`, `Notes`, `geometry` (WKT).
//! Only `geometry` is required; rows whose geometry cannot be read are kept
//! without a line so the engine can report and skip them.

use std::path::Path;

use sotamerge_core::LayerRecord;
use sotamerge_recon::SourceLayer;

use crate::csv::{field, owned_field, parse_int, writer, Table};
use crate::error::IoError;
use crate::wkt;

pub const GEOMETRY: &str = "geometry";

pub fn read_layer(path: &Path, name: &str, crs: Option<String>) -> Result<SourceLayer, IoError> {
    let table = Table::read(path)?;
    let records = layer_records(&table)?;
    log::debug!("read {} rows from {}", records.len(), path.display());
    Ok(SourceLayer {
        name: name.to_string(),
        crs,
        records,
    })
}

pub fn layer_records(table: &Table) -> Result<Vec<LayerRecord>, IoError> {
    let geometry = table.require(GEOMETRY)?;
    let id = table.column("ID");
    let name = table.column("Name");
    let elevation = table.column("Elevation");
    let col_elevation = table.column("Col elevation");
    let notes = table.column("Notes");

    let mut out = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = match field(row, Some(geometry)).map(wkt::parse) {
            Some(Ok(mut parts)) => Some(parts.swap_remove(0)),
            Some(Err(e)) => {
                log::warn!("{} line {}: {e}", table.file, i + 2);
                None
            }
            None => None,
        };
        out.push(LayerRecord {
            id: owned_field(row, id),
            name: owned_field(row, name),
            line,
            elevation: field(row, elevation).and_then(parse_int),
            col_elevation: field(row, col_elevation).and_then(parse_int),
            notes: owned_field(row, notes),
        });
    }
    Ok(out)
}

pub fn write_layer(path: &Path, records: &[LayerRecord]) -> Result<(), IoError> {
    let mut w = writer(path)?;
    w.write_record(["ID", "Name", "Elevation", "Col elevation", "Notes", GEOMETRY])?;
    for r in records {
        w.write_record([
            r.id.clone().unwrap_or_default(),
            r.name.clone().unwrap_or_default(),
            r.elevation.map(|v| v.to_string()).unwrap_or_default(),
            r.col_elevation.map(|v| v.to_string()).unwrap_or_default(),
            r.notes.clone().unwrap_or_default(),
            r.line.as_ref().map(wkt::format_linestring).unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
