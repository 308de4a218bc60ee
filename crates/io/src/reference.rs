//! Reference list (surveyed summits) and the remainder written after
//! reconciliation.

use std::path::Path;

use sotamerge_recon::{ReferenceAction, ReferenceEntry, RemainderEntry};

use crate::csv::{field, owned_field, writer, Table};
use crate::error::IoError;
use crate::layer::GEOMETRY;
use crate::wkt;

pub fn read_references(path: &Path) -> Result<Vec<ReferenceEntry>, IoError> {
    reference_rows(&Table::read(path)?)
}

pub fn reference_rows(table: &Table) -> Result<Vec<ReferenceEntry>, IoError> {
    let reference = table.require("ref")?;
    let name = table.column("name");
    let action = table.column("action");
    let check_ele = table.column("check ele");
    let check_col = table.column("check col");
    let match_key = table.column("Match");
    let geometry = table.column(GEOMETRY);

    let mut out = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = match field(row, geometry).map(wkt::parse) {
            Some(Ok(mut parts)) => Some(parts.swap_remove(0)),
            Some(Err(e)) => {
                log::warn!("{} line {}: {e}; entry kept without position", table.file, i + 2);
                None
            }
            None => None,
        };
        out.push(ReferenceEntry {
            reference: owned_field(row, Some(reference)),
            name: owned_field(row, name),
            action: ReferenceAction::new(field(row, action).unwrap_or_default()),
            check_ele: owned_field(row, check_ele),
            check_col: owned_field(row, check_col),
            match_key: owned_field(row, match_key),
            line,
        });
    }
    Ok(out)
}

/// Unconsumed reference entries. `Match` holds the candidate detection ids,
/// or the entry's own key when it has no candidates.
pub fn write_remainder(path: &Path, remainder: &[RemainderEntry]) -> Result<(), IoError> {
    let mut w = writer(path)?;
    w.write_record(["ref", "name", "action", "check ele", "check col", "Match", GEOMETRY])?;
    for r in remainder {
        let e = &r.entry;
        w.write_record([
            e.reference.clone().unwrap_or_default(),
            e.name.clone().unwrap_or_default(),
            e.action.as_str().to_string(),
            e.check_ele.clone().unwrap_or_default(),
            e.check_col.clone().unwrap_or_default(),
            r.match_text().or_else(|| e.match_key.clone()).unwrap_or_default(),
            e.line.as_ref().map(wkt::format_linestring).unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
