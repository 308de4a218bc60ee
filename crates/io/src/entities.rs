//! Merged summit layer: the tabular form of `CanonicalEntity`.

use std::collections::BTreeMap;
use std::path::Path;

use sotamerge_core::{ElevationPair, SourceTag};
use sotamerge_recon::{CanonicalEntity, Prominence};

use crate::csv::{field, owned_field, parse_int, writer, Table};
use crate::error::IoError;
use crate::layer::GEOMETRY;
use crate::wkt;

const FIXED: [&str; 10] = [
    "fid",
    "ID",
    "Name",
    "Elevation",
    "Col elevation",
    "Reference",
    "Prominence",
    "Merge",
    "Cross",
    "Notes",
];

fn elevation_column(tag: SourceTag) -> String {
    format!("{tag} Elevation")
}

fn col_elevation_column(tag: SourceTag) -> String {
    format!("{tag} Col elevation")
}

/// Sources contributing to at least one entity, in tag order.
pub fn present_sources(entities: &[CanonicalEntity]) -> Vec<SourceTag> {
    SourceTag::ALL
        .into_iter()
        .filter(|tag| entities.iter().any(|e| e.sources.contains_key(tag)))
        .collect()
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_entities(path: &Path, entities: &[CanonicalEntity]) -> Result<(), IoError> {
    let sources = present_sources(entities);
    let mut w = writer(path)?;

    let mut header: Vec<String> = FIXED.iter().map(|s| s.to_string()).collect();
    for &tag in &sources {
        header.push(elevation_column(tag));
        header.push(col_elevation_column(tag));
    }
    header.push(GEOMETRY.to_string());
    w.write_record(&header)?;

    for e in entities {
        let mut record = vec![
            e.fid.to_string(),
            e.id.clone(),
            e.name.clone().unwrap_or_default(),
            opt(e.elevation),
            opt(e.col_elevation),
            e.reference.clone().unwrap_or_default(),
            opt(e.prominence.map(|p| p.rounded())),
            e.merge.join(" "),
            e.cross.join(" "),
            e.notes_text().unwrap_or_default(),
        ];
        for tag in &sources {
            let pair = e.sources.get(tag);
            record.push(opt(pair.map(|p| p.elevation)));
            record.push(opt(pair.map(|p| p.col_elevation)));
        }
        record.push(wkt::format_multilinestring(&e.geometry()));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_entities(path: &Path) -> Result<Vec<CanonicalEntity>, IoError> {
    entity_rows(&Table::read(path)?)
}

/// Parse a merged layer. The first geometry part is the summit→col line.
pub fn entity_rows(table: &Table) -> Result<Vec<CanonicalEntity>, IoError> {
    let geometry = table.require(GEOMETRY)?;
    let id = table.require("ID")?;
    let fid = table.column("fid");
    let name = table.column("Name");
    let elevation = table.column("Elevation");
    let col_elevation = table.column("Col elevation");
    let reference = table.column("Reference");
    let prominence = table.column("Prominence");
    let merge = table.column("Merge");
    let cross = table.column("Cross");
    let notes = table.column("Notes");
    let source_columns: Vec<(SourceTag, usize, usize)> = SourceTag::ALL
        .into_iter()
        .filter_map(|tag| {
            let e = table.column(&elevation_column(tag))?;
            let c = table.column(&col_elevation_column(tag))?;
            Some((tag, e, c))
        })
        .collect();

    let words = |text: Option<&str>| -> Vec<String> {
        text.map(|t| t.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    };

    let mut out = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 2;
        let text = field(row, Some(geometry)).ok_or_else(|| IoError::Geometry {
            line,
            message: "missing geometry".into(),
        })?;
        let mut parts = wkt::parse(text).map_err(|message| IoError::Geometry { line, message })?;
        let main = parts.remove(0);

        let mut sources = BTreeMap::new();
        for &(tag, e, c) in &source_columns {
            let pair = field(row, Some(e))
                .and_then(parse_int)
                .zip(field(row, Some(c)).and_then(parse_int));
            if let Some((elevation, col_elevation)) = pair {
                sources.insert(tag, ElevationPair { elevation, col_elevation });
            }
        }

        out.push(CanonicalEntity {
            fid: field(row, fid).and_then(|t| t.parse().ok()).unwrap_or(i),
            id: owned_field(row, Some(id)).unwrap_or_default(),
            name: owned_field(row, name),
            elevation: field(row, elevation).and_then(parse_int),
            col_elevation: field(row, col_elevation).and_then(parse_int),
            reference: owned_field(row, reference),
            prominence: field(row, prominence)
                .and_then(parse_int)
                .map(|p| Prominence::from_integer(i64::from(p))),
            merge: words(field(row, merge)),
            cross: words(field(row, cross)),
            notes: field(row, notes)
                .map(|t| t.split("; ").map(str::to_string).collect())
                .unwrap_or_default(),
            sources,
            anchor: main.first(),
            secondary: main.last(),
            members: parts,
        });
    }
    Ok(out)
}
