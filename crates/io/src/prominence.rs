//! Per-DEM prominence check for merged summits.

use std::path::Path;

use sotamerge_core::SourceTag;
use sotamerge_recon::CanonicalEntity;

use crate::csv::writer;
use crate::error::IoError;
use crate::grid::ElevationSampler;

#[derive(Debug, Clone, PartialEq)]
pub struct ProminenceRow {
    pub id: String,
    pub prominence: i64,
    /// One value per DEM, in the order the DEMs were supplied.
    pub per_dem: Vec<Option<i32>>,
}

/// Recompute prominence on each DEM for entities that carry both elevations.
pub fn check_prominence(
    entities: &[CanonicalEntity],
    dems: &[(SourceTag, &dyn ElevationSampler)],
) -> Vec<ProminenceRow> {
    entities
        .iter()
        .filter_map(|e| {
            let prominence = i64::from(e.elevation?) - i64::from(e.col_elevation?);
            let per_dem = dems
                .iter()
                .map(|(_, dem)| {
                    let top = dem.sample(e.anchor)?;
                    let col = dem.sample(e.secondary)?;
                    Some((top - col).round() as i32)
                })
                .collect();
            Some(ProminenceRow {
                id: e.id.clone(),
                prominence,
                per_dem,
            })
        })
        .collect()
}

pub fn write_prominence(path: &Path, tags: &[SourceTag], rows: &[ProminenceRow]) -> Result<(), IoError> {
    let mut w = writer(path)?;
    let mut header = vec!["ID".to_string(), "Prominence".to_string()];
    header.extend(tags.iter().map(|t| format!("{t} Prominence")));
    w.write_record(&header)?;
    for row in rows {
        let mut record = vec![row.id.clone(), row.prominence.to_string()];
        record.extend(row.per_dem.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        w.write_record(&record)?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::csv::{field, Table};
    use crate::grid::AsciiGrid;
    use sotamerge_core::Point;
    use tempfile::tempdir;

    fn entity(id: &str, ele: Option<i32>, col: Option<i32>, col_x: f64) -> CanonicalEntity {
        CanonicalEntity {
            fid: 0,
            id: id.into(),
            name: None,
            elevation: ele,
            col_elevation: col,
            reference: None,
            prominence: None,
            merge: vec![],
            cross: vec![],
            notes: vec![],
            sources: BTreeMap::new(),
            anchor: Point::new(5.0, 5.0),
            secondary: Point::new(col_x, 5.0),
            members: vec![],
        }
    }

    #[test]
    fn per_dem_prominence() {
        let srtm = AsciiGrid::parse("ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 10\n1510 1200\n").unwrap();
        let alos = AsciiGrid::parse("ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 10\n1500\n").unwrap();
        let dems = [
            (SourceTag::Srtm, &srtm as &dyn ElevationSampler),
            (SourceTag::Alos, &alos as &dyn ElevationSampler),
        ];

        let rows = check_prominence(
            &[
                entity("S0001", Some(1505), Some(1198), 15.0),
                entity("S0002", Some(1000), None, 15.0),
            ],
            &dems,
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].prominence, 307);
        assert_eq!(rows[0].per_dem, vec![Some(310), None]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("prom.csv");
        write_prominence(&path, &[SourceTag::Srtm, SourceTag::Alos], &rows).unwrap();
        let table = Table::read(&path).unwrap();
        assert_eq!(table.headers, vec!["ID", "Prominence", "SRTM Prominence", "ALOS Prominence"]);
        assert_eq!(field(&table.rows[0], table.column("SRTM Prominence")), Some("310"));
        assert_eq!(field(&table.rows[0], table.column("ALOS Prominence")), None);
    }

    #[test]
    fn extreme_elevations_do_not_overflow() {
        let rows = check_prominence(&[entity("S0001", Some(i32::MAX), Some(i32::MIN), 5.0)], &[]);
        assert_eq!(rows[0].prominence, i64::from(u32::MAX));
        assert!(rows[0].per_dem.is_empty());
    }
}
