use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{LineString, Point};
use crate::source::SourceTag;

/// Summit elevation and col elevation as sampled from one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevationPair {
    pub elevation: i32,
    pub col_elevation: i32,
}

impl ElevationPair {
    pub fn prominence(&self) -> i32 {
        self.elevation - self.col_elevation
    }
}

/// One row of a detection layer as read from disk, before source attribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub line: Option<LineString>,
    pub elevation: Option<i32>,
    pub col_elevation: Option<i32>,
    pub notes: Option<String>,
}

/// Why a layer row cannot take part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDefect {
    MissingGeometry,
    MissingElevation,
    MissingColElevation,
}

impl fmt::Display for RecordDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGeometry => write!(f, "missing geometry"),
            Self::MissingElevation => write!(f, "missing elevation"),
            Self::MissingColElevation => write!(f, "missing col elevation"),
        }
    }
}

/// A detection attributed to one source. Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPairRecord {
    pub source: SourceTag,
    /// Ridge line from summit (first vertex) to col (last vertex).
    pub line: LineString,
    pub elevations: ElevationPair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PointPairRecord {
    pub fn new(source: SourceTag, line: LineString, elevation: i32, col_elevation: i32) -> Self {
        Self {
            source,
            line,
            elevations: ElevationPair { elevation, col_elevation },
            notes: None,
        }
    }

    pub fn from_layer(source: SourceTag, row: LayerRecord) -> Result<Self, RecordDefect> {
        let line = row.line.ok_or(RecordDefect::MissingGeometry)?;
        let elevation = row.elevation.ok_or(RecordDefect::MissingElevation)?;
        let col_elevation = row.col_elevation.ok_or(RecordDefect::MissingColElevation)?;
        Ok(Self {
            source,
            line,
            elevations: ElevationPair { elevation, col_elevation },
            notes: row.notes,
        })
    }

    pub fn anchor(&self) -> Point {
        self.line.first()
    }

    pub fn secondary(&self) -> Point {
        self.line.last()
    }
}
