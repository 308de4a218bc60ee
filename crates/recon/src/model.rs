use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use sotamerge_core::{ElevationPair, LayerRecord, LineString, MultiLineString, Point, SourceTag};

use crate::reference::RemainderEntry;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One named detection layer as handed over by the IO layer.
#[derive(Debug, Clone)]
pub struct SourceLayer {
    pub name: String,
    pub crs: Option<String>,
    pub records: Vec<LayerRecord>,
}

// ---------------------------------------------------------------------------
// Prominence
// ---------------------------------------------------------------------------

/// Exact group prominence: `total / count`, with `total` the sum of member
/// elevations minus the sum of member col elevations.
///
/// Ordering and equality compare the rational value, so 300/1 == 600/2.
#[derive(Debug, Clone, Copy)]
pub struct Prominence {
    total: i64,
    count: u32,
}

impl Prominence {
    /// `None` for an empty group.
    pub fn new(total: i64, count: u32) -> Option<Self> {
        (count > 0).then_some(Self { total, count })
    }

    pub fn from_integer(value: i64) -> Self {
        Self { total: value, count: 1 }
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn value(&self) -> f64 {
        self.total as f64 / self.count as f64
    }

    /// Integer value for integer-typed outputs, half away from zero.
    pub fn rounded(&self) -> i64 {
        self.value().round() as i64
    }
}

impl PartialEq for Prominence {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Prominence {}

impl PartialOrd for Prominence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Prominence {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.total as i128 * other.count as i128;
        let rhs = other.total as i128 * self.count as i128;
        lhs.cmp(&rhs)
    }
}

impl Serialize for Prominence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

// ---------------------------------------------------------------------------
// Canonical entity
// ---------------------------------------------------------------------------

/// One merged summit: the output row of a merge run and the detection
/// consumed by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntity {
    /// 0-based rank in the emitted output.
    pub fid: usize,
    /// Final public identifier, e.g. `S0001`.
    pub id: String,
    pub name: Option<String>,
    pub elevation: Option<i32>,
    pub col_elevation: Option<i32>,
    pub reference: Option<String>,
    pub prominence: Option<Prominence>,
    /// Final ids of entities linked at the summit only.
    pub merge: Vec<String>,
    /// Final ids of entities linked at the col only.
    pub cross: Vec<String>,
    pub notes: Vec<String>,
    /// Per-source elevations, only for sources present in the group.
    pub sources: BTreeMap<SourceTag, ElevationPair>,
    /// Mean summit position.
    pub anchor: Point,
    /// Mean col position.
    pub secondary: Point,
    /// Original ridge lines of every member, kept for visual audit.
    pub members: Vec<LineString>,
}

impl CanonicalEntity {
    /// Mean summit→col line followed by every member line.
    pub fn geometry(&self) -> MultiLineString {
        let mut parts = Vec::with_capacity(self.members.len() + 1);
        parts.push(LineString::segment(self.anchor, self.secondary));
        parts.extend(self.members.iter().cloned());
        MultiLineString::new(parts)
    }

    pub fn notes_text(&self) -> Option<String> {
        if self.notes.is_empty() {
            None
        } else {
            Some(self.notes.join("; "))
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    pub cancelled: bool,
}

impl RunMeta {
    pub fn new(config_name: &str, crs: Option<String>, cancelled: bool) -> Self {
        Self {
            config_name: config_name.to_string(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            crs,
            cancelled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub input_records: usize,
    pub skipped_records: usize,
    pub entities: usize,
    pub merged_groups: usize,
    pub merge_links: usize,
    pub cross_links: usize,
    pub records_per_source: BTreeMap<SourceTag, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub meta: RunMeta,
    pub summary: MergeSummary,
    pub entities: Vec<CanonicalEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub detections: usize,
    pub matched: usize,
    pub references: usize,
    pub candidates: usize,
    pub remainder: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResult {
    pub meta: RunMeta,
    pub mode: crate::config::ReconcileMode,
    pub summary: ReconcileSummary,
    pub entities: Vec<CanonicalEntity>,
    pub remainder: Vec<RemainderEntry>,
}
