//! Alignment of merged detections against an authoritative reference list.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sotamerge_core::LineString;

use crate::feedback::{Feedback, Progress};
use crate::matcher::LinkKind;
use crate::model::{CanonicalEntity, Prominence};
use crate::spatial::SpatialIndex;

// ---------------------------------------------------------------------------
// Reference entries
// ---------------------------------------------------------------------------

/// Free-text action marker recorded by the surveyor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceAction(pub String);

impl ReferenceAction {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Confirmation: propagates the reference without a note.
    pub fn is_ok(&self) -> bool {
        self.0.trim() == "ok"
    }

    /// Entry withdrawn from the reference; never indexed.
    pub fn is_delete(&self) -> bool {
        self.0.trim() == "delete"
    }

    /// Entry may back several detections and is never consumed.
    pub fn is_switch(&self) -> bool {
        self.0.contains("switch")
    }

    pub fn is_move(&self) -> bool {
        self.0.contains("move")
    }

    /// Corrections and candidates do not hand out their reference id.
    pub fn suppresses_reference(&self) -> bool {
        self.is_switch() || self.is_move()
    }
}

/// One row of the reference layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub reference: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub action: ReferenceAction,
    pub check_ele: Option<String>,
    pub check_col: Option<String>,
    /// Detection id assigned by hand, used by key mode.
    pub match_key: Option<String>,
    pub line: Option<LineString>,
}

/// A reference entry no detection consumed, with the ids of detections that
/// were near it at the summit only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemainderEntry {
    pub entry: ReferenceEntry,
    pub candidates: Vec<String>,
}

impl RemainderEntry {
    pub fn match_text(&self) -> Option<String> {
        if self.candidates.is_empty() {
            None
        } else {
            Some(self.candidates.join(" "))
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// When an override moves the detection endpoint onto the reference endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snap {
    /// Only when a numeric value was applied.
    OnApplied,
    /// Whenever an override text is present.
    OnPresent,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub entities: Vec<CanonicalEntity>,
    pub remainder: Vec<RemainderEntry>,
    /// Detections that took attributes from a reference entry.
    pub matched: usize,
    /// Reference entries that picked up at least one candidate.
    pub candidates: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceReconciler {
    pub anchor_tolerance: f64,
    pub secondary_tolerance: f64,
    /// Key mode: referenced first by reference, then descending prominence.
    pub sort_output: bool,
}

impl Default for ReferenceReconciler {
    fn default() -> Self {
        Self {
            anchor_tolerance: 0.005,
            secondary_tolerance: 0.01,
            sort_output: true,
        }
    }
}

impl ReferenceReconciler {
    /// Match each detection to the reference entry nearest at both endpoints.
    pub fn spatial(
        &self,
        mut detections: Vec<CanonicalEntity>,
        references: &[ReferenceEntry],
        feedback: &dyn Feedback,
    ) -> Reconciled {
        let indexed: Vec<usize> = references
            .iter()
            .enumerate()
            .filter(|(_, r)| r.line.is_some() && !r.action.is_delete())
            .map(|(i, _)| i)
            .collect();
        let anchors = SpatialIndex::from_points(
            indexed
                .iter()
                .filter_map(|&i| references[i].line.as_ref().map(|l| (i, l.first()))),
        );
        let secondaries = SpatialIndex::from_points(
            indexed
                .iter()
                .filter_map(|&i| references[i].line.as_ref().map(|l| (i, l.last()))),
        );
        log::info!("indexed {} of {} reference entries", indexed.len(), references.len());

        let mut consumed = BTreeSet::new();
        let mut candidates: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        let mut matched = 0;
        let mut processed = detections.len();
        let mut progress = Progress::new(feedback, detections.len());

        for (n, det) in detections.iter_mut().enumerate() {
            if feedback.is_cancelled() {
                processed = n;
                break;
            }
            progress.step(n);

            let near = anchors.nearest_ties(det.anchor, self.anchor_tolerance);
            if near.is_empty() {
                continue;
            }
            let cols = secondaries.nearest_ties(det.secondary, self.secondary_tolerance);
            match (near.as_slice(), cols.as_slice()) {
                (&[i], &[c]) if i == c => {
                    let entry = &references[i];
                    apply(det, entry, Snap::OnApplied);
                    if !entry.action.is_switch() {
                        consumed.insert(i);
                    }
                    matched += 1;
                }
                _ => {
                    if near.len() > 1 || cols.len() > 1 {
                        log::debug!("{} has no unique nearest reference entry", det.id);
                    }
                    for &i in &near {
                        record_near_miss(&mut candidates, i, &det.id, LinkKind::AnchorOnly);
                    }
                }
            }
        }

        let cancelled = processed < detections.len();
        if cancelled {
            log::warn!("reconciliation cancelled after {processed} of {} detections", detections.len());
            detections.truncate(processed);
        }
        refresh_prominence(&mut detections);

        let remainder: Vec<RemainderEntry> = indexed
            .iter()
            .filter(|i| !consumed.contains(*i))
            .map(|&i| RemainderEntry {
                entry: references[i].clone(),
                candidates: candidates.remove(&i).unwrap_or_default(),
            })
            .collect();
        let with_candidates = remainder.iter().filter(|r| !r.candidates.is_empty()).count();

        Reconciled {
            entities: detections,
            remainder,
            matched,
            candidates: with_candidates,
            cancelled,
        }
    }

    /// Match detections by the `Match` key recorded on reference entries.
    pub fn by_key(
        &self,
        mut detections: Vec<CanonicalEntity>,
        references: &[ReferenceEntry],
        feedback: &dyn Feedback,
    ) -> Reconciled {
        let mut keyed: HashMap<&str, usize> = HashMap::new();
        for (i, entry) in references.iter().enumerate() {
            let Some(key) = entry.match_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
                continue;
            };
            if let Some(prev) = keyed.insert(key, i) {
                log::warn!("match key '{key}' appears on reference rows {prev} and {i}; using row {i}");
            }
        }

        let mut consumed = BTreeSet::new();
        let mut matched = 0;
        let mut processed = detections.len();
        let mut progress = Progress::new(feedback, detections.len());

        for (n, det) in detections.iter_mut().enumerate() {
            if feedback.is_cancelled() {
                processed = n;
                break;
            }
            progress.step(n);

            if let Some(&i) = keyed.get(det.id.as_str()) {
                apply(det, &references[i], Snap::OnPresent);
                consumed.insert(i);
                matched += 1;
            }
        }

        let cancelled = processed < detections.len();
        if cancelled {
            log::warn!("reconciliation cancelled after {processed} of {} detections", detections.len());
            detections.truncate(processed);
        }
        refresh_prominence(&mut detections);

        if self.sort_output {
            sort_referenced_first(&mut detections);
        }

        let remainder = references
            .iter()
            .enumerate()
            .filter(|(i, r)| !r.action.is_delete() && !consumed.contains(i))
            .map(|(_, r)| RemainderEntry {
                entry: r.clone(),
                candidates: Vec::new(),
            })
            .collect();

        Reconciled {
            entities: detections,
            remainder,
            matched,
            candidates: 0,
            cancelled,
        }
    }
}

fn record_near_miss(candidates: &mut BTreeMap<usize, Vec<String>>, entry: usize, id: &str, kind: LinkKind) {
    log::debug!("{id} is near reference row {entry} ({kind:?}) but not at both ends");
    let ids = candidates.entry(entry).or_default();
    if !ids.iter().any(|c| c == id) {
        ids.push(id.to_string());
    }
}

/// Digits-only override text as an elevation.
pub fn parse_override(text: &str) -> Option<i32> {
    let t = text.trim();
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    t.parse().ok()
}

/// Fill absent attributes of `det` from `entry`. Present values are never
/// replaced; notes are appended.
fn apply(det: &mut CanonicalEntity, entry: &ReferenceEntry, snap: Snap) {
    let mut notes = Vec::new();

    if !entry.action.suppresses_reference() {
        if det.reference.is_none() {
            det.reference = entry.reference.clone();
        }
        if !entry.action.is_ok() && !entry.action.is_empty() {
            notes.push(entry.action.as_str().trim().to_string());
        }
    }

    if det.name.is_none() {
        det.name = entry.name.clone().filter(|n| !n.trim().is_empty());
    }

    let text = |t: &Option<String>| t.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);

    if det.elevation.is_none() {
        if let Some(raw) = text(&entry.check_ele) {
            let value = parse_override(&raw);
            match value {
                Some(v) => det.elevation = Some(v),
                None => notes.push(format!("ele:{raw}")),
            }
            if value.is_some() || snap == Snap::OnPresent {
                if let Some(line) = &entry.line {
                    det.anchor = line.first();
                }
            }
        }
    }

    if det.col_elevation.is_none() {
        if let Some(raw) = text(&entry.check_col) {
            let value = parse_override(&raw);
            match value {
                Some(v) => det.col_elevation = Some(v),
                None => notes.push(format!("col:{raw}")),
            }
            if value.is_some() || snap == Snap::OnPresent {
                if let Some(line) = &entry.line {
                    det.secondary = line.last();
                }
            }
        }
    }

    det.notes.extend(notes);
}

fn refresh_prominence(detections: &mut [CanonicalEntity]) {
    for det in detections {
        if let (Some(e), Some(c)) = (det.elevation, det.col_elevation) {
            det.prominence = Some(Prominence::from_integer(i64::from(e) - i64::from(c)));
        }
    }
}

fn sort_referenced_first(detections: &mut [CanonicalEntity]) {
    detections.sort_by(|a, b| match (&a.reference, &b.reference) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match (a.prominence, b.prominence) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    });
    for (fid, det) in detections.iter_mut().enumerate() {
        det.fid = fid;
    }
}
