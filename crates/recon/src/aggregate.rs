use std::collections::{BTreeMap, BTreeSet};

use sotamerge_core::{ElevationPair, LineString, Point, PointPairRecord, SourceTag};

use crate::group::Grouping;
use crate::matcher::{LinkKind, NeighborMatches};
use crate::model::Prominence;

/// A merged group before ranking. Its position in the aggregator output is
/// its provisional sequence number; link targets are provisional too.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalEntity {
    /// Raw record indices, ascending.
    pub members: Vec<usize>,
    pub anchor: Point,
    pub secondary: Point,
    pub lines: Vec<LineString>,
    pub sources: BTreeMap<SourceTag, ElevationPair>,
    pub prominence: Prominence,
    /// Provisional sequences of entities near at the summit only.
    pub anchor_links: BTreeSet<usize>,
    /// Provisional sequences of entities near at the col only.
    pub secondary_links: BTreeSet<usize>,
    pub notes: Vec<String>,
}

impl ProvisionalEntity {
    pub fn links(&self, kind: LinkKind) -> &BTreeSet<usize> {
        match kind {
            LinkKind::AnchorOnly => &self.anchor_links,
            LinkKind::SecondaryOnly => &self.secondary_links,
        }
    }
}

/// Builds one provisional entity per group.
#[derive(Debug, Default)]
pub struct Aggregator {
    collisions: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of same-source members that lost their per-source slot.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// `records`, `grouping` and `neighbors` must cover the same index range.
    pub fn aggregate(
        &mut self,
        records: &[PointPairRecord],
        grouping: &Grouping,
        neighbors: &[NeighborMatches],
    ) -> Vec<ProvisionalEntity> {
        let mut out = Vec::with_capacity(grouping.len());

        for (seq, members) in grouping.groups().iter().enumerate() {
            let anchor = Point::mean(members.iter().map(|&i| records[i].anchor()));
            let secondary = Point::mean(members.iter().map(|&i| records[i].secondary()));
            let (Some(anchor), Some(secondary)) = (anchor, secondary) else {
                continue;
            };

            let mut sources = BTreeMap::new();
            let mut total: i64 = 0;
            let mut notes: Vec<String> = Vec::new();
            for &i in members {
                let rec = &records[i];
                if sources.contains_key(&rec.source) {
                    self.collisions += 1;
                    log::warn!(
                        "group {seq}: second {} member (record {i}) keeps its line but not its elevations",
                        rec.source
                    );
                } else {
                    sources.insert(rec.source, rec.elevations);
                }
                total += i64::from(rec.elevations.elevation) - i64::from(rec.elevations.col_elevation);
                if let Some(n) = rec.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                    if !notes.iter().any(|seen| seen == n) {
                        notes.push(n.to_string());
                    }
                }
            }
            let Some(prominence) = Prominence::new(total, members.len() as u32) else {
                continue;
            };

            let mut anchor_links = BTreeSet::new();
            let mut secondary_links = BTreeSet::new();
            for &i in members {
                let Some(m) = neighbors.get(i) else { continue };
                for link in m.links(i) {
                    let target = grouping.group_of(link.to);
                    // Endpoint links inside one group carry no information.
                    if target == seq {
                        continue;
                    }
                    match link.kind {
                        LinkKind::AnchorOnly => anchor_links.insert(target),
                        LinkKind::SecondaryOnly => secondary_links.insert(target),
                    };
                }
            }

            out.push(ProvisionalEntity {
                members: members.clone(),
                anchor,
                secondary,
                lines: members.iter().map(|&i| records[i].line.clone()).collect(),
                sources,
                prominence,
                anchor_links,
                secondary_links,
                notes,
            });
        }
        out
    }
}
