use rayon::prelude::*;
use serde::Serialize;
use sotamerge_core::PointPairRecord;

use crate::feedback::Feedback;
use crate::spatial::SpatialIndex;

/// Neighbour budgets and distance for one matching pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    pub distance: f64,
    pub anchor_neighbors: usize,
    pub secondary_neighbors: usize,
}

impl MatchParams {
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            anchor_neighbors: 5,
            secondary_neighbors: 20,
        }
    }
}

/// Which endpoint agreed when the other did not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Close at the summit, not at the col.
    AnchorOnly,
    /// Close at the col, not at the summit.
    SecondaryOnly,
}

/// One-endpoint proximity from `from` to `to`, kept for manual review.
///
/// Indices are whatever space the producer works in: raw record indices
/// out of the matcher, provisional entity sequences after aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AmbiguousLink {
    pub from: usize,
    pub to: usize,
    pub kind: LinkKind,
}

/// Neighbour classification of one record, self excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborMatches {
    /// Present in both queries.
    pub mutual: Vec<usize>,
    /// Present in the anchor query only, in query order.
    pub anchor_only: Vec<usize>,
    /// Present in the secondary query only, in query order.
    pub secondary_only: Vec<usize>,
}

impl NeighborMatches {
    fn classify(me: usize, anchors: &[usize], secondaries: &[usize]) -> Self {
        let mut out = NeighborMatches::default();
        for &a in anchors {
            if a == me {
                continue;
            }
            if secondaries.contains(&a) {
                out.mutual.push(a);
            } else {
                out.anchor_only.push(a);
            }
        }
        out.secondary_only = secondaries
            .iter()
            .copied()
            .filter(|&c| c != me && !anchors.contains(&c))
            .collect();
        out
    }

    /// Links in (anchor-only, secondary-only) order.
    pub fn links(&self, from: usize) -> impl Iterator<Item = AmbiguousLink> + '_ {
        let a = self.anchor_only.iter().map(move |&to| AmbiguousLink {
            from,
            to,
            kind: LinkKind::AnchorOnly,
        });
        let s = self.secondary_only.iter().map(move |&to| AmbiguousLink {
            from,
            to,
            kind: LinkKind::SecondaryOnly,
        });
        a.chain(s)
    }
}

/// Result of a matching pass over a record slice.
#[derive(Debug, Clone, Default)]
pub struct MatchScan {
    /// One entry per processed record; shorter than the input when cancelled.
    pub neighbors: Vec<NeighborMatches>,
    pub cancelled: bool,
}

/// Pairs records whose summits and cols are both among each other's nearest
/// neighbours.
#[derive(Debug)]
pub struct MutualMatcher<'a> {
    records: &'a [PointPairRecord],
    anchors: SpatialIndex,
    secondaries: SpatialIndex,
    params: MatchParams,
}

impl<'a> MutualMatcher<'a> {
    pub fn new(records: &'a [PointPairRecord], params: MatchParams) -> Self {
        let anchors = SpatialIndex::from_points(records.iter().enumerate().map(|(i, r)| (i, r.anchor())));
        let secondaries =
            SpatialIndex::from_points(records.iter().enumerate().map(|(i, r)| (i, r.secondary())));
        Self {
            records,
            anchors,
            secondaries,
            params,
        }
    }

    /// Classify the neighbours of record `i`.
    pub fn neighbors(&self, i: usize) -> NeighborMatches {
        let rec = &self.records[i];
        let anchors = self
            .anchors
            .query(rec.anchor(), self.params.anchor_neighbors, self.params.distance);
        let secondaries =
            self.secondaries
                .query(rec.secondary(), self.params.secondary_neighbors, self.params.distance);
        NeighborMatches::classify(i, &anchors, &secondaries)
    }

    /// Classify every record. On cancellation the result covers the longest
    /// fully processed prefix, and neighbours beyond that prefix are dropped
    /// so nothing refers to a record that was never processed.
    pub fn scan(&self, parallel: bool, feedback: &dyn Feedback) -> MatchScan {
        let n = self.records.len();
        let one = |i: usize| -> Option<NeighborMatches> {
            if feedback.is_cancelled() {
                return None;
            }
            Some(self.neighbors(i))
        };

        let raw: Vec<Option<NeighborMatches>> = if parallel {
            (0..n).into_par_iter().map(one).collect()
        } else {
            let mut out = Vec::with_capacity(n);
            for i in 0..n {
                let r = one(i);
                let stop = r.is_none();
                out.push(r);
                if stop {
                    break;
                }
            }
            out
        };

        let stop = raw.iter().position(Option::is_none);
        let mut neighbors: Vec<NeighborMatches> = raw.into_iter().map_while(|r| r).collect();
        if let Some(stop) = stop {
            log::warn!("matching cancelled after {stop} of {n} records");
            for m in &mut neighbors {
                m.mutual.retain(|&j| j < stop);
                m.anchor_only.retain(|&j| j < stop);
                m.secondary_only.retain(|&j| j < stop);
            }
        }
        MatchScan {
            neighbors,
            cancelled: stop.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{CancelFlag, NoFeedback};
    use sotamerge_core::{LineString, Point, SourceTag};

    fn rec(source: SourceTag, anchor: (f64, f64), col: (f64, f64)) -> PointPairRecord {
        PointPairRecord::new(
            source,
            LineString::segment(Point::new(anchor.0, anchor.1), Point::new(col.0, col.1)),
            1000,
            800,
        )
    }

    #[test]
    fn both_endpoints_close_is_mutual() {
        let records = vec![
            rec(SourceTag::Srtm, (0.0, 0.0), (100.0, 0.0)),
            rec(SourceTag::Alos, (3.0, 0.0), (100.0, 4.0)),
        ];
        let matcher = MutualMatcher::new(&records, MatchParams::new(5.0));
        let scan = matcher.scan(false, &NoFeedback);
        assert!(!scan.cancelled);
        assert_eq!(scan.neighbors[0].mutual, vec![1]);
        assert_eq!(scan.neighbors[1].mutual, vec![0]);
        assert!(scan.neighbors[0].anchor_only.is_empty());
        assert!(scan.neighbors[0].secondary_only.is_empty());
    }

    #[test]
    fn anchor_only_proximity_is_a_link() {
        let records = vec![
            rec(SourceTag::Srtm, (0.0, 0.0), (100.0, 0.0)),
            rec(SourceTag::Alos, (3.0, 0.0), (300.0, 0.0)),
        ];
        let matcher = MutualMatcher::new(&records, MatchParams::new(5.0));
        let m = matcher.neighbors(0);
        assert!(m.mutual.is_empty());
        assert_eq!(m.anchor_only, vec![1]);
        let links: Vec<_> = m.links(0).collect();
        assert_eq!(
            links,
            vec![AmbiguousLink {
                from: 0,
                to: 1,
                kind: LinkKind::AnchorOnly
            }]
        );
    }

    #[test]
    fn secondary_only_proximity_is_a_link() {
        let records = vec![
            rec(SourceTag::Srtm, (0.0, 0.0), (100.0, 0.0)),
            rec(SourceTag::Alos, (50.0, 0.0), (101.0, 0.0)),
        ];
        let matcher = MutualMatcher::new(&records, MatchParams::new(5.0));
        let m = matcher.neighbors(1);
        assert_eq!(m.secondary_only, vec![0]);
        assert_eq!(m.links(1).next().map(|l| l.kind), Some(LinkKind::SecondaryOnly));
    }

    #[test]
    fn parallel_scan_matches_sequential() {
        let records: Vec<_> = (0..50)
            .map(|i| {
                let x = (i % 7) as f64 * 2.0;
                let y = (i / 7) as f64 * 2.0;
                rec(SourceTag::Srtm, (x, y), (x + 10.0, y + (i % 3) as f64))
            })
            .collect();
        let matcher = MutualMatcher::new(&records, MatchParams::new(3.0));
        let a = matcher.scan(false, &NoFeedback);
        let b = matcher.scan(true, &NoFeedback);
        assert_eq!(a.neighbors, b.neighbors);
    }

    #[test]
    fn cancelled_scan_is_empty_prefix() {
        let records = vec![
            rec(SourceTag::Srtm, (0.0, 0.0), (100.0, 0.0)),
            rec(SourceTag::Alos, (3.0, 0.0), (100.0, 4.0)),
        ];
        let flag = CancelFlag::new();
        flag.cancel();
        let matcher = MutualMatcher::new(&records, MatchParams::new(5.0));
        let scan = matcher.scan(true, &flag);
        assert!(scan.cancelled);
        assert!(scan.neighbors.is_empty());
    }
}
