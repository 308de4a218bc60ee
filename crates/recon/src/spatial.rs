use ordered_float::OrderedFloat;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use sotamerge_core::Point;

/// A point stored in the R-tree together with its caller id and insertion order.
#[derive(Debug, Clone)]
struct IndexedPoint {
    id: usize,
    seq: usize,
    pos: [f64; 2],
}

impl PartialEq for IndexedPoint {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        Point::from(self.pos).distance_2(&Point::from(*point))
    }
}

/// Nearest-neighbour lookup over a planar point set.
///
/// Distances are Euclidean in whatever CRS the caller supplies. Once built,
/// queries are read-only and may run from several threads.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    next_seq: usize,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex").field("len", &self.tree.size()).finish()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            next_seq: 0,
        }
    }

    /// Bulk-load an index. Iteration order is the insertion order used for tie-breaks.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (usize, Point)>,
    {
        let nodes: Vec<IndexedPoint> = points
            .into_iter()
            .enumerate()
            .map(|(seq, (id, p))| IndexedPoint { id, seq, pos: p.into() })
            .collect();
        let next_seq = nodes.len();
        Self {
            tree: RTree::bulk_load(nodes),
            next_seq,
        }
    }

    pub fn insert(&mut self, id: usize, point: Point) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tree.insert(IndexedPoint { id, seq, pos: point.into() });
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Up to `k` ids within `max_distance` of `point`, nearest first.
    /// Equal distances keep insertion order.
    pub fn query(&self, point: Point, k: usize, max_distance: f64) -> Vec<usize> {
        if k == 0 || max_distance.is_nan() || max_distance < 0.0 {
            return Vec::new();
        }
        let max_2 = max_distance * max_distance;
        let query: [f64; 2] = point.into();

        let mut hits: Vec<(OrderedFloat<f64>, usize, usize)> = Vec::with_capacity(k);
        for (node, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if d2 > max_2 {
                break;
            }
            // Keep consuming ties at the k-th distance so insertion order can decide.
            if hits.len() >= k && hits.last().is_some_and(|h| d2 > h.0.into_inner()) {
                break;
            }
            hits.push((OrderedFloat(d2), node.seq, node.id));
        }

        hits.sort_unstable();
        hits.truncate(k);
        hits.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Every id at the smallest distance within `max_distance`, in insertion
    /// order. More than one id means the nearest neighbour is not unique.
    pub fn nearest_ties(&self, point: Point, max_distance: f64) -> Vec<usize> {
        if max_distance.is_nan() || max_distance < 0.0 {
            return Vec::new();
        }
        let max_2 = max_distance * max_distance;
        let query: [f64; 2] = point.into();

        let mut nearest = None;
        let mut ties: Vec<(usize, usize)> = Vec::new();
        for (node, d2) in self.tree.nearest_neighbor_iter_with_distance_2(&query) {
            if d2 > max_2 || nearest.is_some_and(|n| d2 > n) {
                break;
            }
            nearest = Some(d2);
            ties.push((node.seq, node.id));
        }

        ties.sort_unstable();
        ties.into_iter().map(|(_, id)| id).collect()
    }
}
