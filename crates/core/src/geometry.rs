use serde::{Deserialize, Serialize};

/// Position in an already projected, planar coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_2(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Arithmetic mean of a point set, `None` when empty.
    pub fn mean<I>(points: I) -> Option<Point>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut n = 0usize;
        let (mut sx, mut sy) = (0.0, 0.0);
        for p in points {
            sx += p.x;
            sy += p.y;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Point::new(sx / n as f64, sy / n as f64))
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl From<[f64; 2]> for Point {
    fn from(a: [f64; 2]) -> Self {
        Point::new(a[0], a[1])
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// A polyline with at least two vertices.
///
/// The first vertex is the anchor (summit) and the last one the secondary
/// point (col), so a line can never carry one endpoint without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct LineString(Vec<Point>);

impl LineString {
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self(points))
    }

    /// Two-vertex line from anchor to secondary.
    pub fn segment(anchor: Point, secondary: Point) -> Self {
        Self(vec![anchor, secondary])
    }

    pub fn first(&self) -> Point {
        self.0[0]
    }

    pub fn last(&self) -> Point {
        self.0[self.0.len() - 1]
    }

    pub fn points(&self) -> &[Point] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: a line has at least two vertices.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<Vec<Point>> for LineString {
    type Error = String;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        let n = points.len();
        LineString::new(points).ok_or_else(|| format!("line needs at least 2 vertices, got {n}"))
    }
}

impl From<LineString> for Vec<Point> {
    fn from(line: LineString) -> Self {
        line.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiLineString {
    pub parts: Vec<LineString>,
}

impl MultiLineString {
    pub fn new(parts: Vec<LineString>) -> Self {
        Self { parts }
    }
}

// ---------------------------------------------------------------------------
// Clipping
// ---------------------------------------------------------------------------

/// Simple polygon given by its exterior ring. Closing vertex is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    ring: Vec<Point>,
}

impl Polygon {
    pub fn new(mut ring: Vec<Point>) -> Option<Self> {
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return None;
        }
        Some(Self { ring })
    }

    pub fn ring(&self) -> &[Point] {
        &self.ring
    }

    /// Even-odd ray casting. Points on the boundary count as inside.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.ring.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.ring[i];
            let b = self.ring[j];
            if on_segment(a, b, p) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = String;

    fn try_from(ring: Vec<Point>) -> Result<Self, Self::Error> {
        let n = ring.len();
        Polygon::new(ring).ok_or_else(|| format!("polygon needs at least 3 distinct vertices, got {n}"))
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.ring
    }
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    let scale = (b.x - a.x).abs().max((b.y - a.y).abs()).max(1.0);
    if cross.abs() > 1e-12 * scale * scale {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Union of polygons used to filter records by anchor position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipArea {
    polygons: Vec<Polygon>,
}

impl ClipArea {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn contains(&self, p: Point) -> bool {
        self.polygons.iter().any(|poly| poly.contains(p))
    }
}
