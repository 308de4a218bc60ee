//! `sotamerge-core`: leaf types shared by the engine, IO and CLI crates.

pub mod geometry;
pub mod record;
pub mod source;

pub use geometry::{ClipArea, LineString, MultiLineString, Point, Polygon};
pub use record::{ElevationPair, LayerRecord, PointPairRecord, RecordDefect};
pub use source::SourceTag;
