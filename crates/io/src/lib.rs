// File I/O for detection layers, reference lists and DEM inputs

pub mod csv;
pub mod entities;
pub mod error;
pub mod grid;
pub mod import;
pub mod json;
pub mod landserf;
pub mod layer;
pub mod prominence;
pub mod reference;
pub mod wkt;

pub use entities::{read_entities, write_entities};
pub use error::IoError;
pub use grid::{AsciiGrid, ElevationSampler};
pub use import::{import_summits, ImportResult, ImportSummary};
pub use landserf::{parse_lst, read_lst, LandserfSummit};
pub use layer::{read_layer, write_layer};
pub use prominence::{check_prominence, write_prominence, ProminenceRow};
pub use reference::{read_references, write_remainder};
