use std::fmt;

use sotamerge_core::SourceTag;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad tolerance, empty layer list, etc.).
    ConfigValidation(String),
    /// Layer name does not contain any recognized DEM tag.
    UnknownSource { layer: String },
    /// Layer name contains more than one DEM tag.
    AmbiguousSource { layer: String, tags: Vec<SourceTag> },
    /// Two layers resolve to the same DEM tag.
    DuplicateSource { tag: SourceTag, first: String, second: String },
    /// A required input set is missing.
    MissingInput(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownSource { layer } => {
                write!(f, "layer name '{layer}' does not infer a known DEM type")
            }
            Self::AmbiguousSource { layer, tags } => {
                let names: Vec<&str> = tags.iter().map(|t| t.label()).collect();
                write!(f, "layer name '{layer}' matches several DEM types: {}", names.join(", "))
            }
            Self::DuplicateSource { tag, first, second } => {
                write!(f, "layer '{second}' appears to be the same DEM ({tag}) as '{first}'")
            }
            Self::MissingInput(msg) => write!(f, "missing input: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
