use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Elevation model a detection layer was extracted from.
///
/// Variant order is the output order: per-source columns and merged
/// geometry parts always follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceTag {
    Srtm,
    Aster,
    Alos,
    Tdx,
    Glo30,
}

impl SourceTag {
    pub const ALL: [SourceTag; 5] = [
        SourceTag::Srtm,
        SourceTag::Aster,
        SourceTag::Alos,
        SourceTag::Tdx,
        SourceTag::Glo30,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Srtm => "SRTM",
            Self::Aster => "ASTER",
            Self::Alos => "ALOS",
            Self::Tdx => "TDX",
            Self::Glo30 => "GLO30",
        }
    }

    /// Every tag whose label occurs in `layer_name`, case-insensitively.
    pub fn infer(layer_name: &str) -> Vec<SourceTag> {
        let upper = layer_name.to_uppercase();
        Self::ALL
            .into_iter()
            .filter(|tag| upper.contains(tag.label()))
            .collect()
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::ALL
            .into_iter()
            .find(|tag| tag.label() == upper)
            .ok_or_else(|| format!("unknown DEM source '{s}' (expected one of SRTM, ASTER, ALOS, TDX, GLO30)"))
    }
}
