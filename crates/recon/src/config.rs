use std::collections::HashSet;

use serde::Deserialize;
use sotamerge_core::{ClipArea, Point, Polygon, SourceTag};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Merge config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    pub name: String,
    /// Destination CRS label. Falls back to the first layer that declares one.
    #[serde(default)]
    pub crs: Option<String>,
    /// Neighbour distance for matching, in the linear units of the CRS.
    pub distance: f64,
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Run neighbour queries on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub clip: Vec<ClipRing>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default = "default_anchor_neighbors")]
    pub anchor_neighbors: usize,
    #[serde(default = "default_secondary_neighbors")]
    pub secondary_neighbors: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            anchor_neighbors: default_anchor_neighbors(),
            secondary_neighbors: default_secondary_neighbors(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    /// Layer name; the DEM tag is inferred from it.
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub crs: Option<String>,
}

/// Exterior ring of one clipping polygon.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipRing {
    pub ring: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    /// Remainder (unmatched reference entries), reconciliation only.
    #[serde(default)]
    pub remainder: Option<String>,
}

fn default_id_prefix() -> String {
    "S".into()
}

fn default_true() -> bool {
    true
}

fn default_anchor_neighbors() -> usize {
    5
}

fn default_secondary_neighbors() -> usize {
    20
}

impl MergeConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MergeConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "distance must be a finite value >= 0, got {}",
                self.distance
            )));
        }

        if self.matching.anchor_neighbors == 0 || self.matching.secondary_neighbors == 0 {
            return Err(ReconError::ConfigValidation(
                "neighbour counts must be at least 1".into(),
            ));
        }

        if self.id_prefix.trim().is_empty() {
            return Err(ReconError::ConfigValidation("id_prefix must not be empty".into()));
        }

        if self.layers.is_empty() {
            return Err(ReconError::MissingInput("at least one [[layers]] entry is required".into()));
        }

        let mut names = HashSet::new();
        for layer in &self.layers {
            if !names.insert(layer.name.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "layer '{}' is listed twice",
                    layer.name
                )));
            }
        }
        // Tag resolution errors are configuration errors: surface them before any IO.
        crate::engine::resolve_sources(self.layers.iter().map(|l| l.name.as_str()))?;

        self.clip_area()?;
        Ok(())
    }

    /// Clip polygons as a union, `None` when no clip rings are configured.
    pub fn clip_area(&self) -> Result<Option<ClipArea>, ReconError> {
        if self.clip.is_empty() {
            return Ok(None);
        }
        let mut polygons = Vec::with_capacity(self.clip.len());
        for (i, ring) in self.clip.iter().enumerate() {
            let points = ring.ring.iter().map(|&p| Point::from(p)).collect();
            let polygon = Polygon::new(points).ok_or_else(|| {
                ReconError::ConfigValidation(format!("clip ring {i} needs at least 3 vertices"))
            })?;
            polygons.push(polygon);
        }
        Ok(Some(ClipArea::new(polygons)))
    }

    /// Layers that declare each tag, for logging and validation messages.
    pub fn layer_tags(&self) -> Result<Vec<(SourceTag, &LayerConfig)>, ReconError> {
        let resolved = crate::engine::resolve_sources(self.layers.iter().map(|l| l.name.as_str()))?;
        Ok(resolved.into_iter().map(|(tag, i)| (tag, &self.layers[i])).collect())
    }
}

// ---------------------------------------------------------------------------
// Reconcile config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// Nearest reference summit and col within tolerances.
    Spatial,
    /// Explicit `Match` key recorded on the reference entry.
    Key,
}

impl std::fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spatial => write!(f, "spatial"),
            Self::Key => write!(f, "key"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    pub name: String,
    pub mode: ReconcileMode,
    /// Merged summit layer (detections).
    pub input: String,
    /// Authoritative reference layer.
    pub reference: String,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    /// Key mode: put referenced summits first, then by descending prominence.
    #[serde(default = "default_true")]
    pub sort_output: bool,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToleranceConfig {
    #[serde(default = "default_anchor_tolerance")]
    pub anchor: f64,
    #[serde(default = "default_secondary_tolerance")]
    pub secondary: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            anchor: default_anchor_tolerance(),
            secondary: default_secondary_tolerance(),
        }
    }
}

fn default_anchor_tolerance() -> f64 {
    0.005
}

fn default_secondary_tolerance() -> f64 {
    0.01
}

impl ReconcileConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconcileConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        for (what, value) in [
            ("tolerance.anchor", self.tolerance.anchor),
            ("tolerance.secondary", self.tolerance.secondary),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "{what} must be a finite value >= 0, got {value}"
                )));
            }
        }

        if self.input.trim().is_empty() {
            return Err(ReconError::MissingInput("input layer path is empty".into()));
        }
        if self.reference.trim().is_empty() {
            return Err(ReconError::MissingInput("reference layer path is empty".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
