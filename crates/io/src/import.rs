//! Landserf summit list + DEM → detection layer.

use serde::Serialize;
use sotamerge_core::{ClipArea, LayerRecord};
use sotamerge_recon::Feedback;

use crate::grid::ElevationSampler;
use crate::landserf::LandserfSummit;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub summits: usize,
    pub imported: usize,
    pub outside_clip: usize,
    pub sample_failed: usize,
    /// Col on the raster minimum, usually a fill or border artefact.
    pub col_at_minimum: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub records: Vec<LayerRecord>,
    pub summary: ImportSummary,
}

fn to_elevation(v: f64) -> Option<i32> {
    let r = v.round();
    (r.is_finite() && r >= i32::MIN as f64 && r <= i32::MAX as f64).then_some(r as i32)
}

/// Sample summit and col elevations for each Landserf summit.
///
/// Rows get sequential ids and carry the Landserf prominence as their name.
pub fn import_summits(
    summits: &[LandserfSummit],
    dem: &dyn ElevationSampler,
    clip: Option<&ClipArea>,
    feedback: &dyn Feedback,
) -> ImportResult {
    let mut out = ImportResult::default();
    out.summary.summits = summits.len();
    let floor = dem.minimum();
    log::info!("loaded {} summits, filtering and sampling", summits.len());

    for (current, summit) in summits.iter().enumerate() {
        if feedback.is_cancelled() {
            out.summary.cancelled = true;
            log::warn!("import cancelled after {current} of {} summits", summits.len());
            break;
        }
        feedback.set_progress(current as f64 * 100.0 / summits.len() as f64);

        if clip.is_some_and(|c| !c.contains(summit.summit())) {
            out.summary.outside_clip += 1;
            continue;
        }

        let ele = dem.sample(summit.summit()).and_then(to_elevation);
        let col_sample = dem.sample(summit.col());
        let (Some(ele), Some(col_value)) = (ele, col_sample) else {
            out.summary.sample_failed += 1;
            continue;
        };
        if Some(col_value) == floor {
            out.summary.col_at_minimum += 1;
            continue;
        }
        let Some(col) = to_elevation(col_value) else {
            out.summary.sample_failed += 1;
            continue;
        };

        out.records.push(LayerRecord {
            id: Some(out.records.len().to_string()),
            name: Some(summit.prominence.to_string()),
            line: Some(summit.ridge.clone()),
            elevation: Some(ele),
            col_elevation: Some(col),
            notes: None,
        });
    }

    out.summary.imported = out.records.len();
    log::info!(
        "imported {} summits ({} outside clip, {} unsampled, {} col at raster minimum)",
        out.summary.imported,
        out.summary.outside_clip,
        out.summary.sample_failed,
        out.summary.col_at_minimum
    );
    out
}
