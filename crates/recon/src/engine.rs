use std::collections::BTreeMap;

use sotamerge_core::{PointPairRecord, SourceTag};

use crate::aggregate::Aggregator;
use crate::config::{MergeConfig, ReconcileConfig, ReconcileMode};
use crate::error::ReconError;
use crate::feedback::Feedback;
use crate::group::GroupBuilder;
use crate::matcher::{MatchParams, MutualMatcher};
use crate::model::{
    CanonicalEntity, MergeResult, MergeSummary, ReconcileResult, ReconcileSummary, RunMeta, SourceLayer,
};
use crate::rank::StableRanker;
use crate::reference::{ReferenceEntry, ReferenceReconciler};

/// Map layer names to DEM tags. Returns `(tag, layer position)` sorted by tag.
///
/// Every name must infer exactly one tag and no two names may share one.
pub fn resolve_sources<'a, I>(names: I) -> Result<Vec<(SourceTag, usize)>, ReconError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut claimed: BTreeMap<SourceTag, (usize, &'a str)> = BTreeMap::new();
    for (i, name) in names.into_iter().enumerate() {
        let tags = SourceTag::infer(name);
        let tag = match tags.as_slice() {
            [] => {
                return Err(ReconError::UnknownSource { layer: name.to_string() });
            }
            [tag] => *tag,
            _ => {
                return Err(ReconError::AmbiguousSource {
                    layer: name.to_string(),
                    tags,
                });
            }
        };
        if let Some((_, first)) = claimed.get(&tag) {
            return Err(ReconError::DuplicateSource {
                tag,
                first: first.to_string(),
                second: name.to_string(),
            });
        }
        claimed.insert(tag, (i, name));
    }
    Ok(claimed.into_iter().map(|(tag, (i, _))| (tag, i)).collect())
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Entities produced from one record batch.
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub entities: Vec<CanonicalEntity>,
    /// Records that took part in grouping; less than the input when cancelled.
    pub processed: usize,
    pub cancelled: bool,
}

/// Match, group, aggregate and rank one batch of attributed records.
pub fn merge_records(
    records: &[PointPairRecord],
    params: MatchParams,
    parallel: bool,
    id_prefix: &str,
    feedback: &dyn Feedback,
) -> MergeOutcome {
    let matcher = MutualMatcher::new(records, params);
    let scan = matcher.scan(parallel, feedback);
    let processed = scan.neighbors.len();
    feedback.set_progress(60.0);

    let mut builder = GroupBuilder::new(processed);
    for (i, m) in scan.neighbors.iter().enumerate() {
        builder.add_matches(i, &m.mutual);
    }
    let grouping = builder.finish();
    log::info!("{processed} records formed {} groups", grouping.len());
    feedback.set_progress(75.0);

    let mut aggregator = Aggregator::new();
    let provisional = aggregator.aggregate(&records[..processed], &grouping, &scan.neighbors);
    if aggregator.collisions() > 0 {
        log::warn!(
            "{} records shared a group with another record of the same DEM",
            aggregator.collisions()
        );
    }
    feedback.set_progress(90.0);

    let entities = StableRanker::new(id_prefix).rank(provisional);
    feedback.set_progress(100.0);

    MergeOutcome {
        entities,
        processed,
        cancelled: scan.cancelled,
    }
}

/// Merge the detection layers named in `config` into ranked canonical entities.
///
/// `layers` is matched to DEM tags by name; configuration errors abort before
/// any record is read.
pub fn run_merge(
    config: &MergeConfig,
    layers: Vec<SourceLayer>,
    feedback: &dyn Feedback,
) -> Result<MergeResult, ReconError> {
    if layers.is_empty() {
        return Err(ReconError::MissingInput("no detection layers supplied".into()));
    }
    let resolved = resolve_sources(layers.iter().map(|l| l.name.as_str()))?;
    let clip = config.clip_area()?;

    let crs = config
        .crs
        .clone()
        .or_else(|| layers.iter().find_map(|l| l.crs.clone()));
    match &crs {
        Some(crs) => log::info!("destination CRS {crs}"),
        None => log::warn!("no CRS configured or declared by any layer"),
    }
    if let Some(dest) = &crs {
        for layer in layers.iter().filter(|l| l.crs.as_ref().is_some_and(|c| c != dest)) {
            log::warn!(
                "layer '{}' declares CRS {} but output is {dest}; coordinates are used as given",
                layer.name,
                layer.crs.as_deref().unwrap_or_default()
            );
        }
    }

    let mut summary = MergeSummary::default();
    let mut records = Vec::new();
    let mut cancelled = false;
    let mut layers: Vec<Option<SourceLayer>> = layers.into_iter().map(Some).collect();

    for (tag, li) in resolved {
        if feedback.is_cancelled() {
            cancelled = true;
            break;
        }
        let Some(layer) = layers[li].take() else { continue };
        let mut kept = 0;
        for (row_no, row) in layer.records.into_iter().enumerate() {
            summary.input_records += 1;
            let label = row.id.clone().unwrap_or_else(|| format!("#{row_no}"));
            let record = match PointPairRecord::from_layer(tag, row) {
                Ok(r) => r,
                Err(defect) => {
                    log::warn!("{}: skipping {label}: {defect}", layer.name);
                    summary.skipped_records += 1;
                    continue;
                }
            };
            if let Some(clip) = &clip {
                if !clip.contains(record.anchor()) {
                    log::debug!("{}: {label} outside clip area", layer.name);
                    summary.skipped_records += 1;
                    continue;
                }
            }
            records.push(record);
            kept += 1;
        }
        log::info!("DEM {tag}: {kept} records from '{}'", layer.name);
        summary.records_per_source.insert(tag, kept);
    }
    feedback.set_progress(10.0);

    let params = MatchParams {
        distance: config.distance,
        anchor_neighbors: config.matching.anchor_neighbors,
        secondary_neighbors: config.matching.secondary_neighbors,
    };
    let outcome = if cancelled {
        MergeOutcome {
            cancelled: true,
            ..MergeOutcome::default()
        }
    } else {
        merge_records(&records, params, config.parallel, &config.id_prefix, feedback)
    };

    summary.entities = outcome.entities.len();
    summary.merged_groups = outcome.entities.iter().filter(|e| e.members.len() > 1).count();
    summary.merge_links = outcome.entities.iter().map(|e| e.merge.len()).sum();
    summary.cross_links = outcome.entities.iter().map(|e| e.cross.len()).sum();
    log::info!(
        "{} entities ({} merged groups, {} merge links, {} cross links)",
        summary.entities,
        summary.merged_groups,
        summary.merge_links,
        summary.cross_links
    );

    Ok(MergeResult {
        meta: RunMeta::new(&config.name, crs, outcome.cancelled),
        summary,
        entities: outcome.entities,
    })
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Align merged detections with the reference list in the configured mode.
pub fn run_reconcile(
    config: &ReconcileConfig,
    detections: Vec<CanonicalEntity>,
    references: &[ReferenceEntry],
    feedback: &dyn Feedback,
) -> Result<ReconcileResult, ReconError> {
    config.validate()?;

    let reconciler = ReferenceReconciler {
        anchor_tolerance: config.tolerance.anchor,
        secondary_tolerance: config.tolerance.secondary,
        sort_output: config.sort_output,
    };
    let detection_count = detections.len();
    log::info!(
        "reconciling {detection_count} detections against {} reference entries ({} mode)",
        references.len(),
        config.mode
    );

    let out = match config.mode {
        ReconcileMode::Spatial => reconciler.spatial(detections, references, feedback),
        ReconcileMode::Key => reconciler.by_key(detections, references, feedback),
    };

    let summary = ReconcileSummary {
        detections: detection_count,
        matched: out.matched,
        references: references.len(),
        candidates: out.candidates,
        remainder: out.remainder.len(),
    };
    log::info!(
        "{} matched, {} reference entries left over ({} with candidates)",
        summary.matched,
        summary.remainder,
        summary.candidates
    );

    Ok(ReconcileResult {
        meta: RunMeta::new(&config.name, None, out.cancelled),
        mode: config.mode,
        summary,
        entities: out.entities,
        remainder: out.remainder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_sorted_by_tag() {
        let resolved = resolve_sources(["glo30_fagaras", "Fagaras_SRTM", "aster-v3"]).unwrap();
        assert_eq!(
            resolved,
            vec![(SourceTag::Srtm, 1), (SourceTag::Aster, 2), (SourceTag::Glo30, 0)]
        );
    }

    #[test]
    fn ambiguous_layer_name() {
        let err = resolve_sources(["srtm_vs_alos"]).unwrap_err();
        assert!(matches!(err, ReconError::AmbiguousSource { ref tags, .. } if tags.len() == 2));
    }

    #[test]
    fn duplicate_layer_tag() {
        let err = resolve_sources(["a_srtm", "b_SRTM"]).unwrap_err();
        match err {
            ReconError::DuplicateSource { tag, first, second } => {
                assert_eq!(tag, SourceTag::Srtm);
                assert_eq!(first, "a_srtm");
                assert_eq!(second, "b_SRTM");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn unknown_layer_name() {
        assert!(matches!(
            resolve_sources(["lidar"]),
            Err(ReconError::UnknownSource { .. })
        ));
    }
}
