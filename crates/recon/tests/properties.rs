// Property-based tests for grouping, ranking and reconciliation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use sotamerge_core::{LineString, Point, PointPairRecord, SourceTag};
use sotamerge_recon::group::GroupBuilder;
use sotamerge_recon::{
    merge_records, CanonicalEntity, MatchParams, MutualMatcher, NoFeedback, Prominence, ReferenceAction,
    ReferenceEntry, ReferenceReconciler,
};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Records on a coarse integer grid so that exact ties and clusters are common.
fn arb_records(max: usize) -> impl Strategy<Value = Vec<PointPairRecord>> {
    proptest::collection::vec(
        (0usize..5, 0i32..20, 0i32..20, -3i32..4, -3i32..4, 500i32..3000, 0i32..500),
        0..=max,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(tag, x, y, dx, dy, ele, drop)| {
                let anchor = Point::new(x as f64, y as f64);
                let col = Point::new((x + 10 + dx) as f64, (y + dy) as f64);
                PointPairRecord::new(SourceTag::ALL[tag], LineString::segment(anchor, col), ele, ele - drop)
            })
            .collect()
    })
}

/// Like [`arb_records`] but no two records share a ridge line, so every
/// record can be found again among the merged members.
fn arb_distinct_records(max: usize) -> impl Strategy<Value = Vec<PointPairRecord>> {
    arb_records(max).prop_map(|records| {
        let mut out: Vec<PointPairRecord> = Vec::with_capacity(records.len());
        for r in records {
            if !out.iter().any(|o| o.line == r.line) {
                out.push(r);
            }
        }
        out
    })
}

/// Many records around one summit and one col, more than the anchor query returns.
fn arb_crowded_records() -> impl Strategy<Value = Vec<PointPairRecord>> {
    proptest::collection::vec((0usize..5, 0i32..8, 0i32..8, 0i32..8, 0i32..8, 500i32..3000), 6..=24).prop_map(
        |rows| {
            let mut out: Vec<PointPairRecord> = Vec::with_capacity(rows.len());
            for (tag, ax, ay, cx, cy, ele) in rows {
                let anchor = Point::new(f64::from(ax) * 0.25, f64::from(ay) * 0.25);
                let col = Point::new(10.0 + f64::from(cx) * 0.25, f64::from(cy) * 0.25);
                let r = PointPairRecord::new(SourceTag::ALL[tag], LineString::segment(anchor, col), ele, ele - 100);
                if !out.iter().any(|o| o.line == r.line) {
                    out.push(r);
                }
            }
            out
        },
    )
}

/// Entity index holding each record, by ridge line.
fn entity_of(records: &[PointPairRecord], entities: &[CanonicalEntity]) -> Vec<usize> {
    records
        .iter()
        .map(|r| {
            entities
                .iter()
                .position(|e| e.members.contains(&r.line))
                .unwrap_or_else(|| panic!("record {:?} lost in merge", r.line))
        })
        .collect()
}

fn arb_pairs(n: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0..n.max(1), 0..n.max(1)), 0..=n * 2)
}

fn arb_override() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        2 => Just(None),
        2 => r"[0-9]{1,4}".prop_map(Some),
        1 => r"[a-z~ ]{1,6}".prop_map(Some),
    ]
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn grouping_is_a_partition_respecting_matches(
        (n, pairs) in (1usize..40).prop_flat_map(|n| (Just(n), arb_pairs(n)))
    ) {
        let mut builder = GroupBuilder::new(n);
        for &(a, b) in &pairs {
            builder.add_matches(a, &[b]);
        }
        let grouping = builder.finish();

        let mut seen = vec![0usize; n];
        for group in grouping.groups() {
            for &i in group {
                seen[i] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&c| c == 1));
        for &(a, b) in &pairs {
            prop_assert_eq!(grouping.group_key(a), grouping.group_key(b));
        }

        let mut reversed = GroupBuilder::new(n);
        for &(a, b) in pairs.iter().rev() {
            reversed.add_matches(b, &[a]);
        }
        prop_assert_eq!(reversed.finish(), grouping);
    }

    #[test]
    fn mutual_matches_are_symmetric(records in arb_records(30)) {
        let params = MatchParams { distance: 3.0, anchor_neighbors: 40, secondary_neighbors: 40 };
        let matcher = MutualMatcher::new(&records, params);
        let all: Vec<_> = (0..records.len()).map(|i| matcher.neighbors(i)).collect();
        for (i, m) in all.iter().enumerate() {
            for &j in &m.mutual {
                prop_assert!(all[j].mutual.contains(&i), "{i} -> {j} not mirrored");
            }
        }
    }

    #[test]
    fn one_sided_matches_share_a_group_at_default_limits(records in arb_crowded_records()) {
        let params = MatchParams::new(3.0);
        let matcher = MutualMatcher::new(&records, params);
        let out = merge_records(&records, params, false, "S", &NoFeedback);
        let owner = entity_of(&records, &out.entities);

        for i in 0..records.len() {
            for j in matcher.neighbors(i).mutual {
                prop_assert_eq!(owner[i], owner[j], "{} -> {} split across entities", i, j);
            }
        }
    }

    #[test]
    fn merged_output_is_ranked_and_closed(records in arb_records(40)) {
        let out = merge_records(&records, MatchParams::new(3.0), true, "S", &NoFeedback);

        let members: usize = out.entities.iter().map(|e| e.members.len()).sum();
        prop_assert_eq!(members, records.len());

        for pair in out.entities.windows(2) {
            prop_assert!(pair[0].prominence >= pair[1].prominence);
        }

        let ids: HashSet<&str> = out.entities.iter().map(|e| e.id.as_str()).collect();
        for (rank, e) in out.entities.iter().enumerate() {
            prop_assert_eq!(e.fid, rank);
            prop_assert_eq!(&e.id, &format!("S{:04}", rank + 1));
            for link in e.merge.iter().chain(&e.cross) {
                prop_assert!(ids.contains(link.as_str()));
                prop_assert_ne!(link, &e.id);
            }
        }
    }

    #[test]
    fn group_prominence_is_exact_mean(records in arb_distinct_records(40)) {
        let out = merge_records(&records, MatchParams::new(3.0), false, "S", &NoFeedback);
        for e in &out.entities {
            let group: Vec<_> = records.iter().filter(|r| e.members.contains(&r.line)).collect();
            prop_assert_eq!(group.len(), e.members.len());
            let total: i64 = group.iter().map(|r| i64::from(r.elevations.prominence())).sum();
            prop_assert_eq!(e.prominence, Prominence::new(total, group.len() as u32));
        }
    }

    #[test]
    fn key_mode_never_overwrites_present_values(
        name in proptest::option::of("[A-Z][a-z]{2,8}"),
        ele in proptest::option::of(100i32..3000),
        col in proptest::option::of(100i32..3000),
        reference in proptest::option::of("YO/[A-Z]{2}-[0-9]{3}"),
        check_ele in arb_override(),
        check_col in arb_override(),
        action in prop_oneof![Just("ok"), Just("move"), Just("switch"), Just("check"), Just("")],
    ) {
        let detection = CanonicalEntity {
            fid: 0,
            id: "S0001".into(),
            name: name.clone(),
            elevation: ele,
            col_elevation: col,
            reference: reference.clone(),
            prominence: None,
            merge: vec![],
            cross: vec![],
            notes: vec!["keep".into()],
            sources: BTreeMap::new(),
            anchor: Point::new(0.0, 0.0),
            secondary: Point::new(1.0, 0.0),
            members: vec![],
        };
        let entry = ReferenceEntry {
            reference: Some("YO/ZZ-999".into()),
            name: Some("Replacement".into()),
            action: ReferenceAction::new(action),
            check_ele,
            check_col,
            match_key: Some("S0001".into()),
            line: Some(LineString::segment(Point::new(5.0, 5.0), Point::new(6.0, 5.0))),
        };

        let out = ReferenceReconciler::default().by_key(vec![detection], &[entry], &NoFeedback);
        let d = &out.entities[0];
        if name.is_some() { prop_assert_eq!(&d.name, &name); }
        if ele.is_some() { prop_assert_eq!(d.elevation, ele); }
        if col.is_some() { prop_assert_eq!(d.col_elevation, col); }
        if reference.is_some() { prop_assert_eq!(&d.reference, &reference); }
        prop_assert_eq!(d.notes.first().map(String::as_str), Some("keep"));
    }
}
