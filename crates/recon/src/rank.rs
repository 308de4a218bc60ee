use crate::aggregate::ProvisionalEntity;
use crate::matcher::LinkKind;
use crate::model::CanonicalEntity;

/// Orders provisional entities by descending prominence and assigns final ids.
#[derive(Debug, Clone)]
pub struct StableRanker {
    prefix: String,
}

impl StableRanker {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Public identifier for a 0-based rank.
    pub fn id_for(&self, rank: usize) -> String {
        format!("{}{:04}", self.prefix, rank + 1)
    }

    /// `order[r]` is the provisional sequence placed at rank `r`. Equal
    /// prominences keep provisional order.
    pub fn order(entities: &[ProvisionalEntity]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..entities.len()).collect();
        order.sort_by(|&a, &b| entities[b].prominence.cmp(&entities[a].prominence));
        order
    }

    pub fn rank(&self, entities: Vec<ProvisionalEntity>) -> Vec<CanonicalEntity> {
        let order = Self::order(&entities);

        // Inverse permutation: provisional sequence -> final rank.
        let mut rank_of = vec![0usize; entities.len()];
        for (rank, &seq) in order.iter().enumerate() {
            rank_of[seq] = rank;
        }

        let resolve = |entity: &ProvisionalEntity, kind: LinkKind| -> Vec<String> {
            let mut ranks: Vec<usize> = entity
                .links(kind)
                .iter()
                .filter_map(|&seq| rank_of.get(seq).copied())
                .collect();
            ranks.sort_unstable();
            ranks.dedup();
            ranks.into_iter().map(|r| self.id_for(r)).collect()
        };

        let mut ranked: Vec<Option<CanonicalEntity>> = vec![None; entities.len()];
        for (seq, entity) in entities.iter().enumerate() {
            let rank = rank_of[seq];
            ranked[rank] = Some(CanonicalEntity {
                fid: rank,
                id: self.id_for(rank),
                name: None,
                elevation: None,
                col_elevation: None,
                reference: None,
                prominence: Some(entity.prominence),
                merge: resolve(entity, LinkKind::AnchorOnly),
                cross: resolve(entity, LinkKind::SecondaryOnly),
                notes: entity.notes.clone(),
                sources: entity.sources.clone(),
                anchor: entity.anchor,
                secondary: entity.secondary,
                members: entity.lines.clone(),
            });
        }
        ranked.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use sotamerge_core::Point;

    use super::*;
    use crate::model::Prominence;

    fn provisional(prominence: i64, anchor_links: &[usize]) -> ProvisionalEntity {
        ProvisionalEntity {
            members: vec![],
            anchor: Point::new(0.0, 0.0),
            secondary: Point::new(1.0, 1.0),
            lines: vec![],
            sources: BTreeMap::new(),
            prominence: Prominence::from_integer(prominence),
            anchor_links: anchor_links.iter().copied().collect(),
            secondary_links: BTreeSet::new(),
            notes: vec![],
        }
    }

    #[test]
    fn descending_prominence_ids() {
        let ranked = StableRanker::new("S").rank(vec![
            provisional(120, &[]),
            provisional(450, &[]),
            provisional(300, &[]),
        ]);
        let ids: Vec<_> = ranked.iter().map(|e| (e.prominence.unwrap().rounded(), e.id.as_str())).collect();
        assert_eq!(ids, vec![(450, "S0001"), (300, "S0002"), (120, "S0003")]);
        assert_eq!(ranked[2].fid, 2);
    }

    #[test]
    fn ties_keep_provisional_order() {
        let entities = vec![provisional(5, &[]), provisional(9, &[]), provisional(5, &[]), provisional(5, &[])];
        assert_eq!(StableRanker::order(&entities), vec![1, 0, 2, 3]);
    }

    #[test]
    fn links_resolve_through_inverse_permutation() {
        // seq 0 (rank 2) -> seq 1 (rank 0); seq 2 (rank 1) -> seq 0 and seq 1
        let ranked = StableRanker::new("X").rank(vec![
            provisional(10, &[1]),
            provisional(30, &[]),
            provisional(20, &[1, 0]),
        ]);
        assert_eq!(ranked[0].id, "X0001");
        assert!(ranked[0].merge.is_empty());
        assert_eq!(ranked[1].merge, vec!["X0001", "X0003"]);
        assert_eq!(ranked[2].merge, vec!["X0001"]);
    }
}
