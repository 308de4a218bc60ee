//! Transitive closure of mutual matches.

/// Disjoint sets over `0..n` with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Returns false when both were already in one set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}

/// Folds pairwise matches into equivalence groups.
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    sets: UnionFind,
}

impl GroupBuilder {
    pub fn new(n: usize) -> Self {
        Self { sets: UnionFind::new(n) }
    }

    /// Record that `i` matched each of `others`. Indices outside the builder
    /// range are ignored.
    pub fn add_matches(&mut self, i: usize, others: &[usize]) {
        let n = self.sets.len();
        if i >= n {
            return;
        }
        for &j in others {
            if j < n {
                self.sets.union(i, j);
            }
        }
    }

    pub fn finish(mut self) -> Grouping {
        let n = self.sets.len();
        let mut root_slot: Vec<Option<usize>> = vec![None; n];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut group_of = vec![0; n];

        // Ascending scan: groups come out ordered by smallest member and
        // each member list is already sorted.
        for i in 0..n {
            let root = self.sets.find(i);
            let g = match root_slot[root] {
                Some(g) => g,
                None => {
                    groups.push(Vec::new());
                    root_slot[root] = Some(groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[g].push(i);
            group_of[i] = g;
        }
        Grouping { groups, group_of }
    }
}

/// A partition of `0..n`: every index in exactly one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    groups: Vec<Vec<usize>>,
    group_of: Vec<usize>,
}

impl Grouping {
    /// Groups ordered by their smallest member, members ascending.
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn group_of(&self, i: usize) -> usize {
        self.group_of[i]
    }

    /// Sorted member tuple identifying the group of `i`. Two indices share a
    /// key iff they share a group.
    pub fn group_key(&self, i: usize) -> &[usize] {
        &self.groups[self.group_of[i]]
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
