//! NeighborTables - inverted label index of hop-level frequencies.
//!
//! Storage is label-major:
//!
//! ```text
//! label -> [level 0: {node -> count}, level 1: {node -> count}, ...]
//! ```
//!
//! which makes "best node for (label, level)" a scan of one map. The
//! node-major view (`node_table`) is rebuilt on read. Only positive counts
//! are stored; a missing entry and a zero count mean the same thing.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use crate::error::{GraphError, Result};
use crate::tables::{LabelCounts, NodeTable};

type LevelNodes = Vec<HashMap<u64, u32>>;

#[derive(Debug, Clone)]
pub struct NeighborTables {
    depth: usize,
    label_index: HashMap<u64, LevelNodes>,
    nodes: HashSet<u64>,
}

impl NeighborTables {
    /// Create an empty index for `depth` hop levels.
    ///
    /// # Panics
    /// Panics if `depth` is 0.
    pub fn new(depth: usize) -> Self {
        assert!(depth > 0, "depth must be > 0");
        Self {
            depth,
            label_index: HashMap::new(),
            nodes: HashSet::new(),
        }
    }

    /// Number of hop levels (k).
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn label_count(&self) -> usize {
        self.label_index.len()
    }

    pub fn contains(&self, node: u64) -> bool {
        self.nodes.contains(&node)
    }

    /// Nodes with at least one positive count, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = u64> + '_ {
        self.nodes.iter().copied()
    }

    /// Labels recorded for any node, in no particular order.
    pub fn labels(&self) -> impl Iterator<Item = u64> + '_ {
        self.label_index.keys().copied()
    }

    fn check_level(&self, level: usize) -> Result<()> {
        if level >= self.depth {
            return Err(GraphError::LevelOutOfBounds {
                level,
                depth: self.depth,
            });
        }
        Ok(())
    }

    fn level_nodes(&self, label: u64, level: usize) -> Result<Option<&HashMap<u64, u32>>> {
        self.check_level(level)?;
        Ok(self.label_index.get(&label).map(|levels| &levels[level]))
    }

    // ── Recording ──────────────────────────────────────────────────

    /// Record `node`'s label counts at one level. Existing counts for the
    /// same (label, level, node) are replaced; zero counts are dropped.
    pub fn add_node_level_table(&mut self, node: u64, level: usize, counts: &LabelCounts) -> Result<()> {
        self.check_level(level)?;
        let depth = self.depth;
        for (&label, &count) in counts {
            if count == 0 {
                continue;
            }
            self.label_index
                .entry(label)
                .or_insert_with(|| vec![HashMap::new(); depth])[level]
                .insert(node, count);
            self.nodes.insert(node);
        }
        Ok(())
    }

    /// Record a full per-level table. Fails without writing anything if
    /// the table has more levels than the index depth.
    pub fn add_node_table(&mut self, node: u64, table: &[LabelCounts]) -> Result<()> {
        if table.len() > self.depth {
            return Err(GraphError::LevelOutOfBounds {
                level: table.len() - 1,
                depth: self.depth,
            });
        }
        for (level, counts) in table.iter().enumerate() {
            self.add_node_level_table(node, level, counts)?;
        }
        Ok(())
    }

    /// Like `add_node_table`, but keeps the larger count when `node`
    /// already has one for the same label and level.
    pub fn merge_node_table(&mut self, node: u64, table: &[LabelCounts]) -> Result<()> {
        if table.len() > self.depth {
            return Err(GraphError::LevelOutOfBounds {
                level: table.len() - 1,
                depth: self.depth,
            });
        }
        let depth = self.depth;
        for (level, counts) in table.iter().enumerate() {
            for (&label, &count) in counts.iter().filter(|(_, &c)| c > 0) {
                let slot = self
                    .label_index
                    .entry(label)
                    .or_insert_with(|| vec![HashMap::new(); depth])[level]
                    .entry(node)
                    .or_insert(0);
                *slot = (*slot).max(count);
                self.nodes.insert(node);
            }
        }
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Per-level counts of `node` for every known label, zeros included.
    ///
    /// `None` if the node was never recorded with a positive count.
    pub fn node_table(&self, node: u64) -> Option<NodeTable> {
        if !self.nodes.contains(&node) {
            return None;
        }
        let mut table: NodeTable = vec![LabelCounts::with_capacity(self.label_index.len()); self.depth];
        for (&label, levels) in &self.label_index {
            for (level, node_counts) in levels.iter().enumerate() {
                table[level].insert(label, node_counts.get(&node).copied().unwrap_or(0));
            }
        }
        Some(table)
    }

    /// Count of `label` at `level` for `node`, `None` when absent.
    pub fn count(&self, node: u64, label: u64, level: usize) -> Result<Option<u32>> {
        Ok(self
            .level_nodes(label, level)?
            .and_then(|nodes| nodes.get(&node).copied()))
    }

    /// Nodes holding a positive count for `label` at `level`.
    pub fn label_nodes(&self, label: u64, level: usize) -> Result<BTreeSet<u64>> {
        Ok(self
            .level_nodes(label, level)?
            .map(|nodes| nodes.keys().copied().collect())
            .unwrap_or_default())
    }

    /// Node with the highest count for `label` at `level`, skipping
    /// `exclude`. Ties go to the smallest node id.
    pub fn best_node(&self, label: u64, level: usize, exclude: &HashSet<u64>) -> Result<Option<(u64, u32)>> {
        let Some(nodes) = self.level_nodes(label, level)? else {
            return Ok(None);
        };
        Ok(nodes
            .iter()
            .filter(|(node, _)| !exclude.contains(*node))
            .map(|(&node, &count)| (node, count))
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0))))
    }

    /// Highest count for `label` at `level` among non-excluded nodes.
    pub fn best_count(&self, label: u64, level: usize, exclude: &HashSet<u64>) -> Result<Option<u32>> {
        Ok(self.best_node(label, level, exclude)?.map(|(_, count)| count))
    }

    /// Pivot the whole index to node-major form in one pass. Levels hold
    /// only positive counts.
    pub fn to_node_tables(&self) -> BTreeMap<u64, NodeTable> {
        let mut out: BTreeMap<u64, NodeTable> = BTreeMap::new();
        for (&label, levels) in &self.label_index {
            for (level, node_counts) in levels.iter().enumerate() {
                for (&node, &count) in node_counts {
                    out.entry(node)
                        .or_insert_with(|| vec![LabelCounts::new(); self.depth])[level]
                        .insert(label, count);
                }
            }
        }
        out
    }

    // ── Merge ──────────────────────────────────────────────────────

    /// Fold `other` into `self`, keeping the larger count on collision.
    ///
    /// `other` is consumed: labels unknown to `self` take over its level
    /// maps without copying.
    pub fn merge(&mut self, other: NeighborTables) -> Result<()> {
        if other.depth != self.depth {
            return Err(GraphError::DepthMismatch {
                expected: self.depth,
                found: other.depth,
            });
        }
        for (label, levels) in other.label_index {
            match self.label_index.entry(label) {
                Entry::Vacant(slot) => {
                    slot.insert(levels);
                }
                Entry::Occupied(mut slot) => {
                    for (mine, theirs) in slot.get_mut().iter_mut().zip(levels) {
                        for (node, count) in theirs {
                            let c = mine.entry(node).or_insert(0);
                            *c = (*c).max(count);
                        }
                    }
                }
            }
        }
        self.nodes.extend(other.nodes);
        Ok(())
    }
}

impl fmt::Display for NeighborTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (node, table) in self.to_node_tables() {
            writeln!(f, "Node: {node}")?;
            for (level, counts) in table.iter().enumerate() {
                let sorted: BTreeMap<_, _> = counts.iter().collect();
                write!(f, "[{}] {{", level + 1)?;
                for (label, count) in sorted {
                    write!(f, "({label},{count})")?;
                }
                writeln!(f, "}}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(u64, u32)]) -> LabelCounts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_zero_counts_are_not_stored() {
        let mut t = NeighborTables::new(2);
        t.add_node_level_table(100, 0, &counts(&[(10, 3)])).unwrap();
        t.add_node_level_table(100, 1, &counts(&[(10, 0), (20, 5)])).unwrap();

        assert_eq!(t.label_nodes(10, 0).unwrap(), BTreeSet::from([100]));
        assert!(t.label_nodes(10, 1).unwrap().is_empty());
        assert_eq!(t.label_nodes(20, 1).unwrap(), BTreeSet::from([100]));
        assert_eq!(t.count(100, 10, 1).unwrap(), None);
        assert_eq!(t.count(100, 20, 1).unwrap(), Some(5));

        let table = t.node_table(100).unwrap();
        assert_eq!(table[0], counts(&[(10, 3), (20, 0)]));
        assert_eq!(table[1], counts(&[(10, 0), (20, 5)]));
    }

    #[test]
    fn test_all_zero_node_is_absent() {
        let mut t = NeighborTables::new(1);
        t.add_node_level_table(7, 0, &counts(&[(1, 0)])).unwrap();
        assert!(!t.contains(7));
        assert!(t.node_table(7).is_none());
        assert!(t.is_empty());
    }

    #[test]
    fn test_level_out_of_bounds_on_every_path() {
        let mut t = NeighborTables::new(2);
        t.add_node_level_table(1, 0, &counts(&[(10, 1)])).unwrap();
        let none = HashSet::new();

        let is_bounds = |e: GraphError| matches!(e, GraphError::LevelOutOfBounds { level: 2, depth: 2 });
        assert!(is_bounds(t.add_node_level_table(1, 2, &counts(&[(10, 1)])).unwrap_err()));
        assert!(is_bounds(t.count(1, 10, 2).unwrap_err()));
        assert!(is_bounds(t.label_nodes(10, 2).unwrap_err()));
        assert!(is_bounds(t.best_node(10, 2, &none).unwrap_err()));
        assert!(is_bounds(t.best_count(99, 2, &none).unwrap_err()));
        assert!(is_bounds(
            t.add_node_table(1, &[LabelCounts::new(), LabelCounts::new(), LabelCounts::new()])
                .unwrap_err()
        ));
    }

    #[test]
    fn test_unknown_label_is_absent_not_error() {
        let t = NeighborTables::new(3);
        assert_eq!(t.best_count(5, 0, &HashSet::new()).unwrap(), None);
        assert!(t.label_nodes(5, 2).unwrap().is_empty());
        assert_eq!(t.count(1, 5, 1).unwrap(), None);
    }

    #[test]
    fn test_best_node_respects_exclusion_and_ties() {
        let mut t = NeighborTables::new(1);
        t.add_node_level_table(1, 0, &counts(&[(10, 4)])).unwrap();
        t.add_node_level_table(2, 0, &counts(&[(10, 9)])).unwrap();
        t.add_node_level_table(3, 0, &counts(&[(10, 4)])).unwrap();

        assert_eq!(t.best_node(10, 0, &HashSet::new()).unwrap(), Some((2, 9)));
        let skip = HashSet::from([2]);
        assert_eq!(t.best_node(10, 0, &skip).unwrap(), Some((1, 4)));
        let skip_all = HashSet::from([1, 2, 3]);
        assert_eq!(t.best_count(10, 0, &skip_all).unwrap(), None);
    }

    #[test]
    fn test_record_overwrites_previous_count() {
        let mut t = NeighborTables::new(1);
        t.add_node_level_table(1, 0, &counts(&[(10, 8)])).unwrap();
        t.add_node_level_table(1, 0, &counts(&[(10, 2)])).unwrap();
        assert_eq!(t.count(1, 10, 0).unwrap(), Some(2));
    }

    #[test]
    fn test_merge_node_table_keeps_max() {
        let mut t = NeighborTables::new(1);
        t.add_node_level_table(1, 0, &counts(&[(10, 8)])).unwrap();
        t.merge_node_table(1, &[counts(&[(10, 2), (11, 1)])]).unwrap();
        assert_eq!(t.count(1, 10, 0).unwrap(), Some(8));
        assert_eq!(t.count(1, 11, 0).unwrap(), Some(1));
    }

    #[test]
    fn test_merge_keeps_max_and_unions_nodes() {
        let mut a = NeighborTables::new(2);
        a.add_node_table(1, &[counts(&[(10, 3)]), counts(&[(20, 1)])]).unwrap();
        a.add_node_table(2, &[counts(&[(10, 7)])]).unwrap();

        let mut b = NeighborTables::new(2);
        b.add_node_table(1, &[counts(&[(10, 5)]), counts(&[(20, 0)])]).unwrap();
        b.add_node_table(2, &[counts(&[(10, 2)])]).unwrap();
        b.add_node_table(3, &[counts(&[(30, 4)])]).unwrap();

        a.merge(b).unwrap();
        assert_eq!(a.count(1, 10, 0).unwrap(), Some(5));
        assert_eq!(a.count(2, 10, 0).unwrap(), Some(7));
        assert_eq!(a.count(1, 20, 1).unwrap(), Some(1));
        assert_eq!(a.count(3, 30, 0).unwrap(), Some(4));
        assert_eq!(a.node_count(), 3);
        assert_eq!(a.best_count(10, 0, &HashSet::new()).unwrap(), Some(7));
    }

    #[test]
    fn test_merge_rejects_depth_mismatch() {
        let mut a = NeighborTables::new(2);
        let err = a.merge(NeighborTables::new(3)).unwrap_err();
        assert!(matches!(err, GraphError::DepthMismatch { expected: 2, found: 3 }));
    }

    #[test]
    fn test_to_node_tables_is_sparse() {
        let mut t = NeighborTables::new(2);
        t.add_node_table(1, &[counts(&[(10, 3)]), counts(&[(20, 5)])]).unwrap();
        t.add_node_table(2, &[counts(&[(20, 1)])]).unwrap();

        let pivot = t.to_node_tables();
        assert_eq!(pivot.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(pivot[&1], vec![counts(&[(10, 3)]), counts(&[(20, 5)])]);
        assert_eq!(pivot[&2], vec![counts(&[(20, 1)]), LabelCounts::new()]);
    }

    #[test]
    fn test_display() {
        let mut t = NeighborTables::new(2);
        t.add_node_table(4, &[counts(&[(2, 1), (1, 3)])]).unwrap();
        assert_eq!(t.to_string(), "Node: 4\n[1] {(1,3)(2,1)}\n[2] {}\n");
    }

    #[test]
    #[should_panic(expected = "depth must be > 0")]
    fn test_zero_depth_panics() {
        NeighborTables::new(0);
    }
}
