//! Per-node, per-hop-level label frequency index

pub mod neighbor_tables;

pub use neighbor_tables::NeighborTables;

use std::collections::HashMap;

/// Label → count for one hop level.
pub type LabelCounts = HashMap<u64, u32>;

/// One `LabelCounts` per hop level, level 0 first.
pub type NodeTable = Vec<LabelCounts>;
