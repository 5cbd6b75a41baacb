//! Sharded on-disk persistence for neighbor tables.
//!
//! Node tables are routed to shard files by a deterministic key derived
//! from the node id, written in an explicit little-endian format, and
//! merged back into a `NeighborTables` on load.

pub mod config;
pub mod format;
pub mod resource;
pub mod shard;
pub mod shard_planner;
pub mod tables_index;

use std::collections::BTreeMap;

use crate::tables::NodeTable;

/// Contents of one shard file: node id -> per-level label counts.
pub type ShardMap = BTreeMap<u64, NodeTable>;

pub use config::{IndexConfig, ShardLayout, ShardScheme, LAYOUT_FILE};
pub use format::{decode_shard, encode_shard, ShardHeader, SHARD_MAGIC};
pub use resource::{ResourceManager, SystemResources, TuningProfile};
pub use shard::{merge_max, read_shard, write_shard};
pub use shard_planner::ShardPlanner;
pub use tables_index::{FlushResult, TablesIndex};
