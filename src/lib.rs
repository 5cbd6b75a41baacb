//! labelhop - sorted-array multigraph store with a sharded index of
//! hop-level label frequencies.
//!
//! - `graph`: immutable edge-labeled multigraph over two sorted triple
//!   tables, bulk-loaded from edge lists.
//! - `tables`: per-node, per-hop-level label counts, indexed by label.
//! - `storage`: file-sharded persistence of those tables with an optional
//!   read/write-through cache.

pub mod error;
pub mod graph;
pub mod storage;
pub mod tables;

pub use error::{GraphError, Result};
pub use graph::{Delimiter, Edge, GraphLoader, Multigraph, SortedMultigraph};
pub use storage::{FlushResult, IndexConfig, ShardScheme, TablesIndex};
pub use tables::{LabelCounts, NeighborTables, NodeTable};
