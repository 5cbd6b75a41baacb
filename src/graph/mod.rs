//! Sorted-array adjacency store and its read API

pub mod edge;
pub mod loader;
pub mod multigraph;
pub mod sorted;
pub mod traversal;

pub use edge::{Edge, Triple};
pub use loader::{parse_edge_list, read_edge_file, Delimiter, GraphLoader};
pub use multigraph::{EdgeIter, SortedMultigraph, Vertices};
pub use traversal::{build_tables, hop_label_table};

use std::collections::BTreeSet;

use crate::error::Result;

/// Read interface of an edge-labeled directed multigraph.
///
/// Send + Sync so a graph can be shared by reference across rayon workers.
/// Mutators exist for API completeness; the sorted store rejects them.
pub trait Multigraph: Send + Sync {
    // === SIZE ===

    fn vertex_count(&self) -> usize;

    fn edge_count(&self) -> usize;

    // === VERTICES ===

    fn contains_vertex(&self, vertex: u64) -> bool;

    /// Every vertex id once, ascending
    fn vertex_ids(&self) -> Vec<u64>;

    /// Number of edges entering `vertex`; fails for a vertex never seen
    fn in_degree(&self, vertex: u64) -> Result<usize>;

    /// Number of edges leaving `vertex`; fails for a vertex never seen
    fn out_degree(&self, vertex: u64) -> Result<usize>;

    fn degree(&self, vertex: u64) -> Result<usize> {
        Ok(self.in_degree(vertex)? + self.out_degree(vertex)?)
    }

    // === EDGES ===

    fn incoming_of(&self, vertex: u64) -> Vec<Edge>;

    fn outgoing_of(&self, vertex: u64) -> Vec<Edge>;

    fn edges_between(&self, src: u64, dst: u64) -> Vec<Edge>;

    fn contains_edge(&self, src: u64, dst: u64) -> bool {
        !self.edges_between(src, dst).is_empty()
    }

    fn label_set(&self) -> BTreeSet<u64>;

    // === MUTATION ===

    fn add_vertex(&mut self, vertex: u64) -> Result<()>;

    fn add_edge(&mut self, edge: Edge) -> Result<()>;

    fn remove_vertex(&mut self, vertex: u64) -> Result<()>;

    fn remove_edge(&mut self, edge: Edge) -> Result<()>;
}
