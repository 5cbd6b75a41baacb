//! Immutable directed multigraph over two sorted triple tables.
//!
//! ```text
//! outgoing: [src, dst, label]   sorted by src
//! incoming: [dst, src, label]   sorted by dst
//! ```
//!
//! Both tables hold the same multiset of edges; parallel edges are kept.
//! Neighbor lookups are two binary searches into the relevant table and
//! return a borrowed slice, so there is no per-vertex allocation at all.
//! The graph never changes after construction, so any number of threads
//! may query it without locking.

use std::collections::{BTreeSet, HashSet};
use std::iter::FusedIterator;
use std::sync::OnceLock;

use crate::error::{GraphError, Result};
use crate::graph::edge::{Edge, Triple};
use crate::graph::sorted::{bounds_of, contains_key, is_sorted_by_first, run_end, sort_table};
use crate::graph::Multigraph;

// ── Iterators ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outgoing,
    Incoming,
}

/// Single-pass iterator over a run of adjacency rows, yielding `Edge`s
/// with source and destination restored.
#[derive(Debug)]
pub struct EdgeIter<'a> {
    rows: std::slice::Iter<'a, Triple>,
    direction: Direction,
}

impl<'a> EdgeIter<'a> {
    fn new(rows: &'a [Triple], direction: Direction) -> Self {
        Self {
            rows: rows.iter(),
            direction,
        }
    }
}

impl Iterator for EdgeIter<'_> {
    type Item = Edge;

    #[inline]
    fn next(&mut self) -> Option<Edge> {
        let row = self.rows.next()?;
        Some(match self.direction {
            Direction::Outgoing => Edge::from_outgoing(row),
            Direction::Incoming => Edge::from_incoming(row),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for EdgeIter<'_> {}
impl FusedIterator for EdgeIter<'_> {}

/// Ascending, duplicate-free walk over every vertex id, merging the first
/// columns of both tables. Vertices present in only one direction are
/// included.
#[derive(Debug)]
pub struct Vertices<'a> {
    outgoing: &'a [Triple],
    incoming: &'a [Triple],
    out_pos: usize,
    in_pos: usize,
}

impl Iterator for Vertices<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let next_out = self.outgoing.get(self.out_pos).map(|row| row[0]);
        let next_in = self.incoming.get(self.in_pos).map(|row| row[0]);
        let vertex = match (next_out, next_in) {
            (None, None) => return None,
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (Some(a), Some(b)) => a.min(b),
        };
        if next_out == Some(vertex) {
            self.out_pos = run_end(self.outgoing, self.out_pos);
        }
        if next_in == Some(vertex) {
            self.in_pos = run_end(self.incoming, self.in_pos);
        }
        Some(vertex)
    }
}

impl FusedIterator for Vertices<'_> {}

// ── SortedMultigraph ───────────────────────────────────────────────

/// Read-only edge-labeled multigraph backed by sorted arrays.
///
/// Build it with [`GraphLoader`](crate::graph::GraphLoader) from edge-list
/// files, or with [`from_edges`](Self::from_edges) / [`from_tables`](Self::from_tables)
/// from memory.
#[derive(Debug)]
pub struct SortedMultigraph {
    outgoing: Vec<Triple>,
    incoming: Vec<Triple>,
    label_set: OnceLock<BTreeSet<u64>>,
    vertex_count: OnceLock<usize>,
}

// -- Constructors -------------------------------------------------------------

impl SortedMultigraph {
    /// Seal two tables that are already sorted by first column.
    pub(crate) fn from_sorted(outgoing: Vec<Triple>, incoming: Vec<Triple>) -> Self {
        debug_assert!(is_sorted_by_first(&outgoing));
        debug_assert!(is_sorted_by_first(&incoming));
        debug_assert_eq!(outgoing.len(), incoming.len());
        Self {
            outgoing,
            incoming,
            label_set: OnceLock::new(),
            vertex_count: OnceLock::new(),
        }
    }

    /// Build from an outgoing table `[src, dst, label]` and an incoming
    /// table `[dst, src, label]`, sorting both.
    pub fn from_tables(mut outgoing: Vec<Triple>, mut incoming: Vec<Triple>) -> Result<Self> {
        if outgoing.len() != incoming.len() {
            return Err(GraphError::DirectionMismatch {
                outgoing: outgoing.len(),
                incoming: incoming.len(),
            });
        }
        sort_table(&mut outgoing);
        sort_table(&mut incoming);
        Ok(Self::from_sorted(outgoing, incoming))
    }

    /// Build from in-memory edges. Duplicates are kept.
    pub fn from_edges<I: IntoIterator<Item = Edge>>(edges: I) -> Self {
        let mut outgoing: Vec<Triple> = edges.into_iter().map(Edge::to_outgoing).collect();
        let mut incoming: Vec<Triple> = outgoing.iter().map(|r| [r[1], r[0], r[2]]).collect();
        sort_table(&mut outgoing);
        sort_table(&mut incoming);
        Self::from_sorted(outgoing, incoming)
    }
}

// -- Queries ------------------------------------------------------------------

impl SortedMultigraph {
    /// Raw outgoing table, sorted by source.
    pub fn outgoing_table(&self) -> &[Triple] {
        &self.outgoing
    }

    /// Raw incoming table `[dst, src, label]`, sorted by destination.
    pub fn incoming_table(&self) -> &[Triple] {
        &self.incoming
    }

    /// Total number of edges, parallel edges included.
    pub fn edge_count(&self) -> usize {
        self.outgoing.len()
    }

    /// Number of distinct vertex ids. Computed once, then cached.
    pub fn vertex_count(&self) -> usize {
        *self.vertex_count.get_or_init(|| self.vertices().count())
    }

    pub fn contains_vertex(&self, vertex: u64) -> bool {
        contains_key(&self.outgoing, vertex) || contains_key(&self.incoming, vertex)
    }

    /// Outgoing rows `[src, dst, label]` of `vertex`; empty if none.
    pub fn outgoing_rows(&self, vertex: u64) -> &[Triple] {
        match bounds_of(&self.outgoing, vertex) {
            Some(range) => &self.outgoing[range],
            None => &[],
        }
    }

    /// Incoming rows `[dst, src, label]` of `vertex`; empty if none.
    pub fn incoming_rows(&self, vertex: u64) -> &[Triple] {
        match bounds_of(&self.incoming, vertex) {
            Some(range) => &self.incoming[range],
            None => &[],
        }
    }

    /// Number of edges leaving `vertex`.
    ///
    /// Returns `UnknownVertex` if `vertex` appears nowhere in the graph;
    /// a known vertex without outgoing edges has out-degree 0.
    pub fn out_degree(&self, vertex: u64) -> Result<usize> {
        match bounds_of(&self.outgoing, vertex) {
            Some(range) => Ok(range.len()),
            None if contains_key(&self.incoming, vertex) => Ok(0),
            None => Err(GraphError::UnknownVertex(vertex)),
        }
    }

    /// Number of edges entering `vertex`. Same failure rule as `out_degree`.
    pub fn in_degree(&self, vertex: u64) -> Result<usize> {
        match bounds_of(&self.incoming, vertex) {
            Some(range) => Ok(range.len()),
            None if contains_key(&self.outgoing, vertex) => Ok(0),
            None => Err(GraphError::UnknownVertex(vertex)),
        }
    }

    /// In-degree plus out-degree.
    pub fn degree(&self, vertex: u64) -> Result<usize> {
        Ok(self.in_degree(vertex)? + self.out_degree(vertex)?)
    }

    pub fn outgoing_edges(&self, vertex: u64) -> EdgeIter<'_> {
        EdgeIter::new(self.outgoing_rows(vertex), Direction::Outgoing)
    }

    pub fn incoming_edges(&self, vertex: u64) -> EdgeIter<'_> {
        EdgeIter::new(self.incoming_rows(vertex), Direction::Incoming)
    }

    /// Incoming edges followed by outgoing edges. A self-loop shows up twice.
    pub fn edges_of(&self, vertex: u64) -> Vec<Edge> {
        self.incoming_edges(vertex)
            .chain(self.outgoing_edges(vertex))
            .collect()
    }

    /// Distinct vertices adjacent to `vertex` in either direction.
    pub fn neighbors(&self, vertex: u64) -> BTreeSet<u64> {
        self.outgoing_rows(vertex)
            .iter()
            .chain(self.incoming_rows(vertex))
            .map(|row| row[1])
            .collect()
    }

    /// All edges from `src` to `dst`, one per label (and per duplicate).
    pub fn edges_between(&self, src: u64, dst: u64) -> Vec<Edge> {
        if !contains_key(&self.incoming, dst) {
            return Vec::new();
        }
        self.outgoing_edges(src)
            .filter(|edge| edge.destination() == dst)
            .collect()
    }

    pub fn contains_edge(&self, src: u64, dst: u64) -> bool {
        contains_key(&self.incoming, dst) && self.outgoing_rows(src).iter().any(|row| row[1] == dst)
    }

    /// Every vertex id exactly once, ascending.
    pub fn vertices(&self) -> Vertices<'_> {
        Vertices {
            outgoing: &self.outgoing,
            incoming: &self.incoming,
            out_pos: 0,
            in_pos: 0,
        }
    }

    /// Every edge, in source order.
    pub fn edges(&self) -> EdgeIter<'_> {
        EdgeIter::new(&self.outgoing, Direction::Outgoing)
    }

    /// Edges whose label is in `labels`, in source order.
    pub fn labeled_edges<'a>(&'a self, labels: &'a HashSet<u64>) -> impl Iterator<Item = Edge> + 'a {
        self.edges().filter(move |edge| labels.contains(&edge.label()))
    }

    /// Distinct labels. Computed on first call, then cached.
    pub fn label_set(&self) -> &BTreeSet<u64> {
        self.label_set
            .get_or_init(|| self.outgoing.iter().map(|row| row[2]).collect())
    }
}

// ── Multigraph impl ────────────────────────────────────────────────

impl Multigraph for SortedMultigraph {
    fn vertex_count(&self) -> usize {
        SortedMultigraph::vertex_count(self)
    }

    fn edge_count(&self) -> usize {
        SortedMultigraph::edge_count(self)
    }

    fn contains_vertex(&self, vertex: u64) -> bool {
        SortedMultigraph::contains_vertex(self, vertex)
    }

    fn in_degree(&self, vertex: u64) -> Result<usize> {
        SortedMultigraph::in_degree(self, vertex)
    }

    fn out_degree(&self, vertex: u64) -> Result<usize> {
        SortedMultigraph::out_degree(self, vertex)
    }

    fn incoming_of(&self, vertex: u64) -> Vec<Edge> {
        self.incoming_edges(vertex).collect()
    }

    fn outgoing_of(&self, vertex: u64) -> Vec<Edge> {
        self.outgoing_edges(vertex).collect()
    }

    fn edges_between(&self, src: u64, dst: u64) -> Vec<Edge> {
        SortedMultigraph::edges_between(self, src, dst)
    }

    fn contains_edge(&self, src: u64, dst: u64) -> bool {
        SortedMultigraph::contains_edge(self, src, dst)
    }

    fn label_set(&self) -> BTreeSet<u64> {
        SortedMultigraph::label_set(self).clone()
    }

    fn vertex_ids(&self) -> Vec<u64> {
        self.vertices().collect()
    }

    fn add_vertex(&mut self, _vertex: u64) -> Result<()> {
        Err(GraphError::Immutable("add_vertex"))
    }

    fn add_edge(&mut self, _edge: Edge) -> Result<()> {
        Err(GraphError::Immutable("add_edge"))
    }

    fn remove_vertex(&mut self, _vertex: u64) -> Result<()> {
        Err(GraphError::Immutable("remove_vertex"))
    }

    fn remove_edge(&mut self, _edge: Edge) -> Result<()> {
        Err(GraphError::Immutable("remove_edge"))
    }
}
