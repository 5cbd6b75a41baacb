//! Hop-level label counting over a multigraph.
//!
//! For a start node, level `l` of its table counts the labels of the edges
//! that first reach a vertex at hop distance `l + 1`, walking edges in both
//! directions. Edges between two vertices of the same frontier, or back
//! into already visited vertices, do not count.

use std::collections::HashSet;

use rayon::prelude::*;

use crate::error::Result;
use crate::graph::Multigraph;
use crate::tables::{LabelCounts, NeighborTables, NodeTable};

/// Per-level label counts of `node`'s neighbourhood up to `depth` hops.
///
/// Always returns exactly `depth` levels; a vertex absent from the graph
/// yields empty levels.
pub fn hop_label_table<G: Multigraph + ?Sized>(graph: &G, node: u64, depth: usize) -> NodeTable {
    let mut table: NodeTable = vec![LabelCounts::new(); depth];
    let mut visited: HashSet<u64> = HashSet::from([node]);
    let mut frontier: Vec<u64> = vec![node];

    for level in table.iter_mut() {
        if frontier.is_empty() {
            break;
        }
        let mut next: HashSet<u64> = HashSet::new();
        for &vertex in &frontier {
            let outgoing = graph.outgoing_of(vertex);
            let incoming = graph.incoming_of(vertex);
            let reached = outgoing
                .iter()
                .map(|e| (e.destination(), e.label()))
                .chain(incoming.iter().map(|e| (e.source(), e.label())));
            for (other, label) in reached {
                if visited.contains(&other) {
                    continue;
                }
                let count = level.entry(label).or_insert(0);
                *count = count.saturating_add(1);
                next.insert(other);
            }
        }
        visited.extend(next.iter().copied());
        frontier = next.into_iter().collect();
    }
    table
}

/// Compute hop tables for `nodes` in parallel and collect them into one
/// index. Runs on the current rayon pool.
pub fn build_tables<G: Multigraph + ?Sized>(
    graph: &G,
    nodes: &[u64],
    depth: usize,
) -> Result<NeighborTables> {
    let tables = nodes
        .par_iter()
        .try_fold(
            || NeighborTables::new(depth),
            |mut acc, &node| -> Result<NeighborTables> {
                acc.add_node_table(node, &hop_label_table(graph, node, depth))?;
                Ok(acc)
            },
        )
        .try_reduce(
            || NeighborTables::new(depth),
            |mut acc, other| -> Result<NeighborTables> {
                acc.merge(other)?;
                Ok(acc)
            },
        )?;
    tracing::debug!(
        "Built hop tables for {} of {} nodes at depth {}",
        tables.node_count(),
        nodes.len(),
        depth
    );
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, SortedMultigraph};

    // 1 -10-> 2 -10-> 3 -30-> 4
    // 1 -20-> 3
    fn chain() -> SortedMultigraph {
        SortedMultigraph::from_edges([
            Edge::new(1, 2, 10),
            Edge::new(2, 3, 10),
            Edge::new(1, 3, 20),
            Edge::new(3, 4, 30),
        ])
    }

    #[test]
    fn test_hop_table_levels() {
        let table = hop_label_table(&chain(), 1, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table[0], LabelCounts::from([(10, 1), (20, 1)]));
        // 2 -> 3 stays inside the first frontier; only 3 -> 4 reaches a new vertex.
        assert_eq!(table[1], LabelCounts::from([(30, 1)]));
    }

    #[test]
    fn test_hop_table_walks_incoming_edges() {
        let table = hop_label_table(&chain(), 4, 1);
        assert_eq!(table[0], LabelCounts::from([(30, 1)]));
    }

    #[test]
    fn test_hop_table_counts_parallel_edges() {
        let g = SortedMultigraph::from_edges([Edge::new(1, 2, 5), Edge::new(1, 2, 5), Edge::new(1, 2, 6)]);
        let table = hop_label_table(&g, 1, 1);
        assert_eq!(table[0], LabelCounts::from([(5, 2), (6, 1)]));
    }

    #[test]
    fn test_hop_table_unknown_vertex_is_empty() {
        let table = hop_label_table(&chain(), 99, 3);
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|level| level.is_empty()));
    }

    #[test]
    fn test_build_tables_matches_single_node_tables() {
        let g = chain();
        let nodes = [1, 2, 3, 4];
        let tables = build_tables(&g, &nodes, 2).unwrap();
        assert_eq!(tables.node_count(), 4);
        for node in nodes {
            let expected = hop_label_table(&g, node, 2);
            let got = tables.node_table(node).unwrap();
            for (level, counts) in expected.iter().enumerate() {
                for (label, count) in counts {
                    assert_eq!(got[level][label], *count);
                }
            }
        }
    }
}
