use std::collections::{BTreeSet, HashSet};

use labelhop::graph::sorted::{is_sorted_by_first, par_sort_table, sort_table};
use labelhop::graph::{Edge, SortedMultigraph};
use labelhop::storage::{decode_shard, encode_shard, ShardMap};
use labelhop::tables::{LabelCounts, NeighborTables, NodeTable};
use proptest::prelude::*;

const DEPTH: usize = 3;

fn arb_edges() -> impl Strategy<Value = Vec<Edge>> {
    prop::collection::vec((0u64..40, 0u64..40, 0u64..5), 0..200)
        .prop_map(|raw| raw.into_iter().map(Edge::from).collect())
}

fn arb_level() -> impl Strategy<Value = LabelCounts> {
    prop::collection::hash_map(0u64..20, 1u32..50, 0..6)
}

fn arb_node_table() -> impl Strategy<Value = NodeTable> {
    prop::collection::vec(arb_level(), DEPTH)
}

fn arb_tables() -> impl Strategy<Value = Vec<(u64, NodeTable)>> {
    prop::collection::vec((0u64..30, arb_node_table()), 0..20)
}

fn build(entries: &[(u64, NodeTable)]) -> NeighborTables {
    let mut tables = NeighborTables::new(DEPTH);
    for (node, table) in entries {
        tables.add_node_table(*node, table).unwrap();
    }
    tables
}

proptest! {
    #[test]
    fn prop_vertices_are_distinct_endpoints_ascending(edges in arb_edges()) {
        let graph = SortedMultigraph::from_edges(edges.iter().copied());
        let expected: BTreeSet<u64> = edges
            .iter()
            .flat_map(|e| [e.source(), e.destination()])
            .collect();
        let vertices: Vec<u64> = graph.vertices().collect();

        prop_assert_eq!(&vertices, &expected.into_iter().collect::<Vec<_>>());
        prop_assert_eq!(graph.vertex_count(), vertices.len());
    }

    #[test]
    fn prop_degrees_match_listings(edges in arb_edges()) {
        let graph = SortedMultigraph::from_edges(edges.iter().copied());
        let mut out_sum = 0;
        let mut in_sum = 0;
        for v in graph.vertices() {
            let out = graph.out_degree(v).unwrap();
            let inc = graph.in_degree(v).unwrap();
            prop_assert_eq!(out, graph.outgoing_edges(v).count());
            prop_assert_eq!(inc, graph.incoming_edges(v).count());
            prop_assert!(graph.outgoing_edges(v).all(|e| e.source() == v));
            prop_assert!(graph.incoming_edges(v).all(|e| e.destination() == v));
            out_sum += out;
            in_sum += inc;
        }
        prop_assert_eq!(out_sum, edges.len());
        prop_assert_eq!(in_sum, edges.len());
    }

    #[test]
    fn prop_edges_between_matches_filter(edges in arb_edges(), src in 0u64..40, dst in 0u64..40) {
        let graph = SortedMultigraph::from_edges(edges.iter().copied());
        let mut expected: Vec<Edge> = edges
            .iter()
            .copied()
            .filter(|e| e.source() == src && e.destination() == dst)
            .collect();
        let mut got = graph.edges_between(src, dst);
        expected.sort();
        got.sort();
        prop_assert_eq!(graph.contains_edge(src, dst), !expected.is_empty());
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_parallel_sort_matches_sequential(
        keys in prop::collection::vec(0u64..1000, 0..2000),
        chunks in 1usize..12,
    ) {
        let table: Vec<[u64; 3]> = keys.iter().enumerate().map(|(i, &k)| [k, i as u64, 0]).collect();
        let mut seq = table.clone();
        let mut par = table;
        sort_table(&mut seq);
        par_sort_table(&mut par, chunks);

        prop_assert!(is_sorted_by_first(&par));
        seq.sort();
        par.sort();
        prop_assert_eq!(seq, par);
    }

    #[test]
    fn prop_merge_keeps_max(a in arb_tables(), b in arb_tables()) {
        let left = build(&a);
        let right = build(&b);
        let mut merged = left.clone();
        merged.merge(right.clone()).unwrap();

        let nodes: HashSet<u64> = left.nodes().chain(right.nodes()).collect();
        prop_assert_eq!(merged.node_count(), nodes.len());
        for &node in &nodes {
            for level in 0..DEPTH {
                for label in 0u64..20 {
                    let l = left.count(node, label, level).unwrap().unwrap_or(0);
                    let r = right.count(node, label, level).unwrap().unwrap_or(0);
                    let m = merged.count(node, label, level).unwrap().unwrap_or(0);
                    prop_assert_eq!(m, l.max(r));
                }
            }
        }
        let none = HashSet::new();
        for label in 0u64..20 {
            for level in 0..DEPTH {
                let best = [&left, &right]
                    .iter()
                    .filter_map(|t| t.best_count(label, level, &none).unwrap())
                    .max();
                prop_assert_eq!(merged.best_count(label, level, &none).unwrap(), best);
            }
        }
    }

    #[test]
    fn prop_shard_codec_round_trip(entries in arb_tables()) {
        let shard: ShardMap = build(&entries).to_node_tables();
        let bytes = encode_shard(DEPTH, &shard).unwrap();
        let (depth, decoded) = decode_shard(&bytes).unwrap();
        prop_assert_eq!(depth, DEPTH);
        prop_assert_eq!(decoded, shard);
    }
}
