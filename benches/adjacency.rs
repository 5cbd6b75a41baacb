//! Benchmark suite for the sorted adjacency store and the tables index
//!
//! Covers:
//! - Construction: sequential vs parallel table sort
//! - Queries: out_degree, outgoing_edges, vertex enumeration
//! - Tables: hop table computation, shard flush and load
//!
//! Run: cargo bench --bench adjacency

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use labelhop::graph::sorted::{par_sort_table, sort_table};
use labelhop::graph::{build_tables, hop_label_table, Edge, SortedMultigraph, Triple};
use labelhop::storage::{IndexConfig, TablesIndex};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pseudo-random edges over `vertices` ids with 16 labels.
fn make_edges(vertices: u64, edges: usize) -> Vec<Edge> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    (0..edges)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            Edge::new(state % vertices, (state >> 20) % vertices, (state >> 40) % 16)
        })
        .collect()
}

fn make_table(rows: usize) -> Vec<Triple> {
    make_edges(rows as u64 / 4 + 1, rows).into_iter().map(Edge::to_outgoing).collect()
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_table");

    for rows in [100_000, 1_000_000] {
        let table = make_table(rows);
        group.bench_with_input(BenchmarkId::new("sequential", rows), &rows, |b, _| {
            b.iter_batched(|| table.clone(), |mut t| sort_table(&mut t), BatchSize::LargeInput);
        });
        group.bench_with_input(BenchmarkId::new("parallel_8", rows), &rows, |b, _| {
            b.iter_batched(|| table.clone(), |mut t| par_sort_table(&mut t, 8), BatchSize::LargeInput);
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn bench_out_degree(c: &mut Criterion) {
    let mut group = c.benchmark_group("out_degree");

    for size in [10_000u64, 100_000, 1_000_000] {
        let graph = SortedMultigraph::from_edges(make_edges(size, size as usize * 5));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut v = 0u64;
            b.iter(|| {
                v = (v + 7919) % size;
                black_box(graph.out_degree(black_box(v)).ok());
            });
        });
    }

    group.finish();
}

fn bench_outgoing_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("outgoing_edges");

    for size in [10_000u64, 100_000] {
        let graph = SortedMultigraph::from_edges(make_edges(size, size as usize * 5));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(graph.outgoing_edges(black_box(42)).map(|e| e.label()).sum::<u64>());
            });
        });
    }

    group.finish();
}

fn bench_vertices(c: &mut Criterion) {
    let graph = SortedMultigraph::from_edges(make_edges(100_000, 500_000));

    c.bench_function("vertices_100k", |b| {
        b.iter(|| black_box(graph.vertices().count()));
    });
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn bench_hop_table(c: &mut Criterion) {
    let graph = SortedMultigraph::from_edges(make_edges(10_000, 50_000));

    c.bench_function("hop_label_table_k2", |b| {
        b.iter(|| black_box(hop_label_table(&graph, black_box(17), 2)));
    });
}

fn bench_flush_and_load(c: &mut Criterion) {
    let graph = SortedMultigraph::from_edges(make_edges(5_000, 20_000));
    let nodes: Vec<u64> = graph.vertices().take(500).collect();
    let tables = build_tables(&graph, &nodes, 2).unwrap();

    c.bench_function("store_500_nodes", |b| {
        b.iter_batched(
            || {
                let dir = TempDir::new().unwrap();
                let index = TablesIndex::open(IndexConfig::new(dir.path(), 2).loader_threads(4)).unwrap();
                (dir, index)
            },
            |(_dir, mut index)| black_box(index.store(&tables).unwrap()),
            BatchSize::PerIteration,
        );
    });

    let dir = TempDir::new().unwrap();
    let mut index = TablesIndex::open(IndexConfig::new(dir.path(), 2).loader_threads(4)).unwrap();
    index.store(&tables).unwrap();
    c.bench_function("load_500_nodes", |b| {
        b.iter(|| black_box(index.load(&nodes).unwrap().node_count()));
    });
}

criterion_group!(
    benches,
    bench_sort,
    bench_out_degree,
    bench_outgoing_edges,
    bench_vertices,
    bench_hop_table,
    bench_flush_and_load,
);
criterion_main!(benches);
