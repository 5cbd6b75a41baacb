//! graph_stats: load an edge list and print adjacency statistics.
//!
//! Optionally computes hop-level label tables for the first vertices and
//! flushes them to a shard index.
//!
//! Run: cargo run --release --bin graph_stats -- edges.txt --depth 2 --index ./idx

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use labelhop::graph::build_tables;
use labelhop::{Delimiter, GraphLoader, IndexConfig, TablesIndex};

const USAGE: &str = "\
Usage: graph_stats <edges> [options]

Arguments:
  <edges>              Edge list, one `source dest label` per line

Options:
  --incoming <file>    Second edge list holding the same edges (parsed concurrently)
  --delimiter <d>      auto | space | tab (default: auto)
  --edges <n>          Edges per direction; skips the line-count pass
  --threads <n>        Sort threads (default: tuned from the host)
  --depth <k>          Compute hop tables with k levels
  --nodes <n>          Vertices to compute tables for (default: 1000)
  --index <dir>        Flush computed tables to this index directory
  -v, --verbose        Debug logging";

struct Args {
    edges: PathBuf,
    incoming: Option<PathBuf>,
    delimiter: Delimiter,
    edge_count: Option<usize>,
    threads: Option<usize>,
    depth: Option<usize>,
    nodes: usize,
    index: Option<PathBuf>,
    verbose: bool,
}

fn value<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
}

fn number(args: &[String], flag: &str) -> Result<Option<usize>> {
    value(args, flag)
        .map(|v| v.parse::<usize>().with_context(|| format!("{flag} expects a number, got '{v}'")))
        .transpose()
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") || args.len() < 2 {
        println!("{USAGE}");
        std::process::exit(if args.len() < 2 { 1 } else { 0 });
    }
    if args[1].starts_with('-') {
        bail!("first argument must be the edge list, got flag '{}'", args[1]);
    }

    let delimiter = match value(&args, "--delimiter").map(String::as_str) {
        None | Some("auto") => Delimiter::Auto,
        Some("space") => Delimiter::Space,
        Some("tab") => Delimiter::Tab,
        Some(other) => bail!("unknown delimiter '{other}'"),
    };

    Ok(Args {
        edges: PathBuf::from(&args[1]),
        incoming: value(&args, "--incoming").map(PathBuf::from),
        delimiter,
        edge_count: number(&args, "--edges")?,
        threads: number(&args, "--threads")?,
        depth: number(&args, "--depth")?,
        nodes: number(&args, "--nodes")?.unwrap_or(1000),
        index: value(&args, "--index").map(PathBuf::from),
        verbose: args.iter().any(|a| a == "-v" || a == "--verbose"),
    })
}

fn main() -> Result<()> {
    let args = parse_args()?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut loader = GraphLoader::new().delimiter(args.delimiter);
    if let Some(n) = args.edge_count {
        loader = loader.edges(n);
    }
    if let Some(n) = args.threads {
        loader = loader.sort_threads(n);
    }

    let start = Instant::now();
    let graph = match &args.incoming {
        Some(incoming) => loader.load_pair(incoming, &args.edges),
        None => loader.load(&args.edges),
    }
    .with_context(|| format!("loading {}", args.edges.display()))?;
    let load_time = start.elapsed();

    let vertices = graph.vertex_count();
    let max_out = graph
        .vertices()
        .map(|v| graph.outgoing_rows(v).len())
        .max()
        .unwrap_or(0);

    println!("edges:      {}", graph.edge_count());
    println!("vertices:   {}", vertices);
    println!("labels:     {}", graph.label_set().len());
    println!("max out:    {}", max_out);
    if vertices > 0 {
        println!("avg degree: {:.2}", graph.edge_count() as f64 / vertices as f64);
    }
    println!("load time:  {:?}", load_time);

    let Some(depth) = args.depth else {
        return Ok(());
    };
    if depth == 0 {
        bail!("--depth must be > 0");
    }

    let nodes: Vec<u64> = graph.vertices().take(args.nodes).collect();
    let start = Instant::now();
    let tables = build_tables(&graph, &nodes, depth)?;
    println!("tables:     {} nodes, {} labels in {:?}", tables.node_count(), tables.label_count(), start.elapsed());

    if let Some(dir) = &args.index {
        let mut index = TablesIndex::open(IndexConfig::new(dir, depth))
            .with_context(|| format!("opening index {}", dir.display()))?;
        let flushed = index.store(&tables)?;
        println!(
            "flushed:    {} nodes into {} shards ({} new)",
            flushed.nodes_written, flushed.shards_written, flushed.new_files
        );
    }
    Ok(())
}
