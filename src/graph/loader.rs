//! Edge-list parsing and bulk construction of `SortedMultigraph`.
//!
//! Input is plain text, one edge per line: `source dest label`, three
//! unsigned integers separated by spaces or tabs. Lines starting with `#`
//! are comments, blank lines are skipped. Any other malformed line aborts
//! the whole load with its 1-based line number and raw content.
//!
//! Construction is bulk-only: parse everything, sort both direction tables,
//! then hand out a read-only graph. There is no incremental API.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{GraphError, Result};
use crate::graph::edge::Triple;
use crate::graph::multigraph::SortedMultigraph;
use crate::graph::sorted::{count_lines, par_sort_table, sort_table, swap_columns};
use crate::storage::resource::ResourceManager;

/// Lines between progress log messages on very large inputs.
const PROGRESS_EVERY: usize = 50_000_000;

/// Read buffer for edge-list files.
const READ_BUFFER_SIZE: usize = 1 << 20;

// ── Delimiter ──────────────────────────────────────────────────────

/// Token separator for edge-list lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delimiter {
    /// Detect from the first data line: space if it yields three tokens,
    /// tab otherwise.
    #[default]
    Auto,
    Space,
    Tab,
}

impl Delimiter {
    fn separator(self) -> Option<char> {
        match self {
            Delimiter::Auto => None,
            Delimiter::Space => Some(' '),
            Delimiter::Tab => Some('\t'),
        }
    }

    fn detect(line: &str) -> Self {
        if line.split(' ').filter(|t| !t.trim().is_empty()).count() >= 3 {
            Delimiter::Space
        } else {
            Delimiter::Tab
        }
    }
}

// ── Parsing ────────────────────────────────────────────────────────

/// Parse an edge list into outgoing-form rows `[src, dst, label]`.
///
/// `capacity` pre-sizes the table; it is a hint, not a limit.
pub fn parse_edge_list<R: BufRead>(
    mut reader: R,
    source_name: &str,
    delimiter: Delimiter,
    capacity: usize,
) -> Result<Vec<Triple>> {
    let mut rows: Vec<Triple> = Vec::with_capacity(capacity);
    let mut separator = delimiter.separator();
    let mut line = String::new();
    let mut line_no = 0usize;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;
        if line_no % PROGRESS_EVERY == 0 {
            tracing::debug!("Processed {} lines of {}", line_no, source_name);
        }

        let data = line.trim();
        if data.is_empty() || data.starts_with('#') {
            continue;
        }

        let sep = *separator.get_or_insert_with(|| {
            Delimiter::detect(data).separator().unwrap_or('\t')
        });
        rows.push(parse_line(data, sep).map_err(|reason| GraphError::Parse {
            source_name: source_name.to_string(),
            line: line_no,
            content: line.trim_end_matches(['\n', '\r']).to_string(),
            reason,
        })?);
    }

    if capacity > 0 && rows.len() > capacity {
        tracing::warn!(
            "{}: edge count hint {} exceeded, parsed {} rows",
            source_name,
            capacity,
            rows.len()
        );
    }
    Ok(rows)
}

/// Split one data line into exactly three integer tokens.
fn parse_line(data: &str, sep: char) -> std::result::Result<Triple, String> {
    let tokens: Vec<&str> = data.split(sep).map(str::trim).filter(|t| !t.is_empty()).collect();
    if tokens.len() != 3 {
        return Err(format!("expected 3 tokens, found {}", tokens.len()));
    }
    let mut row = [0u64; 3];
    for (slot, token) in row.iter_mut().zip(&tokens) {
        *slot = token
            .parse::<u64>()
            .map_err(|_| format!("invalid integer '{}'", token))?;
    }
    Ok(row)
}

/// Order-independent digest of a row multiset (wrapping sum of mixed rows).
fn edge_fingerprint(rows: &[Triple]) -> u64 {
    fn mix(mut z: u64) -> u64 {
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
    rows.par_iter()
        .map(|r| mix(mix(mix(r[0]) ^ r[1]) ^ r[2]))
        .reduce(|| 0, u64::wrapping_add)
}

/// Parse an edge-list file. When `capacity` is `None` the file is
/// line-counted first so the table is allocated once.
pub fn read_edge_file(
    path: &Path,
    delimiter: Delimiter,
    capacity: Option<usize>,
) -> Result<Vec<Triple>> {
    let capacity = match capacity {
        Some(n) => n,
        None => count_lines(path)?,
    };
    let file = File::open(path)?;
    advise_sequential(&file);
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    parse_edge_list(reader, &path.display().to_string(), delimiter, capacity)
}

/// Hint the kernel that the file is read front to back. Best-effort.
#[cfg(target_os = "linux")]
fn advise_sequential(file: &File) {
    use std::os::unix::io::AsRawFd;
    // SAFETY: the descriptor is owned by `file` and valid for the call.
    unsafe {
        libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL);
    }
}

#[cfg(not(target_os = "linux"))]
fn advise_sequential(_file: &File) {}

// ── GraphLoader ────────────────────────────────────────────────────

/// Builder for bulk construction of a `SortedMultigraph` from edge lists.
///
/// ```no_run
/// use labelhop::graph::{Delimiter, GraphLoader};
///
/// let graph = GraphLoader::new()
///     .delimiter(Delimiter::Tab)
///     .sort_threads(8)
///     .load("edges.tsv".as_ref())?;
/// # Ok::<(), labelhop::GraphError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphLoader {
    delimiter: Delimiter,
    edges: Option<usize>,
    sort_threads: Option<usize>,
}

impl GraphLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Number of edges per direction. Skips the line-count pass.
    pub fn edges(mut self, edges: usize) -> Self {
        self.edges = Some(edges);
        self
    }

    /// Threads for sorting. 1 forces a single-threaded sort; unset lets
    /// the resource profile decide based on table size.
    pub fn sort_threads(mut self, threads: usize) -> Self {
        self.sort_threads = Some(threads.max(1));
        self
    }

    /// Load a single edge list serving both directions. The incoming table
    /// is derived by swapping columns, not by parsing the file again.
    pub fn load(&self, path: &Path) -> Result<SortedMultigraph> {
        let start = Instant::now();
        let outgoing = read_edge_file(path, self.delimiter, self.edges)?;
        let incoming = swap_columns(&outgoing);
        let graph = self.finish(outgoing, incoming)?;
        tracing::info!(
            "Loaded {} edges from {} in {:?}",
            graph.edge_count(),
            path.display(),
            start.elapsed()
        );
        Ok(graph)
    }

    /// Load two edge lists holding the same edges, typically one ordered
    /// by destination (`incoming`) and one by source (`outgoing`). Both
    /// use `source dest label` lines and are parsed concurrently.
    ///
    /// Fails if the files differ in row count or in the edges they hold.
    pub fn load_pair(&self, incoming: &Path, outgoing: &Path) -> Result<SortedMultigraph> {
        let start = Instant::now();
        let (incoming_rows, outgoing_rows) = rayon::join(
            || read_edge_file(incoming, self.delimiter, self.edges),
            || read_edge_file(outgoing, self.delimiter, self.edges),
        );
        let mut incoming_rows = incoming_rows?;
        let outgoing_rows = outgoing_rows?;

        if incoming_rows.len() != outgoing_rows.len() {
            return Err(GraphError::DirectionMismatch {
                outgoing: outgoing_rows.len(),
                incoming: incoming_rows.len(),
            });
        }
        if edge_fingerprint(&incoming_rows) != edge_fingerprint(&outgoing_rows) {
            return Err(GraphError::EdgeSetMismatch { edges: outgoing_rows.len() });
        }
        incoming_rows.par_iter_mut().for_each(|row| row.swap(0, 1));

        let graph = self.finish(outgoing_rows, incoming_rows)?;
        tracing::info!(
            "Loaded {} edges from {} + {} in {:?}",
            graph.edge_count(),
            incoming.display(),
            outgoing.display(),
            start.elapsed()
        );
        Ok(graph)
    }

    /// Load from any buffered reader (single source, both directions).
    pub fn read<R: BufRead>(&self, reader: R, source_name: &str) -> Result<SortedMultigraph> {
        let outgoing = parse_edge_list(reader, source_name, self.delimiter, self.edges.unwrap_or(0))?;
        let incoming = swap_columns(&outgoing);
        self.finish(outgoing, incoming)
    }

    fn resolve_sort_threads(&self, rows: usize) -> usize {
        if let Some(threads) = self.sort_threads {
            return threads;
        }
        let profile = ResourceManager::auto_tune();
        if profile.use_parallel_sort(rows) {
            profile.sort_threads
        } else {
            1
        }
    }

    /// Sort both tables (concurrently when more than one thread is
    /// available) and seal them into a read-only graph.
    fn finish(&self, mut outgoing: Vec<Triple>, mut incoming: Vec<Triple>) -> Result<SortedMultigraph> {
        let threads = self.resolve_sort_threads(outgoing.len());
        if threads <= 1 {
            sort_table(&mut outgoing);
            sort_table(&mut incoming);
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| GraphError::WorkerPool(format!("sort pool: {e}")))?;
            tracing::debug!("Sorting {} rows per direction on {} threads", outgoing.len(), threads);
            pool.install(|| {
                rayon::join(
                    || par_sort_table(&mut outgoing, threads),
                    || par_sort_table(&mut incoming, threads),
                )
            });
        }
        Ok(SortedMultigraph::from_sorted(outgoing, incoming))
    }
}
