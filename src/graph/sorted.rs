//! Sort and search primitives over triple tables ordered by first column.
//!
//! Every table in the adjacency store is a flat `Vec<Triple>` kept sorted by
//! `row[0]` only. Rows sharing a first column form a contiguous run; the run
//! for a vertex is located with two binary searches, no per-vertex container.

use std::fs::File;
use std::ops::Range;
use std::path::Path;

use memmap2::Mmap;
use rayon::prelude::*;

use crate::error::Result;
use crate::graph::edge::Triple;

// ── Sorting ────────────────────────────────────────────────────────

/// Sort a table by its first column on the calling thread.
///
/// Relative order of rows with equal first column is unspecified.
pub fn sort_table(table: &mut [Triple]) {
    table.sort_unstable_by_key(|row| row[0]);
}

/// Sort a table by splitting it into `chunks` balanced runs, sorting the
/// runs in parallel, then merging them pairwise.
///
/// Runs on the rayon pool installed by the caller (or the global pool).
/// Needs one scratch buffer the size of the table during the merge phase.
pub fn par_sort_table(table: &mut Vec<Triple>, chunks: usize) {
    let len = table.len();
    if chunks <= 1 || len < 2 {
        sort_table(table);
        return;
    }

    let run = len.div_ceil(chunks).max(1);
    table.par_chunks_mut(run).for_each(sort_table);
    merge_runs(table, run);
}

/// Bottom-up merge of consecutive sorted runs of length `width`.
fn merge_runs(table: &mut Vec<Triple>, mut width: usize) {
    let len = table.len();
    if width == 0 || width >= len {
        return;
    }

    let mut scratch: Vec<Triple> = vec![[0; 3]; len];
    while width < len {
        let pair = 2 * width;
        scratch
            .par_chunks_mut(pair)
            .zip(table.par_chunks(pair))
            .for_each(|(out, input)| {
                let mid = width.min(input.len());
                merge_into(&input[..mid], &input[mid..], out);
            });
        std::mem::swap(table, &mut scratch);
        width = pair;
    }
}

/// Stable two-way merge of `left` and `right` into `out`.
/// `out.len()` must equal `left.len() + right.len()`.
fn merge_into(left: &[Triple], right: &[Triple], out: &mut [Triple]) {
    debug_assert_eq!(out.len(), left.len() + right.len());
    let (mut i, mut j, mut k) = (0, 0, 0);
    while i < left.len() && j < right.len() {
        if right[j][0] < left[i][0] {
            out[k] = right[j];
            j += 1;
        } else {
            out[k] = left[i];
            i += 1;
        }
        k += 1;
    }
    let rest_left = left.len() - i;
    out[k..k + rest_left].copy_from_slice(&left[i..]);
    out[k + rest_left..].copy_from_slice(&right[j..]);
}

/// True if `table` is ordered by its first column.
pub fn is_sorted_by_first(table: &[Triple]) -> bool {
    table.windows(2).all(|w| w[0][0] <= w[1][0])
}

/// Swap the first two columns of every row: `[a, b, l]` -> `[b, a, l]`.
///
/// Derives an incoming table from an outgoing one (or back) without
/// re-parsing the source. The result is unsorted.
pub fn swap_columns(table: &[Triple]) -> Vec<Triple> {
    table.par_iter().map(|row| [row[1], row[0], row[2]]).collect()
}

// ── Searching ──────────────────────────────────────────────────────

/// Index of the first row whose first column equals `key`.
///
/// `Err(i)` gives the insertion point when `key` is absent, mirroring
/// `slice::binary_search`.
pub fn search_first(table: &[Triple], key: u64) -> std::result::Result<usize, usize> {
    let start = table.partition_point(|row| row[0] < key);
    if start < table.len() && table[start][0] == key {
        Ok(start)
    } else {
        Err(start)
    }
}

/// Row range of the run whose first column equals `key`, or `None`.
///
/// Pure: no cached state, safe to call from any number of readers.
pub fn bounds_of(table: &[Triple], key: u64) -> Option<Range<usize>> {
    let start = search_first(table, key).ok()?;
    let len = table[start..].partition_point(|row| row[0] == key);
    Some(start..start + len)
}

/// True if any row has `key` in its first column.
#[inline]
pub fn contains_key(table: &[Triple], key: u64) -> bool {
    search_first(table, key).is_ok()
}

/// Index one past the run starting at `from`.
#[inline]
pub(crate) fn run_end(table: &[Triple], from: usize) -> usize {
    let key = table[from][0];
    from + table[from..].partition_point(|row| row[0] == key)
}

// ── Line counting ──────────────────────────────────────────────────

/// Count lines in a file (a final line without trailing newline counts).
///
/// Memory-maps the file and scans for `\n`; used to size adjacency tables
/// before parsing.
pub fn count_lines(path: &Path) -> Result<usize> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(0);
    }
    let mmap = unsafe { Mmap::map(&file) }?;
    let newlines = memchr::memchr_iter(b'\n', &mmap).count();
    let unterminated = mmap.last().map_or(0, |&b| usize::from(b != b'\n'));
    Ok(newlines + unterminated)
}
