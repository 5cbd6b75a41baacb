//! Host resource detection and tuning for bulk loads and shard I/O.
//!
//! Detects available RAM and CPU cores, then derives how many threads the
//! adjacency sort and the shard loader pool may use. Stateless: each call
//! to `ResourceManager::auto_tune()` re-probes the system.

use sysinfo::{MemoryRefreshKind, RefreshKind, System};

// ── Constants ───────────────────────────────────────────────────────

const GB: u64 = 1024 * 1024 * 1024;

/// Bytes per adjacency row (three u64 columns).
const BYTES_PER_ROW: u64 = 24;

/// Tables shorter than this are sorted on one thread.
const PARALLEL_SORT_MIN_ROWS: usize = 1_000_000;

/// Sort thread ceiling.
const SORT_THREADS_MAX: usize = 16;

/// Shard loader pool bounds.
const LOADER_THREADS_MIN: usize = 2;
const LOADER_THREADS_MAX: usize = 30;

/// Above this memory pressure the parallel sort (which needs a scratch
/// copy of the table) is disabled.
const HIGH_PRESSURE: f64 = 0.9;

// ── SystemResources ─────────────────────────────────────────────────

/// Snapshot of detected hardware resources.
#[derive(Debug, Clone)]
pub struct SystemResources {
    /// Total physical RAM in bytes.
    pub total_memory_bytes: u64,
    /// Available (re-usable) RAM in bytes.
    pub available_memory_bytes: u64,
    /// Logical CPU count.
    pub cpu_count: usize,
}

impl SystemResources {
    /// Probe the current system for RAM and CPU information.
    pub fn detect() -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::everything()),
        );
        sys.refresh_memory();

        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
            cpu_count,
        }
    }

    /// Memory pressure indicator (0.0 = no pressure, 1.0 = critical).
    pub fn memory_pressure(&self) -> f64 {
        if self.total_memory_bytes == 0 {
            return 1.0;
        }
        let ratio = self.available_memory_bytes as f64 / self.total_memory_bytes as f64;
        (1.0 - ratio).clamp(0.0, 1.0)
    }

    /// Rows of one adjacency table that fit in available memory.
    pub fn affordable_rows(&self) -> u64 {
        self.available_memory_bytes / BYTES_PER_ROW
    }
}

// ── TuningProfile ───────────────────────────────────────────────────

/// Thread counts and thresholds computed from system resources.
#[derive(Debug, Clone)]
pub struct TuningProfile {
    /// Threads for sorting one adjacency table.
    pub sort_threads: usize,
    /// Size of the shard loader pool.
    pub loader_threads: usize,
    /// Minimum rows before a parallel sort is used.
    pub parallel_sort_min_rows: usize,
    /// Memory pressure at detection time (0.0 = no pressure, 1.0 = critical).
    pub memory_pressure: f64,
    /// Rows of scratch space available memory can hold.
    pub affordable_rows: u64,
}

impl TuningProfile {
    /// Compute a tuning profile from detected resources.
    ///
    /// Heuristics:
    /// - `sort_threads`: RAM < 4 GB -> 1, else `clamp(cpu, 1, 16)`.
    /// - `loader_threads`: `clamp(cpu * 2, 2, 30)`; shard reads are I/O bound.
    /// - `parallel_sort_min_rows`: 1M rows, or never under high memory pressure.
    /// - `affordable_rows`: available RAM over the 24-byte row size.
    pub fn from_resources(res: &SystemResources) -> Self {
        let total_gb = res.total_memory_bytes as f64 / GB as f64;
        let pressure = res.memory_pressure();

        let sort_threads = if total_gb < 4.0 {
            1
        } else {
            res.cpu_count.clamp(1, SORT_THREADS_MAX)
        };

        let loader_threads = (res.cpu_count * 2).clamp(LOADER_THREADS_MIN, LOADER_THREADS_MAX);

        let parallel_sort_min_rows = if pressure > HIGH_PRESSURE {
            usize::MAX
        } else {
            PARALLEL_SORT_MIN_ROWS
        };

        Self {
            sort_threads,
            loader_threads,
            parallel_sort_min_rows,
            memory_pressure: pressure,
            affordable_rows: res.affordable_rows(),
        }
    }

    /// Whether a table of `rows` rows should be sorted in parallel. Both
    /// directions are sorted at once, each with a full scratch copy.
    pub fn use_parallel_sort(&self, rows: usize) -> bool {
        rows >= self.parallel_sort_min_rows && (rows as u64).saturating_mul(2) <= self.affordable_rows
    }
}

// ── ResourceManager ─────────────────────────────────────────────────

/// Stateless utility: detect system resources and compute tuning profile.
pub struct ResourceManager;

impl ResourceManager {
    /// Probe the system and return an adaptive tuning profile.
    pub fn auto_tune() -> TuningProfile {
        let resources = SystemResources::detect();
        let profile = TuningProfile::from_resources(&resources);
        tracing::debug!(
            "Tuned for {} CPUs, {:.0}% memory pressure: {} sort threads, {} loader threads",
            resources.cpu_count,
            profile.memory_pressure * 100.0,
            profile.sort_threads,
            profile.loader_threads
        );
        profile
    }
}

// ── Tests ───────────────────────────────────────────────────────────
