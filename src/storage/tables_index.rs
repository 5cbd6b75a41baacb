//! TablesIndex - file-sharded persistence for `NeighborTables`.
//!
//! ```text
//! <path>/
//! +-- layout.json        # ShardLayout (depth, key_width, scheme)
//! +-- aab_k2.idx         # one file per shard key that holds data
//! +-- ...
//! ```
//!
//! A flush groups nodes by shard key, then for every touched shard reads
//! the file, merges the incoming tables keeping the larger count per
//! (level, label), and replaces the file. A load reads the distinct shards
//! of the requested nodes on a fixed-size pool and merges everything they
//! hold into one table.
//!
//! With caching enabled a single long-lived `NeighborTables` receives the
//! merged on-disk entry of every flushed node and every loaded shard;
//! loads return it.
//!
//! Not internally synchronized. Two indexes (or processes) must not flush
//! to the same shard at once.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use crate::error::{GraphError, Result};
use crate::storage::config::{IndexConfig, ShardLayout};
use crate::storage::resource::ResourceManager;
use crate::storage::shard::{merge_max, read_shard, write_shard};
use crate::storage::shard_planner::ShardPlanner;
use crate::storage::ShardMap;
use crate::tables::{NeighborTables, NodeTable};

const WRITE_CHECK_FILE: &str = ".write-check";

// ── FlushResult ────────────────────────────────────────────────────

/// Outcome of one `store` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushResult {
    /// Shard files rewritten, new ones included.
    pub shards_written: usize,
    /// Shard files that did not exist before this flush.
    pub new_files: usize,
    /// Distinct nodes written.
    pub nodes_written: usize,
}

impl FlushResult {
    /// True if at least one shard file was created.
    pub fn created_new_files(&self) -> bool {
        self.new_files > 0
    }
}

// ── TablesIndex ────────────────────────────────────────────────────

pub struct TablesIndex {
    config: IndexConfig,
    planner: ShardPlanner,
    loader: rayon::ThreadPool,
    cache: Option<NeighborTables>,
}

impl TablesIndex {
    /// Open (or create) an index directory.
    ///
    /// A writable index creates the directory if needed and records its
    /// layout. A read-only index requires an existing directory. Either
    /// way a recorded layout must match the configuration.
    pub fn open(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        prepare_dir(&config.path, config.read_only)?;

        let layout = config.layout();
        match ShardLayout::read_from(&config.path)? {
            Some(found) if found != layout => {
                return Err(GraphError::InvalidConfig(format!(
                    "{} was created with {:?}, opened with {:?}",
                    config.path.display(),
                    found,
                    layout
                )));
            }
            Some(_) => {}
            None if !config.read_only => layout.write_to(&config.path)?,
            None => {}
        }

        let threads = config
            .loader_threads
            .unwrap_or_else(|| ResourceManager::auto_tune().loader_threads);
        let loader = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("shard-loader-{i}"))
            .build()
            .map_err(|e| GraphError::WorkerPool(format!("loader pool: {e}")))?;

        tracing::info!(
            "Opened tables index at {} (depth {}, key width {}, {} loaders{}{})",
            config.path.display(),
            config.depth,
            config.key_width,
            threads,
            if config.read_only { ", read-only" } else { "" },
            if config.caching { ", caching" } else { "" }
        );

        Ok(Self {
            planner: ShardPlanner::new(&layout),
            cache: config.caching.then(|| NeighborTables::new(config.depth)),
            loader,
            config,
        })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.config.depth
    }

    pub fn planner(&self) -> &ShardPlanner {
        &self.planner
    }

    /// Path of the shard file that holds (or would hold) `node`.
    pub fn shard_path(&self, node: u64) -> PathBuf {
        self.config.path.join(self.planner.file_name(node))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.config.path.join(self.planner.file_name_for_key(key))
    }

    /// The cache, when caching is enabled.
    pub fn cache(&self) -> Option<&NeighborTables> {
        self.cache.as_ref()
    }

    /// Drop everything cached. No-op without caching.
    pub fn clear_cache(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            *cache = NeighborTables::new(self.config.depth);
        }
    }

    // ── Flush ──────────────────────────────────────────────────────

    /// Persist every node of `tables`, merging into existing shards.
    pub fn store(&mut self, tables: &NeighborTables) -> Result<FlushResult> {
        if self.config.read_only {
            return Err(GraphError::ReadOnlyMode);
        }
        if tables.depth() != self.config.depth {
            return Err(GraphError::DepthMismatch {
                expected: self.config.depth,
                found: tables.depth(),
            });
        }

        let start = Instant::now();
        let node_tables = tables.to_node_tables();

        let plan = self.planner.plan(node_tables.keys().copied());
        tracing::debug!("Will update {} shard files for {} nodes", plan.len(), node_tables.len());

        let mut result = FlushResult {
            nodes_written: node_tables.len(),
            ..FlushResult::default()
        };
        for (key, nodes) in &plan {
            let path = self.key_path(key);
            let mut shard = match read_shard(&path, key, self.config.depth)? {
                Some(existing) => existing,
                None => {
                    result.new_files += 1;
                    ShardMap::new()
                }
            };
            for node in nodes {
                if let Some(table) = node_tables.get(node) {
                    merge_max(&mut shard, *node, table, self.config.depth);
                }
            }
            write_shard(&path, key, self.config.depth, &shard)?;
            result.shards_written += 1;

            // The cache takes the merged on-disk entry, not just the incoming one.
            if let Some(cache) = self.cache.as_mut() {
                for node in nodes {
                    if let Some(table) = shard.get(node) {
                        cache.merge_node_table(*node, table)?;
                    }
                }
            }
        }

        tracing::info!(
            "Flushed {} nodes into {} shards ({} new) in {:?}",
            result.nodes_written,
            result.shards_written,
            result.new_files,
            start.elapsed()
        );
        Ok(result)
    }

    // ── Load ───────────────────────────────────────────────────────

    /// Read the shards of `nodes` and merge their whole contents.
    ///
    /// The result holds every node stored in a touched shard, not only the
    /// requested ones. With caching it is the cache itself, grown by the
    /// loaded shards; the cache is not consulted to skip reads (see
    /// `load_table`). One unreadable or corrupt shard fails the call.
    pub fn load(&mut self, nodes: &[u64]) -> Result<Cow<'_, NeighborTables>> {
        let keys: BTreeSet<String> = nodes.iter().map(|&n| self.planner.shard_key(n)).collect();
        tracing::debug!("Will load {} shard files for {} nodes", keys.len(), nodes.len());

        let depth = self.config.depth;
        let paths: Vec<(&String, PathBuf)> = keys.iter().map(|k| (k, self.key_path(k))).collect();
        let loaded: Vec<Option<ShardMap>> = self.loader.install(|| {
            paths
                .par_iter()
                .map(|(key, path)| read_shard(path, key, depth))
                .collect::<Result<Vec<_>>>()
        })?;

        match self.cache.as_mut() {
            Some(cache) => {
                merge_shards(cache, loaded)?;
                Ok(Cow::Borrowed(&*cache))
            }
            None => {
                let mut fresh = NeighborTables::new(depth);
                merge_shards(&mut fresh, loaded)?;
                Ok(Cow::Owned(fresh))
            }
        }
    }

    /// Like `load`, but with caching enabled nodes already in the cache
    /// are not re-read.
    pub fn load_table(&mut self, nodes: &[u64]) -> Result<Cow<'_, NeighborTables>> {
        let missing: Vec<u64> = match self.cache.as_ref() {
            Some(cache) => nodes.iter().copied().filter(|&n| !cache.contains(n)).collect(),
            None => nodes.to_vec(),
        };
        self.load(&missing)
    }

    /// Per-level table of a single node, `None` if it was never stored.
    pub fn load_node(&mut self, node: u64) -> Result<Option<NodeTable>> {
        let tables = self.load_table(&[node])?;
        Ok(tables.node_table(node))
    }
}

fn merge_shards(target: &mut NeighborTables, shards: Vec<Option<ShardMap>>) -> Result<()> {
    for shard in shards.into_iter().flatten() {
        for (node, table) in shard {
            target.merge_node_table(node, &table)?;
        }
    }
    Ok(())
}

/// Make sure `path` is a usable index directory.
fn prepare_dir(path: &Path, read_only: bool) -> Result<()> {
    if !path.exists() {
        if read_only {
            return Err(GraphError::InvalidConfig(format!(
                "index directory {} does not exist",
                path.display()
            )));
        }
        fs::create_dir_all(path)?;
        return Ok(());
    }
    let meta = fs::metadata(path)?;
    if !meta.is_dir() {
        return Err(GraphError::InvalidConfig(format!("{} is not a directory", path.display())));
    }
    if !read_only {
        check_writable(path)?;
    }
    Ok(())
}

/// Create and remove a scratch file in `path`.
fn check_writable(path: &Path) -> Result<()> {
    let probe = path.join(WRITE_CHECK_FILE);
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&probe)
        .and_then(|_| fs::remove_file(&probe))
        .map_err(|e| GraphError::InvalidConfig(format!("{} is not writable: {e}", path.display())))
}
