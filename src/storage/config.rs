//! Index configuration and the on-disk layout record.
//!
//! `IndexConfig` is what a caller passes to `TablesIndex::open`. The part of
//! it that decides where data lives (`ShardLayout`) is written to
//! `<path>/layout.json` on first open, so a directory cannot be reopened
//! with a depth or key width that would route nodes to different files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Name of the layout record inside an index directory.
pub const LAYOUT_FILE: &str = "layout.json";

/// How node ids are turned into shard keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardScheme {
    /// blake3 of the little-endian id, reduced modulo `25^key_width`.
    #[default]
    Blake3,
    /// Decimal id right-padded with `0` (or truncated) to `2 * key_width`
    /// digits; each digit pair becomes one letter `a + pair % 25`.
    DigitPairs,
}

impl ShardScheme {
    /// Largest key width the scheme supports.
    pub fn max_key_width(self) -> usize {
        match self {
            // 25^13 < 2^64 < 25^14
            ShardScheme::Blake3 => 13,
            // u64::MAX has 20 decimal digits
            ShardScheme::DigitPairs => 10,
        }
    }
}

// ── ShardLayout ────────────────────────────────────────────────────

/// Parameters that fix which file a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardLayout {
    pub depth: usize,
    pub key_width: usize,
    #[serde(default)]
    pub scheme: ShardScheme,
}

impl ShardLayout {
    /// Read the layout from an index directory. Returns None if absent.
    pub fn read_from(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(LAYOUT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        let layout: Self = serde_json::from_str(&contents)?;
        Ok(Some(layout))
    }

    /// Write the layout to an index directory.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(LAYOUT_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}

// ── IndexConfig ────────────────────────────────────────────────────

/// Configuration of a `TablesIndex`.
///
/// ```
/// use labelhop::storage::{IndexConfig, ShardScheme};
///
/// let config = IndexConfig::new("/var/lib/labelhop/k2", 2)
///     .caching(true)
///     .key_width(3)
///     .scheme(ShardScheme::Blake3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the shard files.
    pub path: PathBuf,
    /// Number of hop levels (k).
    pub depth: usize,
    /// Reject every flush.
    #[serde(default)]
    pub read_only: bool,
    /// Keep one long-lived table that every load and flush goes through.
    #[serde(default)]
    pub caching: bool,
    /// Letters per shard key.
    #[serde(default = "default_key_width")]
    pub key_width: usize,
    #[serde(default)]
    pub scheme: ShardScheme,
    /// Shard loader pool size. None = tuned from the host.
    #[serde(default)]
    pub loader_threads: Option<usize>,
}

fn default_key_width() -> usize {
    IndexConfig::DEFAULT_KEY_WIDTH
}

impl IndexConfig {
    pub const DEFAULT_KEY_WIDTH: usize = 3;

    /// Writable, uncached index with the default key width.
    pub fn new(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self {
            path: path.into(),
            depth,
            read_only: false,
            caching: false,
            key_width: Self::DEFAULT_KEY_WIDTH,
            scheme: ShardScheme::default(),
            loader_threads: None,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn caching(mut self, caching: bool) -> Self {
        self.caching = caching;
        self
    }

    pub fn key_width(mut self, key_width: usize) -> Self {
        self.key_width = key_width;
        self
    }

    pub fn scheme(mut self, scheme: ShardScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn loader_threads(mut self, threads: usize) -> Self {
        self.loader_threads = Some(threads);
        self
    }

    pub fn layout(&self) -> ShardLayout {
        ShardLayout {
            depth: self.depth,
            key_width: self.key_width,
            scheme: self.scheme,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 || self.depth > usize::from(u16::MAX) {
            return Err(GraphError::InvalidConfig(format!(
                "depth must be in 1..={}, got {}",
                u16::MAX,
                self.depth
            )));
        }
        let max = self.scheme.max_key_width();
        if self.key_width == 0 || self.key_width > max {
            return Err(GraphError::InvalidConfig(format!(
                "key_width must be in 1..={} for {:?}, got {}",
                max, self.scheme, self.key_width
            )));
        }
        if self.loader_threads == Some(0) {
            return Err(GraphError::InvalidConfig("loader_threads must be > 0".into()));
        }
        Ok(())
    }
}
