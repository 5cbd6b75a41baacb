//! Deterministic shard assignment for the tables index.
//!
//! Maps node ids to short alphabetic shard keys over the 25 letters
//! `a..=y`. A key of width `w` selects one of `25^w` shard files; many
//! nodes share a file, and a node always lands in the same one.
//!
//! File names combine the key with the index depth: `{key}_k{depth}.idx`.

use std::collections::BTreeMap;

use crate::storage::config::{ShardLayout, ShardScheme};

/// Size of the shard key alphabet.
pub const ALPHABET_SIZE: u64 = 25;

/// Deterministic shard planner: node id -> shard key.
#[derive(Debug, Clone)]
pub struct ShardPlanner {
    depth: usize,
    key_width: usize,
    scheme: ShardScheme,
    shard_count: u64,
}

impl ShardPlanner {
    /// Create a planner for a layout.
    ///
    /// # Panics
    ///
    /// Panics if `key_width` is 0 or too wide for the scheme.
    pub fn new(layout: &ShardLayout) -> Self {
        assert!(layout.key_width > 0, "key_width must be > 0");
        assert!(
            layout.key_width <= layout.scheme.max_key_width(),
            "key_width {} too wide for {:?}",
            layout.key_width,
            layout.scheme
        );
        Self {
            depth: layout.depth,
            key_width: layout.key_width,
            scheme: layout.scheme,
            shard_count: ALPHABET_SIZE.pow(layout.key_width as u32),
        }
    }

    /// Number of distinct shard keys (`25^key_width`).
    pub fn shard_count(&self) -> u64 {
        self.shard_count
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    /// Shard key of `node`: exactly `key_width` letters in `a..=y`.
    pub fn shard_key(&self, node: u64) -> String {
        match self.scheme {
            ShardScheme::Blake3 => self.hashed_key(node),
            ShardScheme::DigitPairs => self.digit_pair_key(node),
        }
    }

    fn hashed_key(&self, node: u64) -> String {
        let hash = blake3::hash(&node.to_le_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&hash.as_bytes()[0..8]);
        let mut bucket = u64::from_le_bytes(prefix) % self.shard_count;

        let mut key = vec![b'a'; self.key_width];
        for slot in key.iter_mut().rev() {
            *slot = b'a' + (bucket % ALPHABET_SIZE) as u8;
            bucket /= ALPHABET_SIZE;
        }
        key.into_iter().map(char::from).collect()
    }

    fn digit_pair_key(&self, node: u64) -> String {
        let width = self.key_width * 2;
        let mut digits = node.to_string().into_bytes();
        digits.resize(width, b'0');
        digits
            .chunks_exact(2)
            .map(|pair| {
                let value = u64::from(pair[0] - b'0') * 10 + u64::from(pair[1] - b'0');
                char::from(b'a' + (value % ALPHABET_SIZE) as u8)
            })
            .collect()
    }

    /// File name for a shard key.
    pub fn file_name_for_key(&self, key: &str) -> String {
        format!("{}_k{}.idx", key, self.depth)
    }

    /// File name of the shard holding `node`.
    pub fn file_name(&self, node: u64) -> String {
        self.file_name_for_key(&self.shard_key(node))
    }

    /// Group nodes by shard key. Every input node appears in exactly one
    /// group; duplicates are collapsed. Keys iterate in sorted order.
    pub fn plan<I: IntoIterator<Item = u64>>(&self, nodes: I) -> BTreeMap<String, Vec<u64>> {
        let mut result: BTreeMap<String, Vec<u64>> = BTreeMap::new();
        for node in nodes {
            result.entry(self.shard_key(node)).or_default().push(node);
        }
        for group in result.values_mut() {
            group.sort_unstable();
            group.dedup();
        }
        result
    }
}
