//! Shard file I/O and the max-preserving shard merge.
//!
//! Reads memory-map the file and decode it; a missing file is "no data".
//! Writes go to `<name>.tmp`, are synced, then renamed over the target so
//! a reader never sees a half-written shard.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{GraphError, Result};
use crate::storage::format::{decode_shard, encode_shard};
use crate::storage::ShardMap;
use crate::tables::{LabelCounts, NodeTable};

fn shard_io(key: &str, path: &Path, source: std::io::Error) -> GraphError {
    GraphError::ShardIo {
        key: key.to_string(),
        path: path.to_path_buf(),
        source,
    }
}

/// Load one shard file. `Ok(None)` if the file does not exist.
///
/// Any decoding failure, including a depth different from `depth`, is
/// reported as `Corrupted`.
pub fn read_shard(path: &Path, key: &str, depth: usize) -> Result<Option<ShardMap>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(shard_io(key, path, e)),
    };
    let len = file.metadata().map_err(|e| shard_io(key, path, e))?.len();
    if len == 0 {
        return Err(GraphError::Corrupted {
            path: path.to_path_buf(),
            reason: "empty file".into(),
        });
    }

    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| shard_io(key, path, e))?;
    let (file_depth, shard) = decode_shard(&mmap).map_err(|e| GraphError::Corrupted {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if file_depth != depth {
        return Err(GraphError::Corrupted {
            path: path.to_path_buf(),
            reason: format!("depth {} does not match index depth {}", file_depth, depth),
        });
    }
    Ok(Some(shard))
}

/// Replace a shard file with the encoding of `shard`.
pub fn write_shard(path: &Path, key: &str, depth: usize, shard: &ShardMap) -> Result<()> {
    let bytes = encode_shard(depth, shard)?;
    let tmp = tmp_path(path);
    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .map_err(|e| shard_io(key, &tmp, e))?;
        file.write_all(&bytes).map_err(|e| shard_io(key, &tmp, e))?;
        file.sync_all().map_err(|e| shard_io(key, &tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| shard_io(key, path, e))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Merge `table` into `node`'s entry of `shard`, keeping for every
/// (level, label) the larger of the stored and incoming counts.
pub fn merge_max(shard: &mut ShardMap, node: u64, table: &[LabelCounts], depth: usize) {
    let stored: &mut NodeTable = shard
        .entry(node)
        .or_insert_with(|| vec![LabelCounts::new(); depth]);
    if stored.len() < table.len() {
        stored.resize(table.len(), LabelCounts::new());
    }
    for (mine, theirs) in stored.iter_mut().zip(table) {
        for (&label, &count) in theirs.iter().filter(|(_, &c)| c > 0) {
            let slot = mine.entry(label).or_insert(0);
            *slot = (*slot).max(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn level(pairs: &[(u64, u32)]) -> LabelCounts {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let got = read_shard(&dir.path().join("aa_k2.idx"), "aa", 2).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ab_k2.idx");
        let mut shard = ShardMap::new();
        shard.insert(7, vec![level(&[(1, 2)]), level(&[(3, 4)])]);

        write_shard(&path, "ab", 2, &shard).unwrap();
        assert!(!tmp_path(&path).exists());
        assert_eq!(read_shard(&path, "ab", 2).unwrap(), Some(shard));
    }

    #[test]
    fn test_depth_mismatch_is_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ab_k2.idx");
        write_shard(&path, "ab", 2, &ShardMap::new()).unwrap();
        let err = read_shard(&path, "ab", 3).unwrap_err();
        assert_eq!(err.code(), "CORRUPTED");
    }

    #[test]
    fn test_garbage_and_empty_files_are_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zz_k2.idx");
        std::fs::write(&path, b"definitely not a shard").unwrap();
        assert!(matches!(read_shard(&path, "zz", 2), Err(GraphError::Corrupted { .. })));

        std::fs::write(&path, b"").unwrap();
        assert!(matches!(read_shard(&path, "zz", 2), Err(GraphError::Corrupted { .. })));
    }

    #[test]
    fn test_merge_max_keeps_larger_counts() {
        let mut shard = ShardMap::new();
        merge_max(&mut shard, 1, &[level(&[(10, 5), (11, 1)])], 2);
        merge_max(&mut shard, 1, &[level(&[(10, 3), (11, 4)]), level(&[(12, 2)])], 2);
        assert_eq!(shard[&1], vec![level(&[(10, 5), (11, 4)]), level(&[(12, 2)])]);
    }

    #[test]
    fn test_merge_max_is_idempotent() {
        let table = vec![level(&[(10, 5)]), level(&[(20, 1)])];
        let mut once = ShardMap::new();
        merge_max(&mut once, 9, &table, 2);
        let mut twice = once.clone();
        merge_max(&mut twice, 9, &table, 2);
        assert_eq!(once, twice);
    }
}
