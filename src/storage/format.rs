//! Binary layout of shard files.
//!
//! A shard file holds the node-major tables of every node routed to it.
//!
//! # File Layout
//!
//! ```text
//! [ShardHeader]                       16 bytes
//! per node, ascending id:
//!     node_id      u64 LE
//!     level_count  varint             (<= depth, trailing empty levels omitted)
//!     per level:
//!         entry_count  varint
//!         (label u64 LE, count varint) * entry_count, ascending label
//! ```
//!
//! Counts are strictly positive and fit in u32. Nothing may follow the
//! last node.

use std::io::{Read, Write};

use crate::error::{GraphError, Result};
use crate::storage::ShardMap;
use crate::tables::{LabelCounts, NodeTable};

// ── Header ────────────────────────────────────────────────────────

/// Magic bytes for shard files.
pub const SHARD_MAGIC: [u8; 4] = *b"LHNT";

/// Encoded header size.
pub const HEADER_SIZE: usize = 16;

/// Shard file header -- exactly 16 bytes.
///
/// ```text
/// Offset  Size  Field
/// 0       4     magic: b"LHNT"
/// 4       2     depth: u16
/// 6       2     _reserved
/// 8       8     node_count: u64
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHeader {
    pub depth: u16,
    pub node_count: u64,
}

impl ShardHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&SHARD_MAGIC)?;
        w.write_all(&self.depth.to_le_bytes())?;
        w.write_all(&[0u8; 2])?;
        w.write_all(&self.node_count.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        r.read_exact(&mut buf).map_err(|e| {
            GraphError::InvalidFormat(format!("Failed to read shard header: {}", e))
        })?;

        if buf[0..4] != SHARD_MAGIC {
            return Err(GraphError::InvalidFormat(format!(
                "Not a shard file: expected LHNT, got {:?}",
                &buf[0..4]
            )));
        }
        let depth = u16::from_le_bytes([buf[4], buf[5]]);
        let mut count = [0u8; 8];
        count.copy_from_slice(&buf[8..16]);
        Ok(Self {
            depth,
            node_count: u64::from_le_bytes(count),
        })
    }
}

// ── Varint ────────────────────────────────────────────────────────

/// Unsigned LEB128 varints.
pub mod varint {
    use crate::error::{GraphError, Result};

    /// Longest encoding of a u64.
    pub const MAX_LEN: usize = 10;

    pub fn encode_u64(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    /// Decode a varint at `*off`, advancing it past the encoding.
    pub fn decode_u64(src: &[u8], off: &mut usize) -> Result<u64> {
        let mut result = 0u64;
        for i in 0..MAX_LEN {
            let byte = *src
                .get(*off)
                .ok_or_else(|| GraphError::InvalidFormat(format!("varint truncated at byte {}", i)))?;
            *off += 1;
            let payload = u64::from(byte & 0x7f);
            if i == MAX_LEN - 1 && payload > 1 {
                return Err(GraphError::InvalidFormat("varint overflows 64 bits".into()));
            }
            result |= payload << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(GraphError::InvalidFormat("varint longer than 10 bytes".into()))
    }
}

// ── Encoding ──────────────────────────────────────────────────────

/// Serialize a shard map for an index of the given depth.
pub fn encode_shard(depth: usize, shard: &ShardMap) -> Result<Vec<u8>> {
    let header_depth = u16::try_from(depth)
        .map_err(|_| GraphError::InvalidFormat(format!("depth {} does not fit in u16", depth)))?;

    let mut out = Vec::with_capacity(HEADER_SIZE + shard.len() * 32);
    ShardHeader {
        depth: header_depth,
        node_count: shard.len() as u64,
    }
    .write_to(&mut out)?;

    for (&node, table) in shard {
        if table.len() > depth {
            return Err(GraphError::InvalidFormat(format!(
                "node {} has {} levels, shard depth is {}",
                node,
                table.len(),
                depth
            )));
        }
        let levels = table
            .iter()
            .rposition(|level| level.values().any(|&c| c > 0))
            .map_or(0, |last| last + 1);

        out.extend_from_slice(&node.to_le_bytes());
        varint::encode_u64(levels as u64, &mut out);
        for level in &table[..levels] {
            let mut entries: Vec<(u64, u32)> = level
                .iter()
                .filter(|(_, &c)| c > 0)
                .map(|(&label, &count)| (label, count))
                .collect();
            entries.sort_unstable_by_key(|&(label, _)| label);

            varint::encode_u64(entries.len() as u64, &mut out);
            for (label, count) in entries {
                out.extend_from_slice(&label.to_le_bytes());
                varint::encode_u64(u64::from(count), &mut out);
            }
        }
    }
    Ok(out)
}

// ── Decoding ──────────────────────────────────────────────────────

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn u64_le(&mut self) -> Result<u64> {
        let end = self.pos + 8;
        let raw = self.bytes.get(self.pos..end).ok_or_else(|| {
            GraphError::InvalidFormat(format!("truncated at offset {}", self.pos))
        })?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        self.pos = end;
        Ok(u64::from_le_bytes(buf))
    }

    fn varint(&mut self) -> Result<u64> {
        varint::decode_u64(self.bytes, &mut self.pos)
    }

    /// Varint used as a length; bounded by `max`.
    fn length(&mut self, max: u64, what: &str) -> Result<usize> {
        let at = self.pos;
        let v = self.varint()?;
        if v > max {
            return Err(GraphError::InvalidFormat(format!(
                "{} {} exceeds {} at offset {}",
                what, v, max, at
            )));
        }
        Ok(v as usize)
    }
}

/// Parse a shard file. Returns the depth recorded in the header and the
/// node tables, each padded to that depth.
pub fn decode_shard(bytes: &[u8]) -> Result<(usize, ShardMap)> {
    let mut head = bytes;
    let header = ShardHeader::read_from(&mut head)?;
    let depth = usize::from(header.depth);

    // Each node takes at least 9 bytes; reject absurd counts before looping.
    let body = (bytes.len() - HEADER_SIZE) as u64;
    if header.node_count > body / 9 {
        return Err(GraphError::InvalidFormat(format!(
            "header claims {} nodes in {} bytes",
            header.node_count, body
        )));
    }

    let mut cur = Cursor { bytes, pos: HEADER_SIZE };
    let mut shard = ShardMap::new();
    let mut previous: Option<u64> = None;

    for _ in 0..header.node_count {
        let node = cur.u64_le()?;
        if previous.is_some_and(|p| p >= node) {
            return Err(GraphError::InvalidFormat(format!("node {} out of order", node)));
        }
        previous = Some(node);

        let levels = cur.length(depth as u64, "level count")?;
        let mut table: NodeTable = vec![LabelCounts::new(); depth];
        for level in table.iter_mut().take(levels) {
            let entries = cur.length(u64::from(u32::MAX), "entry count")?;
            let mut last_label: Option<u64> = None;
            for _ in 0..entries {
                let label = cur.u64_le()?;
                if last_label.is_some_and(|l| l >= label) {
                    return Err(GraphError::InvalidFormat(format!(
                        "label {} out of order for node {}",
                        label, node
                    )));
                }
                last_label = Some(label);
                let count = cur.length(u64::from(u32::MAX), "count")? as u32;
                if count == 0 {
                    return Err(GraphError::InvalidFormat(format!(
                        "zero count for node {} label {}",
                        node, label
                    )));
                }
                level.insert(label, count);
            }
        }
        shard.insert(node, table);
    }

    if cur.pos != bytes.len() {
        return Err(GraphError::InvalidFormat(format!(
            "{} trailing bytes",
            bytes.len() - cur.pos
        )));
    }
    Ok((depth, shard))
}
