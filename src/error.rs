//! Error types for the adjacency store, neighbor tables and shard index

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Malformed line {line} in {source_name}: '{content}' ({reason})")]
    Parse {
        source_name: String,
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Graph is immutable: {0} is not allowed")]
    Immutable(&'static str),

    #[error("Operation not allowed in read-only mode")]
    ReadOnlyMode,

    #[error("Hop level {level} out of bounds for depth {depth}")]
    LevelOutOfBounds { level: usize, depth: usize },

    #[error("Vertex {0} does not appear in the graph")]
    UnknownVertex(u64),

    #[error("Depth mismatch: expected {expected}, got {found}")]
    DepthMismatch { expected: usize, found: usize },

    #[error("Direction tables disagree: {outgoing} outgoing rows, {incoming} incoming rows")]
    DirectionMismatch { outgoing: usize, incoming: usize },

    #[error("Direction tables hold {edges} rows each but different edges")]
    EdgeSetMismatch { edges: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on shard '{key}' ({}): {source}", path.display())]
    ShardIo {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted shard file {}: {reason}", path.display())]
    Corrupted { path: PathBuf, reason: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl GraphError {
    /// Stable error code, one per failure class.
    pub fn code(&self) -> &'static str {
        match self {
            GraphError::Parse { .. } => "PARSE_ERROR",
            GraphError::Immutable(_) => "IMMUTABLE_GRAPH",
            GraphError::ReadOnlyMode => "READ_ONLY_MODE",
            GraphError::LevelOutOfBounds { .. } => "LEVEL_OUT_OF_BOUNDS",
            GraphError::UnknownVertex(_) => "UNKNOWN_VERTEX",
            GraphError::DepthMismatch { .. } => "DEPTH_MISMATCH",
            GraphError::DirectionMismatch { .. } | GraphError::EdgeSetMismatch { .. } => {
                "DIRECTION_MISMATCH"
            }
            GraphError::InvalidConfig(_) => "INVALID_CONFIG",
            GraphError::Io(_) | GraphError::ShardIo { .. } => "IO_ERROR",
            GraphError::Corrupted { .. } | GraphError::InvalidFormat(_) => "CORRUPTED",
            GraphError::Json(_) => "JSON_ERROR",
            GraphError::WorkerPool(_) => "WORKER_POOL",
        }
    }

    /// True for programming errors (misuse of an API), which are never retried.
    pub fn is_usage_violation(&self) -> bool {
        matches!(
            self,
            GraphError::Immutable(_)
                | GraphError::ReadOnlyMode
                | GraphError::LevelOutOfBounds { .. }
                | GraphError::UnknownVertex(_)
                | GraphError::DepthMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message_carries_line_and_content() {
        let err = GraphError::Parse {
            source_name: "edges.txt".into(),
            line: 7,
            content: "1 2".into(),
            reason: "expected 3 tokens, found 2".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("'1 2'"));
        assert_eq!(err.code(), "PARSE_ERROR");
    }

    #[test]
    fn test_usage_violation_classification() {
        assert!(GraphError::ReadOnlyMode.is_usage_violation());
        assert!(GraphError::LevelOutOfBounds { level: 3, depth: 2 }.is_usage_violation());
        assert!(GraphError::Immutable("add_edge").is_usage_violation());
        assert!(!GraphError::InvalidFormat("x".into()).is_usage_violation());
    }

    #[test]
    fn test_shard_io_message_includes_key() {
        let err = GraphError::ShardIo {
            key: "ab".into(),
            path: PathBuf::from("/tmp/ab_k2.idx"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("'ab'"));
        assert!(msg.contains("ab_k2.idx"));
        assert_eq!(err.code(), "IO_ERROR");
    }
}
