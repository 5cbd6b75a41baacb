//! Immutable labeled edge value.

use std::fmt;

/// One row of an adjacency table: `[first, second, label]`.
///
/// Outgoing tables store `[src, dst, label]`; incoming tables store
/// `[dst, src, label]`. Both are ordered by the first column only.
pub type Triple = [u64; 3];

/// Directed, labeled edge. Equality and hashing cover all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    src: u64,
    dst: u64,
    label: u64,
}

impl Edge {
    pub fn new(src: u64, dst: u64, label: u64) -> Self {
        Self { src, dst, label }
    }

    #[inline]
    pub fn source(&self) -> u64 {
        self.src
    }

    #[inline]
    pub fn destination(&self) -> u64 {
        self.dst
    }

    #[inline]
    pub fn label(&self) -> u64 {
        self.label
    }

    /// Build from an outgoing row `[src, dst, label]`.
    #[inline]
    pub fn from_outgoing(row: &Triple) -> Self {
        Self::new(row[0], row[1], row[2])
    }

    /// Build from an incoming row `[dst, src, label]`.
    #[inline]
    pub fn from_incoming(row: &Triple) -> Self {
        Self::new(row[1], row[0], row[2])
    }

    #[inline]
    pub fn to_outgoing(self) -> Triple {
        [self.src, self.dst, self.label]
    }

    #[inline]
    pub fn to_incoming(self) -> Triple {
        [self.dst, self.src, self.label]
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-[{}]->{}", self.src, self.label, self.dst)
    }
}

impl From<(u64, u64, u64)> for Edge {
    fn from((src, dst, label): (u64, u64, u64)) -> Self {
        Self::new(src, dst, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_edge_equality_covers_all_fields() {
        let a = Edge::new(1, 2, 10);
        assert_eq!(a, Edge::new(1, 2, 10));
        assert_ne!(a, Edge::new(1, 2, 11));
        assert_ne!(a, Edge::new(2, 1, 10));

        let set: HashSet<Edge> = [a, Edge::new(1, 2, 10), Edge::new(1, 2, 20)].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_row_conversions() {
        let e = Edge::new(5, 9, 3);
        assert_eq!(e.to_outgoing(), [5, 9, 3]);
        assert_eq!(e.to_incoming(), [9, 5, 3]);
        assert_eq!(Edge::from_outgoing(&e.to_outgoing()), e);
        assert_eq!(Edge::from_incoming(&e.to_incoming()), e);
    }

    #[test]
    fn test_display() {
        assert_eq!(Edge::new(1, 2, 10).to_string(), "1-[10]->2");
    }
}
