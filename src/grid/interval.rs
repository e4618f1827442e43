//! Half-open tuple id intervals.

use std::fmt;

use crate::common::TupleId;

/// The tuple ids `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleIdInterval {
    pub begin: TupleId,
    pub end: TupleId,
}

impl TupleIdInterval {
    pub fn new(begin: u64, end: u64) -> Self {
        Self {
            begin: TupleId::new(begin),
            end: TupleId::new(end),
        }
    }

    /// Whether the interval holds at least one id.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.begin < self.end
    }

    #[inline]
    pub fn span(&self) -> u64 {
        self.end.0.saturating_sub(self.begin.0)
    }

    #[inline]
    pub fn contains(&self, tid: TupleId) -> bool {
        self.begin <= tid && tid < self.end
    }

    pub fn overlaps(&self, other: &TupleIdInterval) -> bool {
        self.begin < other.end && other.begin < self.end
    }
}

impl fmt::Display for TupleIdInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin.0, self.end.0)
    }
}
