//! Lane identifier type.

use std::fmt;

/// Identifies a lane within the lane registry of one page.
///
/// Lane ids are slot indices into the registry's offset table, so they are
/// only unique together with the [`PageId`](crate::PageId) of the page
/// that owns the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub u32);

impl LaneId {
    /// Sentinel for "no lane".
    pub const INVALID: LaneId = LaneId(u32::MAX);

    #[inline]
    pub fn new(id: u32) -> Self {
        LaneId(id)
    }

    /// Slot position in the registry tables.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Lane(INVALID)")
        } else {
            write!(f, "Lane({})", self.0)
        }
    }
}
