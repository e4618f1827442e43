//! Error types for gridstore.
//!
//! Only conditions a caller can react to are errors. Broken preconditions
//! (cursor used in the wrong state, pointer cast to the wrong target,
//! tuple id outside every grid) panic with the offending identifier.

use thiserror::Error;

use crate::common::{AttrId, LaneId, PageId};

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors in gridstore.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from a cold store backed by a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The buffer configuration violates one of its constraints.
    #[error("invalid buffer configuration: {reason}")]
    InvalidConfig {
        /// Which constraint failed.
        reason: String,
    },

    /// The requested page cannot hold its own header plus one lane and zone.
    #[error("page size {size} is too small, must be at least {min} bytes")]
    PageTooSmall { size: usize, min: usize },

    /// No free range on the page is large enough.
    #[error("no free space on {page_id} for {requested} bytes")]
    NoFreeSpace { page_id: PageId, requested: usize },

    /// The free-space register has no slot left for another range.
    #[error("free-space register of {page_id} is full")]
    FreeSpaceRegisterFull { page_id: PageId },

    /// Every lane slot of the page is in use.
    #[error("lane registry of {page_id} is full")]
    LaneRegistryFull { page_id: PageId },

    /// A lane still owns zones and cannot be released.
    #[error("{lane_id} on {page_id} still has zones")]
    LaneNotEmpty { page_id: PageId, lane_id: LaneId },

    /// The page id is in neither the hot nor the cold store.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// The page is pinned and cannot leave the hot store.
    #[error("{page_id} is pinned ({pin_count} pins)")]
    PagePinned { page_id: PageId, pin_count: u32 },

    /// A page image read back from a cold store failed verification.
    #[error("checksum mismatch on {page_id}: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        page_id: PageId,
        stored: u32,
        computed: u32,
    },

    /// A page image is structurally broken (truncated, wrong size field).
    #[error("corrupt page image: {reason}")]
    CorruptPageImage { reason: String },

    /// A tuple-id interval with `begin >= end`, or overlapping another.
    #[error("invalid tuple id interval [{begin}, {end})")]
    InvalidInterval { begin: u64, end: u64 },

    /// The attribute id is not part of the schema.
    #[error("unknown attribute {0}")]
    UnknownAttribute(AttrId),

    /// A value does not match the attribute's field type.
    #[error("type mismatch on attribute {attr}: expected {expected}")]
    TypeMismatch { attr: AttrId, expected: &'static str },
}
