//! In-page pointers.
//!
//! Lanes and zones never hold raw memory addresses. They reference each
//! other through an [`InPagePtr`]: a page id plus a byte offset inside that
//! page, tagged with the kind of object it points to. The anti-cache
//! resolves the page id, the offset indexes into the page's bytes.

use std::fmt;

use crate::common::PageId;

use super::page_header::{read_u32, read_u64, write_u32, write_u64};

/// Offset value that marks a null pointer.
pub const NULL_OFFSET: usize = 0;

/// Kind of object an [`InPagePtr`] points to.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtrTarget {
    Lane = 0,
    Zone = 1,
    UserData = 2,
    Corrupted = 3,
}

impl PtrTarget {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => PtrTarget::Lane,
            1 => PtrTarget::Zone,
            2 => PtrTarget::UserData,
            _ => PtrTarget::Corrupted,
        }
    }
}

/// Tagged, nullable reference to a lane or zone.
///
/// A pointer is *near* when it is stored on the same page as its target
/// and *far* otherwise. Readers can skip resolving the page again for near
/// pointers.
///
/// # Layout (14 bytes)
/// ```text
/// Offset  Size  Field
/// 0       4     page_id
/// 4       8     offset (0 = null)
/// 12      1     is_far
/// 13      1     target
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InPagePtr {
    pub page_id: PageId,
    pub offset: usize,
    pub is_far: bool,
    pub target: PtrTarget,
}

impl InPagePtr {
    /// Encoded size in bytes.
    pub const SIZE: usize = 14;

    pub const NULL: InPagePtr = InPagePtr {
        page_id: PageId(0),
        offset: NULL_OFFSET,
        is_far: false,
        target: PtrTarget::Corrupted,
    };

    /// Pointer stored on page `from` that targets `offset` on page `to`.
    pub fn new(from: PageId, to: PageId, offset: usize, target: PtrTarget) -> Self {
        assert!(offset != NULL_OFFSET, "in-page pointer to offset 0");
        Self {
            page_id: to,
            offset,
            is_far: from != to,
            target,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.offset == NULL_OFFSET
    }

    /// The same target, as seen from a pointer stored on page `from`.
    pub fn stored_on(self, from: PageId) -> Self {
        if self.is_null() {
            return self;
        }
        Self {
            is_far: from != self.page_id,
            ..self
        }
    }

    /// Resolve to `(page, offset)`, enforcing the target tag.
    ///
    /// # Panics
    /// Panics on a null pointer or when the pointer targets another kind.
    pub fn cast(&self, expected: PtrTarget) -> (PageId, usize) {
        assert!(
            !self.is_null(),
            "null pointer dereferenced as {:?}",
            expected
        );
        assert!(
            self.target == expected,
            "pointer to {:?} at {}+{:#x} cast as {:?}",
            self.target,
            self.page_id,
            self.offset,
            expected
        );
        (self.page_id, self.offset)
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for InPagePtr");
        Self {
            page_id: PageId::new(read_u32(data, 0)),
            offset: read_u64(data, 4) as usize,
            is_far: data[12] != 0,
            target: PtrTarget::from_u8(data[13]),
        }
    }

    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for InPagePtr");
        write_u32(data, 0, self.page_id.0);
        write_u64(data, 4, self.offset as u64);
        data[12] = self.is_far as u8;
        data[13] = self.target as u8;
    }
}

impl fmt::Display for InPagePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "(null)")
        } else {
            write!(
                f,
                "(far_ptr:{}, pid={}, offset={:#010x})",
                self.is_far as u8, self.page_id.0, self.offset
            )
        }
    }
}
