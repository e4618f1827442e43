//! Page header and flag definitions.
//!
//! Every page starts with a [`PageHeader`] containing:
//! - the page id and total page size
//! - [`PageFlags`] (dirty, fixed, locked)
//! - CRC32 checksum of the page image
//! - the approximate free-space counter
//! - fill levels of the free-space register and lane registry

use std::fmt;

use crate::common::PageId;

/// Page state bits stored in the header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageFlags(u8);

impl PageFlags {
    /// The page was modified since it was created or loaded.
    pub const DIRTY: PageFlags = PageFlags(1 << 1);
    /// The page never leaves the hot store.
    pub const FIXED: PageFlags = PageFlags(1 << 2);
    /// The page is locked by a caller.
    pub const LOCKED: PageFlags = PageFlags(1 << 3);

    pub const fn empty() -> Self {
        PageFlags(0)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        PageFlags(bits & (Self::DIRTY.0 | Self::FIXED.0 | Self::LOCKED.0))
    }

    #[inline]
    pub fn contains(&self, other: PageFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: PageFlags) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: PageFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for PageFlags {
    type Output = PageFlags;

    fn bitor(self, rhs: PageFlags) -> PageFlags {
        PageFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for PageFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dirty={}, fixed={}, locked={}",
            self.contains(Self::DIRTY) as u8,
            self.contains(Self::FIXED) as u8,
            self.contains(Self::LOCKED) as u8
        )
    }
}

/// Metadata stored at the beginning of every page.
///
/// # Layout (45 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     page_id
/// 4       8     size (total page bytes)
/// 12      1     flags
/// 13      4     checksum (CRC32)
/// 17      8     freespace (approximate free bytes)
/// 25      4     freespace_capacity (ranges)
/// 29      4     freespace_len (ranges in use)
/// 33      4     lane_capacity
/// 37      4     lanes_in_use
/// 41      4     lane_free_len (free-id stack height)
/// ```
/// All fields are little-endian.
///
/// The header is followed by the free-space table, the lane offset table,
/// the lane free-id stack and finally the payload:
/// ```text
/// ┌────────┬──────────────────┬───────────────┬───────────────┬─────────┐
/// │ header │ ranges (cap × 16)│ offsets (×8)  │ free ids (×4) │ payload │
/// └────────┴──────────────────┴───────────────┴───────────────┴─────────┘
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_id: PageId,
    pub size: u64,
    pub flags: PageFlags,
    pub checksum: u32,
    pub freespace: u64,
    pub freespace_capacity: u32,
    pub freespace_len: u32,
    pub lane_capacity: u32,
    pub lanes_in_use: u32,
    pub lane_free_len: u32,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 45;

    pub const OFFSET_PAGE_ID: usize = 0;
    pub const OFFSET_SIZE: usize = 4;
    pub const OFFSET_FLAGS: usize = 12;
    pub const OFFSET_CHECKSUM: usize = 13;
    pub const OFFSET_FREESPACE: usize = 17;
    pub const OFFSET_FREESPACE_CAPACITY: usize = 25;
    pub const OFFSET_FREESPACE_LEN: usize = 29;
    pub const OFFSET_LANE_CAPACITY: usize = 33;
    pub const OFFSET_LANES_IN_USE: usize = 37;
    pub const OFFSET_LANE_FREE_LEN: usize = 41;

    /// Bytes per free-space register entry (`begin`, `end` as u64).
    pub const RANGE_SIZE: usize = 16;
    /// Bytes per lane offset table entry.
    pub const LANE_OFFSET_SIZE: usize = 8;
    /// Bytes per lane free-id stack entry.
    pub const LANE_ID_SIZE: usize = 4;

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        Self {
            page_id: PageId::new(read_u32(data, Self::OFFSET_PAGE_ID)),
            size: read_u64(data, Self::OFFSET_SIZE),
            flags: PageFlags::from_bits(data[Self::OFFSET_FLAGS]),
            checksum: read_u32(data, Self::OFFSET_CHECKSUM),
            freespace: read_u64(data, Self::OFFSET_FREESPACE),
            freespace_capacity: read_u32(data, Self::OFFSET_FREESPACE_CAPACITY),
            freespace_len: read_u32(data, Self::OFFSET_FREESPACE_LEN),
            lane_capacity: read_u32(data, Self::OFFSET_LANE_CAPACITY),
            lanes_in_use: read_u32(data, Self::OFFSET_LANES_IN_USE),
            lane_free_len: read_u32(data, Self::OFFSET_LANE_FREE_LEN),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        write_u32(data, Self::OFFSET_PAGE_ID, self.page_id.0);
        write_u64(data, Self::OFFSET_SIZE, self.size);
        data[Self::OFFSET_FLAGS] = self.flags.bits();
        write_u32(data, Self::OFFSET_CHECKSUM, self.checksum);
        write_u64(data, Self::OFFSET_FREESPACE, self.freespace);
        write_u32(data, Self::OFFSET_FREESPACE_CAPACITY, self.freespace_capacity);
        write_u32(data, Self::OFFSET_FREESPACE_LEN, self.freespace_len);
        write_u32(data, Self::OFFSET_LANE_CAPACITY, self.lane_capacity);
        write_u32(data, Self::OFFSET_LANES_IN_USE, self.lanes_in_use);
        write_u32(data, Self::OFFSET_LANE_FREE_LEN, self.lane_free_len);
    }

    /// Total bytes of header plus register tables for the given capacities.
    pub const fn total_size(freespace_capacity: usize, lane_capacity: usize) -> usize {
        Self::SIZE
            + freespace_capacity * Self::RANGE_SIZE
            + lane_capacity * (Self::LANE_OFFSET_SIZE + Self::LANE_ID_SIZE)
    }

    /// Start of the free-space register entries.
    pub const fn freespace_table_offset() -> usize {
        Self::SIZE
    }

    /// Start of the lane offset table.
    pub const fn lane_offset_table_offset(freespace_capacity: usize) -> usize {
        Self::SIZE + freespace_capacity * Self::RANGE_SIZE
    }

    /// Start of the lane free-id stack.
    pub const fn lane_stack_offset(freespace_capacity: usize, lane_capacity: usize) -> usize {
        Self::lane_offset_table_offset(freespace_capacity) + lane_capacity * Self::LANE_OFFSET_SIZE
    }

    /// Compute the CRC32 checksum of a page image.
    ///
    /// The checksum field itself is hashed as zeros.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::OFFSET_CHECKSUM + 4..]);
        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

#[inline]
pub(crate) fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn write_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // --- PageFlags tests ---

    #[test]
    fn test_flags_insert_remove() {
        let mut flags = PageFlags::empty();
        flags.insert(PageFlags::DIRTY | PageFlags::LOCKED);
        assert!(flags.contains(PageFlags::DIRTY));
        assert!(flags.contains(PageFlags::LOCKED));
        assert!(!flags.contains(PageFlags::FIXED));

        flags.remove(PageFlags::DIRTY);
        assert!(!flags.contains(PageFlags::DIRTY));
        assert_eq!(flags.to_string(), "dirty=0, fixed=0, locked=1");
    }

    #[test]
    fn test_flags_from_bits_masks_unknown() {
        assert_eq!(PageFlags::from_bits(0xFF).bits(), 0b1110);
    }

    // --- PageHeader tests ---

    #[test]
    fn test_page_header_byte_layout() {
        let header = PageHeader {
            page_id: PageId::new(0x04030201),
            size: 4096,
            flags: PageFlags::DIRTY,
            checksum: 0xDEADBEEF,
            freespace: 1000,
            freespace_capacity: 8,
            freespace_len: 1,
            lane_capacity: 4,
            lanes_in_use: 0,
            lane_free_len: 4,
        };

        let mut buffer = [0u8; PageHeader::SIZE];
        header.write_to(&mut buffer);

        assert_eq!(buffer[0], 0x01);
        assert_eq!(buffer[3], 0x04);
        assert_eq!(buffer[PageHeader::OFFSET_FLAGS], 0b10);
        assert_eq!(buffer[PageHeader::OFFSET_CHECKSUM], 0xEF);
        assert_eq!(PageHeader::from_bytes(&buffer), header);
    }

    #[test]
    fn test_total_size() {
        assert_eq!(PageHeader::total_size(8, 4), 45 + 8 * 16 + 4 * 12);
        assert_eq!(PageHeader::lane_offset_table_offset(8), 45 + 128);
        assert_eq!(PageHeader::lane_stack_offset(8, 4), 45 + 128 + 32);
    }

    // --- Checksum tests ---

    #[test]
    fn test_checksum_ignores_checksum_field() {
        let mut page_data = vec![0u8; 512];
        page_data[100] = 0xAB;

        let checksum1 = PageHeader::compute_checksum(&page_data);
        page_data[PageHeader::OFFSET_CHECKSUM..PageHeader::OFFSET_CHECKSUM + 4].fill(0xFF);
        let checksum2 = PageHeader::compute_checksum(&page_data);

        assert_eq!(checksum1, checksum2);
    }

    #[test]
    fn test_checksum_detects_change() {
        let mut page_data = vec![0u8; 512];
        let header = PageHeader {
            checksum: PageHeader::compute_checksum(&page_data),
            ..PageHeader::default()
        };
        assert!(header.verify_checksum(&page_data));

        page_data[300] = 0x01;
        assert!(!header.verify_checksum(&page_data));
    }
}
