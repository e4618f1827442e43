//! Page - the unit of allocation of the anti-cache.
//!
//! A [`Page`] is a byte buffer of configurable size. It carries its own
//! allocator state: the free-space register and the lane registry live in
//! the page header, lanes and zones live in the payload.

use crate::common::{Error, PageId, Result};

use super::freespace::Range;
use super::lane::LANE_HEADER_SIZE;
use super::page_header::{read_u32, read_u64, write_u32, write_u64, PageFlags, PageHeader};
use super::zone::MIN_DATA_SIZE;

/// Smallest page able to hold its header, one lane header and one zone.
pub const fn min_page_size(freespace_capacity: usize, lane_capacity: usize) -> usize {
    PageHeader::total_size(freespace_capacity, lane_capacity) + LANE_HEADER_SIZE + MIN_DATA_SIZE
}

/// How [`Page::free_space`] measures free bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeSpaceQuery {
    /// The running counter; O(1) but blind to fragmentation.
    Approx,
    /// The largest single free range; O(ranges).
    Exact,
}

/// A page of data with in-page allocator state.
///
/// # Memory Layout
/// See [`PageHeader`] for the header and register tables. Every byte
/// after the register tables starts out as one free range.
///
/// `Page` does not implement `Clone`; copies go through [`Page::to_image`].
///
/// # Example
/// ```
/// use gridstore::storage::page::{FreeSpaceQuery, Page, PageFlags};
/// use gridstore::PageId;
///
/// let page = Page::create(PageId::new(0), 4096, PageFlags::empty(), 8, 4).unwrap();
/// assert_eq!(page.size(), 4096);
/// assert_eq!(
///     page.free_space(FreeSpaceQuery::Exact),
///     4096 - page.header_size()
/// );
/// ```
pub struct Page {
    data: Vec<u8>,
}

impl Page {
    /// Create a fresh page.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if either register capacity is zero
    /// - `Error::PageTooSmall` if `size` cannot hold the header, one lane and one zone
    pub fn create(
        id: PageId,
        size: usize,
        flags: PageFlags,
        freespace_capacity: usize,
        lane_capacity: usize,
    ) -> Result<Page> {
        if freespace_capacity == 0 || lane_capacity == 0 {
            return Err(Error::InvalidConfig {
                reason: "page register capacities must be > 0".to_string(),
            });
        }
        let min = min_page_size(freespace_capacity, lane_capacity);
        if size < min {
            return Err(Error::PageTooSmall { size, min });
        }

        let mut page = Page {
            data: vec![0u8; size],
        };
        let header = PageHeader {
            page_id: id,
            size: size as u64,
            flags,
            checksum: 0,
            freespace: 0,
            freespace_capacity: freespace_capacity as u32,
            freespace_len: 0,
            lane_capacity: lane_capacity as u32,
            lanes_in_use: 0,
            lane_free_len: 0,
        };
        header.write_to(&mut page.data);

        page.init_lane_registry();
        let payload = page.header_size();
        page.push(Range::new(payload, size))?;

        Ok(page)
    }

    /// Rebuild a page from an image produced by [`Page::to_image`].
    ///
    /// # Errors
    /// - `Error::CorruptPageImage` if the image is truncated or inconsistent
    /// - `Error::ChecksumMismatch` if the stored checksum does not match
    pub fn from_image(image: Vec<u8>) -> Result<Page> {
        if image.len() < PageHeader::SIZE {
            return Err(Error::CorruptPageImage {
                reason: format!("{} bytes is shorter than a page header", image.len()),
            });
        }
        let header = PageHeader::from_bytes(&image);
        if header.size as usize != image.len() {
            return Err(Error::CorruptPageImage {
                reason: format!(
                    "{} claims {} bytes, image has {}",
                    header.page_id,
                    header.size,
                    image.len()
                ),
            });
        }
        let tables = PageHeader::total_size(
            header.freespace_capacity as usize,
            header.lane_capacity as usize,
        );
        if tables > image.len() {
            return Err(Error::CorruptPageImage {
                reason: format!("{} register tables exceed the page", header.page_id),
            });
        }
        let computed = PageHeader::compute_checksum(&image);
        if header.checksum != computed {
            return Err(Error::ChecksumMismatch {
                page_id: header.page_id,
                stored: header.checksum,
                computed,
            });
        }
        Ok(Page { data: image })
    }

    /// Serialize the page with a fresh checksum.
    pub fn to_image(&self) -> Vec<u8> {
        let mut image = self.data.clone();
        let checksum = PageHeader::compute_checksum(&image);
        write_u32(&mut image, PageHeader::OFFSET_CHECKSUM, checksum);
        image
    }

    // ========================================================================
    // Header access
    // ========================================================================

    /// Decode the full header.
    pub fn header(&self) -> PageHeader {
        PageHeader::from_bytes(&self.data)
    }

    #[inline]
    pub fn id(&self) -> PageId {
        PageId::new(read_u32(&self.data, PageHeader::OFFSET_PAGE_ID))
    }

    /// Total page size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn flags(&self) -> PageFlags {
        PageFlags::from_bits(self.data[PageHeader::OFFSET_FLAGS])
    }

    pub fn set_flags(&mut self, flags: PageFlags) {
        self.data[PageHeader::OFFSET_FLAGS] = flags.bits();
    }

    pub fn mark_dirty(&mut self) {
        let mut flags = self.flags();
        flags.insert(PageFlags::DIRTY);
        self.set_flags(flags);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.flags().contains(PageFlags::DIRTY)
    }

    #[inline]
    pub fn freespace_capacity(&self) -> usize {
        self.read_u32_at(PageHeader::OFFSET_FREESPACE_CAPACITY) as usize
    }

    #[inline]
    pub fn lane_capacity(&self) -> usize {
        self.read_u32_at(PageHeader::OFFSET_LANE_CAPACITY) as usize
    }

    /// Bytes taken by the header and both register tables.
    #[inline]
    pub fn header_size(&self) -> usize {
        PageHeader::total_size(self.freespace_capacity(), self.lane_capacity())
    }

    /// Bytes available to lanes and zones.
    #[inline]
    pub fn payload_capacity(&self) -> usize {
        self.size() - self.header_size()
    }

    /// Free bytes as seen by `query`.
    pub fn free_space(&self, query: FreeSpaceQuery) -> usize {
        match query {
            FreeSpaceQuery::Approx => self.approx_free_space(),
            FreeSpaceQuery::Exact => self.largest_free_range(),
        }
    }

    /// True if both the approximate and the exact check admit `size` bytes.
    pub fn fits(&self, size: usize) -> bool {
        self.free_space(FreeSpaceQuery::Approx) >= size
            && self.free_space(FreeSpaceQuery::Exact) >= size
    }

    /// Structural equality of two pages (same id and identical bytes).
    pub fn equals(&self, other: &Page) -> bool {
        self.id() == other.id() && self.data == other.data
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    // ========================================================================
    // Raw field access (crate-internal)
    // ========================================================================

    #[inline]
    pub(crate) fn read_u32_at(&self, offset: usize) -> u32 {
        read_u32(&self.data, offset)
    }

    #[inline]
    pub(crate) fn read_u64_at(&self, offset: usize) -> u64 {
        read_u64(&self.data, offset)
    }

    #[inline]
    pub(crate) fn write_u32_at(&mut self, offset: usize, value: u32) {
        write_u32(&mut self.data, offset, value);
    }

    #[inline]
    pub(crate) fn write_u64_at(&mut self, offset: usize, value: u64) {
        write_u64(&mut self.data, offset, value);
    }

    /// Bounds-checked view of `len` bytes at `offset`.
    pub(crate) fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        assert!(
            offset + len <= self.data.len(),
            "read of {} bytes at {:#x} exceeds {} ({} bytes)",
            len,
            offset,
            self.id(),
            self.data.len()
        );
        &self.data[offset..offset + len]
    }

    /// Bounds-checked mutable view of `len` bytes at `offset`.
    pub(crate) fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        assert!(
            offset + len <= self.data.len(),
            "write of {} bytes at {:#x} exceeds {} ({} bytes)",
            len,
            offset,
            self.id(),
            self.data.len()
        );
        &mut self.data[offset..offset + len]
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("header", &self.header())
            .finish_non_exhaustive()
    }
}
