//! Zones: the data blocks of a lane.

use super::page::Page;
use super::pointer::InPagePtr;

/// Encoded size of a zone header (prev + next).
pub const ZONE_HEADER_SIZE: usize = 2 * InPagePtr::SIZE;

/// Smallest block a zone occupies.
pub const MIN_DATA_SIZE: usize = ZONE_HEADER_SIZE + InPagePtr::SIZE;

/// Bytes bound for one zone of a lane with `elem_size`-byte elements.
#[inline]
pub const fn zone_block_size(elem_size: usize) -> usize {
    ZONE_HEADER_SIZE + elem_size
}

/// Zone header.
///
/// `prev` targets the owning lane when the zone heads the chain, the
/// previous zone otherwise. `next` is null for the tail.
///
/// # Layout
/// ```text
/// 0    14   prev
/// 14   14   next
/// 28   ..   data (elem_size bytes)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    pub prev: InPagePtr,
    pub next: InPagePtr,
}

impl Zone {
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            prev: InPagePtr::from_bytes(&data[..InPagePtr::SIZE]),
            next: InPagePtr::from_bytes(&data[InPagePtr::SIZE..ZONE_HEADER_SIZE]),
        }
    }

    pub fn write_to(&self, data: &mut [u8]) {
        self.prev.write_to(&mut data[..InPagePtr::SIZE]);
        self.next.write_to(&mut data[InPagePtr::SIZE..ZONE_HEADER_SIZE]);
    }
}

impl Page {
    /// Zone header at `offset`.
    pub fn zone(&self, offset: usize) -> Zone {
        Zone::from_bytes(self.bytes(offset, ZONE_HEADER_SIZE))
    }

    pub fn write_zone(&mut self, offset: usize, zone: &Zone) {
        zone.write_to(self.bytes_mut(offset, ZONE_HEADER_SIZE));
        self.mark_dirty();
    }

    /// Payload of the zone at `offset`.
    pub fn zone_data(&self, offset: usize, elem_size: usize) -> &[u8] {
        self.bytes(offset + ZONE_HEADER_SIZE, elem_size)
    }

    pub fn zone_data_mut(&mut self, offset: usize, elem_size: usize) -> &mut [u8] {
        self.mark_dirty();
        self.bytes_mut(offset + ZONE_HEADER_SIZE, elem_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PageId;
    use crate::storage::page::{PageFlags, Positioning, PtrTarget};

    #[test]
    fn test_block_size() {
        assert_eq!(ZONE_HEADER_SIZE, 28);
        assert_eq!(zone_block_size(16), 44);
        assert_eq!(MIN_DATA_SIZE, 42);
    }

    #[test]
    fn test_zone_header_and_payload() {
        let mut page = Page::create(PageId::new(2), 4096, PageFlags::empty(), 8, 4).unwrap();
        let range = page.bind(zone_block_size(8), Positioning::FirstFit).unwrap();

        let zone = Zone {
            prev: InPagePtr::new(page.id(), PageId::new(9), 300, PtrTarget::Lane),
            next: InPagePtr::NULL,
        };
        page.write_zone(range.begin, &zone);
        page.zone_data_mut(range.begin, 8).copy_from_slice(&[7u8; 8]);

        assert_eq!(page.zone(range.begin), zone);
        assert!(page.zone(range.begin).prev.is_far);
        assert_eq!(page.zone_data(range.begin, 8), &[7u8; 8]);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_payload_past_page_end_panics() {
        let page = Page::create(PageId::new(2), 4096, PageFlags::empty(), 8, 4).unwrap();
        page.zone_data(4096 - ZONE_HEADER_SIZE, 1);
    }
}
