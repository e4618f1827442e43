//! Lane registry.
//!
//! Each page owns a fixed-capacity registry mapping a [`LaneId`] to the
//! byte offset of that lane's header. Unused slots hold offset 0. Free ids
//! sit on a stack so that a fresh registry hands out 0, 1, 2, ...

use crate::common::{Error, LaneId, PageId, Result};

use super::freespace::{Positioning, Range};
use super::page::Page;
use super::page_header::PageHeader;
use super::pointer::{InPagePtr, NULL_OFFSET};

/// Encoded size of a lane header.
pub const LANE_HEADER_SIZE: usize = 2 * InPagePtr::SIZE + 8;

/// A lane as seen by the anti-cache: registry page plus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneHandle {
    pub page_id: PageId,
    pub lane_id: LaneId,
}

impl LaneHandle {
    pub fn new(page_id: PageId, lane_id: LaneId) -> Self {
        Self { page_id, lane_id }
    }
}

/// Lane header: the two ends of the zone chain plus the element size.
///
/// # Layout (36 bytes)
/// ```text
/// 0    14   first zone
/// 14   14   last zone
/// 28   8    elem_size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lane {
    pub first: InPagePtr,
    pub last: InPagePtr,
    pub elem_size: usize,
}

impl Lane {
    pub fn new(elem_size: usize) -> Self {
        Self {
            first: InPagePtr::NULL,
            last: InPagePtr::NULL,
            elem_size,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.first.is_null()
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        let mut elem_size = [0u8; 8];
        elem_size.copy_from_slice(&data[2 * InPagePtr::SIZE..LANE_HEADER_SIZE]);
        Self {
            first: InPagePtr::from_bytes(&data[..InPagePtr::SIZE]),
            last: InPagePtr::from_bytes(&data[InPagePtr::SIZE..2 * InPagePtr::SIZE]),
            elem_size: u64::from_le_bytes(elem_size) as usize,
        }
    }

    pub fn write_to(&self, data: &mut [u8]) {
        self.first.write_to(&mut data[..InPagePtr::SIZE]);
        self.last.write_to(&mut data[InPagePtr::SIZE..2 * InPagePtr::SIZE]);
        data[2 * InPagePtr::SIZE..LANE_HEADER_SIZE]
            .copy_from_slice(&(self.elem_size as u64).to_le_bytes());
    }
}

/// Which registry slots [`LaneIds`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    InUse,
    Free,
}

/// Backward scan over registry slots in a given state.
///
/// The iterator owns its position, so several scans over the same page can
/// be interleaved.
pub struct LaneIds<'a> {
    page: &'a Page,
    state: LaneState,
    pos: usize,
}

impl Iterator for LaneIds<'_> {
    type Item = LaneId;

    fn next(&mut self) -> Option<LaneId> {
        while self.pos > 0 {
            self.pos -= 1;
            let lane_id = LaneId::new(self.pos as u32);
            let in_use = self.page.lane_offset(lane_id).is_some();
            if in_use == (self.state == LaneState::InUse) {
                return Some(lane_id);
            }
        }
        None
    }
}

impl Page {
    pub(crate) fn init_lane_registry(&mut self) {
        let capacity = self.lane_capacity();
        for idx in 0..capacity {
            self.set_lane_offset_raw(idx, NULL_OFFSET);
            let stack_slot = self.lane_stack_slot(idx);
            self.write_u32_at(stack_slot, (capacity - 1 - idx) as u32);
        }
        self.write_u32_at(PageHeader::OFFSET_LANE_FREE_LEN, capacity as u32);
        self.write_u32_at(PageHeader::OFFSET_LANES_IN_USE, 0);
    }

    #[inline]
    pub fn lanes_in_use(&self) -> usize {
        self.read_u32_at(PageHeader::OFFSET_LANES_IN_USE) as usize
    }

    /// Height of the free lane-id stack.
    #[inline]
    pub fn lane_free_len(&self) -> usize {
        self.read_u32_at(PageHeader::OFFSET_LANE_FREE_LEN) as usize
    }

    #[inline]
    pub fn is_lane_registry_full(&self) -> bool {
        self.lane_free_len() == 0
    }

    fn lane_offset_slot(&self, idx: usize) -> usize {
        assert!(
            idx < self.lane_capacity(),
            "lane slot {idx} beyond capacity {}",
            self.lane_capacity()
        );
        PageHeader::lane_offset_table_offset(self.freespace_capacity())
            + idx * PageHeader::LANE_OFFSET_SIZE
    }

    fn lane_stack_slot(&self, pos: usize) -> usize {
        PageHeader::lane_stack_offset(self.freespace_capacity(), self.lane_capacity())
            + pos * PageHeader::LANE_ID_SIZE
    }

    fn set_lane_offset_raw(&mut self, idx: usize, offset: usize) {
        let slot = self.lane_offset_slot(idx);
        self.write_u64_at(slot, offset as u64);
    }

    /// Byte offset of a lane header, or `None` if the slot is unused.
    pub fn lane_offset(&self, lane_id: LaneId) -> Option<usize> {
        let offset = self.read_u64_at(self.lane_offset_slot(lane_id.index())) as usize;
        (offset != NULL_OFFSET).then_some(offset)
    }

    fn pop_free_lane_id(&mut self) -> Option<LaneId> {
        let len = self.lane_free_len();
        if len == 0 {
            return None;
        }
        let lane_id = LaneId::new(self.read_u32_at(self.lane_stack_slot(len - 1)));
        self.write_u32_at(PageHeader::OFFSET_LANE_FREE_LEN, (len - 1) as u32);
        Some(lane_id)
    }

    fn push_free_lane_id(&mut self, lane_id: LaneId) {
        let len = self.lane_free_len();
        assert!(len < self.lane_capacity(), "lane free-id stack overflow");
        let slot = self.lane_stack_slot(len);
        self.write_u32_at(slot, lane_id.0);
        self.write_u32_at(PageHeader::OFFSET_LANE_FREE_LEN, (len + 1) as u32);
    }

    /// Free lane ids from the top of the stack down.
    pub fn lane_free_ids(&self) -> Vec<LaneId> {
        (0..self.lane_free_len())
            .rev()
            .map(|pos| LaneId::new(self.read_u32_at(self.lane_stack_slot(pos))))
            .collect()
    }

    /// Register a new lane of `elem_size`-byte elements.
    ///
    /// # Errors
    /// - `Error::LaneRegistryFull` if no lane id is free
    /// - `Error::NoFreeSpace` if the lane header does not fit
    ///
    /// # Panics
    /// Panics if `elem_size` is zero.
    pub fn create_lane(&mut self, strategy: Positioning, elem_size: usize) -> Result<LaneId> {
        assert!(elem_size > 0, "lane element size must be non-zero");

        let lane_id = self
            .pop_free_lane_id()
            .ok_or(Error::LaneRegistryFull { page_id: self.id() })?;

        let range = match self.bind(LANE_HEADER_SIZE, strategy) {
            Ok(range) => range,
            Err(e) => {
                self.push_free_lane_id(lane_id);
                return Err(e);
            }
        };

        self.write_lane_at(range.begin, &Lane::new(elem_size));
        self.set_lane_offset_raw(lane_id.index(), range.begin);
        let in_use = self.lanes_in_use();
        self.write_u32_at(PageHeader::OFFSET_LANES_IN_USE, (in_use + 1) as u32);
        self.mark_dirty();

        Ok(lane_id)
    }

    /// Release a lane that has no zones.
    ///
    /// # Errors
    /// - `Error::LaneNotEmpty` if zones are still linked
    /// - `Error::FreeSpaceRegisterFull` if the header bytes cannot be returned
    pub fn release_lane(&mut self, lane_id: LaneId) -> Result<()> {
        let offset = self.expect_lane_offset(lane_id);
        let lane = self.read_lane_at(offset);
        if !lane.is_empty() {
            return Err(Error::LaneNotEmpty {
                page_id: self.id(),
                lane_id,
            });
        }

        if !self.has_free_register_slot() {
            self.rebuild();
        }
        self.push(Range::new(offset, offset + LANE_HEADER_SIZE))?;
        self.rebuild();

        self.bytes_mut(offset, LANE_HEADER_SIZE).fill(0);
        self.set_lane_offset_raw(lane_id.index(), NULL_OFFSET);
        self.push_free_lane_id(lane_id);
        let in_use = self.lanes_in_use();
        self.write_u32_at(PageHeader::OFFSET_LANES_IN_USE, (in_use - 1) as u32);
        self.mark_dirty();
        Ok(())
    }

    /// Lane header by id, `None` if the slot is unused.
    pub fn lane(&self, lane_id: LaneId) -> Option<Lane> {
        self.lane_offset(lane_id)
            .map(|offset| self.read_lane_at(offset))
    }

    /// Overwrite the header of an in-use lane.
    ///
    /// # Panics
    /// Panics if the slot is unused.
    pub fn write_lane(&mut self, lane_id: LaneId, lane: &Lane) {
        let offset = self.expect_lane_offset(lane_id);
        self.write_lane_at(offset, lane);
        self.mark_dirty();
    }

    pub(crate) fn expect_lane_offset(&self, lane_id: LaneId) -> usize {
        self.lane_offset(lane_id)
            .unwrap_or_else(|| panic!("{} is not in use on {}", lane_id, self.id()))
    }

    fn read_lane_at(&self, offset: usize) -> Lane {
        Lane::from_bytes(self.bytes(offset, LANE_HEADER_SIZE))
    }

    fn write_lane_at(&mut self, offset: usize, lane: &Lane) {
        lane.write_to(self.bytes_mut(offset, LANE_HEADER_SIZE));
    }

    /// Scan registry slots in `state`, highest id first.
    pub fn lane_ids(&self, state: LaneState) -> LaneIds<'_> {
        LaneIds {
            page: self,
            state,
            pos: self.lane_capacity(),
        }
    }
}
