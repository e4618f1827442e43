//! Cursor - caller-facing handle over a lane.
//!
//! A [`Cursor`] walks the zones of one lane and reads or writes their
//! payloads. It pins what it is looking at: the lane's page while opened,
//! and the page of the current zone. Pins are dropped on [`Cursor::close`]
//! and when the cursor is dropped.
//!
//! # State machine
//! ```text
//!            open                 next (more zones)
//! Closed ──────────▶ Opened ──────────────────────┐
//!   ▲                  │  ▲                       │
//!   │  close / next    │  └───────────────────────┘
//!   └──(exhausted)─────┘
//! ```

use crate::buffer::BufferManager;
use crate::common::{PageId, Result};
use crate::storage::page::{InPagePtr, LaneHandle, PtrTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Opened,
    Closed,
}

/// Iterator-like handle over the zones of a lane.
///
/// Misuse (opening twice, reading while closed or before the first
/// `next`, writing past the element size) panics.
///
/// # Example
/// ```ignore
/// let mut cursor = manager.buf_alloc(16, 3, Positioning::FirstFit)?;
/// cursor.open()?;
/// while cursor.next()? {
///     cursor.write(0, &[0xAA; 16])?;
/// }
/// // cursor closed itself after the last zone
/// ```
pub struct Cursor<'a> {
    manager: &'a BufferManager,
    lane: LaneHandle,
    elem_size: usize,
    zone: Option<InPagePtr>,
    state: CursorState,
    /// Page of the current zone, pinned by this cursor.
    zone_pin: Option<PageId>,
    lane_pinned: bool,
}

impl<'a> Cursor<'a> {
    /// Called by `BufferManager::buf_alloc()`.
    pub(crate) fn new(manager: &'a BufferManager, lane: LaneHandle, elem_size: usize) -> Self {
        Self {
            manager,
            lane,
            elem_size,
            zone: None,
            state: CursorState::Closed,
            zone_pin: None,
            lane_pinned: false,
        }
    }

    #[inline]
    pub fn lane(&self) -> LaneHandle {
        self.lane
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    #[inline]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// The current zone, `None` before the first `next`.
    #[inline]
    pub fn zone(&self) -> Option<InPagePtr> {
        self.zone
    }

    /// Open the cursor, positioned before the first zone.
    ///
    /// # Panics
    /// Panics if the cursor is already opened.
    pub fn open(&mut self) -> Result<()> {
        assert!(
            self.state != CursorState::Opened,
            "block was already opened ({} on {})",
            self.lane.lane_id,
            self.lane.page_id
        );
        self.manager.lock().pin(self.lane.page_id)?;
        self.lane_pinned = true;
        self.zone = None;
        self.state = CursorState::Opened;
        Ok(())
    }

    /// Advance to the next zone.
    ///
    /// Returns false when the cursor is closed or no zone follows. Running
    /// out of zones closes the cursor, including on a lane left empty.
    pub fn next(&mut self) -> Result<bool> {
        if self.state == CursorState::Closed {
            return Ok(false);
        }

        let next = {
            let mut cache = self.manager.lock();
            match self.zone {
                None => cache.lane(self.lane)?.first,
                Some(current) => cache.zone(current)?.next,
            }
        };

        if next.is_null() {
            self.close();
            return Ok(false);
        }

        self.move_to(Some(next))?;
        Ok(true)
    }

    /// Hand the current zone's payload to `consumer`.
    ///
    /// # Panics
    /// Panics if the cursor is not opened or has no current zone.
    pub fn read<R, F>(&self, consumer: F) -> Result<R>
    where
        F: FnOnce(&[u8]) -> R,
    {
        let zone = self.current("read");
        let mut cache = self.manager.lock();
        let data = cache.zone_data(zone, self.elem_size)?;
        Ok(consumer(data))
    }

    /// Copy `data` into the current zone's payload at `offset`.
    ///
    /// # Panics
    /// Panics if the cursor is not opened, has no current zone, or if
    /// `offset + data.len()` exceeds the element size.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let zone = self.current("write");
        assert!(
            offset + data.len() <= self.elem_size,
            "write of {} bytes at offset {} exceeds element size {}",
            data.len(),
            offset,
            self.elem_size
        );
        let mut cache = self.manager.lock();
        let payload = cache.zone_data_mut(zone, self.elem_size)?;
        payload[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Remove the current zone from the lane.
    ///
    /// The cursor steps back so that the following `next` yields the zone
    /// after the removed one.
    ///
    /// # Panics
    /// Panics if the cursor is not opened or has no current zone.
    pub fn remove_current(&mut self) -> Result<()> {
        let zone = self.current("remove");
        let prev = {
            let mut cache = self.manager.lock();
            let prev = cache.zone(zone)?.prev;
            // Drop our pin first so the zone's page is only held by the call.
            if let Some(page_id) = self.zone_pin.take() {
                cache.unpin(page_id);
            }
            cache.remove_zone(self.lane, zone)?;
            prev
        };

        let back = (!prev.is_null() && prev.target == PtrTarget::Zone)
            .then_some(prev);
        self.zone = None;
        self.move_to(back)
    }

    /// Close the cursor and drop its pins. Idempotent.
    pub fn close(&mut self) {
        if self.state == CursorState::Closed && !self.lane_pinned && self.zone_pin.is_none() {
            return;
        }
        let mut cache = self.manager.lock();
        if let Some(page_id) = self.zone_pin.take() {
            cache.unpin(page_id);
        }
        if self.lane_pinned {
            cache.unpin(self.lane.page_id);
            self.lane_pinned = false;
        }
        self.zone = None;
        self.state = CursorState::Closed;
    }

    fn current(&self, op: &str) -> InPagePtr {
        assert!(
            self.state == CursorState::Opened,
            "block must be opened before {op} ({} on {})",
            self.lane.lane_id,
            self.lane.page_id
        );
        self.zone.unwrap_or_else(|| {
            panic!(
                "{op} on illegal zone: {} on {} has no current zone",
                self.lane.lane_id, self.lane.page_id
            )
        })
    }

    /// Make `zone` current, moving the zone pin along.
    fn move_to(&mut self, zone: Option<InPagePtr>) -> Result<()> {
        let mut cache = self.manager.lock();
        let target = zone.map(|ptr| ptr.page_id);
        if target != self.zone_pin {
            if let Some(page_id) = target {
                cache.pin(page_id)?;
            }
            if let Some(page_id) = std::mem::replace(&mut self.zone_pin, target) {
                cache.unpin(page_id);
            }
        }
        self.zone = zone;
        Ok(())
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::BufferConfig;
    use crate::storage::page::Positioning;

    fn manager() -> BufferManager {
        BufferManager::in_memory(
            BufferConfig::default()
                .with_hotstore_size_limit(64 * 1024)
                .with_default_page_size(4096)
                .with_max_page_size(16 * 1024)
                .with_freespace_capacity(8)
                .with_lane_capacity(4),
        )
        .unwrap()
    }

    #[test]
    fn test_write_then_read_each_zone() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 4, Positioning::FirstFit).unwrap();

        cursor.open().unwrap();
        let mut i = 0u64;
        while cursor.next().unwrap() {
            cursor.write(0, &i.to_le_bytes()).unwrap();
            i += 1;
        }
        assert_eq!(i, 4);
        assert_eq!(cursor.state(), CursorState::Closed);

        cursor.open().unwrap();
        let mut seen = Vec::new();
        while cursor.next().unwrap() {
            let value = cursor
                .read(|data| u64::from_le_bytes(data.try_into().unwrap()))
                .unwrap();
            seen.push(value);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_next_on_closed_cursor() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
        assert!(!cursor.next().unwrap());
        assert_eq!(cursor.state(), CursorState::Closed);
    }

    #[test]
    fn test_close_is_idempotent_and_unpins() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 2, Positioning::FirstFit).unwrap();
        let page_id = cursor.lane().page_id;

        cursor.open().unwrap();
        assert!(cursor.next().unwrap());
        assert_eq!(manager.lock().pin_count(page_id), Some(2));

        cursor.close();
        cursor.close();
        assert_eq!(cursor.zone(), None);
        assert_eq!(manager.lock().pin_count(page_id), Some(0));
    }

    #[test]
    fn test_drop_unpins() {
        let manager = manager();
        let page_id = {
            let mut cursor = manager.buf_alloc(8, 2, Positioning::FirstFit).unwrap();
            cursor.open().unwrap();
            cursor.next().unwrap();
            cursor.lane().page_id
        };
        assert_eq!(manager.lock().pin_count(page_id), Some(0));
    }

    #[test]
    #[should_panic(expected = "block was already opened")]
    fn test_double_open_panics() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
        cursor.open().unwrap();
        cursor.open().unwrap();
    }

    #[test]
    #[should_panic(expected = "block must be opened")]
    fn test_write_when_closed_panics() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
        cursor.write(0, &[1]).unwrap();
    }

    #[test]
    #[should_panic(expected = "illegal zone")]
    fn test_read_before_next_panics() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
        cursor.open().unwrap();
        cursor.read(|_| ()).unwrap();
    }

    #[test]
    #[should_panic(expected = "exceeds element size")]
    fn test_write_past_element_panics() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
        cursor.open().unwrap();
        cursor.next().unwrap();
        cursor.write(4, &[0u8; 5]).unwrap();
    }

    #[test]
    fn test_remove_current_continues_with_following_zone() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(1, 4, Positioning::FirstFit).unwrap();
        cursor.open().unwrap();
        let mut tag = 0u8;
        while cursor.next().unwrap() {
            cursor.write(0, &[tag]).unwrap();
            tag += 1;
        }

        // Drop zones 0 and 2.
        cursor.open().unwrap();
        let mut index = 0;
        while cursor.next().unwrap() {
            if index % 2 == 0 {
                cursor.remove_current().unwrap();
            }
            index += 1;
        }

        cursor.open().unwrap();
        let mut left = Vec::new();
        while cursor.next().unwrap() {
            left.push(cursor.read(|data| data[0]).unwrap());
        }
        assert_eq!(left, vec![1, 3]);
    }

    #[test]
    fn test_next_on_emptied_lane_closes() {
        let manager = manager();
        let mut cursor = manager.buf_alloc(8, 1, Positioning::FirstFit).unwrap();
        let page_id = cursor.lane().page_id;

        cursor.open().unwrap();
        assert!(cursor.next().unwrap());
        cursor.remove_current().unwrap();
        assert_eq!(cursor.zone(), None);

        assert!(!cursor.next().unwrap());
        assert_eq!(cursor.state(), CursorState::Closed);
        assert_eq!(manager.lock().pin_count(page_id), Some(0));

        // Reopening an empty lane closes on the first next.
        cursor.open().unwrap();
        assert!(!cursor.next().unwrap());
        assert_eq!(cursor.state(), CursorState::Closed);
        assert_eq!(manager.lock().pin_count(page_id), Some(0));
    }
}
