//! Frame - a hot-store slot.
//!
//! A [`Frame`] owns one in-memory [`Page`] plus the pin count that keeps it
//! from being evicted while a cursor or an allocation is using it.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::common::PageId;
use crate::storage::page::{Page, PageFlags};

/// A page resident in the hot store.
///
/// Unlike a fixed-pool frame, a hot-store frame is created together with its
/// page and dropped when the page leaves memory; it is never reused.
pub struct Frame {
    page: Page,

    /// Number of active users of this page.
    pin_count: AtomicU32,
}

impl Frame {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            pin_count: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page.id()
    }

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[inline]
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Give up the frame, returning its page.
    pub fn into_page(self) -> Page {
        self.page
    }

    // ========================================================================
    // Pin count operations (Atomic)
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow on {}", self.page_id());
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Unpinned and not marked fixed.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        !self.is_pinned() && !self.page.flags().contains(PageFlags::FIXED)
    }
}
