//! FIFO (First-In-First-Out) replacement policy.

use std::collections::{HashSet, VecDeque};

use crate::common::PageId;

/// Evicts hot-store pages in the order they entered it.
///
/// Pinned pages are passed over and keep their place in the queue.
pub struct FifoReplacer {
    /// Page IDs in insertion order (front = oldest).
    queue: VecDeque<PageId>,

    /// Set for O(1) membership check.
    in_queue: HashSet<PageId>,

    /// Pages that may currently be evicted.
    evictable: HashSet<PageId>,
}

impl FifoReplacer {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_queue: HashSet::new(),
            evictable: HashSet::new(),
        }
    }

    /// Record that a page was accessed.
    ///
    /// Only a page not yet tracked is queued; re-access does not reorder.
    pub fn record_access(&mut self, page_id: PageId) {
        if self.in_queue.insert(page_id) {
            self.queue.push_back(page_id);
        }
    }

    pub fn set_evictable(&mut self, page_id: PageId, evictable: bool) {
        if evictable {
            self.evictable.insert(page_id);
        } else {
            self.evictable.remove(&page_id);
        }
    }

    /// Select the oldest evictable page and stop tracking it.
    ///
    /// Returns None if every tracked page is pinned.
    pub fn evict(&mut self) -> Option<PageId> {
        let position = self
            .queue
            .iter()
            .position(|page_id| self.evictable.contains(page_id))?;
        let page_id = self.queue.remove(position)?;
        self.in_queue.remove(&page_id);
        self.evictable.remove(&page_id);
        Some(page_id)
    }

    /// Stop tracking a page that left the hot store by other means.
    pub fn remove(&mut self, page_id: PageId) {
        if self.in_queue.remove(&page_id) {
            self.queue.retain(|&queued| queued != page_id);
        }
        self.evictable.remove(&page_id);
    }

    /// Number of evictable pages.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }

    /// Number of tracked pages.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for FifoReplacer {
    fn default() -> Self {
        Self::new()
    }
}
