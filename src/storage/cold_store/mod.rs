//! Cold store - where evicted pages live.
//!
//! The anti-cache keeps its working set in memory (the hot store) and
//! pushes pages it cannot hold into a [`ColdStore`]. A page is in exactly
//! one of the two stores at any time; the anti-cache removes it from the
//! cold store when it promotes it back.
//!
//! Implementations:
//! - [`MemoryColdStore`] - page images kept in memory
//! - [`FileColdStore`] - page images in reusable slots of one file

mod file;
mod memory;

pub use file::FileColdStore;
pub use memory::MemoryColdStore;

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Backing store for evicted pages.
///
/// `fetch` returns a copy; the stored image stays until `remove` is called.
pub trait ColdStore: Send {
    /// Ids of every stored page, ascending.
    fn page_ids(&self) -> Vec<PageId>;

    fn contains(&self, page_id: PageId) -> bool;

    /// Load a copy of a stored page.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page is not stored.
    fn fetch(&mut self, page_id: PageId) -> Result<Page>;

    /// Store a page image, replacing an older image of the same page.
    fn evict(&mut self, page: &Page) -> Result<()>;

    /// Drop a stored page.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page is not stored.
    fn remove(&mut self, page_id: PageId) -> Result<()>;

    fn len(&self) -> usize {
        self.page_ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
