use std::collections::BTreeMap;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

use super::ColdStore;

/// Cold store holding checksummed page images in memory.
#[derive(Debug, Default)]
pub struct MemoryColdStore {
    images: BTreeMap<PageId, Vec<u8>>,
}

impl MemoryColdStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes of stored images.
    pub fn stored_bytes(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }
}

impl ColdStore for MemoryColdStore {
    fn page_ids(&self) -> Vec<PageId> {
        self.images.keys().copied().collect()
    }

    fn contains(&self, page_id: PageId) -> bool {
        self.images.contains_key(&page_id)
    }

    fn fetch(&mut self, page_id: PageId) -> Result<Page> {
        let image = self
            .images
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        Page::from_image(image.clone())
    }

    fn evict(&mut self, page: &Page) -> Result<()> {
        self.images.insert(page.id(), page.to_image());
        Ok(())
    }

    fn remove(&mut self, page_id: PageId) -> Result<()> {
        self.images
            .remove(&page_id)
            .map(|_| ())
            .ok_or(Error::PageNotFound(page_id))
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}
