//! File-backed cold store.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

use super::ColdStore;

/// Size of the slot header preceding every image.
const SLOT_HEADER_SIZE: u64 = 4 + 8 + 8;

/// A region of the file able to hold one page image.
#[derive(Debug, Clone, Copy)]
struct Slot {
    /// File offset of the slot header.
    offset: u64,
    /// Image bytes the slot can hold.
    capacity: u64,
    /// Page stored here and its image length, `None` if the slot is free.
    page: Option<(PageId, u64)>,
}

impl Slot {
    fn image_offset(&self) -> u64 {
        self.offset + SLOT_HEADER_SIZE
    }
}

/// Cold store that keeps page images in reusable slots of a single file.
///
/// # File Layout
/// ```text
/// ┌──────────┬──────────┬──────────┬────────────────┬──────────┬─────
/// │ page_id  │ capacity │ len      │ image          │ page_id  │ ...
/// │ (4B)     │ (8B)     │ (8B)     │ (capacity B)   │ (4B)     │
/// └──────────┴──────────┴──────────┴────────────────┴──────────┴─────
/// ```
///
/// A page is rewritten in place while its image fits its slot. A slot
/// with `len = 0` is free and is handed to the next page that fits, so
/// evicting and promoting the same pages does not grow the file. A page
/// that outgrows its slot moves to another one; the new image is written
/// before the old slot is freed.
///
/// # Durability
/// Every write is followed by `fsync()`.
pub struct FileColdStore {
    file: File,
    slots: Vec<Slot>,
    /// Live pages: index into `slots`.
    directory: BTreeMap<PageId, usize>,
    end: u64,
}

impl FileColdStore {
    /// Create a new cold-store file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            slots: Vec::new(),
            directory: BTreeMap::new(),
            end: 0,
        })
    }

    /// Open an existing cold-store file and rebuild its slot table.
    ///
    /// # Errors
    /// - I/O errors from opening or reading the file
    /// - `Error::CorruptPageImage` if the file ends inside a slot or a
    ///   slot claims more bytes than it holds
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let file_size = file.metadata()?.len();

        let mut slots = Vec::new();
        let mut directory = BTreeMap::new();
        let mut pos = 0u64;
        while pos < file_size {
            if pos + SLOT_HEADER_SIZE > file_size {
                return Err(Error::CorruptPageImage {
                    reason: format!("truncated slot header at offset {pos}"),
                });
            }
            let mut header = [0u8; SLOT_HEADER_SIZE as usize];
            file.seek(SeekFrom::Start(pos))?;
            file.read_exact(&mut header)?;

            let page_id = PageId::new(u32::from_le_bytes([
                header[0], header[1], header[2], header[3],
            ]));
            let capacity = read_u64(&header[4..12]);
            let len = read_u64(&header[12..20]);

            let image_offset = pos + SLOT_HEADER_SIZE;
            if image_offset + capacity > file_size || len > capacity {
                return Err(Error::CorruptPageImage {
                    reason: format!("slot at offset {pos} runs past end of file"),
                });
            }

            let mut slot = Slot {
                offset: pos,
                capacity,
                page: None,
            };
            if len > 0 {
                slot.page = Some((page_id, len));
                // A crash during a move can leave two images; the later slot wins.
                if let Some(stale) = directory.insert(page_id, slots.len()) {
                    let stale: &mut Slot = &mut slots[stale];
                    stale.page = None;
                }
            }
            slots.push(slot);
            pos = image_offset + capacity;
        }

        Ok(Self {
            file,
            slots,
            directory,
            end: file_size,
        })
    }

    /// Open an existing cold-store file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Current size of the file in bytes, free slots included.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.end
    }

    /// Number of slots not holding a page.
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.page.is_none()).count()
    }

    /// Smallest free slot able to hold `len` bytes.
    fn find_free_slot(&self, len: u64) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.page.is_none() && slot.capacity >= len)
            .min_by_key(|(_, slot)| slot.capacity)
            .map(|(idx, _)| idx)
    }

    fn write_slot(&mut self, idx: usize, page_id: PageId, image: &[u8]) -> Result<()> {
        let slot = self.slots[idx];
        self.file.seek(SeekFrom::Start(slot.offset))?;
        self.file.write_all(&page_id.0.to_le_bytes())?;
        self.file.write_all(&slot.capacity.to_le_bytes())?;
        self.file.write_all(&(image.len() as u64).to_le_bytes())?;
        self.file.write_all(image)?;
        self.file.sync_all()?;

        self.slots[idx].page = (!image.is_empty()).then_some((page_id, image.len() as u64));
        Ok(())
    }

    fn push_slot(&mut self, capacity: u64) -> usize {
        self.slots.push(Slot {
            offset: self.end,
            capacity,
            page: None,
        });
        self.end += SLOT_HEADER_SIZE + capacity;
        self.slots.len() - 1
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

impl ColdStore for FileColdStore {
    fn page_ids(&self) -> Vec<PageId> {
        self.directory.keys().copied().collect()
    }

    fn contains(&self, page_id: PageId) -> bool {
        self.directory.contains_key(&page_id)
    }

    fn fetch(&mut self, page_id: PageId) -> Result<Page> {
        let &idx = self
            .directory
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        let slot = self.slots[idx];
        let len = slot.page.map_or(0, |(_, len)| len);

        let mut image = vec![0u8; len as usize];
        self.file.seek(SeekFrom::Start(slot.image_offset()))?;
        self.file.read_exact(&mut image)?;

        let page = Page::from_image(image)?;
        if page.id() != page_id {
            return Err(Error::CorruptPageImage {
                reason: format!("slot for {page_id} holds {}", page.id()),
            });
        }
        Ok(page)
    }

    fn evict(&mut self, page: &Page) -> Result<()> {
        let page_id = page.id();
        let image = page.to_image();
        let len = image.len() as u64;

        let current = self.directory.get(&page_id).copied();
        if let Some(idx) = current.filter(|&idx| self.slots[idx].capacity >= len) {
            return self.write_slot(idx, page_id, &image);
        }

        let idx = match self.find_free_slot(len) {
            Some(idx) => idx,
            None => self.push_slot(len),
        };
        self.write_slot(idx, page_id, &image)?;
        if let Some(old) = current {
            self.write_slot(old, page_id, &[])?;
        }
        self.directory.insert(page_id, idx);
        Ok(())
    }

    fn remove(&mut self, page_id: PageId) -> Result<()> {
        let idx = *self
            .directory
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        self.write_slot(idx, page_id, &[])?;
        self.directory.remove(&page_id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.directory.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{PageFlags, Positioning};
    use tempfile::tempdir;

    fn page(id: u32) -> Page {
        Page::create(PageId::new(id), 2048, PageFlags::empty(), 4, 2).unwrap()
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cold.db");

        FileColdStore::create(&path).unwrap();
        assert!(FileColdStore::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(FileColdStore::open(dir.path().join("missing.db")).is_err());
    }

    #[test]
    fn test_evict_and_fetch() {
        let dir = tempdir().unwrap();
        let mut store = FileColdStore::create(dir.path().join("cold.db")).unwrap();

        let mut original = page(7);
        let lane_id = original.create_lane(Positioning::FirstFit, 32).unwrap();
        store.evict(&original).unwrap();

        let fetched = store.fetch(PageId::new(7)).unwrap();
        assert_eq!(fetched.lane(lane_id).unwrap().elem_size, 32);
        assert_eq!(store.file_size(), SLOT_HEADER_SIZE + 2048);
    }

    #[test]
    fn test_newer_image_supersedes_older() {
        let dir = tempdir().unwrap();
        let mut store = FileColdStore::create(dir.path().join("cold.db")).unwrap();

        let mut p = page(1);
        store.evict(&p).unwrap();
        p.create_lane(Positioning::FirstFit, 8).unwrap();
        store.evict(&p).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.fetch(PageId::new(1)).unwrap().lanes_in_use(), 1);
        // Same-size image is rewritten in place.
        assert_eq!(store.file_size(), SLOT_HEADER_SIZE + 2048);
    }

    #[test]
    fn test_evict_remove_cycles_reuse_slot() {
        let dir = tempdir().unwrap();
        let mut store = FileColdStore::create(dir.path().join("cold.db")).unwrap();

        for _ in 0..100 {
            store.evict(&page(3)).unwrap();
            store.fetch(PageId::new(3)).unwrap();
            store.remove(PageId::new(3)).unwrap();
        }
        assert!(store.is_empty());
        assert_eq!(store.file_size(), SLOT_HEADER_SIZE + 2048);
        assert_eq!(store.free_slots(), 1);
    }

    #[test]
    fn test_free_slot_goes_to_another_page() {
        let dir = tempdir().unwrap();
        let mut store = FileColdStore::create(dir.path().join("cold.db")).unwrap();

        store.evict(&page(0)).unwrap();
        store.remove(PageId::new(0)).unwrap();
        store.evict(&page(1)).unwrap();

        assert_eq!(store.page_ids(), vec![PageId::new(1)]);
        assert_eq!(store.file_size(), SLOT_HEADER_SIZE + 2048);
        assert_eq!(store.free_slots(), 0);
    }

    #[test]
    fn test_grown_page_moves_and_frees_old_slot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cold.db");

        {
            let mut store = FileColdStore::create(&path).unwrap();
            store.evict(&page(5)).unwrap();
            let big = Page::create(PageId::new(5), 4096, PageFlags::empty(), 4, 2).unwrap();
            store.evict(&big).unwrap();

            assert_eq!(store.file_size(), 2 * SLOT_HEADER_SIZE + 2048 + 4096);
            assert_eq!(store.free_slots(), 1);
            assert_eq!(store.fetch(PageId::new(5)).unwrap().size(), 4096);

            // The freed small slot is reused by a page that fits.
            store.evict(&page(6)).unwrap();
            assert_eq!(store.free_slots(), 0);
            assert_eq!(store.file_size(), 2 * SLOT_HEADER_SIZE + 2048 + 4096);
        }

        let mut store = FileColdStore::open(&path).unwrap();
        assert_eq!(store.page_ids(), vec![PageId::new(5), PageId::new(6)]);
        assert_eq!(store.fetch(PageId::new(5)).unwrap().size(), 4096);
        assert_eq!(store.fetch(PageId::new(6)).unwrap().size(), 2048);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cold.db");

        {
            let mut store = FileColdStore::create(&path).unwrap();
            store.evict(&page(0)).unwrap();
            store.evict(&page(1)).unwrap();
            store.evict(&page(2)).unwrap();
            store.remove(PageId::new(1)).unwrap();
        }

        {
            let mut store = FileColdStore::open(&path).unwrap();
            assert_eq!(store.page_ids(), vec![PageId::new(0), PageId::new(2)]);
            assert_eq!(store.fetch(PageId::new(2)).unwrap().id(), PageId::new(2));
            assert!(matches!(
                store.fetch(PageId::new(1)),
                Err(Error::PageNotFound(_))
            ));
        }
    }

    #[test]
    fn test_open_or_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cold.db");

        {
            let mut store = FileColdStore::open_or_create(&path).unwrap();
            assert!(store.is_empty());
            store.evict(&page(4)).unwrap();
        }

        {
            let store = FileColdStore::open_or_create(&path).unwrap();
            assert!(store.contains(PageId::new(4)));
        }
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cold.db");
        {
            let mut store = FileColdStore::create(&path).unwrap();
            store.evict(&page(0)).unwrap();
        }
        let file = OpenOptions::new().write(true).open(&path).unwrap();
        file.set_len(100).unwrap();

        assert!(matches!(
            FileColdStore::open(&path),
            Err(Error::CorruptPageImage { .. })
        ));
    }
}
