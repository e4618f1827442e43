//! Anti-cache - the two-tier page store.
//!
//! The [`AntiCache`] provides:
//! - A hot store of in-memory pages, bounded by a byte limit
//! - A pluggable cold store that receives evicted pages
//! - Free-space driven page selection (`page_for`)
//! - Pin-based reference counting that blocks eviction
//! - Lane creation and zone chain maintenance across pages

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{AntiCacheStats, Frame};
use crate::common::{BufferConfig, Error, PageId, Result};
use crate::storage::cold_store::{ColdStore, MemoryColdStore};
use crate::storage::page::{
    zone_block_size, FreeSpaceQuery, InPagePtr, Lane, LaneHandle, Page, PageFlags, PageHeader,
    Positioning, PtrTarget, Range, Zone, LANE_HEADER_SIZE,
};

/// Hot/cold page store.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                          AntiCache                           │
/// │  ┌──────────────────┐  ┌──────────────┐  ┌───────────────┐   │
/// │  │ hot_store        │  │  replacer    │  │ cold_store    │   │
/// │  │ PageId → Frame   │  │ FifoReplacer │─▶│ dyn ColdStore │   │
/// │  └──────────────────┘  └──────────────┘  └───────────────┘   │
/// │  ┌──────────────────┐  ┌──────────────┐                      │
/// │  │ free_page_ids    │  │ next_page_id │                      │
/// │  │ Vec<PageId>      │  │ u32          │                      │
/// │  └──────────────────┘  └──────────────┘                      │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// A page id is in exactly one of: the hot store, the cold store, or
/// `free_page_ids`.
///
/// # Page access
/// Every accessor takes `&mut self`: looking up a cold page promotes it,
/// which may evict another page. References returned by [`page`] and
/// [`page_mut`] are therefore only valid until the next call. Operations
/// that touch several pages pin the ones they must keep in memory.
///
/// [`page`]: AntiCache::page
/// [`page_mut`]: AntiCache::page_mut
pub struct AntiCache {
    config: BufferConfig,

    hot_store: HashMap<PageId, Frame>,

    /// Hot page ids in arrival order; scans and dumps follow it.
    hot_order: Vec<PageId>,

    /// Sum of the sizes of hot pages.
    hot_bytes: usize,

    replacer: FifoReplacer,

    cold_store: Box<dyn ColdStore>,

    /// Ids of freed pages, reused before new ids are minted.
    free_page_ids: Vec<PageId>,

    next_page_id: u32,

    stats: AntiCacheStats,
}

impl AntiCache {
    /// Create an anti-cache over `cold_store`.
    ///
    /// Pages already in the cold store stay there; new ids start after the
    /// largest stored id.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if `config` does not validate.
    pub fn new(config: BufferConfig, cold_store: Box<dyn ColdStore>) -> Result<Self> {
        config.validate()?;

        let next_page_id = cold_store
            .page_ids()
            .iter()
            .map(|id| id.0 + 1)
            .max()
            .unwrap_or(0);

        debug!(
            hotstore_limit = config.hotstore_size_limit,
            default_page_size = config.default_page_size,
            cold_pages = cold_store.len(),
            "anti-cache created"
        );

        Ok(Self {
            config,
            hot_store: HashMap::new(),
            hot_order: Vec::new(),
            hot_bytes: 0,
            replacer: FifoReplacer::new(),
            cold_store,
            free_page_ids: Vec::new(),
            next_page_id,
            stats: AntiCacheStats::new(),
        })
    }

    /// Anti-cache whose cold store lives in memory.
    pub fn in_memory(config: BufferConfig) -> Result<Self> {
        Self::new(config, Box::new(MemoryColdStore::new()))
    }

    // ========================================================================
    // Public API: Inspection
    // ========================================================================

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn stats(&self) -> &AntiCacheStats {
        &self.stats
    }

    /// Hot page ids in arrival order.
    pub fn hot_page_ids(&self) -> &[PageId] {
        &self.hot_order
    }

    pub fn cold_page_ids(&self) -> Vec<PageId> {
        self.cold_store.page_ids()
    }

    /// Bytes held by the hot store.
    pub fn hot_bytes(&self) -> usize {
        self.hot_bytes
    }

    #[inline]
    pub fn is_hot(&self, page_id: PageId) -> bool {
        self.hot_store.contains_key(&page_id)
    }

    /// True if the page exists in either store.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.is_hot(page_id) || self.cold_store.contains(page_id)
    }

    /// Pin count of a hot page, `None` if the page is not hot.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        self.hot_store.get(&page_id).map(Frame::pin_count)
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Resolve a page, promoting it from the cold store if needed.
    ///
    /// # Errors
    /// `Error::PageNotFound` if neither store holds the page.
    pub fn page(&mut self, page_id: PageId) -> Result<&Page> {
        self.ensure_hot(page_id)?;
        self.hot_store
            .get(&page_id)
            .map(Frame::page)
            .ok_or(Error::PageNotFound(page_id))
    }

    /// Mutable variant of [`AntiCache::page`].
    pub fn page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        self.ensure_hot(page_id)?;
        self.hot_store
            .get_mut(&page_id)
            .map(Frame::page_mut)
            .ok_or(Error::PageNotFound(page_id))
    }

    /// Pin a page, promoting it first if it is cold. Returns the new pin
    /// count.
    pub fn pin(&mut self, page_id: PageId) -> Result<u32> {
        self.ensure_hot(page_id)?;
        let frame = self
            .hot_store
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        let count = frame.pin();
        self.replacer.set_evictable(page_id, false);
        Ok(count)
    }

    /// Drop one pin. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if the page is not hot or not pinned.
    pub fn unpin(&mut self, page_id: PageId) -> u32 {
        let frame = self
            .hot_store
            .get(&page_id)
            .unwrap_or_else(|| panic!("unpin of {page_id}, which is not in the hot store"));
        let count = frame.unpin();
        if count == 0 && frame.is_evictable() {
            self.replacer.set_evictable(page_id, true);
        }
        count
    }

    // ========================================================================
    // Public API: Page selection and lifecycle
    // ========================================================================

    /// A page with at least `size` contiguous free bytes.
    ///
    /// Search order: the favored page, the hot store, the cold store (the
    /// found page is promoted), and finally a new page.
    pub fn page_for(&mut self, size: usize, favored: Option<PageId>) -> Result<PageId> {
        self.select_page(size, favored, false)
    }

    /// Like [`AntiCache::page_for`] for a lane header; the page must also
    /// have a free lane slot.
    pub fn page_for_lane(&mut self, favored: Option<PageId>) -> Result<PageId> {
        self.select_page(LANE_HEADER_SIZE, favored, true)
    }

    /// Create a page whose payload holds at least `size` bytes.
    ///
    /// The page gets the default size if that suffices, else the maximum
    /// size, else exactly the header plus `size`.
    pub fn create_page(&mut self, size: usize) -> Result<PageId> {
        let header = PageHeader::total_size(self.config.freespace_capacity, self.config.lane_capacity);
        let required = header + size;
        let page_size = if required <= self.config.default_page_size {
            self.config.default_page_size
        } else if required <= self.config.max_page_size {
            self.config.max_page_size
        } else {
            required
        };

        let page_id = self.free_page_ids.pop().unwrap_or_else(|| {
            let page_id = PageId::new(self.next_page_id);
            self.next_page_id += 1;
            page_id
        });

        let page = match Page::create(
            page_id,
            page_size,
            PageFlags::empty(),
            self.config.freespace_capacity,
            self.config.lane_capacity,
        ) {
            Ok(page) => page,
            Err(e) => {
                self.free_page_ids.push(page_id);
                return Err(e);
            }
        };

        AntiCacheStats::bump(&self.stats.pages_created);
        debug!(page_id = %page_id, page_size, requested = size, "page created");

        self.add_page(page)?;
        Ok(page_id)
    }

    /// Push an unpinned hot page to the cold store.
    ///
    /// # Errors
    /// - `Error::PageNotFound` if the page is not hot
    /// - `Error::PagePinned` if the page is pinned
    /// - errors from the cold store, in which case the page stays hot
    pub fn evict(&mut self, page_id: PageId) -> Result<()> {
        let frame = self
            .hot_store
            .get(&page_id)
            .ok_or(Error::PageNotFound(page_id))?;
        if frame.is_pinned() {
            return Err(Error::PagePinned {
                page_id,
                pin_count: frame.pin_count(),
            });
        }

        self.cold_store.evict(frame.page())?;
        let size = self.drop_hot(page_id);

        AntiCacheStats::bump(&self.stats.evictions);
        debug!(page_id = %page_id, size, hot_bytes = self.hot_bytes, "page evicted to cold store");
        Ok(())
    }

    /// Delete a page from whichever store holds it and recycle its id.
    ///
    /// Lanes or zones on the page are gone with it; pointers into the page
    /// from other pages are not touched.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is hot and pinned
    /// - `Error::PageNotFound` if no store holds the page
    pub fn free_page(&mut self, page_id: PageId) -> Result<()> {
        if let Some(frame) = self.hot_store.get(&page_id) {
            if frame.is_pinned() {
                return Err(Error::PagePinned {
                    page_id,
                    pin_count: frame.pin_count(),
                });
            }
            self.drop_hot(page_id);
        } else {
            self.cold_store.remove(page_id)?;
        }

        self.free_page_ids.push(page_id);
        debug!(page_id = %page_id, "page freed");
        Ok(())
    }

    // ========================================================================
    // Public API: Lanes and zones
    // ========================================================================

    /// Register a lane on `page_id`.
    pub fn create_lane(
        &mut self,
        page_id: PageId,
        strategy: Positioning,
        elem_size: usize,
    ) -> Result<LaneHandle> {
        let lane_id = self.page_mut(page_id)?.create_lane(strategy, elem_size)?;
        debug!(page_id = %page_id, lane_id = %lane_id, elem_size, "lane created");
        Ok(LaneHandle::new(page_id, lane_id))
    }

    /// Header of a lane.
    ///
    /// # Panics
    /// Panics if the lane slot is not in use.
    pub fn lane(&mut self, handle: LaneHandle) -> Result<Lane> {
        let page = self.page(handle.page_id)?;
        Ok(page
            .lane(handle.lane_id)
            .unwrap_or_else(|| panic!("{} is not in use on {}", handle.lane_id, handle.page_id)))
    }

    /// Header of the zone `ptr` targets.
    pub fn zone(&mut self, ptr: InPagePtr) -> Result<Zone> {
        let (page_id, offset) = ptr.cast(PtrTarget::Zone);
        Ok(self.page(page_id)?.zone(offset))
    }

    /// Payload of the zone `ptr` targets.
    pub fn zone_data(&mut self, ptr: InPagePtr, elem_size: usize) -> Result<&[u8]> {
        let (page_id, offset) = ptr.cast(PtrTarget::Zone);
        Ok(self.page(page_id)?.zone_data(offset, elem_size))
    }

    pub fn zone_data_mut(&mut self, ptr: InPagePtr, elem_size: usize) -> Result<&mut [u8]> {
        let (page_id, offset) = ptr.cast(PtrTarget::Zone);
        Ok(self.page_mut(page_id)?.zone_data_mut(offset, elem_size))
    }

    /// Append a zone to `lane`, placing it on `target`.
    ///
    /// Returns the new zone as seen from the lane's page. Both pages stay
    /// pinned for the duration of the call.
    ///
    /// # Errors
    /// `Error::NoFreeSpace` if `target` cannot hold the zone block.
    pub fn append_zone(
        &mut self,
        lane: LaneHandle,
        target: PageId,
        strategy: Positioning,
    ) -> Result<InPagePtr> {
        self.pin(target)?;
        if let Err(e) = self.pin(lane.page_id) {
            self.unpin(target);
            return Err(e);
        }
        let result = self.append_zone_pinned(lane, target, strategy);
        self.unpin(lane.page_id);
        self.unpin(target);
        result
    }

    fn append_zone_pinned(
        &mut self,
        lane: LaneHandle,
        target: PageId,
        strategy: Positioning,
    ) -> Result<InPagePtr> {
        let mut header = self.lane(lane)?;
        let block = zone_block_size(header.elem_size);
        let range = self.page_mut(target)?.bind(block, strategy)?;

        let new_zone = InPagePtr::new(lane.page_id, target, range.begin, PtrTarget::Zone);
        let prev = if header.is_empty() {
            let lane_offset = self.page(lane.page_id)?.expect_lane_offset(lane.lane_id);
            header.first = new_zone;
            InPagePtr::new(target, lane.page_id, lane_offset, PtrTarget::Lane)
        } else {
            let old_last = header.last;
            let (last_page, last_offset) = old_last.cast(PtrTarget::Zone);
            let page = self.page_mut(last_page)?;
            let mut last_zone = page.zone(last_offset);
            last_zone.next = InPagePtr::new(last_page, target, range.begin, PtrTarget::Zone);
            page.write_zone(last_offset, &last_zone);
            old_last.stored_on(target)
        };
        header.last = new_zone;
        self.page_mut(lane.page_id)?.write_lane(lane.lane_id, &header);

        let page = self.page_mut(target)?;
        page.write_zone(
            range.begin,
            &Zone {
                prev,
                next: InPagePtr::NULL,
            },
        );
        page.zone_data_mut(range.begin, header.elem_size).fill(0);

        AntiCacheStats::bump(&self.stats.zones_appended);
        Ok(new_zone)
    }

    /// Unlink a zone from `lane` and return its block to the page's free
    /// space.
    ///
    /// # Errors
    /// `Error::FreeSpaceRegisterFull` if the zone's page cannot take the
    /// block back even after a rebuild; the chain is left untouched.
    pub fn remove_zone(&mut self, lane: LaneHandle, zone: InPagePtr) -> Result<()> {
        let (zone_page, _) = zone.cast(PtrTarget::Zone);
        self.pin(zone_page)?;
        if let Err(e) = self.pin(lane.page_id) {
            self.unpin(zone_page);
            return Err(e);
        }
        let result = self.remove_zone_pinned(lane, zone);
        self.unpin(lane.page_id);
        self.unpin(zone_page);
        result
    }

    fn remove_zone_pinned(&mut self, lane: LaneHandle, ptr: InPagePtr) -> Result<()> {
        let (zone_page, zone_offset) = ptr.cast(PtrTarget::Zone);
        let mut header = self.lane(lane)?;
        let block = zone_block_size(header.elem_size);

        {
            let page = self.page_mut(zone_page)?;
            if !page.has_free_register_slot() {
                page.rebuild();
            }
            if !page.has_free_register_slot() {
                return Err(Error::FreeSpaceRegisterFull { page_id: zone_page });
            }
        }

        let zone = self.page(zone_page)?.zone(zone_offset);
        let is_head = zone.prev.target == PtrTarget::Lane;
        let is_tail = zone.next.is_null();

        match (is_head, is_tail) {
            // lonely
            (true, true) => {
                header.first = InPagePtr::NULL;
                header.last = InPagePtr::NULL;
            }
            // head
            (true, false) => {
                header.first = zone.next.stored_on(lane.page_id);
                self.relink_prev(zone.next, zone.prev)?;
            }
            // tail
            (false, true) => {
                header.last = zone.prev.stored_on(lane.page_id);
                self.relink_next(zone.prev, InPagePtr::NULL)?;
            }
            // middle
            (false, false) => {
                self.relink_next(zone.prev, zone.next)?;
                self.relink_prev(zone.next, zone.prev)?;
            }
        }
        self.page_mut(lane.page_id)?.write_lane(lane.lane_id, &header);

        let page = self.page_mut(zone_page)?;
        page.bytes_mut(zone_offset, block).fill(0);
        page.push(Range::new(zone_offset, zone_offset + block))?;
        page.rebuild();
        page.mark_dirty();

        AntiCacheStats::bump(&self.stats.zones_removed);
        debug!(page_id = %zone_page, offset = zone_offset, lane_id = %lane.lane_id, "zone removed");
        Ok(())
    }

    /// Point the `prev` link of the zone at `zone` to `prev`.
    fn relink_prev(&mut self, zone: InPagePtr, prev: InPagePtr) -> Result<()> {
        let (page_id, offset) = zone.cast(PtrTarget::Zone);
        let page = self.page_mut(page_id)?;
        let mut header = page.zone(offset);
        header.prev = prev.stored_on(page_id);
        page.write_zone(offset, &header);
        Ok(())
    }

    /// Point the `next` link of the zone at `zone` to `next`.
    fn relink_next(&mut self, zone: InPagePtr, next: InPagePtr) -> Result<()> {
        let (page_id, offset) = zone.cast(PtrTarget::Zone);
        let page = self.page_mut(page_id)?;
        let mut header = page.zone(offset);
        header.next = next.stored_on(page_id);
        page.write_zone(offset, &header);
        Ok(())
    }

    /// Every zone of `lane`, head first, as seen from the lane's page.
    pub fn zones(&mut self, lane: LaneHandle) -> Result<Vec<InPagePtr>> {
        let mut zones = Vec::new();
        let mut ptr = self.lane(lane)?.first;
        while !ptr.is_null() {
            zones.push(ptr.stored_on(lane.page_id));
            ptr = self.zone(ptr)?.next;
        }
        Ok(zones)
    }

    /// Remove every zone of `lane`, then release its registry slot.
    pub fn release_lane(&mut self, lane: LaneHandle) -> Result<()> {
        loop {
            let first = self.lane(lane)?.first;
            if first.is_null() {
                break;
            }
            self.remove_zone(lane, first)?;
        }
        self.page_mut(lane.page_id)?.release_lane(lane.lane_id)?;
        debug!(page_id = %lane.page_id, lane_id = %lane.lane_id, "lane released");
        Ok(())
    }

    /// Layout report of every hot page, in arrival order.
    pub fn dump(&self, hex_view: bool) -> String {
        let mut out = format!(
            "# anti-cache: {} hot pages ({}/{} bytes), {} cold pages\n",
            self.hot_order.len(),
            self.hot_bytes,
            self.config.hotstore_size_limit,
            self.cold_store.len()
        );
        for page_id in &self.hot_order {
            if let Some(frame) = self.hot_store.get(page_id) {
                out.push_str(&frame.page().dump(hex_view));
            }
        }
        out
    }

    // ========================================================================
    // Internal: Hot store maintenance
    // ========================================================================

    fn ensure_hot(&mut self, page_id: PageId) -> Result<()> {
        if self.hot_store.contains_key(&page_id) {
            AntiCacheStats::bump(&self.stats.hot_hits);
            return Ok(());
        }
        if !self.cold_store.contains(page_id) {
            return Err(Error::PageNotFound(page_id));
        }
        let page = self.cold_store.fetch(page_id)?;
        self.cold_store.remove(page_id)?;
        self.promote(page)
    }

    fn promote(&mut self, page: Page) -> Result<()> {
        AntiCacheStats::bump(&self.stats.cold_fetches);
        debug!(page_id = %page.id(), size = page.size(), "page promoted from cold store");
        self.add_page(page)
    }

    /// Insert a page into the hot store, then evict until the limit holds.
    fn add_page(&mut self, page: Page) -> Result<()> {
        let page_id = page.id();
        self.hot_bytes += page.size();

        let frame = Frame::new(page);
        let evictable = frame.is_evictable();
        self.hot_store.insert(page_id, frame);
        self.hot_order.push(page_id);
        self.replacer.record_access(page_id);
        self.replacer.set_evictable(page_id, evictable);

        self.enforce_limit(page_id)
    }

    /// Evict the oldest unpinned pages while the hot store is over its
    /// limit. `protect` is never chosen.
    fn enforce_limit(&mut self, protect: PageId) -> Result<()> {
        if self.hot_bytes <= self.config.hotstore_size_limit {
            return Ok(());
        }

        self.replacer.set_evictable(protect, false);
        let mut result = Ok(());
        while self.hot_bytes > self.config.hotstore_size_limit {
            let Some(victim) = self.replacer.evict() else {
                warn!(
                    hot_bytes = self.hot_bytes,
                    limit = self.config.hotstore_size_limit,
                    "hot store over limit but no page can be evicted"
                );
                break;
            };
            if let Err(e) = self.evict(victim) {
                self.replacer.record_access(victim);
                self.replacer.set_evictable(victim, true);
                result = Err(e);
                break;
            }
        }
        if self.hot_store.get(&protect).is_some_and(Frame::is_evictable) {
            self.replacer.set_evictable(protect, true);
        }
        result
    }

    /// Remove a page from the hot store. Returns its size.
    fn drop_hot(&mut self, page_id: PageId) -> usize {
        let size = self
            .hot_store
            .remove(&page_id)
            .map(|frame| frame.page().size())
            .unwrap_or(0);
        self.hot_order.retain(|&id| id != page_id);
        self.hot_bytes -= size;
        self.replacer.remove(page_id);
        size
    }

    fn select_page(
        &mut self,
        size: usize,
        favored: Option<PageId>,
        needs_lane_slot: bool,
    ) -> Result<PageId> {
        let suits = |page: &Page| {
            page.free_space(FreeSpaceQuery::Approx) >= size
                && page.free_space(FreeSpaceQuery::Exact) >= size
                && (!needs_lane_slot || !page.is_lane_registry_full())
        };

        if let Some(page_id) = favored.filter(|&id| self.contains(id)) {
            if suits(self.page(page_id)?) {
                return Ok(page_id);
            }
        }

        let hot = self.hot_order.iter().copied().find(|page_id| {
            self.hot_store
                .get(page_id)
                .is_some_and(|frame| suits(frame.page()))
        });
        if let Some(page_id) = hot {
            AntiCacheStats::bump(&self.stats.hot_hits);
            return Ok(page_id);
        }

        for page_id in self.cold_store.page_ids() {
            let page = self.cold_store.fetch(page_id)?;
            if suits(&page) {
                self.cold_store.remove(page_id)?;
                self.promote(page)?;
                return Ok(page_id);
            }
        }

        if needs_lane_slot {
            self.create_page(LANE_HEADER_SIZE)
        } else {
            self.create_page(size)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
