//! Buffer manager - the locked entry point to the anti-cache.

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::buffer::{AntiCache, Cursor, StatsSnapshot};
use crate::common::{BufferConfig, Error, Result};
use crate::storage::cold_store::ColdStore;
use crate::storage::page::{zone_block_size, LaneHandle, Positioning};

/// Shared handle to an [`AntiCache`].
///
/// One mutex guards the whole anti-cache; every operation, including the
/// cursor calls, takes it for its duration. Cursors borrow the manager, so
/// several of them can be in use at once.
///
/// # Usage
/// ```
/// use gridstore::{BufferConfig, BufferManager};
/// use gridstore::storage::page::Positioning;
///
/// let config = BufferConfig::default()
///     .with_hotstore_size_limit(1 << 20)
///     .with_default_page_size(4096)
///     .with_max_page_size(16 * 1024);
/// let manager = BufferManager::in_memory(config).unwrap();
///
/// let mut cursor = manager.buf_alloc(8, 3, Positioning::FirstFit).unwrap();
/// cursor.open().unwrap();
/// let mut zones = 0;
/// while cursor.next().unwrap() {
///     cursor.write(0, &[zones; 8]).unwrap();
///     zones += 1;
/// }
/// assert_eq!(zones, 3);
/// ```
pub struct BufferManager {
    cache: Mutex<AntiCache>,
}

impl BufferManager {
    /// # Errors
    /// `Error::InvalidConfig` if `config` does not validate. This is a
    /// deployment mistake; callers are expected to treat it as fatal at
    /// startup rather than retry.
    pub fn new(config: BufferConfig, cold_store: Box<dyn ColdStore>) -> Result<Self> {
        Ok(Self {
            cache: Mutex::new(AntiCache::new(config, cold_store)?),
        })
    }

    pub fn in_memory(config: BufferConfig) -> Result<Self> {
        Ok(Self {
            cache: Mutex::new(AntiCache::in_memory(config)?),
        })
    }

    /// Exclusive access to the anti-cache.
    pub fn lock(&self) -> MutexGuard<'_, AntiCache> {
        self.cache.lock()
    }

    /// Allocate a lane of `n_zones` zones with `elem_size` bytes each.
    ///
    /// The lane goes on a page with room for its header and a free lane
    /// slot. Each zone favors the page the previous one went to.
    ///
    /// # Panics
    /// Panics if `elem_size` or `n_zones` is zero.
    pub fn buf_alloc(
        &self,
        elem_size: usize,
        n_zones: usize,
        strategy: Positioning,
    ) -> Result<Cursor<'_>> {
        assert!(elem_size > 0, "element size must be non-zero");
        assert!(n_zones > 0, "a lane needs at least one zone");

        let mut cache = self.cache.lock();
        let lane_page = cache.page_for_lane(None)?;
        let lane = cache.create_lane(lane_page, strategy, elem_size)?;

        cache.pin(lane_page)?;
        let appended = Self::append_zones(&mut cache, lane, elem_size, n_zones, strategy);
        cache.unpin(lane_page);

        if let Err(e) = appended {
            if let Err(cleanup) = cache.release_lane(lane) {
                warn!(page_id = %lane.page_id, lane_id = %lane.lane_id, error = %cleanup, "lane leaked after failed allocation");
            }
            return Err(e);
        }

        debug!(page_id = %lane.page_id, lane_id = %lane.lane_id, elem_size, n_zones, "buffer allocated");
        Ok(Cursor::new(self, lane, elem_size))
    }

    fn append_zones(
        cache: &mut AntiCache,
        lane: LaneHandle,
        elem_size: usize,
        n_zones: usize,
        strategy: Positioning,
    ) -> Result<()> {
        let block = zone_block_size(elem_size);
        let mut favored = Some(lane.page_id);

        for _ in 0..n_zones {
            let target = cache.page_for(block, favored)?;
            let zone = match cache.append_zone(lane, target, strategy) {
                Ok(zone) => zone,
                Err(Error::NoFreeSpace { .. }) => {
                    let fresh = cache.create_page(block)?;
                    cache.append_zone(lane, fresh, strategy)?
                }
                Err(e) => return Err(e),
            };
            favored = Some(zone.page_id);
        }
        Ok(())
    }

    /// Release a lane and all of its zones.
    pub fn buf_free(&self, cursor: Cursor<'_>) -> Result<()> {
        let lane = cursor.lane();
        drop(cursor);
        self.cache.lock().release_lane(lane)
    }

    /// Layout report of every hot page.
    pub fn dump(&self, hex_view: bool) -> String {
        self.cache.lock().dump(hex_view)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.cache.lock().stats().snapshot()
    }
}
