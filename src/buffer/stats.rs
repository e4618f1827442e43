//! Anti-cache statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the anti-cache.
///
/// All fields are atomic so a shared reference is enough to bump them.
///
/// # Memory Ordering
/// Every operation uses `Ordering::Relaxed`: counters are independent and
/// only need to be atomic, not ordered against each other.
///
/// # Example
/// ```
/// use gridstore::AntiCacheStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = AntiCacheStats::new();
/// stats.hot_hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.hot_hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug, Default)]
pub struct AntiCacheStats {
    /// Page lookups served by the hot store.
    pub hot_hits: AtomicU64,

    /// Pages promoted from the cold store.
    pub cold_fetches: AtomicU64,

    /// Pages created from scratch.
    pub pages_created: AtomicU64,

    /// Pages pushed to the cold store.
    pub evictions: AtomicU64,

    pub zones_appended: AtomicU64,

    pub zones_removed: AtomicU64,
}

impl AntiCacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of page lookups served without touching the cold store.
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hot_hits: self.hot_hits.load(Ordering::Relaxed),
            cold_fetches: self.cold_fetches.load(Ordering::Relaxed),
            pages_created: self.pages_created.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            zones_appended: self.zones_appended.load(Ordering::Relaxed),
            zones_removed: self.zones_removed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.hot_hits.store(0, Ordering::Relaxed);
        self.cold_fetches.store(0, Ordering::Relaxed);
        self.pages_created.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.zones_appended.store(0, Ordering::Relaxed);
        self.zones_removed.store(0, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`AntiCacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub hot_hits: u64,
    pub cold_fetches: u64,
    pub pages_created: u64,
    pub evictions: u64,
    pub zones_appended: u64,
    pub zones_removed: u64,
}

impl StatsSnapshot {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hot_hits + self.cold_fetches;
        if total == 0 {
            0.0
        } else {
            self.hot_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hot hits: {}, cold fetches: {}, created: {}, evictions: {}, \
             zones +{}/-{}, hit_rate: {:.2}% }}",
            self.hot_hits,
            self.cold_fetches,
            self.pages_created,
            self.evictions,
            self.zones_appended,
            self.zones_removed,
            self.hit_rate() * 100.0
        )
    }
}
