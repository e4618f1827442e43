//! Buffer manager configuration.
//!
//! Values are read once, when the anti-cache is constructed. A bad
//! configuration is rejected there and no buffer manager is built.

use crate::common::{Error, Result};
use crate::storage::page::min_page_size;

/// Hot-store size limit used when nothing is configured (8 GiB).
pub const DEFAULT_HOTSTORE_SIZE_LIMIT: usize = 8_589_934_592;

/// Default page size (~0.8 GiB).
pub const DEFAULT_PAGE_SIZE: usize = 858_993_459;

/// Maximum in-memory page size (3 GiB).
pub const DEFAULT_MAX_PAGE_SIZE: usize = 3_221_225_472;

/// Default number of ranges a page's free-space register can hold.
pub const DEFAULT_FREESPACE_CAPACITY: usize = 100;

/// Default number of lanes a page's lane registry can hold.
pub const DEFAULT_LANE_CAPACITY: usize = 100;

/// Setting keys understood by [`BufferConfig::from_lookup`].
pub const KEY_HOTSTORE_LIMIT: &str = "swap_buffer.hotstore.limit";
pub const KEY_PAGE_SIZE_DEFAULT: &str = "swap_buffer.page_size.default";
pub const KEY_PAGE_SIZE_MAX: &str = "swap_buffer.page_size.max";
pub const KEY_FREESPACE_CAPACITY: &str = "swap_buffer.freespace.capacity";
pub const KEY_LANE_CAPACITY: &str = "swap_buffer.lane.capacity";

/// Configuration of an [`AntiCache`](crate::buffer::AntiCache).
///
/// # Constraints
/// - all sizes and capacities are non-zero
/// - `default_page_size < max_page_size`
/// - `max_page_size <= 0.5 * hotstore_size_limit`
/// - a default page can hold its header, one lane and one zone
///
/// # Example
/// ```
/// use gridstore::BufferConfig;
///
/// let config = BufferConfig::default()
///     .with_hotstore_size_limit(1 << 20)
///     .with_default_page_size(4096)
///     .with_max_page_size(16 * 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Upper bound of bytes held by hot-store pages before eviction kicks in.
    pub hotstore_size_limit: usize,
    /// Size of pages created when the request fits.
    pub default_page_size: usize,
    /// Size of pages created for requests beyond the default size.
    pub max_page_size: usize,
    /// Free-space register capacity of every new page.
    pub freespace_capacity: usize,
    /// Lane registry capacity of every new page.
    pub lane_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            hotstore_size_limit: DEFAULT_HOTSTORE_SIZE_LIMIT,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            freespace_capacity: DEFAULT_FREESPACE_CAPACITY,
            lane_capacity: DEFAULT_LANE_CAPACITY,
        }
    }
}

impl BufferConfig {
    pub fn with_hotstore_size_limit(mut self, limit: usize) -> Self {
        self.hotstore_size_limit = limit;
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = size;
        self
    }

    pub fn with_freespace_capacity(mut self, capacity: usize) -> Self {
        self.freespace_capacity = capacity;
        self
    }

    pub fn with_lane_capacity(mut self, capacity: usize) -> Self {
        self.lane_capacity = capacity;
        self
    }

    /// Check every constraint, reporting the first violated one.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.default_page_size > 0, "default page size must be > 0"),
            (self.hotstore_size_limit > 0, "hot store limit must be > 0"),
            (self.freespace_capacity > 0, "free-space register capacity must be > 0"),
            (self.lane_capacity > 0, "lane register capacity must be > 0"),
            (
                self.max_page_size < self.hotstore_size_limit,
                "max page size must be below the hot store limit",
            ),
            (
                self.default_page_size < self.max_page_size,
                "default page size must be below the max page size",
            ),
            (
                self.max_page_size as f64 <= 0.5 * self.hotstore_size_limit as f64,
                "max page size must not exceed half the hot store limit",
            ),
        ];

        if let Some((_, reason)) = checks.iter().find(|(ok, _)| !ok) {
            return Err(invalid(*reason));
        }

        let min = min_page_size(self.freespace_capacity, self.lane_capacity);
        if self.default_page_size < min {
            return Err(invalid(format!(
                "default page size {} is below the minimum of {} bytes",
                self.default_page_size, min
            )));
        }

        Ok(())
    }

    /// Build a configuration from a key/value source.
    ///
    /// Missing keys keep their defaults. The result is validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: usize| -> Result<usize> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| invalid(format!("{key}={raw:?}: {e}"))),
                None => Ok(default),
            }
        };

        let config = Self {
            hotstore_size_limit: read(KEY_HOTSTORE_LIMIT, DEFAULT_HOTSTORE_SIZE_LIMIT)?,
            default_page_size: read(KEY_PAGE_SIZE_DEFAULT, DEFAULT_PAGE_SIZE)?,
            max_page_size: read(KEY_PAGE_SIZE_MAX, DEFAULT_MAX_PAGE_SIZE)?,
            freespace_capacity: read(KEY_FREESPACE_CAPACITY, DEFAULT_FREESPACE_CAPACITY)?,
            lane_capacity: read(KEY_LANE_CAPACITY, DEFAULT_LANE_CAPACITY)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `GRIDSTORE_*` environment variables.
    ///
    /// `swap_buffer.page_size.max` is read from `GRIDSTORE_SWAP_BUFFER_PAGE_SIZE_MAX`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(env_var_name(key)).ok())
    }
}

/// Environment variable name for a setting key.
pub fn env_var_name(key: &str) -> String {
    format!("GRIDSTORE_{}", key.replace('.', "_").to_ascii_uppercase())
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConfig {
        reason: reason.into(),
    }
}
