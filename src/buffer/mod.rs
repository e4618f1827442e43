//! Buffer management: the anti-cache and its caller-facing surface.
//!
//! The anti-cache keeps a bounded set of pages in memory (the hot store)
//! and pushes the rest to a cold store. Lanes and zones allocated through
//! it may span any number of pages.
//!
//! # Components
//! - [`AntiCache`] - Hot/cold page store, page selection, zone chains
//! - [`BufferManager`] - Lock around the anti-cache plus `buf_alloc`
//! - [`Cursor`] - Walks and edits the zones of one lane
//! - [`Frame`] - A hot-store page plus its pin count
//! - [`AntiCacheStats`] - Counters
//! - [`replacer`] - Eviction policy implementations

mod anticache;
mod cursor;
mod frame;
mod manager;
pub mod replacer;
mod stats;

pub use anticache::AntiCache;
pub use cursor::{Cursor, CursorState};
pub use frame::Frame;
pub use manager::BufferManager;
pub use stats::{AntiCacheStats, StatsSnapshot};
