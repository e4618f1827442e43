//! Storage layer - page formats and the cold store.
//!
//! This module handles everything below the anti-cache:
//! - [`page`] - Page layout, free-space allocator, lanes and zones
//! - [`cold_store`] - Where evicted pages go

pub mod cold_store;
pub mod page;

pub use cold_store::{ColdStore, FileColdStore, MemoryColdStore};
