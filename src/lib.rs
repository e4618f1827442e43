//! gridstore - grid tables over a page-based anti-caching buffer manager.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           gridstore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                  Grid Layer (grid/)                      │   │
//! │  │   GridTable → vindex/hindex → Grid → Fragment (NSM|DSM)  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Buffer Layer (buffer/)                   │   │
//! │  │   BufferManager (buf_alloc) → Cursor                     │   │
//! │  │   AntiCache: hot store (Frame + pins) ⇄ cold store       │   │
//! │  │   FifoReplacer + AntiCacheStats                          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                Storage Layer (storage/)                  │   │
//! │  │   Page: header | free-space table | lane registry        │   │
//! │  │         | payload of lanes and zones                     │   │
//! │  │   ColdStore: MemoryColdStore | FileColdStore             │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two upper layers are independent: grid fragments keep their
//! records in plain memory, the buffer layer manages paged storage.
//!
//! # Modules
//! - [`common`] - Shared primitives (ids, Error, BufferConfig)
//! - [`storage`] - Page format and cold stores
//! - [`buffer`] - Anti-cache, buffer manager and cursors
//! - [`grid`] - Grid tables
//!
//! # Quick Start
//! ```
//! use gridstore::{BufferConfig, BufferManager};
//! use gridstore::storage::page::Positioning;
//!
//! let config = BufferConfig::default()
//!     .with_hotstore_size_limit(1 << 20)
//!     .with_default_page_size(8192)
//!     .with_max_page_size(64 * 1024);
//! let manager = BufferManager::in_memory(config).unwrap();
//!
//! let mut cursor = manager.buf_alloc(4, 2, Positioning::SmallestFit).unwrap();
//! cursor.open().unwrap();
//! while cursor.next().unwrap() {
//!     cursor.write(0, &42u32.to_le_bytes()).unwrap();
//! }
//! ```

pub mod buffer;
pub mod common;
pub mod grid;
pub mod storage;

pub use common::{AttrId, BufferConfig, Error, GridId, LaneId, PageId, Result, TupleId, TupletId};

pub use buffer::{AntiCache, AntiCacheStats, BufferManager, Cursor, CursorState, StatsSnapshot};
pub use grid::{GridTable, Schema, TupleIdInterval, TupletFormat};
pub use storage::page::{Page, PageHeader};
pub use storage::{ColdStore, FileColdStore, MemoryColdStore};
