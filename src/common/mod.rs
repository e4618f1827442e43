//! Common types shared across gridstore.
//!
//! - Buffer configuration
//! - Error types
//! - Identifiers (PageId, LaneId, AttrId, GridId, TupleId, TupletId)

pub mod config;
pub mod error;
mod lane_id;
mod page_id;
mod table_ids;

pub use config::BufferConfig;
pub use error::{Error, Result};
pub use lane_id::LaneId;
pub use page_id::PageId;
pub use table_ids::{AttrId, GridId, TupleId, TupletId};
