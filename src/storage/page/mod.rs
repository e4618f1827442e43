//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - A variable-size byte buffer with in-page allocator state
//! - [`PageHeader`] - Metadata at the start of every page
//! - [`Range`] / [`Positioning`] - The free-space allocator
//! - [`Lane`] - Registry of fixed-element-size record streams
//! - [`Zone`] - Data blocks chained into a lane
//! - [`InPagePtr`] - Tagged near/far references between lanes and zones
//!
//! # Page Layout
//! ```text
//! +--------------------+ 0
//! | header (45 bytes)  |
//! +--------------------+
//! | free-space table   |  freespace_capacity x 16
//! +--------------------+
//! | lane offset table  |  lane_capacity x 8
//! +--------------------+
//! | lane free-id stack |  lane_capacity x 4
//! +--------------------+ header_size()
//! | payload            |  lanes and zones
//! +--------------------+ size()
//! ```

mod dump;
mod freespace;
mod lane;
#[allow(clippy::module_inception)]
mod page;
mod page_header;
mod pointer;
mod zone;

pub use freespace::{Positioning, Range};
pub use lane::{Lane, LaneHandle, LaneIds, LaneState, LANE_HEADER_SIZE};
pub use page::{min_page_size, FreeSpaceQuery, Page};
pub use page_header::{PageFlags, PageHeader};
pub use pointer::{InPagePtr, PtrTarget, NULL_OFFSET};
pub use zone::{zone_block_size, Zone, MIN_DATA_SIZE, ZONE_HEADER_SIZE};
