//! Grid indexes of a table.
//!
//! A table keeps two of them:
//! - a vertical index from table attribute to the grids that hold it
//! - a horizontal index from tuple id interval to the grids covering it
//!
//! Both are traits so a table can be built with other implementations.
//!
//! Currently implements:
//! - [`HashVIndex`] - hash map keyed by attribute id
//! - [`LinearHIndex`] - linear search over interval entries

mod hash_vindex;
mod linear_hindex;

pub use hash_vindex::HashVIndex;
pub use linear_hindex::LinearHIndex;

use crate::common::{AttrId, GridId, TupleId};
use crate::grid::TupleIdInterval;

/// Attribute id to grids.
pub trait VIndex: Send {
    fn add(&mut self, attr: AttrId, grid: GridId);

    /// Grids holding any of `attrs`, first-seen order, no duplicates.
    fn query(&self, attrs: &[AttrId]) -> Vec<GridId>;

    fn contains(&self, attr: AttrId) -> bool;
}

/// Tuple id interval to grids.
pub trait HIndex: Send {
    fn add(&mut self, interval: TupleIdInterval, grid: GridId);

    /// Grids covering any of `tuple_ids`, first-seen order, no duplicates.
    fn query(&self, tuple_ids: &[TupleId]) -> Vec<GridId>;

    fn contains(&self, tid: TupleId) -> bool;

    /// Smallest interval begin, `None` when empty. Diagnostic only.
    fn min_begin(&self) -> Option<TupleId>;

    /// Largest interval end, `None` when empty. A table's tuple count.
    fn max_end(&self) -> Option<TupleId>;

    /// Drop `grid` from every interval entry.
    ///
    /// [`GridTable`](crate::grid::GridTable) never drops grids; this is for
    /// owners that rebuild an index in place.
    fn remove(&mut self, grid: GridId);
}
