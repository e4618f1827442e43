//! Grid tables: tables split into vertical and horizontal partitions.
//!
//! # Components
//! - [`GridTable`] - Schema, grid list and the two grid indexes
//! - [`Grid`] - Attribute subset x tuple id intervals, backed by a fragment
//! - [`Fragment`] - Fixed-schema record storage, row- or column-major
//! - [`TupleCursor`] / [`TupleField`] - Field-wise access across grids
//! - [`index`] - Vertical and horizontal grid indexes
//! - [`Schema`], [`Attr`], [`FieldType`], [`Value`] - Typing

mod field_type;
mod fragment;
mod freelist;
#[allow(clippy::module_inception)]
mod grid;
pub mod index;
mod interval;
mod print;
mod schema;
mod table;
mod tuple;
mod value;

pub use field_type::FieldType;
pub use fragment::{Fragment, TupletFormat, GROWTH_FACTOR};
pub use freelist::TupleIdFreelist;
pub use grid::{AccessHint, Grid};
pub use interval::TupleIdInterval;
pub use schema::{Attr, AttrFlags, Schema};
pub use table::GridTable;
pub use tuple::{TupleCursor, TupleField};
pub use value::Value;
