//! Fragment - the record storage of one grid.
//!
//! A fragment stores `capacity` tuplets of a fixed schema in one buffer,
//! either row by row or column by column.
//!
//! # Layout
//! ```text
//! Nsm:  [t0.a0 t0.a1 t0.a2][t1.a0 t1.a1 t1.a2] ...
//! Dsm:  [t0.a0 t1.a0 ... tN.a0][t0.a1 t1.a1 ... tN.a1] ...
//! ```
//! Growing a `Dsm` fragment moves every column to its new start.

use std::fmt;

use tracing::trace;

use crate::common::{AttrId, TupletId};
use crate::grid::Schema;

/// Capacity multiplier used when an insert does not fit.
pub const GROWTH_FACTOR: f64 = 1.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupletFormat {
    /// Row-major.
    Nsm,
    /// Column-major.
    Dsm,
}

impl TupletFormat {
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            TupletFormat::Nsm => 0,
            TupletFormat::Dsm => 1,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TupletFormat::Nsm),
            1 => Some(TupletFormat::Dsm),
            _ => None,
        }
    }
}

impl fmt::Display for TupletFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TupletFormat::Nsm => f.write_str("row"),
            TupletFormat::Dsm => f.write_str("column"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fragment {
    schema: Schema,
    format: TupletFormat,
    /// Byte offset of each attribute within a tuple.
    attr_offsets: Vec<usize>,
    tuplet_size: usize,
    ntuplets: u64,
    capacity: u64,
    data: Vec<u8>,
}

impl Fragment {
    /// An empty fragment with room for `capacity` tuplets.
    pub fn new(schema: Schema, capacity: u64, format: TupletFormat) -> Self {
        let mut attr_offsets = Vec::with_capacity(schema.len());
        let mut offset = 0;
        for attr in schema.attrs() {
            attr_offsets.push(offset);
            offset += attr.size();
        }
        Self {
            format,
            attr_offsets,
            tuplet_size: offset,
            ntuplets: 0,
            capacity,
            data: vec![0; capacity as usize * offset],
            schema,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn format(&self) -> TupletFormat {
        self.format
    }

    pub fn num_attributes(&self) -> usize {
        self.schema.len()
    }

    pub fn ntuplets(&self) -> u64 {
        self.ntuplets
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes of one full tuplet.
    pub fn tuplet_size(&self) -> usize {
        self.tuplet_size
    }

    /// Append `n` zeroed tuplets and return the id of the first one.
    pub fn insert(&mut self, n: u64) -> TupletId {
        let first = TupletId::new(self.ntuplets);
        let needed = self.ntuplets + n;
        if needed > self.capacity {
            let mut new_capacity = self.capacity;
            while new_capacity < needed {
                new_capacity = ((new_capacity as f64 * GROWTH_FACTOR).ceil() as u64).max(1);
            }
            self.grow(new_capacity);
        }
        self.ntuplets = needed;
        first
    }

    fn grow(&mut self, new_capacity: u64) {
        trace!(from = self.capacity, to = new_capacity, format = %self.format, "fragment grows");
        let mut data = vec![0; new_capacity as usize * self.tuplet_size];
        match self.format {
            TupletFormat::Nsm => data[..self.data.len()].copy_from_slice(&self.data),
            TupletFormat::Dsm => {
                let old = self.capacity as usize;
                let new = new_capacity as usize;
                for (attr, &offset) in self.schema.attrs().iter().zip(&self.attr_offsets) {
                    let column = old * attr.size();
                    let from = old * offset;
                    let to = new * offset;
                    data[to..to + column].copy_from_slice(&self.data[from..from + column]);
                }
            }
        }
        self.data = data;
        self.capacity = new_capacity;
    }

    /// Bytes of field `attr` of `tuplet`.
    ///
    /// # Panics
    /// Panics if the tuplet was never inserted or the attribute is unknown.
    pub fn read(&self, tuplet: TupletId, attr: AttrId) -> &[u8] {
        let (offset, size) = self.locate(tuplet, attr);
        &self.data[offset..offset + size]
    }

    /// Overwrite field `attr` of `tuplet`. Shorter input is zero-padded.
    ///
    /// # Panics
    /// Panics if the tuplet was never inserted, the attribute is unknown,
    /// or `bytes` is longer than the field.
    pub fn write(&mut self, tuplet: TupletId, attr: AttrId, bytes: &[u8]) {
        let (offset, size) = self.locate(tuplet, attr);
        assert!(
            bytes.len() <= size,
            "{} bytes do not fit field {attr} of {size} bytes",
            bytes.len()
        );
        let field = &mut self.data[offset..offset + size];
        field[..bytes.len()].copy_from_slice(bytes);
        field[bytes.len()..].fill(0);
    }

    fn locate(&self, tuplet: TupletId, attr: AttrId) -> (usize, usize) {
        assert!(
            tuplet.0 < self.ntuplets,
            "{tuplet} out of bounds, fragment holds {} tuplets",
            self.ntuplets
        );
        let size = match self.schema.attr_by_id(attr) {
            Some(a) => a.size(),
            None => panic!("{attr} is not part of fragment schema '{}'", self.schema.name()),
        };
        let before = self.attr_offsets[attr.index()];
        let offset = match self.format {
            TupletFormat::Nsm => tuplet.index() * self.tuplet_size + before,
            TupletFormat::Dsm => self.capacity as usize * before + tuplet.index() * size,
        };
        (offset, size)
    }
}
