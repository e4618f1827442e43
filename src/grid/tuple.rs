//! Tuple-wise access to a grid table.
//!
//! A [`TupleCursor`] walks a list of tuple ids. For each tuple it hands out
//! a [`TupleField`], which walks the tuple's attributes in table order and
//! follows them from grid to grid.

use crate::common::{AttrId, GridId, Result, TupleId, TupletId};
use crate::grid::{Grid, GridTable, Value};

pub struct TupleCursor<'a> {
    table: &'a mut GridTable,
    tuple_ids: Vec<TupleId>,
    pos: usize,
}

impl<'a> TupleCursor<'a> {
    pub(crate) fn new(table: &'a mut GridTable, tuple_ids: Vec<TupleId>) -> Self {
        Self {
            table,
            tuple_ids,
            pos: 0,
        }
    }

    /// Fields of the next tuple, positioned on attribute 0.
    ///
    /// Returns `None` once every tuple id was visited.
    pub fn next_tuple(&mut self) -> Option<TupleField<'_>> {
        let tid = *self.tuple_ids.get(self.pos)?;
        self.pos += 1;
        Some(TupleField::open(self.table, tid))
    }

    /// Fields of tuple `tid`, positioned on attribute 0.
    pub fn field(&mut self, tid: TupleId) -> TupleField<'_> {
        TupleField::open(self.table, tid)
    }

    pub fn remaining(&self) -> usize {
        self.tuple_ids.len() - self.pos
    }
}

/// One field of one tuple.
///
/// Positioned fields are always resolved: the covering grid, the tuplet
/// inside it and the grid's attribute position are known.
pub struct TupleField<'a> {
    table: &'a mut GridTable,
    tuple_id: TupleId,
    table_attr: AttrId,
    grid: GridId,
    tuplet: TupletId,
    grid_attr: AttrId,
}

impl<'a> TupleField<'a> {
    fn open(table: &'a mut GridTable, tuple_id: TupleId) -> Self {
        let mut field = Self {
            table,
            tuple_id,
            table_attr: AttrId::new(0),
            grid: GridId::new(0),
            tuplet: TupletId::new(0),
            grid_attr: AttrId::new(0),
        };
        field.seek(AttrId::new(0));
        field
    }

    #[inline]
    pub fn tuple_id(&self) -> TupleId {
        self.tuple_id
    }

    #[inline]
    pub fn attr_id(&self) -> AttrId {
        self.table_attr
    }

    #[inline]
    pub fn grid_id(&self) -> GridId {
        self.grid
    }

    /// Position on table attribute `attr`.
    ///
    /// # Panics
    /// Panics unless exactly one grid holds the field.
    pub fn seek(&mut self, attr: AttrId) {
        let (grid, tuplet, grid_attr) = self.table.locate(self.tuple_id, attr);
        self.table_attr = attr;
        self.grid = grid;
        self.tuplet = tuplet;
        self.grid_attr = grid_attr;
    }

    /// Step to the next table attribute.
    ///
    /// Stays in the current grid when it holds that attribute too, and
    /// looks the field up again otherwise. Returns false past the last
    /// attribute, leaving the field where it was.
    pub fn next(&mut self) -> bool {
        let next = AttrId::new(self.table_attr.0 + 1);
        if next.index() >= self.table.num_attributes() {
            return false;
        }
        match self.table.attr_id_to_frag_attr_id(self.grid, next) {
            Some(grid_attr) => {
                self.table_attr = next;
                self.grid_attr = grid_attr;
            }
            None => self.seek(next),
        }
        true
    }

    pub fn read(&self) -> &[u8] {
        self.fragment_grid()
            .fragment()
            .read(self.tuplet, self.grid_attr)
    }

    /// Write the current field, then step to the next attribute.
    ///
    /// Returns what [`TupleField::next`] returned.
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        let (tuplet, grid_attr) = (self.tuplet, self.grid_attr);
        self.table
            .grid_mut(self.grid)
            .fragment_mut()
            .write(tuplet, grid_attr, bytes);
        self.next()
    }

    /// Encode `value` for the current attribute and [`write`](Self::write) it.
    ///
    /// # Errors
    /// `Error::TypeMismatch` if the value does not fit the attribute.
    pub fn write_value(&mut self, value: &Value) -> Result<bool> {
        let attr = self
            .table
            .attr_by_id(self.table_attr)
            .unwrap_or_else(|| panic!("{} left the table schema", self.table_attr));
        let bytes = value.encode(attr)?;
        Ok(self.write(&bytes))
    }

    /// Decode the current field.
    pub fn value(&self) -> Result<Value> {
        let attr = self
            .table
            .attr_by_id(self.table_attr)
            .unwrap_or_else(|| panic!("{} left the table schema", self.table_attr));
        Value::decode(attr, self.read())
    }

    fn fragment_grid(&self) -> &Grid {
        self.table
            .grid_by_id(self.grid)
            .unwrap_or_else(|| panic!("{} is not part of the table", self.grid))
    }
}
