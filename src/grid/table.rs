//! GridTable - a table split into grids.
//!
//! Every (tuple, attribute) field of a table lives in exactly one grid.
//! The table locates it through two indexes: the vertical index maps
//! attributes to grids and the horizontal index maps tuple ids to grids.
//! A field's grid is the one both agree on.

use std::collections::HashSet;

use tracing::debug;

use crate::common::{AttrId, GridId, Result, TupleId, TupletId};
use crate::grid::index::{HIndex, HashVIndex, LinearHIndex, VIndex};
use crate::grid::{
    AccessHint, Attr, Grid, Schema, TupleCursor, TupleIdFreelist, TupleIdInterval, TupletFormat,
};

pub struct GridTable {
    schema: Schema,
    grids: Vec<Grid>,
    vindex: Box<dyn VIndex>,
    hindex: Box<dyn HIndex>,
    freelist: TupleIdFreelist,
    num_tuples: u64,
}

impl GridTable {
    /// A table without grids, indexed by [`HashVIndex`] and [`LinearHIndex`].
    pub fn new(schema: Schema) -> Self {
        let vindex = Box::new(HashVIndex::with_capacity(schema.len()));
        Self::with_indexes(schema, vindex, Box::new(LinearHIndex::new()))
    }

    pub fn with_indexes(schema: Schema, vindex: Box<dyn VIndex>, hindex: Box<dyn HIndex>) -> Self {
        Self {
            schema,
            grids: Vec::new(),
            vindex,
            hindex,
            freelist: TupleIdFreelist::new(),
            num_tuples: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Register a grid over `attr_ids` covering `intervals`.
    ///
    /// The returned id is the grid's position in the table.
    ///
    /// # Errors
    /// `Error::InvalidInterval` or `Error::UnknownAttribute`, see
    /// [`Grid::new`].
    ///
    /// # Panics
    /// Panics if `attr_ids` or `intervals` is empty.
    pub fn add_grid(
        &mut self,
        attr_ids: &[AttrId],
        intervals: &[TupleIdInterval],
        format: TupletFormat,
    ) -> Result<GridId> {
        assert!(!attr_ids.is_empty(), "a grid needs at least one attribute");
        assert!(!intervals.is_empty(), "a grid needs at least one tuple id interval");

        let id = GridId::new(self.grids.len() as u32);
        let grid = Grid::new(id, &self.schema, attr_ids, intervals, format)?;

        for &attr in attr_ids {
            self.vindex.add(attr, id);
        }
        for &interval in grid.intervals() {
            self.hindex.add(interval, id);
        }
        // Grids are never dropped from a table, so the end only grows.
        self.num_tuples = self.hindex.max_end().map_or(0, |end| end.0);
        debug!(
            grid_id = %id,
            attrs = attr_ids.len(),
            intervals = intervals.len(),
            capacity = grid.fragment().capacity(),
            format = %format,
            "grid registered"
        );
        self.grids.push(grid);
        Ok(id)
    }

    /// Grids holding any of `attr_ids` for any of `tuple_ids`.
    ///
    /// The smaller of the two index answers is hashed and the other is
    /// probed against it, so the result follows the larger side's order.
    ///
    /// # Panics
    /// Panics if either index has no grid at all for its input.
    pub fn find(&self, attr_ids: &[AttrId], tuple_ids: &[TupleId]) -> Vec<GridId> {
        let by_attr = self.vindex.query(attr_ids);
        let by_tuple = self.hindex.query(tuple_ids);
        let (build, probe) = if by_attr.len() <= by_tuple.len() {
            (by_attr, by_tuple)
        } else {
            (by_tuple, by_attr)
        };
        if build.is_empty() {
            panic!(
                "No grid found for attributes {attr_ids:?} and tuples {tuple_ids:?}. \
                 Does the table field cover contain gaps?"
            );
        }
        let build: HashSet<GridId> = build.into_iter().collect();
        probe.into_iter().filter(|grid| build.contains(grid)).collect()
    }

    /// Copy `tuple_ids` x `attr_ids` into a new single-grid table.
    ///
    /// The new table's tuple `i` is `tuple_ids[i]` and its attribute `j` is
    /// `attr_ids[j]`.
    ///
    /// # Errors
    /// `Error::UnknownAttribute` for an id outside the schema.
    pub fn melt(
        &self,
        format: TupletFormat,
        tuple_ids: &[TupleId],
        attr_ids: &[AttrId],
    ) -> Result<GridTable> {
        let mut molten = GridTable::new(self.schema.subset(attr_ids)?);
        if tuple_ids.is_empty() || attr_ids.is_empty() {
            return Ok(molten);
        }

        let all: Vec<AttrId> = (0..attr_ids.len() as u32).map(AttrId::new).collect();
        let interval = TupleIdInterval::new(0, tuple_ids.len() as u64);
        let grid = molten.add_grid(&all, &[interval], format)?;
        molten.insert(tuple_ids.len());

        let fragment = molten.grids[grid.index()].fragment_mut();
        for (row, &tid) in tuple_ids.iter().enumerate() {
            for (col, &attr) in attr_ids.iter().enumerate() {
                let bytes = self.read_field(tid, attr);
                fragment.write(TupletId::new(row as u64), AttrId::new(col as u32), bytes);
            }
        }
        debug!(tuples = tuple_ids.len(), attrs = attr_ids.len(), format = %format, "table melted");
        Ok(molten)
    }

    /// Bind `n` tuple ids.
    pub fn insert(&mut self, n: usize) -> Vec<TupleId> {
        self.freelist.bind(n)
    }

    pub fn freelist(&self) -> &TupleIdFreelist {
        &self.freelist
    }

    /// Bytes of field `attr` of tuple `tid`.
    ///
    /// # Panics
    /// Panics unless exactly one grid holds the field.
    pub fn read_field(&self, tid: TupleId, attr: AttrId) -> &[u8] {
        let (grid, tuplet, grid_attr) = self.locate(tid, attr);
        self.grids[grid.index()].fragment().read(tuplet, grid_attr)
    }

    /// Overwrite field `attr` of tuple `tid`.
    ///
    /// # Panics
    /// Panics unless exactly one grid holds the field, or if `bytes` is
    /// longer than the field.
    pub fn write_field(&mut self, tid: TupleId, attr: AttrId, bytes: &[u8]) {
        let (grid, tuplet, grid_attr) = self.locate(tid, attr);
        self.grids[grid.index()]
            .fragment_mut()
            .write(tuplet, grid_attr, bytes);
    }

    /// Grid, tuplet and grid attribute holding a field.
    pub(crate) fn locate(&self, tid: TupleId, attr: AttrId) -> (GridId, TupletId, AttrId) {
        let grids = self.find(&[attr], &[tid]);
        let &[grid] = grids.as_slice() else {
            panic!(
                "field of {tid} @ '{}' is covered by {} grids, must be covered by exactly one",
                self.attr_name_by_id(attr).unwrap_or("?"),
                grids.len()
            );
        };
        let owner = &self.grids[grid.index()];
        let tuplet = owner.global_to_local(tid, AccessHint::Random);
        let grid_attr = owner
            .schema_map(attr)
            .unwrap_or_else(|| panic!("{grid} was indexed for {attr} but does not hold it"));
        (grid, tuplet, grid_attr)
    }

    pub fn tuple_cursor(&mut self, tuple_ids: &[TupleId]) -> TupleCursor<'_> {
        TupleCursor::new(self, tuple_ids.to_vec())
    }

    pub fn attr_by_id(&self, id: AttrId) -> Option<&Attr> {
        self.schema.attr_by_id(id)
    }

    pub fn attr_name_by_id(&self, id: AttrId) -> Option<&str> {
        self.schema.attr_by_id(id).map(|attr| attr.name.as_str())
    }

    pub fn num_attributes(&self) -> usize {
        self.schema.len()
    }

    /// One past the largest tuple id any grid covers.
    pub fn num_tuples(&self) -> u64 {
        self.num_tuples
    }

    pub fn num_grids(&self) -> usize {
        self.grids.len()
    }

    pub fn grid_by_id(&self, id: GridId) -> Option<&Grid> {
        self.grids.get(id.index())
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub(crate) fn grid_mut(&mut self, id: GridId) -> &mut Grid {
        self.grids
            .get_mut(id.index())
            .unwrap_or_else(|| panic!("{id} is not part of the table"))
    }

    /// Position of table attribute `attr` inside `grid`.
    pub fn attr_id_to_frag_attr_id(&self, grid: GridId, attr: AttrId) -> Option<AttrId> {
        self.grid_by_id(grid)?.schema_map(attr)
    }

    pub fn vindex(&self) -> &dyn VIndex {
        self.vindex.as_ref()
    }

    pub fn hindex(&self) -> &dyn HIndex {
        self.hindex.as_ref()
    }
}
