//! Grid - one vertical and horizontal partition of a table.
//!
//! A grid holds a subset of the table's attributes for a set of disjoint
//! tuple id intervals. Its tuplets are numbered densely: the tuples of the
//! first interval come first, then those of the second, and so on.
//!
//! ```text
//! intervals:  [10, 13)      [20, 22)
//! tuple ids:  10  11  12    20  21
//! tuplets:     0   1   2     3   4
//! ```

use std::cell::Cell;
use std::collections::HashMap;

use crate::common::{AttrId, Error, GridId, Result, TupleId, TupletId};
use crate::grid::{Fragment, Schema, TupleIdInterval, TupletFormat};

/// How a caller is about to walk tuple ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessHint {
    /// Ids arrive in ascending order; the last interval is tried first.
    Sequential,
    Random,
}

#[derive(Debug)]
pub struct Grid {
    id: GridId,
    /// Table attribute ids, in grid order.
    attr_ids: Vec<AttrId>,
    /// Table attribute id to grid attribute position.
    schema_map: HashMap<AttrId, AttrId>,
    /// Sorted by begin, pairwise disjoint.
    intervals: Vec<TupleIdInterval>,
    /// Tuplet id of each interval's first tuple.
    first_tuplet: Vec<u64>,
    fragment: Fragment,
    last_interval: Cell<usize>,
}

impl Grid {
    /// Create a grid over `attr_ids` of `table_schema`, covering `intervals`.
    ///
    /// Every tuplet of the fragment is allocated up front.
    ///
    /// # Errors
    /// - `Error::InvalidInterval` for an empty interval or two that overlap
    /// - `Error::UnknownAttribute` for an id outside `table_schema`
    pub fn new(
        id: GridId,
        table_schema: &Schema,
        attr_ids: &[AttrId],
        intervals: &[TupleIdInterval],
        format: TupletFormat,
    ) -> Result<Self> {
        let mut sorted = intervals.to_vec();
        sorted.sort_by_key(|interval| interval.begin);

        for interval in &sorted {
            if !interval.is_valid() {
                return Err(Error::InvalidInterval {
                    begin: interval.begin.0,
                    end: interval.end.0,
                });
            }
        }
        for pair in sorted.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(Error::InvalidInterval {
                    begin: pair[1].begin.0,
                    end: pair[1].end.0,
                });
            }
        }

        let mut first_tuplet = Vec::with_capacity(sorted.len());
        let mut capacity = 0;
        for interval in &sorted {
            first_tuplet.push(capacity);
            capacity += interval.span();
        }

        let schema = table_schema.subset(attr_ids)?;
        let mut fragment = Fragment::new(schema, capacity, format);
        fragment.insert(capacity);

        let schema_map = attr_ids
            .iter()
            .enumerate()
            .map(|(pos, &attr)| (attr, AttrId::new(pos as u32)))
            .collect();

        Ok(Self {
            id,
            attr_ids: attr_ids.to_vec(),
            schema_map,
            intervals: sorted,
            first_tuplet,
            fragment,
            last_interval: Cell::new(0),
        })
    }

    #[inline]
    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn attr_ids(&self) -> &[AttrId] {
        &self.attr_ids
    }

    pub fn num_attributes(&self) -> usize {
        self.attr_ids.len()
    }

    pub fn intervals(&self) -> &[TupleIdInterval] {
        &self.intervals
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub fn fragment_mut(&mut self) -> &mut Fragment {
        &mut self.fragment
    }

    /// Grid attribute position of table attribute `attr`.
    pub fn schema_map(&self, attr: AttrId) -> Option<AttrId> {
        self.schema_map.get(&attr).copied()
    }

    pub fn covers(&self, tid: TupleId) -> bool {
        self.interval_of(tid, AccessHint::Random).is_some()
    }

    /// Tuplet holding tuple `tid`.
    ///
    /// # Panics
    /// Panics if no interval of this grid contains `tid`.
    pub fn global_to_local(&self, tid: TupleId, hint: AccessHint) -> TupletId {
        let Some(idx) = self.interval_of(tid, hint) else {
            panic!("{tid} is not covered by {}", self.id);
        };
        self.last_interval.set(idx);
        let interval = &self.intervals[idx];
        TupletId::new(self.first_tuplet[idx] + (tid.0 - interval.begin.0))
    }

    /// Tuple id stored in tuplet `local`.
    ///
    /// # Panics
    /// Panics if `local` is beyond the fragment's capacity.
    pub fn local_to_global(&self, local: TupletId) -> TupleId {
        let mut remaining = local.0;
        for interval in &self.intervals {
            if remaining < interval.span() {
                return TupleId::new(interval.begin.0 + remaining);
            }
            remaining -= interval.span();
        }
        panic!("{local} is beyond {} of {} tuplets", self.id, self.fragment.capacity());
    }

    fn interval_of(&self, tid: TupleId, hint: AccessHint) -> Option<usize> {
        if hint == AccessHint::Sequential {
            let last = self.last_interval.get();
            for idx in [last, last + 1] {
                if self.intervals.get(idx).is_some_and(|i| i.contains(tid)) {
                    return Some(idx);
                }
            }
        }
        let idx = self.intervals.partition_point(|i| i.end <= tid);
        self.intervals
            .get(idx)
            .filter(|i| i.contains(tid))
            .map(|_| idx)
    }
}
