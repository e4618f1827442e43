//! Horizontal index backed by a linear scan over interval entries.

use std::collections::HashSet;

use crate::common::{GridId, TupleId};
use crate::grid::index::HIndex;
use crate::grid::TupleIdInterval;

#[derive(Debug)]
struct Entry {
    interval: TupleIdInterval,
    grids: Vec<GridId>,
}

/// One entry per distinct interval; grids sharing an interval share the entry.
#[derive(Debug, Default)]
pub struct LinearHIndex {
    entries: Vec<Entry>,
}

impl LinearHIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(approx_partitions: usize) -> Self {
        Self {
            entries: Vec::with_capacity(approx_partitions),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HIndex for LinearHIndex {
    fn add(&mut self, interval: TupleIdInterval, grid: GridId) {
        match self.entries.iter_mut().find(|e| e.interval == interval) {
            Some(entry) => {
                if !entry.grids.contains(&grid) {
                    entry.grids.push(grid);
                }
            }
            None => self.entries.push(Entry {
                interval,
                grids: vec![grid],
            }),
        }
    }

    fn query(&self, tuple_ids: &[TupleId]) -> Vec<GridId> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for &tid in tuple_ids {
            for entry in self.entries.iter().filter(|e| e.interval.contains(tid)) {
                result.extend(entry.grids.iter().filter(|grid| seen.insert(**grid)));
            }
        }
        result
    }

    fn contains(&self, tid: TupleId) -> bool {
        self.entries.iter().any(|e| e.interval.contains(tid))
    }

    fn min_begin(&self) -> Option<TupleId> {
        self.entries.iter().map(|e| e.interval.begin).min()
    }

    fn max_end(&self) -> Option<TupleId> {
        self.entries.iter().map(|e| e.interval.end).max()
    }

    fn remove(&mut self, grid: GridId) {
        for entry in &mut self.entries {
            entry.grids.retain(|g| *g != grid);
        }
        self.entries.retain(|e| !e.grids.is_empty());
    }
}
