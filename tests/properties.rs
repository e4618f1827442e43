//! Property tests for the allocator and the grid mappings.

use std::collections::HashSet;

use gridstore::grid::{
    AccessHint, FieldType, Grid, GridTable, Schema, TupleIdInterval, TupletFormat,
};
use gridstore::storage::page::{Page, PageFlags, Positioning, Range};
use gridstore::{AttrId, BufferConfig, BufferManager, Error, GridId, PageId, TupleId, TupletId};
use proptest::prelude::*;

const STRATEGIES: [Positioning; 6] = [
    Positioning::FirstFit,
    Positioning::FirstFitMerge,
    Positioning::SmallestFit,
    Positioning::SmallestFitMerge,
    Positioning::LargestFit,
    Positioning::LargestFitMerge,
];

#[derive(Debug, Clone)]
enum Op {
    Bind { size: usize, strategy: usize },
    Release { pick: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..400, 0usize..STRATEGIES.len())
            .prop_map(|(size, strategy)| Op::Bind { size, strategy }),
        any::<usize>().prop_map(|pick| Op::Release { pick }),
    ]
}

fn disjoint(ranges: &[Range]) -> bool {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.begin);
    sorted.windows(2).all(|w| w[0].end <= w[1].begin)
}

/// Sorted, disjoint, non-empty intervals built from gaps and spans.
fn intervals() -> impl Strategy<Value = Vec<TupleIdInterval>> {
    prop::collection::vec((0u64..5, 1u64..8), 1..6).prop_map(|parts| {
        let mut next = 0;
        parts
            .into_iter()
            .map(|(gap, span)| {
                let begin = next + gap;
                next = begin + span;
                TupleIdInterval::new(begin, next)
            })
            .collect()
    })
}

fn schema(num_attrs: usize) -> Schema {
    let mut schema = Schema::new("prop");
    for i in 0..num_attrs {
        schema.add(format!("a{i}"), FieldType::UInt32);
    }
    schema
}

proptest! {
    /// Zone i of a lane reads back payload i, in insertion order.
    #[test]
    fn prop_lane_round_trip(elem_size in 8usize..64, n in 1usize..40) {
        let config = BufferConfig::default()
            .with_hotstore_size_limit(64 * 1024)
            .with_default_page_size(4096)
            .with_max_page_size(16 * 1024)
            .with_freespace_capacity(8)
            .with_lane_capacity(4);
        let manager = BufferManager::in_memory(config).unwrap();
        let mut cursor = manager.buf_alloc(elem_size, n, Positioning::FirstFit).unwrap();

        cursor.open().unwrap();
        let mut i = 0u64;
        while cursor.next().unwrap() {
            cursor.write(0, &i.to_le_bytes()).unwrap();
            i += 1;
        }
        prop_assert_eq!(i, n as u64);

        cursor.open().unwrap();
        let mut read = Vec::new();
        while cursor.next().unwrap() {
            read.push(cursor.read(|d| u64::from_le_bytes(d[..8].try_into().unwrap())).unwrap());
        }
        prop_assert_eq!(read, (0..n as u64).collect::<Vec<_>>());
    }

    /// The free-byte counter always equals the sum of the free ranges,
    /// and bound ranges never overlap each other or the free ranges.
    #[test]
    fn prop_free_space_invariant(ops in prop::collection::vec(op(), 1..80)) {
        let mut page = Page::create(PageId::new(0), 4096, PageFlags::empty(), 64, 4).unwrap();
        let payload = page.header_size()..page.size();
        let mut bound: Vec<Range> = Vec::new();

        for op in ops {
            match op {
                Op::Bind { size, strategy } => match page.bind(size, STRATEGIES[strategy]) {
                    Ok(range) => {
                        prop_assert_eq!(range.span(), size);
                        prop_assert!(payload.contains(&range.begin));
                        prop_assert!(range.end <= payload.end);
                        bound.push(range);
                    }
                    Err(Error::NoFreeSpace { .. }) => {
                        prop_assert!(page.largest_free_range() < size);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                },
                Op::Release { pick } if !bound.is_empty() => {
                    if !page.has_free_register_slot() {
                        page.rebuild();
                    }
                    if page.has_free_register_slot() {
                        let range = bound.swap_remove(pick % bound.len());
                        page.push(range).unwrap();
                    }
                }
                Op::Release { .. } => {}
            }

            let free = page.free_ranges();
            let free_sum: usize = free.iter().map(Range::span).sum();
            prop_assert_eq!(page.approx_free_space(), free_sum);

            let bound_sum: usize = bound.iter().map(Range::span).sum();
            prop_assert_eq!(free_sum + bound_sum, page.payload_capacity());

            let mut all: Vec<Range> = free.into_iter().filter(|r| !r.is_empty()).collect();
            all.extend(bound.iter().copied());
            prop_assert!(disjoint(&all));
        }
    }

    /// global_to_local and local_to_global are inverse, and the tuplets of
    /// a grid are exactly `[0, capacity)`.
    #[test]
    fn prop_grid_bijection(intervals in intervals(), sequential in any::<bool>()) {
        let grid = Grid::new(GridId::new(0), &schema(1), &[AttrId::new(0)], &intervals, TupletFormat::Dsm)
            .unwrap();
        let hint = if sequential { AccessHint::Sequential } else { AccessHint::Random };

        let mut locals = HashSet::new();
        for interval in &intervals {
            for t in interval.begin.0..interval.end.0 {
                let tid = TupleId::new(t);
                let local = grid.global_to_local(tid, hint);
                prop_assert_eq!(grid.local_to_global(local), tid);
                locals.insert(local);
            }
        }
        let capacity = grid.fragment().capacity();
        prop_assert_eq!(locals.len() as u64, capacity);
        prop_assert!(locals.iter().all(|l| l.0 < capacity));
        prop_assert_eq!(grid.local_to_global(TupletId::new(0)), intervals[0].begin);
    }

    /// num_tuples never shrinks and tracks the largest interval end.
    #[test]
    fn prop_coverage_monotonic(grids in prop::collection::vec(intervals(), 1..6)) {
        let mut table = GridTable::new(schema(1));
        let mut previous = 0;
        for intervals in &grids {
            table.add_grid(&[AttrId::new(0)], intervals, TupletFormat::Nsm).unwrap();
            let end = intervals.iter().map(|i| i.end.0).max().unwrap();
            prop_assert!(table.num_tuples() >= previous);
            prop_assert_eq!(table.num_tuples(), previous.max(end));
            previous = table.num_tuples();
        }
    }

    /// find returns exactly the grids holding a queried attribute and
    /// covering a queried tuple.
    #[test]
    fn prop_find_is_intersection(
        chunks in prop::collection::vec(1u64..6, 1..5),
        groups in prop::collection::vec(1usize..3, 1..4),
        attr_picks in prop::collection::vec(any::<prop::sample::Index>(), 1..4),
        tuple_picks in prop::collection::vec(any::<prop::sample::Index>(), 1..6),
    ) {
        let num_attrs: usize = groups.iter().sum();
        let mut table = GridTable::new(schema(num_attrs));

        // One grid per (attribute group, tuple chunk).
        let mut layout = Vec::new();
        let mut first_attr = 0;
        for width in &groups {
            let attrs: Vec<AttrId> = (first_attr..first_attr + width)
                .map(|a| AttrId::new(a as u32))
                .collect();
            first_attr += width;
            let mut begin = 0;
            for span in &chunks {
                let interval = TupleIdInterval::new(begin, begin + span);
                begin += span;
                let id = table.add_grid(&attrs, &[interval], TupletFormat::Nsm).unwrap();
                layout.push((id, attrs.clone(), interval));
            }
        }

        let num_tuples = table.num_tuples() as usize;
        let attrs: Vec<AttrId> = attr_picks
            .iter()
            .map(|i| AttrId::new(i.index(num_attrs) as u32))
            .collect();
        let tuples: Vec<TupleId> = tuple_picks
            .iter()
            .map(|i| TupleId::new(i.index(num_tuples) as u64))
            .collect();

        let found = table.find(&attrs, &tuples);
        let unique: HashSet<GridId> = found.iter().copied().collect();
        prop_assert_eq!(unique.len(), found.len());

        let expected: HashSet<GridId> = layout
            .iter()
            .filter(|(_, grid_attrs, interval)| {
                grid_attrs.iter().any(|a| attrs.contains(a))
                    && tuples.iter().any(|t| interval.contains(*t))
            })
            .map(|(id, _, _)| *id)
            .collect();
        prop_assert_eq!(unique, expected);
    }
}
