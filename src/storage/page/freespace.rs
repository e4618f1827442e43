//! Per-page free-space allocator.
//!
//! The free-space register is a capacity-bounded list of `[begin, end)`
//! byte ranges stored right after the page header. Allocation carves bytes
//! off the front of a range; returned blocks are pushed as new ranges and
//! folded back in by [`Page::rebuild`].
//!
//! Invariant: the sum of all range spans equals the header's approximate
//! free-space counter, and after a rebuild no two ranges overlap or touch.

use crate::common::{Error, Result};

use super::page::Page;
use super::page_header::PageHeader;

/// A half-open byte range `[begin, end)` within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Range {
    pub begin: usize,
    pub end: usize,
}

impl Range {
    pub fn new(begin: usize, end: usize) -> Self {
        assert!(begin <= end, "range [{begin}, {end}) is reversed");
        Self { begin, end }
    }

    #[inline]
    pub fn span(&self) -> usize {
        self.end - self.begin
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// True if both ranges are non-empty and share at least one byte.
    pub fn overlaps(&self, other: &Range) -> bool {
        !self.is_empty() && !other.is_empty() && self.begin < other.end && other.begin < self.end
    }
}

/// Placement strategy for [`Page::bind`].
///
/// The `*Merge` variants rebuild the register after a successful bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positioning {
    FirstFit,
    FirstFitMerge,
    SmallestFit,
    SmallestFitMerge,
    LargestFit,
    LargestFitMerge,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fit {
    First,
    Smallest,
    Largest,
}

impl Positioning {
    pub const ALL: [Positioning; 6] = [
        Positioning::FirstFit,
        Positioning::FirstFitMerge,
        Positioning::SmallestFit,
        Positioning::SmallestFitMerge,
        Positioning::LargestFit,
        Positioning::LargestFitMerge,
    ];

    fn fit(&self) -> Fit {
        match self {
            Positioning::FirstFit | Positioning::FirstFitMerge => Fit::First,
            Positioning::SmallestFit | Positioning::SmallestFitMerge => Fit::Smallest,
            Positioning::LargestFit | Positioning::LargestFitMerge => Fit::Largest,
        }
    }

    /// Whether this strategy rebuilds the register after binding.
    pub fn merges(&self) -> bool {
        matches!(
            self,
            Positioning::FirstFitMerge | Positioning::SmallestFitMerge | Positioning::LargestFitMerge
        )
    }
}

impl Page {
    /// Number of entries in the free-space register, empty ranges included.
    #[inline]
    pub fn freespace_len(&self) -> usize {
        self.read_u32_at(PageHeader::OFFSET_FREESPACE_LEN) as usize
    }

    fn set_freespace_len(&mut self, len: usize) {
        self.write_u32_at(PageHeader::OFFSET_FREESPACE_LEN, len as u32);
    }

    fn range_slot(&self, idx: usize) -> usize {
        assert!(
            idx < self.freespace_capacity(),
            "free-space entry {idx} beyond capacity {}",
            self.freespace_capacity()
        );
        PageHeader::freespace_table_offset() + idx * PageHeader::RANGE_SIZE
    }

    fn range_at(&self, idx: usize) -> Range {
        let slot = self.range_slot(idx);
        Range {
            begin: self.read_u64_at(slot) as usize,
            end: self.read_u64_at(slot + 8) as usize,
        }
    }

    fn set_range_at(&mut self, idx: usize, range: Range) {
        let slot = self.range_slot(idx);
        self.write_u64_at(slot, range.begin as u64);
        self.write_u64_at(slot + 8, range.end as u64);
    }

    fn store_ranges(&mut self, ranges: &[Range]) {
        for (idx, range) in ranges.iter().enumerate() {
            self.set_range_at(idx, *range);
        }
        self.set_freespace_len(ranges.len());
    }

    /// All entries of the free-space register in register order.
    pub fn free_ranges(&self) -> Vec<Range> {
        (0..self.freespace_len()).map(|idx| self.range_at(idx)).collect()
    }

    /// The running free-byte counter.
    #[inline]
    pub fn approx_free_space(&self) -> usize {
        self.read_u64_at(PageHeader::OFFSET_FREESPACE) as usize
    }

    fn set_approx_free_space(&mut self, value: usize) {
        self.write_u64_at(PageHeader::OFFSET_FREESPACE, value as u64);
    }

    /// Span of the largest single free range.
    pub fn largest_free_range(&self) -> usize {
        (0..self.freespace_len())
            .map(|idx| self.range_at(idx).span())
            .max()
            .unwrap_or(0)
    }

    /// Allocate `size` bytes using `strategy`.
    ///
    /// # Errors
    /// `Error::NoFreeSpace` if no range spans at least `size` bytes.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn bind(&mut self, size: usize, strategy: Positioning) -> Result<Range> {
        assert!(size > 0, "cannot bind zero bytes");

        let candidate = match strategy.fit() {
            Fit::First => self.find_first(size),
            fit => self.find_best(size, fit),
        };

        let Some(idx) = candidate else {
            return Err(Error::NoFreeSpace {
                page_id: self.id(),
                requested: size,
            });
        };

        let range = self.split(idx, size);
        if strategy.merges() {
            self.rebuild();
        }

        tracing::trace!(
            page_id = %self.id(),
            begin = range.begin,
            end = range.end,
            ?strategy,
            "bound free space"
        );
        Ok(range)
    }

    /// Reverse scan for the first range spanning at least `size` bytes.
    fn find_first(&self, size: usize) -> Option<usize> {
        (0..self.freespace_len())
            .rev()
            .find(|&idx| self.range_at(idx).span() >= size)
    }

    fn find_best(&self, size: usize, fit: Fit) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for idx in (0..self.freespace_len()).rev() {
            let span = self.range_at(idx).span();
            if span < size {
                continue;
            }
            let better = match best {
                None => true,
                Some((_, best_span)) => match fit {
                    Fit::Smallest => span < best_span,
                    _ => span > best_span,
                },
            };
            if better {
                best = Some((idx, span));
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Carve the front `size` bytes off entry `idx`.
    ///
    /// An exact fit leaves an empty entry behind until the next cleanup.
    fn split(&mut self, idx: usize, size: usize) -> Range {
        let mut range = self.range_at(idx);
        assert!(size <= range.span(), "split of {size} bytes from {range:?}");

        let result = Range::new(range.begin, range.begin + size);
        range.begin = result.end;
        self.set_range_at(idx, range);
        self.set_approx_free_space(self.approx_free_space() - size);
        result
    }

    /// Return a range to the register.
    ///
    /// # Errors
    /// `Error::FreeSpaceRegisterFull` if every register slot is taken.
    ///
    /// # Panics
    /// Panics if `range` lies outside the payload or overlaps a range that
    /// is already free (a double free).
    pub fn push(&mut self, range: Range) -> Result<()> {
        let len = self.freespace_len();
        if len >= self.freespace_capacity() {
            return Err(Error::FreeSpaceRegisterFull { page_id: self.id() });
        }
        assert!(
            range.begin >= self.header_size() && range.end <= self.size(),
            "range {range:?} outside the payload of {}",
            self.id()
        );
        if let Some(free) = (0..len)
            .map(|idx| self.range_at(idx))
            .find(|free| free.overlaps(&range))
        {
            panic!(
                "range {range:?} overlaps free range {free:?} of {}",
                self.id()
            );
        }

        self.set_range_at(len, range);
        self.set_freespace_len(len + 1);
        self.set_approx_free_space(self.approx_free_space() + range.span());
        Ok(())
    }

    /// True if another range can be pushed without a rebuild.
    pub fn has_free_register_slot(&self) -> bool {
        self.freespace_len() < self.freespace_capacity()
    }

    /// Drop empty ranges, compacting the register.
    pub fn cleanup(&mut self) {
        let ranges: Vec<Range> = self
            .free_ranges()
            .into_iter()
            .filter(|range| !range.is_empty())
            .collect();
        self.store_ranges(&ranges);
    }

    /// Sort ranges by `begin` and collapse adjacent or overlapping ones.
    pub fn merge(&mut self) {
        let mut ranges = self.free_ranges();
        ranges.sort_by_key(|range| range.begin);

        let mut stack: Vec<Range> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match stack.last_mut() {
                Some(top) if range.begin <= top.end => top.end = top.end.max(range.end),
                _ => stack.push(range),
            }
        }
        self.store_ranges(&stack);
    }

    /// Cleanup followed by merge.
    pub fn rebuild(&mut self) {
        let before = self.freespace_len();
        self.cleanup();
        self.merge();
        tracing::trace!(
            page_id = %self.id(),
            before,
            after = self.freespace_len(),
            "rebuilt free-space register"
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================
