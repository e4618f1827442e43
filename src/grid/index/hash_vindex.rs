//! Hash-based vertical index.

use std::collections::{HashMap, HashSet};

use crate::common::{AttrId, GridId};
use crate::grid::index::VIndex;

#[derive(Debug, Default)]
pub struct HashVIndex {
    grids: HashMap<AttrId, Vec<GridId>>,
}

impl HashVIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sized for `num_attrs` attributes.
    pub fn with_capacity(num_attrs: usize) -> Self {
        Self {
            grids: HashMap::with_capacity(2 * num_attrs),
        }
    }
}

impl VIndex for HashVIndex {
    fn add(&mut self, attr: AttrId, grid: GridId) {
        let grids = self.grids.entry(attr).or_default();
        if !grids.contains(&grid) {
            grids.push(grid);
        }
    }

    fn query(&self, attrs: &[AttrId]) -> Vec<GridId> {
        let mut seen = HashSet::new();
        attrs
            .iter()
            .filter_map(|attr| self.grids.get(attr))
            .flatten()
            .copied()
            .filter(|grid| seen.insert(*grid))
            .collect()
    }

    fn contains(&self, attr: AttrId) -> bool {
        self.grids.contains_key(&attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_unions_attrs() {
        let mut index = HashVIndex::new();
        index.add(AttrId::new(0), GridId::new(0));
        index.add(AttrId::new(1), GridId::new(0));
        index.add(AttrId::new(1), GridId::new(1));
        index.add(AttrId::new(2), GridId::new(2));

        assert_eq!(
            index.query(&[AttrId::new(1), AttrId::new(0)]),
            vec![GridId::new(0), GridId::new(1)]
        );
        assert_eq!(index.query(&[AttrId::new(2)]), vec![GridId::new(2)]);
        assert!(index.query(&[AttrId::new(7)]).is_empty());
    }

    #[test]
    fn test_contains() {
        let mut index = HashVIndex::with_capacity(4);
        index.add(AttrId::new(3), GridId::new(0));
        assert!(index.contains(AttrId::new(3)));
        assert!(!index.contains(AttrId::new(0)));
    }
}
