//! Tuple id allocation.

use crate::common::TupleId;

/// Hands out tuple ids, reusing returned ones before minting new ones.
#[derive(Debug, Default)]
pub struct TupleIdFreelist {
    free: Vec<TupleId>,
    next: TupleId,
}

impl TupleIdFreelist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `n` ids.
    pub fn bind(&mut self, n: usize) -> Vec<TupleId> {
        let reused = n.min(self.free.len());
        let start = self.free.len() - reused;
        let mut ids: Vec<TupleId> = self.free.drain(start..).rev().collect();
        for _ in reused..n {
            ids.push(self.next);
            self.next = TupleId::new(self.next.0 + 1);
        }
        ids
    }

    /// Give ids back for reuse.
    pub fn push_back(&mut self, ids: &[TupleId]) {
        self.free.extend_from_slice(ids);
    }

    /// The id the next fresh bind would mint.
    pub fn peek_new(&self) -> TupleId {
        self.next
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_sequential() {
        let mut freelist = TupleIdFreelist::new();
        let ids = freelist.bind(3);
        assert_eq!(ids, vec![TupleId::new(0), TupleId::new(1), TupleId::new(2)]);
        assert_eq!(freelist.peek_new(), TupleId::new(3));
    }

    #[test]
    fn test_returned_ids_are_reused_first() {
        let mut freelist = TupleIdFreelist::new();
        freelist.bind(4);
        freelist.push_back(&[TupleId::new(1), TupleId::new(3)]);
        assert_eq!(freelist.num_free(), 2);

        let ids = freelist.bind(3);
        assert_eq!(ids, vec![TupleId::new(3), TupleId::new(1), TupleId::new(4)]);
        assert_eq!(freelist.num_free(), 0);
        assert_eq!(freelist.peek_new(), TupleId::new(5));
    }
}
