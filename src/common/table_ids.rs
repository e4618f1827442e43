//! Identifier types of the grid table layer.
//!
//! - [`AttrId`] - position of an attribute within a schema
//! - [`GridId`] - position of a grid within its table
//! - [`TupleId`] - global tuple identifier of a table
//! - [`TupletId`] - grid-local record identifier within one fragment

use std::fmt;

macro_rules! table_id {
    ($(#[$meta:meta])* $name:ident($inner:ty), $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub $inner);

        impl $name {
            #[inline]
            pub fn new(id: $inner) -> Self {
                $name(id)
            }

            /// The id as a position into a vector.
            #[inline]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

table_id!(
    /// Positional attribute id: the attribute's index in its defining schema.
    AttrId(u32),
    "Attr"
);

table_id!(
    /// Grid id: the grid's index in its table's grid list.
    GridId(u32),
    "Grid"
);

table_id!(
    /// Global tuple identifier, shared by every grid of a table.
    TupleId(u64),
    "Tuple"
);

table_id!(
    /// Grid-local tuple identifier, dense in `[0, fragment capacity)`.
    TupletId(u64),
    "Tuplet"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_id_display() {
        assert_eq!(AttrId::new(2).to_string(), "Attr(2)");
        assert_eq!(GridId::new(0).to_string(), "Grid(0)");
        assert_eq!(TupleId::new(17).to_string(), "Tuple(17)");
        assert_eq!(TupletId::new(4).to_string(), "Tuplet(4)");
    }

    #[test]
    fn test_table_id_ordering() {
        assert!(TupleId::new(1) < TupleId::new(2));
        assert_eq!(GridId::new(3).index(), 3);
    }
}
