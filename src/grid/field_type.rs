//! Field types of grid attributes.

use std::fmt;

/// Type of one attribute value.
///
/// The first group is what user schemas are built from. `AttrId`,
/// `GridId`, `TupleId`, `Size` and `TupletFormat` only appear in the
/// schemas the diagnostic printers build on the fly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// One byte of a fixed-length string. The attribute's `rep` is the length.
    Char,

    AttrId,
    GridId,
    TupleId,
    Size,
    TupletFormat,
}

impl FieldType {
    /// Size in bytes of a single value (one character for `Char`).
    pub const fn size(&self) -> usize {
        match self {
            FieldType::Bool | FieldType::Int8 | FieldType::UInt8 | FieldType::Char => 1,
            FieldType::TupletFormat => 1,
            FieldType::Int16 | FieldType::UInt16 => 2,
            FieldType::Int32 | FieldType::UInt32 | FieldType::Float32 => 4,
            FieldType::AttrId | FieldType::GridId => 4,
            FieldType::Int64 | FieldType::UInt64 | FieldType::Float64 => 8,
            FieldType::TupleId | FieldType::Size => 8,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int8 => "s8",
            FieldType::Int16 => "s16",
            FieldType::Int32 => "s32",
            FieldType::Int64 => "s64",
            FieldType::UInt8 => "u8",
            FieldType::UInt16 => "u16",
            FieldType::UInt32 => "u32",
            FieldType::UInt64 => "u64",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Char => "char",
            FieldType::AttrId => "attr id",
            FieldType::GridId => "grid id",
            FieldType::TupleId => "tuple id",
            FieldType::Size => "size",
            FieldType::TupletFormat => "tuplet format",
        }
    }

    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            FieldType::AttrId
                | FieldType::GridId
                | FieldType::TupleId
                | FieldType::Size
                | FieldType::TupletFormat
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(FieldType::Bool.size(), 1);
        assert_eq!(FieldType::UInt16.size(), 2);
        assert_eq!(FieldType::Float32.size(), 4);
        assert_eq!(FieldType::Int64.size(), 8);
        assert_eq!(FieldType::GridId.size(), 4);
    }

    #[test]
    fn test_names() {
        assert_eq!(FieldType::Int8.to_string(), "s8");
        assert_eq!(FieldType::UInt64.name(), "u64");
        assert!(FieldType::Size.is_internal());
        assert!(!FieldType::Char.is_internal());
    }
}
