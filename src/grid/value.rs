//! Typed scalars and their byte encoding.
//!
//! Numbers are stored little-endian. Strings are zero-padded to the
//! attribute's length and lose their trailing zeros on decode.

use std::fmt;

use crate::common::{AttrId, Error, GridId, Result, TupleId};
use crate::grid::{Attr, FieldType, TupletFormat};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Char(String),
    AttrId(AttrId),
    GridId(GridId),
    TupleId(TupleId),
    Size(u64),
    TupletFormat(TupletFormat),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Bool(_) => FieldType::Bool,
            Value::Int8(_) => FieldType::Int8,
            Value::Int16(_) => FieldType::Int16,
            Value::Int32(_) => FieldType::Int32,
            Value::Int64(_) => FieldType::Int64,
            Value::UInt8(_) => FieldType::UInt8,
            Value::UInt16(_) => FieldType::UInt16,
            Value::UInt32(_) => FieldType::UInt32,
            Value::UInt64(_) => FieldType::UInt64,
            Value::Float32(_) => FieldType::Float32,
            Value::Float64(_) => FieldType::Float64,
            Value::Char(_) => FieldType::Char,
            Value::AttrId(_) => FieldType::AttrId,
            Value::GridId(_) => FieldType::GridId,
            Value::TupleId(_) => FieldType::TupleId,
            Value::Size(_) => FieldType::Size,
            Value::TupletFormat(_) => FieldType::TupletFormat,
        }
    }

    /// Bytes of this value as a field of `attr`.
    ///
    /// # Errors
    /// `Error::TypeMismatch` if the value's type is not the attribute's, or
    /// a string is longer than the attribute.
    pub fn encode(&self, attr: &Attr) -> Result<Vec<u8>> {
        let mismatch = || Error::TypeMismatch {
            attr: attr.id,
            expected: attr.field_type.name(),
        };
        if self.field_type() != attr.field_type {
            return Err(mismatch());
        }

        let bytes = match self {
            Value::Bool(v) => vec![u8::from(*v)],
            Value::Int8(v) => v.to_le_bytes().to_vec(),
            Value::Int16(v) => v.to_le_bytes().to_vec(),
            Value::Int32(v) => v.to_le_bytes().to_vec(),
            Value::Int64(v) => v.to_le_bytes().to_vec(),
            Value::UInt8(v) => vec![*v],
            Value::UInt16(v) => v.to_le_bytes().to_vec(),
            Value::UInt32(v) => v.to_le_bytes().to_vec(),
            Value::UInt64(v) => v.to_le_bytes().to_vec(),
            Value::Float32(v) => v.to_le_bytes().to_vec(),
            Value::Float64(v) => v.to_le_bytes().to_vec(),
            Value::Char(s) => {
                if s.len() > attr.size() {
                    return Err(mismatch());
                }
                let mut bytes = s.as_bytes().to_vec();
                bytes.resize(attr.size(), 0);
                return Ok(bytes);
            }
            Value::AttrId(id) => id.0.to_le_bytes().to_vec(),
            Value::GridId(id) => id.0.to_le_bytes().to_vec(),
            Value::TupleId(id) => id.0.to_le_bytes().to_vec(),
            Value::Size(v) => v.to_le_bytes().to_vec(),
            Value::TupletFormat(format) => vec![format.to_byte()],
        };
        if bytes.len() != attr.size() {
            // Arrays (rep > 1) of non-string types are not scalar values.
            return Err(mismatch());
        }
        Ok(bytes)
    }

    /// Read a field of `attr` back.
    ///
    /// # Errors
    /// `Error::TypeMismatch` if `bytes` is not exactly one field long, or
    /// does not hold a valid value of the type.
    pub fn decode(attr: &Attr, bytes: &[u8]) -> Result<Value> {
        let mismatch = || Error::TypeMismatch {
            attr: attr.id,
            expected: attr.field_type.name(),
        };
        if bytes.len() != attr.size() {
            return Err(mismatch());
        }
        if attr.field_type == FieldType::Char {
            let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            return Ok(Value::Char(String::from_utf8_lossy(&bytes[..end]).into_owned()));
        }

        let width = attr.field_type.size();
        if bytes.len() != width {
            return Err(mismatch());
        }
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(bytes);

        let value = match attr.field_type {
            FieldType::Bool => Value::Bool(raw[0] != 0),
            FieldType::Int8 => Value::Int8(i8::from_le_bytes([raw[0]])),
            FieldType::Int16 => Value::Int16(i16::from_le_bytes([raw[0], raw[1]])),
            FieldType::Int32 => Value::Int32(i32::from_le_bytes(quad(&raw))),
            FieldType::Int64 => Value::Int64(i64::from_le_bytes(raw)),
            FieldType::UInt8 => Value::UInt8(raw[0]),
            FieldType::UInt16 => Value::UInt16(u16::from_le_bytes([raw[0], raw[1]])),
            FieldType::UInt32 => Value::UInt32(u32::from_le_bytes(quad(&raw))),
            FieldType::UInt64 => Value::UInt64(u64::from_le_bytes(raw)),
            FieldType::Float32 => Value::Float32(f32::from_le_bytes(quad(&raw))),
            FieldType::Float64 => Value::Float64(f64::from_le_bytes(raw)),
            FieldType::AttrId => Value::AttrId(AttrId::new(u32::from_le_bytes(quad(&raw)))),
            FieldType::GridId => Value::GridId(GridId::new(u32::from_le_bytes(quad(&raw)))),
            FieldType::TupleId => Value::TupleId(TupleId::new(u64::from_le_bytes(raw))),
            FieldType::Size => Value::Size(u64::from_le_bytes(raw)),
            FieldType::TupletFormat => {
                Value::TupletFormat(TupletFormat::from_byte(raw[0]).ok_or_else(mismatch)?)
            }
            FieldType::Char => unreachable!("strings are decoded above"),
        };
        Ok(value)
    }
}

#[inline]
fn quad(raw: &[u8; 8]) -> [u8; 4] {
    [raw[0], raw[1], raw[2], raw[3]]
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v:.6}"),
            Value::Float64(v) => write!(f, "{v:.6}"),
            Value::Char(s) => f.write_str(s),
            Value::AttrId(id) => write!(f, "{}", id.0),
            Value::GridId(id) => write!(f, "{}", id.0),
            Value::TupleId(id) => write!(f, "{}", id.0),
            Value::Size(v) => write!(f, "{v}"),
            Value::TupletFormat(format) => write!(f, "{format}"),
        }
    }
}
