//! Attributes and schemas.
//!
//! Attribute ids are positional: the n-th attribute added to a schema has
//! id n. A [`Schema::subset`] renumbers the picked attributes from zero.

use crate::common::{AttrId, Error, Result};
use crate::grid::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrFlags {
    pub primary: bool,
    pub nullable: bool,
    pub autoinc: bool,
    pub unique: bool,
}

/// One column of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub id: AttrId,
    pub name: String,
    pub field_type: FieldType,
    /// Number of values per field. Strings use it as their length.
    pub rep: usize,
    pub flags: AttrFlags,
}

impl Attr {
    /// Bytes one field of this attribute occupies.
    #[inline]
    pub fn size(&self) -> usize {
        self.rep * self.field_type.size()
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        self.field_type == FieldType::Char
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    attrs: Vec<Attr>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a single-valued attribute.
    pub fn add(&mut self, name: impl Into<String>, field_type: FieldType) -> AttrId {
        self.add_attr(name, field_type, 1, AttrFlags::default())
    }

    /// Append a fixed-length string attribute of `len` bytes.
    pub fn add_string(&mut self, name: impl Into<String>, len: usize) -> AttrId {
        self.add_attr(name, FieldType::Char, len, AttrFlags::default())
    }

    /// # Panics
    /// Panics if `rep` is zero.
    pub fn add_attr(
        &mut self,
        name: impl Into<String>,
        field_type: FieldType,
        rep: usize,
        flags: AttrFlags,
    ) -> AttrId {
        assert!(rep > 0, "attribute needs at least one value per field");
        let id = AttrId::new(self.attrs.len() as u32);
        self.attrs.push(Attr {
            id,
            name: name.into(),
            field_type,
            rep,
            flags,
        });
        id
    }

    pub fn attr_by_id(&self, id: AttrId) -> Option<&Attr> {
        self.attrs.get(id.index())
    }

    pub fn attr_by_name(&self, name: &str) -> Option<&Attr> {
        self.attrs.iter().find(|attr| attr.name == name)
    }

    pub fn attrs(&self) -> &[Attr] {
        &self.attrs
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Copy of the attributes `ids`, in that order, renumbered from zero.
    ///
    /// # Errors
    /// `Error::UnknownAttribute` for the first id not in this schema.
    pub fn subset(&self, ids: &[AttrId]) -> Result<Schema> {
        let mut subset = Schema::new(self.name.clone());
        for &id in ids {
            let attr = self.attr_by_id(id).ok_or(Error::UnknownAttribute(id))?;
            subset.add_attr(attr.name.clone(), attr.field_type, attr.rep, attr.flags);
        }
        Ok(subset)
    }

    /// Bytes of one record holding every attribute.
    pub fn tuple_size(&self) -> usize {
        self.attrs.iter().map(Attr::size).sum()
    }
}
