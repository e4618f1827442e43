//! Diagnostic printers.
//!
//! Everything is printed through [`Fragment::print`]: the table printers
//! first build a throwaway fragment holding what they want to show.
//!
//! ```text
//! +----+-----+
//! | A  | B   |
//! +----+-----+
//! | 1  | 100 |
//! | 2  | 200 |
//! +----+-----+
//! ```

use std::io::Write;

use crate::common::{AttrId, GridId, Result, TupleId, TupletId};
use crate::grid::{FieldType, Fragment, GridTable, Schema, TupletFormat, Value};

impl Fragment {
    /// Print up to `limit` tuplets starting at `row_offset` as a table.
    pub fn print<W: Write>(&self, out: &mut W, row_offset: u64, limit: u64) -> Result<()> {
        let attrs = self.schema().attrs();
        let end = self.ntuplets().min(row_offset.saturating_add(limit));

        let mut rows = Vec::new();
        for t in row_offset..end {
            let mut row = Vec::with_capacity(attrs.len());
            for attr in attrs {
                let bytes = self.read(TupletId::new(t), attr.id);
                row.push(Value::decode(attr, bytes)?.to_string());
            }
            rows.push(row);
        }

        let widths: Vec<usize> = attrs
            .iter()
            .enumerate()
            .map(|(col, attr)| {
                rows.iter()
                    .map(|row| row[col].len())
                    .fold(attr.name.len(), usize::max)
            })
            .collect();

        h_line(out, &widths)?;
        for (attr, &width) in attrs.iter().zip(&widths) {
            write!(out, "| {:<width$} ", attr.name)?;
        }
        writeln!(out, "|")?;
        h_line(out, &widths)?;
        for row in &rows {
            for (cell, &width) in row.iter().zip(&widths) {
                write!(out, "| {cell:<width$} ")?;
            }
            writeln!(out, "|")?;
        }
        h_line(out, &widths)?;
        Ok(())
    }
}

fn h_line<W: Write>(out: &mut W, widths: &[usize]) -> Result<()> {
    for width in widths {
        write!(out, "+{}", "-".repeat(width + 2))?;
    }
    writeln!(out, "+")?;
    Ok(())
}

/// A fragment with one tuplet per row of `rows`, encoded against `schema`.
fn scratch_fragment(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Fragment> {
    let mut fragment = Fragment::new(schema, rows.len() as u64, TupletFormat::Nsm);
    fragment.insert(rows.len() as u64);

    for (t, row) in rows.iter().enumerate() {
        let encoded = row
            .iter()
            .zip(fragment.schema().attrs())
            .map(|(value, attr)| value.encode(attr))
            .collect::<Result<Vec<_>>>()?;
        for (col, bytes) in encoded.iter().enumerate() {
            fragment.write(TupletId::new(t as u64), AttrId::new(col as u32), bytes);
        }
    }
    Ok(fragment)
}

fn max_len<'s>(strings: impl Iterator<Item = &'s String>) -> usize {
    strings.map(String::len).max().unwrap_or(0).max(1)
}

impl GridTable {
    /// Print the fragment of grid `grid_id`.
    ///
    /// # Panics
    /// Panics if the table has no such grid.
    pub fn grid_print<W: Write>(
        &self,
        out: &mut W,
        grid_id: GridId,
        row_offset: u64,
        limit: u64,
    ) -> Result<()> {
        let grid = self
            .grid_by_id(grid_id)
            .unwrap_or_else(|| panic!("{grid_id} is not part of the table"));
        grid.fragment().print(out, row_offset, limit)
    }

    /// Print every tuple with every attribute, rebuilt through
    /// [`GridTable::melt`].
    pub fn table_print<W: Write>(&self, out: &mut W, row_offset: u64, limit: u64) -> Result<()> {
        let tuple_ids: Vec<TupleId> = (0..self.num_tuples()).map(TupleId::new).collect();
        let attr_ids: Vec<AttrId> = (0..self.num_attributes() as u32).map(AttrId::new).collect();
        let molten = self.melt(TupletFormat::Nsm, &tuple_ids, &attr_ids)?;

        match molten.grid_by_id(GridId::new(0)) {
            Some(grid) => grid.fragment().print(out, row_offset, limit),
            None => Fragment::new(molten.schema().clone(), 0, TupletFormat::Nsm).print(out, 0, 0),
        }
    }

    /// Print one row per grid: layout, sizes, attributes and intervals.
    pub fn grid_list_print<W: Write>(&self, out: &mut W, row_offset: u64, limit: u64) -> Result<()> {
        let attr_lists: Vec<String> = self
            .grids()
            .iter()
            .map(|grid| {
                grid.attr_ids()
                    .iter()
                    .map(|&attr| self.attr_name_by_id(attr).unwrap_or("?"))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();
        let interval_lists: Vec<String> = self
            .grids()
            .iter()
            .map(|grid| {
                grid.intervals()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();

        let mut schema = Schema::new("grid list");
        schema.add("grid id", FieldType::GridId);
        schema.add("tuple format", FieldType::TupletFormat);
        schema.add("tuplet count", FieldType::UInt64);
        schema.add("tuplet capacity", FieldType::Size);
        schema.add("tuplet size", FieldType::Size);
        schema.add("total size", FieldType::Size);
        schema.add_string("attributes", max_len(attr_lists.iter()));
        schema.add_string("intervals", max_len(interval_lists.iter()));

        let rows: Vec<Vec<Value>> = self
            .grids()
            .iter()
            .zip(attr_lists)
            .zip(interval_lists)
            .map(|((grid, attrs), intervals)| {
                let fragment = grid.fragment();
                let tuplet_size = fragment.tuplet_size() as u64;
                vec![
                    Value::GridId(grid.id()),
                    Value::TupletFormat(fragment.format()),
                    Value::UInt64(fragment.ntuplets()),
                    Value::Size(fragment.capacity()),
                    Value::Size(tuplet_size),
                    Value::Size(tuplet_size * fragment.capacity()),
                    Value::Char(attrs),
                    Value::Char(intervals),
                ]
            })
            .collect();

        scratch_fragment(schema, rows)?.print(out, row_offset, limit)
    }

    /// Print a tuples x attributes matrix naming the grid that holds each
    /// field, `-` where no grid does.
    pub fn structure_print<W: Write>(&self, out: &mut W, row_offset: u64, limit: u64) -> Result<()> {
        let cell_len = self.num_grids().saturating_sub(1).to_string().len();
        let mut schema = Schema::new("structure");
        for attr in self.schema().attrs() {
            schema.add_string(attr.name.clone(), cell_len);
        }

        let mut rows = Vec::with_capacity(self.num_tuples() as usize);
        for tid in (0..self.num_tuples()).map(TupleId::new) {
            let row: Vec<Value> = self
                .schema()
                .attrs()
                .iter()
                .map(|attr| {
                    let owner = self
                        .grids()
                        .iter()
                        .find(|grid| grid.schema_map(attr.id).is_some() && grid.covers(tid));
                    Value::Char(owner.map_or_else(|| "-".to_string(), |grid| grid.id().0.to_string()))
                })
                .collect();
            rows.push(row);
        }

        scratch_fragment(schema, rows)?.print(out, row_offset, limit)
    }
}
