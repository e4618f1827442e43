//! Integration tests for grid tables.

use gridstore::grid::{FieldType, GridTable, Schema, TupleIdInterval, TupletFormat, Value};
use gridstore::{AttrId, GridId, TupleId};

const A: AttrId = AttrId(0);
const B: AttrId = AttrId(1);
const C: AttrId = AttrId(2);
const D: AttrId = AttrId(3);

fn schema() -> Schema {
    let mut schema = Schema::new("measurements");
    schema.add("A", FieldType::UInt64);
    schema.add("B", FieldType::UInt32);
    schema.add("C", FieldType::UInt16);
    schema.add("D", FieldType::UInt16);
    schema
}

/// {A, B} over [0, 100); {C, D} split at 50 into a column and a row grid.
fn filled_table() -> GridTable {
    let mut table = GridTable::new(schema());
    table
        .add_grid(&[A, B], &[TupleIdInterval::new(0, 100)], TupletFormat::Nsm)
        .unwrap();
    table
        .add_grid(&[C, D], &[TupleIdInterval::new(0, 50)], TupletFormat::Dsm)
        .unwrap();
    table
        .add_grid(&[C, D], &[TupleIdInterval::new(50, 100)], TupletFormat::Nsm)
        .unwrap();

    let tuple_ids = table.insert(100);
    let mut cursor = table.tuple_cursor(&tuple_ids);
    while let Some(mut field) = cursor.next_tuple() {
        let t = field.tuple_id().0;
        field.write_value(&Value::UInt64(t)).unwrap();
        field.write_value(&Value::UInt32(t as u32 * 2)).unwrap();
        field.write_value(&Value::UInt16(t as u16 % 7)).unwrap();
        field.write_value(&Value::UInt16(1000 + t as u16)).unwrap();
    }
    table
}

fn render<F>(print: F) -> String
where
    F: FnOnce(&mut Vec<u8>) -> gridstore::Result<()>,
{
    let mut out = Vec::new();
    print(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_table_shape() {
    let table = filled_table();
    assert_eq!(table.num_grids(), 3);
    assert_eq!(table.num_tuples(), 100);
    assert_eq!(table.num_attributes(), 4);
    assert_eq!(table.attr_name_by_id(D), Some("D"));
    assert_eq!(table.attr_by_id(B).unwrap().field_type, FieldType::UInt32);
    assert_eq!(table.attr_id_to_frag_attr_id(GridId(2), D), Some(AttrId(1)));
}

#[test]
fn test_fields_route_to_their_grid() {
    let table = filled_table();
    for t in [0u64, 49, 50, 99] {
        let tid = TupleId(t);
        assert_eq!(table.read_field(tid, A), t.to_le_bytes());
        assert_eq!(table.read_field(tid, B), (t as u32 * 2).to_le_bytes());
        assert_eq!(table.read_field(tid, C), (t as u16 % 7).to_le_bytes());
        assert_eq!(table.read_field(tid, D), (1000 + t as u16).to_le_bytes());
    }
    assert_eq!(table.find(&[D], &[TupleId(49)]), vec![GridId(1)]);
    assert_eq!(table.find(&[D], &[TupleId(50)]), vec![GridId(2)]);
}

#[test]
fn test_find_spanning_grids() {
    let table = filled_table();
    let mut grids = table.find(&[A, C], &[TupleId(10), TupleId(60)]);
    grids.sort();
    assert_eq!(grids, vec![GridId(0), GridId(1), GridId(2)]);

    let grids = table.find(&[A], &[TupleId(10), TupleId(60)]);
    assert_eq!(grids, vec![GridId(0)]);
}

#[test]
fn test_melt_rebuilds_rows() {
    let table = filled_table();
    let tuple_ids: Vec<TupleId> = (45..55).map(TupleId).collect();
    let molten = table.melt(TupletFormat::Nsm, &tuple_ids, &[D, A]).unwrap();

    assert_eq!(molten.num_grids(), 1);
    assert_eq!(molten.num_tuples(), 10);
    assert_eq!(molten.attr_name_by_id(AttrId(0)), Some("D"));
    for (row, t) in (45u64..55).enumerate() {
        let tid = TupleId(row as u64);
        assert_eq!(molten.read_field(tid, AttrId(0)), (1000 + t as u16).to_le_bytes());
        assert_eq!(molten.read_field(tid, AttrId(1)), t.to_le_bytes());
    }
}

#[test]
fn test_table_print() {
    let table = filled_table();
    let text = render(|out| table.table_print(out, 0, 3));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "+---+---+---+------+");
    assert_eq!(lines[1], "| A | B | C | D    |");
    assert_eq!(lines[3], "| 0 | 0 | 0 | 1000 |");
    assert_eq!(lines[5], "| 2 | 4 | 2 | 1002 |");
}

#[test]
fn test_structure_print() {
    let table = filled_table();
    let text = render(|out| table.structure_print(out, 48, 4));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "| A | B | C | D |");
    assert_eq!(lines[3], "| 0 | 0 | 1 | 1 |");
    assert_eq!(lines[4], "| 0 | 0 | 1 | 1 |");
    assert_eq!(lines[5], "| 0 | 0 | 2 | 2 |");
    assert_eq!(lines[6], "| 0 | 0 | 2 | 2 |");
}

#[test]
fn test_grid_list_print() {
    let table = filled_table();
    let text = render(|out| table.grid_list_print(out, 0, u64::MAX));
    let rows: Vec<&str> = text.lines().filter(|l| l.starts_with("| ")).collect();
    // header plus one row per grid
    assert_eq!(rows.len(), 4);
    assert!(rows[0].contains("tuplet capacity"));
    assert!(rows[1].contains("| row "));
    assert!(rows[1].contains("A,B"));
    assert!(rows[2].contains("column"));
    assert!(rows[3].contains("[50, 100)"));
    // 50 tuplets x (2 + 2) bytes
    assert!(rows[2].contains("| 200 "));
}

#[test]
fn test_grid_print_shows_local_tuplets() {
    let table = filled_table();
    let text = render(|out| table.grid_print(out, GridId(2), 0, 1));
    assert!(text.contains("| 1 | 1050 |"));
}

#[test]
#[should_panic(expected = "Does the table field cover contain gaps?")]
fn test_gap_is_fatal() {
    let mut table = GridTable::new(schema());
    table
        .add_grid(&[A, B, C, D], &[TupleIdInterval::new(0, 10)], TupletFormat::Nsm)
        .unwrap();
    table
        .add_grid(&[A, B, C, D], &[TupleIdInterval::new(20, 30)], TupletFormat::Nsm)
        .unwrap();
    table.read_field(TupleId(15), A);
}

/// One grid over the whole schema holding three hand-written tuples.
#[test]
fn test_single_grid_table() {
    let mut table = GridTable::new(schema());
    let g1 = table
        .add_grid(&[A, B, C, D], &[TupleIdInterval::new(0, 3)], TupletFormat::Nsm)
        .unwrap();

    let tuple_ids = table.insert(3);
    let rows = [(1u64, 2u32, 3u16, 4u16), (5, 6, 7, 8), (9, 10, 11, 12)];
    let mut cursor = table.tuple_cursor(&tuple_ids);
    for (a, b, c, d) in rows {
        let mut field = cursor.next_tuple().unwrap();
        assert!(field.write_value(&Value::UInt64(a)).unwrap());
        assert!(field.write_value(&Value::UInt32(b)).unwrap());
        assert!(field.write_value(&Value::UInt16(c)).unwrap());
        assert!(!field.write_value(&Value::UInt16(d)).unwrap());
    }
    assert!(cursor.next_tuple().is_none());

    assert_eq!(table.find(&[A], &tuple_ids), vec![g1]);
    assert_eq!(table.attr_id_to_frag_attr_id(g1, A), Some(AttrId(0)));
    assert_eq!(table.read_field(TupleId(1), C), 7u16.to_le_bytes());
    assert_eq!(table.read_field(TupleId(2), A), 9u64.to_le_bytes());
}
