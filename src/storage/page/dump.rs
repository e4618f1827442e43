//! Human-readable page layout report.

use std::fmt::Write;

use super::lane::LaneState;
use super::page::Page;
use super::page_header::PageHeader;
use super::zone::ZONE_HEADER_SIZE;

const HEX_ROW: usize = 16;

impl Page {
    /// Render the page layout: segments, registers, lanes and the zones
    /// that live on this page. With `hex_view`, zone payloads are printed
    /// as a hex table.
    pub fn dump(&self, hex_view: bool) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_dump(&mut out, hex_view);
        out
    }

    fn write_dump(&self, out: &mut String, hex_view: bool) -> std::fmt::Result {
        let fcap = self.freespace_capacity();
        let lcap = self.lane_capacity();
        let capacity = self.payload_capacity();
        let free = self.approx_free_space();

        writeln!(out, "#")?;
        writeln!(
            out,
            "# {}, size/capacity/free={}/{}/{} byte (footprint={:.4}%, filled={:.4}%)",
            self.id(),
            self.size(),
            capacity,
            free,
            self.header_size() as f64 / self.size() as f64 * 100.0,
            (capacity - free) as f64 / capacity as f64 * 100.0
        )?;
        writeln!(out, "# flags: {}", self.flags())?;
        writeln!(out, "#")?;
        writeln!(out, "# Segments:")?;
        writeln!(out, "# {:#010x} [HEADER]", 0)?;
        writeln!(out, "# {:#010x}  [free space register]", PageHeader::OFFSET_FREESPACE_CAPACITY)?;
        writeln!(out, "#              capacity: {}", fcap)?;
        writeln!(out, "#              size: {}", self.freespace_len())?;
        writeln!(out, "# {:#010x}  [lane register]", PageHeader::OFFSET_LANE_CAPACITY)?;
        writeln!(out, "#              capacity: {}", lcap)?;
        writeln!(out, "#              in-use size: {}", self.lanes_in_use())?;
        writeln!(out, "#              free-list size: {}", self.lane_free_len())?;

        let table = PageHeader::freespace_table_offset();
        writeln!(out, "# {:#010x}  [free space data]", table)?;
        for (idx, range) in self.free_ranges().iter().enumerate() {
            writeln!(
                out,
                "# {:#010x}    idx={}: off_start={}, off_end={}",
                table + idx * PageHeader::RANGE_SIZE,
                idx,
                range.begin,
                range.end
            )?;
        }
        if self.freespace_len() < fcap {
            writeln!(
                out,
                "# {:#010x}    (undefined until {:#010x})",
                table + self.freespace_len() * PageHeader::RANGE_SIZE,
                table + (fcap - 1) * PageHeader::RANGE_SIZE
            )?;
        }

        let offsets = PageHeader::lane_offset_table_offset(fcap);
        writeln!(out, "# {:#010x}  [lane register in-use list]", offsets)?;
        for idx in 0..lcap {
            let lane_id = crate::common::LaneId::new(idx as u32);
            let slot = offsets + idx * PageHeader::LANE_OFFSET_SIZE;
            match self.lane_offset(lane_id) {
                Some(offset) => {
                    writeln!(out, "# {:#010x}    lane_id={:05}: offset={:#010x}", slot, idx, offset)?
                }
                None => writeln!(out, "# {:#010x}    lane_id={:05}: offset=(unset)", slot, idx)?,
            }
        }

        let stack = PageHeader::lane_stack_offset(fcap, lcap);
        writeln!(out, "# {:#010x}  [lane register free-list stack]", stack)?;
        let free_ids = self.lane_free_ids();
        for (pos, lane_id) in free_ids.iter().rev().enumerate() {
            writeln!(
                out,
                "# {:#010x}    pos={:05}: lane_id={}",
                stack + pos * PageHeader::LANE_ID_SIZE,
                pos,
                lane_id.0
            )?;
        }
        for pos in free_ids.len()..lcap {
            writeln!(
                out,
                "# {:#010x}    pos={:05}: (unset)",
                stack + pos * PageHeader::LANE_ID_SIZE,
                pos
            )?;
        }

        writeln!(out, "# {:#010x} [PAYLOAD]", self.header_size())?;
        writeln!(out, "# ---------- [LANES IN USE]")?;
        for lane_id in self.lane_ids(LaneState::InUse) {
            let offset = self.expect_lane_offset(lane_id);
            if let Some(lane) = self.lane(lane_id) {
                writeln!(
                    out,
                    "# {:#010x}    elem_size:{}, first:{}, last:{}",
                    offset, lane.elem_size, lane.first, lane.last
                )?;
            }
        }

        writeln!(out, "# ---------- [ZONES]")?;
        for lane_id in self.lane_ids(LaneState::InUse) {
            let Some(lane) = self.lane(lane_id) else {
                continue;
            };
            let mut ptr = lane.first;
            // Only the zones stored on this page can be followed here.
            while !ptr.is_null() && ptr.page_id == self.id() {
                let zone = self.zone(ptr.offset);
                writeln!(out, "# {:#010x}    prev:{}, next:{}", ptr.offset, zone.prev, zone.next)?;
                if hex_view {
                    self.write_hex(out, ptr.offset + ZONE_HEADER_SIZE, lane.elem_size)?;
                }
                ptr = zone.next;
            }
        }
        writeln!(out, "# {:#010x} end", self.size())?;
        writeln!(out, "#")
    }

    fn write_hex(&self, out: &mut String, offset: usize, len: usize) -> std::fmt::Result {
        write!(out, "# zone content  ")?;
        for col in 0..HEX_ROW {
            write!(out, "{:02x} ", col)?;
        }
        writeln!(out)?;

        for (row, chunk) in self.bytes(offset, len).chunks(HEX_ROW).enumerate() {
            write!(out, "# {:#010x}    ", offset + row * HEX_ROW)?;
            for byte in chunk {
                write!(out, "{:02X} ", byte)?;
            }
            for _ in chunk.len()..HEX_ROW {
                write!(out, "   ")?;
            }
            for &byte in chunk {
                let c = if byte.is_ascii_graphic() { byte as char } else { '.' };
                write!(out, "{} ", c)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::common::PageId;
    use crate::storage::page::{Page, PageFlags, Positioning};

    #[test]
    fn test_dump_lists_registers() {
        let mut page = Page::create(PageId::new(4), 4096, PageFlags::empty(), 4, 2).unwrap();
        page.create_lane(Positioning::FirstFit, 16).unwrap();

        let dump = page.dump(false);
        assert!(dump.contains("Page(4)"));
        assert!(dump.contains("[free space register]"));
        assert!(dump.contains("lane_id=00000: offset=0x"));
        assert!(dump.contains("lane_id=00001: offset=(unset)"));
        assert!(dump.contains("elem_size:16"));
        assert!(dump.contains("end"));
    }
}
