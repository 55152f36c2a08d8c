//! Index-accelerated range search
//!
//! Rows of a family table are sorted by range start and together cover the
//! whole address space. The end of row `n` is the start of row `n + 1`; the
//! last row ends at the family maximum. A key matches row `n` when
//! `start <= key < end`.

use crate::address::Family;
use crate::error::{GeoError, Result};
use crate::format::index::IndexTable;
use crate::record::LookupRecord;
use crate::source::{ByteSource, Region};

/// One family's row table, viewed through a byte source
pub struct RowTable<'a> {
    source: &'a dyn ByteSource,
    family: Family,
    base: u64,
    row_count: u32,
    row_width: usize,
    index: &'a IndexTable,
}

impl<'a> RowTable<'a> {
    /// `base` is the 0-based offset of row 0
    pub fn new(
        source: &'a dyn ByteSource,
        family: Family,
        base: u64,
        row_count: u32,
        row_width: usize,
        index: &'a IndexTable,
    ) -> Self {
        RowTable {
            source,
            family,
            base,
            row_count,
            row_width,
            index,
        }
    }

    /// Find the row whose range contains `key`
    pub fn find(&self, key: u128) -> Result<LookupRecord> {
        if self.row_count == 0 {
            return Err(GeoError::NotFound);
        }

        let max = self.family.max_value();
        // The last range is open at the top, so the maximum itself is never a start
        let key = if key >= max { max - 1 } else { key };

        let (mut low, mut high) = match self.index.get((key >> self.family.bucket_shift()) as usize)
        {
            Some(entry) => (entry.first_row, entry.last_row),
            None => (0, self.row_count),
        };
        high = high.min(self.row_count - 1);

        let key_width = self.family.key_width();
        let mut row = vec![0u8; self.row_width];
        let mut next = [0u8; 16];

        while low <= high {
            let mid = ((u64::from(low) + u64::from(high)) / 2) as u32;
            self.read(mid, &mut row)?;
            let start = decode_key(&row[..key_width]);
            let end = if mid + 1 < self.row_count {
                self.read(mid + 1, &mut next[..key_width])?;
                decode_key(&next[..key_width])
            } else {
                max
            };

            if key < start {
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            } else if key >= end {
                low = mid + 1;
            } else {
                return Ok(LookupRecord::new(start, end, row[key_width..].to_vec()));
            }
        }

        Err(GeoError::NotFound)
    }

    fn read(&self, row: u32, buf: &mut [u8]) -> Result<()> {
        let offset = self.base + u64::from(row) * self.row_width as u64;
        self.source
            .read_range(Region::rows(self.family), offset, buf)?;
        Ok(())
    }
}

fn decode_key(bytes: &[u8]) -> u128 {
    match bytes.len() {
        4 => u128::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        _ => {
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&bytes[..16]);
            u128::from_le_bytes(raw)
        }
    }
}
