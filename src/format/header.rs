//! BIN file header
//!
//! The first 64 bytes of every database file. All multi-byte fields are
//! little-endian and the struct is read with zerocopy, so there are no
//! alignment requirements on the source buffer.
//!
//! Offsets stored in the header are 1-based file positions; the accessors on
//! [`DatabaseMetadata`] return 0-based byte ranges.

use crate::address::Family;
use crate::error::{GeoError, Result};
use crate::format::index::INDEX_TABLE_LEN;
use crate::schema::{ColumnLayout, MAX_SCHEMA_TYPE};
use serde::Serialize;
use std::ops::Range;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Size of the fixed header in bytes
pub const HEADER_LEN: usize = 64;

/// Product code every file released since [`PRODUCT_CODE_CUTOFF_YEAR`] carries
pub const EXPECTED_PRODUCT_CODE: u8 = 1;

/// Two-digit release year from which the product code is checked
pub const PRODUCT_CODE_CUTOFF_YEAR: u8 = 21;

/// On-disk header layout (64 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawHeader {
    pub schema_type: u8,
    pub column_count: u8,
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub ipv4_count: U32,
    pub ipv4_base: U32,
    pub ipv6_count: U32,
    pub ipv6_base: U32,
    pub ipv4_index_base: U32,
    pub ipv6_index_base: U32,
    pub product_code: u8,
    pub product_type: u8,
    pub file_size: U32,
    pub reserved: [u8; 29],
}

const _: () = assert!(std::mem::size_of::<RawHeader>() == HEADER_LEN);

/// Parsed and validated header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseMetadata {
    pub schema_type: u8,
    pub column_count: u8,
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub ipv4_count: u32,
    pub ipv4_base: u32,
    pub ipv6_count: u32,
    pub ipv6_base: u32,
    pub ipv4_index_base: u32,
    pub ipv6_index_base: u32,
    pub product_code: u8,
    pub product_type: u8,
    pub file_size: u32,
}

impl DatabaseMetadata {
    /// Parse the header at the start of `bytes`
    ///
    /// Checks everything that can be checked without knowing the file
    /// length: archive signatures, the product code, the schema type and
    /// the column count. Call [`validate_geometry`](Self::validate_geometry)
    /// once the file length is known.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let head = bytes.get(..HEADER_LEN).ok_or_else(|| {
            GeoError::corrupt(format!(
                "file too small for header: {} bytes, need {}",
                bytes.len(),
                HEADER_LEN
            ))
        })?;

        match head {
            [b'P', b'K', ..] => {
                return Err(GeoError::corrupt("file is a ZIP archive, extract it first"))
            }
            [0x1f, 0x8b, ..] => {
                return Err(GeoError::corrupt("file is gzip-compressed, decompress it first"))
            }
            _ => {}
        }

        let raw = RawHeader::read_from_bytes(head)
            .map_err(|_| GeoError::corrupt("unreadable header"))?;
        let metadata = DatabaseMetadata::from(&raw);

        if metadata.year >= PRODUCT_CODE_CUTOFF_YEAR
            && metadata.product_code != EXPECTED_PRODUCT_CODE
        {
            return Err(GeoError::corrupt(format!(
                "unexpected product code {} for a 20{:02} release",
                metadata.product_code, metadata.year
            )));
        }

        let layout = ColumnLayout::for_schema(metadata.schema_type).ok_or_else(|| {
            GeoError::corrupt(format!(
                "schema type {} outside 1..={}",
                metadata.schema_type, MAX_SCHEMA_TYPE
            ))
        })?;

        if metadata.column_count < layout.min_column_count() {
            return Err(GeoError::corrupt(format!(
                "schema type {} needs at least {} columns, header declares {}",
                metadata.schema_type,
                layout.min_column_count(),
                metadata.column_count
            )));
        }

        Ok(metadata)
    }

    /// Check the declared tables against the actual file length
    pub fn validate_geometry(&self, file_len: u64) -> Result<()> {
        if self.file_size != 0 && u64::from(self.file_size) > file_len {
            return Err(GeoError::corrupt(format!(
                "file truncated: header declares {} bytes, found {}",
                self.file_size, file_len
            )));
        }

        for family in [Family::V4, Family::V6] {
            if self.row_count(family) > 0 && self.row_base(family) == 0 {
                return Err(GeoError::corrupt(format!("{} row table has no base", family)));
            }
            let rows = self.row_region(family);
            if rows.end > file_len {
                return Err(GeoError::corrupt(format!(
                    "{} row table ends at {}, past end of file ({})",
                    family, rows.end, file_len
                )));
            }
            if let Some(index) = self.index_region(family) {
                if index.end > file_len {
                    return Err(GeoError::corrupt(format!(
                        "{} index table ends at {}, past end of file ({})",
                        family, index.end, file_len
                    )));
                }
            }
        }

        Ok(())
    }

    /// True when the file predates IPv6 support
    pub fn is_legacy(&self) -> bool {
        self.ipv6_count == 0
    }

    /// Release date as `YYYY-MM-DD`
    pub fn release_date(&self) -> String {
        format!("20{:02}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// Width in bytes of one row of `family`
    pub fn row_width(&self, family: Family) -> usize {
        let cols = usize::from(self.column_count);
        match family {
            Family::V4 => 4 * cols,
            Family::V6 => 16 + 4 * cols.saturating_sub(1),
        }
    }

    /// Number of rows in the `family` table
    pub fn row_count(&self, family: Family) -> u32 {
        match family {
            Family::V4 => self.ipv4_count,
            Family::V6 => self.ipv6_count,
        }
    }

    fn row_base(&self, family: Family) -> u32 {
        match family {
            Family::V4 => self.ipv4_base,
            Family::V6 => self.ipv6_base,
        }
    }

    fn index_base(&self, family: Family) -> u32 {
        match family {
            Family::V4 => self.ipv4_index_base,
            Family::V6 => self.ipv6_index_base,
        }
    }

    /// 0-based byte range of the `family` row table (empty when absent)
    pub fn row_region(&self, family: Family) -> Range<u64> {
        let count = u64::from(self.row_count(family));
        let base = u64::from(self.row_base(family));
        if count == 0 || base == 0 {
            return 0..0;
        }
        let start = base - 1;
        start..start + count * self.row_width(family) as u64
    }

    /// Whether the header declares an index table for `family`
    ///
    /// The IPv6 index of a legacy file is never consulted.
    pub fn is_indexed(&self, family: Family) -> bool {
        self.index_base(family) != 0 && !(family == Family::V6 && self.is_legacy())
    }

    /// 0-based byte range of the `family` index table
    pub fn index_region(&self, family: Family) -> Option<Range<u64>> {
        if !self.is_indexed(family) {
            return None;
        }
        let start = u64::from(self.index_base(family)) - 1;
        Some(start..start + INDEX_TABLE_LEN as u64)
    }

    /// First byte after the last row table, where string payloads begin
    pub fn payload_start(&self) -> u64 {
        let v4 = self.row_region(Family::V4).end;
        let v6 = self.row_region(Family::V6).end;
        v4.max(v6).max(HEADER_LEN as u64)
    }
}

impl From<&RawHeader> for DatabaseMetadata {
    fn from(raw: &RawHeader) -> Self {
        DatabaseMetadata {
            schema_type: raw.schema_type,
            column_count: raw.column_count,
            year: raw.year,
            month: raw.month,
            day: raw.day,
            ipv4_count: raw.ipv4_count.get(),
            ipv4_base: raw.ipv4_base.get(),
            ipv6_count: raw.ipv6_count.get(),
            ipv6_base: raw.ipv6_base.get(),
            ipv4_index_base: raw.ipv4_index_base.get(),
            ipv6_index_base: raw.ipv6_index_base.get(),
            product_code: raw.product_code,
            product_type: raw.product_type,
            file_size: raw.file_size.get(),
        }
    }
}
