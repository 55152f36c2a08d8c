//! Two-level index tables
//!
//! An indexed family carries 65 536 `(first_row, last_row)` pairs, one per
//! value of the top 16 bits of a key. A family without an index gets an
//! empty table and the search falls back to the full row range.

use crate::error::{GeoError, Result};
use crate::source::{ByteSource, Region};
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Number of buckets in an index table
pub const INDEX_BUCKETS: usize = 1 << 16;

/// Size in bytes of one on-disk entry
pub const INDEX_ENTRY_LEN: usize = 8;

/// Size in bytes of a full index table
pub const INDEX_TABLE_LEN: usize = INDEX_BUCKETS * INDEX_ENTRY_LEN;

#[repr(C)]
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
struct RawIndexEntry {
    first_row: U32,
    last_row: U32,
}

/// Row bounds for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub first_row: u32,
    pub last_row: u32,
}

/// Index table for one address family
#[derive(Debug, Clone, Default)]
pub struct IndexTable {
    entries: Vec<IndexEntry>,
}

impl IndexTable {
    /// Table for a family that is not indexed
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a table from its raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = <[RawIndexEntry]>::ref_from_bytes(bytes).map_err(|_| {
            GeoError::corrupt(format!(
                "index table length {} is not a multiple of {}",
                bytes.len(),
                INDEX_ENTRY_LEN
            ))
        })?;
        let entries = raw
            .iter()
            .map(|e| IndexEntry {
                first_row: e.first_row.get(),
                last_row: e.last_row.get(),
            })
            .collect();
        Ok(IndexTable { entries })
    }

    /// Read a full table starting at the 0-based `offset`
    pub fn load(source: &dyn ByteSource, offset: u64) -> Result<Self> {
        let mut buf = vec![0u8; INDEX_TABLE_LEN];
        source.read_range(Region::Metadata, offset, &mut buf)?;
        Self::from_bytes(&buf)
    }

    /// Bounds for a bucket, `None` when the table is empty
    #[inline]
    pub fn get(&self, bucket: usize) -> Option<IndexEntry> {
        self.entries.get(bucket).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
