//! Byte access to a BIN file
//!
//! Range search and field decoding read through the [`ByteSource`] trait and
//! never care which access mode is active. Two implementations exist:
//!
//! - [`DirectFile`] opens a fresh handle for every read, seeks to the
//!   absolute offset and reads. The handle is closed when the read returns,
//!   on success and on error alike, so no file position is ever shared
//!   between queries.
//! - [`MappedRegions`] keeps three read-only memory maps: the IPv4 row table,
//!   the IPv6 row table and the payload region holding the length-prefixed
//!   strings. Absolute offsets are rebased onto the view that owns them.
//!
//! # Safety
//!
//! Memory-mapped files are inherently unsafe (another process may truncate
//! or rewrite the file). Every access is bounds-checked against the view,
//! so a modified file yields I/O errors rather than out-of-bounds reads.

use crate::address::Family;
use crate::format::DatabaseMetadata;
use memmap2::{Mmap, MmapOptions};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Part of the file a read targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Header and index tables (only read at load time)
    Metadata,
    /// IPv4 row table
    Ipv4Rows,
    /// IPv6 row table
    Ipv6Rows,
    /// Length-prefixed string records
    Payload,
}

impl Region {
    /// Row table region for a family
    pub fn rows(family: Family) -> Self {
        match family {
            Family::V4 => Region::Ipv4Rows,
            Family::V6 => Region::Ipv6Rows,
        }
    }
}

/// Positioned, shareable read access to database bytes
///
/// `offset` is always an absolute 0-based file offset.
pub trait ByteSource: Send + Sync {
    /// Fill `buf` with the bytes at `offset`
    fn read_range(&self, region: Region, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// Reads straight from the file, one scoped handle per read
#[derive(Debug, Clone)]
pub struct DirectFile {
    path: PathBuf,
}

impl DirectFile {
    /// Create a reader for `path` (the file is not opened until a read)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DirectFile { path: path.into() }
    }

    /// Path this reader opens
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for DirectFile {
    fn read_range(&self, _region: Region, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)
    }
}

/// One memory-mapped view and the absolute offset it starts at
struct RegionView {
    start: u64,
    map: Mmap,
}

impl RegionView {
    fn map(file: &File, range: Range<u64>) -> io::Result<Option<Self>> {
        if range.is_empty() {
            return Ok(None);
        }
        let len = usize::try_from(range.end - range.start)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "region too large to map"))?;
        // SAFETY: the map is read-only and every access below is bounds-checked
        let map = unsafe { MmapOptions::new().offset(range.start).len(len).map(file)? };
        Ok(Some(RegionView {
            start: range.start,
            map,
        }))
    }

    fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        let rel = usize::try_from(offset.checked_sub(self.start)?).ok()?;
        self.map.get(rel..rel.checked_add(len)?)
    }
}

/// Read-only memory maps of the row tables and the payload region
pub struct MappedRegions {
    ipv4: Option<RegionView>,
    ipv6: Option<RegionView>,
    payload: Option<RegionView>,
}

impl MappedRegions {
    /// Map the regions described by `metadata`
    ///
    /// `file_len` bounds the payload region, which runs from the end of the
    /// last row table to the end of the file.
    pub fn map(path: &Path, metadata: &DatabaseMetadata, file_len: u64) -> io::Result<Self> {
        let file = File::open(path)?;
        let payload_start = metadata.payload_start().min(file_len);
        Ok(MappedRegions {
            ipv4: RegionView::map(&file, metadata.row_region(Family::V4))?,
            ipv6: RegionView::map(&file, metadata.row_region(Family::V6))?,
            payload: RegionView::map(&file, payload_start..file_len)?,
        })
    }

    fn view(&self, region: Region) -> Option<&RegionView> {
        match region {
            Region::Ipv4Rows => self.ipv4.as_ref(),
            Region::Ipv6Rows => self.ipv6.as_ref(),
            Region::Payload => self.payload.as_ref(),
            Region::Metadata => None,
        }
    }

    /// Absolute offset range covered by a region's view
    pub fn span(&self, region: Region) -> Option<Range<u64>> {
        self.view(region)
            .map(|v| v.start..v.start + v.map.len() as u64)
    }
}

impl ByteSource for MappedRegions {
    fn read_range(&self, region: Region, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let view = self.view(region).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{:?} region is not mapped", region),
            )
        })?;
        let bytes = view.slice(offset, buf.len()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read of {} bytes at {} outside {:?} region",
                    buf.len(),
                    offset,
                    region
                ),
            )
        })?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}

impl fmt::Debug for MappedRegions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRegions")
            .field("ipv4", &self.span(Region::Ipv4Rows))
            .field("ipv6", &self.span(Region::Ipv6Rows))
            .field("payload", &self.span(Region::Payload))
            .finish()
    }
}
