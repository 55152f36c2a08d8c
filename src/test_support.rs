//! Small on-disk databases for unit tests

use crate::format::HEADER_LEN;
use std::io::Write;
use tempfile::NamedTempFile;

/// DB1 file: two IPv4 rows, no IPv6, no index
///
/// `0.0.0.0/5` maps to `-`, everything from `8.0.0.0` up to `US`.
pub(crate) fn tiny_db1() -> NamedTempFile {
    let mut bytes = vec![0u8; HEADER_LEN];
    bytes[0] = 1;
    bytes[1] = 2;
    bytes[2] = 24;
    bytes[3] = 1;
    bytes[4] = 15;
    bytes[5..9].copy_from_slice(&2u32.to_le_bytes());
    bytes[9..13].copy_from_slice(&65u32.to_le_bytes());
    bytes[29] = 1;

    // Rows at 64..80, strings after; short names take 3 bytes
    for (start, ptr) in [(0u32, 80u32), (0x0800_0000, 85)] {
        bytes.extend_from_slice(&start.to_le_bytes());
        bytes.extend_from_slice(&ptr.to_le_bytes());
    }
    bytes.extend_from_slice(&[1, b'-', 0, 1, b'-']);
    for s in ["US", "United States"] {
        bytes.push(s.len() as u8);
        bytes.extend_from_slice(s.as_bytes());
    }

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();
    file
}
