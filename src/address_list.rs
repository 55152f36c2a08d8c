//! Address list input
//!
//! Batch lookups read one address per line from files or stdin. Gzip input
//! is recognised by its magic bytes, so `addresses.txt.gz` and a compressed
//! stream piped to stdin both work. Blank lines and `#` comments are
//! skipped; only the first whitespace-separated token of a line is used, so
//! log-style lines such as `1.2.3.4 - - [..]` need no preprocessing.
//!
//! ```rust,no_run
//! use geobin::address_list;
//!
//! let reader = address_list::open("addresses.txt.gz")?;
//! for address in address_list::addresses(reader) {
//!     println!("{}", address?);
//! }
//! # Ok::<(), std::io::Error>(())
//! ```

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, stdin, BufRead, BufReader, Read};
use std::path::Path;

const BUFFER_SIZE: usize = 128 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a file, or stdin for `-`, decompressing gzip transparently
pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    if path.to_str() == Some("-") {
        return from_reader(stdin());
    }
    from_reader(File::open(path)?)
}

/// Wrap any reader, sniffing the first bytes for gzip
pub fn from_reader<R: Read + Send + 'static>(reader: R) -> io::Result<Box<dyn BufRead + Send>> {
    let mut buffered = BufReader::with_capacity(BUFFER_SIZE, reader);
    let compressed = buffered.fill_buf()?.starts_with(&GZIP_MAGIC);
    if compressed {
        Ok(Box::new(BufReader::with_capacity(
            BUFFER_SIZE,
            MultiGzDecoder::new(buffered),
        )))
    } else {
        Ok(Box::new(buffered))
    }
}

/// The address on a line, if it holds one
pub fn parse_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    line.split_whitespace().next()
}

/// Iterate the addresses of a reader
pub fn addresses<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) => parse_line(&line).map(|addr| Ok(addr.to_string())),
        Err(e) => Some(Err(e)),
    })
}
