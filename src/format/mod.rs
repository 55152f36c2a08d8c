//! On-disk BIN format: header, index tables and the range search

pub mod header;
pub mod index;
pub mod search;

pub use header::{DatabaseMetadata, RawHeader, HEADER_LEN};
pub use index::{IndexEntry, IndexTable, INDEX_BUCKETS};
pub use search::RowTable;
