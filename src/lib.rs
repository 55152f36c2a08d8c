//! Geobin - Reader for fixed-schema IP geolocation BIN databases
//!
//! Resolves IPv4 and IPv6 addresses to country, region, city, coordinates
//! and the other columns a BIN database carries, by binary-searching the
//! sorted range tables of the file. Files come in 26 schema types; each
//! carries a different subset of columns, and every lookup reports which
//! columns the file lacks as well as which ones are merely empty.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use geobin::{Database, Field, Status};
//!
//! let db = Database::open("IP2LOCATION-LITE-DB11.BIN", true)?;
//!
//! let result = db.query("8.8.8.8");
//! match result.status {
//!     Status::Ok => {
//!         if let Field::Value(city) = &result.city {
//!             println!("city: {}", city);
//!         }
//!     }
//!     status => eprintln!("lookup failed: {}", status),
//! }
//! # Ok::<(), geobin::GeoError>(())
//! ```
//!
//! # Address handling
//!
//! IPv6 addresses that carry an IPv4 address (IPv4-mapped, 6to4, Teredo)
//! are unwrapped and searched in the IPv4 table, so they work against
//! IPv4-only files too. See [`address`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │  BIN file                            │
//! ├──────────────────────────────────────┤
//! │  64-byte header                      │
//! │  Index tables (65 536 buckets each)  │
//! │  IPv4 rows   [start:u32][cols...]    │
//! │  IPv6 rows   [start:u128][cols...]   │
//! │  Payload     [len:u8][bytes] ...     │
//! └──────────────────────────────────────┘
//!          ↓ mmap() or per-read open/seek
//! ┌──────────────────────────────────────┐
//! │  ByteSource → RowTable → FieldDecoder│
//! └──────────────────────────────────────┘
//! ```
//!
//! For a long-running service use [`Locator`], which survives a missing
//! database, reloads on request and can defer to a [`FallbackProvider`].

#![warn(clippy::all)]

/// Address canonicalization
pub mod address;
pub mod address_list;
/// Locator configuration
pub mod config;
/// Database handle and query engine
pub mod database;
/// Error types for geobin operations
pub mod error;
/// On-disk format: header, index and range search
pub mod format;
pub mod locator;
pub mod record;
pub mod result;
/// Per-schema column table
pub mod schema;
pub mod source;

// Public C API
pub mod c_api;

#[cfg(test)]
mod test_support;

// Re-exports for Rust consumers

pub use crate::address::{canonicalize, CanonicalAddress, Family};
pub use crate::config::{ConfigError, LocatorConfig};
pub use crate::database::{Database, DatabaseOpener, DatabaseStatsSnapshot};
pub use crate::error::GeoError;
pub use crate::format::DatabaseMetadata;
pub use crate::locator::{Coordinates, FallbackProvider, Location, LocationSource, Locator};
pub use crate::result::{Field, LookupResult, Status};
pub use crate::schema::{Column, ColumnLayout};

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
        assert!(VERSION.starts_with("0.3"));
    }
}
