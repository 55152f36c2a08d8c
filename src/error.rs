//! Error types for the geobin library
//!
//! Every failure the lookup engine can hit maps onto one [`GeoError`]
//! variant. Internals propagate these with `?`; the public query surface
//! turns them into a [`Status`](crate::result::Status) on the returned
//! result instead of handing them to the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for geobin operations
#[derive(Error, Debug)]
pub enum GeoError {
    /// The address string was empty after trimming
    #[error("empty address")]
    EmptyAddress,

    /// The address could not be parsed, or is a deliberately rejected form
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The database file is absent, unreadable, or was never loaded
    #[error("missing database {}: {source}", path.display())]
    MissingDatabase {
        /// Path that was being opened
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The header or table geometry failed validation
    #[error("corrupt database: {0}")]
    CorruptDatabase(String),

    /// An IPv6 query against a database that carries no IPv6 table
    #[error("IPv6 lookups are not supported by this database")]
    Ipv6Unsupported,

    /// I/O failure while reading rows or payload during a query
    #[error("read error: {0}")]
    Read(#[from] io::Error),

    /// No row covers the address (the file's range coverage is broken)
    #[error("no range covers the address")]
    NotFound,
}

impl GeoError {
    pub(crate) fn missing(path: impl Into<PathBuf>, source: io::Error) -> Self {
        GeoError::MissingDatabase {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        GeoError::CorruptDatabase(msg.into())
    }
}

/// Result type alias for geobin operations
pub type Result<T> = std::result::Result<T, GeoError>;
