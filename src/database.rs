//! Database handle and query engine
//!
//! A [`Database`] owns everything parsed at load time (header, column
//! layout, index tables) and answers queries against the file through one
//! of two access modes:
//!
//! - **Memory-mapped** (default): the row tables and the payload region are
//!   mapped read-only the first time a query needs them.
//! - **Direct**: every read opens the file, seeks and reads. Nothing stays
//!   open between reads.
//!
//! ```no_run
//! use geobin::Database;
//!
//! let db = Database::from("IP2LOCATION-LITE-DB5.BIN")
//!     .memory_map(true)
//!     .cache_capacity(50_000)
//!     .open()?;
//!
//! let result = db.query("8.8.8.8");
//! if result.is_ok() {
//!     println!("{:?} {:?}", result.country_short, result.coordinates());
//! }
//! # Ok::<(), geobin::GeoError>(())
//! ```
//!
//! [`Database::query`] never fails: problems are reported through the
//! result's [`Status`]. [`Database::lookup`] is the `Result` flavour for
//! callers that want to propagate errors with `?`.

use crate::address::{canonicalize, CanonicalAddress, Family};
use crate::error::{GeoError, Result};
use crate::format::{DatabaseMetadata, IndexTable, RowTable, HEADER_LEN};
use crate::record::{FieldDecoder, LookupRecord};
use crate::result::{LookupResult, Status};
use crate::schema::ColumnLayout;
use crate::source::{ByteSource, DirectFile, MappedRegions, Region};
use lru::LruCache;
use rustc_hash::FxHasher;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::hash::BuildHasherDefault;
use std::io;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Default per-thread query cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

// Keys per-thread caches so results never leak between databases or reloads
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Databases holding a query cache on one thread at the same time
const CACHES_PER_THREAD: NonZeroUsize = match NonZeroUsize::new(8) {
    Some(n) => n,
    None => panic!("zero cache slots"),
};

type FxBuild = BuildHasherDefault<FxHasher>;
type QueryCache = LruCache<String, LookupResult, FxBuild>;

thread_local! {
    static QUERY_CACHES: RefCell<LruCache<u64, QueryCache, FxBuild>> =
        RefCell::new(LruCache::with_hasher(CACHES_PER_THREAD, FxBuild::default()));
}

/// Query statistics, shared by all threads
#[derive(Debug, Default)]
pub struct DatabaseStats {
    pub total_queries: AtomicU64,
    /// Queries answered with [`Status::Ok`]
    pub queries_found: AtomicU64,
    pub queries_failed: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    /// Searches run in the IPv4 table
    pub ipv4_lookups: AtomicU64,
    /// Searches run in the IPv6 table
    pub ipv6_lookups: AtomicU64,
}

/// Point-in-time copy of [`DatabaseStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStatsSnapshot {
    pub total_queries: u64,
    pub queries_found: u64,
    pub queries_failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub ipv4_lookups: u64,
    pub ipv6_lookups: u64,
}

impl DatabaseStats {
    pub fn snapshot(&self) -> DatabaseStatsSnapshot {
        DatabaseStatsSnapshot {
            total_queries: self.total_queries.load(Ordering::Relaxed),
            queries_found: self.queries_found.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            ipv4_lookups: self.ipv4_lookups.load(Ordering::Relaxed),
            ipv6_lookups: self.ipv6_lookups.load(Ordering::Relaxed),
        }
    }
}

impl DatabaseStatsSnapshot {
    /// Cache hit rate (0.0 to 1.0)
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Share of queries that resolved (0.0 to 1.0)
    pub fn match_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.queries_found as f64 / self.total_queries as f64
        }
    }
}

/// Fluent builder returned by [`Database::from`]
#[derive(Debug, Clone)]
pub struct DatabaseOpener {
    path: PathBuf,
    use_memory_map: bool,
    cache_capacity: usize,
}

impl DatabaseOpener {
    fn new(path: impl Into<PathBuf>) -> Self {
        DatabaseOpener {
            path: path.into(),
            use_memory_map: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Choose memory-mapped (`true`, default) or direct file reads
    pub fn memory_map(mut self, enabled: bool) -> Self {
        self.use_memory_map = enabled;
        self
    }

    /// Per-thread LRU capacity; 0 disables the cache
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn no_cache(self) -> Self {
        self.cache_capacity(0)
    }

    pub fn open(self) -> Result<Database> {
        Database::open_with(self)
    }
}

/// An opened BIN database
pub struct Database {
    path: PathBuf,
    metadata: DatabaseMetadata,
    layout: ColumnLayout,
    ipv4_index: IndexTable,
    ipv6_index: IndexTable,
    file_len: u64,
    direct: DirectFile,
    use_memory_map: bool,
    mapped: OnceLock<MappedRegions>,
    instance_id: u64,
    cache_capacity: Option<NonZeroUsize>,
    stats: DatabaseStats,
}

impl Database {
    /// Start building a database handle for `path`
    pub fn from(path: impl Into<PathBuf>) -> DatabaseOpener {
        DatabaseOpener::new(path)
    }

    /// Open `path` with the default cache
    ///
    /// # Errors
    ///
    /// [`GeoError::MissingDatabase`] when the path is empty or unreadable,
    /// [`GeoError::CorruptDatabase`] when the header or table geometry is
    /// invalid.
    pub fn open(path: impl AsRef<Path>, use_memory_map: bool) -> Result<Self> {
        Self::from(path.as_ref()).memory_map(use_memory_map).open()
    }

    fn open_with(opener: DatabaseOpener) -> Result<Self> {
        let path = opener.path;
        if path.as_os_str().is_empty() {
            return Err(GeoError::missing(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no database path configured"),
            ));
        }

        let file_meta = fs::metadata(&path).map_err(|e| GeoError::missing(&path, e))?;
        if !file_meta.is_file() {
            return Err(GeoError::missing(
                &path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file_len = file_meta.len();

        let direct = DirectFile::new(&path);
        let mut head = [0u8; HEADER_LEN];
        let head_len = file_len.min(HEADER_LEN as u64) as usize;
        direct
            .read_range(Region::Metadata, 0, &mut head[..head_len])
            .map_err(|e| GeoError::missing(&path, e))?;

        let metadata = DatabaseMetadata::parse(&head[..head_len])?;
        metadata.validate_geometry(file_len)?;
        let layout = ColumnLayout::for_schema(metadata.schema_type).ok_or_else(|| {
            GeoError::corrupt(format!("schema type {}", metadata.schema_type))
        })?;

        let ipv4_index = load_index(&direct, &metadata, Family::V4)?;
        let ipv6_index = load_index(&direct, &metadata, Family::V6)?;

        debug!(
            path = %path.display(),
            schema_type = metadata.schema_type,
            release = %metadata.release_date(),
            ipv4_rows = metadata.ipv4_count,
            ipv6_rows = metadata.ipv6_count,
            ipv4_indexed = !ipv4_index.is_empty(),
            ipv6_indexed = !ipv6_index.is_empty(),
            memory_map = opener.use_memory_map,
            "opened database"
        );

        Ok(Database {
            path,
            metadata,
            layout,
            ipv4_index,
            ipv6_index,
            file_len,
            direct,
            use_memory_map: opener.use_memory_map,
            mapped: OnceLock::new(),
            instance_id: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            cache_capacity: NonZeroUsize::new(opener.cache_capacity),
            stats: DatabaseStats::default(),
        })
    }

    /// Resolve an address, reporting every failure through the status
    ///
    /// Surrounding whitespace is ignored. Never panics.
    pub fn query(&self, address: &str) -> LookupResult {
        let address = address.trim();
        self.stats.total_queries.fetch_add(1, Ordering::Relaxed);

        if let Some(hit) = self.with_cache(|cache| cache.get(address).cloned()).flatten() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            self.count_status(hit.status);
            return hit;
        }
        if self.cache_capacity.is_some() {
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        }

        let result = match canonicalize(address) {
            Ok(canonical) => self.resolve(address, &canonical),
            Err(e) => LookupResult::from_error(address, &e),
        };
        trace!(address, status = %result.status, "query");
        self.count_status(result.status);

        // I/O failures are per-query and may not repeat
        if result.status != Status::ReadError {
            self.with_cache(|cache| cache.put(address.to_string(), result.clone()));
        }
        result
    }

    /// Resolve an already-parsed address (uncached)
    pub fn query_ip(&self, addr: IpAddr) -> LookupResult {
        self.stats.total_queries.fetch_add(1, Ordering::Relaxed);
        let result = self.resolve(&addr.to_string(), &CanonicalAddress::from_ip(addr));
        self.count_status(result.status);
        result
    }

    /// Resolve an address, returning failures as errors (uncached)
    pub fn lookup(&self, address: &str) -> Result<LookupResult> {
        let address = address.trim();
        let canonical = canonicalize(address)?;
        self.lookup_canonical(address, &canonical)
    }

    /// The raw row covering a canonical address
    pub fn find_record(&self, canonical: &CanonicalAddress) -> Result<LookupRecord> {
        let family = canonical.effective;
        if family == Family::V6 && self.metadata.is_legacy() {
            return Err(GeoError::Ipv6Unsupported);
        }
        match family {
            Family::V4 => self.stats.ipv4_lookups.fetch_add(1, Ordering::Relaxed),
            Family::V6 => self.stats.ipv6_lookups.fetch_add(1, Ordering::Relaxed),
        };

        let source = self.source()?;
        let index = match family {
            Family::V4 => &self.ipv4_index,
            Family::V6 => &self.ipv6_index,
        };
        RowTable::new(
            source,
            family,
            self.metadata.row_region(family).start,
            self.metadata.row_count(family),
            self.metadata.row_width(family),
            index,
        )
        .find(canonical.value)
    }

    fn lookup_canonical(
        &self,
        address: &str,
        canonical: &CanonicalAddress,
    ) -> Result<LookupResult> {
        let record = self.find_record(canonical)?;
        let mut result = LookupResult::with_status(address, Status::Ok);
        describe(&mut result, canonical);
        FieldDecoder::new(self.source()?, &self.layout).decode_into(&record, &mut result)?;
        Ok(result)
    }

    fn resolve(&self, address: &str, canonical: &CanonicalAddress) -> LookupResult {
        self.lookup_canonical(address, canonical)
            .unwrap_or_else(|e| {
                let mut failed = LookupResult::from_error(address, &e);
                describe(&mut failed, canonical);
                failed
            })
    }

    fn count_status(&self, status: Status) {
        if status.is_ok() {
            self.stats.queries_found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.queries_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn source(&self) -> Result<&dyn ByteSource> {
        if self.use_memory_map {
            let regions: &dyn ByteSource = self.map_regions()?;
            Ok(regions)
        } else {
            Ok(&self.direct)
        }
    }

    /// Map the row tables and payload region, if not already mapped
    ///
    /// Idempotent: later calls return the mapping installed by the first
    /// successful one. Concurrent first callers may each build a mapping;
    /// exactly one is kept.
    pub fn map_regions(&self) -> Result<&MappedRegions> {
        if let Some(regions) = self.mapped.get() {
            return Ok(regions);
        }
        let regions = MappedRegions::map(&self.path, &self.metadata, self.file_len)?;
        debug!(path = %self.path.display(), regions = ?regions, "mapped database");
        Ok(self.mapped.get_or_init(|| regions))
    }

    /// Whether the regions are currently mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped.get().is_some()
    }

    /// Whether queries read through memory maps
    pub fn uses_memory_map(&self) -> bool {
        self.use_memory_map
    }

    /// Release the file mappings and cached results
    pub fn close(self) {
        debug!(path = %self.path.display(), "closed database");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// Index table for a family (empty when not indexed)
    pub fn index(&self, family: Family) -> &IndexTable {
        match family {
            Family::V4 => &self.ipv4_index,
            Family::V6 => &self.ipv6_index,
        }
    }

    pub fn stats(&self) -> DatabaseStatsSnapshot {
        self.stats.snapshot()
    }

    /// Drop this thread's cached results
    pub fn clear_cache(&self) {
        // Thread teardown may already have destroyed the caches
        let _ = QUERY_CACHES.try_with(|caches| caches.borrow_mut().pop(&self.instance_id));
    }

    /// Number of results cached by the current thread
    pub fn cache_size(&self) -> usize {
        QUERY_CACHES.with(|caches| {
            caches
                .borrow()
                .peek(&self.instance_id)
                .map_or(0, LruCache::len)
        })
    }

    fn with_cache<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut QueryCache) -> R,
    {
        let capacity = self.cache_capacity?;
        QUERY_CACHES.with(|caches| {
            let mut caches = caches.borrow_mut();
            let cache = caches.get_or_insert_mut(self.instance_id, || {
                LruCache::with_hasher(capacity, FxBuild::default())
            });
            Some(f(cache))
        })
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.clear_cache();
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("schema_type", &self.metadata.schema_type)
            .field("file_len", &self.file_len)
            .field("use_memory_map", &self.use_memory_map)
            .field("mapped", &self.mapped.get())
            .finish()
    }
}

fn load_index(
    direct: &DirectFile,
    metadata: &DatabaseMetadata,
    family: Family,
) -> Result<IndexTable> {
    match metadata.index_region(family) {
        Some(region) => IndexTable::load(direct, region.start),
        None => Ok(IndexTable::empty()),
    }
}

fn describe(result: &mut LookupResult, canonical: &CanonicalAddress) {
    result.normalized = Some(canonical.normalized.clone());
    result.family = Some(canonical.literal);
    result.effective_family = Some(canonical.effective);
}
