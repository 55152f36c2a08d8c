//! Long-lived lookup service
//!
//! [`Locator`] is what a service keeps around: it never fails to construct,
//! answers `MISSING_DATABASE` while no database is loaded, swaps in a new
//! database on [`reload`](Locator::reload) without blocking readers, and can
//! fall back to a secondary provider when the database has no coordinates
//! for an address.
//!
//! ```no_run
//! use geobin::{Locator, LocatorConfig};
//!
//! let locator = Locator::from_config(LocatorConfig::new("/data/DB5.BIN"));
//! if let Some(location) = locator.locate("8.8.8.8") {
//!     println!("{} {}", location.coordinates.latitude, location.coordinates.longitude);
//! }
//! ```

use crate::config::LocatorConfig;
use crate::database::Database;
use crate::error::Result;
use crate::result::LookupResult;
use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A position and, when known, its country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f32,
    pub longitude: f32,
    /// ISO 3166 two-letter code
    pub country_code: Option<String>,
}

impl Coordinates {
    /// Coordinates of a successful result, if it carries both
    pub fn from_result(result: &LookupResult) -> Option<Self> {
        if !result.is_ok() {
            return None;
        }
        let (latitude, longitude) = result.coordinates()?;
        Some(Coordinates {
            latitude,
            longitude,
            country_code: result.country_short.value().cloned(),
        })
    }
}

/// Secondary location source consulted when the database has no answer
pub trait FallbackProvider: Send + Sync {
    fn locate(&self, address: &str) -> Option<Coordinates>;
}

/// Which source produced a [`Location`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Database,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub coordinates: Coordinates,
    pub source: LocationSource,
}

/// Reloadable database handle with an optional fallback
pub struct Locator {
    config: LocatorConfig,
    current: ArcSwapOption<Database>,
    generation: AtomicU64,
    fallback: Option<Box<dyn FallbackProvider>>,
}

impl Locator {
    /// Create a locator for `path` and try to load it
    pub fn open(path: impl Into<PathBuf>, use_memory_map: bool) -> Self {
        let mut config = LocatorConfig::new(path);
        config.use_memory_map = use_memory_map;
        Self::from_config(config)
    }

    /// Create a locator and try to load its database
    ///
    /// A load failure is logged; queries then answer `MISSING_DATABASE`
    /// until [`reload`](Self::reload) succeeds.
    pub fn from_config(config: LocatorConfig) -> Self {
        let locator = Locator {
            config,
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
            fallback: None,
        };
        // Already logged; the locator stays usable without a database
        let _ = locator.reload();
        locator
    }

    /// Consult `provider` when the database has no coordinates
    pub fn with_fallback(mut self, provider: impl FallbackProvider + 'static) -> Self {
        self.fallback = Some(Box::new(provider));
        self
    }

    /// Open the configured database again and swap it in
    ///
    /// On failure the previously loaded database, if any, stays in service.
    pub fn reload(&self) -> Result<()> {
        match self.config.opener().open() {
            Ok(db) => {
                let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(
                    path = %self.config.database_path.display(),
                    generation,
                    "database loaded"
                );
                self.current.store(Some(Arc::new(db)));
                Ok(())
            }
            Err(e) => {
                warn!(
                    path = %self.config.database_path.display(),
                    error = %e,
                    "failed to load database"
                );
                Err(e)
            }
        }
    }

    /// Whether a database is currently loaded
    pub fn is_loaded(&self) -> bool {
        self.current.load().is_some()
    }

    /// The loaded database, for several operations on the same version
    pub fn database(&self) -> Option<Arc<Database>> {
        self.current.load_full()
    }

    /// Number of successful loads so far
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Resolve an address against the loaded database
    pub fn query(&self, address: &str) -> LookupResult {
        match self.current.load().as_ref() {
            Some(db) => db.query(address),
            None => LookupResult::without_database(address),
        }
    }

    /// Coordinates for an address, from the database or the fallback
    pub fn locate(&self, address: &str) -> Option<Location> {
        let result = self.query(address);
        if let Some(coordinates) = Coordinates::from_result(&result) {
            return Some(Location {
                coordinates,
                source: LocationSource::Database,
            });
        }

        let fallback = self.fallback.as_ref()?;
        debug!(address, status = %result.status, "using fallback provider");
        fallback.locate(address.trim()).map(|coordinates| Location {
            coordinates,
            source: LocationSource::Fallback,
        })
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("config", &self.config)
            .field("loaded", &self.is_loaded())
            .field("generation", &self.generation())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Field, Status};

    struct Fixed;

    impl FallbackProvider for Fixed {
        fn locate(&self, _address: &str) -> Option<Coordinates> {
            Some(Coordinates {
                latitude: 1.5,
                longitude: 2.5,
                country_code: Some("ZZ".to_string()),
            })
        }
    }

    #[test]
    fn test_missing_database() {
        let locator = Locator::open("/nonexistent/geo.bin", true);
        assert!(!locator.is_loaded());
        assert_eq!(locator.generation(), 0);

        let result = locator.query(" 8.8.8.8 ");
        assert_eq!(result.status, Status::MissingDatabase);
        assert_eq!(result.address, "8.8.8.8");
        assert!(locator.reload().is_err());
        assert!(locator.locate("8.8.8.8").is_none());
    }

    #[test]
    fn test_blank_address_without_database() {
        let locator = Locator::open("/nonexistent/geo.bin", true);
        assert_eq!(locator.query("").status, Status::EmptyAddress);
        assert_eq!(locator.query(" \t").status, Status::EmptyAddress);
    }

    #[test]
    fn test_fallback_used_without_database() {
        let locator = Locator::open("/nonexistent/geo.bin", false).with_fallback(Fixed);
        let location = locator.locate("8.8.8.8").unwrap();
        assert_eq!(location.source, LocationSource::Fallback);
        assert_eq!(location.coordinates.country_code.as_deref(), Some("ZZ"));
    }

    #[test]
    fn test_coordinates_need_ok_status() {
        let mut result = LookupResult::with_status("1.2.3.4", Status::Ok);
        result.latitude = Field::Value(10.0);
        assert!(Coordinates::from_result(&result).is_none());

        result.longitude = Field::Value(20.0);
        result.country_short = Field::Value("DE".to_string());
        let coords = Coordinates::from_result(&result).unwrap();
        assert_eq!(coords.country_code.as_deref(), Some("DE"));

        result.status = Status::NotFound;
        assert!(Coordinates::from_result(&result).is_none());
    }
}
