//! Resolve addresses with a reloadable locator
//!
//! ```text
//! cargo run --example locate -- IP2LOCATION-LITE-DB5.BIN 8.8.8.8 2a00:1450::1
//! ```

use geobin::{Coordinates, FallbackProvider, Locator, LocatorConfig};
use std::env;
use std::process;

/// Places every unresolved address on Null Island
struct NullIsland;

impl FallbackProvider for NullIsland {
    fn locate(&self, _address: &str) -> Option<Coordinates> {
        Some(Coordinates {
            latitude: 0.0,
            longitude: 0.0,
            country_code: None,
        })
    }
}

fn main() {
    let mut args = env::args().skip(1);
    let Some(database) = args.next() else {
        eprintln!("usage: locate <DATABASE> <ADDRESS>...");
        process::exit(2);
    };

    let locator = Locator::from_config(LocatorConfig::new(database)).with_fallback(NullIsland);
    if !locator.is_loaded() {
        eprintln!("database not loaded, answering from the fallback only");
    }

    for address in args {
        let result = locator.query(&address);
        match locator.locate(&address) {
            Some(location) => println!(
                "{:<40} {:<16} {:>10.6} {:>11.6} ({:?})",
                address,
                result.status.as_str(),
                location.coordinates.latitude,
                location.coordinates.longitude,
                location.source
            ),
            None => println!("{:<40} {}", address, result.status.as_str()),
        }
    }

    if let Some(db) = locator.database() {
        let stats = db.stats();
        println!(
            "\n{} queries, {:.0}% resolved, {:.0}% cache hits",
            stats.total_queries,
            stats.match_rate() * 100.0,
            stats.cache_hit_rate() * 100.0
        );
    }
}
