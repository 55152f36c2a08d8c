pub mod batch_cmd;
pub mod inspect_cmd;
pub mod query_cmd;

pub use batch_cmd::cmd_batch;
pub use inspect_cmd::cmd_inspect;
pub use query_cmd::cmd_query;

use anyhow::{Context, Result};
use geobin::{Database, LocatorConfig};
use std::path::PathBuf;

/// Database path plus the settings it is opened with
///
/// Values from `--config` are the defaults; command-line flags win.
pub struct OpenOptions {
    settings: LocatorConfig,
}

impl OpenOptions {
    pub fn new(database: PathBuf, config: Option<PathBuf>, direct: bool) -> Result<Self> {
        let mut settings = match config {
            Some(path) => LocatorConfig::load(&path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?,
            None => LocatorConfig::new(&database),
        };
        settings.database_path = database;
        if direct {
            settings.use_memory_map = false;
        }
        Ok(OpenOptions { settings })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.settings.database_path
    }

    pub fn open(&self) -> Result<Database> {
        self.settings
            .opener()
            .open()
            .with_context(|| format!("Failed to load database: {}", self.path().display()))
    }
}
