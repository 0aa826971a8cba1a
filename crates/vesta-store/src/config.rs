//! Store configuration.
//!
//! Provides [`StoreConfig`] with defaults for the data directory and log
//! filter.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for all persistent data.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "debug", "vesta_engine=trace").
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vesta");

        Self {
            data_dir,
            log_level: "info".to_string(),
        }
    }
}

impl StoreConfig {
    /// Path to the RocksDB vesting state directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("vestingdata")
    }
}
