//! Store configuration
//!
//! Connection settings for the SQLite ledger and the optional audit journal.

use std::path::{Path, PathBuf};
use std::time::Duration;

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Connection settings for [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite:data/depobank.db`
    pub database_url: String,
    pub max_connections: u32,
    /// How long a connection waits on a locked database
    pub busy_timeout: Duration,
    /// Directory for the JSONL audit journal. No journal when `None`.
    pub journal_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file("data/depobank.db")
    }
}

impl StoreConfig {
    /// Private in-memory database. One connection, kept open for the
    /// pool's lifetime, since every SQLite memory connection is its own database.
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
            journal_dir: None,
        }
    }

    /// File-backed database, created if missing
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            database_url: format!("sqlite:{}", path.as_ref().display()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            journal_dir: None,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_journal_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.journal_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_config() {
        let config = StoreConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert!(config.journal_dir.is_none());
    }

    #[test]
    fn test_file_config() {
        let config = StoreConfig::file("data/test.db")
            .with_max_connections(0)
            .with_journal_dir("data/journal");
        assert_eq!(config.database_url, "sqlite:data/test.db");
        assert!(!config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.journal_dir, Some(PathBuf::from("data/journal")));
    }
}
