//! # Depobank Persistence
//!
//! Persistence layer for Depobank - SQLite ledger + JSONL audit journal.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Database                             │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐  │
//! │  │   SQLite    │    │    JSONL     │    │     Repos       │  │
//! │  │  (ledger)   │    │  (journal)   │    │   (queries)     │  │
//! │  └─────────────┘    └──────────────┘    └─────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use depobank_persistence::{Database, DepositRepo, StoreConfig};
//!
//! let db = Database::connect(&StoreConfig::file("data/depobank.db")).await?;
//!
//! let mut conn = db.pool().acquire().await?;
//! let deposits = DepositRepo::list_by_owner(&mut conn, 42).await?;
//! ```

pub mod config;
pub mod error;
pub mod journal;
pub mod sqlite;

pub use config::StoreConfig;
pub use error::{PersistenceError, PersistenceResult};
pub use journal::{AuditJournal, JournalLine};
pub use sqlite::schema::{
    AuditHistoryRow, AuditRow, CancellationRow, DepositRow, LoanPaymentRow, LoanRow, TransferRow,
};
pub use sqlite::{
    create_pool, init_database, run_migrations, AuditFilter, AuditRepo, AuditTotals,
    CancellationRepo, DepositRepo, LoanPaymentRepo, LoanRepo, TransferRepo,
};

use sqlx::SqlitePool;
use std::sync::Arc;

/// Database facade - pool plus the optional audit journal
pub struct Database {
    pool: SqlitePool,
    journal: Option<Arc<AuditJournal>>,
}

impl Database {
    /// Connect, run migrations, and open the journal if one is configured
    pub async fn connect(config: &StoreConfig) -> PersistenceResult<Self> {
        let pool = init_database(config).await?;
        let journal = match &config.journal_dir {
            Some(dir) => Some(Arc::new(AuditJournal::new(dir)?)),
            None => None,
        };

        tracing::debug!(url = %config.database_url, journal = journal.is_some(), "database ready");
        Ok(Self { pool, journal })
    }

    /// Fresh private in-memory database with the schema applied
    pub async fn in_memory() -> PersistenceResult<Self> {
        Self::connect(&StoreConfig::in_memory()).await
    }

    /// Get SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn journal(&self) -> Option<Arc<AuditJournal>> {
        self.journal.clone()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
