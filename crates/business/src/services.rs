//! Service context
//!
//! Shared state handed to every service: the connection pool and the audit sink.

use crate::audit::{AuditLog, MetadataCipher};
use crate::error::LedgerResult;
use depobank_persistence::Database;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

/// Context for business operations - contains database access
#[derive(Clone)]
pub struct ServiceContext {
    pool: SqlitePool,
    audit: AuditLog,
}

impl ServiceContext {
    /// Context over `db`, with plaintext metadata and the database's journal
    pub fn new(db: &Database) -> Self {
        let audit = match db.journal() {
            Some(journal) => AuditLog::default().with_journal(journal),
            None => AuditLog::default(),
        };
        Self::from_parts(db.pool().clone(), audit)
    }

    /// Create from pool and audit sink directly
    pub fn from_parts(pool: SqlitePool, audit: AuditLog) -> Self {
        Self { pool, audit }
    }

    /// Swap in a metadata cipher, keeping the journal
    pub fn with_cipher(mut self, cipher: Arc<dyn MetadataCipher>) -> Self {
        let mut audit = AuditLog::new(cipher);
        if let Some(journal) = self.audit.journal_handle() {
            audit = audit.with_journal(journal);
        }
        self.audit = audit;
        self
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Open a write transaction.
    ///
    /// Takes the write lock up front: contenders wait on the busy timeout
    /// and then read the state the winner committed.
    pub(crate) async fn begin(&self) -> LedgerResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}
