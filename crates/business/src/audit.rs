//! Audit log sink
//!
//! Writes audit entries inside the caller's transaction, seals their
//! metadata with an injected [`MetadataCipher`], and mirrors committed
//! entries into the optional JSONL journal.

use crate::error::LedgerResult;
use chrono::Utc;
use depobank_core::{to_minor_units, AuditEntry, NewAuditEntry};
use depobank_persistence::{AuditJournal, AuditRepo, JournalLine};
use sqlx::SqliteConnection;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("cipher failure: {0}")]
    Failure(String),
}

/// Seals audit metadata at rest. Key management is the implementor's business.
pub trait MetadataCipher: Send + Sync {
    fn seal(&self, plaintext: &str) -> Result<String, CipherError>;

    fn open(&self, sealed: &str) -> Result<String, CipherError>;
}

/// Stores metadata as written
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextCipher;

impl MetadataCipher for PlaintextCipher {
    fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(plaintext.to_string())
    }

    fn open(&self, sealed: &str) -> Result<String, CipherError> {
        Ok(sealed.to_string())
    }
}

/// Audit sink shared by every service.
#[derive(Clone)]
pub struct AuditLog {
    cipher: Arc<dyn MetadataCipher>,
    journal: Option<Arc<AuditJournal>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Arc::new(PlaintextCipher))
    }
}

impl AuditLog {
    pub fn new(cipher: Arc<dyn MetadataCipher>) -> Self {
        Self {
            cipher,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Arc<AuditJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn journal(&self) -> Option<&AuditJournal> {
        self.journal.as_deref()
    }

    pub(crate) fn journal_handle(&self) -> Option<Arc<AuditJournal>> {
        self.journal.clone()
    }

    /// Seal metadata, keeping the plaintext if the cipher fails
    pub fn seal(&self, plaintext: &str) -> String {
        match self.cipher.seal(plaintext) {
            Ok(sealed) => sealed,
            Err(err) => {
                tracing::warn!(error = %err, "metadata cipher failed, storing plaintext");
                plaintext.to_string()
            }
        }
    }

    /// Open stored metadata. Entries written in plaintext (after a cipher
    /// failure, or before a cipher was configured) come back unchanged.
    pub fn open(&self, stored: &str) -> String {
        self.cipher.open(stored).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "metadata not sealed, returning as stored");
            stored.to_string()
        })
    }

    /// Write an entry inside the caller's transaction. The returned entry
    /// carries the plaintext metadata.
    pub async fn record(
        &self,
        conn: &mut SqliteConnection,
        entry: NewAuditEntry,
    ) -> LedgerResult<AuditEntry> {
        let now = Utc::now();
        let amount_cents = entry.amount.map(to_minor_units).transpose()?;
        let metadata = self.seal(&entry.metadata);

        let id = AuditRepo::insert(
            conn,
            entry.user_id,
            entry.performed_by,
            &entry.kind.to_string(),
            amount_cents,
            entry.deposit_id,
            entry.loan_id,
            entry.transfer_id,
            &metadata,
            now,
        )
        .await?;

        Ok(entry.into_entry(id, now))
    }

    /// Mirror committed entries into the journal. Failures are logged only.
    pub fn publish(&self, entries: &[&AuditEntry]) {
        let Some(journal) = &self.journal else {
            return;
        };

        for entry in entries {
            let payload = match serde_json::to_string(entry) {
                Ok(json) => self.seal(&json),
                Err(err) => {
                    tracing::warn!(entry_id = entry.id, error = %err, "cannot serialize audit entry");
                    continue;
                }
            };
            let line = JournalLine {
                entry_id: entry.id,
                recorded_at: entry.created_at,
                payload,
            };
            if let Err(err) = journal.append(&line) {
                tracing::warn!(entry_id = entry.id, error = %err, "audit journal write failed");
            }
        }
    }
}
