//! Audit journal
//!
//! Append-only JSONL mirror of the audit trail, one file per day. The
//! database stays the source of truth; the journal is an offline copy.

pub mod store;

pub use store::{AuditJournal, JournalLine};
