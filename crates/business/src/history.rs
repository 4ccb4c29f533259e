//! Audit history and statistics
//!
//! Read side of the audit trail. Metadata is opened through the configured
//! cipher; rows that cannot be opened are shown as stored.

use crate::error::LedgerResult;
use crate::services::ServiceContext;
use chrono::{DateTime, Duration, Utc};
use depobank_core::{from_minor_units, round_money, AuditEntry, AuditKind, UserId};
use depobank_persistence::{AuditFilter, AuditHistoryRow, AuditRepo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Window for counting active users
pub const ACTIVE_USER_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub user_id: Option<UserId>,
    pub kind: Option<AuditKind>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl HistoryFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: impl Into<AuditKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    fn to_store_filter(&self) -> AuditFilter {
        AuditFilter {
            user_id: self.user_id,
            kind: self.kind.map(|k| k.to_string()),
            since: self.since,
            until: self.until,
            limit: self.limit.map(i64::from),
        }
    }
}

/// An audit entry with its cancellation status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: AuditEntry,
    pub cancelled_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Not cancelled yet, and of a kind that can be
    pub can_cancel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCount {
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub total_entries: i64,
    pub transfer_count: i64,
    pub transfer_volume: Decimal,
    pub average_transfer: Decimal,
    /// Distinct users with an entry in the last 30 days
    pub active_users: i64,
    pub by_kind: Vec<KindCount>,
}

pub struct AuditService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuditService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Entries matching `filter`, newest first
    pub async fn history(&self, filter: &HistoryFilter) -> LedgerResult<Vec<HistoryEntry>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let rows = AuditRepo::history(&mut conn, &filter.to_store_filter()).await?;
        rows.into_iter().map(|row| self.to_history(row)).collect()
    }

    fn to_history(&self, row: AuditHistoryRow) -> LedgerResult<HistoryEntry> {
        let mut entry = AuditEntry::try_from(row.entry)?;
        entry.metadata = self.ctx.audit().open(&entry.metadata);
        let can_cancel = row.cancelled_by.is_none() && entry.kind.is_cancellable();

        Ok(HistoryEntry {
            entry,
            cancelled_by: row.cancelled_by,
            cancelled_at: row.cancelled_at,
            can_cancel,
        })
    }

    pub async fn statistics(&self, now: DateTime<Utc>) -> LedgerResult<AuditStatistics> {
        let mut conn = self.ctx.pool().acquire().await?;
        let since = now - Duration::days(ACTIVE_USER_WINDOW_DAYS);
        let totals = AuditRepo::totals(&mut conn, since).await?;
        let by_kind = AuditRepo::counts_by_kind(&mut conn)
            .await?
            .into_iter()
            .map(|(kind, count)| KindCount { kind, count })
            .collect();

        let transfer_volume = from_minor_units(totals.transfer_volume_cents);
        let average_transfer = if totals.transfer_count > 0 {
            round_money(transfer_volume / Decimal::from(totals.transfer_count))
        } else {
            Decimal::ZERO
        };

        Ok(AuditStatistics {
            total_entries: totals.total_entries,
            transfer_count: totals.transfer_count,
            transfer_volume,
            average_transfer,
            active_users: totals.active_users,
            by_kind,
        })
    }
}
