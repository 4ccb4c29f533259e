//! Cancellation engine
//!
//! Reverses a single audited action on a deposit. Each audit entry can be
//! cancelled at most once: the cancellation record is inserted before the
//! inverse mutation, and the store refuses a second record for the same
//! entry. Record, inverse and the `cancel_<kind>` entry share one transaction.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::load_deposit;
use crate::services::ServiceContext;
use chrono::Utc;
use depobank_core::{
    from_minor_units, ActionKind, AuditEntry, AuditId, AuditKind, CancellationRecord, DepositId,
    NewAuditEntry, Reversal, UserId,
};
use depobank_persistence::{AuditRepo, AuditRow, CancellationRepo, DepositRepo, PersistenceError};
use serde::Serialize;
use tracing::{info, warn};

/// Result of a committed cancellation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationOutcome {
    pub record: CancellationRecord,
    /// The `cancel_<kind>` entry written for it
    pub entry: AuditEntry,
    pub reversal: Reversal,
}

pub struct CancellationService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CancellationService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Cancel audit entry `transaction_id` on behalf of `operator_id`.
    ///
    /// Hold entries (block, unblock, freeze) can only be cancelled while they
    /// are the newest open entry of their kind on the deposit.
    pub async fn cancel(
        &self,
        transaction_id: AuditId,
        operator_id: UserId,
    ) -> LedgerResult<CancellationOutcome> {
        self.cancel_entry(transaction_id, operator_id, false).await
    }

    /// With `bulk` set, refuse deposits on which `operator_id` already
    /// cancelled something. The check runs under the write lock.
    async fn cancel_entry(
        &self,
        transaction_id: AuditId,
        operator_id: UserId,
        bulk: bool,
    ) -> LedgerResult<CancellationOutcome> {
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        // Get the entry and check its kind
        let row = AuditRepo::find_by_id(&mut *tx, transaction_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Transaction", transaction_id))?;

        let action = match AuditKind::parse(&row.kind) {
            Some(AuditKind::Action(kind)) => kind,
            Some(AuditKind::Cancellation(_)) => {
                return Err(LedgerError::NonCancellable {
                    id: transaction_id,
                    reason: "cancellations cannot be cancelled".to_string(),
                });
            }
            None => {
                return Err(LedgerError::NonCancellable {
                    id: transaction_id,
                    reason: format!("unknown kind {}", row.kind),
                });
            }
        };
        let reversal = action.reversal();
        if let Reversal::NotReversible(reason) = reversal {
            return Err(LedgerError::NonCancellable {
                id: transaction_id,
                reason: format!("{}: {}", action, reason),
            });
        }

        if CancellationRepo::find_by_transaction(&mut *tx, transaction_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::AlreadyCancelled(transaction_id));
        }

        // Resolve the deposit it touched
        let deposit_id = row.deposit_id.ok_or_else(|| LedgerError::NonCancellable {
            id: transaction_id,
            reason: "entry does not reference a deposit".to_string(),
        })?;
        let deposit = load_deposit(&mut *tx, deposit_id, now).await?;

        if bulk
            && CancellationRepo::exists_for_scope(&mut *tx, operator_id, row.user_id, deposit_id)
                .await?
        {
            return Err(LedgerError::InvalidState(format!(
                "operator #{} already cancelled an action on deposit #{}",
                operator_id, deposit_id
            )));
        }

        // A later hold of the same kind owns the flag now
        if matches!(reversal, Reversal::Unfreeze | Reversal::Unblock | Reversal::Reblock) {
            let latest =
                AuditRepo::latest_uncancelled_for_deposit(&mut *tx, deposit_id, &[action.as_str()])
                    .await?;
            if let Some(latest) = latest.filter(|latest| latest.id != transaction_id) {
                return Err(LedgerError::InvalidState(format!(
                    "{} #{} on deposit #{} supersedes transaction #{}",
                    action, latest.id, deposit_id, transaction_id
                )));
            }
        }

        let record_id = match CancellationRepo::insert(
            &mut *tx,
            operator_id,
            row.user_id,
            deposit_id,
            transaction_id,
            now,
        )
        .await
        {
            Ok(id) => id,
            Err(PersistenceError::UniqueViolation(_)) => {
                return Err(LedgerError::AlreadyCancelled(transaction_id));
            }
            Err(err) => return Err(err.into()),
        };

        // Apply the inverse
        let changed = match reversal {
            Reversal::Unfreeze => DepositRepo::clear_freeze(&mut *tx, deposit_id, now).await?,
            Reversal::Unblock => DepositRepo::set_blocked(&mut *tx, deposit_id, true, now).await?,
            Reversal::Reblock => DepositRepo::set_blocked(&mut *tx, deposit_id, false, now).await?,
            Reversal::LogOnly | Reversal::NotReversible(_) => 1,
        };
        if changed == 0 {
            return Err(LedgerError::InvalidState(format!(
                "deposit #{} no longer matches {} (blocked: {}, frozen: {})",
                deposit_id, action, deposit.is_blocked, deposit.is_frozen
            )));
        }

        let entry = self
            .ctx
            .audit()
            .record(&mut *tx, Self::reversal_entry(action, &row, deposit_id, operator_id))
            .await?;
        let record = CancellationRecord::from(
            CancellationRepo::find_by_transaction(&mut *tx, transaction_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("Cancellation", record_id))?,
        );

        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(transaction_id, operator_id, deposit_id, kind = %action, "action cancelled");
        Ok(CancellationOutcome {
            record,
            entry,
            reversal,
        })
    }

    fn reversal_entry(
        action: ActionKind,
        row: &AuditRow,
        deposit_id: DepositId,
        operator_id: UserId,
    ) -> NewAuditEntry {
        let mut entry = NewAuditEntry::new(AuditKind::Cancellation(action), row.user_id, operator_id)
            .with_deposit(deposit_id)
            .with_metadata(format!(
                "Cancelled by operator #{}, original transaction #{}",
                operator_id, row.id
            ));
        if let Some(cents) = row.amount_cents {
            entry = entry.with_amount(from_minor_units(cents));
        }
        entry
    }

    /// Cancel the latest open action on each of a user's deposits.
    ///
    /// Deposits on which this admin already cancelled something are skipped,
    /// as are deposits whose latest action conflicts with the current state.
    /// Targets are picked outside any transaction; each cancellation checks
    /// the admin's scope again, so a concurrent run by the same admin cannot
    /// cancel twice on one deposit. Returns how many actions were cancelled.
    pub async fn cancel_all_for_user(&self, user_id: UserId, admin_id: UserId) -> LedgerResult<usize> {
        let cancellable: Vec<&str> = ActionKind::cancellable().iter().map(|k| k.as_str()).collect();

        let mut targets = Vec::new();
        {
            let mut conn = self.ctx.pool().acquire().await?;
            let deposits = DepositRepo::list_by_owner(&mut conn, user_id).await?;
            if deposits.is_empty() {
                return Err(LedgerError::not_found("Deposit", format!("user #{}", user_id)));
            }

            for deposit in deposits {
                if CancellationRepo::exists_for_scope(&mut conn, admin_id, user_id, deposit.id).await? {
                    continue;
                }
                if let Some(entry) =
                    AuditRepo::latest_uncancelled_for_deposit(&mut conn, deposit.id, &cancellable)
                        .await?
                {
                    targets.push(entry.id);
                }
            }
        }

        let mut cancelled = 0;
        for transaction_id in targets {
            match self.cancel_entry(transaction_id, admin_id, true).await {
                Ok(_) => cancelled += 1,
                Err(err) if err.is_conflict() || err.is_not_found() => {
                    warn!(transaction_id, user_id, error = %err, "skipping action in bulk cancel");
                }
                Err(err) => return Err(err),
            }
        }

        info!(user_id, admin_id, cancelled, "bulk cancellation finished");
        Ok(cancelled)
    }

    /// The newest action filed under `user_id` that could still be cancelled
    pub async fn last_cancellable_action(&self, user_id: UserId) -> LedgerResult<Option<AuditEntry>> {
        let cancellable: Vec<&str> = ActionKind::cancellable().iter().map(|k| k.as_str()).collect();
        let mut conn = self.ctx.pool().acquire().await?;

        let row = AuditRepo::latest_uncancelled_for_user(&mut conn, user_id, &cancellable).await?;
        match row {
            Some(row) => {
                let mut entry = AuditEntry::try_from(row)?;
                entry.metadata = self.ctx.audit().open(&entry.metadata);
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }
}
