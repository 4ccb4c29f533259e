//! Ledger store
//!
//! Deposits and their holds. Every read goes through [`load_deposit`], which
//! clears a freeze whose expiry has passed before anyone sees the row.

use crate::error::{LedgerError, LedgerResult};
use crate::services::ServiceContext;
use chrono::{DateTime, Duration, Utc};
use depobank_core::{
    ActionKind, Actor, Deposit, DepositId, NewAuditEntry, NewDeposit, TransferRecord, UserId,
};
use depobank_persistence::{DepositRepo, TransferRepo};
use rust_decimal::Decimal;
use sqlx::SqliteConnection;
use tracing::{debug, info};

/// Longest freeze accepted, in hours (ten years)
pub const MAX_FREEZE_HOURS: u32 = 24 * 365 * 10;

/// Read a deposit, clearing an expired freeze inside the caller's transaction.
pub(crate) async fn load_deposit(
    conn: &mut SqliteConnection,
    id: DepositId,
    now: DateTime<Utc>,
) -> LedgerResult<Deposit> {
    let row = DepositRepo::find_by_id(conn, id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Deposit", id))?;
    normalize(conn, Deposit::try_from(row)?, now).await
}

async fn normalize(
    conn: &mut SqliteConnection,
    mut deposit: Deposit,
    now: DateTime<Utc>,
) -> LedgerResult<Deposit> {
    if deposit.clear_expired_freeze(now) {
        DepositRepo::clear_freeze(conn, deposit.id, now).await?;
        debug!(deposit_id = deposit.id, "expired freeze cleared");
    }
    Ok(deposit)
}

/// Clients act on their own deposits only; staff act on anyone's.
pub(crate) fn ensure_owner_or_staff(actor: &Actor, owner_id: UserId) -> LedgerResult<()> {
    if actor.role.is_staff() || actor.user_id == owner_id {
        Ok(())
    } else {
        Err(LedgerError::Forbidden(format!(
            "{} cannot act on deposits of user #{}",
            actor, owner_id
        )))
    }
}

/// Deposit lifecycle and holds
pub struct DepositService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> DepositService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Open a deposit with a positive balance and a rate in `0..=100`
    pub async fn create_deposit(&self, actor: &Actor, request: NewDeposit) -> LedgerResult<Deposit> {
        let amount_cents = request.validate()?;
        ensure_owner_or_staff(actor, request.owner_id)?;
        let now = Utc::now();

        let mut tx = self.ctx.begin().await?;
        let id = DepositRepo::insert(
            &mut *tx,
            request.owner_id,
            &request.bank_name,
            amount_cents,
            request.interest_rate,
            now,
        )
        .await?;
        let deposit = Deposit::try_from(DepositRepo::get_by_id(&mut *tx, id).await?)?;

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::Create, deposit.owner_id, actor.user_id)
                    .with_amount(deposit.amount)
                    .with_deposit(id)
                    .with_metadata(format!(
                        "Deposit #{} opened at {} with {} at {}%",
                        id, deposit.bank_name, deposit.amount, deposit.interest_rate
                    )),
            )
            .await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(deposit_id = id, owner_id = deposit.owner_id, amount = %deposit.amount, "deposit created");
        Ok(deposit)
    }

    /// Remove every deposit the owner holds in `bank_name`. Returns how many went.
    pub async fn delete_deposit(
        &self,
        actor: &Actor,
        owner_id: UserId,
        bank_name: &str,
    ) -> LedgerResult<u64> {
        ensure_owner_or_staff(actor, owner_id)?;
        let bank_name = bank_name.trim();

        let mut tx = self.ctx.begin().await?;
        let rows = DepositRepo::list_by_owner_and_bank(&mut *tx, owner_id, bank_name).await?;
        if rows.is_empty() {
            return Err(LedgerError::not_found(
                "Deposit",
                format!("user #{} at {}", owner_id, bank_name),
            ));
        }

        let balance_cents: i64 = rows.iter().map(|r| r.amount_cents).sum();
        let removed = DepositRepo::delete_by_owner_and_bank(&mut *tx, owner_id, bank_name).await?;

        let mut audit = NewAuditEntry::new(ActionKind::Delete, owner_id, actor.user_id)
            .with_amount(Decimal::new(balance_cents, 2))
            .with_metadata(format!(
                "Removed {} deposit(s) at {}: {}",
                removed,
                bank_name,
                rows.iter()
                    .map(|r| format!("#{}", r.id))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        if let [only] = rows.as_slice() {
            audit = audit.with_deposit(only.id);
        }
        let entry = self.ctx.audit().record(&mut *tx, audit).await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(owner_id, bank = bank_name, removed, "deposits deleted");
        Ok(removed)
    }

    pub async fn block(&self, actor: &Actor, deposit_id: DepositId) -> LedgerResult<Deposit> {
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        let mut deposit = load_deposit(&mut *tx, deposit_id, now).await?;
        ensure_owner_or_staff(actor, deposit.owner_id)?;
        if deposit.is_blocked {
            return Err(LedgerError::AlreadyBlocked(deposit_id));
        }
        if DepositRepo::set_blocked(&mut *tx, deposit_id, false, now).await? == 0 {
            return Err(LedgerError::AlreadyBlocked(deposit_id));
        }
        deposit.is_blocked = true;
        deposit.updated_at = now;

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::Block, deposit.owner_id, actor.user_id)
                    .with_deposit(deposit_id)
                    .with_metadata(format!("Deposit #{} blocked by {}", deposit_id, actor)),
            )
            .await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(deposit_id, "deposit blocked");
        Ok(deposit)
    }

    pub async fn unblock(&self, actor: &Actor, deposit_id: DepositId) -> LedgerResult<Deposit> {
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        let mut deposit = load_deposit(&mut *tx, deposit_id, now).await?;
        ensure_owner_or_staff(actor, deposit.owner_id)?;
        if !deposit.is_blocked {
            return Err(LedgerError::NotBlocked(deposit_id));
        }
        if DepositRepo::set_blocked(&mut *tx, deposit_id, true, now).await? == 0 {
            return Err(LedgerError::NotBlocked(deposit_id));
        }
        deposit.is_blocked = false;
        deposit.updated_at = now;

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::Unblock, deposit.owner_id, actor.user_id)
                    .with_deposit(deposit_id)
                    .with_metadata(format!("Deposit #{} unblocked by {}", deposit_id, actor)),
            )
            .await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(deposit_id, "deposit unblocked");
        Ok(deposit)
    }

    /// Freeze for `duration_hours`. Blocked or already frozen deposits are refused.
    pub async fn freeze(
        &self,
        actor: &Actor,
        deposit_id: DepositId,
        duration_hours: u32,
    ) -> LedgerResult<Deposit> {
        if duration_hours == 0 || duration_hours > MAX_FREEZE_HOURS {
            return Err(LedgerError::Validation(format!(
                "freeze duration must be between 1 and {} hours",
                MAX_FREEZE_HOURS
            )));
        }
        let now = Utc::now();
        let until = now + Duration::hours(i64::from(duration_hours));

        let mut tx = self.ctx.begin().await?;
        let mut deposit = load_deposit(&mut *tx, deposit_id, now).await?;
        ensure_owner_or_staff(actor, deposit.owner_id)?;
        if deposit.is_blocked {
            return Err(LedgerError::AlreadyBlocked(deposit_id));
        }
        if deposit.is_frozen {
            return Err(LedgerError::AlreadyFrozen(deposit_id));
        }
        if DepositRepo::set_frozen(&mut *tx, deposit_id, until, now).await? == 0 {
            return Err(LedgerError::AlreadyFrozen(deposit_id));
        }
        deposit.is_frozen = true;
        deposit.freeze_until = Some(until);
        deposit.updated_at = now;

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::Freeze, deposit.owner_id, actor.user_id)
                    .with_deposit(deposit_id)
                    .with_metadata(format!(
                        "Deposit #{} frozen for {}h until {}",
                        deposit_id,
                        duration_hours,
                        until.to_rfc3339()
                    )),
            )
            .await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(deposit_id, duration_hours, "deposit frozen");
        Ok(deposit)
    }

    pub async fn get_by_id(&self, deposit_id: DepositId) -> LedgerResult<Deposit> {
        let mut tx = self.ctx.begin().await?;
        let deposit = load_deposit(&mut *tx, deposit_id, Utc::now()).await?;
        tx.commit().await?;
        Ok(deposit)
    }

    pub async fn list_by_owner(&self, owner_id: UserId) -> LedgerResult<Vec<Deposit>> {
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        let rows = DepositRepo::list_by_owner(&mut *tx, owner_id).await?;
        let mut deposits = Vec::with_capacity(rows.len());
        for row in rows {
            deposits.push(normalize(&mut *tx, Deposit::try_from(row)?, now).await?);
        }
        tx.commit().await?;
        Ok(deposits)
    }

    /// Transfers in or out of a deposit, newest first
    pub async fn transfers_for(&self, deposit_id: DepositId) -> LedgerResult<Vec<TransferRecord>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let rows = TransferRepo::list_by_deposit(&mut conn, deposit_id).await?;
        Ok(rows.into_iter().map(TransferRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depobank_persistence::Database;
    use rust_decimal_macros::dec;

    async fn setup() -> ServiceContext {
        let db = Database::in_memory().await.unwrap();
        ServiceContext::new(&db)
    }

    async fn open(ctx: &ServiceContext, owner: UserId, amount: Decimal) -> Deposit {
        DepositService::new(ctx)
            .create_deposit(&Actor::client(owner), NewDeposit::new(owner, "Acme", amount, dec!(3)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_deposit() {
        let ctx = setup().await;
        let deposit = open(&ctx, 1, dec!(500)).await;

        assert_eq!(deposit.amount, dec!(500));
        assert_eq!(deposit.owner_id, 1);
        assert!(!deposit.is_blocked);

        let fetched = DepositService::new(&ctx).get_by_id(deposit.id).await.unwrap();
        assert_eq!(fetched, deposit);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let ctx = setup().await;
        let service = DepositService::new(&ctx);
        let actor = Actor::client(1);

        let err = service
            .create_deposit(&actor, NewDeposit::new(1, "Acme", dec!(0), dec!(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = service
            .create_deposit(&actor, NewDeposit::new(1, "Acme", dec!(10), dec!(101)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        let err = service
            .create_deposit(&actor, NewDeposit::new(2, "Acme", dec!(10), dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_block_unblock() {
        let ctx = setup().await;
        let service = DepositService::new(&ctx);
        let actor = Actor::client(1);
        let deposit = open(&ctx, 1, dec!(100)).await;

        assert!(service.block(&actor, deposit.id).await.unwrap().is_blocked);
        let err = service.block(&actor, deposit.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyBlocked(_)));

        assert!(!service.unblock(&actor, deposit.id).await.unwrap().is_blocked);
        let err = service.unblock(&actor, deposit.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotBlocked(_)));
    }

    #[tokio::test]
    async fn test_holds_are_exclusive() {
        let ctx = setup().await;
        let service = DepositService::new(&ctx);
        let actor = Actor::client(1);
        let deposit = open(&ctx, 1, dec!(100)).await;

        service.block(&actor, deposit.id).await.unwrap();
        let err = service.freeze(&actor, deposit.id, 24).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyBlocked(_)));

        service.unblock(&actor, deposit.id).await.unwrap();
        let frozen = service.freeze(&actor, deposit.id, 24).await.unwrap();
        assert!(frozen.is_frozen);
        assert!(frozen.freeze_until.is_some());

        let err = service.freeze(&actor, deposit.id, 24).await.unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyFrozen(_)));
    }

    #[tokio::test]
    async fn test_freeze_validates_duration() {
        let ctx = setup().await;
        let deposit = open(&ctx, 1, dec!(100)).await;
        let err = DepositService::new(&ctx)
            .freeze(&Actor::client(1), deposit.id, 0)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_expired_freeze_is_cleared_on_read() {
        let ctx = setup().await;
        let deposit = open(&ctx, 1, dec!(100)).await;
        {
            let mut conn = ctx.pool().acquire().await.unwrap();
            let past = Utc::now() - Duration::hours(2);
            DepositRepo::set_frozen(&mut conn, deposit.id, past, past).await.unwrap();
        }

        let service = DepositService::new(&ctx);
        let listed = service.list_by_owner(1).await.unwrap();
        assert!(!listed[0].is_frozen);
        assert_eq!(listed[0].freeze_until, None);

        // The clear was persisted, not just applied to the view
        let mut conn = ctx.pool().acquire().await.unwrap();
        let row = DepositRepo::get_by_id(&mut conn, deposit.id).await.unwrap();
        assert!(!row.is_frozen);
    }

    #[tokio::test]
    async fn test_delete_deposit() {
        let ctx = setup().await;
        let service = DepositService::new(&ctx);
        let actor = Actor::client(1);
        open(&ctx, 1, dec!(100)).await;
        open(&ctx, 1, dec!(50)).await;

        assert_eq!(service.delete_deposit(&actor, 1, "Acme").await.unwrap(), 2);
        assert!(service.list_by_owner(1).await.unwrap().is_empty());

        let err = service.delete_deposit(&actor, 1, "Acme").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_client_cannot_touch_other_deposit() {
        let ctx = setup().await;
        let deposit = open(&ctx, 1, dec!(100)).await;
        let service = DepositService::new(&ctx);

        let err = service.block(&Actor::client(2), deposit.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));
        assert!(service.block(&Actor::operator(9), deposit.id).await.is_ok());
    }
}
