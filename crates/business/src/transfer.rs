//! Transfer engine
//!
//! Moves money between two deposits of one owner in one bank namespace.
//! Debit, credit, the transfer record and the audit entry commit together
//! or not at all.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::load_deposit;
use crate::services::ServiceContext;
use chrono::Utc;
use depobank_core::{
    from_minor_units, positive_minor_units, ActionKind, Actor, AuditId, DepositId, NewAuditEntry,
    TransferRecord,
};
use depobank_persistence::{DepositRepo, TransferRepo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_deposit_id: DepositId,
    pub to_deposit_id: DepositId,
    pub amount: Decimal,
}

impl TransferRequest {
    pub fn new(from_deposit_id: DepositId, to_deposit_id: DepositId, amount: Decimal) -> Self {
        Self {
            from_deposit_id,
            to_deposit_id,
            amount,
        }
    }
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer: TransferRecord,
    pub audit_entry_id: AuditId,
    pub from_balance: Decimal,
    pub to_balance: Decimal,
}

pub struct TransferService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> TransferService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Transfer `amount` on behalf of `actor`, who must own the source deposit.
    ///
    /// Checks run in a fixed order: existence, ownership, same deposit,
    /// amount, namespace, holds, funds. The debit itself is a conditional
    /// update, so a concurrent transfer that drains the deposit first makes
    /// this one fail instead of overdrawing.
    pub async fn transfer(
        &self,
        actor: &Actor,
        request: TransferRequest,
    ) -> LedgerResult<TransferReceipt> {
        let TransferRequest {
            from_deposit_id,
            to_deposit_id,
            amount,
        } = request;
        let now = Utc::now();

        let mut tx = self.ctx.begin().await?;

        // Load both sides, clearing expired freezes
        let from = load_deposit(&mut *tx, from_deposit_id, now).await?;
        let to = load_deposit(&mut *tx, to_deposit_id, now).await?;

        // Validate
        if from.owner_id != actor.user_id {
            return Err(LedgerError::Forbidden(format!(
                "deposit #{} does not belong to user #{}",
                from_deposit_id, actor.user_id
            )));
        }
        if from_deposit_id == to_deposit_id {
            return Err(LedgerError::SameAccount);
        }
        let amount_cents = positive_minor_units(amount)?;
        if to.owner_id != from.owner_id || to.bank_name != from.bank_name {
            return Err(LedgerError::Forbidden(format!(
                "deposit #{} is outside the {} namespace of user #{}",
                to_deposit_id, from.bank_name, from.owner_id
            )));
        }

        // Check holds and balance
        if from.is_on_hold(now) {
            return Err(LedgerError::AccountOnHold(from_deposit_id));
        }
        if to.is_on_hold(now) {
            return Err(LedgerError::AccountOnHold(to_deposit_id));
        }
        if from.amount < amount {
            return Err(LedgerError::insufficient_funds(amount, from.amount));
        }

        // Move the money
        if DepositRepo::debit(&mut *tx, from_deposit_id, amount_cents, now).await? == 0 {
            // Lost a race inside the store; report what the row says now
            let current = load_deposit(&mut *tx, from_deposit_id, now).await?;
            return Err(if current.is_on_hold(now) {
                LedgerError::AccountOnHold(from_deposit_id)
            } else {
                LedgerError::insufficient_funds(amount, current.amount)
            });
        }
        if DepositRepo::credit(&mut *tx, to_deposit_id, amount_cents, now).await? == 0 {
            return Err(LedgerError::AccountOnHold(to_deposit_id));
        }

        // Record transfer
        let transfer_id = TransferRepo::insert(
            &mut *tx,
            from.owner_id,
            &from.bank_name,
            from_deposit_id,
            to_deposit_id,
            amount_cents,
            now,
        )
        .await?;
        let transfer = TransferRecord::from(TransferRepo::get_by_id(&mut *tx, transfer_id).await?);

        // Append audit entry
        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::Transfer, from.owner_id, actor.user_id)
                    .with_amount(amount)
                    .with_deposit(from_deposit_id)
                    .with_transfer(transfer_id)
                    .with_metadata(format!(
                        "Transferred {} from deposit #{} to deposit #{} at {}",
                        amount, from_deposit_id, to_deposit_id, from.bank_name
                    )),
            )
            .await?;

        let from_balance = DepositRepo::get_by_id(&mut *tx, from_deposit_id).await?.amount_cents;
        let to_balance = DepositRepo::get_by_id(&mut *tx, to_deposit_id).await?.amount_cents;

        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(
            transfer_id,
            from = from_deposit_id,
            to = to_deposit_id,
            amount = %amount,
            "transfer committed"
        );
        Ok(TransferReceipt {
            transfer,
            audit_entry_id: entry.id,
            from_balance: from_minor_units(from_balance),
            to_balance: from_minor_units(to_balance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::DepositService;
    use depobank_core::{Deposit, NewDeposit, UserId};
    use depobank_persistence::Database;
    use rust_decimal_macros::dec;

    async fn setup() -> ServiceContext {
        let db = Database::in_memory().await.unwrap();
        ServiceContext::new(&db)
    }

    async fn open(ctx: &ServiceContext, owner: UserId, bank: &str, amount: Decimal) -> Deposit {
        DepositService::new(ctx)
            .create_deposit(&Actor::client(owner), NewDeposit::new(owner, bank, amount, dec!(2)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_moves_money() {
        let ctx = setup().await;
        let a = open(&ctx, 1, "Acme", dec!(500)).await;
        let b = open(&ctx, 1, "Acme", dec!(0.01)).await;

        let receipt = TransferService::new(&ctx)
            .transfer(&Actor::client(1), TransferRequest::new(a.id, b.id, dec!(100)))
            .await
            .unwrap();

        assert_eq!(receipt.from_balance, dec!(400));
        assert_eq!(receipt.to_balance, dec!(100.01));
        assert_eq!(receipt.transfer.amount, dec!(100));

        let history = DepositService::new(&ctx).transfers_for(b.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_rejections() {
        let ctx = setup().await;
        let service = TransferService::new(&ctx);
        let owner = Actor::client(1);
        let a = open(&ctx, 1, "Acme", dec!(50)).await;
        let b = open(&ctx, 1, "Acme", dec!(10)).await;
        let other_bank = open(&ctx, 1, "Other", dec!(10)).await;

        let err = service
            .transfer(&owner, TransferRequest::new(a.id, 999, dec!(1)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = service
            .transfer(&Actor::client(2), TransferRequest::new(a.id, b.id, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let err = service
            .transfer(&owner, TransferRequest::new(a.id, a.id, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SameAccount));

        let err = service
            .transfer(&owner, TransferRequest::new(a.id, b.id, dec!(-5)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = service
            .transfer(&owner, TransferRequest::new(a.id, b.id, dec!(0.001)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = service
            .transfer(&owner, TransferRequest::new(a.id, other_bank.id, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let err = service
            .transfer(&owner, TransferRequest::new(a.id, b.id, dec!(50.01)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { required, available }
                if required == dec!(50.01) && available == dec!(50)
        ));
    }

    #[tokio::test]
    async fn test_transfer_refused_on_hold() {
        let ctx = setup().await;
        let owner = Actor::client(1);
        let a = open(&ctx, 1, "Acme", dec!(50)).await;
        let b = open(&ctx, 1, "Acme", dec!(10)).await;

        DepositService::new(&ctx).freeze(&owner, b.id, 24).await.unwrap();
        let err = TransferService::new(&ctx)
            .transfer(&owner, TransferRequest::new(a.id, b.id, dec!(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountOnHold(id) if id == b.id));

        // Nothing moved
        let a_now = DepositService::new(&ctx).get_by_id(a.id).await.unwrap();
        assert_eq!(a_now.amount, dec!(50));
    }
}
