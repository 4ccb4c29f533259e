//! Deposit operations: lifecycle, holds, transfers

use anyhow::Result;
use chrono::Utc;
use depobank_business::{DepositService, ServiceContext, TransferRequest, TransferService};
use depobank_core::{Actor, Deposit, DepositId, NewDeposit, UserId};
use rust_decimal::Decimal;
use serde_json::json;

use super::print_json;
use crate::DepositAction;

pub async fn handle(ctx: &ServiceContext, actor: &Actor, action: DepositAction) -> Result<()> {
    let deposits = DepositService::new(ctx);

    match action {
        DepositAction::Create {
            bank,
            amount,
            rate,
            owner,
        } => {
            let owner = owner.unwrap_or(actor.user_id);
            let deposit = deposits
                .create_deposit(actor, NewDeposit::new(owner, &bank, amount, rate))
                .await?;
            print_json(&deposit)?;
        }
        DepositAction::Delete { bank, owner } => {
            let owner = owner.unwrap_or(actor.user_id);
            let removed = deposits.delete_deposit(actor, owner, &bank).await?;
            print_json(&json!({ "owner_id": owner, "bank_name": bank, "removed": removed }))?;
        }
        DepositAction::Block { deposit_id } => {
            print_json(&deposits.block(actor, deposit_id).await?)?;
        }
        DepositAction::Unblock { deposit_id } => {
            print_json(&deposits.unblock(actor, deposit_id).await?)?;
        }
        DepositAction::Freeze { deposit_id, hours } => {
            print_json(&deposits.freeze(actor, deposit_id, hours).await?)?;
        }
        DepositAction::Show { deposit_id } => {
            let deposit = deposits.get_by_id(deposit_id).await?;
            let transfers = deposits.transfers_for(deposit_id).await?;
            print_json(&json!({ "deposit": deposit, "transfers": transfers }))?;
        }
        DepositAction::List { owner } => {
            let owner = owner.unwrap_or(actor.user_id);
            let list = deposits.list_by_owner(owner).await?;
            print_list(owner, &list);
        }
    }

    Ok(())
}

pub async fn transfer(
    ctx: &ServiceContext,
    actor: &Actor,
    from: DepositId,
    to: DepositId,
    amount: Decimal,
) -> Result<()> {
    let receipt = TransferService::new(ctx)
        .transfer(actor, TransferRequest::new(from, to, amount))
        .await?;
    print_json(&receipt)
}

fn print_list(owner: UserId, deposits: &[Deposit]) {
    if deposits.is_empty() {
        println!("No deposits for user #{}", owner);
        return;
    }

    let now = Utc::now();
    println!(
        "{:<6} {:<16} {:>14} {:>7}  {}",
        "ID", "BANK", "AMOUNT", "RATE", "HOLD"
    );
    for deposit in deposits {
        println!(
            "{:<6} {:<16} {:>14} {:>6}%  {}",
            deposit.id,
            deposit.bank_name,
            deposit.amount,
            deposit.interest_rate,
            deposit
                .hold_at(now)
                .map_or_else(|| "-".to_string(), |hold| hold.to_string())
        );
    }
}
