//! Cancellation, history and journal commands

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use depobank_business::{AuditService, CancellationService, HistoryEntry, HistoryFilter, ServiceContext};
use depobank_core::{Actor, AuditId, AuditKind, Role, UserId};
use depobank_persistence::AuditJournal;
use serde_json::json;

use super::{parse_day, print_json, require_role};
use crate::Cli;

const STAFF: [Role; 3] = [Role::Operator, Role::Manager, Role::Admin];

pub async fn cancel(ctx: &ServiceContext, actor: &Actor, transaction_id: AuditId) -> Result<()> {
    require_role(actor, &STAFF, "cancel")?;
    let outcome = CancellationService::new(ctx)
        .cancel(transaction_id, actor.user_id)
        .await?;
    print_json(&outcome)
}

pub async fn cancel_all(ctx: &ServiceContext, actor: &Actor, user_id: UserId) -> Result<()> {
    require_role(actor, &[Role::Admin], "cancel-all")?;
    let cancelled = CancellationService::new(ctx)
        .cancel_all_for_user(user_id, actor.user_id)
        .await?;
    print_json(&json!({ "user_id": user_id, "cancelled": cancelled }))
}

/// Clients see their own history; staff may look at anyone's or everyone's.
pub async fn history(
    ctx: &ServiceContext,
    actor: &Actor,
    user: Option<UserId>,
    kind: Option<String>,
    since: Option<String>,
    until: Option<String>,
    limit: u32,
) -> Result<()> {
    let user = match user {
        Some(user) if user != actor.user_id && !actor.role.is_staff() => {
            bail!("{} cannot read the history of user #{}", actor, user);
        }
        Some(user) => Some(user),
        None if actor.role.is_staff() => None,
        None => Some(actor.user_id),
    };

    let mut filter = HistoryFilter::default().with_limit(limit);
    filter.user_id = user;
    if let Some(kind) = kind {
        let parsed = AuditKind::parse(&kind).with_context(|| format!("Unknown kind: {}", kind))?;
        filter = filter.with_kind(parsed);
    }
    if let Some(since) = since {
        filter.since = Some(parse_day(&since)?);
    }
    if let Some(until) = until {
        filter.until = Some(parse_day(&until)? + Duration::days(1));
    }

    let entries = AuditService::new(ctx).history(&filter).await?;
    print_history(&entries);
    Ok(())
}

pub async fn stats(ctx: &ServiceContext, actor: &Actor) -> Result<()> {
    require_role(actor, &STAFF, "stats")?;
    let stats = AuditService::new(ctx).statistics(Utc::now()).await?;
    print_json(&stats)
}

/// Print one day of the journal, or list the journal files
pub fn journal(cli: &Cli, day: Option<&str>) -> Result<()> {
    let Some(dir) = &cli.journal_dir else {
        bail!("No journal configured, pass --journal-dir");
    };
    let journal = AuditJournal::new(dir)?;

    match day {
        Some(day) => {
            parse_day(day)?;
            for line in journal.read_day(day)? {
                println!("{}", serde_json::to_string(&line)?);
            }
        }
        None => {
            for file in journal.list_files()? {
                println!("{}", file.display());
            }
        }
    }
    Ok(())
}

fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No audit entries");
        return;
    }

    println!(
        "{:<6} {:<20} {:<16} {:>6} {:>6} {:>12}  {}",
        "ID", "WHEN", "KIND", "USER", "BY", "AMOUNT", "STATUS"
    );
    for item in entries {
        let entry = &item.entry;
        let status = match (item.cancelled_by, item.can_cancel) {
            (Some(by), _) => format!("cancelled by #{}", by),
            (None, true) => "open".to_string(),
            (None, false) => "final".to_string(),
        };
        println!(
            "{:<6} {:<20} {:<16} {:>6} {:>6} {:>12}  {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.kind.to_string(),
            entry.user_id,
            entry.performed_by,
            entry.amount.map_or_else(|| "-".to_string(), |a| a.to_string()),
            status
        );
        if !entry.metadata.is_empty() {
            println!("       {}", entry.metadata);
        }
    }
}
