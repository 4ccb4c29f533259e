//! Command handlers

pub mod audit;
pub mod deposit;
pub mod loan;

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use depobank_core::{Actor, Role};
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Refuse the command unless the actor holds one of `roles`
pub(crate) fn require_role(actor: &Actor, roles: &[Role], action: &str) -> Result<()> {
    if roles.contains(&actor.role) {
        return Ok(());
    }
    let allowed: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
    bail!("{} requires role {}, running as {}", action, allowed.join(" or "), actor);
}

/// Midnight UTC at the start of a `YYYY-MM-DD` day
pub(crate) fn parse_day(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    match date.and_hms_opt(0, 0, 0) {
        Some(midnight) => Ok(midnight.and_utc()),
        None => bail!("Invalid date: {}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_require_role() {
        let staff = [Role::Operator, Role::Manager, Role::Admin];
        assert!(require_role(&Actor::operator(2), &staff, "cancel").is_ok());

        let err = require_role(&Actor::client(1), &staff, "cancel").unwrap_err();
        assert!(err.to_string().contains("operator or manager or admin"));
    }

    #[test]
    fn test_parse_day() {
        let day = parse_day("2026-10-19").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2026, 10, 19));
        assert!(parse_day("19/10/2026").is_err());
    }
}
