//! # Deposit Module
//!
//! A deposit is a balance held by one owner in one bank namespace. It can be
//! put on hold in two ways: blocked (until explicitly unblocked) or frozen
//! (until an expiry time). Both holds stop money moving out or in.

use crate::actor::UserId;
use crate::error::{CoreError, CoreResult};
use crate::money::positive_minor_units;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type DepositId = i64;
pub type TransferId = i64;

/// Upper bound for a deposit interest rate, in percent
pub const MAX_DEPOSIT_RATE: Decimal = Decimal::ONE_HUNDRED;

/// Why a deposit cannot move money right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "hold")]
pub enum Hold {
    Blocked,
    /// `until == None` means frozen with no expiry recorded
    Frozen { until: Option<DateTime<Utc>> },
}

impl fmt::Display for Hold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hold::Blocked => write!(f, "blocked"),
            Hold::Frozen { until: Some(until) } => write!(f, "frozen until {}", until),
            Hold::Frozen { until: None } => write!(f, "frozen"),
        }
    }
}

/// A stored deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: DepositId,
    pub owner_id: UserId,
    pub bank_name: String,
    /// Balance, never negative
    pub amount: Decimal,
    /// Annual rate in percent
    pub interest_rate: Decimal,
    pub is_blocked: bool,
    pub is_frozen: bool,
    pub freeze_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deposit {
    /// Frozen, with an expiry that has already passed at `now`
    pub fn freeze_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_frozen && self.freeze_until.map_or(false, |until| now >= until)
    }

    /// Effective hold at `now`. An expired freeze is not a hold.
    pub fn hold_at(&self, now: DateTime<Utc>) -> Option<Hold> {
        if self.is_blocked {
            Some(Hold::Blocked)
        } else if self.is_frozen && !self.freeze_expired(now) {
            Some(Hold::Frozen {
                until: self.freeze_until,
            })
        } else {
            None
        }
    }

    pub fn is_on_hold(&self, now: DateTime<Utc>) -> bool {
        self.hold_at(now).is_some()
    }

    /// Drop an expired freeze from the in-memory view. Returns true when
    /// something changed, so the caller knows to persist it.
    pub fn clear_expired_freeze(&mut self, now: DateTime<Utc>) -> bool {
        if self.freeze_expired(now) {
            self.is_frozen = false;
            self.freeze_until = None;
            self.updated_at = now;
            true
        } else {
            false
        }
    }
}

/// Input for opening a deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeposit {
    pub owner_id: UserId,
    pub bank_name: String,
    pub amount: Decimal,
    pub interest_rate: Decimal,
}

impl NewDeposit {
    pub fn new(owner_id: UserId, bank_name: &str, amount: Decimal, interest_rate: Decimal) -> Self {
        Self {
            owner_id,
            bank_name: bank_name.trim().to_string(),
            amount,
            interest_rate,
        }
    }

    /// Check the request and return the opening balance in minor units
    pub fn validate(&self) -> CoreResult<i64> {
        if self.bank_name.is_empty() {
            return Err(CoreError::validation("bank name must not be empty"));
        }
        if self.interest_rate < Decimal::ZERO || self.interest_rate > MAX_DEPOSIT_RATE {
            return Err(CoreError::validation(format!(
                "interest rate {} must be between 0 and {}",
                self.interest_rate, MAX_DEPOSIT_RATE
            )));
        }
        positive_minor_units(self.amount)
    }
}

/// A completed transfer. Never modified after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub id: TransferId,
    pub owner_id: UserId,
    pub bank_name: String,
    pub from_deposit_id: DepositId,
    pub to_deposit_id: DepositId,
    pub amount: Decimal,
    pub transferred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn deposit() -> Deposit {
        let now = Utc::now();
        Deposit {
            id: 1,
            owner_id: 10,
            bank_name: "Acme".to_string(),
            amount: dec!(500),
            interest_rate: dec!(3.5),
            is_blocked: false,
            is_frozen: false,
            freeze_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_no_hold() {
        let d = deposit();
        assert_eq!(d.hold_at(Utc::now()), None);
        assert!(!d.is_on_hold(Utc::now()));
    }

    #[test]
    fn test_blocked_hold() {
        let mut d = deposit();
        d.is_blocked = true;
        assert_eq!(d.hold_at(Utc::now()), Some(Hold::Blocked));
    }

    #[test]
    fn test_freeze_expiry() {
        let now = Utc::now();
        let mut d = deposit();
        d.is_frozen = true;
        d.freeze_until = Some(now + Duration::hours(24));

        assert!(d.is_on_hold(now));
        assert!(!d.freeze_expired(now));

        let later = now + Duration::hours(25);
        assert!(d.freeze_expired(later));
        assert!(!d.is_on_hold(later));

        assert!(d.clear_expired_freeze(later));
        assert!(!d.is_frozen);
        assert_eq!(d.freeze_until, None);
        assert!(!d.clear_expired_freeze(later));
    }

    #[test]
    fn test_freeze_without_expiry_holds() {
        let mut d = deposit();
        d.is_frozen = true;
        let far = Utc::now() + Duration::days(3650);
        assert_eq!(d.hold_at(far), Some(Hold::Frozen { until: None }));
    }

    #[test]
    fn test_new_deposit_validation() {
        assert_eq!(NewDeposit::new(1, "Acme", dec!(500), dec!(3)).validate().unwrap(), 50_000);
        assert!(NewDeposit::new(1, "Acme", dec!(0), dec!(3)).validate().is_err());
        assert!(NewDeposit::new(1, "Acme", dec!(10), dec!(-1)).validate().is_err());
        assert!(NewDeposit::new(1, "Acme", dec!(10), dec!(100.5)).validate().is_err());
        assert!(NewDeposit::new(1, "  ", dec!(10), dec!(1)).validate().is_err());
        assert!(NewDeposit::new(1, "Acme", dec!(10), dec!(100)).validate().is_ok());
    }
}
