//! # Loan Module
//!
//! Loan types, the status machine, and the repayment arithmetic.
//!
//! ```text
//! pending ──approve──▶ approved ──activate──▶ active ──paid in full──▶ completed
//!    │
//!    └────reject────▶ rejected
//! ```
//!
//! `default` is reserved: nothing moves a loan into it yet.

use crate::actor::UserId;
use crate::error::{CoreError, CoreResult};
use crate::money::{positive_minor_units, round_money};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type LoanId = i64;

/// Fixed annual rates (percent) by term in months
pub const RATE_TABLE: [(u32, Decimal); 4] = [
    (3, dec!(5)),
    (6, dec!(7.5)),
    (12, dec!(10)),
    (24, dec!(15)),
];

/// Rate for terms longer than the longest table entry
pub const LONG_TERM_RATE: Decimal = dec!(20);

/// Rate for any other term
pub const DEFAULT_RATE: Decimal = dec!(12.5);

/// Annual rate in percent for a term without a custom rate
pub fn fixed_rate_for_term(term_months: u32) -> Decimal {
    if let Some((_, rate)) = RATE_TABLE.iter().find(|(term, _)| *term == term_months) {
        return *rate;
    }
    if term_months > 24 {
        LONG_TERM_RATE
    } else {
        DEFAULT_RATE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Standard,
    Installment,
}

impl LoanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanType::Standard => "standard",
            LoanType::Installment => "installment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(LoanType::Standard),
            "installment" => Some(LoanType::Installment),
            _ => None,
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Active,
    Completed,
    Rejected,
    /// Reserved, no transition leads here
    Default,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Default => "default",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(LoanStatus::Pending),
            "approved" => Some(LoanStatus::Approved),
            "active" => Some(LoanStatus::Active),
            "completed" => Some(LoanStatus::Completed),
            "rejected" => Some(LoanStatus::Rejected),
            "default" => Some(LoanStatus::Default),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Pending, LoanStatus::Approved)
                | (LoanStatus::Pending, LoanStatus::Rejected)
                | (LoanStatus::Approved, LoanStatus::Active)
                | (LoanStatus::Active, LoanStatus::Completed)
        )
    }

    /// Check a transition, for callers that want the error
    pub fn transition_to(&self, next: LoanStatus) -> CoreResult<LoanStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Completed | LoanStatus::Rejected | LoanStatus::Default
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Priced terms of a loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub interest_rate: Decimal,
    pub total_payable: Decimal,
    pub monthly_payment: Decimal,
}

impl LoanQuote {
    /// Monthly compounding at `rate / 12`:
    /// `total = amount * (1 + rate/100/12) ^ term`, `monthly = total / term`,
    /// both rounded to cents.
    pub fn calculate(amount: Decimal, term_months: u32, annual_rate: Decimal) -> CoreResult<Self> {
        if term_months == 0 {
            return Err(CoreError::validation("loan term must be at least one month"));
        }

        let monthly_rate = annual_rate / Decimal::ONE_HUNDRED / Decimal::from(12);
        let factor = (Decimal::ONE + monthly_rate)
            .checked_powi(i64::from(term_months))
            .ok_or_else(|| CoreError::validation("loan terms overflow"))?;
        let total = amount
            .checked_mul(factor)
            .ok_or_else(|| CoreError::validation("loan terms overflow"))?;
        let total_payable = round_money(total);
        let monthly_payment = round_money(total_payable / Decimal::from(term_months));

        Ok(Self {
            interest_rate: annual_rate,
            total_payable,
            monthly_payment,
        })
    }
}

/// A loan application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub user_id: UserId,
    pub loan_type: LoanType,
    pub amount: Decimal,
    pub term_months: u32,
    /// Overrides the fixed rate table when set
    pub interest_rate: Option<Decimal>,
}

impl LoanRequest {
    pub fn new(user_id: UserId, loan_type: LoanType, amount: Decimal, term_months: u32) -> Self {
        Self {
            user_id,
            loan_type,
            amount,
            term_months,
            interest_rate: None,
        }
    }

    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.interest_rate = Some(rate);
        self
    }

    /// Validate the application and price it
    pub fn quote(&self) -> CoreResult<LoanQuote> {
        positive_minor_units(self.amount)?;
        if self.term_months == 0 {
            return Err(CoreError::validation("loan term must be at least one month"));
        }

        let rate = match self.interest_rate {
            Some(rate) if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED => {
                return Err(CoreError::validation(format!(
                    "interest rate {} must be between 0 and 100",
                    rate
                )));
            }
            Some(rate) => rate,
            None => fixed_rate_for_term(self.term_months),
        };

        LoanQuote::calculate(self.amount, self.term_months, rate)
    }
}

/// A stored loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    pub loan_type: LoanType,
    pub amount: Decimal,
    pub term_months: u32,
    pub interest_rate: Decimal,
    pub total_payable: Decimal,
    pub monthly_payment: Decimal,
    pub status: LoanStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// What is still owed after `paid`, never below zero
    pub fn remaining_after(&self, paid: Decimal) -> Decimal {
        (self.total_payable - paid).max(Decimal::ZERO)
    }

    pub fn is_paid_off(&self, paid: Decimal) -> bool {
        paid >= self.total_payable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanPayment {
    pub id: i64,
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_rate_table() {
        assert_eq!(fixed_rate_for_term(3), dec!(5));
        assert_eq!(fixed_rate_for_term(6), dec!(7.5));
        assert_eq!(fixed_rate_for_term(12), dec!(10));
        assert_eq!(fixed_rate_for_term(24), dec!(15));
        assert_eq!(fixed_rate_for_term(36), dec!(20));
        assert_eq!(fixed_rate_for_term(25), dec!(20));
        assert_eq!(fixed_rate_for_term(1), dec!(12.5));
        assert_eq!(fixed_rate_for_term(18), dec!(12.5));
    }

    #[test]
    fn test_quote_monthly_compounding() {
        let quote = LoanQuote::calculate(dec!(1000), 12, dec!(10)).unwrap();
        assert_eq!(quote.total_payable, dec!(1104.71));
        assert_eq!(quote.monthly_payment, dec!(92.06));
        assert_eq!(quote.interest_rate, dec!(10));
    }

    #[test]
    fn test_quote_zero_rate() {
        let quote = LoanQuote::calculate(dec!(1200), 12, dec!(0)).unwrap();
        assert_eq!(quote.total_payable, dec!(1200));
        assert_eq!(quote.monthly_payment, dec!(100));
    }

    #[test]
    fn test_request_uses_rate_table() {
        let quote = LoanRequest::new(1, LoanType::Standard, dec!(1000), 12)
            .quote()
            .unwrap();
        assert_eq!(quote.interest_rate, dec!(10));

        let custom = LoanRequest::new(1, LoanType::Installment, dec!(1000), 12)
            .with_rate(dec!(0))
            .quote()
            .unwrap();
        assert_eq!(custom.total_payable, dec!(1000));
    }

    #[test]
    fn test_request_validation() {
        assert!(LoanRequest::new(1, LoanType::Standard, dec!(0), 12).quote().is_err());
        assert!(LoanRequest::new(1, LoanType::Standard, dec!(100), 0).quote().is_err());
        assert!(LoanRequest::new(1, LoanType::Standard, dec!(100), 12)
            .with_rate(dec!(-1))
            .quote()
            .is_err());
    }

    #[test]
    fn test_status_transitions() {
        use LoanStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Active));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Active.can_transition_to(Default));
        assert!(Pending.transition_to(Completed).is_err());

        assert!(Rejected.is_terminal());
        assert!(!Active.is_terminal());
    }

    #[test]
    fn test_status_names() {
        for status in [
            LoanStatus::Pending,
            LoanStatus::Approved,
            LoanStatus::Active,
            LoanStatus::Completed,
            LoanStatus::Rejected,
            LoanStatus::Default,
        ] {
            assert_eq!(LoanStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(LoanType::from_str("INSTALLMENT"), Some(LoanType::Installment));
    }
}
