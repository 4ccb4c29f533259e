//! Database schema definitions
//!
//! Row types for sqlx mapping from SQLite tables.
//! Schema is defined in migrations/20261019000000_init.sql

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};
use depobank_core::{
    from_minor_units, AuditEntry, AuditKind, CancellationRecord, Deposit, Loan, LoanPayment,
    LoanStatus, LoanType, TransferRecord,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row type for table `deposits`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct DepositRow {
    pub id: i64,
    pub owner_id: i64,
    pub bank_name: String,
    pub amount_cents: i64,
    pub interest_rate: String, // Decimal stored as TEXT
    pub is_blocked: bool,
    pub is_frozen: bool,
    pub freeze_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for table `transfers`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct TransferRow {
    pub id: i64,
    pub owner_id: i64,
    pub bank_name: String,
    pub from_deposit_id: i64,
    pub to_deposit_id: i64,
    pub amount_cents: i64,
    pub transferred_at: DateTime<Utc>,
}

/// Row type for table `audit_entries`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditRow {
    pub id: i64,
    pub user_id: i64,
    pub performed_by: i64,
    pub kind: String,
    pub amount_cents: Option<i64>,
    pub deposit_id: Option<i64>,
    pub loan_id: Option<i64>,
    pub transfer_id: Option<i64>,
    pub metadata: String, // possibly sealed
    pub created_at: DateTime<Utc>,
}

/// `audit_entries` joined with its cancellation, if any
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditHistoryRow {
    #[sqlx(flatten)]
    pub entry: AuditRow,
    pub cancelled_by: Option<i64>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Row type for table `cancellations`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CancellationRow {
    pub id: i64,
    pub operator_id: i64,
    pub affected_user_id: i64,
    pub affected_deposit_id: i64,
    pub transaction_id: i64,
    pub cancelled_at: DateTime<Utc>,
}

/// Row type for table `loans`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LoanRow {
    pub id: i64,
    pub user_id: i64,
    pub loan_type: String,
    pub amount_cents: i64,
    pub term_months: i64,
    pub interest_rate: String, // Decimal stored as TEXT
    pub total_payable_cents: i64,
    pub monthly_payment_cents: i64,
    pub status: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub approved_by: Option<i64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<i64>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row type for table `loan_payments`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LoanPaymentRow {
    pub id: i64,
    pub loan_id: i64,
    pub amount_cents: i64,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// === Conversion implementations ===

fn parse_decimal(value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|_| PersistenceError::InvalidDecimal(value.to_string()))
}

impl TryFrom<DepositRow> for Deposit {
    type Error = PersistenceError;

    fn try_from(row: DepositRow) -> PersistenceResult<Self> {
        Ok(Deposit {
            id: row.id,
            owner_id: row.owner_id,
            bank_name: row.bank_name,
            amount: from_minor_units(row.amount_cents),
            interest_rate: parse_decimal(&row.interest_rate)?,
            is_blocked: row.is_blocked,
            is_frozen: row.is_frozen,
            freeze_until: row.freeze_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<TransferRow> for TransferRecord {
    fn from(row: TransferRow) -> Self {
        TransferRecord {
            id: row.id,
            owner_id: row.owner_id,
            bank_name: row.bank_name,
            from_deposit_id: row.from_deposit_id,
            to_deposit_id: row.to_deposit_id,
            amount: from_minor_units(row.amount_cents),
            transferred_at: row.transferred_at,
        }
    }
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = PersistenceError;

    /// Metadata is carried over as stored; opening sealed metadata is the
    /// audit log's job.
    fn try_from(row: AuditRow) -> PersistenceResult<Self> {
        let kind = AuditKind::parse(&row.kind)
            .ok_or_else(|| PersistenceError::invalid_enum("audit kind", &row.kind))?;
        Ok(AuditEntry {
            id: row.id,
            user_id: row.user_id,
            performed_by: row.performed_by,
            kind,
            amount: row.amount_cents.map(from_minor_units),
            deposit_id: row.deposit_id,
            loan_id: row.loan_id,
            transfer_id: row.transfer_id,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

impl From<CancellationRow> for CancellationRecord {
    fn from(row: CancellationRow) -> Self {
        CancellationRecord {
            id: row.id,
            operator_id: row.operator_id,
            affected_user_id: row.affected_user_id,
            affected_deposit_id: row.affected_deposit_id,
            transaction_id: row.transaction_id,
            cancelled_at: row.cancelled_at,
        }
    }
}

impl TryFrom<LoanRow> for Loan {
    type Error = PersistenceError;

    fn try_from(row: LoanRow) -> PersistenceResult<Self> {
        let loan_type = LoanType::from_str(&row.loan_type)
            .ok_or_else(|| PersistenceError::invalid_enum("loan_type", &row.loan_type))?;
        let status = LoanStatus::from_str(&row.status)
            .ok_or_else(|| PersistenceError::invalid_enum("status", &row.status))?;
        let term_months = u32::try_from(row.term_months).map_err(|_| {
            PersistenceError::invalid_enum("term_months", &row.term_months.to_string())
        })?;

        Ok(Loan {
            id: row.id,
            user_id: row.user_id,
            loan_type,
            amount: from_minor_units(row.amount_cents),
            term_months,
            interest_rate: parse_decimal(&row.interest_rate)?,
            total_payable: from_minor_units(row.total_payable_cents),
            monthly_payment: from_minor_units(row.monthly_payment_cents),
            status,
            start_date: row.start_date,
            end_date: row.end_date,
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<LoanPaymentRow> for LoanPayment {
    fn from(row: LoanPaymentRow) -> Self {
        LoanPayment {
            id: row.id,
            loan_id: row.loan_id,
            amount: from_minor_units(row.amount_cents),
            paid_at: row.paid_at,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_deposit_row_conversion() {
        let now = Utc::now();
        let row = DepositRow {
            id: 1,
            owner_id: 7,
            bank_name: "Acme".to_string(),
            amount_cents: 50_000,
            interest_rate: "3.5".to_string(),
            is_blocked: false,
            is_frozen: true,
            freeze_until: Some(now),
            created_at: now,
            updated_at: now,
        };
        let deposit = Deposit::try_from(row).unwrap();
        assert_eq!(deposit.amount, dec!(500.00));
        assert_eq!(deposit.interest_rate, dec!(3.5));
        assert!(deposit.is_frozen);
    }

    #[test]
    fn test_bad_rate_is_rejected() {
        let now = Utc::now();
        let row = DepositRow {
            id: 1,
            owner_id: 7,
            bank_name: "Acme".to_string(),
            amount_cents: 1,
            interest_rate: "three".to_string(),
            is_blocked: false,
            is_frozen: false,
            freeze_until: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            Deposit::try_from(row),
            Err(PersistenceError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn test_audit_row_unknown_kind() {
        let row = AuditRow {
            id: 1,
            user_id: 1,
            performed_by: 1,
            kind: "withdraw".to_string(),
            amount_cents: None,
            deposit_id: None,
            loan_id: None,
            transfer_id: None,
            metadata: String::new(),
            created_at: Utc::now(),
        };
        assert!(AuditEntry::try_from(row).is_err());
    }
}
