//! Business layer errors
//!
//! The closed set of failures callers can match on. Conflicts, lookups and
//! validation failures are separate variants; storage failures are wrapped.

use depobank_core::{AuditId, CoreError, DepositId};
use depobank_persistence::PersistenceError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger operation errors
#[derive(Debug, Error)]
pub enum LedgerError {
    // === Validation errors ===
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer between a deposit and itself")]
    SameAccount,

    // === Lookup / permission errors ===
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // === Conflict errors ===
    #[error("Deposit {0} is already blocked")]
    AlreadyBlocked(DepositId),

    #[error("Deposit {0} is not blocked")]
    NotBlocked(DepositId),

    #[error("Deposit {0} is already frozen")]
    AlreadyFrozen(DepositId),

    #[error("Deposit {0} is blocked or frozen")]
    AccountOnHold(DepositId),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Transaction {0} has already been cancelled")]
    AlreadyCancelled(AuditId),

    #[error("Transaction {id} cannot be cancelled: {reason}")]
    NonCancellable { id: AuditId, reason: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // === Wrapped errors ===
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Persistence(err.into())
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidAmount(msg) => LedgerError::InvalidAmount(msg),
            CoreError::InvalidTransition { from, to } => {
                LedgerError::InvalidState(format!("cannot move from {} to {}", from, to))
            }
            other => LedgerError::Validation(other.to_string()),
        }
    }
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidAmount(_) | Self::SameAccount
        )
    }

    /// The request was well-formed but the current state does not allow it
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyBlocked(_)
                | Self::NotBlocked(_)
                | Self::AlreadyFrozen(_)
                | Self::AccountOnHold(_)
                | Self::InsufficientFunds { .. }
                | Self::AlreadyCancelled(_)
                | Self::NonCancellable { .. }
                | Self::InvalidState(_)
        )
    }
}
