//! # Audit Module
//!
//! Kinds of audited actions, the entries written for them, and the
//! cancellation records that reverse them.
//!
//! Every cancellable kind knows its own [`Reversal`]. A cancellation of kind
//! `k` is written as the kind `cancel_<k>`.

use crate::actor::UserId;
use crate::deposit::{DepositId, TransferId};
use crate::loan::LoanId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type AuditId = i64;

/// Prefix that marks a cancellation entry
pub const CANCEL_PREFIX: &str = "cancel_";

/// An audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Delete,
    Transfer,
    Block,
    Unblock,
    Freeze,
    LoanRequest,
    LoanApproved,
    LoanActivated,
    LoanRejected,
    LoanPayment,
}

/// What a cancellation does to undo an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reversal {
    /// Clear the freeze the action placed
    Unfreeze,
    /// Clear the block the action placed
    Unblock,
    /// Put back the block the action removed
    Reblock,
    /// Nothing to undo in state, only the cancellation is recorded
    LogOnly,
    NotReversible(&'static str),
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        ActionKind::Create,
        ActionKind::Delete,
        ActionKind::Transfer,
        ActionKind::Block,
        ActionKind::Unblock,
        ActionKind::Freeze,
        ActionKind::LoanRequest,
        ActionKind::LoanApproved,
        ActionKind::LoanActivated,
        ActionKind::LoanRejected,
        ActionKind::LoanPayment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Delete => "delete",
            ActionKind::Transfer => "transfer",
            ActionKind::Block => "block",
            ActionKind::Unblock => "unblock",
            ActionKind::Freeze => "freeze",
            ActionKind::LoanRequest => "loan_request",
            ActionKind::LoanApproved => "loan_approved",
            ActionKind::LoanActivated => "loan_activated",
            ActionKind::LoanRejected => "loan_rejected",
            ActionKind::LoanPayment => "loan_payment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }

    pub fn reversal(&self) -> Reversal {
        match self {
            ActionKind::Freeze => Reversal::Unfreeze,
            ActionKind::Block => Reversal::Unblock,
            ActionKind::Unblock => Reversal::Reblock,
            ActionKind::Create => Reversal::LogOnly,
            ActionKind::Delete => Reversal::NotReversible("deleted deposits are gone"),
            ActionKind::Transfer => {
                Reversal::NotReversible("transfers are reversed by a new transfer")
            }
            ActionKind::LoanRequest
            | ActionKind::LoanApproved
            | ActionKind::LoanActivated
            | ActionKind::LoanRejected
            | ActionKind::LoanPayment => {
                Reversal::NotReversible("loan lifecycle only moves forward")
            }
        }
    }

    pub fn is_cancellable(&self) -> bool {
        !matches!(self.reversal(), Reversal::NotReversible(_))
    }

    /// Kinds an operator may cancel
    pub fn cancellable() -> Vec<ActionKind> {
        Self::ALL.iter().copied().filter(|k| k.is_cancellable()).collect()
    }

    pub fn is_loan(&self) -> bool {
        self.as_str().starts_with("loan_")
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of an audit entry: an action, or the cancellation of one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditKind {
    Action(ActionKind),
    Cancellation(ActionKind),
}

impl AuditKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix(CANCEL_PREFIX) {
            Some(rest) => ActionKind::from_str(rest).map(AuditKind::Cancellation),
            None => ActionKind::from_str(s).map(AuditKind::Action),
        }
    }

    /// The action this kind is about
    pub fn action(&self) -> ActionKind {
        match self {
            AuditKind::Action(kind) | AuditKind::Cancellation(kind) => *kind,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, AuditKind::Cancellation(_))
    }

    /// Whether an entry of this kind may ever be cancelled
    pub fn is_cancellable(&self) -> bool {
        match self {
            AuditKind::Action(kind) => kind.is_cancellable(),
            AuditKind::Cancellation(_) => false,
        }
    }
}

impl From<ActionKind> for AuditKind {
    fn from(kind: ActionKind) -> Self {
        AuditKind::Action(kind)
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditKind::Action(kind) => write!(f, "{}", kind),
            AuditKind::Cancellation(kind) => write!(f, "{}{}", CANCEL_PREFIX, kind),
        }
    }
}

impl Serialize for AuditKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuditKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        AuditKind::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown audit kind: {}", s)))
    }
}

/// One row of the audit trail.
///
/// `user_id` is the account holder the entry is filed under, `performed_by`
/// the user who triggered it (the same person for client actions, an
/// operator or manager otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub user_id: UserId,
    pub performed_by: UserId,
    pub kind: AuditKind,
    pub amount: Option<Decimal>,
    pub deposit_id: Option<DepositId>,
    pub loan_id: Option<LoanId>,
    pub transfer_id: Option<TransferId>,
    pub metadata: String,
    pub created_at: DateTime<Utc>,
}

/// An audit entry that has not been written yet.
///
/// ```
/// use depobank_core::{ActionKind, NewAuditEntry};
///
/// let entry = NewAuditEntry::new(ActionKind::Freeze, 1, 1)
///     .with_deposit(7)
///     .with_metadata("frozen for 24h");
/// assert_eq!(entry.deposit_id, Some(7));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub performed_by: UserId,
    pub kind: AuditKind,
    pub amount: Option<Decimal>,
    pub deposit_id: Option<DepositId>,
    pub loan_id: Option<LoanId>,
    pub transfer_id: Option<TransferId>,
    pub metadata: String,
}

impl NewAuditEntry {
    pub fn new(kind: impl Into<AuditKind>, user_id: UserId, performed_by: UserId) -> Self {
        Self {
            user_id,
            performed_by,
            kind: kind.into(),
            amount: None,
            deposit_id: None,
            loan_id: None,
            transfer_id: None,
            metadata: String::new(),
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_deposit(mut self, deposit_id: DepositId) -> Self {
        self.deposit_id = Some(deposit_id);
        self
    }

    pub fn with_loan(mut self, loan_id: LoanId) -> Self {
        self.loan_id = Some(loan_id);
        self
    }

    pub fn with_transfer(mut self, transfer_id: TransferId) -> Self {
        self.transfer_id = Some(transfer_id);
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    /// Attach the id and timestamp the store assigned
    pub fn into_entry(self, id: AuditId, created_at: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id,
            user_id: self.user_id,
            performed_by: self.performed_by,
            kind: self.kind,
            amount: self.amount,
            deposit_id: self.deposit_id,
            loan_id: self.loan_id,
            transfer_id: self.transfer_id,
            metadata: self.metadata,
            created_at,
        }
    }
}

/// Proof that an audit entry was cancelled. At most one exists per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub id: i64,
    pub operator_id: UserId,
    pub affected_user_id: UserId,
    pub affected_deposit_id: DepositId,
    /// The cancelled audit entry
    pub transaction_id: AuditId,
    pub cancelled_at: DateTime<Utc>,
}
