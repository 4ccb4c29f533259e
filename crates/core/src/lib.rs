//! # Depobank Core
//!
//! Domain types for the deposit ledger: money conversion, actors,
//! deposits and their holds, audit kinds, and loan arithmetic.
//!
//! Nothing in this crate touches storage. The persistence crate maps
//! rows onto these types and the business crate drives them.

pub mod actor;
pub mod audit;
pub mod deposit;
pub mod error;
pub mod loan;
pub mod money;

pub use actor::{Actor, Role, UserId};
pub use audit::{
    ActionKind, AuditEntry, AuditId, AuditKind, CancellationRecord, NewAuditEntry, Reversal,
};
pub use deposit::{Deposit, DepositId, Hold, NewDeposit, TransferId, TransferRecord};
pub use error::{CoreError, CoreResult};
pub use loan::{
    fixed_rate_for_term, Loan, LoanId, LoanPayment, LoanQuote, LoanRequest, LoanStatus, LoanType,
    RATE_TABLE,
};
pub use money::{from_minor_units, positive_minor_units, round_money, to_minor_units, MONEY_SCALE};
