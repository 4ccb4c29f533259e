//! # Depobank Business
//!
//! Business logic layer - deposits, transfers, cancellations, loans, audit.
//!
//! Every service borrows a [`ServiceContext`] and runs each mutating
//! operation in one database transaction that also writes its audit entry.
//!
//! ```rust,ignore
//! use depobank_business::{DepositService, ServiceContext, TransferRequest, TransferService};
//! use depobank_core::{Actor, NewDeposit};
//!
//! let ctx = ServiceContext::new(&db);
//! let alice = Actor::client(1);
//! let a = DepositService::new(&ctx)
//!     .create_deposit(&alice, NewDeposit::new(1, "Acme", dec!(500), dec!(3)))
//!     .await?;
//! TransferService::new(&ctx)
//!     .transfer(&alice, TransferRequest::new(a.id, b.id, dec!(100)))
//!     .await?;
//! ```

pub mod audit;
pub mod cancellation;
pub mod error;
pub mod history;
pub mod ledger;
pub mod loan;
pub mod services;
pub mod transfer;

pub use audit::{AuditLog, CipherError, MetadataCipher, PlaintextCipher};
pub use cancellation::{CancellationOutcome, CancellationService};
pub use error::{LedgerError, LedgerResult};
pub use history::{AuditService, AuditStatistics, HistoryEntry, HistoryFilter, KindCount};
pub use ledger::DepositService;
pub use loan::{LoanSchedule, LoanService, LoanSummary, PaymentReceipt};
pub use services::ServiceContext;
pub use transfer::{TransferReceipt, TransferRequest, TransferService};
