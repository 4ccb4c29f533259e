//! SQLite persistence module
//!
//! Repository pattern for SQLite database access.

pub mod repos;
pub mod schema;

pub use repos::{
    create_pool, init_database, run_migrations, AuditFilter, AuditRepo, AuditTotals,
    CancellationRepo, DepositRepo, LoanPaymentRepo, LoanRepo, TransferRepo,
};
pub use schema::{
    AuditHistoryRow, AuditRow, CancellationRow, DepositRow, LoanPaymentRow, LoanRow, TransferRow,
};
