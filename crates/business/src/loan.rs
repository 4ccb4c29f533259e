//! Loan engine
//!
//! Loan applications, their status machine, and repayments. Every status
//! change is an update guarded by the expected current status, so two
//! concurrent transitions on one loan cannot both succeed.

use crate::error::{LedgerError, LedgerResult};
use crate::services::ServiceContext;
use chrono::{DateTime, Months, Utc};
use depobank_core::{
    from_minor_units, positive_minor_units, round_money, to_minor_units, ActionKind, AuditId, Loan,
    LoanId, LoanPayment, LoanRequest, LoanStatus, NewAuditEntry, UserId, RATE_TABLE,
};
use depobank_persistence::{LoanPaymentRepo, LoanRepo};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

/// Result of a recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment: LoanPayment,
    pub audit_entry_id: AuditId,
    pub total_paid: Decimal,
    pub remaining: Decimal,
    /// `completed` once the payments reach the total payable
    pub status: LoanStatus,
}

/// Where an approved loan is in its term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub total_days: i64,
    pub elapsed_days: i64,
    pub remaining_days: i64,
}

/// Repayment progress of one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub loan: Loan,
    pub payments: Vec<LoanPayment>,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    /// Percent of the total payable already paid, capped at 100
    pub progress_percent: Decimal,
    pub schedule: Option<LoanSchedule>,
}

async fn fetch_loan(conn: &mut SqliteConnection, loan_id: LoanId) -> LedgerResult<Loan> {
    let row = LoanRepo::find_by_id(conn, loan_id)
        .await?
        .ok_or_else(|| LedgerError::not_found("Loan", loan_id))?;
    Ok(Loan::try_from(row)?)
}

fn expect_status(loan: &Loan, expected: LoanStatus) -> LedgerResult<()> {
    if loan.status == expected {
        Ok(())
    } else {
        Err(LedgerError::InvalidState(format!(
            "loan #{} is {}, expected {}",
            loan.id, loan.status, expected
        )))
    }
}

fn lost_race(loan_id: LoanId, expected: LoanStatus) -> LedgerError {
    LedgerError::InvalidState(format!(
        "loan #{} left status {} while being updated",
        loan_id, expected
    ))
}

pub struct LoanService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LoanService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Fixed annual rates by term, used when a request carries no rate
    pub fn rate_table() -> &'static [(u32, Decimal)] {
        &RATE_TABLE
    }

    /// File a loan application. The loan starts out `pending`.
    pub async fn request_loan(&self, request: LoanRequest) -> LedgerResult<Loan> {
        let quote = request.quote()?;
        let now = Utc::now();

        let mut tx = self.ctx.begin().await?;
        let loan_id = LoanRepo::insert(
            &mut *tx,
            request.user_id,
            request.loan_type.as_str(),
            to_minor_units(request.amount)?,
            request.term_months,
            quote.interest_rate,
            to_minor_units(quote.total_payable)?,
            to_minor_units(quote.monthly_payment)?,
            now,
        )
        .await?;
        let loan = fetch_loan(&mut *tx, loan_id).await?;

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::LoanRequest, loan.user_id, request.user_id)
                    .with_amount(loan.amount)
                    .with_loan(loan_id)
                    .with_metadata(format!(
                        "{} loan #{} of {} over {} months at {}%, total payable {}, monthly {}",
                        loan.loan_type,
                        loan_id,
                        loan.amount,
                        loan.term_months,
                        loan.interest_rate,
                        loan.total_payable,
                        loan.monthly_payment
                    )),
            )
            .await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(loan_id, user_id = loan.user_id, amount = %loan.amount, "loan requested");
        Ok(loan)
    }

    /// pending -> approved. Stamps the approver and a schedule running
    /// `term_months` from now.
    pub async fn approve(&self, loan_id: LoanId, approver_id: UserId) -> LedgerResult<Loan> {
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        let loan = fetch_loan(&mut *tx, loan_id).await?;
        expect_status(&loan, LoanStatus::Pending)?;
        let end_date = now
            .checked_add_months(Months::new(loan.term_months))
            .ok_or_else(|| LedgerError::Validation(format!("loan #{} ends out of range", loan_id)))?;

        if LoanRepo::approve(&mut *tx, loan_id, approver_id, now, end_date, now).await? == 0 {
            return Err(lost_race(loan_id, LoanStatus::Pending));
        }

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::LoanApproved, loan.user_id, approver_id)
                    .with_amount(loan.amount)
                    .with_loan(loan_id)
                    .with_metadata(format!(
                        "Loan #{} approved by #{}, runs until {}",
                        loan_id,
                        approver_id,
                        end_date.to_rfc3339()
                    )),
            )
            .await?;
        let loan = fetch_loan(&mut *tx, loan_id).await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(loan_id, approver_id, "loan approved");
        Ok(loan)
    }

    /// approved -> active
    pub async fn activate(&self, loan_id: LoanId, actor_id: UserId) -> LedgerResult<Loan> {
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        let loan = fetch_loan(&mut *tx, loan_id).await?;
        expect_status(&loan, LoanStatus::Approved)?;
        let next = loan.status.transition_to(LoanStatus::Active)?;
        if LoanRepo::transition(&mut *tx, loan_id, loan.status.as_str(), next.as_str(), now).await?
            == 0
        {
            return Err(lost_race(loan_id, LoanStatus::Approved));
        }

        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::LoanActivated, loan.user_id, actor_id)
                    .with_amount(loan.amount)
                    .with_loan(loan_id)
                    .with_metadata(format!("Loan #{} activated by #{}", loan_id, actor_id)),
            )
            .await?;
        let loan = fetch_loan(&mut *tx, loan_id).await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(loan_id, actor_id, "loan activated");
        Ok(loan)
    }

    /// Manager shortcut: approve, then activate, as two committed steps
    pub async fn approve_and_activate(&self, loan_id: LoanId, manager_id: UserId) -> LedgerResult<Loan> {
        self.approve(loan_id, manager_id).await?;
        self.activate(loan_id, manager_id).await
    }

    /// pending -> rejected, keeping the reason on the loan
    pub async fn reject(
        &self,
        loan_id: LoanId,
        approver_id: UserId,
        reason: Option<&str>,
    ) -> LedgerResult<Loan> {
        let now = Utc::now();
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let mut tx = self.ctx.begin().await?;

        let loan = fetch_loan(&mut *tx, loan_id).await?;
        expect_status(&loan, LoanStatus::Pending)?;
        if LoanRepo::reject(&mut *tx, loan_id, approver_id, reason, now).await? == 0 {
            return Err(lost_race(loan_id, LoanStatus::Pending));
        }

        let mut metadata = format!("Loan #{} rejected by #{}", loan_id, approver_id);
        if let Some(reason) = reason {
            metadata.push_str(": ");
            metadata.push_str(reason);
        }
        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::LoanRejected, loan.user_id, approver_id)
                    .with_amount(loan.amount)
                    .with_loan(loan_id)
                    .with_metadata(metadata),
            )
            .await?;
        let loan = fetch_loan(&mut *tx, loan_id).await?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(loan_id, approver_id, "loan rejected");
        Ok(loan)
    }

    /// Record a payment on an active loan. The payment that brings the
    /// total paid to the total payable completes the loan in the same
    /// transaction. Overpayment is accepted.
    pub async fn pay(&self, loan_id: LoanId, amount: Decimal, payer_id: UserId) -> LedgerResult<PaymentReceipt> {
        let amount_cents = positive_minor_units(amount)?;
        let now = Utc::now();
        let mut tx = self.ctx.begin().await?;

        let loan = fetch_loan(&mut *tx, loan_id).await?;
        expect_status(&loan, LoanStatus::Active)?;
        if LoanRepo::touch_active(&mut *tx, loan_id, now).await? == 0 {
            return Err(lost_race(loan_id, LoanStatus::Active));
        }

        let payment_id = LoanPaymentRepo::insert(&mut *tx, loan_id, amount_cents, now).await?;
        let total_paid = from_minor_units(LoanPaymentRepo::total_paid(&mut *tx, loan_id).await?);

        let mut status = loan.status;
        if loan.is_paid_off(total_paid) {
            status = loan.status.transition_to(LoanStatus::Completed)?;
            if LoanRepo::transition(&mut *tx, loan_id, loan.status.as_str(), status.as_str(), now).await?
                == 0
            {
                return Err(lost_race(loan_id, LoanStatus::Active));
            }
        }

        let remaining = loan.remaining_after(total_paid);
        let mut metadata = format!(
            "Payment of {} on loan #{}, paid {} of {}",
            amount, loan_id, total_paid, loan.total_payable
        );
        if status == LoanStatus::Completed {
            metadata.push_str(", loan completed");
        }
        let entry = self
            .ctx
            .audit()
            .record(
                &mut *tx,
                NewAuditEntry::new(ActionKind::LoanPayment, loan.user_id, payer_id)
                    .with_amount(amount)
                    .with_loan(loan_id)
                    .with_metadata(metadata),
            )
            .await?;

        let payment = LoanPaymentRepo::list_by_loan(&mut *tx, loan_id)
            .await?
            .into_iter()
            .find(|p| p.id == payment_id)
            .map(LoanPayment::from)
            .ok_or_else(|| LedgerError::not_found("Loan payment", payment_id))?;
        tx.commit().await?;
        self.ctx.audit().publish(&[&entry]);

        info!(loan_id, amount = %amount, total_paid = %total_paid, status = %status, "loan payment recorded");
        Ok(PaymentReceipt {
            payment,
            audit_entry_id: entry.id,
            total_paid,
            remaining,
            status,
        })
    }

    pub async fn get_loan(&self, loan_id: LoanId) -> LedgerResult<Loan> {
        let mut conn = self.ctx.pool().acquire().await?;
        fetch_loan(&mut conn, loan_id).await
    }

    /// A user's loans, newest first
    pub async fn list_user_loans(&self, user_id: UserId) -> LedgerResult<Vec<Loan>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let rows = LoanRepo::list_by_user(&mut conn, user_id).await?;
        rows.into_iter()
            .map(|row| Loan::try_from(row).map_err(LedgerError::from))
            .collect()
    }

    /// Loans in `status`, oldest first
    pub async fn list_by_status(&self, status: LoanStatus) -> LedgerResult<Vec<Loan>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let rows = LoanRepo::list_by_status(&mut conn, status.as_str()).await?;
        rows.into_iter()
            .map(|row| Loan::try_from(row).map_err(LedgerError::from))
            .collect()
    }

    /// Applications waiting for a decision
    pub async fn pending_loans(&self) -> LedgerResult<Vec<Loan>> {
        self.list_by_status(LoanStatus::Pending).await
    }

    pub async fn payments(&self, loan_id: LoanId) -> LedgerResult<Vec<LoanPayment>> {
        let mut conn = self.ctx.pool().acquire().await?;
        fetch_loan(&mut conn, loan_id).await?;
        let rows = LoanPaymentRepo::list_by_loan(&mut conn, loan_id).await?;
        Ok(rows.into_iter().map(LoanPayment::from).collect())
    }

    pub async fn summary(&self, loan_id: LoanId, now: DateTime<Utc>) -> LedgerResult<LoanSummary> {
        let mut conn = self.ctx.pool().acquire().await?;
        let loan = fetch_loan(&mut conn, loan_id).await?;
        let payments: Vec<LoanPayment> = LoanPaymentRepo::list_by_loan(&mut conn, loan_id)
            .await?
            .into_iter()
            .map(LoanPayment::from)
            .collect();

        let paid_amount: Decimal = payments.iter().map(|p| p.amount).sum();
        let progress_percent = if loan.total_payable.is_zero() {
            Decimal::ONE_HUNDRED
        } else {
            round_money(paid_amount / loan.total_payable * Decimal::ONE_HUNDRED)
                .min(Decimal::ONE_HUNDRED)
        };
        let schedule = match (loan.start_date, loan.end_date) {
            (Some(start), Some(end)) => {
                let total_days = (end - start).num_days();
                let elapsed_days = (now - start).num_days().clamp(0, total_days.max(0));
                Some(LoanSchedule {
                    total_days,
                    elapsed_days,
                    remaining_days: total_days - elapsed_days,
                })
            }
            _ => None,
        };

        Ok(LoanSummary {
            remaining_amount: loan.remaining_after(paid_amount),
            loan,
            payments,
            paid_amount,
            progress_percent,
            schedule,
        })
    }
}
