//! Loan commands

use anyhow::{bail, Result};
use chrono::Utc;
use depobank_business::{LoanService, ServiceContext};
use depobank_core::{fixed_rate_for_term, Actor, Loan, LoanRequest, Role};

use super::{print_json, require_role};
use crate::LoanAction;

const APPROVERS: [Role; 2] = [Role::Manager, Role::Admin];

pub async fn handle(ctx: &ServiceContext, actor: &Actor, action: LoanAction) -> Result<()> {
    let loans = LoanService::new(ctx);

    match action {
        LoanAction::Request {
            amount,
            term,
            loan_type,
            rate,
        } => {
            let mut request = LoanRequest::new(actor.user_id, loan_type.to_core_type(), amount, term);
            if let Some(rate) = rate {
                request = request.with_rate(rate);
            }
            print_json(&loans.request_loan(request).await?)?;
        }
        LoanAction::Approve { loan_id, activate } => {
            require_role(actor, &APPROVERS, "loan approve")?;
            let loan = if activate {
                loans.approve_and_activate(loan_id, actor.user_id).await?
            } else {
                loans.approve(loan_id, actor.user_id).await?
            };
            print_json(&loan)?;
        }
        LoanAction::Activate { loan_id } => {
            require_role(actor, &APPROVERS, "loan activate")?;
            print_json(&loans.activate(loan_id, actor.user_id).await?)?;
        }
        LoanAction::Reject { loan_id, reason } => {
            require_role(actor, &APPROVERS, "loan reject")?;
            print_json(&loans.reject(loan_id, actor.user_id, reason.as_deref()).await?)?;
        }
        LoanAction::Pay { loan_id, amount } => {
            let loan = loans.get_loan(loan_id).await?;
            if loan.user_id != actor.user_id && !actor.role.is_staff() {
                bail!("{} cannot pay loan #{} of user #{}", actor, loan_id, loan.user_id);
            }
            print_json(&loans.pay(loan_id, amount, actor.user_id).await?)?;
        }
        LoanAction::Show { loan_id } => {
            let summary = loans.summary(loan_id, Utc::now()).await?;
            if summary.loan.user_id != actor.user_id && !actor.role.is_staff() {
                bail!("{} cannot read loan #{}", actor, loan_id);
            }
            print_json(&summary)?;
        }
        LoanAction::List { user } => {
            let user = user.unwrap_or(actor.user_id);
            if user != actor.user_id && !actor.role.is_staff() {
                bail!("{} cannot list loans of user #{}", actor, user);
            }
            print_loans(&loans.list_user_loans(user).await?);
        }
        LoanAction::Pending => {
            require_role(actor, &APPROVERS, "loan pending")?;
            print_loans(&loans.pending_loans().await?);
        }
        LoanAction::Rates => rates(),
    }

    Ok(())
}

/// Fixed annual rates by term
pub fn rates() {
    println!("{:>12} {:>8}", "TERM", "RATE");
    for (term, rate) in LoanService::rate_table() {
        println!("{:>9} mo {:>7}%", term, rate);
    }
    println!("{:>12} {:>7}%", "> 24 mo", fixed_rate_for_term(25));
    println!("{:>12} {:>7}%", "other", fixed_rate_for_term(1));
}

fn print_loans(loans: &[Loan]) {
    if loans.is_empty() {
        println!("No loans");
        return;
    }

    println!(
        "{:<6} {:>6} {:<12} {:>12} {:>5} {:>7} {:>12} {:>10}  {}",
        "ID", "USER", "TYPE", "AMOUNT", "TERM", "RATE", "TOTAL", "MONTHLY", "STATUS"
    );
    for loan in loans {
        println!(
            "{:<6} {:>6} {:<12} {:>12} {:>5} {:>6}% {:>12} {:>10}  {}",
            loan.id,
            loan.user_id,
            loan.loan_type.as_str(),
            loan.amount,
            loan.term_months,
            loan.interest_rate,
            loan.total_payable,
            loan.monthly_payment,
            loan.status.as_str()
        );
    }
}
