//! Depobank CLI - Deposit ledger operations from the command line
//!
//! Usage:
//! ```bash
//! depobank init
//! depobank --as 1 deposit create --bank Acme --amount 500 --rate 3
//! depobank --as 1 transfer 1 2 200
//! depobank --as 1 deposit freeze 1 --hours 24
//! depobank --as 90 --role operator cancel 4
//! depobank --as 1 loan request --amount 1000 --term 12
//! depobank --as 2 --role manager loan approve 1 --activate
//! RUST_LOG=debug depobank history --user 1
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use depobank_core::{Actor, Role, UserId};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod db;

use commands::{audit, deposit, loan};

/// Depobank - deposit ledger with holds, cancellations and loans
#[derive(Parser)]
#[command(name = "depobank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/depobank.db", global = true)]
    pub db: PathBuf,

    /// Audit journal directory (no journal when omitted)
    #[arg(long, global = true)]
    pub journal_dir: Option<PathBuf>,

    /// Connection pool size
    #[arg(long, default_value_t = 5, global = true)]
    pub max_connections: u32,

    /// User id the command runs as
    #[arg(long = "as", default_value_t = 1, global = true)]
    pub user: UserId,

    /// Role of the acting user
    #[arg(long, default_value = "client", global = true)]
    pub role: RoleArg,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user, self.role.to_core_role())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    Init {
        /// Remove an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show row counts per table
    Status,

    /// Deposit management
    Deposit {
        #[command(subcommand)]
        action: DepositAction,
    },

    /// Move money between two deposits of the acting user
    Transfer {
        /// Source deposit id
        from: i64,
        /// Destination deposit id
        to: i64,
        /// Amount to move
        amount: Decimal,
    },

    /// Cancel one audited action (staff only)
    Cancel {
        /// Audit entry id
        transaction_id: i64,
    },

    /// Cancel the latest open action on every deposit of a user (admin only)
    CancelAll {
        /// Affected user id
        user_id: UserId,
    },

    /// Audit history, newest first
    History {
        /// Only entries filed under this user
        #[arg(long)]
        user: Option<UserId>,
        /// Only this kind, e.g. `freeze` or `cancel_block`
        #[arg(long)]
        kind: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        until: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Audit statistics
    Stats,

    /// Read the audit journal
    Journal {
        /// Day to print (YYYY-MM-DD); lists journal files when omitted
        #[arg(long)]
        day: Option<String>,
    },

    /// Loan management
    Loan {
        #[command(subcommand)]
        action: LoanAction,
    },
}

#[derive(Subcommand)]
pub enum DepositAction {
    /// Open a deposit
    Create {
        #[arg(long, short)]
        bank: String,
        #[arg(long, short)]
        amount: Decimal,
        /// Annual interest rate in percent
        #[arg(long, short, default_value = "0")]
        rate: Decimal,
        /// Owner, defaults to the acting user
        #[arg(long)]
        owner: Option<UserId>,
    },
    /// Delete every deposit of an owner in a bank
    Delete {
        #[arg(long, short)]
        bank: String,
        #[arg(long)]
        owner: Option<UserId>,
    },
    Block {
        deposit_id: i64,
    },
    Unblock {
        deposit_id: i64,
    },
    Freeze {
        deposit_id: i64,
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Show a deposit and its transfers
    Show {
        deposit_id: i64,
    },
    /// List deposits of an owner
    List {
        #[arg(long)]
        owner: Option<UserId>,
    },
}

#[derive(Subcommand)]
pub enum LoanAction {
    /// Apply for a loan
    Request {
        #[arg(long, short)]
        amount: Decimal,
        /// Term in months
        #[arg(long, short)]
        term: u32,
        #[arg(long = "type", default_value = "standard")]
        loan_type: LoanTypeArg,
        /// Annual rate in percent, overrides the rate table
        #[arg(long)]
        rate: Option<Decimal>,
    },
    /// Approve a pending loan (manager or admin)
    Approve {
        loan_id: i64,
        /// Activate right after approval
        #[arg(long)]
        activate: bool,
    },
    /// Activate an approved loan (manager or admin)
    Activate {
        loan_id: i64,
    },
    /// Reject a pending loan (manager or admin)
    Reject {
        loan_id: i64,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Record a repayment
    Pay {
        loan_id: i64,
        amount: Decimal,
    },
    /// Show repayment progress
    Show {
        loan_id: i64,
    },
    /// List loans of a user
    List {
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Applications waiting for a decision
    Pending,
    /// Fixed rates by term
    Rates,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Client,
    Operator,
    Manager,
    Admin,
}

impl RoleArg {
    pub fn to_core_role(&self) -> Role {
        match self {
            RoleArg::Client => Role::Client,
            RoleArg::Operator => Role::Operator,
            RoleArg::Manager => Role::Manager,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LoanTypeArg {
    Standard,
    Installment,
}

impl LoanTypeArg {
    pub fn to_core_type(&self) -> depobank_core::LoanType {
        match self {
            LoanTypeArg::Standard => depobank_core::LoanType::Standard,
            LoanTypeArg::Installment => depobank_core::LoanType::Installment,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let actor = cli.actor();

    match &cli.command {
        Commands::Init { force } => {
            db::init(&cli, *force).await?;
            return Ok(());
        }
        Commands::Status => {
            db::show_status(&cli).await?;
            return Ok(());
        }
        Commands::Journal { day } => {
            audit::journal(&cli, day.as_deref())?;
            return Ok(());
        }
        Commands::Loan {
            action: LoanAction::Rates,
        } => {
            loan::rates();
            return Ok(());
        }
        _ => {}
    }

    let database = db::open(&cli).await?;
    let ctx = depobank_business::ServiceContext::new(&database);

    match cli.command {
        Commands::Deposit { action } => deposit::handle(&ctx, &actor, action).await?,
        Commands::Transfer { from, to, amount } => {
            deposit::transfer(&ctx, &actor, from, to, amount).await?
        }
        Commands::Cancel { transaction_id } => audit::cancel(&ctx, &actor, transaction_id).await?,
        Commands::CancelAll { user_id } => audit::cancel_all(&ctx, &actor, user_id).await?,
        Commands::History {
            user,
            kind,
            since,
            until,
            limit,
        } => audit::history(&ctx, &actor, user, kind, since, until, limit).await?,
        Commands::Stats => audit::stats(&ctx, &actor).await?,
        Commands::Loan { action } => loan::handle(&ctx, &actor, action).await?,
        Commands::Init { .. } | Commands::Status | Commands::Journal { .. } => {}
    }

    database.close().await;
    Ok(())
}
