//! Repository implementations for SQLite
//!
//! Every repository function takes `&mut SqliteConnection`, so the same call
//! works on a pooled connection or inside an open transaction
//! (`&mut *tx`). Mutations that guard an invariant are conditional updates:
//! callers inspect the returned row count instead of reading first.

use crate::config::StoreConfig;
use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::str::FromStr;

// ============================================================================
// Deposit Repository
// ============================================================================

/// Repository for table `deposits`
pub struct DepositRepo;

impl DepositRepo {
    /// Insert a deposit, returning its id
    pub async fn insert(
        conn: &mut SqliteConnection,
        owner_id: i64,
        bank_name: &str,
        amount_cents: i64,
        interest_rate: Decimal,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO deposits
                (owner_id, bank_name, amount_cents, interest_rate, is_blocked, is_frozen,
                 freeze_until, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, 0, NULL, ?, ?)
            "#,
        )
        .bind(owner_id)
        .bind(bank_name)
        .bind(amount_cents)
        .bind(interest_rate.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> PersistenceResult<Option<DepositRow>> {
        let row = sqlx::query_as::<_, DepositRow>("SELECT * FROM deposits WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<DepositRow> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Deposit", id))
    }

    pub async fn list_by_owner(
        conn: &mut SqliteConnection,
        owner_id: i64,
    ) -> PersistenceResult<Vec<DepositRow>> {
        let rows = sqlx::query_as::<_, DepositRow>(
            "SELECT * FROM deposits WHERE owner_id = ? ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn list_by_owner_and_bank(
        conn: &mut SqliteConnection,
        owner_id: i64,
        bank_name: &str,
    ) -> PersistenceResult<Vec<DepositRow>> {
        let rows = sqlx::query_as::<_, DepositRow>(
            "SELECT * FROM deposits WHERE owner_id = ? AND bank_name = ? ORDER BY id",
        )
        .bind(owner_id)
        .bind(bank_name)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Delete every deposit of an owner in one bank namespace
    pub async fn delete_by_owner_and_bank(
        conn: &mut SqliteConnection,
        owner_id: i64,
        bank_name: &str,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query("DELETE FROM deposits WHERE owner_id = ? AND bank_name = ?")
            .bind(owner_id)
            .bind(bank_name)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Flip `is_blocked` from `from` to `!from`. Zero rows when the deposit
    /// is missing or not in the expected state.
    pub async fn set_blocked(
        conn: &mut SqliteConnection,
        id: i64,
        from: bool,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            "UPDATE deposits SET is_blocked = ?, updated_at = ? WHERE id = ? AND is_blocked = ?",
        )
        .bind(!from)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Freeze a deposit that holds no block and no freeze
    pub async fn set_frozen(
        conn: &mut SqliteConnection,
        id: i64,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deposits SET is_frozen = 1, freeze_until = ?, updated_at = ?
            WHERE id = ? AND is_blocked = 0 AND is_frozen = 0
            "#,
        )
        .bind(until)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Clear a freeze, whether expired or not
    pub async fn clear_freeze(
        conn: &mut SqliteConnection,
        id: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deposits SET is_frozen = 0, freeze_until = NULL, updated_at = ?
            WHERE id = ? AND is_frozen = 1
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Take money out of a deposit that is not on hold and can cover it
    pub async fn debit(
        conn: &mut SqliteConnection,
        id: i64,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deposits SET amount_cents = amount_cents - ?1, updated_at = ?2
            WHERE id = ?3 AND amount_cents >= ?1 AND is_blocked = 0 AND is_frozen = 0
            "#,
        )
        .bind(amount_cents)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Put money into a deposit that is not on hold
    pub async fn credit(
        conn: &mut SqliteConnection,
        id: i64,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deposits SET amount_cents = amount_cents + ?1, updated_at = ?2
            WHERE id = ?3 AND is_blocked = 0 AND is_frozen = 0
            "#,
        )
        .bind(amount_cents)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Transfer Repository
// ============================================================================

/// Repository for table `transfers`. Insert-only.
pub struct TransferRepo;

impl TransferRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        owner_id: i64,
        bank_name: &str,
        from_deposit_id: i64,
        to_deposit_id: i64,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO transfers
                (owner_id, bank_name, from_deposit_id, to_deposit_id, amount_cents, transferred_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner_id)
        .bind(bank_name)
        .bind(from_deposit_id)
        .bind(to_deposit_id)
        .bind(amount_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<TransferRow> {
        sqlx::query_as::<_, TransferRow>("SELECT * FROM transfers WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Transfer", id))
    }

    /// Transfers in or out of a deposit, newest first
    pub async fn list_by_deposit(
        conn: &mut SqliteConnection,
        deposit_id: i64,
    ) -> PersistenceResult<Vec<TransferRow>> {
        let rows = sqlx::query_as::<_, TransferRow>(
            r#"
            SELECT * FROM transfers
            WHERE from_deposit_id = ?1 OR to_deposit_id = ?1
            ORDER BY id DESC
            "#,
        )
        .bind(deposit_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Audit Repository
// ============================================================================

/// Filter for [`AuditRepo::history`]
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user_id: Option<i64>,
    pub kind: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Aggregates over the audit trail
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditTotals {
    pub total_entries: i64,
    pub transfer_count: i64,
    pub transfer_volume_cents: i64,
    pub active_users: i64,
}

/// Repository for table `audit_entries`. Insert-only.
pub struct AuditRepo;

impl AuditRepo {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: i64,
        performed_by: i64,
        kind: &str,
        amount_cents: Option<i64>,
        deposit_id: Option<i64>,
        loan_id: Option<i64>,
        transfer_id: Option<i64>,
        metadata: &str,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO audit_entries
                (user_id, performed_by, kind, amount_cents, deposit_id, loan_id, transfer_id,
                 metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(performed_by)
        .bind(kind)
        .bind(amount_cents)
        .bind(deposit_id)
        .bind(loan_id)
        .bind(transfer_id)
        .bind(metadata)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> PersistenceResult<Option<AuditRow>> {
        let row = sqlx::query_as::<_, AuditRow>("SELECT * FROM audit_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Entries matching `filter`, newest first, each joined with its cancellation
    pub async fn history(
        conn: &mut SqliteConnection,
        filter: &AuditFilter,
    ) -> PersistenceResult<Vec<AuditHistoryRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT a.*, c.operator_id AS cancelled_by, c.cancelled_at AS cancelled_at
            FROM audit_entries a
            LEFT JOIN cancellations c ON c.transaction_id = a.id
            WHERE 1 = 1
            "#,
        );
        if let Some(user_id) = filter.user_id {
            qb.push(" AND a.user_id = ").push_bind(user_id);
        }
        if let Some(kind) = &filter.kind {
            qb.push(" AND a.kind = ").push_bind(kind.clone());
        }
        if let Some(since) = filter.since {
            qb.push(" AND a.created_at >= ").push_bind(since);
        }
        if let Some(until) = filter.until {
            qb.push(" AND a.created_at <= ").push_bind(until);
        }
        qb.push(" ORDER BY a.id DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb
            .build_query_as::<AuditHistoryRow>()
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    /// Newest entry of one of `kinds` on a deposit that nobody has cancelled
    pub async fn latest_uncancelled_for_deposit(
        conn: &mut SqliteConnection,
        deposit_id: i64,
        kinds: &[&str],
    ) -> PersistenceResult<Option<AuditRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT a.* FROM audit_entries a WHERE a.deposit_id = ");
        qb.push_bind(deposit_id);
        Self::push_uncancelled_of_kinds(&mut qb, kinds);

        let row = qb
            .build_query_as::<AuditRow>()
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    /// Newest entry of one of `kinds` filed under a user that nobody has cancelled
    pub async fn latest_uncancelled_for_user(
        conn: &mut SqliteConnection,
        user_id: i64,
        kinds: &[&str],
    ) -> PersistenceResult<Option<AuditRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT a.* FROM audit_entries a WHERE a.user_id = ");
        qb.push_bind(user_id);
        Self::push_uncancelled_of_kinds(&mut qb, kinds);

        let row = qb
            .build_query_as::<AuditRow>()
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    fn push_uncancelled_of_kinds(qb: &mut QueryBuilder<'_, Sqlite>, kinds: &[&str]) {
        qb.push(" AND a.kind IN (");
        let mut separated = qb.separated(", ");
        for kind in kinds {
            separated.push_bind(kind.to_string());
        }
        separated.push_unseparated(")");
        qb.push(" AND NOT EXISTS (SELECT 1 FROM cancellations c WHERE c.transaction_id = a.id)");
        qb.push(" ORDER BY a.id DESC LIMIT 1");
    }

    /// Totals for the statistics report. `active_since` bounds the active-user count.
    pub async fn totals(
        conn: &mut SqliteConnection,
        active_since: DateTime<Utc>,
    ) -> PersistenceResult<AuditTotals> {
        let totals = sqlx::query_as::<_, AuditTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM audit_entries) AS total_entries,
                (SELECT COUNT(*) FROM audit_entries WHERE kind = 'transfer') AS transfer_count,
                (SELECT COALESCE(SUM(amount_cents), 0) FROM audit_entries
                    WHERE kind = 'transfer') AS transfer_volume_cents,
                (SELECT COUNT(DISTINCT user_id) FROM audit_entries
                    WHERE created_at >= ?) AS active_users
            "#,
        )
        .bind(active_since)
        .fetch_one(&mut *conn)
        .await?;
        Ok(totals)
    }

    /// Entry count per kind, most frequent first
    pub async fn counts_by_kind(conn: &mut SqliteConnection) -> PersistenceResult<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT kind, COUNT(*) AS n FROM audit_entries GROUP BY kind ORDER BY n DESC, kind",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }
}

// ============================================================================
// Cancellation Repository
// ============================================================================

/// Repository for table `cancellations`
pub struct CancellationRepo;

impl CancellationRepo {
    /// Record a cancellation. A second record for the same audit entry fails
    /// with [`PersistenceError::UniqueViolation`].
    pub async fn insert(
        conn: &mut SqliteConnection,
        operator_id: i64,
        affected_user_id: i64,
        affected_deposit_id: i64,
        transaction_id: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO cancellations
                (operator_id, affected_user_id, affected_deposit_id, transaction_id, cancelled_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(operator_id)
        .bind(affected_user_id)
        .bind(affected_deposit_id)
        .bind(transaction_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_transaction(
        conn: &mut SqliteConnection,
        transaction_id: i64,
    ) -> PersistenceResult<Option<CancellationRow>> {
        let row = sqlx::query_as::<_, CancellationRow>(
            "SELECT * FROM cancellations WHERE transaction_id = ?",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row)
    }

    /// Whether this operator already cancelled something on this user's deposit
    pub async fn exists_for_scope(
        conn: &mut SqliteConnection,
        operator_id: i64,
        affected_user_id: i64,
        affected_deposit_id: i64,
    ) -> PersistenceResult<bool> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM cancellations
            WHERE operator_id = ? AND affected_user_id = ? AND affected_deposit_id = ?
            "#,
        )
        .bind(operator_id)
        .bind(affected_user_id)
        .bind(affected_deposit_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count > 0)
    }
}

// ============================================================================
// Loan Repository
// ============================================================================

/// Repository for table `loans`
pub struct LoanRepo;

impl LoanRepo {
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        conn: &mut SqliteConnection,
        user_id: i64,
        loan_type: &str,
        amount_cents: i64,
        term_months: u32,
        interest_rate: Decimal,
        total_payable_cents: i64,
        monthly_payment_cents: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO loans
                (user_id, loan_type, amount_cents, term_months, interest_rate,
                 total_payable_cents, monthly_payment_cents, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(loan_type)
        .bind(amount_cents)
        .bind(i64::from(term_months))
        .bind(interest_rate.to_string())
        .bind(total_payable_cents)
        .bind(monthly_payment_cents)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<Option<LoanRow>> {
        let row = sqlx::query_as::<_, LoanRow>("SELECT * FROM loans WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row)
    }

    pub async fn get_by_id(conn: &mut SqliteConnection, id: i64) -> PersistenceResult<LoanRow> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Loan", id))
    }

    pub async fn list_by_user(conn: &mut SqliteConnection, user_id: i64) -> PersistenceResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            "SELECT * FROM loans WHERE user_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Loans in one status, oldest first
    pub async fn list_by_status(conn: &mut SqliteConnection, status: &str) -> PersistenceResult<Vec<LoanRow>> {
        let rows = sqlx::query_as::<_, LoanRow>(
            "SELECT * FROM loans WHERE status = ? ORDER BY id",
        )
        .bind(status)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// pending -> approved, stamping the schedule and approver
    pub async fn approve(
        conn: &mut SqliteConnection,
        id: i64,
        approved_by: i64,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = 'approved', start_date = ?, end_date = ?, approved_by = ?,
                approved_at = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(approved_by)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// pending -> rejected
    pub async fn reject(
        conn: &mut SqliteConnection,
        id: i64,
        rejected_by: i64,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = 'rejected', rejected_by = ?, rejected_at = ?, rejection_reason = ?,
                updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(rejected_by)
        .bind(now)
        .bind(reason)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// Plain status move guarded by the current status
    pub async fn transition(
        conn: &mut SqliteConnection,
        id: i64,
        from: &str,
        to: &str,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query("UPDATE loans SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(to)
            .bind(now)
            .bind(id)
            .bind(from)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    /// Take the write lock on an active loan. Zero rows when it is not active.
    pub async fn touch_active(
        conn: &mut SqliteConnection,
        id: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<u64> {
        let result = sqlx::query("UPDATE loans SET updated_at = ? WHERE id = ? AND status = 'active'")
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}

// ============================================================================
// Loan Payment Repository
// ============================================================================

/// Repository for table `loan_payments`. Insert-only.
pub struct LoanPaymentRepo;

impl LoanPaymentRepo {
    pub async fn insert(
        conn: &mut SqliteConnection,
        loan_id: i64,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO loan_payments (loan_id, amount_cents, paid_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(loan_id)
        .bind(amount_cents)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn list_by_loan(
        conn: &mut SqliteConnection,
        loan_id: i64,
    ) -> PersistenceResult<Vec<LoanPaymentRow>> {
        let rows = sqlx::query_as::<_, LoanPaymentRow>(
            "SELECT * FROM loan_payments WHERE loan_id = ? ORDER BY id",
        )
        .bind(loan_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    pub async fn total_paid(conn: &mut SqliteConnection, loan_id: i64) -> PersistenceResult<i64> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM loan_payments WHERE loan_id = ?",
        )
        .bind(loan_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(total)
    }
}

// ============================================================================
// Database Helpers
// ============================================================================

/// Open a connection pool for `config`
pub async fn create_pool(config: &StoreConfig) -> PersistenceResult<SqlitePool> {
    if config.database_url.trim().is_empty() {
        return Err(PersistenceError::Configuration(
            "database url is empty".to_string(),
        ));
    }
    let mut options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(config.busy_timeout);

    let pool_options = if config.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

/// Run migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Open the pool and bring the schema up to date
pub async fn init_database(config: &StoreConfig) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
