//! Repository tests against a fresh in-memory database

use chrono::{Duration, Utc};
use depobank_persistence::{
    AuditFilter, AuditRepo, CancellationRepo, Database, DepositRepo, LoanPaymentRepo, LoanRepo,
    PersistenceError, StoreConfig, TransferRepo,
};
use rust_decimal_macros::dec;
use tempfile::tempdir;

async fn setup() -> Database {
    Database::in_memory().await.unwrap()
}

#[tokio::test]
async fn test_deposit_insert_and_read() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();

    let id = DepositRepo::insert(&mut conn, 7, "Acme", 50_000, dec!(3.5), now)
        .await
        .unwrap();
    let row = DepositRepo::get_by_id(&mut conn, id).await.unwrap();

    assert_eq!(row.owner_id, 7);
    assert_eq!(row.amount_cents, 50_000);
    assert_eq!(row.interest_rate, "3.5");
    assert!(!row.is_blocked);
    assert!(!row.is_frozen);

    let missing = DepositRepo::get_by_id(&mut conn, 999).await.unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_debit_is_conditional() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();
    let id = DepositRepo::insert(&mut conn, 1, "Acme", 10_000, dec!(1), now)
        .await
        .unwrap();

    assert_eq!(DepositRepo::debit(&mut conn, id, 20_000, now).await.unwrap(), 0);
    assert_eq!(DepositRepo::debit(&mut conn, id, 10_000, now).await.unwrap(), 1);
    assert_eq!(DepositRepo::debit(&mut conn, id, 1, now).await.unwrap(), 0);

    let row = DepositRepo::get_by_id(&mut conn, id).await.unwrap();
    assert_eq!(row.amount_cents, 0);
}

#[tokio::test]
async fn test_holds_block_money_movement() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();
    let id = DepositRepo::insert(&mut conn, 1, "Acme", 10_000, dec!(1), now)
        .await
        .unwrap();

    assert_eq!(DepositRepo::set_blocked(&mut conn, id, false, now).await.unwrap(), 1);
    assert_eq!(DepositRepo::set_blocked(&mut conn, id, false, now).await.unwrap(), 0);
    assert_eq!(DepositRepo::credit(&mut conn, id, 100, now).await.unwrap(), 0);
    // Blocked deposits cannot be frozen
    assert_eq!(
        DepositRepo::set_frozen(&mut conn, id, now + Duration::hours(1), now)
            .await
            .unwrap(),
        0
    );

    assert_eq!(DepositRepo::set_blocked(&mut conn, id, true, now).await.unwrap(), 1);
    assert_eq!(
        DepositRepo::set_frozen(&mut conn, id, now + Duration::hours(1), now)
            .await
            .unwrap(),
        1
    );
    assert_eq!(DepositRepo::debit(&mut conn, id, 100, now).await.unwrap(), 0);
    assert_eq!(DepositRepo::clear_freeze(&mut conn, id, now).await.unwrap(), 1);
    assert_eq!(DepositRepo::clear_freeze(&mut conn, id, now).await.unwrap(), 0);
    assert_eq!(DepositRepo::debit(&mut conn, id, 100, now).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_by_owner_and_bank() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();
    DepositRepo::insert(&mut conn, 1, "Acme", 100, dec!(1), now).await.unwrap();
    DepositRepo::insert(&mut conn, 1, "Acme", 200, dec!(1), now).await.unwrap();
    DepositRepo::insert(&mut conn, 1, "Other", 300, dec!(1), now).await.unwrap();

    let removed = DepositRepo::delete_by_owner_and_bank(&mut conn, 1, "Acme").await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(DepositRepo::list_by_owner(&mut conn, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_transfer_history() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();

    let id = TransferRepo::insert(&mut conn, 1, "Acme", 10, 11, 500, now).await.unwrap();
    TransferRepo::insert(&mut conn, 1, "Acme", 11, 12, 100, now).await.unwrap();

    assert_eq!(TransferRepo::get_by_id(&mut conn, id).await.unwrap().amount_cents, 500);
    assert_eq!(TransferRepo::list_by_deposit(&mut conn, 11).await.unwrap().len(), 2);
    assert_eq!(TransferRepo::list_by_deposit(&mut conn, 10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancellation_is_unique_per_entry() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();

    let entry = AuditRepo::insert(&mut conn, 1, 1, "freeze", None, Some(5), None, None, "", now)
        .await
        .unwrap();

    CancellationRepo::insert(&mut conn, 9, 1, 5, entry, now).await.unwrap();
    let err = CancellationRepo::insert(&mut conn, 8, 1, 5, entry, now)
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::UniqueViolation(_)));

    assert!(CancellationRepo::exists_for_scope(&mut conn, 9, 1, 5).await.unwrap());
    assert!(!CancellationRepo::exists_for_scope(&mut conn, 8, 1, 5).await.unwrap());
    let found = CancellationRepo::find_by_transaction(&mut conn, entry).await.unwrap();
    assert_eq!(found.map(|c| c.operator_id), Some(9));
}

#[tokio::test]
async fn test_audit_history_and_latest_uncancelled() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();

    let create = AuditRepo::insert(&mut conn, 1, 1, "create", Some(100), Some(5), None, None, "", now)
        .await
        .unwrap();
    let block = AuditRepo::insert(&mut conn, 1, 1, "block", None, Some(5), None, None, "", now)
        .await
        .unwrap();
    AuditRepo::insert(&mut conn, 1, 1, "transfer", Some(50), Some(5), None, Some(1), "", now)
        .await
        .unwrap();
    AuditRepo::insert(&mut conn, 2, 2, "create", Some(10), Some(6), None, None, "", now)
        .await
        .unwrap();

    let kinds = ["create", "block", "unblock", "freeze"];
    let latest = AuditRepo::latest_uncancelled_for_deposit(&mut conn, 5, &kinds)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, block);

    CancellationRepo::insert(&mut conn, 9, 1, 5, block, now).await.unwrap();
    let latest = AuditRepo::latest_uncancelled_for_user(&mut conn, 1, &kinds)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, create);

    let filter = AuditFilter {
        user_id: Some(1),
        ..Default::default()
    };
    let history = AuditRepo::history(&mut conn, &filter).await.unwrap();
    assert_eq!(history.len(), 3);
    let cancelled = history.iter().find(|h| h.entry.id == block).unwrap();
    assert_eq!(cancelled.cancelled_by, Some(9));

    let filter = AuditFilter {
        kind: Some("create".to_string()),
        limit: Some(1),
        ..Default::default()
    };
    assert_eq!(AuditRepo::history(&mut conn, &filter).await.unwrap().len(), 1);

    let totals = AuditRepo::totals(&mut conn, now - Duration::days(30)).await.unwrap();
    assert_eq!(totals.total_entries, 4);
    assert_eq!(totals.transfer_count, 1);
    assert_eq!(totals.transfer_volume_cents, 50);
    assert_eq!(totals.active_users, 2);

    let counts = AuditRepo::counts_by_kind(&mut conn).await.unwrap();
    assert_eq!(counts[0], ("create".to_string(), 2));
}

#[tokio::test]
async fn test_loan_transitions_are_guarded() {
    let db = setup().await;
    let mut conn = db.pool().acquire().await.unwrap();
    let now = Utc::now();

    let id = LoanRepo::insert(&mut conn, 3, "standard", 100_000, 12, dec!(10), 110_471, 9_206, now)
        .await
        .unwrap();
    assert_eq!(LoanRepo::list_by_status(&mut conn, "pending").await.unwrap().len(), 1);

    assert_eq!(LoanRepo::transition(&mut conn, id, "approved", "active", now).await.unwrap(), 0);
    assert_eq!(
        LoanRepo::approve(&mut conn, id, 50, now, now + Duration::days(365), now)
            .await
            .unwrap(),
        1
    );
    assert_eq!(LoanRepo::reject(&mut conn, id, 50, Some("late"), now).await.unwrap(), 0);
    assert_eq!(LoanRepo::touch_active(&mut conn, id, now).await.unwrap(), 0);
    assert_eq!(LoanRepo::transition(&mut conn, id, "approved", "active", now).await.unwrap(), 1);
    assert_eq!(LoanRepo::touch_active(&mut conn, id, now).await.unwrap(), 1);

    let row = LoanRepo::get_by_id(&mut conn, id).await.unwrap();
    assert_eq!(row.status, "active");
    assert_eq!(row.approved_by, Some(50));
    assert!(row.start_date.is_some());

    LoanPaymentRepo::insert(&mut conn, id, 50_000, now).await.unwrap();
    LoanPaymentRepo::insert(&mut conn, id, 10_000, now).await.unwrap();
    assert_eq!(LoanPaymentRepo::total_paid(&mut conn, id).await.unwrap(), 60_000);
    assert_eq!(LoanPaymentRepo::list_by_loan(&mut conn, id).await.unwrap().len(), 2);
    assert_eq!(LoanPaymentRepo::total_paid(&mut conn, 999).await.unwrap(), 0);
}

#[tokio::test]
async fn test_file_database_with_journal() {
    let dir = tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("ledger.db"))
        .with_journal_dir(dir.path().join("journal"));

    let db = Database::connect(&config).await.unwrap();
    assert!(db.journal().is_some());
    {
        let mut conn = db.pool().acquire().await.unwrap();
        DepositRepo::insert(&mut conn, 1, "Acme", 100, dec!(1), Utc::now())
            .await
            .unwrap();
    }
    db.close().await;

    // Reopening runs migrations again without touching existing rows
    let db = Database::connect(&config).await.unwrap();
    let mut conn = db.pool().acquire().await.unwrap();
    assert_eq!(DepositRepo::list_by_owner(&mut conn, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_database_url_is_rejected() {
    let mut config = StoreConfig::in_memory();
    config.database_url = "  ".to_string();

    let err = Database::connect(&config).await.err().unwrap();
    assert!(matches!(err, PersistenceError::Configuration(_)));
}
