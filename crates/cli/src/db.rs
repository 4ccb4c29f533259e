//! Database initialization and status

use anyhow::{Context, Result};
use depobank_persistence::{Database, StoreConfig};
use sqlx::SqlitePool;

use crate::Cli;

/// Store settings from the global flags
pub fn store_config(cli: &Cli) -> StoreConfig {
    let config = StoreConfig::file(&cli.db).with_max_connections(cli.max_connections);
    match &cli.journal_dir {
        Some(dir) => config.with_journal_dir(dir),
        None => config,
    }
}

/// Open the ledger, creating the file and applying migrations when needed
pub async fn open(cli: &Cli) -> Result<Database> {
    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    Database::connect(&store_config(cli))
        .await
        .with_context(|| format!("Failed to open database at {:?}", cli.db))
}

/// Initialize the database with schema
pub async fn init(cli: &Cli, force: bool) -> Result<()> {
    if force && cli.db.exists() {
        std::fs::remove_file(&cli.db).context("Failed to remove existing database")?;
        println!("Removed existing database");
    }

    let database = open(cli).await?;
    database.close().await;
    println!("Database initialized at {:?}", cli.db);
    Ok(())
}

/// Show database status
pub async fn show_status(cli: &Cli) -> Result<()> {
    if !cli.db.exists() {
        println!("Database not found at {:?}", cli.db);
        println!("   Run 'depobank init' to create the database");
        return Ok(());
    }

    let database = open(cli).await?;
    println!("Database Status");
    println!("   Path: {:?}", cli.db);
    println!();

    for (label, table) in [
        ("Deposits", "deposits"),
        ("Transfers", "transfers"),
        ("Audit entries", "audit_entries"),
        ("Cancellations", "cancellations"),
        ("Loans", "loans"),
        ("Loan payments", "loan_payments"),
    ] {
        println!("   {:<14} {}", format!("{}:", label), count_rows(database.pool(), table).await?);
    }

    database.close().await;
    Ok(())
}

async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to count {}", table))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_store_config_from_flags() {
        let cli = Cli::parse_from([
            "depobank",
            "--db",
            "/tmp/ledger.db",
            "--journal-dir",
            "/tmp/journal",
            "--max-connections",
            "3",
            "stats",
        ]);
        let config = store_config(&cli);
        assert_eq!(config.database_url, "sqlite:/tmp/ledger.db");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.journal_dir, Some(PathBuf::from("/tmp/journal")));
    }

    #[tokio::test]
    async fn test_init_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.db");
        let cli = Cli::parse_from(["depobank", "--db", path.to_str().unwrap(), "init"]);

        init(&cli, false).await.unwrap();
        assert!(path.exists());

        let database = open(&cli).await.unwrap();
        assert_eq!(count_rows(database.pool(), "deposits").await.unwrap(), 0);
        database.close().await;
    }
}
