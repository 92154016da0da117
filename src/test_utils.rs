//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test transactions with sensible defaults.

use crate::{
    core::{
        Ledger,
        balance::{self, BalanceDrift},
        money::Money,
        receipt::{BlobStore, NewReceipt},
        transaction::NewTransaction,
    },
    entities::{PaymentMode, Transaction, TransactionType, receipt::ReceiptFileType, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{DatabaseConnection, prelude::*, sea_query::Expr};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// User most tests act as.
pub const TEST_USER: &str = "test_user";
/// A second tenant, for isolation checks.
pub const OTHER_USER: &str = "other_user";

/// Routes `tracing` output to the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// A ledger over a fresh in-memory database.
pub async fn setup_test_ledger() -> Result<Ledger> {
    Ok(Ledger::new(setup_test_db().await?))
}

/// A ledger over a fresh in-memory database using `blobs` for receipt cleanup.
pub async fn setup_test_ledger_with<B: BlobStore>(blobs: B) -> Result<Ledger<B>> {
    Ok(Ledger::with_blob_store(setup_test_db().await?, blobs))
}

/// `2024-01-{n}` as a calendar date.
pub fn date(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, n).unwrap_or_default()
}

/// `2024-01-{n} {hour}:00:00 UTC`.
pub fn at(n: u32, hour: u32) -> DateTimeUtc {
    Utc.with_ymd_and_hms(2024, 1, n, hour, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `2024-01-{n} 10:00:00 UTC`.
pub fn day(n: u32) -> DateTimeUtc {
    at(n, 10)
}

/// A cash transaction in the "Test" category.
pub fn new_transaction(kind: TransactionType, amount: i64, date: DateTimeUtc) -> NewTransaction {
    NewTransaction::new(kind, date, Money::new(amount), "Test", PaymentMode::Cash)
}

/// An income of `amount` minor units.
pub fn income(amount: i64, date: DateTimeUtc) -> NewTransaction {
    new_transaction(TransactionType::Income, amount, date)
}

/// An expense of `amount` minor units.
pub fn expense(amount: i64, date: DateTimeUtc) -> NewTransaction {
    new_transaction(TransactionType::Expense, amount, date)
}

/// Receipt metadata pointing at `remote_id`.
pub fn test_receipt(transaction_id: i64, remote_id: &str) -> NewReceipt {
    NewReceipt {
        transaction_id,
        image_url: format!("https://receipts.example/{remote_id}.jpg"),
        remote_id: remote_id.to_string(),
        file_type: ReceiptFileType::Jpeg,
    }
}

/// Reads a transaction straight from the store.
pub async fn fetch(db: &DatabaseConnection, id: i64) -> Result<transaction::Model> {
    Transaction::find_by_id(id)
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id })
}

/// `(id, balance)` of every transaction in ledger order.
pub async fn snapshot_balances(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<(i64, Money)>> {
    Ok(balance::ledger_order(user_id)
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.balance))
        .collect())
}

/// Overwrites a stored balance behind the engine's back.
pub async fn corrupt_balance(db: &DatabaseConnection, id: i64, value: Money) -> Result<()> {
    Transaction::update_many()
        .col_expr(transaction::Column::Balance, Expr::value(value))
        .filter(transaction::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Asserts `balance[i] == balance[i-1] + signed(tx[i])` over the user's whole
/// history, starting from zero.
pub async fn assert_ledger_consistent(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    let drift: Vec<BalanceDrift> = balance::verify_ledger(db, user_id).await?;
    assert!(drift.is_empty(), "ledger of {user_id} drifted: {drift:?}");

    let rows = balance::ledger_order(user_id).all(db).await?;
    let mut previous = Money::ZERO;
    for row in rows {
        let expected = previous.checked_add(row.signed_amount());
        assert_eq!(Some(row.balance), expected, "row {}", row.id);
        previous = row.balance;
    }
    Ok(())
}

/// Blob store that remembers what it destroyed, or fails every call.
#[derive(Clone, Debug, Default)]
pub struct RecordingBlobStore {
    destroyed: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingBlobStore {
    /// A store whose every destroy fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Remote ids destroyed so far, in call order.
    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

impl BlobStore for RecordingBlobStore {
    async fn destroy(&self, remote_id: &str) -> Result<()> {
        if self.fail {
            return Err(Error::BlobStore {
                message: format!("cannot reach store for {remote_id}"),
            });
        }
        if let Ok(mut destroyed) = self.destroyed.lock() {
            destroyed.push(remote_id.to_string());
        }
        Ok(())
    }
}
