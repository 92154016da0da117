//! The caller-facing ledger.
//!
//! [`Ledger`] bundles the database connection, the per-user locks and the
//! receipt blob store, and exposes every operation request handlers need.
//! Each call is scoped to one user; anything owned by someone else is
//! reported as not found.

use crate::{
    core::{
        balance::{self, BalanceDrift, WalkOutcome, WalkStart},
        category::{self, CategoryChanges, NewCategory},
        locks::LedgerLocks,
        money::Money,
        receipt::{self, BlobStore, NewReceipt, NoopBlobStore},
        summary::{self, DailySummary},
        transaction::{self, NewTransaction, TransactionChanges, TransactionFilter, TransactionPage},
    },
    entities::{CategoryModel, ReceiptModel, TransactionModel},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, TransactionTrait, prelude::DateTimeUtc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Entry point for every ledger operation.
#[derive(Clone, Debug)]
pub struct Ledger<B = NoopBlobStore> {
    db: DatabaseConnection,
    locks: LedgerLocks,
    blobs: Arc<B>,
}

impl Ledger<NoopBlobStore> {
    /// A ledger without a remote receipt store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_blob_store(db, NoopBlobStore)
    }
}

impl<B> Ledger<B>
where
    B: BlobStore,
{
    /// A ledger that removes receipt binaries through `blobs`.
    pub fn with_blob_store(db: DatabaseConnection, blobs: B) -> Self {
        Self {
            db,
            locks: LedgerLocks::new(),
            blobs: Arc::new(blobs),
        }
    }

    /// The underlying connection, for read-only queries.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Records a transaction.
    pub async fn create(&self, user_id: &str, fields: NewTransaction) -> Result<TransactionModel> {
        transaction::create_transaction(&self.db, &self.locks, user_id, fields).await
    }

    /// Changes a transaction.
    pub async fn update(
        &self,
        user_id: &str,
        id: i64,
        changes: TransactionChanges,
    ) -> Result<TransactionModel> {
        transaction::update_transaction(&self.db, &self.locks, user_id, id, changes).await
    }

    /// Removes a transaction and its receipts.
    pub async fn delete(&self, user_id: &str, id: i64) -> Result<()> {
        transaction::delete_transaction(&self.db, &self.locks, self.blobs.as_ref(), user_id, id)
            .await
    }

    /// Net position of the user after everything dated on or before `date`.
    pub async fn opening_balance_as_of(&self, user_id: &str, date: DateTimeUtc) -> Result<Money> {
        balance::balance_as_of(&self.db, user_id, date).await
    }

    /// One transaction.
    pub async fn get(&self, user_id: &str, id: i64) -> Result<TransactionModel> {
        transaction::get_transaction(&self.db, user_id, id).await
    }

    /// A filtered page of transactions, newest first.
    pub async fn list(&self, user_id: &str, filter: &TransactionFilter) -> Result<TransactionPage> {
        transaction::list_transactions(&self.db, user_id, filter).await
    }

    /// Opening, movement and closing of one day.
    pub async fn daily_summary(&self, user_id: &str, day: NaiveDate) -> Result<DailySummary> {
        summary::daily_summary(&self.db, user_id, day).await
    }

    /// Stored balances that disagree with the history. Writes nothing.
    pub async fn verify(&self, user_id: &str) -> Result<Vec<BalanceDrift>> {
        balance::verify_ledger(&self.db, user_id).await
    }

    /// Recomputes the user's whole history from a zero opening balance.
    ///
    /// Safe to run at any time; a ledger that is already consistent is left
    /// untouched.
    #[instrument(skip(self))]
    pub async fn rebuild(&self, user_id: &str) -> Result<WalkOutcome> {
        let _guard = self.locks.acquire(user_id).await;
        let txn = self.db.begin().await?;
        let outcome =
            balance::recompute_from(&txn, user_id, WalkStart::Beginning, Money::ZERO).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Verifies every user's ledger and rebuilds the ones that drifted.
    /// Returns the number of ledgers rebuilt.
    pub async fn repair_all(&self) -> Result<usize> {
        let mut repaired = 0;
        for user_id in balance::ledger_users(&self.db).await? {
            let drift = self.verify(&user_id).await?;
            if drift.is_empty() {
                continue;
            }
            warn!(
                user_id = %user_id,
                drifted = drift.len(),
                "stored balances drifted, rebuilding"
            );
            let outcome = self.rebuild(&user_id).await?;
            info!(user_id = %user_id, rewritten = outcome.rewritten, "ledger rebuilt");
            repaired += 1;
        }
        self.locks.prune();
        Ok(repaired)
    }

    /// Attaches receipt metadata to one of the user's transactions.
    pub async fn attach_receipt(&self, user_id: &str, new: NewReceipt) -> Result<ReceiptModel> {
        receipt::attach_receipt(&self.db, user_id, new).await
    }

    /// Receipts of one transaction, newest first.
    pub async fn receipts(&self, user_id: &str, transaction_id: i64) -> Result<Vec<ReceiptModel>> {
        receipt::receipts_for_transaction(&self.db, user_id, transaction_id).await
    }

    /// Deletes one receipt together with its remote object.
    pub async fn delete_receipt(&self, user_id: &str, id: i64) -> Result<()> {
        receipt::delete_receipt(&self.db, self.blobs.as_ref(), user_id, id).await
    }

    /// Default categories followed by the user's own.
    pub async fn categories(&self, user_id: &str) -> Result<Vec<CategoryModel>> {
        category::categories_for_user(&self.db, user_id).await
    }

    /// Adds a category for the user.
    pub async fn create_category(&self, user_id: &str, new: NewCategory) -> Result<CategoryModel> {
        category::create_category(&self.db, user_id, new).await
    }

    /// Changes one of the user's categories.
    pub async fn update_category(
        &self,
        user_id: &str,
        id: i64,
        changes: CategoryChanges,
    ) -> Result<CategoryModel> {
        category::update_category(&self.db, user_id, id, changes).await
    }

    /// Removes one of the user's categories.
    pub async fn delete_category(&self, user_id: &str, id: i64) -> Result<()> {
        category::delete_category(&self.db, user_id, id).await
    }
}
