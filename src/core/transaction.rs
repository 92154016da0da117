//! Transaction business logic - Handles all transaction-related operations.
//!
//! Creating, updating and deleting a transaction each run inside one database
//! transaction while the owner's ledger lock is held, and finish with a
//! recomputation walk so every stored balance matches the ordered history again.
//! A failure anywhere, the walk included, rolls the whole operation back.

use crate::{
    core::{
        balance,
        locks::LedgerLocks,
        money::Money,
        receipt::{self, BlobStore},
    },
    entities::{PaymentMode, Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Fields of a transaction to be created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTransaction {
    /// Kind of transaction
    pub kind: TransactionType,
    /// Posting date
    pub date: DateTimeUtc,
    /// Non-negative amount
    pub amount: Money,
    /// Category name, required
    pub category: String,
    /// Payment mode
    pub payment_mode: PaymentMode,
    /// Optional counterparty
    pub vendor: Option<String>,
    /// Optional notes
    pub notes: Option<String>,
}

impl NewTransaction {
    /// A transaction without vendor or notes.
    pub fn new(
        kind: TransactionType,
        date: DateTimeUtc,
        amount: Money,
        category: impl Into<String>,
        payment_mode: PaymentMode,
    ) -> Self {
        Self {
            kind,
            date,
            amount,
            category: category.into(),
            payment_mode,
            vendor: None,
            notes: None,
        }
    }

    /// Sets the vendor.
    #[must_use]
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    /// Sets the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Checks the amount and the category.
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        validate_category(&self.category)?;
        Ok(())
    }
}

/// A partial update. `None` leaves a field as it is; `vendor` and `notes`
/// can be cleared with `Some(None)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionChanges {
    /// New kind
    pub kind: Option<TransactionType>,
    /// New posting date
    pub date: Option<DateTimeUtc>,
    /// New amount
    pub amount: Option<Money>,
    /// New category
    pub category: Option<String>,
    /// New payment mode
    pub payment_mode: Option<PaymentMode>,
    /// New vendor
    pub vendor: Option<Option<String>>,
    /// New notes
    pub notes: Option<Option<String>>,
}

impl TransactionChanges {
    /// Checks whichever of amount and category are present.
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        Ok(())
    }
}

fn validate_amount(amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<()> {
    if category.trim().is_empty() {
        return Err(Error::validation("category", "must not be empty"));
    }
    Ok(())
}

/// Trims free text and drops it entirely when nothing is left.
fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Records a new transaction for `user_id` and settles the balances from its
/// date onward.
#[instrument(skip(db, locks, new), fields(kind = ?new.kind, date = %new.date))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    locks: &LedgerLocks,
    user_id: &str,
    new: NewTransaction,
) -> Result<transaction::Model> {
    new.validate()?;

    let _guard = locks.acquire(user_id).await;
    let txn = db.begin().await?;

    let now = Utc::now();
    let inserted = transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(new.kind),
        date: Set(new.date),
        amount: Set(new.amount),
        category: Set(new.category.trim().to_string()),
        payment_mode: Set(new.payment_mode),
        vendor: Set(clean_text(new.vendor)),
        notes: Set(clean_text(new.notes)),
        // Placeholder until settled below, never committed
        balance: Set(Money::ZERO),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let balance = balance::settle_inserted(&txn, &inserted).await?;
    txn.commit().await?;

    info!(id = inserted.id, %balance, "transaction created");
    Ok(transaction::Model {
        balance,
        ..inserted
    })
}

/// Finds a transaction owned by `user_id`.
///
/// Someone else's transaction is reported exactly like a missing one.
pub async fn get_transaction<C>(db: &C, user_id: &str, id: i64) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    Transaction::find_by_id(id)
        .filter(transaction::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id })
}

/// Applies `changes` and re-walks the ledger from the earlier of the old and
/// new date.
#[instrument(skip(db, locks, changes))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    locks: &LedgerLocks,
    user_id: &str,
    id: i64,
    changes: TransactionChanges,
) -> Result<transaction::Model> {
    changes.validate()?;

    let _guard = locks.acquire(user_id).await;
    let txn = db.begin().await?;

    let existing = get_transaction(&txn, user_id, id).await?;
    let old_date = existing.date;
    let earliest = changes.date.map_or(old_date, |new_date| old_date.min(new_date));

    let mut active: transaction::ActiveModel = existing.into();
    if let Some(kind) = changes.kind {
        active.kind = Set(kind);
    }
    if let Some(date) = changes.date {
        active.date = Set(date);
    }
    if let Some(amount) = changes.amount {
        active.amount = Set(amount);
    }
    if let Some(category) = changes.category {
        active.category = Set(category.trim().to_string());
    }
    if let Some(payment_mode) = changes.payment_mode {
        active.payment_mode = Set(payment_mode);
    }
    if let Some(vendor) = changes.vendor {
        active.vendor = Set(clean_text(vendor));
    }
    if let Some(notes) = changes.notes {
        active.notes = Set(clean_text(notes));
    }
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    let outcome = balance::recompute_suffix(&txn, user_id, earliest).await?;
    let updated = get_transaction(&txn, user_id, id).await?;
    txn.commit().await?;

    info!(
        rewritten = outcome.rewritten,
        from = %earliest,
        "transaction updated"
    );
    Ok(updated)
}

/// Deletes a transaction with its receipts and re-walks the ledger from its
/// date.
///
/// Remote receipt binaries are removed after the commit; failures there are
/// logged and do not undo the delete.
#[instrument(skip(db, locks, blobs))]
pub async fn delete_transaction<B>(
    db: &DatabaseConnection,
    locks: &LedgerLocks,
    blobs: &B,
    user_id: &str,
    id: i64,
) -> Result<()>
where
    B: BlobStore,
{
    let _guard = locks.acquire(user_id).await;
    let txn = db.begin().await?;

    let existing = get_transaction(&txn, user_id, id).await?;
    let receipts = receipt::detach_receipts_for_transaction(&txn, id).await?;

    let deleted_date = existing.date;
    existing.delete(&txn).await?;

    let outcome = balance::recompute_suffix(&txn, user_id, deleted_date).await?;
    txn.commit().await?;

    info!(
        receipts = receipts.len(),
        rewritten = outcome.rewritten,
        "transaction deleted"
    );
    receipt::destroy_remote_best_effort(blobs, &receipts).await;
    Ok(())
}

/// Query options for [`list_transactions`]. Every filter is optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Earliest date, inclusive
    pub start_date: Option<DateTimeUtc>,
    /// Latest date, inclusive
    pub end_date: Option<DateTimeUtc>,
    /// Exact category
    pub category: Option<String>,
    /// Exact payment mode
    pub payment_mode: Option<PaymentMode>,
    /// Exact kind
    pub kind: Option<TransactionType>,
    /// Smallest amount, inclusive
    pub min_amount: Option<Money>,
    /// Largest amount, inclusive
    pub max_amount: Option<Money>,
    /// Vendor substring, case-insensitive
    pub vendor: Option<String>,
    /// Substring matched against vendor, notes and category
    pub search: Option<String>,
    /// 1-based page number
    pub page: u64,
    /// Page size
    pub limit: u64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            category: None,
            payment_mode: None,
            kind: None,
            min_amount: None,
            max_amount: None,
            vendor: None,
            search: None,
            page: 1,
            limit: 50,
        }
    }
}

impl TransactionFilter {
    fn condition(&self, user_id: &str) -> Condition {
        let mut condition = Condition::all().add(transaction::Column::UserId.eq(user_id));

        if let Some(start) = self.start_date {
            condition = condition.add(transaction::Column::Date.gte(start));
        }
        if let Some(end) = self.end_date {
            condition = condition.add(transaction::Column::Date.lte(end));
        }
        if let Some(category) = &self.category {
            condition = condition.add(transaction::Column::Category.eq(category.as_str()));
        }
        if let Some(payment_mode) = self.payment_mode {
            condition = condition.add(transaction::Column::PaymentMode.eq(payment_mode));
        }
        if let Some(kind) = self.kind {
            condition = condition.add(transaction::Column::Kind.eq(kind));
        }
        if let Some(min) = self.min_amount {
            condition = condition.add(transaction::Column::Amount.gte(min));
        }
        if let Some(max) = self.max_amount {
            condition = condition.add(transaction::Column::Amount.lte(max));
        }
        if let Some(vendor) = &self.vendor {
            condition = condition.add(transaction::Column::Vendor.contains(vendor));
        }
        if let Some(search) = &self.search {
            condition = condition.add(
                Condition::any()
                    .add(transaction::Column::Vendor.contains(search))
                    .add(transaction::Column::Notes.contains(search))
                    .add(transaction::Column::Category.contains(search)),
            );
        }
        condition
    }
}

/// One page of [`list_transactions`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionPage {
    /// Transactions on this page, newest first
    pub transactions: Vec<transaction::Model>,
    /// Matching transactions across all pages
    pub total: u64,
    /// Number of pages
    pub total_pages: u64,
    /// The page returned
    pub current_page: u64,
}

/// Lists a user's transactions, newest first (the reverse of ledger order), so
/// balances read top to bottom step back through history.
pub async fn list_transactions<C>(
    db: &C,
    user_id: &str,
    filter: &TransactionFilter,
) -> Result<TransactionPage>
where
    C: ConnectionTrait,
{
    if filter.page == 0 {
        return Err(Error::validation("page", "pages start at 1"));
    }
    if filter.limit == 0 {
        return Err(Error::validation("limit", "must be at least 1"));
    }

    let paginator = Transaction::find()
        .filter(filter.condition(user_id))
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .paginate(db, filter.limit);

    let totals = paginator.num_items_and_pages().await?;
    let transactions = paginator.fetch_page(filter.page - 1).await?;

    Ok(TransactionPage {
        transactions,
        total: totals.number_of_items,
        total_pages: totals.number_of_pages,
        current_page: filter.page,
    })
}
