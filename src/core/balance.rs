//! Running-balance engine.
//!
//! Every transaction caches the owner's cumulative net position right after it,
//! in canonical order `(date ASC, id ASC)`. The functions here derive opening
//! balances from the stored history and re-walk an ordered suffix to restore
//! that invariant after a mutation. They take any [`ConnectionTrait`] so callers
//! run them inside the same database transaction as the mutation itself.
//!
//! Boundaries are always drawn on `date`, never on `id`, so transactions that
//! share a date are walked as one block.

use crate::{
    core::money::Money,
    entities::{Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Select, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, instrument, trace};

/// `+amount` for credit kinds, `-amount` for everything else.
///
/// This is the only place the effect class is applied; opening balances and
/// walks both go through it.
#[must_use]
pub fn signed_amount(kind: TransactionType, amount: Money) -> Money {
    if kind.is_credit() { amount } else { -amount }
}

/// All of a user's transactions in canonical ledger order.
pub(crate) fn ledger_order(user_id: &str) -> Select<Transaction> {
    Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
}

/// Where a recomputation walk begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkStart {
    /// The whole history.
    Beginning,
    /// Transactions dated on or after this instant.
    From(DateTimeUtc),
    /// Transactions dated strictly after this instant.
    After(DateTimeUtc),
}

/// What a walk did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Rows visited
    pub scanned: usize,
    /// Rows whose stored balance changed
    pub rewritten: usize,
    /// Running balance after the last visited row
    pub closing: Money,
}

/// A transaction whose cached balance disagrees with its history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    /// The drifted transaction
    pub transaction_id: i64,
    /// Balance currently stored
    pub stored: Money,
    /// Balance implied by the ordered history
    pub expected: Money,
}

fn accumulate(running: Money, row: &transaction::Model) -> Result<Money> {
    running
        .checked_add(row.signed_amount())
        .ok_or(Error::BalanceOverflow)
}

async fn sum_signed<C>(db: &C, query: Select<Transaction>) -> Result<Money>
where
    C: ConnectionTrait,
{
    query
        .all(db)
        .await?
        .iter()
        .try_fold(Money::ZERO, accumulate)
}

/// Sum of the signed amounts of every transaction of `user_id` dated on or
/// before `cutoff`. Pure read.
pub async fn balance_as_of<C>(db: &C, user_id: &str, cutoff: DateTimeUtc) -> Result<Money>
where
    C: ConnectionTrait,
{
    sum_signed(
        db,
        ledger_order(user_id).filter(transaction::Column::Date.lte(cutoff)),
    )
    .await
}

/// Opening balance: the signed total strictly before `cutoff`.
pub async fn balance_before<C>(db: &C, user_id: &str, cutoff: DateTimeUtc) -> Result<Money>
where
    C: ConnectionTrait,
{
    sum_signed(
        db,
        ledger_order(user_id).filter(transaction::Column::Date.lt(cutoff)),
    )
    .await
}

/// Walks the user's transactions from `start` in canonical order, carrying a
/// running total that begins at `opening`, and overwrites every stored balance
/// that disagrees with it.
///
/// The walk is a pure function of the ordered history, so running it twice
/// from the same start rewrites nothing the second time.
#[instrument(skip(db))]
pub async fn recompute_from<C>(
    db: &C,
    user_id: &str,
    start: WalkStart,
    opening: Money,
) -> Result<WalkOutcome>
where
    C: ConnectionTrait,
{
    let query = match start {
        WalkStart::Beginning => ledger_order(user_id),
        WalkStart::From(date) => ledger_order(user_id).filter(transaction::Column::Date.gte(date)),
        WalkStart::After(date) => ledger_order(user_id).filter(transaction::Column::Date.gt(date)),
    };
    let rows = query.all(db).await?;

    let mut running = opening;
    let mut rewritten = 0;
    for row in &rows {
        running = accumulate(running, row)?;
        if row.balance == running {
            continue;
        }
        trace!(id = row.id, stored = %row.balance, balance = %running, "rewriting balance");
        Transaction::update_many()
            .col_expr(transaction::Column::Balance, Expr::value(running))
            .filter(transaction::Column::Id.eq(row.id))
            .exec(db)
            .await?;
        rewritten += 1;
    }

    debug!(
        scanned = rows.len(),
        rewritten,
        closing = %running,
        "recomputation walk finished"
    );
    Ok(WalkOutcome {
        scanned: rows.len(),
        rewritten,
        closing: running,
    })
}

/// Re-walks everything dated on or after `from`, opening with the balance
/// strictly before it. Used after updates and deletes.
pub async fn recompute_suffix<C>(db: &C, user_id: &str, from: DateTimeUtc) -> Result<WalkOutcome>
where
    C: ConnectionTrait,
{
    let opening = balance_before(db, user_id, from).await?;
    recompute_from(db, user_id, WalkStart::From(from), opening).await
}

/// Settles a freshly inserted transaction: stores its own balance (everything
/// dated on or before it, itself included) and re-walks every later date.
///
/// The new row has the largest id, so it closes its same-date block and the
/// inclusive sum is exactly its canonical balance.
pub async fn settle_inserted<C>(db: &C, inserted: &transaction::Model) -> Result<Money>
where
    C: ConnectionTrait,
{
    let balance = balance_as_of(db, &inserted.user_id, inserted.date).await?;
    Transaction::update_many()
        .col_expr(transaction::Column::Balance, Expr::value(balance))
        .filter(transaction::Column::Id.eq(inserted.id))
        .exec(db)
        .await?;

    recompute_from(
        db,
        &inserted.user_id,
        WalkStart::After(inserted.date),
        balance,
    )
    .await?;
    Ok(balance)
}

/// Compares every stored balance of `user_id` with the one implied by the
/// ordered history. Writes nothing.
pub async fn verify_ledger<C>(db: &C, user_id: &str) -> Result<Vec<BalanceDrift>>
where
    C: ConnectionTrait,
{
    let mut running = Money::ZERO;
    let mut drift = Vec::new();
    for row in ledger_order(user_id).all(db).await? {
        running = accumulate(running, &row)?;
        if row.balance != running {
            drift.push(BalanceDrift {
                transaction_id: row.id,
                stored: row.balance,
                expected: running,
            });
        }
    }
    Ok(drift)
}

/// Every user that owns at least one transaction.
pub async fn ledger_users<C>(db: &C) -> Result<Vec<String>>
where
    C: ConnectionTrait,
{
    Transaction::find()
        .select_only()
        .column(transaction::Column::UserId)
        .distinct()
        .order_by_asc(transaction::Column::UserId)
        .into_tuple::<String>()
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_signed_amount_effect_classes() {
        let amount = Money::new(100);
        assert_eq!(signed_amount(TransactionType::Income, amount), Money::new(100));
        assert_eq!(
            signed_amount(TransactionType::CreditReceived, amount),
            Money::new(100)
        );
        assert_eq!(signed_amount(TransactionType::Expense, amount), Money::new(-100));
        assert_eq!(signed_amount(TransactionType::Purchase, amount), Money::new(-100));
        assert_eq!(
            signed_amount(TransactionType::CreditGiven, amount),
            Money::new(-100)
        );
    }

    #[tokio::test]
    async fn test_balance_as_of_and_before_on_same_date() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        ledger.create(TEST_USER, income(300, day(1))).await?;
        ledger.create(TEST_USER, expense(50, day(2))).await?;
        ledger.create(TEST_USER, income(20, day(2))).await?;
        ledger.create(TEST_USER, expense(5, day(3))).await?;

        let db = ledger.connection();
        assert_eq!(balance_as_of(db, TEST_USER, day(2)).await?, Money::new(270));
        assert_eq!(balance_before(db, TEST_USER, day(2)).await?, Money::new(300));
        assert_eq!(balance_before(db, TEST_USER, day(1)).await?, Money::ZERO);
        assert_eq!(balance_as_of(db, TEST_USER, day(9)).await?, Money::new(265));
        Ok(())
    }

    #[tokio::test]
    async fn test_balance_queries_are_scoped_to_user() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        ledger.create(TEST_USER, income(100, day(1))).await?;
        ledger.create(OTHER_USER, expense(70, day(1))).await?;

        let db = ledger.connection();
        assert_eq!(balance_as_of(db, TEST_USER, day(5)).await?, Money::new(100));
        assert_eq!(balance_as_of(db, OTHER_USER, day(5)).await?, Money::new(-70));
        assert_eq!(
            ledger_users(db).await?,
            vec![OTHER_USER.to_string(), TEST_USER.to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        for n in 1..=5_u32 {
            ledger.create(TEST_USER, income(10 * i64::from(n), day(n))).await?;
            ledger.create(TEST_USER, expense(3, day(n))).await?;
        }
        let db = ledger.connection();

        let first = recompute_suffix(db, TEST_USER, day(2)).await?;
        let before = snapshot_balances(db, TEST_USER).await?;
        let second = recompute_suffix(db, TEST_USER, day(2)).await?;

        assert_eq!(first.rewritten, 0);
        assert_eq!(second.rewritten, 0);
        assert_eq!(first.scanned, 8);
        assert_eq!(first.closing, second.closing);
        assert_eq!(before, snapshot_balances(db, TEST_USER).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_recompute_repairs_corrupted_suffix() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        let first = ledger.create(TEST_USER, income(500, day(1))).await?;
        let second = ledger.create(TEST_USER, expense(200, day(2))).await?;
        let third = ledger.create(TEST_USER, expense(100, day(3))).await?;
        let db = ledger.connection();

        corrupt_balance(db, second.id, Money::new(9_999)).await?;
        corrupt_balance(db, third.id, Money::new(-1)).await?;

        let drift = verify_ledger(db, TEST_USER).await?;
        assert_eq!(
            drift,
            vec![
                BalanceDrift {
                    transaction_id: second.id,
                    stored: Money::new(9_999),
                    expected: Money::new(300),
                },
                BalanceDrift {
                    transaction_id: third.id,
                    stored: Money::new(-1),
                    expected: Money::new(200),
                },
            ]
        );

        let outcome = recompute_suffix(db, TEST_USER, day(2)).await?;
        assert_eq!(outcome.rewritten, 2);
        assert_eq!(outcome.closing, Money::new(200));
        assert!(verify_ledger(db, TEST_USER).await?.is_empty());
        assert_eq!(fetch(db, first.id).await?.balance, Money::new(500));
        Ok(())
    }

    #[tokio::test]
    async fn test_walk_after_excludes_same_date_block() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        ledger.create(TEST_USER, income(100, day(1))).await?;
        let later = ledger.create(TEST_USER, income(100, day(2))).await?;
        let db = ledger.connection();

        let outcome =
            recompute_from(db, TEST_USER, WalkStart::After(day(1)), Money::new(1_000)).await?;
        assert_eq!(outcome.scanned, 1);
        assert_eq!(fetch(db, later.id).await?.balance, Money::new(1_100));

        let outcome = recompute_from(db, TEST_USER, WalkStart::Beginning, Money::ZERO).await?;
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.rewritten, 1);
        assert_ledger_consistent(db, TEST_USER).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_overflow_is_reported() -> Result<()> {
        let ledger = setup_test_ledger().await?;
        ledger.create(TEST_USER, income(i64::MAX, day(1))).await?;
        let result = ledger.create(TEST_USER, income(1, day(2))).await;
        assert!(matches!(result, Err(Error::BalanceOverflow)));

        // The failed insert was rolled back with its walk
        let rows = ledger_order(TEST_USER).all(ledger.connection()).await?;
        assert_eq!(rows.len(), 1);
        Ok(())
    }
}
