//! Daily summary: where a user's day opened, what moved, where it closed.

use crate::{
    core::{balance, money::Money},
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;

/// Totals for one UTC calendar day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DailySummary {
    /// The day summarized
    pub date: NaiveDate,
    /// Balance before the first transaction of the day
    pub opening_balance: Money,
    /// Sum of credit transactions
    pub total_income: Money,
    /// Sum of debit transactions
    pub total_expense: Money,
    /// `opening_balance + (total_income - total_expense)`
    pub closing_balance: Money,
    /// Transactions posted that day
    pub transaction_count: usize,
}

/// Summarizes `day` for `user_id`.
pub async fn daily_summary<C>(db: &C, user_id: &str, day: NaiveDate) -> Result<DailySummary>
where
    C: ConnectionTrait,
{
    let next_day = day
        .succ_opt()
        .ok_or_else(|| Error::validation("date", format!("{day} is the last representable day")))?;
    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = next_day.and_time(NaiveTime::MIN).and_utc();

    let opening_balance = balance::balance_before(db, user_id, start).await?;
    let rows = Transaction::find()
        .filter(transaction::Column::UserId.eq(user_id))
        .filter(transaction::Column::Date.gte(start))
        .filter(transaction::Column::Date.lt(end))
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;

    let mut total_income = Money::ZERO;
    let mut total_expense = Money::ZERO;
    for row in &rows {
        let total = if row.kind.is_credit() {
            &mut total_income
        } else {
            &mut total_expense
        };
        *total = total
            .checked_add(row.amount)
            .ok_or(Error::BalanceOverflow)?;
    }

    let closing_balance = total_income
        .checked_sub(total_expense)
        .and_then(|net| opening_balance.checked_add(net))
        .ok_or(Error::BalanceOverflow)?;

    Ok(DailySummary {
        date: day,
        opening_balance,
        total_income,
        total_expense,
        closing_balance,
        transaction_count: rows.len(),
    })
}
