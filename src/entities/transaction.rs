//! Transaction entity - One ledger line owned by a single user.
//!
//! Each transaction has a `kind` (stored in the `type` column), a posting `date`,
//! a non-negative `amount` and the cached running `balance` of its owner after
//! this line. `date` plus `id` form the canonical ledger order.
use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What a transaction records. Only the effect class matters for balances.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Day-to-day spending
    #[sea_orm(string_value = "expense")]
    Expense,
    /// Stock or asset purchase
    #[sea_orm(string_value = "purchase")]
    Purchase,
    /// Money received
    #[sea_orm(string_value = "income")]
    Income,
    /// Credit extended to someone else
    #[sea_orm(string_value = "credit_given")]
    CreditGiven,
    /// Credit received from someone else
    #[sea_orm(string_value = "credit_received")]
    CreditReceived,
}

impl TransactionType {
    /// Credit kinds add to the balance, every other kind subtracts.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Income | Self::CreditReceived)
    }
}

/// How the money moved.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    /// Physical cash
    #[sea_orm(string_value = "cash")]
    Cash,
    /// UPI transfer
    #[sea_orm(string_value = "upi")]
    Upi,
    /// Bank transfer
    #[sea_orm(string_value = "bank")]
    Bank,
    /// Debit or credit card
    #[sea_orm(string_value = "card")]
    Card,
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier; assigned in creation order and used as the date tie-break
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user; the only tenant boundary
    #[sea_orm(indexed)]
    pub user_id: String,
    /// Kind of transaction
    #[sea_orm(column_name = "type")]
    pub kind: TransactionType,
    /// Posting date, the ordering key for balances
    #[sea_orm(indexed)]
    pub date: DateTimeUtc,
    /// Non-negative amount in minor units
    pub amount: Money,
    /// Category name
    pub category: String,
    /// Payment mode
    pub payment_mode: PaymentMode,
    /// Optional counterparty
    pub vendor: Option<String>,
    /// Optional free-form notes
    pub notes: Option<String>,
    /// Running balance of the owner immediately after this transaction
    pub balance: Money,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last changed by a caller (balance rewrites don't count)
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// The amount with the sign of its effect class applied.
    #[must_use]
    pub fn signed_amount(&self) -> Money {
        crate::core::balance::signed_amount(self.kind, self.amount)
    }
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One transaction has many receipts
    #[sea_orm(has_many = "super::receipt::Entity")]
    Receipts,
}

impl Related<super::receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
