//! Category entity - Labels users pick for their transactions.
//!
//! Default categories have no owner and are shared by everyone; user categories
//! are private to their owner.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner, None for the built-in defaults
    #[sea_orm(indexed)]
    pub user_id: Option<String>,
    /// Display name
    pub name: String,
    /// Hex color used by clients
    pub color: String,
    /// Built-in categories are read-only
    pub is_default: bool,
    /// When the category was created
    pub created_at: DateTimeUtc,
}

/// Categories are referenced by name from transactions, not by key
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
