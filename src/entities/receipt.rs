//! Receipt entity - Metadata for a receipt image kept in a remote object store.
//!
//! The binary itself lives outside the database; `remote_id` is the key used to
//! remove it again.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Accepted receipt file types.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ReceiptFileType {
    /// `image/jpeg`
    #[sea_orm(string_value = "image/jpeg")]
    #[serde(rename = "image/jpeg")]
    Jpeg,
    /// `image/png`
    #[sea_orm(string_value = "image/png")]
    #[serde(rename = "image/png")]
    Png,
    /// `image/jpg`, sent by some clients instead of `image/jpeg`
    #[sea_orm(string_value = "image/jpg")]
    #[serde(rename = "image/jpg")]
    Jpg,
    /// `application/pdf`
    #[sea_orm(string_value = "application/pdf")]
    #[serde(rename = "application/pdf")]
    Pdf,
}

impl TryFrom<&str> for ReceiptFileType {
    type Error = crate::errors::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/jpg" => Ok(Self::Jpg),
            "application/pdf" => Ok(Self::Pdf),
            other => Err(crate::errors::Error::validation(
                "file_type",
                format!("unsupported file type '{other}'"),
            )),
        }
    }
}

/// Receipt database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    /// Unique identifier for the receipt
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Transaction this receipt documents
    #[sea_orm(indexed)]
    pub transaction_id: i64,
    /// Owning user
    pub user_id: String,
    /// Public URL of the stored image
    pub image_url: String,
    /// Object store key used for cleanup
    pub remote_id: String,
    /// MIME type of the upload
    pub file_type: ReceiptFileType,
    /// When the receipt was attached
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Receipt and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each receipt belongs to one transaction
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionId",
        to = "super::transaction::Column::Id"
    )]
    Transaction,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
