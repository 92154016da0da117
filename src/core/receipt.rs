//! Receipt business logic.
//!
//! Receipt rows only hold metadata; the images live in a remote object store
//! reached through [`BlobStore`]. Deleting a single receipt requires the remote
//! delete to succeed, while the cascade run by a transaction delete is
//! best-effort on the remote side.

use crate::{
    core::transaction::get_transaction,
    entities::{Receipt, receipt, receipt::ReceiptFileType},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use std::future::Future;
use tracing::{info, warn};

/// Remote storage for receipt binaries.
pub trait BlobStore: Send + Sync {
    /// Removes the object stored under `remote_id`.
    fn destroy(&self, remote_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// A store with nothing to clean up, for deployments that keep no binaries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBlobStore;

impl BlobStore for NoopBlobStore {
    async fn destroy(&self, _remote_id: &str) -> Result<()> {
        Ok(())
    }
}

/// Metadata of an uploaded receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReceipt {
    /// Transaction the receipt documents
    pub transaction_id: i64,
    /// Public URL returned by the object store
    pub image_url: String,
    /// Object store key
    pub remote_id: String,
    /// MIME type
    pub file_type: ReceiptFileType,
}

/// Records a receipt for one of the user's transactions.
pub async fn attach_receipt<C>(db: &C, user_id: &str, new: NewReceipt) -> Result<receipt::Model>
where
    C: ConnectionTrait,
{
    if new.image_url.trim().is_empty() {
        return Err(Error::validation("image_url", "must not be empty"));
    }
    if new.remote_id.trim().is_empty() {
        return Err(Error::validation("remote_id", "must not be empty"));
    }
    get_transaction(db, user_id, new.transaction_id).await?;

    let created = receipt::ActiveModel {
        transaction_id: Set(new.transaction_id),
        user_id: Set(user_id.to_string()),
        image_url: Set(new.image_url),
        remote_id: Set(new.remote_id),
        file_type: Set(new.file_type),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(id = created.id, transaction_id = created.transaction_id, "receipt attached");
    Ok(created)
}

/// The user's receipts for a transaction, newest first.
pub async fn receipts_for_transaction<C>(
    db: &C,
    user_id: &str,
    transaction_id: i64,
) -> Result<Vec<receipt::Model>>
where
    C: ConnectionTrait,
{
    Receipt::find()
        .filter(receipt::Column::TransactionId.eq(transaction_id))
        .filter(receipt::Column::UserId.eq(user_id))
        .order_by_desc(receipt::Column::CreatedAt)
        .order_by_desc(receipt::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes one receipt. The remote object goes first; if that fails the row
/// is kept so the delete can be retried.
pub async fn delete_receipt<C, B>(db: &C, blobs: &B, user_id: &str, id: i64) -> Result<()>
where
    C: ConnectionTrait,
    B: BlobStore,
{
    let existing = Receipt::find_by_id(id)
        .filter(receipt::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(Error::ReceiptNotFound { id })?;

    blobs.destroy(&existing.remote_id).await?;
    existing.delete(db).await?;
    info!(id, "receipt deleted");
    Ok(())
}

/// Removes every receipt row of a transaction and returns them, so the caller
/// can clean up the remote objects once its own work is committed.
pub(crate) async fn detach_receipts_for_transaction<C>(
    db: &C,
    transaction_id: i64,
) -> Result<Vec<receipt::Model>>
where
    C: ConnectionTrait,
{
    let receipts = Receipt::find()
        .filter(receipt::Column::TransactionId.eq(transaction_id))
        .all(db)
        .await?;

    Receipt::delete_many()
        .filter(receipt::Column::TransactionId.eq(transaction_id))
        .exec(db)
        .await?;
    Ok(receipts)
}

/// Destroys the remote objects of already-deleted receipts, logging failures.
pub(crate) async fn destroy_remote_best_effort<B>(blobs: &B, receipts: &[receipt::Model])
where
    B: BlobStore,
{
    for receipt in receipts {
        if let Err(e) = blobs.destroy(&receipt.remote_id).await {
            warn!(
                receipt_id = receipt.id,
                remote_id = %receipt.remote_id,
                "Failed to delete receipt object: {}",
                e
            );
        }
    }
}
