//! Unified error types for the ledger.
//!
//! Every fallible operation in the crate returns [`Result`]. Callers that sit
//! behind a request boundary can use [`Error::is_not_found`] and
//! [`Error::is_validation`] to pick the right response class.

use crate::core::money::Money;
use thiserror::Error;

/// All errors the ledger can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The underlying store failed. Mutations that hit this are rolled back.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// The transaction does not exist or belongs to another user.
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// Requested transaction id
        id: i64,
    },

    /// The receipt does not exist or belongs to another user.
    #[error("Receipt {id} not found")]
    ReceiptNotFound {
        /// Requested receipt id
        id: i64,
    },

    /// The category does not exist or belongs to another user.
    #[error("Category {id} not found")]
    CategoryNotFound {
        /// Requested category id
        id: i64,
    },

    /// A required field is missing or malformed.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field
        field: &'static str,
        /// Human-readable reason
        reason: String,
    },

    /// Amounts must be non-negative; the transaction type carries the sign.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Money,
    },

    /// Built-in categories cannot be edited or removed.
    #[error("Default category '{name}' cannot be modified")]
    DefaultCategoryReadOnly {
        /// Name of the default category
        name: String,
    },

    /// The remote receipt store rejected an operation.
    #[error("Blob store error: {message}")]
    BlobStore {
        /// Message reported by the store
        message: String,
    },

    /// A running balance or daily total left the representable range.
    #[error("Balance overflow while summing the ledger")]
    BalanceOverflow,
}

impl Error {
    /// True for errors that map to "not found" at a request boundary.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TransactionNotFound { .. }
                | Self::ReceiptNotFound { .. }
                | Self::CategoryNotFound { .. }
        )
    }

    /// True for errors caused by bad caller input. Nothing was written.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::InvalidAmount { .. }
                | Self::DefaultCategoryReadOnly { .. }
        )
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
