//! Error types for the marketplace engine
//!
//! Every precondition failure aborts the whole operation before any
//! mutation; nothing is retried internally.

use galleria_registry::ItemError;
use galleria_token::TokenError;
use galleria_types::{CollectionId, ListingId};
use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Marketplace engine error taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    /// Listing attempted with a zero price
    #[error("Price must be greater than 0")]
    InvalidPrice,

    /// Unknown listing id
    #[error("Listing {listing} not found")]
    NotFound { listing: ListingId },

    /// Purchase of a completed listing
    #[error("Listing {listing} is already sold")]
    AlreadySold { listing: ListingId },

    /// Collection never registered with this engine
    #[error("Collection {collection} is not registered")]
    UnknownCollection { collection: CollectionId },

    /// Caller lacks ownership or delegation for the operation
    #[error("Not authorized: {message}")]
    NotAuthorized { message: String },

    /// Token pull failed (insufficient balance or allowance)
    #[error("Payment failed: {source}")]
    PaymentFailed {
        #[source]
        source: TokenError,
    },

    /// Fee withdrawal with nothing to withdraw
    #[error("Fee balance is zero")]
    EmptyBalance,

    /// Custody movement the engine expected to succeed failed
    #[error("Custody transfer failed: {0}")]
    Custody(#[from] ItemError),
}
