//! Listing ledger - the authoritative record of every item ever offered
//!
//! Listings are append-only: ids are dense, sequential from 1, never
//! reused, and a listing is never deleted. The `sold` flag flips false to
//! true exactly once. The ledger is owned and mutated exclusively by the
//! engine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use galleria_types::{AccountId, Amount, CollectionId, ItemId, ListingId};
use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};

/// A fixed-price offer of one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub collection: CollectionId,
    pub item: ItemId,
    pub price: Amount,
    pub seller: AccountId,
    pub sold: bool,
    pub listed_at: DateTime<Utc>,
}

/// Append-only indexed store of listings with a next-id counter
#[derive(Debug, Default)]
pub struct ListingBook {
    listings: HashMap<ListingId, Listing>,
    next_id: u64,
}

impl ListingBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sequential id and store a new unsold listing
    pub fn create(
        &mut self,
        collection: CollectionId,
        item: ItemId,
        price: Amount,
        seller: AccountId,
    ) -> Result<ListingId> {
        if price.is_zero() {
            return Err(MarketError::InvalidPrice);
        }

        self.next_id += 1;
        let id = ListingId(self.next_id);
        self.listings.insert(
            id,
            Listing {
                id,
                collection,
                item,
                price,
                seller,
                sold: false,
                listed_at: Utc::now(),
            },
        );
        Ok(id)
    }

    /// Look up a listing by id
    pub fn get(&self, id: ListingId) -> Result<&Listing> {
        self.listings
            .get(&id)
            .ok_or(MarketError::NotFound { listing: id })
    }

    /// Flip a listing's sold flag, exactly once
    pub fn mark_sold(&mut self, id: ListingId) -> Result<()> {
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketError::NotFound { listing: id })?;
        if listing.sold {
            return Err(MarketError::AlreadySold { listing: id });
        }
        listing.sold = true;
        Ok(())
    }

    /// Total listings ever created
    pub fn count(&self) -> u64 {
        self.next_id
    }

    /// All listings, in id order
    pub fn all(&self) -> Vec<Listing> {
        let mut listings: Vec<Listing> = self.listings.values().cloned().collect();
        listings.sort_by_key(|l| l.id);
        listings
    }

    /// Undo the most recent `create` before it was ever observable.
    ///
    /// Used only while the engine still holds its operation guard, when
    /// the custody pull that completes a listing fails. The id counter is
    /// stepped back so ids stay dense.
    pub(crate) fn revoke(&mut self, id: ListingId) {
        debug_assert_eq!(id.value(), self.next_id);
        if let Some(listing) = self.listings.remove(&id) {
            debug_assert!(!listing.sold);
            self.next_id -= 1;
        }
    }

    /// Undo a `mark_sold` of a purchase whose later legs failed.
    ///
    /// Only callable while the engine holds its operation guard.
    pub(crate) fn mark_unsold(&mut self, id: ListingId) {
        if let Some(listing) = self.listings.get_mut(&id) {
            listing.sold = false;
        }
    }
}
