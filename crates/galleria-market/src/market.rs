//! The marketplace engine
//!
//! `Market` coordinates custody and payment atomically around the listing
//! ledger. It executes under a serial, single-writer model: every public
//! operation runs inside one non-reentrant critical section per engine
//! instance, so no caller ever observes a half-applied operation. Where an
//! operation spans multiple ledger legs, a failed leg rolls the earlier
//! legs back before the guard is released.

use std::collections::HashMap;
use std::sync::Arc;

use galleria_registry::ItemRegistry;
use galleria_token::ValueToken;
use galleria_types::{AccountId, Amount, CollectionId, FeeRate, ItemId, ListingId};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{MarketError, Result};
use crate::events::{EventLog, MarketEvent};
use crate::listing::{Listing, ListingBook};

/// State mutated only inside the engine's critical section
#[derive(Default)]
struct MarketState {
    book: ListingBook,
    events: EventLog,
}

/// The marketplace escrow engine
///
/// Fee rate and owner are fixed at construction and immutable afterwards.
/// The engine allocates its own account, which holds custodied items and
/// accrued fees until release or withdrawal.
pub struct Market {
    owner: AccountId,
    fee_rate: FeeRate,
    account: AccountId,
    token: Arc<dyn ValueToken>,
    collections: RwLock<HashMap<CollectionId, Arc<dyn ItemRegistry>>>,
    state: Mutex<MarketState>,
}

impl Market {
    /// Create an engine bound to a value token, with an immutable owner
    /// and fee rate
    pub fn new(token: Arc<dyn ValueToken>, owner: AccountId, fee_rate: FeeRate) -> Self {
        Self {
            owner,
            fee_rate,
            account: AccountId::new(),
            token,
            collections: RwLock::new(HashMap::new()),
            state: Mutex::new(MarketState::default()),
        }
    }

    /// Make a collection's items listable on this market
    pub async fn register_collection(
        &self,
        collection: CollectionId,
        registry: Arc<dyn ItemRegistry>,
    ) {
        self.collections.write().await.insert(collection, registry);
        info!("Registered collection {}", collection);
    }

    /// Offer an item for sale at a fixed price
    ///
    /// The caller must own the item (or hold transfer authority for it)
    /// and must have delegated transfer authority to the engine account so
    /// custody can move. The listing record and the custody pull commit as
    /// one unit.
    pub async fn list_item(
        &self,
        collection: CollectionId,
        item: ItemId,
        price: Amount,
        caller: &AccountId,
    ) -> Result<ListingId> {
        let mut state = self.state.lock().await;

        if price.is_zero() {
            return Err(MarketError::InvalidPrice);
        }
        let registry = self.resolve(collection).await?;

        let item_owner = registry
            .owner_of(item)
            .await
            .map_err(not_authorized)?;
        if item_owner != *caller
            && !registry.is_approved_for_all(&item_owner, caller).await
        {
            return Err(MarketError::NotAuthorized {
                message: format!("{} may not list item {}", caller, item),
            });
        }

        let id = state.book.create(collection, item, price, *caller)?;

        // Custody pull completes the listing; undo the record if it fails
        if let Err(e) = registry
            .transfer_from(&self.account, &item_owner, &self.account, item)
            .await
        {
            state.book.revoke(id);
            warn!("Listing of item {} rolled back: {}", item, e);
            return Err(not_authorized(e));
        }

        state.events.emit(MarketEvent::Offered {
            listing_id: id,
            collection,
            item,
            price,
            seller: *caller,
        });
        Ok(id)
    }

    /// Purchase a listing, atomically exchanging payment for the item
    ///
    /// Pulls `price` from the caller (who must have approved the engine as
    /// spender), pays the seller `price - fee`, retains the fee on the
    /// engine account, marks the listing sold, and releases the item to
    /// the caller. Any failed leg unwinds the earlier legs.
    pub async fn purchase_item(&self, id: ListingId, caller: &AccountId) -> Result<()> {
        let mut state = self.state.lock().await;

        let listing = state.book.get(id)?.clone();
        if listing.sold {
            return Err(MarketError::AlreadySold { listing: id });
        }
        let registry = self.resolve(listing.collection).await?;

        // Sold flips before any value moves; unwound on a failed leg
        state.book.mark_sold(id)?;

        if let Err(source) = self
            .token
            .transfer_from(&self.account, caller, &self.account, listing.price)
            .await
        {
            state.book.mark_unsold(id);
            return Err(MarketError::PaymentFailed { source });
        }

        let fee = self.fee_rate.fee_of(listing.price);
        let payout = self.fee_rate.payout_of(listing.price);

        if !payout.is_zero() {
            if let Err(source) = self
                .token
                .transfer(&self.account, &listing.seller, payout)
                .await
            {
                self.refund(caller, listing.price).await;
                state.book.mark_unsold(id);
                return Err(MarketError::PaymentFailed { source });
            }
        }

        if let Err(e) = registry
            .transfer_from(&self.account, &self.account, caller, listing.item)
            .await
        {
            if !payout.is_zero() {
                let _ = self
                    .token
                    .transfer(&listing.seller, &self.account, payout)
                    .await;
            }
            self.refund(caller, listing.price).await;
            state.book.mark_unsold(id);
            warn!("Purchase of listing {} rolled back: {}", id, e);
            return Err(MarketError::Custody(e));
        }

        info!(
            "Listing {} sold to {} for {} (fee {})",
            id, caller, listing.price, fee
        );
        state.events.emit(MarketEvent::Bought {
            listing_id: id,
            collection: listing.collection,
            item: listing.item,
            price: listing.price,
            seller: listing.seller,
            buyer: *caller,
        });
        Ok(())
    }

    /// Sweep the engine's entire accrued fee balance to the owner
    pub async fn withdraw_fees(&self, caller: &AccountId) -> Result<Amount> {
        let _state = self.state.lock().await;

        if *caller != self.owner {
            return Err(MarketError::NotAuthorized {
                message: format!("{} is not the protocol owner", caller),
            });
        }

        let balance = self.token.balance_of(&self.account).await;
        if balance.is_zero() {
            return Err(MarketError::EmptyBalance);
        }

        self.token
            .transfer(&self.account, caller, balance)
            .await
            .map_err(|source| MarketError::PaymentFailed { source })?;

        info!("Withdrew {} in fees to owner {}", balance, caller);
        Ok(balance)
    }

    /// Look up a listing by id
    pub async fn get_listing(&self, id: ListingId) -> Result<Listing> {
        let state = self.state.lock().await;
        state.book.get(id).map(|l| l.clone())
    }

    /// Total listings ever created
    pub async fn listing_count(&self) -> u64 {
        self.state.lock().await.book.count()
    }

    /// All listings, in id order
    pub async fn listings(&self) -> Vec<Listing> {
        self.state.lock().await.book.all()
    }

    /// All committed events, oldest first
    pub async fn events(&self) -> Vec<MarketEvent> {
        self.state.lock().await.events.all().to_vec()
    }

    /// The immutable protocol fee rate
    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// The immutable protocol owner
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    /// The engine's own custody / fee-sink account
    pub fn market_account(&self) -> AccountId {
        self.account
    }

    /// Fees currently held by the engine and available for withdrawal
    pub async fn fees_accrued(&self) -> Amount {
        self.token.balance_of(&self.account).await
    }

    async fn resolve(&self, collection: CollectionId) -> Result<Arc<dyn ItemRegistry>> {
        self.collections
            .read()
            .await
            .get(&collection)
            .cloned()
            .ok_or(MarketError::UnknownCollection { collection })
    }

    /// Best-effort return of a pulled payment during rollback
    async fn refund(&self, buyer: &AccountId, price: Amount) {
        if let Err(e) = self.token.transfer(&self.account, buyer, price).await {
            warn!("Refund of {} to {} failed: {}", price, buyer, e);
        }
    }
}

fn not_authorized(e: galleria_registry::ItemError) -> MarketError {
    MarketError::NotAuthorized {
        message: e.to_string(),
    }
}
