//! Market notifications
//!
//! `Offered` and `Bought` are part of the engine's durable observable
//! contract: they are appended to an in-order log the moment the
//! operation that produced them commits, and never rewritten.

use galleria_types::{AccountId, Amount, CollectionId, ItemId, ListingId};
use serde::{Deserialize, Serialize};
use tracing::info;

/// A committed marketplace event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// An item was listed and taken into custody
    Offered {
        listing_id: ListingId,
        collection: CollectionId,
        item: ItemId,
        price: Amount,
        seller: AccountId,
    },
    /// A listing was purchased
    Bought {
        listing_id: ListingId,
        collection: CollectionId,
        item: ItemId,
        price: Amount,
        seller: AccountId,
        buyer: AccountId,
    },
}

/// Append-only event log
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<MarketEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed event
    pub fn emit(&mut self, event: MarketEvent) {
        match &event {
            MarketEvent::Offered {
                listing_id,
                item,
                price,
                seller,
                ..
            } => info!("Offered: {} item {} at {} by {}", listing_id, item, price, seller),
            MarketEvent::Bought {
                listing_id,
                item,
                price,
                buyer,
                ..
            } => info!("Bought: {} item {} at {} by {}", listing_id, item, price, buyer),
        }
        self.events.push(event);
    }

    /// All events, oldest first
    pub fn all(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Number of events recorded
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
