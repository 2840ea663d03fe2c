//! Galleria Registry - Non-fungible item ownership ledger
//!
//! Each `ItemCollection` tracks a set of uniquely identified items, each
//! owned by exactly one account. Owners may delegate transfer authority to
//! an operator (the marketplace engine) with `set_approval_for_all`; the
//! engine then moves custody on their behalf.
//!
//! # Invariants
//!
//! 1. Every minted item has exactly one owner at all times
//! 2. Item ids are sequential from 1 and never reused
//! 3. Only the current owner or an approved operator can move an item

use std::collections::HashMap;
use std::sync::Arc;

use galleria_types::{AccountId, ItemId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Errors that can occur in registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("Unknown item: {item}")]
    UnknownItem { item: ItemId },

    #[error("Account {claimed} does not own item {item}")]
    WrongOwner { item: ItemId, claimed: AccountId },

    #[error("Operator {operator} is not authorized to move item {item}")]
    NotAuthorized { item: ItemId, operator: AccountId },
}

pub type Result<T> = std::result::Result<T, ItemError>;

/// The narrow seam the marketplace engine consumes
#[async_trait::async_trait]
pub trait ItemRegistry: Send + Sync {
    /// Current owner of an item
    async fn owner_of(&self, item: ItemId) -> Result<AccountId>;

    /// Move an item from its owner to another account
    ///
    /// `operator` must be the owner itself or an operator the owner has
    /// approved; `from` must be the current owner.
    async fn transfer_from(
        &self,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        item: ItemId,
    ) -> Result<()>;

    /// Grant or revoke blanket transfer authority for an operator
    async fn set_approval_for_all(&self, owner: &AccountId, operator: &AccountId, approved: bool);

    /// Whether an operator may move the owner's items
    async fn is_approved_for_all(&self, owner: &AccountId, operator: &AccountId) -> bool;
}

/// One minted item: its owner and its metadata URI
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    owner: AccountId,
    uri: String,
}

/// In-memory item collection
///
/// Thread-safe; ownership and delegation tables live behind one lock so
/// an authority check and the move it guards are a single atomic step.
#[derive(Clone, Default)]
pub struct ItemCollection {
    inner: Arc<RwLock<CollectionState>>,
}

#[derive(Default)]
struct CollectionState {
    items: HashMap<ItemId, ItemRecord>,
    next_id: u64,
    // (owner, operator) -> approved
    operators: HashMap<(AccountId, AccountId), bool>,
}

impl ItemCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new item to an owner, returning its sequential id
    pub async fn mint(&self, owner: &AccountId, uri: impl Into<String>) -> ItemId {
        let mut state = self.inner.write().await;
        state.next_id += 1;
        let item = ItemId(state.next_id);
        state.items.insert(
            item,
            ItemRecord {
                owner: *owner,
                uri: uri.into(),
            },
        );
        info!("Minted item {} to {}", item, owner);
        item
    }

    /// Metadata URI of an item
    pub async fn token_uri(&self, item: ItemId) -> Result<String> {
        let state = self.inner.read().await;
        state
            .items
            .get(&item)
            .map(|r| r.uri.clone())
            .ok_or(ItemError::UnknownItem { item })
    }

    /// Total items ever minted
    pub async fn item_count(&self) -> u64 {
        self.inner.read().await.next_id
    }

    /// Number of items currently owned by an account
    pub async fn balance_of(&self, owner: &AccountId) -> u64 {
        let state = self.inner.read().await;
        state.items.values().filter(|r| r.owner == *owner).count() as u64
    }
}

#[async_trait::async_trait]
impl ItemRegistry for ItemCollection {
    async fn owner_of(&self, item: ItemId) -> Result<AccountId> {
        let state = self.inner.read().await;
        state
            .items
            .get(&item)
            .map(|r| r.owner)
            .ok_or(ItemError::UnknownItem { item })
    }

    async fn transfer_from(
        &self,
        operator: &AccountId,
        from: &AccountId,
        to: &AccountId,
        item: ItemId,
    ) -> Result<()> {
        let mut state = self.inner.write().await;

        let owner = state
            .items
            .get(&item)
            .map(|r| r.owner)
            .ok_or(ItemError::UnknownItem { item })?;
        if owner != *from {
            return Err(ItemError::WrongOwner {
                item,
                claimed: *from,
            });
        }

        let operator_approved = operator == from
            || state
                .operators
                .get(&(owner, *operator))
                .copied()
                .unwrap_or(false);
        if !operator_approved {
            return Err(ItemError::NotAuthorized {
                item,
                operator: *operator,
            });
        }

        if let Some(record) = state.items.get_mut(&item) {
            record.owner = *to;
        }
        info!("Item {} moved from {} to {}", item, from, to);
        Ok(())
    }

    async fn set_approval_for_all(&self, owner: &AccountId, operator: &AccountId, approved: bool) {
        let mut state = self.inner.write().await;
        state.operators.insert((*owner, *operator), approved);
    }

    async fn is_approved_for_all(&self, owner: &AccountId, operator: &AccountId) -> bool {
        let state = self.inner.read().await;
        state
            .operators
            .get(&(*owner, *operator))
            .copied()
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mint_assigns_sequential_ids() {
        let collection = ItemCollection::new();
        let owner = AccountId::new();

        let first = collection.mint(&owner, "ipfs://a").await;
        let second = collection.mint(&owner, "ipfs://b").await;

        assert_eq!(first, ItemId(1));
        assert_eq!(second, ItemId(2));
        assert_eq!(collection.item_count().await, 2);
        assert_eq!(collection.balance_of(&owner).await, 2);
        assert_eq!(collection.token_uri(first).await.unwrap(), "ipfs://a");
    }

    #[tokio::test]
    async fn owner_can_transfer_own_item() {
        let collection = ItemCollection::new();
        let owner = AccountId::new();
        let recipient = AccountId::new();

        let item = collection.mint(&owner, "ipfs://x").await;
        collection
            .transfer_from(&owner, &owner, &recipient, item)
            .await
            .unwrap();

        assert_eq!(collection.owner_of(item).await.unwrap(), recipient);
    }

    #[tokio::test]
    async fn unapproved_operator_is_rejected() {
        let collection = ItemCollection::new();
        let owner = AccountId::new();
        let operator = AccountId::new();
        let recipient = AccountId::new();

        let item = collection.mint(&owner, "ipfs://x").await;
        let result = collection
            .transfer_from(&operator, &owner, &recipient, item)
            .await;

        assert!(matches!(result, Err(ItemError::NotAuthorized { .. })));
        assert_eq!(collection.owner_of(item).await.unwrap(), owner);
    }

    #[tokio::test]
    async fn approved_operator_can_move_items() {
        let collection = ItemCollection::new();
        let owner = AccountId::new();
        let operator = AccountId::new();
        let recipient = AccountId::new();

        let item = collection.mint(&owner, "ipfs://x").await;
        collection
            .set_approval_for_all(&owner, &operator, true)
            .await;
        assert!(collection.is_approved_for_all(&owner, &operator).await);

        collection
            .transfer_from(&operator, &owner, &recipient, item)
            .await
            .unwrap();
        assert_eq!(collection.owner_of(item).await.unwrap(), recipient);
    }

    #[tokio::test]
    async fn approval_can_be_revoked() {
        let collection = ItemCollection::new();
        let owner = AccountId::new();
        let operator = AccountId::new();
        let recipient = AccountId::new();

        let item = collection.mint(&owner, "ipfs://x").await;
        collection
            .set_approval_for_all(&owner, &operator, true)
            .await;
        collection
            .set_approval_for_all(&owner, &operator, false)
            .await;

        let result = collection
            .transfer_from(&operator, &owner, &recipient, item)
            .await;
        assert!(matches!(result, Err(ItemError::NotAuthorized { .. })));
    }

    #[tokio::test]
    async fn transfer_from_wrong_owner_fails() {
        let collection = ItemCollection::new();
        let owner = AccountId::new();
        let impostor = AccountId::new();
        let recipient = AccountId::new();

        let item = collection.mint(&owner, "ipfs://x").await;
        let result = collection
            .transfer_from(&impostor, &impostor, &recipient, item)
            .await;

        assert!(matches!(result, Err(ItemError::WrongOwner { .. })));
    }

    #[tokio::test]
    async fn unknown_item_fails() {
        let collection = ItemCollection::new();
        let result = collection.owner_of(ItemId(42)).await;
        assert!(matches!(result, Err(ItemError::UnknownItem { .. })));
    }
}
