//! Galleria Token - Fungible value-token ledger
//!
//! The value token prices and pays for every marketplace sale. The ledger
//! is:
//! - Account-keyed by AccountId
//! - Allowance-based (a spender may move funds only up to a prior grant)
//! - Atomic (a failed precondition mutates nothing)
//!
//! # Invariants
//!
//! 1. No negative balances
//! 2. Zero-amount moves are rejected
//! 3. `transfer_from` always decrements the allowance it consumed

use std::collections::HashMap;
use std::sync::Arc;

use galleria_types::{AccountId, Amount};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Errors that can occur in token operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Amount, required: Amount },

    #[error("Insufficient allowance: granted {granted}, need {required}")]
    InsufficientAllowance { granted: Amount, required: Amount },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },
}

pub type Result<T> = std::result::Result<T, TokenError>;

/// The narrow seam the marketplace engine consumes
///
/// Mirrors the standard fungible-token surface: balances, direct transfer,
/// and delegated transfer against a prior `approve` by the funds' owner.
#[async_trait::async_trait]
pub trait ValueToken: Send + Sync {
    /// Current balance of an account
    async fn balance_of(&self, account: &AccountId) -> Amount;

    /// Move funds the caller owns
    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()>;

    /// Grant (replace) an allowance for a spender
    async fn approve(&self, owner: &AccountId, spender: &AccountId, amount: Amount);

    /// Remaining allowance from owner to spender
    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount;

    /// Move funds on behalf of `from`, consuming the spender's allowance
    async fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()>;
}

/// Serializable snapshot of one account's token state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenAccount {
    pub balance: Amount,
    pub allowances: HashMap<AccountId, Amount>,
}

/// In-memory value-token ledger
///
/// Thread-safe; all mutations for one operation happen under a single
/// write lock so a failed precondition leaves no partial state.
#[derive(Clone, Default)]
pub struct TokenLedger {
    accounts: Arc<RwLock<HashMap<AccountId, TokenAccount>>>,
    minted: Arc<RwLock<Amount>>,
}

impl TokenLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue new tokens to an account
    pub async fn mint(&self, to: &AccountId, amount: Amount) -> Result<()> {
        reject_zero(amount)?;

        let mut accounts = self.accounts.write().await;
        let mut minted = self.minted.write().await;

        let account = accounts.entry(*to).or_default();
        account.balance = account
            .balance
            .checked_add(amount)
            .map_err(|_| TokenError::InvalidAmount {
                message: "balance overflow".to_string(),
            })?;
        *minted = minted
            .checked_add(amount)
            .map_err(|_| TokenError::InvalidAmount {
                message: "supply overflow".to_string(),
            })?;

        info!("Minted {} to {}", amount, to);
        Ok(())
    }

    /// Total tokens ever minted
    pub async fn total_supply(&self) -> Amount {
        *self.minted.read().await
    }

    /// Debit `from` and credit `to` under one write lock
    async fn move_funds(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        Self::move_funds_locked(&mut accounts, from, to, amount)
    }

    fn move_funds_locked(
        accounts: &mut HashMap<AccountId, TokenAccount>,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        let available = accounts.get(from).map(|a| a.balance).unwrap_or_default();
        let remaining =
            available
                .checked_sub(amount)
                .map_err(|_| TokenError::InsufficientBalance {
                    available,
                    required: amount,
                })?;

        accounts.entry(*from).or_default().balance = remaining;
        let to_account = accounts.entry(*to).or_default();
        to_account.balance =
            to_account
                .balance
                .checked_add(amount)
                .map_err(|_| TokenError::InvalidAmount {
                    message: "balance overflow".to_string(),
                })?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ValueToken for TokenLedger {
    async fn balance_of(&self, account: &AccountId) -> Amount {
        let accounts = self.accounts.read().await;
        accounts.get(account).map(|a| a.balance).unwrap_or_default()
    }

    async fn transfer(&self, from: &AccountId, to: &AccountId, amount: Amount) -> Result<()> {
        reject_zero(amount)?;
        self.move_funds(from, to, amount).await?;
        info!("Transferred {} from {} to {}", amount, from, to);
        Ok(())
    }

    async fn approve(&self, owner: &AccountId, spender: &AccountId, amount: Amount) {
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(*owner)
            .or_default()
            .allowances
            .insert(*spender, amount);
    }

    async fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        let accounts = self.accounts.read().await;
        accounts
            .get(owner)
            .and_then(|a| a.allowances.get(spender))
            .copied()
            .unwrap_or_default()
    }

    async fn transfer_from(
        &self,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        reject_zero(amount)?;

        let mut accounts = self.accounts.write().await;

        let granted = accounts
            .get(from)
            .and_then(|a| a.allowances.get(spender))
            .copied()
            .unwrap_or_default();
        let remaining_grant =
            granted
                .checked_sub(amount)
                .map_err(|_| TokenError::InsufficientAllowance {
                    granted,
                    required: amount,
                })?;

        // Balance check happens before the allowance is consumed
        Self::move_funds_locked(&mut accounts, from, to, amount)?;

        accounts
            .entry(*from)
            .or_default()
            .allowances
            .insert(*spender, remaining_grant);

        info!(
            "Transferred {} from {} to {} (spender {})",
            amount, from, to, spender
        );
        Ok(())
    }
}

fn reject_zero(amount: Amount) -> Result<()> {
    if amount.is_zero() {
        return Err(TokenError::InvalidAmount {
            message: "Amount must be greater than zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mint_and_balance() {
        let ledger = TokenLedger::new();
        let account = AccountId::new();

        assert_eq!(ledger.balance_of(&account).await, Amount::zero());

        ledger.mint(&account, Amount::new(1000)).await.unwrap();
        assert_eq!(ledger.balance_of(&account).await, Amount::new(1000));
        assert_eq!(ledger.total_supply().await, Amount::new(1000));
    }

    #[tokio::test]
    async fn transfer_moves_funds() {
        let ledger = TokenLedger::new();
        let from = AccountId::new();
        let to = AccountId::new();

        ledger.mint(&from, Amount::new(1000)).await.unwrap();
        ledger.transfer(&from, &to, Amount::new(400)).await.unwrap();

        assert_eq!(ledger.balance_of(&from).await, Amount::new(600));
        assert_eq!(ledger.balance_of(&to).await, Amount::new(400));
    }

    #[tokio::test]
    async fn no_negative_balance() {
        let ledger = TokenLedger::new();
        let from = AccountId::new();
        let to = AccountId::new();

        ledger.mint(&from, Amount::new(100)).await.unwrap();
        let result = ledger.transfer(&from, &to, Amount::new(200)).await;

        assert!(matches!(
            result,
            Err(TokenError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of(&from).await, Amount::new(100));
        assert_eq!(ledger.balance_of(&to).await, Amount::zero());
    }

    #[tokio::test]
    async fn zero_transfer_is_rejected() {
        let ledger = TokenLedger::new();
        let from = AccountId::new();
        let to = AccountId::new();

        let result = ledger.transfer(&from, &to, Amount::zero()).await;
        assert!(matches!(result, Err(TokenError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn transfer_from_requires_allowance() {
        let ledger = TokenLedger::new();
        let owner = AccountId::new();
        let spender = AccountId::new();
        let dest = AccountId::new();

        ledger.mint(&owner, Amount::new(1000)).await.unwrap();

        let result = ledger
            .transfer_from(&spender, &owner, &dest, Amount::new(100))
            .await;
        assert!(matches!(
            result,
            Err(TokenError::InsufficientAllowance { .. })
        ));

        ledger.approve(&owner, &spender, Amount::new(100)).await;
        ledger
            .transfer_from(&spender, &owner, &dest, Amount::new(100))
            .await
            .unwrap();

        assert_eq!(ledger.balance_of(&dest).await, Amount::new(100));
        assert_eq!(ledger.allowance(&owner, &spender).await, Amount::zero());
    }

    #[tokio::test]
    async fn failed_transfer_from_keeps_allowance() {
        let ledger = TokenLedger::new();
        let owner = AccountId::new();
        let spender = AccountId::new();
        let dest = AccountId::new();

        // Allowance exceeds the actual balance
        ledger.mint(&owner, Amount::new(50)).await.unwrap();
        ledger.approve(&owner, &spender, Amount::new(100)).await;

        let result = ledger
            .transfer_from(&spender, &owner, &dest, Amount::new(100))
            .await;
        assert!(matches!(
            result,
            Err(TokenError::InsufficientBalance { .. })
        ));

        // Neither balance nor allowance moved
        assert_eq!(ledger.balance_of(&owner).await, Amount::new(50));
        assert_eq!(ledger.allowance(&owner, &spender).await, Amount::new(100));
    }

    #[tokio::test]
    async fn approve_replaces_previous_grant() {
        let ledger = TokenLedger::new();
        let owner = AccountId::new();
        let spender = AccountId::new();

        ledger.approve(&owner, &spender, Amount::new(500)).await;
        ledger.approve(&owner, &spender, Amount::new(200)).await;

        assert_eq!(ledger.allowance(&owner, &spender).await, Amount::new(200));
    }
}
