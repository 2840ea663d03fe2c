//! Protocol fee rate in basis points
//!
//! The marketplace retains a fixed share of every sale. The rate is set at
//! construction time and immutable afterwards; 100 bps = 1%.

use crate::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Basis points in a whole (100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Error constructing a fee rate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Fee rate {0} exceeds 10000 basis points")]
pub struct InvalidFeeRate(pub u16);

/// Protocol fee rate, expressed in basis points (0..=10000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRate(u16);

impl FeeRate {
    /// Create a fee rate, rejecting anything above 100%
    pub fn new(bps: u16) -> Result<Self, InvalidFeeRate> {
        if bps as u128 > BPS_DENOMINATOR {
            return Err(InvalidFeeRate(bps));
        }
        Ok(Self(bps))
    }

    /// A zero fee rate
    pub fn zero() -> Self {
        Self(0)
    }

    /// The rate in basis points
    pub fn bps(&self) -> u16 {
        self.0
    }

    /// Fee owed on a price: `price * bps / 10000`, integer division.
    ///
    /// The result is always <= price; the rounding remainder stays with
    /// the payout side, never shorting the seller.
    pub fn fee_of(&self, price: Amount) -> Amount {
        // Split form of price * bps / 10000: exact, and cannot overflow
        // even for prices near u128::MAX
        let quotient = price.value() / BPS_DENOMINATOR * self.0 as u128;
        let remainder = price.value() % BPS_DENOMINATOR * self.0 as u128 / BPS_DENOMINATOR;
        Amount::new(quotient + remainder)
    }

    /// Seller payout on a price: `price - fee_of(price)`
    pub fn payout_of(&self, price: Amount) -> Amount {
        price.saturating_sub(self.fee_of(price))
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_rates_above_hundred_percent() {
        assert!(FeeRate::new(10_000).is_ok());
        assert!(FeeRate::new(10_001).is_err());
    }

    #[test]
    fn ten_percent_of_hundred() {
        let rate = FeeRate::new(1_000).unwrap();
        assert_eq!(rate.fee_of(Amount::new(100)), Amount::new(10));
        assert_eq!(rate.payout_of(Amount::new(100)), Amount::new(90));
    }

    #[test]
    fn fee_rounds_down_and_never_shorts_the_seller() {
        // 2.5% of 101 = 2.525 -> fee 2, payout 99
        let rate = FeeRate::new(250).unwrap();
        assert_eq!(rate.fee_of(Amount::new(101)), Amount::new(2));
        assert_eq!(rate.payout_of(Amount::new(101)), Amount::new(99));
    }

    #[test]
    fn fee_never_exceeds_price() {
        let rate = FeeRate::new(10_000).unwrap();
        let price = Amount::new(7);
        assert_eq!(rate.fee_of(price), price);
        assert!(rate.payout_of(price).is_zero());
    }

    #[test]
    fn fee_on_large_prices_does_not_overflow() {
        let rate = FeeRate::new(1_000).unwrap();
        let price = Amount::new(u128::MAX);
        let fee = rate.fee_of(price);
        assert!(fee <= price);
        assert_eq!(fee.checked_add(rate.payout_of(price)).unwrap(), price);
    }
}
