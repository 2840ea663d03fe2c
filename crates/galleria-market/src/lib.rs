//! Galleria Market - The marketplace escrow engine
//!
//! The engine takes custody of an item when it is listed, atomically
//! exchanges it for payment on purchase, splits proceeds into a seller
//! payout and a protocol fee, and lets the protocol owner withdraw
//! accumulated fees.
//!
//! # Invariants
//!
//! 1. Every listing has a positive price
//! 2. While unsold, the listed item is held by the engine, not the seller
//! 3. A listing is sold at most once and never deleted
//! 4. Every operation commits completely or leaves no observable change

pub mod error;
pub mod events;
pub mod listing;
pub mod market;

pub use error::*;
pub use events::*;
pub use listing::*;
pub use market::*;
