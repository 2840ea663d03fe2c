//! Galleria Types - Canonical domain types for the marketplace
//!
//! This crate contains the foundational types with zero dependencies on
//! other galleria crates:
//!
//! - Identity types (AccountId, CollectionId, ItemId, ListingId)
//! - Amount type for value-token quantities
//! - FeeRate in basis points
//!
//! # Architectural Invariants
//!
//! 1. Amounts never wrap silently — all arithmetic is checked
//! 2. Listing and item ids are dense, sequential, and never reused
//! 3. A fee rate is always within 0..=10_000 basis points

pub mod amount;
pub mod fee;
pub mod identity;

pub use amount::*;
pub use fee::*;
pub use identity::*;
