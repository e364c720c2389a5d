//! # tally-core: Cart Pricing and Tax Accumulation
//!
//! This crate holds a shopper's line items, keeps the running total and the
//! per-tax-class ledger consistent under every mutation, and rebuilds a cart
//! from a persisted record by replaying additions.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tally Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Session / storage layer (tally-db)                 │   │
//! │  │     load record ──► mutate cart ──► persist record              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │    tax    │  │   cart    │  │   codec   │  │   │
//! │  │   │ Snapshot  │  │ TaxLedger │  │   Cart    │  │ Persisted │  │   │
//! │  │   │ LineItem  │  │ TaxLookup │  │ CartTotals│  │   Cart    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                 ▲                              ▲                        │
//! │        CatalogResolver (trait)          TaxLookup (trait)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic
//! - [`types`] - Product snapshots, line items, identities, tax mode
//! - [`tax`] - Tax ledger and the tax lookup collaborator
//! - [`catalog`] - Catalog resolver collaborator
//! - [`cart`] - The cart aggregate
//! - [`codec`] - Persisted cart records (encode / decode)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_core::{Cart, CartId, Money, ProductId, ProductSnapshot, RateTable, TaxMode};
//!
//! let taxes = Arc::new(RateTable::new(TaxMode::Exclusive));
//! let mut cart = Cart::new(CartId::generate(), taxes, TaxMode::Exclusive);
//!
//! let coffee = ProductSnapshot::purchasable(ProductId::new(7), "Coffee", Money::from_cents(1000));
//! cart.add_item(&coffee, 2).unwrap();
//!
//! assert_eq!(cart.total(), Money::from_cents(2000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartTotals};
pub use catalog::{CatalogResolver, InMemoryCatalog};
pub use codec::{PersistedCart, PersistedItem, Restored, SkippedItem, SCHEMA_VERSION};
pub use error::{CartError, CartResult, ValidationError};
pub use money::Money;
pub use tax::{RateTable, TaxLedger, TaxLookup};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a cart identity.
pub const MAX_CART_ID_LEN: usize = 128;
