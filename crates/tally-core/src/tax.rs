//! # Tax Module
//!
//! The per-class tax ledger owned by a cart, and the tax lookup collaborator
//! the cart consults when a line is first created.
//!
//! ## When Tax Is Accrued
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(product) for a product NOT yet in the cart                    │
//! │       │                                                                 │
//! │       ├── for class in lookup.classes_of(product):                      │
//! │       │       ledger[class] += lookup.amount_for(product, class)        │
//! │       │                                                                 │
//! │       └── line.tax_at_add = lookup.unit_tax(product)                    │
//! │                                                                         │
//! │  add_item(product) again / update_quantity / remove_item                │
//! │       └── ledger untouched                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ProductSnapshot, TaxClassId, TaxMode, TaxRate};
use crate::validation;

// =============================================================================
// Tax Ledger
// =============================================================================

/// Accumulated tax per class for the current cart contents.
///
/// A class only gets an entry once some line contributed to it. The ledger
/// is a side accumulator; the cart total is never derived from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxLedger {
    entries: BTreeMap<TaxClassId, Money>,
}

impl TaxLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the entry for `class`, creating it at zero first.
    pub fn accrue(&mut self, class: TaxClassId, amount: Money) {
        *self.entries.entry(class).or_default() += amount;
    }

    /// Accumulated amount for a class, if the class has been seen.
    pub fn get(&self, class: &TaxClassId) -> Option<Money> {
        self.entries.get(class).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaxClassId, Money)> {
        self.entries.iter().map(|(class, amount)| (class, *amount))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all classes.
    pub fn total(&self) -> Money {
        self.entries.values().sum()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// Tax Lookup Collaborator
// =============================================================================

/// Tax rules consumed by the cart.
///
/// Implementations are injected into [`Cart`](crate::cart::Cart) and must be
/// deterministic for a given snapshot: a restored cart replays every line
/// through this trait and expects the same answers it got the first time.
pub trait TaxLookup: Send + Sync {
    /// Classes the product is taxed under.
    fn classes_of(&self, product: &ProductSnapshot) -> BTreeSet<TaxClassId> {
        product.tax_classes.clone()
    }

    /// Per-unit tax for one class.
    fn amount_for(&self, product: &ProductSnapshot, class: &TaxClassId) -> Money;

    /// Aggregate per-unit tax across all classes of the product.
    fn unit_tax(&self, product: &ProductSnapshot) -> Money {
        self.classes_of(product)
            .iter()
            .map(|class| self.amount_for(product, class))
            .sum()
    }
}

// =============================================================================
// Rate Table
// =============================================================================

/// A [`TaxLookup`] backed by a fixed rate per class.
///
/// The basis decides whether catalog prices are read as net (tax is charged
/// on top) or gross (tax is extracted from the price). Classes without a
/// configured rate contribute nothing.
///
/// ## Example
/// ```rust
/// use tally_core::{Money, ProductId, ProductSnapshot, RateTable, TaxLookup, TaxMode, TaxRate};
///
/// let table = RateTable::new(TaxMode::Exclusive)
///     .with_rate("standard", TaxRate::from_bps(2000))
///     .unwrap();
///
/// let lamp = ProductSnapshot::purchasable(ProductId::new(1), "Lamp", Money::from_cents(5000))
///     .with_tax_class("standard");
///
/// assert_eq!(table.unit_tax(&lamp), Money::from_cents(1000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    basis: TaxMode,
    rates: BTreeMap<TaxClassId, TaxRate>,
}

impl RateTable {
    /// Creates an empty table reading prices on the given basis.
    pub fn new(basis: TaxMode) -> Self {
        RateTable {
            basis,
            rates: BTreeMap::new(),
        }
    }

    /// Adds or replaces the rate of a class.
    pub fn with_rate(
        mut self,
        class: impl Into<TaxClassId>,
        rate: TaxRate,
    ) -> Result<Self, ValidationError> {
        self.set_rate(class, rate)?;
        Ok(self)
    }

    /// Adds or replaces the rate of a class in place.
    pub fn set_rate(
        &mut self,
        class: impl Into<TaxClassId>,
        rate: TaxRate,
    ) -> Result<(), ValidationError> {
        validation::validate_tax_rate_bps(rate.bps())?;
        self.rates.insert(class.into(), rate);
        Ok(())
    }

    pub fn rate(&self, class: &TaxClassId) -> Option<TaxRate> {
        self.rates.get(class).copied()
    }

    pub fn basis(&self) -> TaxMode {
        self.basis
    }

    /// Configured classes in key order.
    pub fn classes(&self) -> impl Iterator<Item = &TaxClassId> {
        self.rates.keys()
    }
}

impl TaxLookup for RateTable {
    fn amount_for(&self, product: &ProductSnapshot, class: &TaxClassId) -> Money {
        let Some(rate) = self.rate(class) else {
            return Money::zero();
        };

        match self.basis {
            TaxMode::Exclusive => product.unit_price.calculate_tax(rate),
            TaxMode::Inclusive => product.unit_price.extract_included_tax(rate),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
