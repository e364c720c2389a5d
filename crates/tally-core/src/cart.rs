//! # Cart Aggregate
//!
//! A cart owns its line items, a running total and a per-class tax ledger.
//! All state changes go through the methods below; none of them leaves the
//! cart half-updated when it returns an error.
//!
//! ## Running Total
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(p, q)          total += q × p.unit_price                      │
//! │  remove_item(id)         total -= line.quantity × line.unit_price_at_add│
//! │  update_quantity(id, q)  total -= old line total                        │
//! │                          total += q × line.unit_price_at_add            │
//! │                                                                         │
//! │  Exclusive mode: unit_price_at_add == unit_price                        │
//! │      → total always equals the sum of line totals                       │
//! │                                                                         │
//! │  Inclusive mode: unit_price_at_add == unit_price - unit_tax             │
//! │      → adds charge the gross price, removals credit the net price       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tax ledger is fed once per line, at the moment the line is created.
//! Merges, updates and removals never touch it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use ts_rs::TS;

use crate::catalog::CatalogResolver;
use crate::codec::{self, PersistedCart, SkippedItem};
use crate::error::{CartError, CartResult, ValidationError};
use crate::money::Money;
use crate::tax::{TaxLedger, TaxLookup};
use crate::types::{CartId, IdentityToken, LineItem, ProductId, ProductSnapshot, TaxMode};
use crate::validation;

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart.
///
/// ## Invariants
/// - Items are unique by product id (adding the same product merges)
/// - Every line has a quantity > 0
/// - Items keep the order in which their lines were first created
#[derive(Clone)]
pub struct Cart {
    id: CartId,
    items: Vec<LineItem>,
    total: Money,
    tax_ledger: TaxLedger,
    tax_mode: TaxMode,
    taxes: Arc<dyn TaxLookup>,
}

impl Cart {
    /// Creates an empty cart.
    ///
    /// The tax mode is fixed for the lifetime of the cart.
    pub fn new(id: CartId, taxes: Arc<dyn TaxLookup>, tax_mode: TaxMode) -> Self {
        Cart {
            id,
            items: Vec::new(),
            total: Money::zero(),
            tax_ledger: TaxLedger::new(),
            tax_mode,
            taxes,
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds a product to the cart or increases the quantity of its line.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity grows, nothing else on the line
    ///   changes and no tax is accrued
    /// - Product not in cart: a new line is created from a copy of the
    ///   snapshot, and each of its tax classes is accrued into the ledger
    ///
    /// In both cases the total grows by `quantity × product.unit_price`.
    ///
    /// ## Errors
    /// - `Validation` for a null, negative-priced or non-purchasable product
    /// - `InvalidQuantity` for a quantity <= 0, or one that would overflow
    ///   the total or the line total at the line's stored price
    pub fn add_item(&mut self, product: &ProductSnapshot, quantity: i64) -> CartResult<()> {
        validation::validate_product(product)?;
        validation::validate_quantity(quantity)?;

        let increment = product
            .unit_price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CartError::invalid_quantity(quantity))?;
        let new_total = self
            .total
            .cents()
            .checked_add(increment.cents())
            .map(Money::from_cents)
            .ok_or_else(|| CartError::invalid_quantity(quantity))?;

        match self.position(product.id) {
            Some(index) => {
                let line = &mut self.items[index];
                let merged = line
                    .quantity()
                    .checked_add(quantity)
                    .ok_or_else(|| CartError::invalid_quantity(quantity))?;
                // Line totals use the stored price, not the incoming one
                line.unit_price_at_add()
                    .checked_multiply_quantity(merged)
                    .ok_or_else(|| CartError::invalid_quantity(quantity))?;
                line.set_quantity(merged);

                debug!(
                    cart_id = %self.id,
                    product_id = %product.id,
                    quantity = merged,
                    "Merged into existing line"
                );
            }
            None => {
                for class in self.taxes.classes_of(product) {
                    let amount = self.taxes.amount_for(product, &class);
                    self.tax_ledger.accrue(class, amount);
                }

                let unit_tax = self.taxes.unit_tax(product);
                let unit_price_at_add = match self.tax_mode {
                    TaxMode::Exclusive => product.unit_price,
                    TaxMode::Inclusive => product.unit_price - unit_tax,
                };

                self.items.push(LineItem::new(
                    product.clone(),
                    quantity,
                    unit_price_at_add,
                    unit_tax,
                ));

                debug!(
                    cart_id = %self.id,
                    product_id = %product.id,
                    quantity,
                    unit_tax = %unit_tax,
                    "Created line"
                );
            }
        }

        self.total = new_total;
        Ok(())
    }

    /// Resolves a product reference through the catalog and adds it.
    ///
    /// A reference that does not resolve is rejected as a validation error.
    pub fn add_by_token(
        &mut self,
        token: &IdentityToken,
        quantity: i64,
        catalog: &dyn CatalogResolver,
    ) -> CartResult<()> {
        let product = catalog
            .resolve(token)
            .ok_or_else(|| ValidationError::UnknownProduct(token.to_string()))?;
        self.add_item(&product, quantity)
    }

    /// Removes the line for a product.
    ///
    /// Removing a product that has no line is a no-op. Always returns `true`.
    pub fn remove_item(&mut self, product_id: ProductId) -> bool {
        if let Some(index) = self.position(product_id) {
            let line = self.items.remove(index);
            self.total -= line.line_total();

            debug!(
                cart_id = %self.id,
                product_id = %product_id,
                credited = %line.line_total(),
                "Removed line"
            );
        }

        true
    }

    /// Sets the quantity of an existing line.
    ///
    /// A quantity <= 0 removes the line. The tax ledger is not adjusted.
    ///
    /// ## Errors
    /// - `NotFound` if the product has no line
    /// - `InvalidQuantity` if the new line total would overflow
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i64) -> CartResult<()> {
        let index = self
            .position(product_id)
            .ok_or(CartError::NotFound(product_id))?;

        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }

        let line = &mut self.items[index];
        let new_line_total = line
            .unit_price_at_add()
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CartError::invalid_quantity(quantity))?;

        self.total -= line.line_total();
        self.total += new_line_total;
        line.set_quantity(quantity);

        debug!(cart_id = %self.id, product_id = %product_id, quantity, "Updated line quantity");
        Ok(())
    }

    /// Like [`Cart::update_quantity`], for a quantity that arrives as text.
    ///
    /// The line is looked up before the text is parsed, so a missing product
    /// reports `NotFound` even when the quantity is garbage.
    pub fn update_quantity_from_input(&mut self, product_id: ProductId, raw: &str) -> CartResult<()> {
        if !self.contains(product_id) {
            return Err(CartError::NotFound(product_id));
        }

        let quantity = validation::parse_quantity(raw)?;
        self.update_quantity(product_id, quantity)
    }

    /// Empties the cart, resetting the total and the tax ledger.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Money::zero();
        self.tax_ledger.clear();

        debug!(cart_id = %self.id, "Cleared cart");
    }

    /// Replaces the whole cart state with the one decoded from `record`.
    ///
    /// Decoding happens into a fresh cart first; on error this cart is left
    /// exactly as it was. On success the record's id becomes this cart's id
    /// and the entries that could not be restored are returned.
    pub fn initialize_from(
        &mut self,
        record: &PersistedCart,
        catalog: &dyn CatalogResolver,
    ) -> CartResult<Vec<SkippedItem>> {
        let restored = codec::decode(record, catalog, Arc::clone(&self.taxes), self.tax_mode)?;
        *self = restored.cart;
        Ok(restored.skipped)
    }

    /// Encodes this cart into its persisted form.
    pub fn to_record(&self) -> PersistedCart {
        codec::encode(self)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn id(&self) -> &CartId {
        &self.id
    }

    pub fn tax_mode(&self) -> TaxMode {
        self.tax_mode
    }

    /// Line for a product.
    pub fn item(&self, product_id: ProductId) -> CartResult<&LineItem> {
        self.items
            .iter()
            .find(|line| line.product_id() == product_id)
            .ok_or(CartError::NotFound(product_id))
    }

    /// All lines, in the order they were first added.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.position(product_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Sum of quantities over all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(LineItem::quantity).sum()
    }

    /// The running total. Maintained incrementally, never recomputed.
    pub fn total(&self) -> Money {
        self.total
    }

    pub fn tax_ledger(&self) -> &TaxLedger {
        &self.tax_ledger
    }

    /// Sum of the tax ledger over all classes.
    pub fn tax_total(&self) -> Money {
        self.tax_ledger.total()
    }

    /// Summary for callers that only need the headline numbers.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|line| line.product_id() == product_id)
    }
}

impl fmt::Debug for Cart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cart")
            .field("id", &self.id)
            .field("items", &self.items)
            .field("total", &self.total)
            .field("tax_ledger", &self.tax_ledger)
            .field("tax_mode", &self.tax_mode)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total: Money,
    pub tax: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.len(),
            total_quantity: cart.total_quantity(),
            total: cart.total(),
            tax: cart.tax_total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
