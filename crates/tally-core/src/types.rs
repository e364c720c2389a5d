//! # Domain Types
//!
//! Value types shared by the cart, the tax ledger and the codec.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ProductSnapshot │   │    LineItem     │   │     CartId      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  snapshot       │   │  opaque string  │       │
//! │  │  unit_price     │   │  quantity (>0)  │   │  (UUID v4 when  │       │
//! │  │  tax_classes    │   │  unit_price_at_ │   │   generated)    │       │
//! │  │  kind           │   │  tax_at_add     │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   TaxClassId    │   │    TaxMode      │       │
//! │  │  bps (u32)      │   │  "standard"     │   │  Exclusive      │       │
//! │  │  825 = 8.25%    │   │  "reduced" ...  │   │  Inclusive      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `ProductSnapshot` freezes the price-relevant attributes of a product at
//! the moment it is handed to the cart. Each line item owns its own copy, so
//! a later catalog price change never reaches an existing line.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CartResult, ValidationError};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 825 bps = 8.25%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Tax Mode
// =============================================================================

/// The "tax included in displayed price" policy.
///
/// Read when a line is first created. Under `Inclusive` the stored per-line
/// price has the unit tax taken out of it; under `Exclusive` it is the raw
/// catalog price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// Catalog prices are net; tax is shown on top.
    #[default]
    Exclusive,
    /// Catalog prices already contain tax.
    Inclusive,
}

impl TaxMode {
    /// Returns true when catalog prices already contain tax.
    #[inline]
    pub fn is_inclusive(&self) -> bool {
        matches!(self, TaxMode::Inclusive)
    }
}

impl fmt::Display for TaxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxMode::Exclusive => write!(f, "exclusive"),
            TaxMode::Inclusive => write!(f, "inclusive"),
        }
    }
}

impl FromStr for TaxMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exclusive" | "excluded" | "false" => Ok(TaxMode::Exclusive),
            "inclusive" | "included" | "true" => Ok(TaxMode::Inclusive),
            _ => Err(ValidationError::NotAllowed {
                field: "tax mode".to_string(),
                allowed: vec!["exclusive".to_string(), "inclusive".to_string()],
            }),
        }
    }
}

// =============================================================================
// Identities
// =============================================================================

/// Identifier of a tax class ("standard", "reduced", "zero", ...).
///
/// Classes are lookup keys shared with the tax collaborator; the cart never
/// owns their definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxClassId(String);

impl TaxClassId {
    pub fn new(class: impl Into<String>) -> Self {
        TaxClassId(class.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaxClassId {
    fn from(class: &str) -> Self {
        TaxClassId::new(class)
    }
}

/// Stable product identity. `0` is the null identity and never names a
/// product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(u64);

impl ProductId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        ProductId(id)
    }

    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns true for the null identity.
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ProductId)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "product id".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Opaque token the catalog can resolve back to a product snapshot.
///
/// Persisted cart records store tokens, never prices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityToken(String);

impl IdentityToken {
    pub fn new(token: impl Into<String>) -> Self {
        IdentityToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ProductId> for IdentityToken {
    fn from(id: ProductId) -> Self {
        IdentityToken(id.to_string())
    }
}

/// Opaque cart identity, assigned by the owner of the cart.
///
/// Used for persistence lookups only; two carts with equal contents but
/// different ids are still different carts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartId(String);

impl CartId {
    /// Wraps an externally assigned identity after validating it.
    pub fn new(id: impl Into<String>) -> CartResult<Self> {
        let id = id.into();
        validation::validate_cart_id(&id)?;
        Ok(CartId(id))
    }

    /// Generates a fresh identity (UUID v4).
    pub fn generate() -> Self {
        CartId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Product Snapshot
// =============================================================================

/// Whether a product can be placed in a cart.
///
/// Non-purchasable products keep their type name so the rejection can say
/// what was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductKind {
    Purchasable,
    NonPurchasable { kind: String },
}

impl ProductKind {
    #[inline]
    pub fn is_purchasable(&self) -> bool {
        matches!(self, ProductKind::Purchasable)
    }
}

/// Immutable capture of a product's price-relevant attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Stable product identity.
    pub id: ProductId,

    /// Display name at capture time.
    pub name: String,

    /// Unit price as listed in the catalog (non-negative).
    pub unit_price: Money,

    /// Tax classes the product belongs to (possibly empty).
    pub tax_classes: BTreeSet<TaxClassId>,

    /// Purchasability capability.
    pub kind: ProductKind,
}

impl ProductSnapshot {
    /// Creates a purchasable snapshot with no tax classes.
    pub fn purchasable(id: ProductId, name: impl Into<String>, unit_price: Money) -> Self {
        ProductSnapshot {
            id,
            name: name.into(),
            unit_price,
            tax_classes: BTreeSet::new(),
            kind: ProductKind::Purchasable,
        }
    }

    /// Creates a snapshot of a product type that cannot be sold directly.
    pub fn non_purchasable(
        id: ProductId,
        name: impl Into<String>,
        unit_price: Money,
        kind: impl Into<String>,
    ) -> Self {
        ProductSnapshot {
            kind: ProductKind::NonPurchasable { kind: kind.into() },
            ..ProductSnapshot::purchasable(id, name, unit_price)
        }
    }

    /// Adds a tax class.
    pub fn with_tax_class(mut self, class: impl Into<TaxClassId>) -> Self {
        self.tax_classes.insert(class.into());
        self
    }

    #[inline]
    pub fn is_purchasable(&self) -> bool {
        self.kind.is_purchasable()
    }

    /// Token under which the catalog can find this product again.
    pub fn identity_token(&self) -> IdentityToken {
        IdentityToken::from(self.id)
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product's aggregated quantity and price/tax bookkeeping in a cart.
///
/// Only `quantity` ever changes after creation, and only through the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    snapshot: ProductSnapshot,
    quantity: i64,
    unit_price_at_add: Money,
    tax_at_add: Money,
}

impl LineItem {
    pub(crate) fn new(
        snapshot: ProductSnapshot,
        quantity: i64,
        unit_price_at_add: Money,
        tax_at_add: Money,
    ) -> Self {
        LineItem {
            snapshot,
            quantity,
            unit_price_at_add,
            tax_at_add,
        }
    }

    pub(crate) fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    /// Line key; a product appears in at most one line.
    #[inline]
    pub fn product_id(&self) -> ProductId {
        self.snapshot.id
    }

    #[inline]
    pub fn snapshot(&self) -> &ProductSnapshot {
        &self.snapshot
    }

    /// Always positive.
    #[inline]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Per-unit price recorded when the line was created.
    #[inline]
    pub fn unit_price_at_add(&self) -> Money {
        self.unit_price_at_add
    }

    /// Per-unit tax recorded when the line was created.
    #[inline]
    pub fn tax_at_add(&self) -> Money {
        self.tax_at_add
    }

    /// `quantity × unit_price_at_add`.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price_at_add * self.quantity
    }

    pub fn identity_token(&self) -> IdentityToken {
        self.snapshot.identity_token()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(825);
        assert_eq!(rate.bps(), 825);
        assert!((rate.percentage() - 8.25).abs() < 0.001);
        assert!(TaxRate::default().is_zero());
    }

    #[test]
    fn test_tax_mode_parsing() {
        assert_eq!("exclusive".parse::<TaxMode>().unwrap(), TaxMode::Exclusive);
        assert_eq!("Inclusive".parse::<TaxMode>().unwrap(), TaxMode::Inclusive);
        assert_eq!("true".parse::<TaxMode>().unwrap(), TaxMode::Inclusive);
        assert_eq!(" included ".parse::<TaxMode>().unwrap(), TaxMode::Inclusive);
        assert!("gross".parse::<TaxMode>().is_err());
        assert_eq!(TaxMode::default(), TaxMode::Exclusive);
        assert_eq!(TaxMode::Inclusive.to_string(), "inclusive");
    }

    #[test]
    fn test_product_id_parse_and_null() {
        assert_eq!("17".parse::<ProductId>().unwrap(), ProductId::new(17));
        assert!("abc".parse::<ProductId>().is_err());
        assert!(ProductId::new(0).is_null());
        assert_eq!(IdentityToken::from(ProductId::new(17)).as_str(), "17");
    }

    #[test]
    fn test_cart_id_validation() {
        assert!(CartId::new("session-1").is_ok());
        assert!(CartId::new("").is_err());
        assert!(CartId::new("x".repeat(500)).is_err());

        let generated = CartId::generate();
        assert_eq!(generated.as_str().len(), 36);
        assert_ne!(generated, CartId::generate());
    }

    #[test]
    fn test_snapshot_builders() {
        let snapshot = ProductSnapshot::purchasable(ProductId::new(3), "Tea", Money::from_cents(450))
            .with_tax_class("standard")
            .with_tax_class("reduced")
            .with_tax_class("standard");
        assert!(snapshot.is_purchasable());
        assert_eq!(snapshot.tax_classes.len(), 2);
        assert_eq!(snapshot.identity_token().as_str(), "3");

        let gift_card =
            ProductSnapshot::non_purchasable(ProductId::new(4), "Bundle", Money::zero(), "grouped");
        assert!(!gift_card.is_purchasable());
        assert_eq!(
            gift_card.kind,
            ProductKind::NonPurchasable {
                kind: "grouped".to_string()
            }
        );
    }

    #[test]
    fn test_line_total() {
        let snapshot = ProductSnapshot::purchasable(ProductId::new(1), "Mug", Money::from_cents(1200));
        let line = LineItem::new(snapshot, 3, Money::from_cents(1000), Money::from_cents(200));
        assert_eq!(line.line_total(), Money::from_cents(3000));
        assert_eq!(line.product_id(), ProductId::new(1));
    }
}
