//! # Snapshot Codec
//!
//! Converts a [`Cart`] to and from its persisted record.
//!
//! Only product identity tokens and quantities are stored. Prices, taxes and
//! totals are derived data: they are recomputed on decode by replaying every
//! stored item through the normal add path, so a restored cart always
//! reflects the catalog and tax rules at restore time.
//!
//! ## Record Shape
//! ```text
//! {
//!   "version": 1,
//!   "id": "550e8400-e29b-41d4-a716-446655440000",
//!   "items": [
//!     { "productIdentityToken": "42", "quantity": 2 },
//!     { "productIdentityToken": "17", "quantity": 1 }
//!   ]
//! }
//! ```
//!
//! ## Decode Outcomes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  unparseable text, unknown version, empty id, quantity <= 0             │
//! │       → CorruptState, nothing restored                                  │
//! │                                                                         │
//! │  token does not resolve        → skipped (ProductNotFound)              │
//! │  product no longer purchasable → skipped (Validation)                   │
//! │       → decode continues with the remaining items                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use ts_rs::TS;

use crate::cart::Cart;
use crate::catalog::CatalogResolver;
use crate::error::{CartError, CartResult};
use crate::tax::TaxLookup;
use crate::types::{CartId, IdentityToken, TaxMode};

/// Highest record version this codec understands.
pub const SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCHEMA_VERSION
}

// =============================================================================
// Persisted Record
// =============================================================================

/// The stored form of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PersistedCart {
    /// Schema version. Records written before versioning count as 1.
    #[serde(default = "default_version")]
    pub version: u32,
    pub id: String,
    pub items: Vec<PersistedItem>,
}

/// One stored line: which product, how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PersistedItem {
    pub product_identity_token: String,
    pub quantity: i64,
}

impl PersistedCart {
    /// Parses a record from JSON. Any parse failure is `CorruptState`.
    pub fn from_json(text: &str) -> CartResult<Self> {
        serde_json::from_str(text).map_err(|e| CartError::corrupt(e.to_string()))
    }

    pub fn to_json(&self) -> CartResult<String> {
        serde_json::to_string(self).map_err(|e| CartError::corrupt(e.to_string()))
    }

    /// Checks the record shape without touching any collaborator.
    pub fn validate(&self) -> CartResult<()> {
        if self.version == 0 || self.version > SCHEMA_VERSION {
            return Err(CartError::corrupt(format!(
                "unsupported schema version {}",
                self.version
            )));
        }

        if self.id.trim().is_empty() {
            return Err(CartError::corrupt("cart id is empty"));
        }

        if let Some((index, item)) = self
            .items
            .iter()
            .enumerate()
            .find(|(_, item)| item.quantity <= 0)
        {
            return Err(CartError::corrupt(format!(
                "item {index} has non-positive quantity {}",
                item.quantity
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Restore Result
// =============================================================================

/// A stored item that could not be put back into the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub token: IdentityToken,
    pub error: CartError,
}

/// A decoded cart plus whatever had to be left out of it.
#[derive(Debug)]
pub struct Restored {
    pub cart: Cart,
    pub skipped: Vec<SkippedItem>,
}

impl Restored {
    /// True if every stored item made it back into the cart.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

// =============================================================================
// Encode / Decode
// =============================================================================

/// Produces the persisted record of a cart, lines in cart order.
pub fn encode(cart: &Cart) -> PersistedCart {
    PersistedCart {
        version: SCHEMA_VERSION,
        id: cart.id().as_str().to_string(),
        items: cart
            .items()
            .iter()
            .map(|line| PersistedItem {
                product_identity_token: line.identity_token().into_inner(),
                quantity: line.quantity(),
            })
            .collect(),
    }
}

/// Rebuilds a cart from its persisted record.
///
/// Items are replayed through [`Cart::add_item`] in stored order, so totals
/// and the tax ledger come out exactly as if the items had been added one
/// by one against the current catalog.
pub fn decode(
    record: &PersistedCart,
    catalog: &dyn CatalogResolver,
    taxes: Arc<dyn TaxLookup>,
    tax_mode: TaxMode,
) -> CartResult<Restored> {
    record.validate()?;

    let id = CartId::new(record.id.as_str()).map_err(|e| CartError::corrupt(e.to_string()))?;
    let mut cart = Cart::new(id, taxes, tax_mode);
    let mut skipped = Vec::new();

    for item in &record.items {
        let token = IdentityToken::new(item.product_identity_token.as_str());

        let Some(product) = catalog.resolve(&token) else {
            warn!(cart_id = %cart.id(), token = %token, "Skipping item: product not found");
            skipped.push(SkippedItem {
                error: CartError::ProductNotFound(token.to_string()),
                token,
            });
            continue;
        };

        match cart.add_item(&product, item.quantity) {
            Ok(()) => {}
            Err(CartError::Validation(reason)) => {
                warn!(cart_id = %cart.id(), token = %token, %reason, "Skipping item: product rejected");
                skipped.push(SkippedItem {
                    token,
                    error: CartError::Validation(reason),
                });
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        cart_id = %cart.id(),
        restored = cart.len(),
        skipped = skipped.len(),
        "Decoded cart"
    );

    Ok(Restored { cart, skipped })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::error::ValidationError;
    use crate::money::Money;
    use crate::tax::RateTable;
    use crate::types::{ProductId, ProductSnapshot, TaxClassId, TaxRate};

    fn taxes() -> Arc<RateTable> {
        Arc::new(
            RateTable::new(TaxMode::Exclusive)
                .with_rate("standard", TaxRate::from_bps(2000))
                .unwrap(),
        )
    }

    fn product(id: u64, cents: i64) -> ProductSnapshot {
        ProductSnapshot::purchasable(ProductId::new(id), format!("Product {id}"), Money::from_cents(cents))
            .with_tax_class("standard")
    }

    fn catalog() -> InMemoryCatalog {
        [product(1, 1000), product(2, 250), product(3, 99)].into_iter().collect()
    }

    fn record(id: &str, items: &[(&str, i64)]) -> PersistedCart {
        PersistedCart {
            version: SCHEMA_VERSION,
            id: id.to_string(),
            items: items
                .iter()
                .map(|(token, quantity)| PersistedItem {
                    product_identity_token: token.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn test_encode_lists_lines_in_order() {
        let mut cart = Cart::new(CartId::new("cart-1").unwrap(), taxes(), TaxMode::Exclusive);
        cart.add_item(&product(2, 250), 3).unwrap();
        cart.add_item(&product(1, 1000), 1).unwrap();
        cart.add_item(&product(2, 250), 1).unwrap();

        assert_eq!(encode(&cart), record("cart-1", &[("2", 4), ("1", 1)]));
    }

    #[test]
    fn test_json_shape() {
        let json = record("cart-1", &[("2", 4)]).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"version":1,"id":"cart-1","items":[{"productIdentityToken":"2","quantity":4}]}"#
        );
    }

    #[test]
    fn test_missing_version_defaults_to_current() {
        let parsed = PersistedCart::from_json(r#"{"id":"c","items":[]}"#).unwrap();
        assert_eq!(parsed.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_from_json_rejects_malformed_text() {
        for text in [
            "not json",
            r#"{"id":"c","items":"oops"}"#,
            r#"{"id":"c","items":[{"productIdentityToken":"1","quantity":"two"}]}"#,
            r#"{"items":[]}"#,
        ] {
            assert!(
                matches!(PersistedCart::from_json(text), Err(CartError::CorruptState(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_decode_recomputes_totals_and_tax() {
        let restored = decode(
            &record("cart-1", &[("1", 2), ("2", 1)]),
            &catalog(),
            taxes(),
            TaxMode::Exclusive,
        )
        .unwrap();

        assert!(restored.is_complete());
        let cart = restored.cart;
        assert_eq!(cart.id().as_str(), "cart-1");
        assert_eq!(cart.total(), Money::from_cents(2250));
        assert_eq!(
            cart.tax_ledger().get(&TaxClassId::new("standard")),
            Some(Money::from_cents(250))
        );
    }

    #[test]
    fn test_decode_uses_current_catalog_prices() {
        let mut catalog = catalog();
        catalog.insert(product(1, 1500));

        let restored = decode(&record("c", &[("1", 2)]), &catalog, taxes(), TaxMode::Exclusive).unwrap();
        assert_eq!(restored.cart.total(), Money::from_cents(3000));
    }

    #[test]
    fn test_decode_skips_unresolvable_and_unpurchasable() {
        let mut catalog = catalog();
        catalog.insert(ProductSnapshot::non_purchasable(
            ProductId::new(4),
            "Gift card link",
            Money::from_cents(500),
            "external",
        ));

        let restored = decode(
            &record("c", &[("1", 1), ("404", 2), ("4", 1), ("3", 1)]),
            &catalog,
            taxes(),
            TaxMode::Exclusive,
        )
        .unwrap();

        assert_eq!(restored.cart.len(), 2);
        assert_eq!(restored.cart.total(), Money::from_cents(1099));
        assert_eq!(restored.skipped.len(), 2);
        assert_eq!(
            restored.skipped[0],
            SkippedItem {
                token: IdentityToken::new("404"),
                error: CartError::ProductNotFound("404".to_string()),
            }
        );
        assert!(matches!(
            restored.skipped[1].error,
            CartError::Validation(ValidationError::NotPurchasable { .. })
        ));
    }

    #[test]
    fn test_decode_merges_duplicate_tokens() {
        let restored = decode(&record("c", &[("2", 1), ("2", 2)]), &catalog(), taxes(), TaxMode::Exclusive)
            .unwrap();

        assert_eq!(restored.cart.len(), 1);
        assert_eq!(restored.cart.total_quantity(), 3);
        assert_eq!(restored.cart.total(), Money::from_cents(750));
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let cases = [
            record("", &[]),
            record("c", &[("1", 0)]),
            record("c", &[("1", 1), ("2", -4)]),
            PersistedCart {
                version: SCHEMA_VERSION + 1,
                ..record("c", &[])
            },
        ];

        for bad in cases {
            assert!(matches!(
                decode(&bad, &catalog(), taxes(), TaxMode::Exclusive),
                Err(CartError::CorruptState(_))
            ));
        }
    }

    #[test]
    fn test_round_trip() {
        let mut cart = Cart::new(CartId::generate(), taxes(), TaxMode::Exclusive);
        cart.add_item(&product(3, 99), 5).unwrap();
        cart.add_item(&product(1, 1000), 1).unwrap();

        let json = cart.to_record().to_json().unwrap();
        let restored = decode(
            &PersistedCart::from_json(&json).unwrap(),
            &catalog(),
            taxes(),
            TaxMode::Exclusive,
        )
        .unwrap();

        assert_eq!(restored.cart.id(), cart.id());
        assert_eq!(restored.cart.items(), cart.items());
        assert_eq!(restored.cart.total(), cart.total());
        assert_eq!(restored.cart.tax_ledger(), cart.tax_ledger());
    }

    #[test]
    fn test_initialize_from_keeps_cart_on_error() {
        let mut cart = Cart::new(CartId::new("live").unwrap(), taxes(), TaxMode::Exclusive);
        cart.add_item(&product(2, 250), 2).unwrap();

        let err = cart
            .initialize_from(&record("other", &[("1", 0)]), &catalog())
            .unwrap_err();
        assert!(matches!(err, CartError::CorruptState(_)));
        assert_eq!(cart.id().as_str(), "live");
        assert_eq!(cart.total(), Money::from_cents(500));

        let skipped = cart
            .initialize_from(&record("other", &[("1", 1), ("9", 1)]), &catalog())
            .unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(cart.id().as_str(), "other");
        assert_eq!(cart.total(), Money::from_cents(1000));
        assert!(!cart.contains(ProductId::new(2)));
    }
}
