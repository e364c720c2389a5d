//! # Validation Module
//!
//! Input checks run before any cart state is touched.
//!
//! ## Validation Order for `add_item`
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_item(product, quantity)                                            │
//! │       │                                                                 │
//! │       ├── product id is null?        → ValidationError::Required        │
//! │       ├── product not purchasable?   → ValidationError::NotPurchasable  │
//! │       ├── unit price negative?       → ValidationError::OutOfRange      │
//! │       ├── quantity <= 0?             → CartError::InvalidQuantity       │
//! │       │                                                                 │
//! │       └── OK → mutate cart                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{parse_quantity, validate_quantity};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert_eq!(parse_quantity(" 3 ").unwrap(), 3);
//! assert!(parse_quantity("three").is_err());
//! ```

use crate::error::{CartError, CartResult, ValidationError};
use crate::types::{ProductKind, ProductSnapshot};
use crate::MAX_CART_ID_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Product Validators
// =============================================================================

/// Checks that a product may be placed in a cart.
///
/// ## Rules
/// - Identity must not be the null id
/// - Product kind must be purchasable
/// - Unit price must be non-negative
pub fn validate_product(product: &ProductSnapshot) -> ValidationResult<()> {
    if product.id.is_null() {
        return Err(ValidationError::Required {
            field: "product".to_string(),
        });
    }

    if let ProductKind::NonPurchasable { kind } = &product.kind {
        return Err(ValidationError::NotPurchasable {
            product_id: product.id,
            kind: kind.clone(),
        });
    }

    if product.unit_price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "unit price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a quantity that must be positive.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-1).is_err());
/// ```
pub fn validate_quantity(qty: i64) -> CartResult<()> {
    if qty <= 0 {
        return Err(CartError::invalid_quantity(qty));
    }

    Ok(())
}

/// Parses an untyped quantity into an integer.
///
/// Only well-formed integers pass; the sign is kept because a non-positive
/// requested quantity means "remove" to `update_quantity`.
pub fn parse_quantity(raw: &str) -> CartResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CartError::invalid_quantity(raw))
}

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates an externally assigned cart identity.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_CART_ID_LEN`] characters
pub fn validate_cart_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "cart id".to_string(),
        });
    }

    if id.len() > MAX_CART_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "cart id".to_string(),
            max: MAX_CART_ID_LEN,
        });
    }

    Ok(())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
