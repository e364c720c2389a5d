//! # Error Types
//!
//! Domain error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                          │
//! │  ├── CartError        - Cart / codec operation failures                 │
//! │  └── ValidationError  - Malformed or non-purchasable product input      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                       │
//! │  └── DbError          - Storage failures, wraps CartError               │
//! │                                                                         │
//! │  Flow: ValidationError → CartError → DbError → caller                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//! Every variant except [`CartError::ProductNotFound`] aborts the operation
//! and leaves the cart untouched. `ProductNotFound` only shows up inside the
//! skipped list of a restore.

use thiserror::Error;

use crate::types::ProductId;

// =============================================================================
// Cart Error
// =============================================================================

/// Errors raised by cart mutations, queries and the snapshot codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The product reference is malformed or cannot be sold.
    #[error("Invalid product: {0}")]
    Validation(#[from] ValidationError),

    /// A quantity is non-positive where a positive one is required, or is not
    /// a well-formed integer at all.
    ///
    /// ## When This Occurs
    /// - `add_item(product, 0)` or a negative quantity
    /// - `update_quantity_from_input(id, "two")`
    /// - Merging would overflow the line quantity
    #[error("Invalid quantity '{0}': quantity has to be a positive whole number")]
    InvalidQuantity(String),

    /// The operation addressed a product that has no line in the cart.
    #[error("Item {0} does not exist in the cart")]
    NotFound(ProductId),

    /// A persisted cart record could not be parsed into the expected shape.
    #[error("Corrupt cart state: {0}")]
    CorruptState(String),

    /// A stored identity token no longer resolves through the catalog.
    #[error("Product not found for token '{0}'")]
    ProductNotFound(String),
}

impl CartError {
    /// Creates an InvalidQuantity error from anything displayable.
    pub fn invalid_quantity(raw: impl ToString) -> Self {
        CartError::InvalidQuantity(raw.to_string())
    }

    /// Creates a CorruptState error.
    pub fn corrupt(reason: impl Into<String>) -> Self {
        CartError::CorruptState(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required value is missing, empty or the null identity.
    #[error("{field} is required")]
    Required { field: String },

    /// Value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A product reference did not resolve through the catalog.
    #[error("Product not found: {0}")]
    UnknownProduct(String),

    /// The product exists but its kind cannot go into a cart.
    #[error("Product {product_id} of type \"{kind}\" cannot be added to cart")]
    NotPurchasable { product_id: ProductId, kind: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CartError.
pub type CartResult<T> = Result<T, CartError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CartError::NotFound(ProductId::new(42)).to_string(),
            "Item 42 does not exist in the cart"
        );
        assert_eq!(
            CartError::invalid_quantity(-1).to_string(),
            "Invalid quantity '-1': quantity has to be a positive whole number"
        );
        assert_eq!(
            CartError::corrupt("items is not a list").to_string(),
            "Corrupt cart state: items is not a list"
        );
    }

    #[test]
    fn test_not_purchasable_message() {
        let err = ValidationError::NotPurchasable {
            product_id: ProductId::new(9),
            kind: "grouped".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Product 9 of type \"grouped\" cannot be added to cart"
        );
    }

    #[test]
    fn test_validation_converts_to_cart_error() {
        let validation_err = ValidationError::Required {
            field: "product".to_string(),
        };
        let cart_err: CartError = validation_err.into();
        assert!(matches!(cart_err, CartError::Validation(_)));
        assert_eq!(cart_err.to_string(), "Invalid product: product is required");
    }
}
