//! # Catalog Collaborator
//!
//! The cart never looks products up by itself. Whoever owns the catalog
//! implements [`CatalogResolver`]; the codec uses it to turn stored identity
//! tokens back into live snapshots during a restore.

use std::collections::HashMap;

use crate::types::{IdentityToken, ProductId, ProductSnapshot};

/// Resolves identity tokens to product snapshots.
pub trait CatalogResolver: Send + Sync {
    /// Returns a fresh snapshot for the token, or `None` if the product no
    /// longer exists.
    fn resolve(&self, token: &IdentityToken) -> Option<ProductSnapshot>;
}

/// A catalog held in memory, keyed by product id.
///
/// Tokens are the decimal product id, matching
/// [`ProductSnapshot::identity_token`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: HashMap<ProductId, ProductSnapshot>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a product, returning the previous snapshot.
    pub fn insert(&mut self, product: ProductSnapshot) -> Option<ProductSnapshot> {
        self.products.insert(product.id, product)
    }

    pub fn remove(&mut self, id: ProductId) -> Option<ProductSnapshot> {
        self.products.remove(&id)
    }

    pub fn get(&self, id: ProductId) -> Option<&ProductSnapshot> {
        self.products.get(&id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<ProductSnapshot> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = ProductSnapshot>>(iter: I) -> Self {
        InMemoryCatalog {
            products: iter.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl CatalogResolver for InMemoryCatalog {
    fn resolve(&self, token: &IdentityToken) -> Option<ProductSnapshot> {
        let id = token.as_str().parse::<ProductId>().ok()?;
        self.products.get(&id).cloned()
    }
}
