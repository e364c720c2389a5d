//! # Cart Sessions
//!
//! Serializes load → mutate → persist per cart id.
//!
//! A [`Cart`] has no internal locking. Two requests that load the same
//! stored cart, mutate it and save it back would silently lose one of the
//! updates. `CartSessions` keeps one async mutex per cart id and holds it for
//! the whole round trip.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  with_cart(id, f)                                                       │
//! │       │                                                                 │
//! │       ├── lock(id)            ← other calls for the same id wait here   │
//! │       ├── restore(id)         ← or a fresh empty cart                   │
//! │       ├── f(&mut cart)                                                  │
//! │       │       ├── Err → return error, nothing persisted                 │
//! │       │       └── Ok  → persist(cart)                                   │
//! │       └── unlock(id)                                                    │
//! │                                                                         │
//! │  Different ids never wait on each other.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use tally_core::{Cart, CartId, CartResult, CatalogResolver, Restored, SkippedItem, TaxLookup, TaxMode};

use crate::config::TallyConfig;
use crate::error::DbResult;
use crate::pool::Database;

/// Per-cart-id serialized access to stored carts.
pub struct CartSessions {
    db: Database,
    catalog: Arc<dyn CatalogResolver>,
    taxes: Arc<dyn TaxLookup>,
    tax_mode: TaxMode,
    locks: Mutex<HashMap<CartId, Arc<AsyncMutex<()>>>>,
}

impl CartSessions {
    pub fn new(
        db: Database,
        catalog: Arc<dyn CatalogResolver>,
        taxes: Arc<dyn TaxLookup>,
        tax_mode: TaxMode,
    ) -> Self {
        CartSessions {
            db,
            catalog,
            taxes,
            tax_mode,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Builds sessions whose tax rules and pricing mode come from config.
    pub fn from_config(
        db: Database,
        catalog: Arc<dyn CatalogResolver>,
        config: &TallyConfig,
    ) -> DbResult<Self> {
        let taxes = Arc::new(config.rate_table()?);
        Ok(Self::new(db, catalog, taxes, config.tax_mode()))
    }

    pub fn tax_mode(&self) -> TaxMode {
        self.tax_mode
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs `f` against the stored cart, persisting the result if `f`
    /// succeeds.
    ///
    /// A cart with no stored record starts out empty. Items that could not
    /// be restored are returned next to `f`'s result and are gone from the
    /// record written back.
    pub async fn with_cart<F, R>(&self, id: &CartId, f: F) -> DbResult<(R, Vec<SkippedItem>)>
    where
        F: FnOnce(&mut Cart) -> CartResult<R>,
    {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let (mut cart, skipped) = match self.restore_locked(id).await? {
            Some(restored) => (restored.cart, restored.skipped),
            None => {
                debug!(cart_id = %id, "Starting new cart");
                (self.empty_cart(id), Vec::new())
            }
        };

        let output = f(&mut cart)?;
        self.db.carts().persist(&cart).await?;

        Ok((output, skipped))
    }

    /// Restores the stored cart without changing it.
    pub async fn load(&self, id: &CartId) -> DbResult<Option<Restored>> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.restore_locked(id).await
    }

    /// Deletes the stored cart. Returns whether anything was stored.
    pub async fn discard(&self, id: &CartId) -> DbResult<bool> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        self.db.carts().delete(id).await
    }

    /// Number of ids with a live lock entry.
    pub fn active_sessions(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn empty_cart(&self, id: &CartId) -> Cart {
        Cart::new(id.clone(), Arc::clone(&self.taxes), self.tax_mode)
    }

    async fn restore_locked(&self, id: &CartId) -> DbResult<Option<Restored>> {
        let restored = self
            .db
            .carts()
            .restore(id, self.catalog.as_ref(), Arc::clone(&self.taxes), self.tax_mode)
            .await?;

        if let Some(restored) = &restored {
            if !restored.is_complete() {
                warn!(
                    cart_id = %id,
                    skipped = restored.skipped.len(),
                    "Restored cart with missing items"
                );
            }
        }

        Ok(restored)
    }

    fn lock_for(&self, id: &CartId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Entries only the map still holds are idle
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(locks.entry(id.clone()).or_default())
    }
}
