//! # Cart Repository
//!
//! Stores persisted cart records, one row per cart id.
//!
//! ## Stored vs Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  carts.state       {"version":1,"id":...,"items":[token, quantity]}    │
//! │  carts.item_count  number of lines (for listings, never trusted)       │
//! │                                                                         │
//! │  NOT stored: prices, tax ledger, total                                 │
//! │       → restore() replays the record against the live catalog           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use tally_core::codec;
use tally_core::{Cart, CartId, CatalogResolver, PersistedCart, Restored, TaxLookup, TaxMode};

use crate::error::DbResult;

/// Row shape of the `carts` table.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    state: String,
    item_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A stored record plus its bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCart {
    pub record: PersistedCart,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for cart records.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Inserts or replaces the record for its cart id.
    ///
    /// Records with a bad shape are rejected before anything is written.
    pub async fn save(&self, record: &PersistedCart) -> DbResult<()> {
        record.validate()?;
        let state = record.to_json()?;
        let item_count = i64::try_from(record.items.len()).unwrap_or(i64::MAX);
        let now = Utc::now();

        debug!(cart_id = %record.id, item_count, "Saving cart");

        sqlx::query(
            r#"
            INSERT INTO carts (id, state, item_count, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                item_count = excluded.item_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&state)
        .bind(item_count)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Encodes and saves a live cart.
    pub async fn persist(&self, cart: &Cart) -> DbResult<()> {
        self.save(&cart.to_record()).await
    }

    /// Loads the record of a cart.
    ///
    /// A stored state that no longer parses is reported as
    /// `CartError::CorruptState`.
    pub async fn find(&self, id: &CartId) -> DbResult<Option<PersistedCart>> {
        Ok(self.find_stored(id).await?.map(|stored| stored.record))
    }

    /// Loads the record of a cart together with its timestamps.
    pub async fn find_stored(&self, id: &CartId) -> DbResult<Option<StoredCart>> {
        debug!(cart_id = %id, "Loading cart");

        let row = sqlx::query_as::<_, CartRow>(
            r#"
            SELECT state, item_count, created_at, updated_at
            FROM carts
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(StoredCart {
            record: PersistedCart::from_json(&row.state)?,
            item_count: row.item_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Loads and rebuilds a cart against the current catalog and tax rules.
    ///
    /// Returns `None` if nothing is stored under the id.
    pub async fn restore(
        &self,
        id: &CartId,
        catalog: &dyn CatalogResolver,
        taxes: Arc<dyn TaxLookup>,
        tax_mode: TaxMode,
    ) -> DbResult<Option<Restored>> {
        let Some(record) = self.find(id).await? else {
            return Ok(None);
        };

        let restored = codec::decode(&record, catalog, taxes, tax_mode)?;
        Ok(Some(restored))
    }

    /// Deletes the record of a cart. Returns whether a row was removed.
    pub async fn delete(&self, id: &CartId) -> DbResult<bool> {
        debug!(cart_id = %id, "Deleting cart");

        let result = sqlx::query("DELETE FROM carts WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of stored carts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM carts")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
