//! # tally-db: Storage Layer for Tally Carts
//!
//! This crate stores persisted cart records in SQLite, loads configuration,
//! and serializes concurrent access to a given cart id.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  Caller (request handler, worker, ...)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ CartSessions  │    │ CartRepository│    │  Migrations  │  │   │
//! │  │   │ (session.rs)  │───►│  (carts.rs)   │    │  (embedded)  │  │   │
//! │  │   │ per-id locks  │    │ save / find / │    │ 001_carts.sql│  │   │
//! │  │   │               │    │ restore       │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │          ▲                     │ Database (pool.rs)            │   │
//! │  │   TallyConfig (config.rs)      │                               │   │
//! │  └────────────────────────────────┼───────────────────────────────┘   │
//! │                                   ▼                                    │
//! │                       SQLite database (tally.db)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Cart record repository
//! - [`config`] - TOML configuration with environment overrides
//! - [`session`] - Per-cart serialized load / mutate / persist
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tally_db::{CartSessions, Database, TallyConfig};
//!
//! let config = TallyConfig::load(Some(Path::new("tally.toml")))?;
//! let db = Database::new(config.db_config()).await?;
//! let sessions = CartSessions::from_config(db, Arc::new(catalog), &config)?;
//!
//! let (totals, skipped) = sessions
//!     .with_cart(&cart_id, |cart| {
//!         cart.add_by_token(&token, 1, &catalog)?;
//!         Ok(cart.totals())
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod session;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::TallyConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use session::CartSessions;

// Repository re-exports for convenience
pub use repository::carts::{CartRepository, StoredCart};
