//! # Database Handle
//!
//! Opens the SQLite file that holds cart records and hands out repositories.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path) / DbConfig::in_memory()                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                            │
//! │       ├── open (file created on first use, WAL journal)                 │
//! │       └── migrate (embedded migrations, idempotent)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.carts() ──► CartRepository        (clones share one pool)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.close().await   ← every later query fails                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::carts::CartRepository;

/// How long a caller waits for a free connection before giving up.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Configuration
// =============================================================================

/// Where the cart database lives and how many connections may be open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Path to the SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Upper bound on pooled connections. Default: 5
    pub max_connections: u32,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// A private in-memory database. Used by tests.
    ///
    /// Every SQLite connection to `:memory:` opens its own empty database,
    /// so the pool is pinned to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };

        // NORMAL may lose the last commit on power loss, never corrupts
        Ok(options.synchronous(SqliteSynchronous::Normal))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the cart database. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database and brings its schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening cart database");

        let options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            // An in-memory database disappears with its last connection
            .idle_timeout(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        migrations::run_migrations(&pool).await?;
        Ok(Database { pool })
    }

    /// Returns `(total_migrations, applied_migrations)`.
    pub async fn migration_status(&self) -> DbResult<(usize, usize)> {
        migrations::migration_status(&self.pool).await
    }

    /// Repository over the `carts` table.
    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone())
    }

    /// True while the database answers queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    pub async fn close(&self) {
        info!("Closing cart database");
        self.pool.close().await;
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
