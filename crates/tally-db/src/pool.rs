//! # Database Pool Management
//!
//! Connection pool creation, bootstrap and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Terminal startup                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       │                                                                 │
//! │       ├── file missing? create parent dir + file (bootstrap)           │
//! │       ├── open SqlitePool (single connection, one writer)              │
//! │       └── run embedded migrations (creates the three tables)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐                                 │                           │
//! │  │  │Conn1│   every scan awaits its queries │                           │
//! │  │  └─────┘   before the next line is read  │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so a reporting tool can
//! read the file while the station is running.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use tally_core::{Activity, LedgerEntry, Product, User};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::ledger::LedgerRepository;
use crate::repository::product::ProductRepository;
use crate::repository::user::UserRepository;

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// The station is the only writer, so the pool holds a single connection.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// How long to wait for a free connection.
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    pub idle_timeout: Duration,
}

impl DbConfig {
    /// Configuration for the store at `path`. The file (and its parent
    /// directory) is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// True for [`DbConfig::in_memory`] configurations.
    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY_PATH)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: clones share the same pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::in_memory()).await?;
///
/// if let Some(product) = db.find_product("P1").await? {
///     db.update_product_quantity(&product.code, product.quantity - 1).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Whether this open created the database file.
    created: bool,
}

impl Database {
    /// Opens (or bootstraps) the store.
    ///
    /// ## What This Does
    /// 1. Creates the parent directory and database file if they don't exist
    /// 2. Configures SQLite:
    ///    - WAL mode
    ///    - NORMAL synchronous (balance of safety/speed)
    /// 3. Creates the connection pool
    /// 4. Runs migrations, which creates the tables on a new file
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let (connect_options, created) = if config.is_in_memory() {
            let options = SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
            (options, true)
        } else {
            let created = prepare_file(&config.database_path).await?;
            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true);
            (options, created)
        };

        let connect_options = connect_options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        debug!(created, "Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool, created };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: applied migrations are tracked in `_sqlx_migrations`.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;

        let (total, applied) = migrations::migration_status(&self.pool).await?;
        info!(total, applied, "Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// True when this open created a new, empty store.
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// Returns the user repository.
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the ledger repository.
    pub fn ledger(&self) -> LedgerRepository {
        LedgerRepository::new(self.pool.clone())
    }

    // -------------------------------------------------------------------------
    // Store operations used by the scan controller
    // -------------------------------------------------------------------------

    /// Looks up a user by exact code.
    pub async fn find_user(&self, code: &str) -> DbResult<Option<User>> {
        self.users().find_by_code(code).await
    }

    /// Looks up a product (with its stored quantity) by exact code.
    pub async fn find_product(&self, code: &str) -> DbResult<Option<Product>> {
        self.products().find_by_code(code).await
    }

    /// Appends one ledger row. Durable when this returns.
    pub async fn append_ledger_entry(
        &self,
        user_code: &str,
        product_code: &str,
        quantity: i64,
        activity: Activity,
        recorded_at: chrono::NaiveDateTime,
    ) -> DbResult<LedgerEntry> {
        self.ledger()
            .append(user_code, product_code, quantity, activity, recorded_at)
            .await
    }

    /// Overwrites the stored quantity of a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No product has this code
    pub async fn update_product_quantity(&self, code: &str, quantity: i64) -> DbResult<()> {
        self.products().update_quantity(code, quantity).await
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

/// Makes sure the parent directory exists. Returns whether the file is new.
async fn prepare_file(path: &Path) -> DbResult<bool> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    if exists {
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{}: {}", parent.display(), e)))?;
    }

    info!(path = %path.display(), "Store not found, creating a new one");
    Ok(true)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.was_created());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[test]
    fn test_config_paths() {
        let config = DbConfig::new("/tmp/test.db");

        assert_eq!(config.max_connections, 1);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_missing_file_is_bootstrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tally.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(db.was_created());
        assert!(path.exists());

        // Tables exist and are empty
        assert_eq!(db.users().count().await.unwrap(), 0);
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert_eq!(db.ledger().count().await.unwrap(), 0);
        db.close().await;

        // Reopening finds the existing store
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(!db.was_created());
        assert_eq!(db.users().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_store_operations_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert(&User::new("U1", "Anna")).await.unwrap();
        db.products()
            .insert(&Product::new("P1", "Drill", 5))
            .await
            .unwrap();

        assert_eq!(db.find_user("U1").await.unwrap().unwrap().name, "Anna");
        assert!(db.find_user("P1").await.unwrap().is_none());

        db.update_product_quantity("P1", 3).await.unwrap();
        assert_eq!(db.find_product("P1").await.unwrap().unwrap().quantity, 3);

        let missing = db.update_product_quantity("NOPE", 1).await;
        assert!(matches!(missing, Err(DbError::NotFound { .. })));
    }
}
