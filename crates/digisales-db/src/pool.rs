//! # Sales Store
//!
//! Opens the SQLite file behind the sales table and the sync log.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DbConfig::new(path) ──► Database::new ──► migrations 001, 002         │
//! │                                │                                        │
//! │                                ├── sales()      ─► SaleRepository       │
//! │                                └── sync_logs()  ─► SyncLogRepository    │
//! │                                                                         │
//! │  scheduler pass: one short transaction per row                         │
//! │  operator CLI:   logs / search reads, possibly while a pass runs       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The journal runs in WAL mode so CLI reads never wait on a running pass.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::sale::SaleRepository;
use crate::repository::sync_log::SyncLogRepository;

/// Where the store lives and how many connections it may hold.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// Default 5: one pass writing plus operator reads.
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// A private store that disappears with the pool.
    ///
    /// Every connection to `:memory:` is its own database, so the pool is
    /// pinned to a single connection.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Handle to the store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening sales store");

        // mode=rwc creates the file on first open
        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let connect_options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        info!(max_connections = config.max_connections, "Sales store ready");
        Ok(Database { pool })
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn sync_logs(&self) -> SyncLogRepository {
        SyncLogRepository::new(self.pool.clone())
    }

    /// Waits for open connections to finish and closes the pool.
    pub async fn close(&self) {
        info!("Closing sales store");
        self.pool.close().await;
    }
}
