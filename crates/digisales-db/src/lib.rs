//! # digisales-db: Database Layer for the Sales Sync Engine
//!
//! This crate provides storage for synchronized sales and the sync audit log.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sales Sync Data Flow                             │
//! │                                                                         │
//! │  Sync pass (digisales-sync)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   digisales-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │ 001_sales    │  │   │
//! │  │   │ SqlitePool    │◄───│ SyncLogRepo   │    │ 002_sales_log│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/sales.db                                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sales, sync log)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use digisales_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("sales.db")).await?;
//!
//! let latest = db.sales().latest_payment_time().await?;
//! let history = db.sync_logs().recent(20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::sale::{InsertOutcome, SaleRepository};
pub use repository::sync_log::SyncLogRepository;
