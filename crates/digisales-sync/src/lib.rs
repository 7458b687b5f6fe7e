//! # digisales-sync: Sync Engine for Digiseller Sales
//!
//! This crate incrementally pulls orders from the Digiseller API, stores
//! them idempotently, and records one audit entry per attempt.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sales Sync Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────┐          ┌──────────────────────────────┐    │
//! │  │  Scheduler           │          │  Manual trigger              │    │
//! │  │  (background task)   │          │  (sales-loader once)         │    │
//! │  └──────────┬───────────┘          └──────────────┬───────────────┘    │
//! │             │ Trigger::Scheduled                  │ Trigger::Manual    │
//! │             └──────────────────┬──────────────────┘                    │
//! │                                ▼                                        │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncPipeline::run_pass                      │  │
//! │  └──────┬───────────────┬───────────────┬───────────────┬──────────┘  │
//! │         ▼               ▼               ▼               ▼              │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────────────┐   │
//! │  │ Credential │  │ Watermark  │  │ Digiseller │  │ normalize +    │   │
//! │  │ Provider   │  │            │  │ Client     │  │ SaleRepository │   │
//! │  │            │  │ MAX(pay)   │  │            │  │ + SyncLog      │   │
//! │  │ TokenCache │  │ ?? MAX(put)│  │ login,     │  │                │   │
//! │  │ (shared)   │  │ ?? epoch   │  │ pages      │  │ one tx per row │   │
//! │  └────────────┘  └────────────┘  └────────────┘  └────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`client`] - Digiseller HTTP calls (login, paginated listing)
//! - [`config`] - Engine configuration (TOML + environment)
//! - [`credentials`] - Token cache and login signing
//! - [`error`] - Sync error types
//! - [`pipeline`] - One synchronization pass
//! - [`scheduler`] - Background loop with backoff and shutdown
//! - [`watermark`] - Fetch window computation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use digisales_sync::{Scheduler, SyncConfig, SyncPipeline, TokenCache, Trigger};
//!
//! let config = SyncConfig::load(None)?;
//! let pipeline = Arc::new(SyncPipeline::from_config(&config, &db, Arc::new(TokenCache::new()))?);
//!
//! // One pass
//! let report = pipeline.run_pass(Trigger::Manual).await;
//!
//! // Or forever
//! let handle = Scheduler::new(pipeline, &config.schedule).spawn();
//! handle.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod watermark;

// =============================================================================
// Re-exports
// =============================================================================

pub use client::{DigisellerClient, WindowRows};
pub use config::{
    Credentials, DatabaseSettings, DigisellerSettings, ScheduleSettings, SyncConfig,
    DEFAULT_API_URL,
};
pub use credentials::{sign, CredentialProvider, TokenCache};
pub use error::{SyncError, SyncResult};
pub use pipeline::{PassReport, SyncPipeline, Trigger};
pub use scheduler::{RetryDelay, Scheduler, SchedulerHandle, SchedulerState, SchedulerStatus};
pub use watermark::Watermark;
