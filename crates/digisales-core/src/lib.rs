//! # digisales-core: Pure Domain Logic for the Sales Sync Engine
//!
//! This crate holds everything about a Digiseller sale that can be decided
//! without touching the network or the database.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Sales Sync Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  sales-loader (binary)                          │   │
//! │  │          run (scheduler) / once (manual) / logs / search        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  digisales-sync (engine)                        │   │
//! │  │   token cache ─► client ─► normalizer ─► persister ─► sync log  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ digisales-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ normalize │  │  window   │  │ validation│  │   │
//! │  │   │   Sale    │  │ RawSaleRow│  │ watermark │  │   rules   │  │   │
//! │  │   │  SyncLog  │  │  → Sale   │  │  MSK time │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, SyncLog, row failures)
//! - [`normalize`] - Raw remote rows into canonical sales
//! - [`window`] - Remote time zone, timestamp format, fetch windows
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation
//!
//! ## Example Usage
//!
//! ```rust
//! use digisales_core::window::{next_window_start, sync_epoch};
//!
//! // Empty store: the first window starts at the integration epoch
//! let start = next_window_start(None, None);
//! assert_eq!(start, sync_epoch());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod normalize;
pub mod types;
pub mod validation;
pub mod window;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use normalize::{normalize, RawSaleRow};
pub use types::*;
pub use window::FetchWindow;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum stored length of an invoice id (matches the `sales.invoice_id` column).
pub const MAX_INVOICE_ID_LEN: usize = 50;

/// Maximum length of an operator search term.
pub const MAX_SEARCH_QUERY_LEN: usize = 100;
