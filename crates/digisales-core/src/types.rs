//! # Domain Types
//!
//! Core domain types used throughout the sales sync engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    NewSale      │   │      Sale       │   │    SyncLog      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  invoice_id     │──►│  id (UUID)      │   │  id (UUID)      │       │
//! │  │  product_id     │   │  invoice_id     │   │  timestamp      │       │
//! │  │  date_put/pay   │   │  ...            │   │  orders_loaded  │       │
//! │  │  amounts ...    │   │  created_at     │   │  note / errors  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   RowFailure    │   │  SyncLogNote    │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  invoice_id?    │   │  AutomaticLoad  │                             │
//! │  │  Rejected       │   │  ManualLoad     │                             │
//! │  │  Persistence    │   │  ApiError       │                             │
//! │  └─────────────────┘   │  PassFailed     │                             │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every persisted entity has:
//! - `id`: UUID v4, assigned locally, never sent to the remote API
//! - Business ID: `invoice_id` for sales, globally unique on the remote side

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// =============================================================================
// Sale
// =============================================================================

/// A canonical sale produced by the normalizer, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSale {
    /// Natural key on the remote platform.
    pub invoice_id: String,
    pub product_id: i64,
    pub product_name: String,
    /// Delivered content (licence key, file link, ...). Opaque.
    pub product_entry: String,
    /// Order creation time, stamped with the remote zone.
    pub date_put: DateTime<FixedOffset>,
    /// Payment time. `None` when the remote omitted it.
    pub date_pay: Option<DateTime<FixedOffset>>,
    pub email: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub currency: String,
    pub payment_method: String,
    pub aggregator: String,
    pub ip: String,
    pub partner_id: i64,
    pub lang: String,
}

/// A persisted external order/payment.
///
/// Created once by the persister and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Natural key on the remote platform (unique).
    pub invoice_id: String,

    pub product_id: i64,
    pub product_name: String,
    pub product_entry: String,

    /// Order creation time (UTC in storage).
    pub date_put: DateTime<Utc>,

    /// Payment time (UTC in storage).
    pub date_pay: Option<DateTime<Utc>>,

    pub email: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub currency: String,
    pub payment_method: String,
    pub aggregator: String,
    pub ip: String,
    pub partner_id: i64,
    pub lang: String,

    /// When the row was written locally.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sync Log
// =============================================================================

/// Classification of a sync attempt, stored as the log's `note`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncLogNote {
    /// Scheduled pass that reached the persistence stage.
    AutomaticLoad,
    /// Operator-triggered pass that reached the persistence stage.
    ManualLoad,
    /// The remote API rejected login or returned a bad response.
    ApiError,
    /// Any other pass-level failure (configuration, storage, transport).
    PassFailed,
}

impl SyncLogNote {
    /// Returns the string stored in the `note` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLogNote::AutomaticLoad => "automatic load",
            SyncLogNote::ManualLoad => "manual load",
            SyncLogNote::ApiError => "remote API error",
            SyncLogNote::PassFailed => "pass failed",
        }
    }
}

impl fmt::Display for SyncLogNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record per synchronization attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLog {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Rows actually inserted by the pass (skips and rejects excluded).
    pub orders_loaded: i64,
    pub note: String,
    /// Row and pass errors joined with `"; "`. Empty on a clean pass.
    pub errors: String,
}

// =============================================================================
// Row Failures
// =============================================================================

/// Why a single remote row did not end up in storage.
#[derive(Debug, Clone, PartialEq)]
pub enum RowFailureKind {
    /// The normalizer refused the row.
    Rejected(ValidationError),
    /// The insert failed for a reason other than a duplicate key.
    Persistence(String),
}

/// A failure scoped to one row. Never escalates beyond the pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Invoice id of the row, when the remote sent a usable one.
    pub invoice_id: Option<String>,
    pub kind: RowFailureKind,
}

impl RowFailure {
    pub fn rejected(invoice_id: Option<String>, error: ValidationError) -> Self {
        RowFailure {
            invoice_id,
            kind: RowFailureKind::Rejected(error),
        }
    }

    pub fn persistence(invoice_id: impl Into<String>, message: impl Into<String>) -> Self {
        RowFailure {
            invoice_id: Some(invoice_id.into()),
            kind: RowFailureKind::Persistence(message.into()),
        }
    }
}

impl fmt::Display for RowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.invoice_id.as_deref().unwrap_or("?");
        match &self.kind {
            RowFailureKind::Rejected(err) => write!(f, "invoice {id}: rejected: {err}"),
            RowFailureKind::Persistence(msg) => write!(f, "invoice {id}: insert failed: {msg}"),
        }
    }
}

/// Formats row failures for the audit log's `errors` column.
pub fn format_row_failures(failures: &[RowFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Unit Tests
// =============================================================================
