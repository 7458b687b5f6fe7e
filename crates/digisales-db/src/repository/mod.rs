//! # Repository Module
//!
//! Database repository implementations for the sales store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Sync pass / operator CLI                                              │
//! │       │                                                                 │
//! │       │  db.sales().insert_if_absent(&sale)                            │
//! │       ▼                                                                 │
//! │  SaleRepository                      SyncLogRepository                 │
//! │  ├── insert_if_absent(sale)          ├── append(n, note, errors)       │
//! │  ├── latest_payment_time()           ├── recent(limit)                 │
//! │  ├── latest_order_time()             └── count()                       │
//! │  ├── get_by_invoice_id(id)                                             │
//! │  ├── search(term, limit)                                               │
//! │  └── count()                                                           │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`sale::SaleRepository`] - Idempotent inserts, watermark queries, search
//! - [`sync_log::SyncLogRepository`] - Append-only sync audit trail

pub mod sale;
pub mod sync_log;
