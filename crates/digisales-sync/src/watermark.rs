//! # Watermark Tracker
//!
//! Derives the start of the next fetch window from what is already stored.
//!
//! ```text
//! MAX(date_pay) ──some──► + 1s ──┐
//!      │ none                    │
//!      ▼                         ├──► window start (remote zone)
//! MAX(date_put) ──some──► + 1s ──┤
//!      │ none                    │
//!      ▼                         │
//! 2020-01-01 00:00:00 (remote) ──┘
//! ```
//!
//! Nothing is persisted besides the sales themselves, so the watermark can
//! only move forward as rows are inserted.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::error::SyncResult;
use digisales_core::window::{next_window_start, to_remote};
use digisales_core::FetchWindow;
use digisales_db::SaleRepository;

/// Computes fetch windows from the sales store.
#[derive(Debug, Clone)]
pub struct Watermark {
    sales: SaleRepository,
}

impl Watermark {
    pub fn new(sales: SaleRepository) -> Self {
        Watermark { sales }
    }

    /// Start of the next window, in the remote zone.
    pub async fn next_window_start(&self) -> SyncResult<DateTime<FixedOffset>> {
        let latest_pay = self.sales.latest_payment_time().await?;
        // Only consulted when no stored sale has been paid
        let latest_put = match latest_pay {
            Some(_) => None,
            None => self.sales.latest_order_time().await?,
        };

        Ok(next_window_start(latest_pay, latest_put))
    }

    /// "Now" in the remote zone.
    pub fn window_end(&self) -> DateTime<FixedOffset> {
        to_remote(Utc::now())
    }

    /// Window from the current watermark up to now.
    pub async fn next_window(&self) -> SyncResult<FetchWindow> {
        let window = FetchWindow {
            start: self.next_window_start().await?,
            end: self.window_end(),
        };

        debug!(
            date_start = %window.date_start(),
            date_finish = %window.date_finish(),
            "Computed fetch window"
        );

        Ok(window)
    }
}
