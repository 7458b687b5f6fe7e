//! # Sync Pipeline
//!
//! One synchronization pass, shared by the scheduler and the manual trigger.
//!
//! ## Pass Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         run_pass(trigger)                               │
//! │                                                                         │
//! │  1. CredentialProvider::get_token()      ── config / auth failure ──┐   │
//! │  2. Watermark::next_window()             ── storage failure ────────┤   │
//! │  3. DigisellerClient::fetch_window()     ── remote failure ─────────┤   │
//! │  4. for each raw row:                                               │   │
//! │       normalize() ── rejected ──► RowFailure                        │   │
//! │       insert_if_absent()                                            │   │
//! │         ├── Inserted ──► inserted += 1                              │   │
//! │         ├── Skipped  ──► skipped += 1   (already stored)            │   │
//! │         └── Err      ──► RowFailure                                 │   │
//! │                                                                     │   │
//! │  5. SyncLogRepository::append()  ◄──────────────────────────────────┘   │
//! │       exactly one entry per pass, success or not                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row failures never abort the pass. Pass failures never escape `run_pass`.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::client::DigisellerClient;
use crate::config::SyncConfig;
use crate::credentials::{CredentialProvider, TokenCache};
use crate::error::{SyncError, SyncResult};
use crate::watermark::Watermark;
use digisales_core::{
    format_row_failures, normalize, FetchWindow, RowFailure, SyncLog, SyncLogNote,
};
use digisales_db::{Database, InsertOutcome, SaleRepository, SyncLogRepository};

// =============================================================================
// Trigger
// =============================================================================

/// What started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The scheduler loop.
    Scheduled,
    /// An operator, through the one-shot entry point.
    Manual,
}

impl Trigger {
    /// Note recorded when the pass reaches the persistence stage.
    pub fn success_note(self) -> SyncLogNote {
        match self {
            Trigger::Scheduled => SyncLogNote::AutomaticLoad,
            Trigger::Manual => SyncLogNote::ManualLoad,
        }
    }
}

// =============================================================================
// Pass Report
// =============================================================================

/// Outcome of one pass, as returned to the caller.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub trigger: Trigger,
    /// Rows received from the remote.
    pub fetched: usize,
    pub inserted: u64,
    /// Rows whose invoice id was already stored.
    pub skipped: u64,
    pub failures: Vec<RowFailure>,
    /// Sub-windows that hit the page ceiling and may be missing rows.
    pub truncated: Vec<FetchWindow>,
    /// Pass-level error text, if the pass failed.
    pub error: Option<String>,
    pub note: SyncLogNote,
    /// The audit entry, unless writing it failed.
    pub log: Option<SyncLog>,
    pub elapsed: Duration,
}

impl PassReport {
    /// True when the pass reached the persistence stage.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct PassTally {
    fetched: usize,
    inserted: u64,
    skipped: u64,
    failures: Vec<RowFailure>,
    truncated: Vec<FetchWindow>,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Runs synchronization passes against one store and one remote account.
pub struct SyncPipeline {
    client: DigisellerClient,
    credentials: Arc<CredentialProvider>,
    watermark: Watermark,
    sales: SaleRepository,
    logs: SyncLogRepository,
}

impl SyncPipeline {
    pub fn new(
        db: &Database,
        client: DigisellerClient,
        credentials: Arc<CredentialProvider>,
    ) -> Self {
        SyncPipeline {
            client,
            credentials,
            watermark: Watermark::new(db.sales()),
            sales: db.sales(),
            logs: db.sync_logs(),
        }
    }

    /// Builds the client and credential provider from configuration.
    ///
    /// `cache` is shared with any other pipeline for the same account.
    pub fn from_config(
        config: &SyncConfig,
        db: &Database,
        cache: Arc<TokenCache>,
    ) -> SyncResult<Self> {
        let client = DigisellerClient::new(&config.digiseller)?;
        let credentials = Arc::new(CredentialProvider::new(
            client.clone(),
            &config.digiseller,
            cache,
        ));
        Ok(Self::new(db, client, credentials))
    }

    pub fn credentials(&self) -> &Arc<CredentialProvider> {
        &self.credentials
    }

    /// Runs one pass and records it in the sync log.
    pub async fn run_pass(&self, trigger: Trigger) -> PassReport {
        let started = Instant::now();

        let (tally, error, note) = match self.execute().await {
            Ok(tally) => (tally, None, trigger.success_note()),
            Err(err) => {
                if invalidates_token(&err) {
                    self.credentials.cache().clear().await;
                }
                let note = if err.is_remote_error() {
                    SyncLogNote::ApiError
                } else {
                    SyncLogNote::PassFailed
                };
                (PassTally::default(), Some(err.to_string()), note)
            }
        };

        let errors = match &error {
            Some(message) => message.clone(),
            None => audit_errors(&tally),
        };

        let log = match self
            .logs
            .append(tally.inserted as i64, note.as_str(), &errors)
            .await
        {
            Ok(entry) => Some(entry),
            Err(err) => {
                error!(error = %err, "Failed to write sync log entry");
                None
            }
        };

        let report = PassReport {
            trigger,
            fetched: tally.fetched,
            inserted: tally.inserted,
            skipped: tally.skipped,
            failures: tally.failures,
            truncated: tally.truncated,
            error,
            note,
            log,
            elapsed: started.elapsed(),
        };

        match &report.error {
            None => info!(
                ?trigger,
                fetched = report.fetched,
                inserted = report.inserted,
                skipped = report.skipped,
                rejected = report.failures.len(),
                truncated_windows = report.truncated.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Loaded {} orders",
                report.inserted
            ),
            Some(message) => warn!(?trigger, note = %note, error = %message, "Sync pass failed"),
        }

        report
    }

    /// Writes the audit entry for a pass that died before recording itself.
    pub async fn record_aborted(&self, trigger: Trigger, message: &str) -> Option<SyncLog> {
        match self
            .logs
            .append(0, SyncLogNote::PassFailed.as_str(), message)
            .await
        {
            Ok(entry) => Some(entry),
            Err(err) => {
                error!(?trigger, error = %err, "Failed to record aborted pass");
                None
            }
        }
    }

    async fn execute(&self) -> SyncResult<PassTally> {
        let token = self.credentials.get_token().await?;
        let window = self.watermark.next_window().await?;
        let fetched = self.client.fetch_window(&token, &window).await?;

        let mut tally = PassTally {
            fetched: fetched.rows.len(),
            truncated: fetched.truncated,
            ..PassTally::default()
        };

        for raw in &fetched.rows {
            let sale = match normalize(raw) {
                Ok(sale) => sale,
                Err(failure) => {
                    debug!(%failure, "Row rejected");
                    tally.failures.push(failure);
                    continue;
                }
            };

            match self.sales.insert_if_absent(&sale).await {
                Ok(InsertOutcome::Inserted) => tally.inserted += 1,
                Ok(InsertOutcome::Skipped) => tally.skipped += 1,
                Err(err) => {
                    warn!(invoice_id = %sale.invoice_id, error = %err, "Failed to store sale");
                    tally
                        .failures
                        .push(RowFailure::persistence(&sale.invoice_id, err.to_string()));
                }
            }
        }

        Ok(tally)
    }
}

/// Row failures, then any windows the listing could not fully read.
fn audit_errors(tally: &PassTally) -> String {
    let mut parts = Vec::new();
    if !tally.failures.is_empty() {
        parts.push(format_row_failures(&tally.failures));
    }
    for window in &tally.truncated {
        parts.push(format!(
            "window {} .. {}: page limit reached, rows may be missing",
            window.date_start(),
            window.date_finish()
        ));
    }
    parts.join("; ")
}

/// A listing answer that suggests the cached token went bad server-side.
fn invalidates_token(err: &SyncError) -> bool {
    matches!(
        err,
        SyncError::RemoteHttp {
            status: 401 | 403,
            ..
        } | SyncError::RemoteData(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_notes() {
        assert_eq!(Trigger::Scheduled.success_note(), SyncLogNote::AutomaticLoad);
        assert_eq!(Trigger::Manual.success_note(), SyncLogNote::ManualLoad);
    }

    #[test]
    fn test_token_invalidation() {
        assert!(invalidates_token(&SyncError::RemoteHttp {
            status: 401,
            body: String::new()
        }));
        assert!(invalidates_token(&SyncError::RemoteData("retval 2".into())));
        assert!(!invalidates_token(&SyncError::RemoteHttp {
            status: 503,
            body: String::new()
        }));
        assert!(!invalidates_token(&SyncError::Timeout(60)));
    }

    #[test]
    fn test_audit_errors_mention_truncated_windows() {
        use digisales_core::window::parse_remote_timestamp;

        let at = parse_remote_timestamp("at", "2024-05-01 10:00:00").unwrap();
        let tally = PassTally {
            failures: vec![RowFailure::persistence("7", "locked")],
            truncated: vec![FetchWindow { start: at, end: at }],
            ..PassTally::default()
        };

        assert_eq!(
            audit_errors(&tally),
            "invoice 7: insert failed: locked; \
             window 2024-05-01 10:00:00 .. 2024-05-01 10:00:00: page limit reached, rows may be missing"
        );
        assert_eq!(audit_errors(&PassTally::default()), "");
    }
}
