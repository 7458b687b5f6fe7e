//! # Sync Error Types
//!
//! Error types for synchronization passes.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Remote API    │  │     Transport           │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RemoteAuth     │  │  Transport              │ │
//! │  │  Missing creds  │  │  RemoteHttp     │  │  Timeout                │ │
//! │  │  InvalidUrl     │  │  RemoteData     │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Database     │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  DatabaseError  │  │  panicked task  │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! │                                                                         │
//! │  Row-level problems are NOT SyncErrors: they are collected as          │
//! │  `RowFailure`s and never abort a pass.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Pass-level failures of the sales sync engine.
///
/// ## Design Principles
/// - Each variant includes enough context for the audit log
/// - Errors are categorized for different handling strategies
/// - All errors are `Send + Sync` for async compatibility
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Seller id or API key is not set.
    #[error("Digiseller credentials not configured: {0} is missing")]
    MissingCredentials(&'static str),

    /// Invalid API base URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Remote API Errors
    // =========================================================================
    /// Login was answered but rejected (`retval != 0`).
    #[error("Digiseller login rejected (retval {retval}): {payload}")]
    RemoteAuth { retval: i64, payload: String },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    RemoteHttp { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("Unexpected response from Digiseller: {0}")]
    RemoteData(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Network failure before a response arrived.
    #[error("Request failed: {0}")]
    Transport(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Storage failure outside a single row (watermark query, audit write).
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A task died before returning (panic or cancellation).
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<digisales_db::DbError> for SyncError {
    fn from(err: digisales_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::RemoteData(err.to_string())
        } else if err.is_timeout() {
            SyncError::Transport(format!("timeout: {err}"))
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::RemoteData(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if a later pass may succeed without operator action.
    ///
    /// ## Retryable Errors
    /// - Network failures and timeouts
    /// - 5xx and 429 responses
    /// - Database errors (locked file, full disk)
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Rejected login (wrong key)
    /// - 4xx responses
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport(_) | SyncError::Timeout(_) | SyncError::DatabaseError(_) => true,
            SyncError::RemoteHttp { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::MissingCredentials(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
        )
    }

    /// Returns true if the remote API answered, but not usefully.
    pub fn is_remote_error(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteAuth { .. } | SyncError::RemoteHttp { .. } | SyncError::RemoteData(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Transport("connection reset".into()).is_retryable());
        assert!(SyncError::Timeout(60).is_retryable());
        assert!(SyncError::RemoteHttp {
            status: 503,
            body: String::new()
        }
        .is_retryable());

        assert!(!SyncError::RemoteHttp {
            status: 401,
            body: String::new()
        }
        .is_retryable());
        assert!(!SyncError::MissingCredentials("seller_id").is_retryable());
        assert!(!SyncError::RemoteAuth {
            retval: 1,
            payload: "{}".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_categories() {
        assert!(SyncError::MissingCredentials("api_key").is_config_error());
        assert!(SyncError::InvalidUrl("x".into()).is_config_error());
        assert!(!SyncError::Transport("x".into()).is_config_error());

        assert!(SyncError::RemoteData("no rows".into()).is_remote_error());
        assert!(!SyncError::Transport("x".into()).is_remote_error());
    }

    #[test]
    fn test_error_display() {
        let err = SyncError::RemoteHttp {
            status: 500,
            body: "oops".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: oops");

        let err = SyncError::RemoteAuth {
            retval: 1,
            payload: r#"{"retval":1}"#.into(),
        };
        assert!(err.to_string().contains("retval 1"));

        let err: SyncError = digisales_db::DbError::PoolExhausted.into();
        assert!(matches!(err, SyncError::DatabaseError(_)));
    }
}
