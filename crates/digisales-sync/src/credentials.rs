//! # Credential Cache
//!
//! Obtains and caches the short-lived Digiseller API token.
//!
//! ## Token Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      get_token()                                        │
//! │                                                                         │
//! │  TokenCache::get() ── hit (now < expires_at) ──────────► token          │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  credentials configured? ── no ──► SyncError::MissingCredentials        │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  acquire login lock, re-check cache (another caller may have won)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  POST /apilogin { seller_id, timestamp, sign }                          │
//! │       │      sign = sha256_hex(api_key + timestamp)                     │
//! │       ├── retval == 0 ──► TokenCache::set(token, ttl) ──► token         │
//! │       └── otherwise   ──► SyncError::RemoteAuth                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache TTL (default 1 h 50 min) sits below the server's 2 hour token
//! lifetime, so a cached token is never presented after the server expired it.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::DigisellerClient;
use crate::config::{Credentials, DigisellerSettings};
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Token Cache
// =============================================================================

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// In-memory token slot with an absolute expiry.
///
/// Shared through `Arc` between the scheduler and the manual trigger.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the token while `now < expiry`. Expired entries are dropped.
    pub async fn get(&self) -> Option<String> {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(token) if Instant::now() < token.expires_at => Some(token.value.clone()),
            Some(_) => {
                debug!("Cached token expired");
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Stores a token valid for `ttl` from now.
    pub async fn set(&self, value: impl Into<String>, ttl: Duration) {
        *self.slot.lock().await = Some(CachedToken {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        });
    }

    /// Forgets the cached token.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

// =============================================================================
// Login Signature
// =============================================================================

/// `sha256_hex(api_key + timestamp)`, as the login endpoint expects.
pub fn sign(api_key: &str, timestamp: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hasher.update(timestamp.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Credential Provider
// =============================================================================

/// Hands out valid tokens, logging in only when the cache is empty.
pub struct CredentialProvider {
    client: DigisellerClient,
    /// Configured credentials, or the name of the missing field.
    credentials: Result<Credentials, &'static str>,
    cache: Arc<TokenCache>,
    ttl: Duration,
    /// Serializes check-then-login so concurrent misses log in once.
    login_lock: Mutex<()>,
}

impl CredentialProvider {
    /// Builds a provider from settings. Missing credentials are reported on
    /// the first [`get_token`](Self::get_token) call, not here.
    pub fn new(
        client: DigisellerClient,
        settings: &DigisellerSettings,
        cache: Arc<TokenCache>,
    ) -> Self {
        CredentialProvider {
            client,
            credentials: settings.credentials().map_err(|err| match err {
                SyncError::MissingCredentials(field) => field,
                _ => "credentials",
            }),
            cache,
            ttl: settings.token_ttl(),
            login_lock: Mutex::new(()),
        }
    }

    /// Returns the shared cache.
    pub fn cache(&self) -> Arc<TokenCache> {
        self.cache.clone()
    }

    /// Returns a valid token, logging in if needed.
    pub async fn get_token(&self) -> SyncResult<String> {
        if let Some(token) = self.cache.get().await {
            debug!("Using cached token");
            return Ok(token);
        }

        let credentials = self
            .credentials
            .as_ref()
            .map_err(|field| SyncError::MissingCredentials(*field))?;

        let _guard = self.login_lock.lock().await;

        // Double-check after acquiring the lock
        if let Some(token) = self.cache.get().await {
            return Ok(token);
        }

        let token = self.client.login(credentials).await?;
        self.cache.set(token.clone(), self.ttl).await;

        info!(
            seller_id = %credentials.seller_id,
            ttl_secs = self.ttl.as_secs(),
            "Logged in to Digiseller"
        );

        Ok(token)
    }
}
