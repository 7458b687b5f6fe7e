//! # Sync Configuration
//!
//! Configuration management for the sales sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line (--database) in sales-loader (highest priority)       │
//! │                                                                         │
//! │  2. Environment Variables (.env loaded first if present)               │
//! │     DIGISELLER_SELLER_ID=123456                                        │
//! │     DIGISELLER_API_KEY=...                                             │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/sales-loader/sales-loader.toml (Linux)                   │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     5 minute interval, 500 rows per page, public API URL               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [digiseller]
//! seller_id = "123456"
//! api_key = "secret"
//! base_url = "https://api.digiseller.com/api"
//! page_size = 500
//! max_pages = 20
//! request_timeout_secs = 60
//! token_ttl_secs = 6600
//!
//! [schedule]
//! interval_secs = 300
//! max_backoff_secs = 3600
//!
//! [database]
//! path = "/var/lib/sales-loader/sales.db"
//! max_connections = 5
//! ```
//!
//! Missing credentials are not a load error. A pass without them fails
//! with [`SyncError::MissingCredentials`] and leaves an audit entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// Public Digiseller API root.
pub const DEFAULT_API_URL: &str = "https://api.digiseller.com/api";

// =============================================================================
// Credentials
// =============================================================================

/// Seller id and API key, both present.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub seller_id: String,
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("seller_id", &self.seller_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Digiseller Settings
// =============================================================================

/// Remote API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DigisellerSettings {
    #[serde(default)]
    pub seller_id: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// API root; `/apilogin` and `/seller-sells/v2` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Rows requested per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on pages fetched in one pass.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout. Login uses at most 30 seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long a login token is reused. Kept below the server's 2 hours.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_page_size() -> u32 {
    500
}
fn default_max_pages() -> u32 {
    20
}
fn default_request_timeout() -> u64 {
    60
}
fn default_token_ttl() -> u64 {
    6600
}

impl Default for DigisellerSettings {
    fn default() -> Self {
        DigisellerSettings {
            seller_id: None,
            api_key: None,
            base_url: default_base_url(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            request_timeout_secs: default_request_timeout(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl fmt::Debug for DigisellerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigisellerSettings")
            .field("seller_id", &self.seller_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

impl DigisellerSettings {
    /// Returns both credentials or names the first one missing.
    pub fn credentials(&self) -> SyncResult<Credentials> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let seller_id =
            present(&self.seller_id).ok_or(SyncError::MissingCredentials("seller_id"))?;
        let api_key = present(&self.api_key).ok_or(SyncError::MissingCredentials("api_key"))?;

        Ok(Credentials { seller_id, api_key })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

// =============================================================================
// Schedule Settings
// =============================================================================

/// Background loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Delay between passes after a successful pass.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Ceiling for the delay after consecutive failures.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_interval() -> u64 {
    300
}
fn default_max_backoff() -> u64 {
    3600
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            interval_secs: default_interval(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl ScheduleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Local store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `sales.db` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// Configured path, else the platform data directory, else `./sales.db`.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            project_dirs()
                .map(|dirs| dirs.data_dir().join("sales.db"))
                .unwrap_or_else(|| PathBuf::from("sales.db"))
        })
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub digiseller: DigisellerSettings,

    #[serde(default)]
    pub schedule: ScheduleSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl SyncConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sales-loader.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else if explicit {
                return Err(SyncError::ConfigLoadFailed(format!(
                    "config file not found: {}",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = url::Url::parse(&self.digiseller.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.digiseller.base_url
            )));
        }

        if self.digiseller.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page_size must be greater than 0".into(),
            ));
        }

        if self.digiseller.max_pages == 0 {
            return Err(SyncError::InvalidConfig(
                "max_pages must be greater than 0".into(),
            ));
        }

        if self.digiseller.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.schedule.interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "interval_secs must be greater than 0".into(),
            ));
        }

        if self.schedule.max_backoff_secs < self.schedule.interval_secs {
            return Err(SyncError::InvalidConfig(
                "max_backoff_secs must not be below interval_secs".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("DIGISELLER_SELLER_ID") {
            debug!(seller_id = %id, "Overriding seller id from environment");
            self.digiseller.seller_id = Some(id);
        }

        if let Ok(key) = std::env::var("DIGISELLER_API_KEY") {
            self.digiseller.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("DIGISELLER_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.digiseller.base_url = url;
        }

        if let Ok(rows) = std::env::var("DIGISELLER_PAGE_SIZE") {
            match rows.parse::<u32>() {
                Ok(n) => self.digiseller.page_size = n,
                Err(_) => warn!(value = %rows, "Ignoring invalid DIGISELLER_PAGE_SIZE"),
            }
        }

        if let Ok(secs) = std::env::var("SALES_SYNC_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(n) => {
                    debug!(interval_secs = n, "Overriding sync interval from environment");
                    self.schedule.interval_secs = n;
                    self.schedule.max_backoff_secs = self.schedule.max_backoff_secs.max(n);
                }
                Err(_) => warn!(value = %secs, "Ignoring invalid SALES_SYNC_INTERVAL_SECS"),
            }
        }

        if let Ok(path) = std::env::var("SALES_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("sales-loader.toml"))
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "digisales", "sales-loader")
}
