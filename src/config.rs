//! Configuration types for the ros3 driver.
//!
//! Two layers:
//!
//! - [`Ros3Config`] is the per-open access configuration: whether to
//!   authenticate and with which region and key pair. It is validated
//!   before any network activity.
//! - [`DriverSettings`] are process-level tunables (cache bound, stats,
//!   transport timeouts, logging) read from a YAML file. Every field has
//!   a default, so an empty file is a valid configuration.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::Deserialize;

use crate::auth::Credentials;
use crate::cache::MAX_CACHE_BYTES;
use crate::credentials::ProfileCredentials;
use crate::errors::{Result, Ros3Error};

// -- Access configuration ----------------------------------------------------

/// Per-open access configuration.
#[derive(Clone, Default, Deserialize, Validate)]
pub struct Ros3Config {
    /// Sign requests with the key pair below.
    #[garde(skip)]
    #[serde(default)]
    pub authenticate: bool,

    /// AWS region of the bucket, e.g. `us-east-1`. At most 32 bytes.
    #[garde(length(max = 32))]
    #[serde(default)]
    pub aws_region: String,

    /// Access key id. At most 128 bytes.
    #[garde(length(max = 128))]
    #[serde(default)]
    pub secret_id: String,

    /// Secret access key. At most 128 bytes.
    #[garde(length(max = 128))]
    #[serde(default)]
    pub secret_key: String,

    /// Session token for temporary credentials.
    #[garde(skip)]
    #[serde(default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for Ros3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ros3Config")
            .field("authenticate", &self.authenticate)
            .field("aws_region", &self.aws_region)
            .field("secret_id", &self.secret_id)
            .field("secret_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Ros3Config {
    /// Anonymous access.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Authenticated access with the given region and key pair.
    pub fn authenticated(region: &str, secret_id: &str, secret_key: &str) -> Self {
        Self {
            authenticate: true,
            aws_region: region.to_string(),
            secret_id: secret_id.to_string(),
            secret_key: secret_key.to_string(),
            session_token: None,
        }
    }

    /// Authenticated access from a credential-file profile.
    pub fn from_profile(profile: &ProfileCredentials) -> Self {
        Self {
            session_token: profile.session_token.clone(),
            ..Self::authenticated(&profile.region, &profile.access_key_id, &profile.secret_access_key)
        }
    }

    /// Check field lengths, and that authenticated access names a region
    /// and an access id.
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()
            .map_err(|report| Ros3Error::InvalidConfig(report.to_string()))?;
        if self.authenticate {
            if self.aws_region.is_empty() {
                return Err(Ros3Error::InvalidConfig(
                    "authentication requires a region".to_string(),
                ));
            }
            if self.secret_id.is_empty() {
                return Err(Ros3Error::InvalidConfig(
                    "authentication requires an access key id".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Signing material for a handle opened at `now`, or `None` for
    /// anonymous access.
    pub fn credentials(&self, now: DateTime<Utc>) -> Result<Option<Credentials>> {
        self.ensure_valid()?;
        if !self.authenticate {
            return Ok(None);
        }
        if self.secret_key.is_empty() {
            return Err(Ros3Error::InvalidCredentials(
                "secret key cannot be empty".to_string(),
            ));
        }
        let credentials = Credentials::from_secret(&self.aws_region, &self.secret_id, &self.secret_key, now)?
            .with_session_token(self.session_token.clone());
        Ok(Some(credentials))
    }
}

// -- Driver settings ---------------------------------------------------------

/// Top-level driver settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverSettings {
    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub stats: StatsSettings,

    #[serde(default)]
    pub transport: TransportSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Front-of-file cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Prime the cache at open.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on the cached prefix in bytes (default 16 MiB).
    #[serde(default = "default_cache_max_bytes")]
    pub max_bytes: u64,
}

impl CacheSettings {
    /// Bytes to cache, with `enabled = false` meaning zero.
    pub fn effective_max_bytes(&self) -> u64 {
        if self.enabled {
            self.max_bytes
        } else {
            0
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_bytes: default_cache_max_bytes(),
        }
    }
}

/// Read statistics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsSettings {
    /// Collect size histograms and log them at close.
    #[serde(default)]
    pub enabled: bool,
}

/// HTTP client settings. Only the first handle opened in a process
/// applies them; later handles share that client.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_cache_max_bytes() -> u64 {
    MAX_CACHE_BYTES
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    concat!("ros3/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Loader ------------------------------------------------------------------

/// Load and parse driver settings from a YAML file at `path`.
pub fn load_settings<P: AsRef<Path>>(path: P) -> anyhow::Result<DriverSettings> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let settings: DriverSettings = serde_yaml::from_str(&contents)?;
    Ok(settings)
}
