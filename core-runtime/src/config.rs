//! # Core Configuration Module
//!
//! Provides configuration management for the streaming core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the caller's credentials, tuning knobs and the injected
//! bridges. It enforces fail-fast validation so a misconfigured core never
//! reaches the network.
//!
//! ## Required Settings
//!
//! - `access_token` - the long-lived `arl` credential
//!
//! ## Optional Settings (with defaults)
//!
//! - `decryption_key` - 16-byte master secret; without it tracks cannot be streamed
//! - `refresh_interval` - session refresh cadence (24 h)
//! - `refresh_retry_backoff` - wait before the single refresh retry (3 s)
//! - `request_timeout` - bound on every remote call (30 s)
//! - `stripe_layout` - chunk size and stripe period (2048 / 3)
//! - `cipher_preference` - decryption backend selection (`Auto`)
//! - `audio_quality` - best format to ask for (`Lossless`)
//! - `HttpClient` - desktop default: reqwest
//!
//! When the `desktop-shims` feature is enabled, a reqwest-backed `HttpClient`
//! is injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .access_token(std::env::var("DEEZER_ARL")?)
//!     .decryption_key(std::env::var("DEEZER_SECRET")?)
//!     .refresh_interval(Duration::from_secs(6 * 3600))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: no access token
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing access token");
//! ```

use crate::error::{Error, Result};
use bridge_traits::HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default session refresh cadence.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default wait before retrying a failed refresh.
pub const DEFAULT_REFRESH_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Default bound on each remote call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Required master secret length in bytes.
pub const DECRYPTION_KEY_LEN: usize = 16;

const CIPHER_BLOCK_SIZE: usize = 8;

/// Chunk geometry of a striped stream.
///
/// Every `period`-th chunk of `chunk_size` bytes (starting with the first) is
/// encrypted; the rest pass through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeLayout {
    pub chunk_size: usize,
    pub period: u64,
}

impl StripeLayout {
    pub const DEFAULT_CHUNK_SIZE: usize = 2048;
    pub const DEFAULT_PERIOD: u64 = 3;

    pub fn new(chunk_size: usize, period: u64) -> Result<Self> {
        let layout = Self { chunk_size, period };
        layout.validate()?;
        Ok(layout)
    }

    /// Whether the chunk at `index` is encrypted.
    pub fn is_encrypted(&self, index: u64) -> bool {
        index % self.period == 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size % CIPHER_BLOCK_SIZE != 0 {
            return Err(Error::Config(format!(
                "Chunk size must be a non-zero multiple of {} bytes, got {}",
                CIPHER_BLOCK_SIZE, self.chunk_size
            )));
        }

        if self.period == 0 {
            return Err(Error::Config(
                "Stripe period must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for StripeLayout {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            period: Self::DEFAULT_PERIOD,
        }
    }
}

/// Which decryption backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherPreference {
    /// Library-backed cipher when compiled in, self-contained otherwise.
    #[default]
    Auto,
    /// Library-backed cipher only.
    Native,
    /// Self-contained cipher only.
    Soft,
}

/// Highest audio quality to request. Lower formats remain acceptable fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioQuality {
    Basic,
    Standard,
    High,
    #[default]
    Lossless,
}

/// Core configuration for the streaming core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Long-lived account credential (`arl` cookie value)
    pub access_token: String,

    /// 16-byte master secret used for per-track key derivation
    pub decryption_key: Option<String>,

    /// Session refresh cadence
    pub refresh_interval: Duration,

    /// Wait before the single retry of a failed refresh
    pub refresh_retry_backoff: Duration,

    /// Bound on each remote call
    pub request_timeout: Duration,

    pub stripe_layout: StripeLayout,

    pub cipher_preference: CipherPreference,

    pub audio_quality: AudioQuality,

    /// HTTP client for all remote calls
    pub http_client: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("access_token", &"[REDACTED]")
            .field(
                "decryption_key",
                &self.decryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("refresh_interval", &self.refresh_interval)
            .field("refresh_retry_backoff", &self.refresh_retry_backoff)
            .field("request_timeout", &self.request_timeout)
            .field("stripe_layout", &self.stripe_layout)
            .field("cipher_preference", &self.cipher_preference)
            .field("audio_quality", &self.audio_quality)
            .field("http_client", &"HttpClient { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Whether a master secret was supplied.
    pub fn has_decryption_key(&self) -> bool {
        self.decryption_key.is_some()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Access token is not empty
    /// - Decryption key, when present, is exactly 16 bytes
    /// - Durations are non-zero
    /// - Stripe layout is block aligned
    pub fn validate(&self) -> Result<()> {
        if self.access_token.trim().is_empty() {
            return Err(Error::Config("Access token cannot be empty".to_string()));
        }

        if let Some(key) = &self.decryption_key {
            if key.len() != DECRYPTION_KEY_LEN {
                return Err(Error::Config(format!(
                    "Decryption key must be exactly {} bytes, got {}",
                    DECRYPTION_KEY_LEN,
                    key.len()
                )));
            }
        }

        if self.refresh_interval.is_zero() {
            return Err(Error::Config(
                "Refresh interval must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        self.stripe_layout.validate()
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for session and media requests. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Other hosts: inject an HttpClient adapter."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once every required value is set.
#[derive(Default)]
pub struct CoreConfigBuilder {
    access_token: Option<String>,
    decryption_key: Option<String>,
    refresh_interval: Option<Duration>,
    refresh_retry_backoff: Option<Duration>,
    request_timeout: Option<Duration>,
    stripe_layout: Option<StripeLayout>,
    cipher_preference: CipherPreference,
    audio_quality: AudioQuality,
    http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreConfigBuilder {
    /// Sets the long-lived access token (`arl`). Required.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the 16-byte master secret.
    ///
    /// Without it the core can still activate, but `stream_track` fails with
    /// `DecryptionKeyMissing`.
    pub fn decryption_key(mut self, key: impl Into<String>) -> Self {
        self.decryption_key = Some(key.into());
        self
    }

    /// Sets the session refresh cadence.
    ///
    /// Default: 24 hours
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Sets the wait before the single retry of a failed refresh.
    ///
    /// Default: 3 seconds
    pub fn refresh_retry_backoff(mut self, backoff: Duration) -> Self {
        self.refresh_retry_backoff = Some(backoff);
        self
    }

    /// Sets the timeout applied to each remote call.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn stripe_layout(mut self, layout: StripeLayout) -> Self {
        self.stripe_layout = Some(layout);
        self
    }

    pub fn cipher_preference(mut self, preference: CipherPreference) -> Self {
        self.cipher_preference = preference;
        self
    }

    pub fn audio_quality(mut self, quality: AudioQuality) -> Self {
        self.audio_quality = quality;
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The access token is missing or empty
    /// - The decryption key is not 16 bytes
    /// - No `HttpClient` is available
    /// - Any duration or stripe value is invalid
    pub fn build(self) -> Result<CoreConfig> {
        let access_token = self.access_token.ok_or_else(|| {
            Error::Config("Access token is required. Use .access_token() to set it.".to_string())
        })?;

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let config = CoreConfig {
            access_token,
            decryption_key: self.decryption_key,
            refresh_interval: self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL),
            refresh_retry_backoff: self
                .refresh_retry_backoff
                .unwrap_or(DEFAULT_REFRESH_RETRY_BACKOFF),
            request_timeout,
            stripe_layout: self.stripe_layout.unwrap_or_default(),
            cipher_preference: self.cipher_preference,
            audio_quality: self.audio_quality,
            http_client,
        };

        config.validate()?;

        Ok(config)
    }
}
