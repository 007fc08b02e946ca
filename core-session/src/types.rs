use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{Result, SessionError};

/// One immutable snapshot of the short-lived session credentials.
///
/// Snapshots are shared as `Arc<SessionCredentials>` and replaced whole on
/// refresh, so a request that captured one keeps a consistent set of tokens
/// for its whole lifetime.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// Full `Cookie` header value for authenticated gateway calls.
    pub cookie: String,
    /// Token authorising media URL requests.
    pub license_token: String,
    /// Anti-forgery token passed as `api_token` on gateway calls.
    pub csrf_token: String,
    /// Base URL of the media service.
    pub media_base_url: String,
    pub fetched_at: DateTime<Utc>,
}

impl SessionCredentials {
    /// Rejects snapshots that could not authorise any request.
    pub fn validate(&self) -> Result<()> {
        if self.license_token.trim().is_empty() {
            return Err(SessionError::SessionFetchFailed(
                "license token is empty".to_string(),
            ));
        }
        if self.csrf_token.trim().is_empty() {
            return Err(SessionError::SessionFetchFailed(
                "csrf token is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("cookie", &"[REDACTED]")
            .field("license_token", &"[REDACTED]")
            .field("csrf_token", &"[REDACTED]")
            .field("media_base_url", &self.media_base_url)
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

/// Lifecycle of a [`SessionManager`](crate::SessionManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Nothing fetched yet.
    Uninitialized,
    /// Snapshot published, refresh task idle.
    Active,
    /// Refresh in progress; the previous snapshot is still served.
    Refreshing,
    /// Refresh task stopped for good.
    Deactivated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Active => write!(f, "active"),
            SessionState::Refreshing => write!(f, "refreshing"),
            SessionState::Deactivated => write!(f, "deactivated"),
        }
    }
}

/// Receiver side of the credential cell.
pub type CredentialsReceiver = watch::Receiver<Option<Arc<SessionCredentials>>>;

/// Performs the session handshake against the remote service.
///
/// Implementations report every failure as `SessionFetchFailed`.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch_credentials(&self) -> Result<SessionCredentials>;
}
