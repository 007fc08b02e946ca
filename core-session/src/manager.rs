//! # Session Manager
//!
//! Owns the short-lived session credentials and keeps them fresh.
//!
//! ## Overview
//!
//! `activate` performs the first fetch and publishes the snapshot. A background
//! task then refreshes it on a fixed cadence. A failed refresh is retried once
//! after a short backoff; if the retry fails too, the previous snapshot stays
//! in use and the task waits for the next tick.
//!
//! Readers never block on a refresh. They either call [`SessionManager::current`]
//! or hold a [`CredentialsReceiver`] from [`SessionManager::subscribe`]. Every
//! read yields a complete `Arc<SessionCredentials>`; a replacement never mutates
//! a snapshot that someone already holds.
//!
//! ## Usage
//!
//! ```no_run
//! use core_session::{CredentialSource, SessionManager, SessionSettings};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//!
//! # async fn run(source: Arc<dyn CredentialSource>) -> core_session::Result<()> {
//! let manager = SessionManager::new(source, SessionSettings::default(), EventBus::new(100));
//! let credentials = manager.activate().await?;
//! println!("media service at {}", credentials.media_base_url);
//! manager.deactivate().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use core_runtime::config::{
    CoreConfig, DEFAULT_REFRESH_INTERVAL, DEFAULT_REFRESH_RETRY_BACKOFF, DEFAULT_REQUEST_TIMEOUT,
};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::types::{CredentialSource, CredentialsReceiver, SessionCredentials, SessionState};

type CredentialsSender = watch::Sender<Option<Arc<SessionCredentials>>>;

/// Timing knobs for a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Time between scheduled refreshes.
    pub refresh_interval: Duration,
    /// Wait before retrying a failed refresh.
    pub retry_backoff: Duration,
    /// Bound on each credential fetch.
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            retry_backoff: DEFAULT_REFRESH_RETRY_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl From<&CoreConfig> for SessionSettings {
    fn from(config: &CoreConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval,
            retry_backoff: config.refresh_retry_backoff,
            request_timeout: config.request_timeout,
        }
    }
}

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// State shared between the manager and its refresh task.
struct Shared {
    source: Arc<dyn CredentialSource>,
    settings: SessionSettings,
    event_bus: EventBus,
    credentials: CredentialsSender,
    state: RwLock<SessionState>,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        let _ = self.event_bus.emit(CoreEvent::Session(event));
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write() = state;
    }

    fn publish(&self, credentials: SessionCredentials) -> Arc<SessionCredentials> {
        let snapshot = Arc::new(credentials);
        self.credentials.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    async fn fetch(&self) -> Result<SessionCredentials> {
        let limit = self.settings.request_timeout;
        let credentials = match timeout(limit, self.source.fetch_credentials()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SessionError::SessionFetchFailed(format!(
                    "credential fetch timed out after {:?}",
                    limit
                )))
            }
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// One scheduled refresh with its single retry.
    async fn refresh_once(&self) {
        self.set_state(SessionState::Refreshing);
        self.emit(SessionEvent::Refreshing);

        let first = match self.fetch().await {
            Ok(credentials) => Ok(credentials),
            Err(e) => {
                warn!(
                    error = %e,
                    "Unable to fetch session credentials, retrying in {:?}",
                    self.settings.retry_backoff
                );
                sleep(self.settings.retry_backoff).await;
                self.fetch().await
            }
        };

        match first {
            Ok(credentials) => {
                self.publish(credentials);
                info!("Session credentials refreshed");
                self.emit(SessionEvent::Refreshed);
            }
            Err(e) => {
                warn!(error = %e, "Retry failed, keeping previous session credentials");
                self.emit(SessionEvent::RefreshFailed {
                    message: e.to_string(),
                });
            }
        }

        self.set_state(SessionState::Active);
    }
}

async fn refresh_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let period = shared.settings.refresh_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = shared.refresh_once() => {}
        }
    }

    debug!("Session refresh task stopped");
}

/// Keeps the current session credentials available to any number of readers.
pub struct SessionManager {
    shared: Arc<Shared>,
    /// Serializes `activate` and `deactivate`.
    refresh: Mutex<Option<RefreshTask>>,
}

impl SessionManager {
    pub fn new(
        source: Arc<dyn CredentialSource>,
        settings: SessionSettings,
        event_bus: EventBus,
    ) -> Self {
        let (credentials, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                source,
                settings,
                event_bus,
                credentials,
                state: RwLock::new(SessionState::Uninitialized),
            }),
            refresh: Mutex::new(None),
        }
    }

    /// Fetches the first snapshot and starts the refresh task.
    ///
    /// Calling this on an active manager returns the current snapshot
    /// without fetching again.
    ///
    /// # Errors
    ///
    /// - `SessionFetchFailed` if the fetch fails, times out, or returns
    ///   unusable credentials. The manager stays uninitialized.
    /// - `Deactivated` after [`deactivate`](Self::deactivate).
    #[instrument(skip(self))]
    pub async fn activate(&self) -> Result<Arc<SessionCredentials>> {
        let mut refresh = self.refresh.lock().await;

        match self.state() {
            SessionState::Deactivated => return Err(SessionError::Deactivated),
            SessionState::Active | SessionState::Refreshing => {
                if let Some(current) = self.shared.credentials.borrow().clone() {
                    return Ok(current);
                }
            }
            SessionState::Uninitialized => {}
        }

        self.shared.emit(SessionEvent::Activating);

        let credentials = match self.shared.fetch().await {
            Ok(credentials) => credentials,
            Err(e) => {
                error!(error = %e, "Session activation failed");
                self.shared.emit(SessionEvent::ActivationFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let snapshot = self.shared.publish(credentials);
        self.shared.set_state(SessionState::Active);

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(refresh_loop(Arc::clone(&self.shared), cancel.clone()));
        *refresh = Some(RefreshTask { cancel, handle });

        info!(media_base_url = %snapshot.media_base_url, "Session activated");
        self.shared.emit(SessionEvent::Activated {
            media_base_url: snapshot.media_base_url.clone(),
        });

        Ok(snapshot)
    }

    /// Latest published snapshot.
    ///
    /// Keeps answering with the last snapshot after a failed refresh or
    /// after deactivation.
    ///
    /// # Errors
    ///
    /// `NotActive` if no snapshot was ever published.
    pub fn current(&self) -> Result<Arc<SessionCredentials>> {
        self.shared
            .credentials
            .borrow()
            .clone()
            .ok_or(SessionError::NotActive)
    }

    /// Stops the refresh task and waits for it to finish.
    ///
    /// An in-flight refresh is abandoned. Snapshots already handed out stay
    /// valid. Idempotent.
    #[instrument(skip(self))]
    pub async fn deactivate(&self) {
        let mut refresh = self.refresh.lock().await;
        if self.state() == SessionState::Deactivated {
            return;
        }

        if let Some(task) = refresh.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Session refresh task ended abnormally");
            }
        }

        self.shared.set_state(SessionState::Deactivated);
        info!("Session deactivated");
        self.shared.emit(SessionEvent::Deactivated);
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> CredentialsReceiver {
        self.shared.credentials.subscribe()
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.read()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(task) = self.refresh.get_mut().take() {
            task.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("settings", &self.shared.settings)
            .finish()
    }
}
