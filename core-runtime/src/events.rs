//! # Event Bus System
//!
//! Provides an event-driven view of the streaming core using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: `SessionEvent` for the credential lifecycle, `StreamEvent`
//!   for individual track streams
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐   emit    ┌───────────┐
//! │ SessionManager ├──────────>│           │   subscribe   ┌────────────┐
//! └────────────────┘           │ EventBus  ├──────────────>│ Subscriber │
//! ┌────────────────┐   emit    │ (broadcast│               └────────────┘
//! │  CoreService   ├──────────>│  channel) │
//! └────────────────┘           └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus.emit(CoreEvent::Session(SessionEvent::Refreshing)).ok();
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers is not an error for the core; publishers
//! discard the `SendError`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session credential lifecycle
    Session(SessionEvent),
    /// Per-track stream lifecycle
    Stream(StreamEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Stream(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::ActivationFailed { .. }) => EventSeverity::Error,
            CoreEvent::Stream(StreamEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::RefreshFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::Activated { .. }) => EventSeverity::Info,
            CoreEvent::Session(SessionEvent::Deactivated) => EventSeverity::Info,
            CoreEvent::Stream(StreamEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events related to the session credential lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// First credential fetch in progress.
    Activating,
    /// Credentials fetched and published.
    Activated {
        /// Base URL of the media service for this session.
        media_base_url: String,
    },
    /// First credential fetch failed.
    ActivationFailed { message: String },
    /// Scheduled refresh started.
    Refreshing,
    /// Refresh published a new snapshot.
    Refreshed,
    /// Refresh failed after its retry; the previous snapshot stays in use.
    RefreshFailed { message: String },
    /// Refresh task stopped; no further refreshes will happen.
    Deactivated,
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Activating => "Fetching session credentials",
            SessionEvent::Activated { .. } => "Session activated",
            SessionEvent::ActivationFailed { .. } => "Session activation failed",
            SessionEvent::Refreshing => "Refreshing session credentials",
            SessionEvent::Refreshed => "Session credentials refreshed",
            SessionEvent::RefreshFailed { .. } => "Session refresh failed, keeping previous credentials",
            SessionEvent::Deactivated => "Session deactivated",
        }
    }
}

// ============================================================================
// Stream Events
// ============================================================================

/// Events related to individual decrypted streams.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum StreamEvent {
    /// Media URL resolved for a track.
    Resolved {
        track_id: String,
        /// Wire name of the format the service picked (e.g. `MP3_320`).
        format: String,
    },
    /// Decrypted stream handed to the consumer.
    Started {
        track_id: String,
        /// Cipher backend in use (`native` or `soft`).
        backend: String,
    },
    /// Source exhausted and every byte forwarded.
    Completed {
        track_id: String,
        bytes: u64,
        chunks: u64,
    },
    /// Stream terminated with an error.
    Failed { track_id: String, message: String },
}

impl StreamEvent {
    fn description(&self) -> &str {
        match self {
            StreamEvent::Resolved { .. } => "Media URL resolved",
            StreamEvent::Started { .. } => "Decrypted stream started",
            StreamEvent::Completed { .. } => "Decrypted stream completed",
            StreamEvent::Failed { .. } => "Decrypted stream failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let session_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Session(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
