//! # Core Session
//!
//! Session credential lifecycle for the streaming core.
//!
//! A [`CredentialSource`] performs the handshake with the remote service. The
//! [`SessionManager`] calls it once on activation, publishes the result as an
//! immutable snapshot, and refreshes it in the background until deactivated.

pub mod error;
pub mod manager;
pub mod types;

pub use error::{Result, SessionError};
pub use manager::{SessionManager, SessionSettings};
pub use types::{CredentialSource, CredentialsReceiver, SessionCredentials, SessionState};
