//! # Deezer Provider
//!
//! Wire protocol for the Deezer web gateway and media service.
//!
//! - [`GatewayCredentialSource`] performs the session handshake and plugs into
//!   `core_session::SessionManager`.
//! - [`StreamResolver`] turns a [`TrackId`] into the signed URL of its
//!   encrypted media file.
//! - [`validate_url`] recognises track, album, playlist and share links.

pub mod error;
pub mod gateway;
pub mod resolver;
pub mod types;
pub mod url;

pub use error::{ProviderError, Result};
pub use gateway::GatewayCredentialSource;
pub use resolver::{format_name, format_preferences, ResolvedTrack, StreamResolver};
pub use types::{TrackInfo, DEFAULT_MEDIA_BASE_URL};
pub use url::{is_share_link, validate_url, TrackId};
