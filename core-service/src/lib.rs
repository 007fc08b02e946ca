//! Core service façade.
//!
//! Wires the session lifecycle, track resolution and striped decryption into
//! one entry point. Desktop hosts enable the `desktop-shims` feature, which
//! supplies a reqwest-backed HTTP client when the configuration names none.
//!
//! ```no_run
//! use core_runtime::config::CoreConfig;
//! use core_service::CoreService;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoreConfig::builder()
//!     .access_token("arl-cookie-value")
//!     .decryption_key("0123456789abcdef")
//!     .build()?;
//!
//! let core = CoreService::new(config)?;
//! core.activate().await?;
//!
//! let mut track = core.stream_track("https://www.deezer.com/track/3135556").await?;
//! while let Some(bytes) = track.stream.next().await {
//!     let bytes = bytes?;
//!     // feed the decoder
//! #   let _ = bytes;
//! }
//!
//! core.deactivate().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
mod service;

pub use error::{CoreError, Result};
pub use provider_deezer::{validate_url, TrackId, TrackInfo};
pub use service::{CoreService, TrackStream};
