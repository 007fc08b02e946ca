//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! - `HttpClient` using `reqwest` with rustls
//!
//! Logging needs no adapter here: desktop hosts read the `tracing` output
//! configured by `core_runtime::logging`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = Arc::new(ReqwestHttpClient::new()?);
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod http;

pub use http::ReqwestHttpClient;
