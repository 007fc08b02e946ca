//! # Host Bridge Traits
//!
//! Capability traits the streaming core needs from its host.
//!
//! ## Overview
//!
//! The core never talks to a concrete HTTP stack or logging backend. Each
//! capability is a trait here; `bridge-desktop` ships the default adapters and
//! tests inject mocks.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests, cookies, streaming downloads
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Adapters should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., URL, status)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single adapter can be shared
//! across async tasks behind an `Arc`.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{ByteStream, HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         todo!()
//!     }
//!
//!     async fn download_stream(&self, url: String) -> Result<ByteStream> {
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod logging;

pub use error::BridgeError;

pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
