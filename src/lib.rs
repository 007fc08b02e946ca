//! Umbrella crate for the striped stream pipeline.
//!
//! Hosts depend on this crate and pick a feature instead of wiring the
//! workspace crates one by one:
//!
//! - `desktop-shims` (default): the full [`core_service`] façade with the
//!   reqwest HTTP client
//! - `native-cipher`: library-backed Blowfish in [`core_crypto`]
//! - `decrypt-only`: key derivation and the striped transcoder without any
//!   network code

#[cfg(feature = "desktop-shims")]
pub use core_service;

#[cfg(any(feature = "native-cipher", feature = "decrypt-only"))]
pub use core_crypto;

#[cfg(feature = "decrypt-only")]
pub use core_stream;
