//! # Core Stream
//!
//! On-the-fly decryption of striped media streams.
//!
//! [`StripedStreamTranscoder`] consumes the raw byte stream of an encrypted
//! track (arbitrary network read sizes) and produces an order-preserving
//! plaintext stream, decrypting only the chunks the stripe layout marks as
//! encrypted.

pub mod error;
pub mod transcoder;

pub use error::{Result, StreamError};
pub use transcoder::{into_async_read, DecryptedReader, DecryptedStream, StripedStreamTranscoder};
