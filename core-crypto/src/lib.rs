//! # Core Crypto
//!
//! Per-track key derivation and the chunk ciphers that decrypt striped
//! Blowfish-CBC media.
//!
//! ## Usage
//!
//! ```
//! use bytes::Bytes;
//! use core_crypto::{derive_track_key, select_cipher, MasterSecret, STRIPE_IV};
//! use core_runtime::config::CipherPreference;
//!
//! # #[tokio::main]
//! # async fn main() -> core_crypto::Result<()> {
//! let secret = MasterSecret::new("0123456789abcdef")?;
//! let key = derive_track_key("123456789", &secret)?;
//! let cipher = select_cipher(key, STRIPE_IV, CipherPreference::Auto)?;
//!
//! let plaintext = cipher.decrypt_chunk(Bytes::from(vec![0u8; 2048])).await?;
//! assert_eq!(plaintext.len(), 2048);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `native-cipher` (default): build [`NativeBlowfishCipher`] on top of the
//!   RustCrypto `blowfish` and `cbc` crates. Without it, `Auto` selection
//!   falls back to [`SoftBlowfishCipher`].

pub mod cipher;
pub mod error;
pub mod key;

pub use cipher::{
    select_cipher, ChunkCipher, CipherBackend, CipherFactory, NativeBlowfishCipher,
    SoftBlowfishCipher, ALGORITHM, BLOCK_SIZE, STRIPE_IV,
};
pub use error::{CryptoError, Result};
pub use key::{derive_track_key, MasterSecret, TrackKey, KEY_LEN};
