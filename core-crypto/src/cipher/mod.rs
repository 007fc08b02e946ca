//! Chunk decryption backends.
//!
//! A striped stream decrypts isolated chunks: every call is an independent
//! Blowfish-CBC unit that starts again from the fixed IV, with no padding.
//! Two interchangeable backends implement [`ChunkCipher`]:
//!
//! - [`NativeBlowfishCipher`]: RustCrypto `blowfish` + `cbc`, behind the
//!   `native-cipher` feature.
//! - [`SoftBlowfishCipher`]: self-contained Blowfish, always available.
//!
//! Callers obtain one through [`select_cipher`] and never branch on which
//! backend they got.

mod native;
mod soft;
mod tables;

pub use native::NativeBlowfishCipher;
pub use soft::SoftBlowfishCipher;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use core_runtime::config::CipherPreference;
use tracing::debug;

use crate::error::{CryptoError, Result};
use crate::key::TrackKey;

/// Algorithm identifier of the striped stream cipher.
pub const ALGORITHM: &str = "BF-CBC";

/// Blowfish block size in bytes.
pub const BLOCK_SIZE: usize = 8;

/// IV reapplied at the start of every encrypted chunk.
pub const STRIPE_IV: [u8; BLOCK_SIZE] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Which implementation backs a [`ChunkCipher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherBackend {
    Native,
    Soft,
    /// Supplied by the host through a [`CipherFactory`].
    Custom,
}

impl CipherBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherBackend::Native => "native",
            CipherBackend::Soft => "soft",
            CipherBackend::Custom => "custom",
        }
    }
}

impl fmt::Display for CipherBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decrypts one self-contained CBC chunk.
#[async_trait]
pub trait ChunkCipher: Send + Sync {
    fn backend(&self) -> CipherBackend;

    /// Decrypt `chunk` starting from the cipher's IV.
    ///
    /// # Errors
    ///
    /// `DecryptionFailed` if `chunk` is empty or not a multiple of
    /// [`BLOCK_SIZE`].
    async fn decrypt_chunk(&self, chunk: Bytes) -> Result<Bytes>;
}

/// Builds the cipher for one track from its key and IV.
///
/// Hosts that decrypt with their own implementation install one of these in
/// place of [`select_cipher`].
pub type CipherFactory =
    Arc<dyn Fn(TrackKey, [u8; BLOCK_SIZE]) -> Result<Arc<dyn ChunkCipher>> + Send + Sync>;

pub(crate) fn check_chunk_len(len: usize) -> Result<()> {
    if len == 0 || len % BLOCK_SIZE != 0 {
        return Err(CryptoError::DecryptionFailed(format!(
            "chunk length {} is not a non-zero multiple of {}",
            len, BLOCK_SIZE
        )));
    }
    Ok(())
}

pub(crate) fn check_key_len(len: usize) -> Result<()> {
    if !(4..=56).contains(&len) {
        return Err(CryptoError::InvalidKeyLength(len));
    }
    Ok(())
}

/// Build the cipher for one track.
///
/// `Auto` uses the native backend when it was compiled in and falls back to
/// the soft one otherwise.
///
/// # Errors
///
/// `CipherUnavailable` when `Native` is requested but not compiled in.
pub fn select_cipher(
    key: TrackKey,
    iv: [u8; BLOCK_SIZE],
    preference: CipherPreference,
) -> Result<Arc<dyn ChunkCipher>> {
    let key = key.as_bytes();

    let cipher: Arc<dyn ChunkCipher> = match preference {
        CipherPreference::Native => Arc::new(NativeBlowfishCipher::new(key, iv)?),
        CipherPreference::Soft => Arc::new(SoftBlowfishCipher::new(key, iv)?),
        CipherPreference::Auto => match NativeBlowfishCipher::new(key, iv) {
            Ok(native) => Arc::new(native),
            Err(CryptoError::CipherUnavailable(reason)) => {
                debug!(reason = %reason, "Native cipher unavailable, using soft backend");
                Arc::new(SoftBlowfishCipher::new(key, iv)?)
            }
            Err(e) => return Err(e),
        },
    };

    debug!(backend = %cipher.backend(), "Selected chunk cipher");
    Ok(cipher)
}
