//! Library-backed Blowfish-CBC.

use async_trait::async_trait;
use bytes::Bytes;

use super::{check_chunk_len, check_key_len, ChunkCipher, CipherBackend, ALGORITHM, BLOCK_SIZE};
use crate::error::{CryptoError, Result};

#[cfg(feature = "native-cipher")]
use blowfish::Blowfish;
#[cfg(feature = "native-cipher")]
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, InnerIvInit, KeyInit};

#[cfg(feature = "native-cipher")]
type BlowfishCbcDec = cbc::Decryptor<Blowfish>;

/// Blowfish-CBC backed by the RustCrypto `blowfish` and `cbc` crates.
///
/// The key schedule runs once at construction; each chunk gets a fresh CBC
/// decryptor seeded with the same IV.
pub struct NativeBlowfishCipher {
    #[cfg(feature = "native-cipher")]
    cipher: Blowfish,
    #[cfg_attr(not(feature = "native-cipher"), allow(dead_code))]
    iv: [u8; BLOCK_SIZE],
}

impl NativeBlowfishCipher {
    /// Construct the `BF-CBC` cipher.
    pub fn new(key: &[u8], iv: [u8; BLOCK_SIZE]) -> Result<Self> {
        Self::with_algorithm(ALGORITHM, key, iv)
    }

    /// Construct a cipher for the named algorithm.
    ///
    /// # Errors
    ///
    /// `CipherUnavailable` if `algorithm` is not `BF-CBC` or the
    /// `native-cipher` feature is disabled.
    pub fn with_algorithm(algorithm: &str, key: &[u8], iv: [u8; BLOCK_SIZE]) -> Result<Self> {
        if !algorithm.eq_ignore_ascii_case(ALGORITHM) {
            return Err(CryptoError::CipherUnavailable(format!(
                "algorithm {} is not supported by the native backend",
                algorithm
            )));
        }
        check_key_len(key.len())?;
        Self::build(key, iv)
    }

    /// Whether this build carries the native backend.
    pub fn is_available() -> bool {
        cfg!(feature = "native-cipher")
    }

    #[cfg(feature = "native-cipher")]
    fn build(key: &[u8], iv: [u8; BLOCK_SIZE]) -> Result<Self> {
        let cipher = Blowfish::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Self { cipher, iv })
    }

    #[cfg(not(feature = "native-cipher"))]
    fn build(_key: &[u8], _iv: [u8; BLOCK_SIZE]) -> Result<Self> {
        Err(CryptoError::CipherUnavailable(
            "built without the native-cipher feature".to_string(),
        ))
    }

    #[cfg(feature = "native-cipher")]
    fn decrypt(&self, chunk: &[u8]) -> Result<Bytes> {
        let decryptor = BlowfishCbcDec::inner_iv_slice_init(self.cipher.clone(), &self.iv)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid IV: {}", e)))?;

        let mut buf = chunk.to_vec();
        let len = decryptor
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|e| CryptoError::DecryptionFailed(format!("unpad error: {}", e)))?
            .len();
        buf.truncate(len);

        Ok(Bytes::from(buf))
    }

    #[cfg(not(feature = "native-cipher"))]
    fn decrypt(&self, _chunk: &[u8]) -> Result<Bytes> {
        Err(CryptoError::CipherUnavailable(
            "built without the native-cipher feature".to_string(),
        ))
    }
}

#[async_trait]
impl ChunkCipher for NativeBlowfishCipher {
    fn backend(&self) -> CipherBackend {
        CipherBackend::Native
    }

    async fn decrypt_chunk(&self, chunk: Bytes) -> Result<Bytes> {
        check_chunk_len(chunk.len())?;
        self.decrypt(&chunk)
    }
}

#[cfg(all(test, feature = "native-cipher"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cbc_vector() {
        // Eric Young's CBC test vector: 7654321 Now is the time for \0\0\0\0
        let key = hex::decode("0123456789ABCDEFF0E1D2C3B4A59687").unwrap();
        let iv = [0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32, 0x10];
        let ciphertext = hex::decode(
            "6b77b4d63006dee605b156e27403979358deb9e7154616d959f1652bd5ff92cc",
        )
        .unwrap();

        let cipher = NativeBlowfishCipher::new(&key, iv).unwrap();
        let plaintext = cipher.decrypt_chunk(Bytes::from(ciphertext)).await.unwrap();

        assert_eq!(&plaintext[..28], b"7654321 Now is the time for ");
        assert_eq!(&plaintext[28..], &[0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_iv_is_reapplied_per_chunk() {
        let cipher = NativeBlowfishCipher::new(b"0123456789abcdef", [0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let chunk = Bytes::from(vec![0x5a; 2048]);

        let first = cipher.decrypt_chunk(chunk.clone()).await.unwrap();
        let second = cipher.decrypt_chunk(chunk).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_algorithm_is_unavailable() {
        let err = NativeBlowfishCipher::with_algorithm("AES-128-CBC", &[0u8; 16], [0u8; 8])
            .err()
            .unwrap();
        assert!(matches!(err, CryptoError::CipherUnavailable(_)));
        assert!(NativeBlowfishCipher::with_algorithm("bf-cbc", &[0u8; 16], [0u8; 8]).is_ok());
    }

    #[tokio::test]
    async fn test_rejects_misaligned_chunk() {
        let cipher = NativeBlowfishCipher::new(&[7u8; 16], [0u8; 8]).unwrap();
        let err = cipher.decrypt_chunk(Bytes::from(vec![0u8; 13])).await.unwrap_err();
        assert!(matches!(err, CryptoError::DecryptionFailed(_)));
    }

    #[test]
    fn test_rejects_bad_key_length() {
        assert_eq!(
            NativeBlowfishCipher::new(&[0u8; 3], [0u8; 8]).err(),
            Some(CryptoError::InvalidKeyLength(3))
        );
    }
}
