//! Per-track key derivation.
//!
//! Each track is decrypted with its own 16-byte Blowfish key, derived from
//! the track id and a shared master secret:
//!
//! ```text
//! h      = lowercase hex of md5(track_id)      (32 ASCII characters)
//! key[i] = h[i] ^ h[i + 16] ^ secret[i]         for i in 0..16
//! ```
//!
//! The XOR operates on the hex *characters*, not on decoded nibbles.

use std::fmt;

use md5::{Digest, Md5};

use crate::error::{CryptoError, Result};

/// Length of both the master secret and derived keys.
pub const KEY_LEN: usize = 16;

/// The caller-supplied 16-byte master secret.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterSecret([u8; KEY_LEN]);

impl MasterSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        let bytes: [u8; KEY_LEN] = secret.try_into().map_err(|_| {
            CryptoError::InvalidMasterSecret(format!(
                "expected {} bytes, got {}",
                KEY_LEN,
                secret.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&str> for MasterSecret {
    type Error = CryptoError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterSecret([REDACTED])")
    }
}

/// A derived per-track key. Handed by value to exactly one cipher.
#[derive(PartialEq, Eq)]
pub struct TrackKey([u8; KEY_LEN]);

impl TrackKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; KEY_LEN]> for TrackKey {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TrackKey([REDACTED])")
    }
}

/// Derive the Blowfish key for `track_id`.
///
/// # Errors
///
/// `InvalidTrackId` if `track_id` is empty.
pub fn derive_track_key(track_id: &str, secret: &MasterSecret) -> Result<TrackKey> {
    if track_id.is_empty() {
        return Err(CryptoError::InvalidTrackId(
            "track id cannot be empty".to_string(),
        ));
    }

    let digest = hex::encode(Md5::digest(track_id.as_bytes()));
    let h = digest.as_bytes();
    let s = secret.as_bytes();

    let mut key = [0u8; KEY_LEN];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = h[i] ^ h[i + KEY_LEN] ^ s[i];
    }

    Ok(TrackKey(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> MasterSecret {
        MasterSecret::new("0123456789abcdef").unwrap()
    }

    #[test]
    fn test_fixed_vector() {
        let key = derive_track_key("123456789", &secret()).unwrap();
        assert_eq!(key.to_hex(), "3a31323f603a3e653a6964326335663c");
        assert_eq!(
            key.as_bytes(),
            &[58, 49, 50, 63, 96, 58, 62, 101, 58, 105, 100, 50, 99, 53, 102, 60]
        );
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = derive_track_key("3135556", &secret()).unwrap();
        let b = derive_track_key("3135556", &secret()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_tracks_get_distinct_keys() {
        let a = derive_track_key("3135556", &secret()).unwrap();
        let b = derive_track_key("3135557", &secret()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_xor_uses_hex_characters() {
        // With an all-zero secret the key is the XOR of the two digest halves
        // taken as ASCII, so every byte lands in the range produced by two
        // characters from [0-9a-f].
        let zero = MasterSecret::new([0u8; KEY_LEN]).unwrap();
        let key = derive_track_key("123456789", &zero).unwrap();
        let digest = "25f9e794323b453885f5181f1b624d0b".as_bytes();
        for i in 0..KEY_LEN {
            assert_eq!(key.as_bytes()[i], digest[i] ^ digest[i + 16]);
        }
    }

    #[test]
    fn test_empty_track_id_is_rejected() {
        let err = derive_track_key("", &secret()).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidTrackId(_)));
    }

    #[test]
    fn test_master_secret_length_is_enforced() {
        assert!(matches!(
            MasterSecret::new("short"),
            Err(CryptoError::InvalidMasterSecret(_))
        ));
        assert!(MasterSecret::try_from("0123456789abcdef").is_ok());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = derive_track_key("123456789", &secret()).unwrap();
        assert_eq!(format!("{:?}", secret()), "MasterSecret([REDACTED])");
        assert_eq!(format!("{:?}", key), "TrackKey([REDACTED])");
    }
}
