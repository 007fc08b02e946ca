use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid track id: {0}")]
    InvalidTrackId(String),

    #[error("Invalid master secret: {0}")]
    InvalidMasterSecret(String),

    #[error("Invalid key length: {0} bytes (expected 4 to 56)")]
    InvalidKeyLength(usize),

    #[error("Cipher unavailable: {0}")]
    CipherUnavailable(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
