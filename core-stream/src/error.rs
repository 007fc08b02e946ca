use core_crypto::CryptoError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Decryption failed at chunk {chunk_index}: {source}")]
    DecryptionFailed {
        chunk_index: u64,
        #[source]
        source: CryptoError,
    },

    #[error("Source stream failed: {0}")]
    SourceFailed(String),
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        let kind = match err {
            StreamError::DecryptionFailed { .. } => std::io::ErrorKind::InvalidData,
            StreamError::SourceFailed(_) => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
