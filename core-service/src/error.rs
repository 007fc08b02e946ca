use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Decryption key missing, streams cannot be decrypted")]
    DecryptionKeyMissing,

    #[error("Media source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] core_crypto::CryptoError),

    #[error("Stream error: {0}")]
    Stream(#[from] core_stream::StreamError),

    #[error("Session error: {0}")]
    Session(#[from] core_session::SessionError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider_deezer::ProviderError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
