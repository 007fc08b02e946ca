//! Error types for the Deezer provider

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Input is neither a numeric id nor a track URL
    #[error("Invalid track id: {0}")]
    InvalidTrackId(String),

    /// `song.getListData` returned an error payload or no track token
    #[error("Track info unavailable for {track_id}: {message}")]
    TrackInfoUnavailable { track_id: String, message: String },

    /// `get_url` returned no playable source
    #[error("Media URL unavailable for {track_id}: {message}")]
    MediaUrlUnavailable { track_id: String, message: String },

    /// `deezer.getUserData` failed or returned unusable tokens
    #[error("Session fetch failed: {0}")]
    SessionFetchFailed(String),

    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Deezer provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for core_session::SessionError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::SessionFetchFailed(message) => {
                core_session::SessionError::SessionFetchFailed(message)
            }
            other => core_session::SessionError::SessionFetchFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ProviderError::TrackInfoUnavailable {
            track_id: "3135556".to_string(),
            message: "DATA_ERROR".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Track info unavailable for 3135556: DATA_ERROR"
        );
    }

    #[test]
    fn test_error_conversion() {
        let error = ProviderError::SessionFetchFailed("no license token".to_string());
        let session_error: core_session::SessionError = error.into();

        assert_eq!(
            session_error,
            core_session::SessionError::SessionFetchFailed("no license token".to_string())
        );

        let bridge = ProviderError::Bridge(bridge_traits::error::BridgeError::Timeout(
            "30s".to_string(),
        ));
        assert!(matches!(
            core_session::SessionError::from(bridge),
            core_session::SessionError::SessionFetchFailed(_)
        ));
    }
}
