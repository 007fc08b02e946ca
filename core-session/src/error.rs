use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session fetch failed: {0}")]
    SessionFetchFailed(String),

    #[error("Session not active")]
    NotActive,

    #[error("Session manager has been deactivated")]
    Deactivated,
}

pub type Result<T> = std::result::Result<T, SessionError>;
