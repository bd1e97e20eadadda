use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// An invalid configuration value was provided.
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// The backing store failed.
    #[error("Session store error: {0}")]
    Store(String),
}

impl SessionError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
