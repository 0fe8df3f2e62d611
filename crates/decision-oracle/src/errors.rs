use thiserror::Error;

/// Errors emitted by oracle backends and reply decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// The backend could not be reached or answered with a failure status.
    #[error("oracle transport failure: {0}")]
    Transport(String),

    /// Every configured credential was rate limited.
    #[error("oracle rate limited: {0}")]
    RateLimited(String),

    /// The reply could not be decoded into the requested shape.
    #[error("oracle protocol violation: {0}")]
    Protocol(String),

    /// The backend is not configured or has nothing left to answer with.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Protocol errors mean the backend answered but the answer was unusable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
