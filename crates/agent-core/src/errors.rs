use thiserror::Error;

/// Failures of a single page operation. Never fatal to a session on their own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("timed out after {after_ms}ms waiting for {selector}")]
    Timeout { selector: String, after_ms: u64 },

    #[error("no element matches {0}")]
    NotFound(String),

    #[error("page is closed")]
    Closed,

    #[error("page operation failed: {0}")]
    Other(String),
}

impl PageError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Failures opening the target site.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("failed to launch {engine}: {message}")]
    Launch { engine: String, message: String },

    #[error("{engine} timed out after {after_ms}ms loading {url}")]
    Timeout {
        engine: String,
        url: String,
        after_ms: u64,
    },

    #[error("{engine} failed to load page: {message}")]
    Failed { engine: String, message: String },

    #[error("navigation abandoned after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl NavigationError {
    pub fn launch(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Launch {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            engine: engine.into(),
            message: message.into(),
        }
    }
}

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The target site could not be opened; the persona is abandoned.
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}
