//! Errors surfaced by the MenuProbe library.

use std::path::{Path, PathBuf};

use decision_oracle::OracleError;
use diversity_engine::PoolError;
use phrase_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pools(#[from] PoolError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl ProbeError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;
