use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capabilities::BackendCapabilities;
use crate::errors::OracleError;

/// What a completion is for; lets scripted backends answer per call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Action,
    Analysis,
    Suggestions,
    Rewrite,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub purpose: Purpose,
    pub system: String,
    pub user: String,
    /// Ask the backend to constrain output to a JSON object.
    pub json: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(purpose: Purpose, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            purpose,
            system: system.into(),
            user: user.into(),
            json: true,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Abstraction over language-model vendors.
#[async_trait]
pub trait OracleBackend: Send + Sync {
    /// Optional parameters this backend configuration accepts.
    fn capabilities(&self) -> BackendCapabilities;

    /// Run one completion and return the raw text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError>;
}
