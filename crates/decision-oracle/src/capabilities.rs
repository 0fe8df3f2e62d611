use serde::{Deserialize, Serialize};

/// Name of the request field that bounds completion length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLimitParam {
    MaxTokens,
    MaxCompletionTokens,
}

impl TokenLimitParam {
    pub fn field_name(&self) -> &'static str {
        match self {
            TokenLimitParam::MaxTokens => "max_tokens",
            TokenLimitParam::MaxCompletionTokens => "max_completion_tokens",
        }
    }
}

/// Optional request parameters a backend configuration accepts.
///
/// Consulted before a request is built; parameters a backend does not accept
/// are left out instead of being retried after a rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapabilities {
    pub temperature: bool,
    pub json_mode: bool,
    pub token_limit: TokenLimitParam,
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self {
            temperature: true,
            json_mode: true,
            token_limit: TokenLimitParam::MaxTokens,
        }
    }
}

impl BackendCapabilities {
    /// Descriptor for an OpenAI-compatible model name.
    ///
    /// Reasoning families (`o1`, `o3`, `o4`, `gpt-5`) only accept the default
    /// sampling temperature and take `max_completion_tokens`.
    pub fn for_model(model: &str) -> Self {
        let name = model.trim().to_ascii_lowercase();
        let name = name.rsplit('/').next().unwrap_or(name.as_str());
        let reasoning = ["o1", "o3", "o4", "gpt-5"]
            .iter()
            .any(|prefix| name == *prefix || name.starts_with(&format!("{prefix}-")));
        if reasoning {
            Self {
                temperature: false,
                json_mode: !name.starts_with("o1"),
                token_limit: TokenLimitParam::MaxCompletionTokens,
            }
        } else {
            Self::default()
        }
    }
}
