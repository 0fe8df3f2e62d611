use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{CompletionRequest, OracleBackend};
use crate::capabilities::{BackendCapabilities, TokenLimitParam};
use crate::errors::OracleError;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(model: impl Into<String>, api_keys: Vec<String>) -> Self {
        Self {
            api_keys,
            model: model.into(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Chat-completions backend for OpenAI-compatible endpoints.
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
    capabilities: BackendCapabilities,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, OracleError> {
        if config.api_keys.iter().all(|key| key.trim().is_empty()) {
            return Err(OracleError::unavailable(format!(
                "missing API key for model {}",
                config.model
            )));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleError::transport(format!("failed to build HTTP client: {err}")))?;
        let capabilities = BackendCapabilities::for_model(&config.model);
        Ok(Self {
            client,
            config,
            capabilities,
        })
    }

    fn build_body(&self, request: &CompletionRequest) -> ChatCompletionRequest {
        let caps = self.capabilities;
        let temperature = caps
            .temperature
            .then(|| request.temperature.unwrap_or(self.config.temperature));
        let response_format = (request.json && caps.json_mode).then(|| ResponseFormat {
            r#type: "json_object".to_string(),
        });
        let (max_tokens, max_completion_tokens) = match (request.max_tokens, caps.token_limit) {
            (Some(limit), TokenLimitParam::MaxTokens) => (Some(limit), None),
            (Some(limit), TokenLimitParam::MaxCompletionTokens) => (None, Some(limit)),
            (None, _) => (None, None),
        };
        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature,
            response_format,
            max_tokens,
            max_completion_tokens,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
        }
    }
}

#[async_trait]
impl OracleBackend for OpenAiBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = self.build_body(request);
        let keys: Vec<&String> = self
            .config
            .api_keys
            .iter()
            .filter(|key| !key.trim().is_empty())
            .collect();

        let mut last_error: Option<OracleError> = None;
        for (index, key) in keys.iter().enumerate() {
            let response = self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(OracleError::transport(format!("request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 {
                    let friendly = rate_limit_message(&text);
                    if index + 1 < keys.len() {
                        warn!(
                            target: "oracle",
                            message = %friendly,
                            attempt = index + 1,
                            remaining = keys.len() - index - 1,
                            purpose = ?request.purpose,
                            "rate limited; switching API key"
                        );
                        last_error = Some(OracleError::RateLimited(friendly));
                        continue;
                    }
                    return Err(OracleError::RateLimited(friendly));
                }
                return Err(OracleError::transport(format!(
                    "backend returned {status}: {text}"
                )));
            }

            let body = response
                .text()
                .await
                .map_err(|err| OracleError::transport(format!("response unreadable: {err}")))?;
            let response = decode_completion(&body)?;
            if let Some(usage) = &response.usage {
                debug!(
                    target: "oracle",
                    model = %self.config.model,
                    purpose = ?request.purpose,
                    input_tokens = usage.prompt_tokens,
                    output_tokens = usage.completion_tokens,
                    "completion finished"
                );
            }
            return completion_text(&response);
        }

        Err(last_error.unwrap_or_else(|| OracleError::unavailable("request exhausted all API keys")))
    }
}

/// Bodies that are not usable chat completions are transport failures.
fn decode_completion(body: &str) -> Result<ChatCompletionResponse, OracleError> {
    serde_json::from_str(body)
        .map_err(|err| OracleError::transport(format!("response is not a chat completion: {err}")))
}

fn completion_text(response: &ChatCompletionResponse) -> Result<String, OracleError> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_ref())
        .and_then(ChatCompletionContent::as_text)
        .ok_or_else(|| OracleError::transport("response missing content"))
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) if !value.trim().is_empty() => Some(value.clone()),
            ChatCompletionContent::Text(_) => None,
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: Option<String>,
}

fn rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!("rate limit exceeded: {}", message.trim());
        }
    }
    "rate limit exceeded; retry later or reduce usage".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Purpose;

    fn backend(model: &str) -> OpenAiBackend {
        OpenAiBackend::new(OpenAiConfig::new(model, vec!["sk-test".to_string()])).unwrap()
    }

    #[test]
    fn missing_key_is_unavailable() {
        let err = OpenAiBackend::new(OpenAiConfig::new("gpt-4o-mini", vec![String::new()]))
            .err()
            .unwrap();
        assert!(matches!(err, OracleError::Unavailable(_)));
    }

    #[test]
    fn body_respects_capabilities() {
        let request = CompletionRequest::new(Purpose::Action, "sys", "user")
            .with_temperature(0.7)
            .with_max_tokens(300);

        let chat = serde_json::to_value(backend("gpt-4o-mini").build_body(&request)).unwrap();
        assert!((chat["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(chat["max_tokens"], 300);
        assert_eq!(chat["response_format"]["type"], "json_object");

        let reasoning = serde_json::to_value(backend("gpt-5-mini").build_body(&request)).unwrap();
        assert!(reasoning.get("temperature").is_none());
        assert!(reasoning.get("max_tokens").is_none());
        assert_eq!(reasoning["max_completion_tokens"], 300);
    }

    #[test]
    fn malformed_bodies_count_as_transport_failures() {
        let err = decode_completion(r#"{"error":{"message":"upstream overloaded"}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, OracleError::Transport(_)));
        assert!(!err.is_protocol());

        let empty = decode_completion(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        let err = completion_text(&empty).unwrap_err();
        assert!(matches!(err, OracleError::Transport(_)));

        let ok = decode_completion(r#"{"choices":[{"message":{"content":"{}"}}]}"#).unwrap();
        assert_eq!(completion_text(&ok).unwrap(), "{}");
    }

    #[test]
    fn content_parts_are_joined() {
        let raw = r#"{"choices":[{"message":{"content":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#;
        let response: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let text = response.choices[0].message.content.as_ref().unwrap().as_text();
        assert_eq!(text.as_deref(), Some("{\"a\":\n1}"));
    }

    #[test]
    fn rate_limit_message_prefers_envelope() {
        let message = rate_limit_message(r#"{"error":{"message":"slow down "}}"#);
        assert_eq!(message, "rate limit exceeded: slow down");
    }
}
