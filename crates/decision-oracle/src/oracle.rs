use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use menuprobe_core_types::{History, Persona, ProposedAction};

use crate::backend::{CompletionRequest, OracleBackend, Purpose};
use crate::errors::OracleError;
use crate::json::extract_json_object;
use crate::prompt::{self, ActionContext};

const ACTION_MAX_TOKENS: u32 = 300;
const ANALYSIS_MAX_TOKENS: u32 = 1_600;
const SUGGESTION_MAX_TOKENS: u32 = 600;

/// Narrative analysis returned by the oracle. The score is advisory only.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub score: Option<f64>,
    pub description: String,
    pub markdown: String,
}

/// Typed front door to the language-model backends.
#[derive(Clone)]
pub struct DecisionOracle {
    action: Arc<dyn OracleBackend>,
    analysis: Arc<dyn OracleBackend>,
    action_temperature: f32,
    analysis_temperature: f32,
}

impl DecisionOracle {
    pub fn new(action: Arc<dyn OracleBackend>, analysis: Arc<dyn OracleBackend>) -> Self {
        Self {
            action,
            analysis,
            action_temperature: 0.2,
            analysis_temperature: 0.7,
        }
    }

    /// Use one backend for every call site.
    pub fn single(backend: Arc<dyn OracleBackend>) -> Self {
        Self::new(backend.clone(), backend)
    }

    pub fn with_temperatures(mut self, action: f32, analysis: f32) -> Self {
        self.action_temperature = action;
        self.analysis_temperature = analysis;
        self
    }

    /// Ask for the next browser action.
    ///
    /// Transport failures come back as-is; a reply that cannot be decoded into
    /// a known action, even after recovery, is a [`OracleError::Protocol`].
    pub async fn propose_action(
        &self,
        context: &ActionContext,
    ) -> Result<ProposedAction, OracleError> {
        let request = CompletionRequest::new(
            Purpose::Action,
            prompt::action_system_prompt(),
            prompt::action_user_prompt(context),
        )
        .with_temperature(self.action_temperature)
        .with_max_tokens(ACTION_MAX_TOKENS);
        let raw = self.action.complete(&request).await?;
        debug!(target: "oracle", step = context.step, reply = %raw, "action proposal");
        parse_action_reply(&raw)
    }

    pub async fn analyze(
        &self,
        persona: &Persona,
        history: &History,
    ) -> Result<Analysis, OracleError> {
        let request = CompletionRequest::new(
            Purpose::Analysis,
            prompt::analysis_system_prompt(),
            prompt::analysis_user_prompt(persona, history),
        )
        .with_temperature(self.analysis_temperature)
        .with_max_tokens(ANALYSIS_MAX_TOKENS);
        let raw = self.analysis.complete(&request).await?;
        let value = decode_object(&raw)?;

        let markdown = value
            .get("markdown")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| OracleError::protocol("analysis missing markdown"))?
            .to_string();
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();
        let score = value.get("score").and_then(|score| match score {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        });
        Ok(Analysis {
            score,
            description,
            markdown,
        })
    }

    /// Fresh improvement suggestions that avoid the supplied phrases.
    pub async fn suggest_improvements(
        &self,
        persona: &Persona,
        count: usize,
        forbidden: &[String],
    ) -> Result<Vec<String>, OracleError> {
        let request = CompletionRequest::new(
            Purpose::Suggestions,
            prompt::suggestions_system_prompt(),
            prompt::suggestions_user_prompt(persona, count, forbidden),
        )
        .with_temperature(self.analysis_temperature)
        .with_max_tokens(SUGGESTION_MAX_TOKENS);
        let raw = self.analysis.complete(&request).await?;

        #[derive(Deserialize)]
        struct Suggestions {
            #[serde(default)]
            suggestions: Vec<String>,
        }
        let object = extract_json_object(&raw)
            .ok_or_else(|| OracleError::protocol("suggestions reply has no JSON object"))?;
        let parsed: Suggestions = serde_json::from_str(&object)
            .map_err(|err| OracleError::protocol(format!("suggestions reply invalid: {err}")))?;
        Ok(parsed
            .suggestions
            .into_iter()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect())
    }

    /// Structure-preserving rewrite of a report body.
    pub async fn rewrite_report(
        &self,
        markdown: &str,
        forbidden: &[String],
    ) -> Result<String, OracleError> {
        let request = CompletionRequest::new(
            Purpose::Rewrite,
            prompt::rewrite_system_prompt(),
            prompt::rewrite_user_prompt(markdown, forbidden),
        )
        .with_temperature(self.analysis_temperature)
        .with_max_tokens(ANALYSIS_MAX_TOKENS);
        let raw = self.analysis.complete(&request).await?;
        let value = decode_object(&raw)?;
        value
            .get("markdown")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| OracleError::protocol("rewrite missing markdown"))
    }
}

/// Decode an action reply, recovering an embedded object when needed.
pub fn parse_action_reply(raw: &str) -> Result<ProposedAction, OracleError> {
    let value = decode_object(raw)?;
    let kind = value
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| OracleError::protocol("reply has no action field"))?
        .to_string();
    serde_json::from_value(value)
        .map_err(|err| OracleError::protocol(format!("unsupported action '{kind}': {err}")))
}

fn decode_object(raw: &str) -> Result<Value, OracleError> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(value);
    }
    let candidate = extract_json_object(raw)
        .ok_or_else(|| OracleError::protocol("reply contains no JSON object"))?;
    match serde_json::from_str::<Value>(&candidate) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(OracleError::protocol("reply is not a JSON object")),
        Err(err) => Err(OracleError::protocol(format!("reply is not valid JSON: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_embedded_replies() {
        let direct = parse_action_reply(r##"{"action":"click","selector":"#cart"}"##).unwrap();
        assert_eq!(
            direct,
            ProposedAction::Click {
                selector: Some("#cart".to_string())
            }
        );

        let embedded =
            parse_action_reply("Sure! {\"action\":\"wait\",\"ms\":1000} is next").unwrap();
        assert_eq!(embedded, ProposedAction::Wait { ms: Some(1000.0) });
    }

    #[test]
    fn trailing_second_object_keeps_the_first() {
        let action =
            parse_action_reply(r##"{"action":"click","selector":"#cart"} then maybe {"action":"wait"}"##)
                .unwrap();
        assert_eq!(
            action,
            ProposedAction::Click {
                selector: Some("#cart".to_string())
            }
        );
    }

    #[test]
    fn unknown_kind_is_protocol_error() {
        let err = parse_action_reply(r#"{"action":"scroll","by":400}"#).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("scroll"));
    }

    #[test]
    fn missing_object_is_protocol_error() {
        assert!(parse_action_reply("I think we should click the cart")
            .unwrap_err()
            .is_protocol());
        assert!(parse_action_reply(r##"{"selector":"#a"}"##).unwrap_err().is_protocol());
    }
}
