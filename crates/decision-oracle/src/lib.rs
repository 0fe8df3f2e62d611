//! Decision oracle interface.
//!
//! Everything that asks a language model for something lives behind
//! [`OracleBackend`]; [`DecisionOracle`] turns those raw completions into
//! typed, validated replies. Replies are advisory and are never trusted
//! without validation by the caller.

pub mod backend;
pub mod capabilities;
pub mod errors;
pub mod json;
pub mod openai;
pub mod oracle;
pub mod prompt;
pub mod scripted;

pub use backend::{CompletionRequest, OracleBackend, Purpose};
pub use capabilities::{BackendCapabilities, TokenLimitParam};
pub use errors::OracleError;
pub use json::extract_json_object;
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use oracle::{parse_action_reply, Analysis, DecisionOracle};
pub use prompt::ActionContext;
pub use scripted::ScriptedBackend;
