use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::backend::{CompletionRequest, OracleBackend, Purpose};
use crate::capabilities::BackendCapabilities;
use crate::errors::OracleError;

/// Deterministic backend replaying queued replies per call site.
///
/// Used by tests and offline runs. An exhausted queue answers with
/// [`OracleError::Unavailable`] unless a repeating reply was set.
#[derive(Default)]
pub struct ScriptedBackend {
    capabilities: BackendCapabilities,
    queues: Mutex<HashMap<Purpose, VecDeque<Result<String, OracleError>>>>,
    repeat: Mutex<HashMap<Purpose, String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn reply(self, purpose: Purpose, text: impl Into<String>) -> Self {
        self.push(purpose, Ok(text.into()));
        self
    }

    pub fn fail(self, purpose: Purpose, error: OracleError) -> Self {
        self.push(purpose, Err(error));
        self
    }

    /// Answer every call for `purpose` with `text` once the queue is empty.
    pub fn repeat(self, purpose: Purpose, text: impl Into<String>) -> Self {
        self.repeat.lock().insert(purpose, text.into());
        self
    }

    pub fn push(&self, purpose: Purpose, reply: Result<String, OracleError>) {
        self.queues.lock().entry(purpose).or_default().push_back(reply);
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self, purpose: Purpose) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.purpose == purpose)
            .count()
    }
}

#[async_trait]
impl OracleBackend for ScriptedBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, OracleError> {
        self.requests.lock().push(request.clone());
        if let Some(reply) = self
            .queues
            .lock()
            .get_mut(&request.purpose)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        self.repeat
            .lock()
            .get(&request.purpose)
            .cloned()
            .ok_or_else(|| {
                OracleError::unavailable(format!("no scripted reply for {:?}", request.purpose))
            })
    }
}
