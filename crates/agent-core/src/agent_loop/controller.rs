//! Agent loop controller: the per-persona observe-propose-validate-execute
//! state machine.
//!
//! Termination is a race checked at every observation: a pre-checkout marker
//! on the page wins first, then the step ceiling. Unusable oracle replies and
//! safety violations terminate from inside the step.

use decision_oracle::{ActionContext, DecisionOracle};
use menuprobe_core_types::{
    diagnostics, BrowserAction, History, NoteTag, Persona, ProposedAction, WaitState,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::AgentLoopConfig;
use crate::browser::BrowserPage;
use crate::errors::PageError;
use crate::guard;

/// Phase of the loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Observing,
    Proposing,
    Validating,
    Executing,
    Terminal,
}

/// Terminal state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// A pre-checkout marker appeared on the page.
    ReachedReview,
    /// History reached the step ceiling.
    StepCeiling,
    /// The oracle proposed a purchase-finalization control.
    SafetyHalt,
    /// Unusable oracle output or a broken page.
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::ReachedReview => "reached_review",
            SessionStatus::StepCeiling => "step_ceiling",
            SessionStatus::SafetyHalt => "safety_halt",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionStatus::ReachedReview)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionStatus::SafetyHalt | SessionStatus::Failed)
    }
}

/// Result of one persona session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub status: SessionStatus,
    pub message: String,
    /// Consumed by the scorer.
    pub reached_review: bool,
    pub steps_taken: u32,
    pub history: History,
}

impl SessionOutcome {
    fn new(status: SessionStatus, message: String, history: History) -> Self {
        Self {
            reached_review: status.is_success(),
            steps_taken: history.current_step(),
            status,
            message,
            history,
        }
    }
}

enum Verdict {
    Execute(BrowserAction),
    Skip,
    Halt(String),
}

struct LoopState<'p> {
    persona: &'p str,
    phase: LoopPhase,
    consecutive_failures: u32,
    history: History,
}

impl<'p> LoopState<'p> {
    fn enter(&mut self, phase: LoopPhase) {
        debug!(
            persona = %self.persona,
            step = self.history.current_step(),
            from = ?self.phase,
            to = ?phase,
            "agent loop transition"
        );
        self.phase = phase;
    }

    fn finish(mut self, status: SessionStatus, message: impl Into<String>) -> SessionOutcome {
        self.enter(LoopPhase::Terminal);
        let message = message.into();
        info!(
            persona = %self.persona,
            status = status.as_str(),
            steps = self.history.current_step(),
            entries = self.history.len(),
            "{message}"
        );
        SessionOutcome::new(status, message, self.history)
    }
}

/// Drives one page through the loop using the oracle's proposals.
#[derive(Clone)]
pub struct AgentLoopController {
    config: AgentLoopConfig,
    oracle: DecisionOracle,
}

impl AgentLoopController {
    pub fn new(config: AgentLoopConfig, oracle: DecisionOracle) -> Self {
        Self { config, oracle }
    }

    pub fn config(&self) -> &AgentLoopConfig {
        &self.config
    }

    /// Run until a terminal state. `history` may already hold entries, such
    /// as the navigation diagnostic.
    pub async fn run(
        &self,
        persona: &Persona,
        page: &dyn BrowserPage,
        history: History,
    ) -> SessionOutcome {
        let mut state = LoopState {
            persona: &persona.id,
            phase: LoopPhase::Observing,
            consecutive_failures: 0,
            history,
        };
        let summary = persona.summary();

        loop {
            state.enter(LoopPhase::Observing);
            let content = match page.content().await {
                Ok(content) => content,
                Err(err) => {
                    let message = format!("page content unavailable: {err}");
                    state.history.error(message.clone());
                    return state.finish(SessionStatus::Failed, message);
                }
            };
            if let Some(marker) = self.config.find_stop_marker(&content) {
                state
                    .history
                    .info(format!("{}: {marker}", diagnostics::STOP_PRECHECKOUT));
                return state.finish(
                    SessionStatus::ReachedReview,
                    format!("pre-checkout marker '{marker}' reached"),
                );
            }
            if state.history.len() >= self.config.step_ceiling {
                state.history.info(diagnostics::STEP_CEILING);
                return state.finish(
                    SessionStatus::StepCeiling,
                    format!("step ceiling {} reached", self.config.step_ceiling),
                );
            }

            state.enter(LoopPhase::Proposing);
            let step = state.history.advance();
            let context = self.context(step, &summary, &content, &state.history);
            let proposed = match self.oracle.propose_action(&context).await {
                Ok(proposed) => {
                    state.consecutive_failures = 0;
                    proposed
                }
                Err(err) if err.is_protocol() => {
                    let message = format!("unusable oracle reply: {err}");
                    state.history.error(message.clone());
                    return state.finish(SessionStatus::Failed, message);
                }
                Err(err) => {
                    state.consecutive_failures += 1;
                    warn!(persona = %persona.id, step, error = %err, "oracle call failed");
                    state.history.warn(format!("oracle unavailable: {err}"));
                    if state.consecutive_failures >= self.config.max_consecutive_oracle_failures {
                        let message = format!(
                            "oracle failed {} consecutive times",
                            state.consecutive_failures
                        );
                        state.history.error(message.clone());
                        return state.finish(SessionStatus::Failed, message);
                    }
                    continue;
                }
            };

            state.enter(LoopPhase::Validating);
            let action = match self.validate(proposed, page, step, &mut state.history).await {
                Verdict::Execute(action) => action,
                Verdict::Skip => continue,
                Verdict::Halt(target) => {
                    warn!(persona = %persona.id, step, target = %target, "finalization control rejected");
                    state
                        .history
                        .error(format!("{}: {target}", diagnostics::SAFETY_HALT));
                    return state.finish(
                        SessionStatus::SafetyHalt,
                        format!("refused finalization control {target}"),
                    );
                }
            };

            state.enter(LoopPhase::Executing);
            self.execute(action, page, &mut state.history).await;
        }
    }

    fn context(&self, step: u32, summary: &str, content: &str, history: &History) -> ActionContext {
        ActionContext {
            step,
            step_ceiling: self.config.step_ceiling,
            persona_summary: summary.to_string(),
            dom_digest: content.chars().take(self.config.dom_digest_chars).collect(),
            recent: history
                .recent(self.config.history_window)
                .iter()
                .map(|entry| entry.brief())
                .collect(),
        }
    }

    async fn validate(
        &self,
        proposed: ProposedAction,
        page: &dyn BrowserPage,
        step: u32,
        history: &mut History,
    ) -> Verdict {
        match proposed {
            ProposedAction::Click { selector } => {
                let Some(selector) = present(selector) else {
                    history.warn(diagnostics::missing_target("<none>"));
                    return Verdict::Skip;
                };
                if let Some(verdict) = self.check_target(page, &selector, history).await {
                    return verdict;
                }
                Verdict::Execute(BrowserAction::Click { selector })
            }
            ProposedAction::Type { selector, text } => {
                let Some(selector) = present(selector) else {
                    history.warn(diagnostics::missing_target("<none>"));
                    return Verdict::Skip;
                };
                if let Some(verdict) = self.check_target(page, &selector, history).await {
                    return verdict;
                }
                let Some(text) = text else {
                    history.warn(format!("missing text @ {selector}"));
                    return Verdict::Skip;
                };
                Verdict::Execute(BrowserAction::Type { selector, text })
            }
            ProposedAction::Wait { ms } => Verdict::Execute(BrowserAction::Wait {
                ms: self.config.effective_wait_ms(ms, step),
            }),
            ProposedAction::WaitFor {
                selector,
                state,
                timeout_ms,
            } => {
                let Some(selector) = present(selector) else {
                    history.warn(diagnostics::missing_target("<none>"));
                    return Verdict::Skip;
                };
                Verdict::Execute(BrowserAction::WaitFor {
                    selector,
                    state: state.unwrap_or_default(),
                    timeout_ms: self.config.effective_wait_for_ms(timeout_ms),
                })
            }
            ProposedAction::Note { tag, detail } => {
                let raw = tag.unwrap_or_default();
                match raw.parse::<NoteTag>() {
                    Ok(tag) => Verdict::Execute(BrowserAction::Note {
                        tag,
                        detail: detail.unwrap_or_default(),
                    }),
                    Err(_) => {
                        history.warn(format!("unknown note tag '{raw}'"));
                        Verdict::Skip
                    }
                }
            }
        }
    }

    /// Safety and existence checks for click/type targets. `None` means the
    /// target may be acted on.
    async fn check_target(
        &self,
        page: &dyn BrowserPage,
        selector: &str,
        history: &mut History,
    ) -> Option<Verdict> {
        if guard::check_target(selector, None).is_some() {
            return Some(Verdict::Halt(selector.to_string()));
        }
        match page.exists(selector).await {
            Ok(true) => {}
            Ok(false) => {
                history.warn(diagnostics::missing_target(selector));
                return Some(Verdict::Skip);
            }
            Err(err) => {
                history.warn(format!("{} ({err})", diagnostics::missing_target(selector)));
                return Some(Verdict::Skip);
            }
        }
        // An unreadable label cannot be cleared against the denylist.
        let text = match page.element_text(selector).await {
            Ok(text) => text,
            Err(err) => {
                return Some(Verdict::Halt(format!("{selector} (label unreadable: {err})")));
            }
        };
        if let Some(fragment) = guard::check_target(selector, text.as_deref()) {
            return Some(Verdict::Halt(format!("{selector} ({fragment})")));
        }
        None
    }

    async fn execute(&self, action: BrowserAction, page: &dyn BrowserPage, history: &mut History) {
        let timeout = Duration::from_millis(self.config.action_timeout_ms);
        history.push_action(action.clone());
        match action {
            BrowserAction::Click { selector } => {
                if let Err(err) = page.click(&selector, timeout).await {
                    degrade(history, &selector, err);
                }
            }
            BrowserAction::Type { selector, text } => {
                if let Err(err) = page.fill(&selector, &text, timeout).await {
                    degrade(history, &selector, err);
                }
            }
            BrowserAction::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            BrowserAction::WaitFor {
                selector,
                state,
                timeout_ms,
            } => {
                self.poll(page, &selector, state, timeout_ms, history).await;
            }
            BrowserAction::Note { tag, .. } => {
                debug!(tag = %tag, "note recorded");
            }
        }
    }

    /// Bounded polling for an element state. Both outcomes are informational.
    async fn poll(
        &self,
        page: &dyn BrowserPage,
        selector: &str,
        wanted: WaitState,
        timeout_ms: u64,
        history: &mut History,
    ) {
        let limit = Duration::from_millis(timeout_ms);
        let interval = Duration::from_millis(self.config.wait_for_poll_ms.max(1));
        let started = Instant::now();
        loop {
            let satisfied = match page.element_state(selector).await {
                Ok(state) => state.satisfies(wanted),
                Err(err) => {
                    debug!(selector, error = %err, "element state unavailable");
                    false
                }
            };
            let elapsed = started.elapsed();
            if satisfied {
                history.info(format!(
                    "wait_for {selector} {} after {}ms",
                    wanted.as_str(),
                    elapsed.as_millis()
                ));
                return;
            }
            if elapsed >= limit {
                history.info(format!(
                    "wait_for {selector} not {} within {timeout_ms}ms",
                    wanted.as_str()
                ));
                return;
            }
            tokio::time::sleep(interval.min(limit - elapsed)).await;
        }
    }
}

fn present(selector: Option<String>) -> Option<String> {
    selector
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn degrade(history: &mut History, selector: &str, err: PageError) {
    warn!(selector, error = %err, "browser action degraded");
    if err.is_timeout() {
        history.warn(diagnostics::timeout(selector));
    } else {
        history.warn(format!("action failed @ {selector}: {err}"));
    }
}
