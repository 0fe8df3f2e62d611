//! Append-only session history.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::BrowserAction;

/// Message conventions for diagnostics that downstream extraction keys on.
pub mod diagnostics {
    pub const TIMEOUT_PREFIX: &str = "timeout @ ";
    pub const MISSING_TARGET_PREFIX: &str = "missing target @ ";
    pub const STOP_PRECHECKOUT: &str = "stop_precheckout";
    pub const STEP_CEILING: &str = "step_ceiling";
    pub const SAFETY_HALT: &str = "safety_halt";

    pub fn timeout(selector: &str) -> String {
        format!("{TIMEOUT_PREFIX}{selector}")
    }

    pub fn missing_target(selector: &str) -> String {
        format!("{MISSING_TARGET_PREFIX}{selector}")
    }

    pub fn is_timeout(message: &str) -> bool {
        message.trim_start().starts_with("timeout")
    }

    pub fn is_precheckout_stop(message: &str) -> bool {
        message.trim_start().starts_with(STOP_PRECHECKOUT)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    #[serde(alias = "informational")]
    Info,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub step: u32,
    pub action: BrowserAction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub step: u32,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEntry {
    Action(ActionRecord),
    Diagnostic(DiagnosticRecord),
}

impl HistoryEntry {
    pub fn step(&self) -> u32 {
        match self {
            HistoryEntry::Action(record) => record.step,
            HistoryEntry::Diagnostic(record) => record.step,
        }
    }

    /// One-line rendering used when feeding recent history back to the oracle.
    pub fn brief(&self) -> String {
        match self {
            HistoryEntry::Action(record) => match serde_json::to_string(&record.action) {
                Ok(json) => format!("#{} {}", record.step, json),
                Err(_) => format!("#{} {}", record.step, record.action.kind().as_str()),
            },
            HistoryEntry::Diagnostic(record) => {
                let level = match record.level {
                    DiagnosticLevel::Error => "error",
                    DiagnosticLevel::Warn => "warn",
                    DiagnosticLevel::Info => "info",
                };
                format!("#{} {}: {}", record.step, level, record.message)
            }
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history step {found} follows step {previous}")]
    OutOfOrder { previous: u32, found: u32 },
}

/// Ordered record of one persona session.
///
/// Steps are assigned by the history itself, so entries are ordered by step
/// index by construction. Nothing is ever removed or rewritten.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<HistoryEntry>", into = "Vec<HistoryEntry>")]
pub struct History {
    entries: Vec<HistoryEntry>,
    step: u32,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the next step and return its index (1-based).
    pub fn advance(&mut self) -> u32 {
        self.step += 1;
        self.step
    }

    pub fn current_step(&self) -> u32 {
        self.step
    }

    pub fn push_action(&mut self, action: BrowserAction) {
        self.entries.push(HistoryEntry::Action(ActionRecord {
            step: self.step,
            action,
        }));
    }

    pub fn push_diagnostic(&mut self, level: DiagnosticLevel, message: impl Into<String>) {
        self.entries.push(HistoryEntry::Diagnostic(DiagnosticRecord {
            step: self.step,
            level,
            message: message.into(),
        }));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_diagnostic(DiagnosticLevel::Error, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push_diagnostic(DiagnosticLevel::Warn, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push_diagnostic(DiagnosticLevel::Info, message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// The last `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            HistoryEntry::Action(record) => Some(record),
            HistoryEntry::Diagnostic(_) => None,
        })
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &DiagnosticRecord> {
        self.entries.iter().filter_map(|entry| match entry {
            HistoryEntry::Diagnostic(record) => Some(record),
            HistoryEntry::Action(_) => None,
        })
    }

    pub fn action_count(&self) -> usize {
        self.actions().count()
    }
}

impl TryFrom<Vec<HistoryEntry>> for History {
    type Error = HistoryError;

    fn try_from(entries: Vec<HistoryEntry>) -> Result<Self, Self::Error> {
        let mut step = 0;
        for entry in &entries {
            let found = entry.step();
            if found < step {
                return Err(HistoryError::OutOfOrder {
                    previous: step,
                    found,
                });
            }
            step = found;
        }
        Ok(Self { entries, step })
    }
}

impl From<History> for Vec<HistoryEntry> {
    fn from(history: History) -> Self {
        history.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::NoteTag;

    #[test]
    fn steps_are_assigned_monotonically() {
        let mut history = History::new();
        history.info("navigated");
        let step = history.advance();
        history.push_action(BrowserAction::Click {
            selector: "#add-to-cart".to_string(),
        });
        history.warn(diagnostics::timeout("#add-to-cart"));
        history.advance();
        history.push_action(BrowserAction::Note {
            tag: NoteTag::MilestoneItemAdded,
            detail: String::new(),
        });

        let steps: Vec<u32> = history.entries().iter().map(HistoryEntry::step).collect();
        assert_eq!(steps, vec![0, 1, 1, 2]);
        assert_eq!(step, 1);
        assert_eq!(history.action_count(), 2);
    }

    #[test]
    fn recent_returns_tail() {
        let mut history = History::new();
        for idx in 0..5 {
            history.advance();
            history.info(format!("entry {idx}"));
        }
        let tail = history.recent(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].step(), 4);
        assert_eq!(history.recent(50).len(), 5);
    }

    #[test]
    fn deserialization_rejects_out_of_order_steps() {
        let raw = r#"[
            {"kind":"diagnostic","step":2,"level":"info","message":"a"},
            {"kind":"diagnostic","step":1,"level":"info","message":"b"}
        ]"#;
        assert!(serde_json::from_str::<History>(raw).is_err());
    }

    #[test]
    fn history_roundtrips_through_json() {
        let mut history = History::new();
        history.advance();
        history.push_action(BrowserAction::Wait { ms: 900 });
        history.info(diagnostics::STOP_PRECHECKOUT);

        let json = serde_json::to_string(&history).unwrap();
        let restored: History = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, history);
        assert_eq!(restored.current_step(), 1);
    }
}
