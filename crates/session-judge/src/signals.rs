use menuprobe_core_types::{diagnostics, BrowserAction, DiagnosticLevel, History, NoteTag};
use serde::{Deserialize, Serialize};

/// Waits at or above this duration count as long waits.
pub const LONG_WAIT_MS: u64 = 3_000;

/// Compact summary of a session, always recomputed from its History.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVector {
    pub errors: u32,
    pub warnings: u32,
    pub timeouts: u32,
    pub long_waits: u32,
    pub steps: u32,
    pub m_item: bool,
    pub m_cart: bool,
    pub m_review: bool,
    pub prechk_stop: bool,
    pub budget_met: bool,
    pub budget_exceeded: bool,
    pub severe_notes: u32,
}

impl SignalVector {
    /// Fold in the loop's terminal flag; a review reached by marker counts
    /// as the review milestone.
    pub fn with_reached_review(mut self, reached: bool) -> Self {
        self.m_review |= reached;
        self
    }

    /// Review reached with no severe notes, errors, timeouts or long waits
    /// and the budget respected.
    pub fn is_perfect_run(&self) -> bool {
        self.m_review
            && self.severe_notes == 0
            && self.errors == 0
            && self.timeouts == 0
            && self.long_waits == 0
            && !self.budget_exceeded
    }
}

/// Pure reduction of a History. Presence checks are order-independent.
pub fn extract_signals(history: &History) -> SignalVector {
    let mut signals = SignalVector {
        steps: history.current_step(),
        ..SignalVector::default()
    };

    for record in history.diagnostics() {
        match record.level {
            DiagnosticLevel::Error => signals.errors += 1,
            DiagnosticLevel::Warn => signals.warnings += 1,
            DiagnosticLevel::Info => {}
        }
        if record.level != DiagnosticLevel::Info && diagnostics::is_timeout(&record.message) {
            signals.timeouts += 1;
        }
        if diagnostics::is_precheckout_stop(&record.message) {
            signals.prechk_stop = true;
        }
    }

    for record in history.actions() {
        match &record.action {
            BrowserAction::Wait { ms } if *ms >= LONG_WAIT_MS => signals.long_waits += 1,
            BrowserAction::Note { tag, .. } => {
                if tag.is_severe() {
                    signals.severe_notes += 1;
                }
                match tag {
                    NoteTag::MilestoneItemAdded => signals.m_item = true,
                    NoteTag::MilestoneCartOpen => signals.m_cart = true,
                    NoteTag::MilestoneReviewReached => signals.m_review = true,
                    NoteTag::BudgetMet => signals.budget_met = true,
                    NoteTag::BudgetExceeded => signals.budget_exceeded = true,
                    _ => {}
                }
            }
            _ => {}
        }
    }

    signals.m_review |= signals.prechk_stop;
    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_flags_are_presence_based() {
        let mut history = History::new();
        history.advance();
        history.push_action(BrowserAction::Note {
            tag: NoteTag::BudgetExceeded,
            detail: "cart at $14".into(),
        });
        history.advance();
        history.push_action(BrowserAction::Note {
            tag: NoteTag::BudgetMet,
            detail: "removed side".into(),
        });
        let signals = extract_signals(&history);
        assert!(signals.budget_met);
        assert!(signals.budget_exceeded);
    }

    #[test]
    fn long_waits_and_severe_notes_are_counted() {
        let mut history = History::new();
        history.advance();
        history.push_action(BrowserAction::Wait { ms: 3_000 });
        history.push_action(BrowserAction::Wait { ms: 2_999 });
        history.push_action(BrowserAction::Note {
            tag: NoteTag::LowContrast,
            detail: String::new(),
        });
        history.push_action(BrowserAction::Note {
            tag: NoteTag::FilterMissing,
            detail: String::new(),
        });
        let signals = extract_signals(&history);
        assert_eq!(signals.long_waits, 1);
        assert_eq!(signals.severe_notes, 1);
        assert_eq!(signals.steps, 1);
    }

    #[test]
    fn info_wait_for_outcomes_are_not_timeouts() {
        let mut history = History::new();
        history.info("wait_for #banner not visible within 1500ms");
        history.warn(diagnostics::timeout("#slow"));
        history.error("timeout @ #checkout");
        let signals = extract_signals(&history);
        assert_eq!(signals.timeouts, 2);
        assert_eq!(signals.errors, 1);
        assert_eq!(signals.warnings, 1);
    }
}
