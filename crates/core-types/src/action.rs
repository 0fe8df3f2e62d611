//! Action vocabulary shared by the oracle wire format and the session history.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed vocabulary for annotation notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteTag {
    DietMismatch,
    AllergenLabelMissing,
    FilterMissing,
    AmbiguousLabel,
    FeeNotTransparent,
    UpsellOverload,
    AccessibilityLabelMissing,
    LowContrast,
    TinyTapTarget,
    BudgetMet,
    BudgetExceeded,
    MilestoneItemAdded,
    MilestoneCartOpen,
    MilestoneReviewReached,
}

impl NoteTag {
    pub const ALL: [NoteTag; 14] = [
        NoteTag::DietMismatch,
        NoteTag::AllergenLabelMissing,
        NoteTag::FilterMissing,
        NoteTag::AmbiguousLabel,
        NoteTag::FeeNotTransparent,
        NoteTag::UpsellOverload,
        NoteTag::AccessibilityLabelMissing,
        NoteTag::LowContrast,
        NoteTag::TinyTapTarget,
        NoteTag::BudgetMet,
        NoteTag::BudgetExceeded,
        NoteTag::MilestoneItemAdded,
        NoteTag::MilestoneCartOpen,
        NoteTag::MilestoneReviewReached,
    ];

    /// Tags treated as human-centered-critical when scoring.
    pub const SEVERE: [NoteTag; 6] = [
        NoteTag::DietMismatch,
        NoteTag::AllergenLabelMissing,
        NoteTag::FeeNotTransparent,
        NoteTag::AccessibilityLabelMissing,
        NoteTag::LowContrast,
        NoteTag::TinyTapTarget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteTag::DietMismatch => "diet_mismatch",
            NoteTag::AllergenLabelMissing => "allergen_label_missing",
            NoteTag::FilterMissing => "filter_missing",
            NoteTag::AmbiguousLabel => "ambiguous_label",
            NoteTag::FeeNotTransparent => "fee_not_transparent",
            NoteTag::UpsellOverload => "upsell_overload",
            NoteTag::AccessibilityLabelMissing => "accessibility_label_missing",
            NoteTag::LowContrast => "low_contrast",
            NoteTag::TinyTapTarget => "tiny_tap_target",
            NoteTag::BudgetMet => "budget_met",
            NoteTag::BudgetExceeded => "budget_exceeded",
            NoteTag::MilestoneItemAdded => "milestone_item_added",
            NoteTag::MilestoneCartOpen => "milestone_cart_open",
            NoteTag::MilestoneReviewReached => "milestone_review_reached",
        }
    }

    pub fn is_severe(&self) -> bool {
        Self::SEVERE.contains(self)
    }

    pub fn is_milestone(&self) -> bool {
        matches!(
            self,
            NoteTag::MilestoneItemAdded
                | NoteTag::MilestoneCartOpen
                | NoteTag::MilestoneReviewReached
        )
    }
}

impl fmt::Display for NoteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteTag {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(|ch: char| ch == '-' || ch == ' ', "_");
        let normalized = match normalized.as_str() {
            "a11y_label_missing" | "aria_label_missing" => "accessibility_label_missing",
            "item_added" => "milestone_item_added",
            "cart_open" | "cart_opened" => "milestone_cart_open",
            "review_reached" => "milestone_review_reached",
            other => other,
        };
        NoteTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == normalized)
            .ok_or_else(|| format!("unknown note tag '{raw}'"))
    }
}

/// Element state targeted by a `wait_for` action.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Attached,
    Hidden,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Attached => "attached",
            WaitState::Hidden => "hidden",
            WaitState::Detached => "detached",
        }
    }
}

/// Raw reply shape requested from the decision oracle.
///
/// The `action` tag is a closed set: unknown kinds fail to decode instead of
/// falling back to a default. Optional fields are validated by the executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposedAction {
    Click {
        #[serde(default)]
        selector: Option<String>,
    },
    Type {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    Wait {
        #[serde(default)]
        ms: Option<f64>,
    },
    WaitFor {
        #[serde(default)]
        selector: Option<String>,
        #[serde(default)]
        state: Option<WaitState>,
        #[serde(default)]
        timeout_ms: Option<f64>,
    },
    Note {
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        detail: Option<String>,
    },
}

/// A validated action as recorded in the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserAction {
    Click {
        selector: String,
    },
    Type {
        selector: String,
        text: String,
    },
    Wait {
        ms: u64,
    },
    WaitFor {
        selector: String,
        state: WaitState,
        timeout_ms: u64,
    },
    Note {
        tag: NoteTag,
        #[serde(default)]
        detail: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Click,
    Type,
    Wait,
    WaitFor,
    Note,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Wait => "wait",
            ActionKind::WaitFor => "wait_for",
            ActionKind::Note => "note",
        }
    }
}

impl BrowserAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            BrowserAction::Click { .. } => ActionKind::Click,
            BrowserAction::Type { .. } => ActionKind::Type,
            BrowserAction::Wait { .. } => ActionKind::Wait,
            BrowserAction::WaitFor { .. } => ActionKind::WaitFor,
            BrowserAction::Note { .. } => ActionKind::Note,
        }
    }

    pub fn selector(&self) -> Option<&str> {
        match self {
            BrowserAction::Click { selector }
            | BrowserAction::Type { selector, .. }
            | BrowserAction::WaitFor { selector, .. } => Some(selector.as_str()),
            BrowserAction::Wait { .. } | BrowserAction::Note { .. } => None,
        }
    }

    pub fn note_tag(&self) -> Option<NoteTag> {
        match self {
            BrowserAction::Note { tag, .. } => Some(*tag),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposed_action_rejects_unknown_kind() {
        let err = serde_json::from_str::<ProposedAction>(r#"{"action":"scroll","px":300}"#);
        assert!(err.is_err());
    }

    #[test]
    fn proposed_action_decodes_wait_with_float_ms() {
        let action: ProposedAction = serde_json::from_str(r#"{"action":"wait","ms":1000.0}"#)
            .expect("wait decodes");
        assert_eq!(action, ProposedAction::Wait { ms: Some(1000.0) });
    }

    #[test]
    fn note_tag_parses_aliases() {
        assert_eq!(
            "a11y-label-missing".parse::<NoteTag>().unwrap(),
            NoteTag::AccessibilityLabelMissing
        );
        assert_eq!(
            "milestone_item_added".parse::<NoteTag>().unwrap(),
            NoteTag::MilestoneItemAdded
        );
        assert!("vibes".parse::<NoteTag>().is_err());
    }

    #[test]
    fn severe_tags_exclude_milestones_and_budget() {
        assert!(NoteTag::LowContrast.is_severe());
        assert!(!NoteTag::BudgetExceeded.is_severe());
        assert!(NoteTag::ALL
            .iter()
            .filter(|tag| tag.is_milestone())
            .all(|tag| !tag.is_severe()));
    }

    #[test]
    fn recorded_action_serializes_with_action_tag() {
        let json = serde_json::to_string(&BrowserAction::Click {
            selector: "#add-to-cart".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"action\":\"click\""));
    }
}
