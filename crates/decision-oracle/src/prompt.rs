//! Prompt text for every oracle call site.

use menuprobe_core_types::{History, NoteTag, Persona};

/// Compact observation handed to the oracle once per step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionContext {
    pub step: u32,
    pub step_ceiling: usize,
    pub persona_summary: String,
    pub dom_digest: String,
    /// One-line renderings of the most recent history entries, oldest first.
    pub recent: Vec<String>,
}

const ANALYSIS_HISTORY_LIMIT: usize = 80;

pub fn action_system_prompt() -> String {
    let tags = NoteTag::ALL
        .iter()
        .map(NoteTag::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are a usability tester acting as the persona described by the user, \
         exploring a mobile food-ordering site one action at a time.\n\
         Reply with exactly one JSON object and nothing else. Allowed shapes:\n\
         {{\"action\":\"click\",\"selector\":\"CSS\"}}\n\
         {{\"action\":\"type\",\"selector\":\"CSS\",\"text\":\"...\"}}\n\
         {{\"action\":\"wait\",\"ms\":1000}}\n\
         {{\"action\":\"wait_for\",\"selector\":\"CSS\",\"state\":\"visible|attached|hidden|detached\",\"timeout_ms\":1500}}\n\
         {{\"action\":\"note\",\"tag\":\"TAG\",\"detail\":\"...\"}}\n\
         Note tags: {tags}.\n\
         Record milestone notes when an item is added, the cart is opened, or the order review is reached. \
         Never place an order, pay, or confirm a purchase; stop at the review step."
    )
}

pub fn action_user_prompt(context: &ActionContext) -> String {
    let recent = if context.recent.is_empty() {
        "(none)".to_string()
    } else {
        context.recent.join("\n")
    };
    format!(
        "Persona: {}\nStep {} of at most {}.\nRecent history:\n{}\nPage content (truncated):\n{}",
        context.persona_summary, context.step, context.step_ceiling, recent, context.dom_digest
    )
}

pub fn analysis_system_prompt() -> &'static str {
    "You review a scripted usability session on a food-ordering site from the persona's point of view. \
     Reply with one JSON object: {\"score\": 1-5, \"description\": \"one sentence\", \"markdown\": \"...\"}. \
     The markdown must contain exactly these sections in this order, each a bullet list: \
     ## What Worked Well, ## Critical Issues, ## Minor Friction, ## Suggested Improvements. \
     Be specific to what happened in the session; avoid stock phrasing."
}

pub fn analysis_user_prompt(persona: &Persona, history: &History) -> String {
    let lines = history
        .recent(ANALYSIS_HISTORY_LIMIT)
        .iter()
        .map(|entry| entry.brief())
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Persona: {}\nSession history ({} entries, most recent {} shown):\n{}",
        persona.summary(),
        history.len(),
        history.len().min(ANALYSIS_HISTORY_LIMIT),
        lines
    )
}

pub fn suggestions_system_prompt() -> &'static str {
    "You propose concrete usability improvements for a mobile food-ordering site. \
     Reply with one JSON object: {\"suggestions\": [\"...\", ...]}. \
     Each suggestion is one sentence and must not restate any forbidden phrase, even reworded."
}

pub fn suggestions_user_prompt(persona: &Persona, count: usize, forbidden: &[String]) -> String {
    format!(
        "Persona: {}\nNeed {} new suggestions.\nForbidden phrases:\n{}",
        persona.summary(),
        count,
        bullet_list(forbidden)
    )
}

pub fn rewrite_system_prompt() -> &'static str {
    "You rewrite usability reports so they do not repeat earlier reports. \
     Keep the four section headings, their order, and the meaning of every bullet; change the wording. \
     Reply with one JSON object: {\"markdown\": \"...\"}."
}

pub fn rewrite_user_prompt(markdown: &str, forbidden: &[String]) -> String {
    format!(
        "Avoid these phrases:\n{}\n\nReport to rewrite:\n{}",
        bullet_list(forbidden),
        markdown
    )
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_prompt_lists_every_tag() {
        let prompt = action_system_prompt();
        for tag in NoteTag::ALL {
            assert!(prompt.contains(tag.as_str()), "{tag}");
        }
    }

    #[test]
    fn user_prompt_marks_empty_history() {
        let context = ActionContext {
            step: 1,
            step_ceiling: 60,
            persona_summary: "id=U-01".to_string(),
            dom_digest: "<html>".to_string(),
            recent: Vec::new(),
        };
        let prompt = action_user_prompt(&context);
        assert!(prompt.contains("(none)"));
        assert!(prompt.contains("Step 1 of at most 60"));
    }
}
