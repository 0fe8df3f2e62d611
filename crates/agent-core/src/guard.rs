//! Purchase-finalization denylist.

use once_cell::sync::Lazy;
use regex::Regex;

static FINALIZE_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)(place[\s_-]*(my[\s_-]*|your[\s_-]*)?order|pay[\s_-]*now|(submit|confirm)[\s_-]*(my[\s_-]*|your[\s_-]*)?(payment|order|purchase)|(complete|finali[sz]e|finish)[\s_-]*(checkout|purchase|order|payment)|buy[\s_-]*now|checkout[\s_-]*(submit|confirm))",
    )
    .ok()
});

/// Returns the denylisted fragment if `text` names a finalization control.
///
/// Fails closed: if the pattern is unavailable every non-empty target is
/// treated as a finalization control.
pub fn finalization_match(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    match FINALIZE_PATTERN.as_ref() {
        Some(pattern) => pattern.find(text).map(|found| found.as_str().to_string()),
        None => Some(text.to_string()),
    }
}

/// Check a target by selector and, when known, by its visible text.
pub fn check_target(selector: &str, visible_text: Option<&str>) -> Option<String> {
    finalization_match(selector).or_else(|| visible_text.and_then(finalization_match))
}
