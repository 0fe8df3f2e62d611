//! In-page expressions. Selectors are embedded as JSON string literals.

fn literal(selector: &str) -> String {
    serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn exists(selector: &str) -> String {
    format!("document.querySelector({}) !== null", literal(selector))
}

pub(crate) fn inner_text(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
         return el ? (el.innerText || el.getAttribute('aria-label') || el.value || '') : null; }})()",
        literal(selector)
    )
}

pub(crate) fn element_state(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({}); \
         if (!el || !el.isConnected) return 'detached'; \
         const style = window.getComputedStyle(el); \
         const rect = el.getBoundingClientRect(); \
         const shown = style.display !== 'none' && style.visibility !== 'hidden' \
           && rect.width > 0 && rect.height > 0; \
         return shown ? 'visible' : 'hidden'; }})()",
        literal(selector)
    )
}

/// Function body run on an element to clear an input before typing.
pub(crate) const CLEAR_VALUE: &str = "function() { \
    if ('value' in this) { this.value = ''; } \
    this.dispatchEvent(new Event('input', { bubbles: true })); }";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_escaped() {
        let expr = exists(r#"button[aria-label="Add"]"#);
        assert_eq!(
            expr,
            r#"document.querySelector("button[aria-label=\"Add\"]") !== null"#
        );
    }

    #[test]
    fn state_script_reports_three_states() {
        let expr = element_state("#cart");
        for state in ["'detached'", "'visible'", "'hidden'"] {
            assert!(expr.contains(state));
        }
    }
}
