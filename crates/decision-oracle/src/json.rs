/// Best-effort recovery of a single JSON object from free-form model output.
///
/// Accepts a bare object, a fenced code block, or an object embedded in prose
/// (first balanced brace pair). String literals are respected while scanning so
/// braces inside values do not unbalance the match.
pub fn extract_json_object(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{')
        && trimmed.ends_with('}')
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return Some(trimmed.to_string());
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                if let Some(object) = balanced_object(block) {
                    return Some(object);
                }
            }
        }
    }

    balanced_object(raw)
}

fn balanced_object(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let rest = &raw[start..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        if in_string {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(trim_symmetric(&rest[..=idx]));
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Next step:\n```json\n{\"action\":\"click\",\"selector\":\"#menu\"}\n```";
        let extracted = extract_json_object(input).expect("json");
        assert!(extracted.starts_with('{'));
        assert!(extracted.contains("\"click\""));
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "I will wait { \"action\": \"wait\", \"ms\": 500 } then continue";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{ \"action\": \"wait\", \"ms\": 500 }");
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let input = "ok {\"action\":\"note\",\"tag\":\"ambiguous_label\",\"detail\":\"label reads '}'\"} done";
        let extracted = extract_json_object(input).expect("json");
        assert!(extracted.ends_with("'}'\"}"));
    }

    #[test]
    fn takes_first_of_several_objects() {
        let input = r##"{"action":"click","selector":"#cart"} then maybe {"action":"wait"}"##;
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, r##"{"action":"click","selector":"#cart"}"##);
    }

    #[test]
    fn returns_none_when_missing() {
        assert!(extract_json_object("no braces here").is_none());
        assert!(extract_json_object("{ never closed").is_none());
    }
}
