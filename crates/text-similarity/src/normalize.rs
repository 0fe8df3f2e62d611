use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Words carrying no distinguishing content in short report bullets.
pub static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "then", "so", "of", "to", "in", "on", "at",
        "by", "for", "with", "from", "into", "onto", "over", "under", "about", "as", "is", "are",
        "was", "were", "be", "been", "being", "it", "its", "this", "that", "these", "those",
        "there", "their", "they", "them", "we", "our", "you", "your", "i", "me", "my", "he",
        "she", "his", "her", "can", "could", "should", "would", "will", "may", "might", "do",
        "does", "did", "has", "have", "had", "not", "no", "very", "more", "most", "some", "any",
        "each", "every", "all", "also", "just", "than", "too", "which", "who", "when", "while",
        "where", "what", "how", "up", "down", "out", "via",
    ]
    .into_iter()
    .collect()
});

const SUFFIXES: &[&str] = &["ingly", "edly", "ing", "ed", "es", "ly", "s"];
const MIN_STEM: usize = 3;

/// Strip one common English suffix, keeping at least three characters.
pub fn stem(token: &str) -> &str {
    if token.ends_with("ss") {
        return token;
    }
    for suffix in SUFFIXES {
        if let Some(stripped) = token.strip_suffix(suffix) {
            if stripped.chars().count() >= MIN_STEM {
                return stripped;
            }
        }
    }
    token
}

/// Canonical form of a phrase for storage and comparison.
pub fn normalize_phrase(text: &str) -> String {
    let lowered: String = text
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() {
                ch.to_lowercase().next().unwrap_or(ch)
            } else {
                ' '
            }
        })
        .collect();

    lowered
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(word))
        .map(stem)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tokens of an already-normalized phrase.
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}
