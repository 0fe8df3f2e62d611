use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::HashSet;

use crate::normalize::{normalize_phrase, tokens};

/// Token n-grams of a normalized phrase.
///
/// Phrases shorter than the window contribute a single gram made of all their
/// tokens, so short bullets still compare meaningfully.
pub fn ngram_set(normalized: &str, window: usize) -> HashSet<String> {
    let words = tokens(normalized);
    let window = window.max(1);
    if words.is_empty() {
        return HashSet::new();
    }
    if words.len() < window {
        return std::iter::once(words.join(" ")).collect();
    }
    words.windows(window).map(|gram| gram.join(" ")).collect()
}

/// Jaccard overlap of the n-gram sets of two normalized phrases.
pub fn ngram_jaccard(a: &str, b: &str, window: usize) -> f64 {
    let grams_a = ngram_set(a, window);
    let grams_b = ngram_set(b, window);
    if grams_a.is_empty() || grams_b.is_empty() {
        return 0.0;
    }
    let intersection = grams_a.intersection(&grams_b).count();
    let union = grams_a.union(&grams_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Character-sequence similarity in `[0, 1]`.
pub fn char_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}

/// Highest n-gram overlap between a body and any prior body. Inputs are raw
/// text; normalization happens here.
pub fn corpus_overlap<'a, I>(body: &str, corpus: I, window: usize) -> f64
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = normalize_phrase(body);
    corpus
        .into_iter()
        .map(|prior| ngram_jaccard(&normalized, &normalize_phrase(prior), window))
        .fold(0.0, f64::max)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityVerdict {
    pub jaccard: f64,
    pub char_ratio: f64,
    pub too_similar: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityThresholds {
    /// Token window for n-gram overlap.
    pub ngram: usize,
    /// Jaccard overlap above which two phrases collide.
    pub jaccard: f64,
    /// Character similarity above which two phrases collide.
    pub char_ratio: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            ngram: 4,
            jaccard: 0.5,
            char_ratio: 0.82,
        }
    }
}

impl SimilarityThresholds {
    /// Compare two normalized phrases.
    pub fn compare(&self, a: &str, b: &str) -> SimilarityVerdict {
        if a == b {
            return SimilarityVerdict {
                jaccard: 1.0,
                char_ratio: 1.0,
                too_similar: true,
            };
        }
        let jaccard = ngram_jaccard(a, b, self.ngram);
        let char_ratio = char_similarity(a, b);
        SimilarityVerdict {
            jaccard,
            char_ratio,
            too_similar: jaccard > self.jaccard || char_ratio > self.char_ratio,
        }
    }

    pub fn too_similar(&self, a: &str, b: &str) -> bool {
        self.compare(a, b).too_similar
    }

    /// First prior phrase the candidate collides with, if any.
    pub fn find_conflict<'a, I>(&self, candidate: &str, corpus: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        corpus
            .into_iter()
            .find(|prior| self.too_similar(candidate, prior))
    }
}
