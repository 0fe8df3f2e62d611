//! Text similarity helpers used wherever report uniqueness is judged.
//!
//! Phrases are first reduced with [`normalize_phrase`] (lowercase, punctuation
//! stripped, stop-words dropped, light suffix stripping). Two independent
//! tests then compare normalized phrases: token n-gram Jaccard overlap and
//! character-sequence similarity. Either one exceeding its threshold marks a
//! pair as too similar.

mod metrics;
mod normalize;

pub use metrics::{
    char_similarity, corpus_overlap, ngram_jaccard, ngram_set, SimilarityThresholds,
    SimilarityVerdict,
};
pub use normalize::{normalize_phrase, stem, tokens, STOP_WORDS};
