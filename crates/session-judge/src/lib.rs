//! Session judging: History → signal vector → integer score.

pub mod scorer;
pub mod signals;

pub use scorer::{persona_rng, ScoreBreakdown, ScoreWeights, Scorer};
pub use signals::{extract_signals, SignalVector, LONG_WAIT_MS};
