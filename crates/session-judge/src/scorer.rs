use menuprobe_core_types::persona_seed;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signals::SignalVector;

/// Signed score adjustments. All values are operator-configurable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub review_bonus: f64,
    pub severe_penalty: f64,
    /// Severe notes beyond this count are not penalized further.
    pub severe_cap: u32,
    pub timeout_penalty: f64,
    pub long_wait_penalty: f64,
    pub budget_exceeded_penalty: f64,
    pub budget_met_bonus: f64,
    /// Half-width of the persona-seeded jitter.
    pub jitter: f64,
    pub bias: f64,
    /// Step count above which an unfinished session is rated 2.
    pub step_threshold: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            review_bonus: 0.3,
            severe_penalty: 0.5,
            severe_cap: 2,
            timeout_penalty: 0.25,
            long_wait_penalty: 0.1,
            budget_exceeded_penalty: 0.5,
            budget_met_bonus: 0.2,
            jitter: 0.25,
            bias: 0.0,
            step_threshold: 40,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: u8,
    pub adjustment: f64,
    pub jitter: f64,
    pub raw: f64,
    pub score: u8,
}

/// Random source derived from the persona identifier alone.
pub fn persona_rng(persona_id: &str) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(persona_seed(persona_id))
}

/// Deterministic `(persona, signals, weights) → 1..=5` rating.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scorer {
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn score(&self, persona_id: &str, signals: &SignalVector) -> u8 {
        self.breakdown(persona_id, signals).score
    }

    pub fn base_score(&self, signals: &SignalVector) -> u8 {
        if signals.is_perfect_run() {
            5
        } else if signals.m_review {
            4
        } else if signals.m_cart && signals.m_item {
            4
        } else if signals.m_item {
            3
        } else if signals.errors > 0 || signals.steps > self.weights.step_threshold {
            2
        } else {
            3
        }
    }

    pub fn breakdown(&self, persona_id: &str, signals: &SignalVector) -> ScoreBreakdown {
        let w = &self.weights;
        let base = self.base_score(signals);

        let mut adjustment = 0.0;
        if signals.m_review {
            adjustment += w.review_bonus;
        }
        adjustment -= w.severe_penalty * f64::from(signals.severe_notes.min(w.severe_cap));
        adjustment -= w.timeout_penalty * f64::from(signals.timeouts);
        adjustment -= w.long_wait_penalty * f64::from(signals.long_waits);
        if signals.budget_exceeded {
            adjustment -= w.budget_exceeded_penalty;
        }
        if signals.budget_met {
            adjustment += w.budget_met_bonus;
        }

        let amplitude = if w.jitter.is_finite() { w.jitter.abs() } else { 0.0 };
        let jitter = if amplitude > 0.0 {
            persona_rng(persona_id).gen_range(-amplitude..=amplitude)
        } else {
            0.0
        };

        let raw = f64::from(base) + adjustment + jitter + w.bias;
        let bounded = if raw.is_finite() { raw } else { f64::from(base) };
        let score = bounded.clamp(1.0, 5.0).round() as u8;
        debug!(
            persona = persona_id,
            base, adjustment, jitter, raw, score, "session scored"
        );
        ScoreBreakdown {
            base,
            adjustment,
            jitter,
            raw,
            score,
        }
    }
}
