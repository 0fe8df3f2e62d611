//! Configuration for the per-persona agent loop.

use serde::{Deserialize, Serialize};

/// Configuration for the observe-propose-validate-execute loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentLoopConfig {
    /// History length at which the session is force-terminated.
    /// Default: 60
    pub step_ceiling: usize,

    /// Characters of page content handed to the oracle each step.
    /// Default: 4000
    pub dom_digest_chars: usize,

    /// Most recent history entries included in the oracle context.
    /// Default: 8
    pub history_window: usize,

    /// Page text fragments that mean the order review was reached.
    pub stop_markers: Vec<String>,

    /// Lower clamp for `wait` actions in milliseconds.
    /// Default: 100
    pub wait_min_ms: u64,

    /// Upper clamp for `wait` actions in milliseconds.
    /// Default: 5000
    pub wait_max_ms: u64,

    /// The wait duration the oracle asks for most often.
    /// Default: 1000
    pub default_wait_ms: u64,

    /// Replacements for the default duration, picked by step parity.
    /// Default: [900, 1300]
    pub wait_alternates_ms: [u64; 2],

    /// Hard upper bound for `wait_for` polling.
    /// Default: 1500
    pub wait_for_cap_ms: u64,

    /// Poll interval for `wait_for`.
    /// Default: 100
    pub wait_for_poll_ms: u64,

    /// Timeout for click and type actions.
    /// Default: 8000
    pub action_timeout_ms: u64,

    /// Consecutive oracle transport failures before the session errors out.
    /// Default: 3
    pub max_consecutive_oracle_failures: u32,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            step_ceiling: 60,
            dom_digest_chars: 4_000,
            history_window: 8,
            stop_markers: default_stop_markers(),
            wait_min_ms: 100,
            wait_max_ms: 5_000,
            default_wait_ms: 1_000,
            wait_alternates_ms: [900, 1_300],
            wait_for_cap_ms: 1_500,
            wait_for_poll_ms: 100,
            action_timeout_ms: 8_000,
            max_consecutive_oracle_failures: 3,
        }
    }
}

fn default_stop_markers() -> Vec<String> {
    ["Review order", "Review your order", "Place order", "Order summary"]
        .iter()
        .map(|marker| marker.to_string())
        .collect()
}

impl AgentLoopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the step ceiling.
    pub fn step_ceiling(mut self, ceiling: usize) -> Self {
        self.step_ceiling = ceiling;
        self
    }

    /// Builder: replace the stop markers.
    pub fn stop_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the oracle failure budget.
    pub fn oracle_failures(mut self, count: u32) -> Self {
        self.max_consecutive_oracle_failures = count;
        self
    }

    /// First stop marker present in `content`, compared case-insensitively.
    pub fn find_stop_marker(&self, content: &str) -> Option<&str> {
        let lower = content.to_lowercase();
        self.stop_markers
            .iter()
            .filter(|marker| !marker.trim().is_empty())
            .find(|marker| lower.contains(&marker.to_lowercase()))
            .map(String::as_str)
    }

    /// Duration actually slept for a `wait` action requested at `step`.
    pub fn effective_wait_ms(&self, requested: Option<f64>, step: u32) -> u64 {
        let requested = match requested {
            Some(ms) if ms.is_finite() && ms >= 0.0 => ms.round() as u64,
            _ => self.default_wait_ms,
        };
        let perturbed = if requested == self.default_wait_ms {
            self.wait_alternates_ms[(step % 2) as usize]
        } else {
            requested
        };
        perturbed.clamp(self.wait_min_ms, self.wait_max_ms.max(self.wait_min_ms))
    }

    /// Polling bound for a `wait_for` action.
    pub fn effective_wait_for_ms(&self, requested: Option<f64>) -> u64 {
        match requested {
            Some(ms) if ms.is_finite() && ms > 0.0 => (ms.round() as u64).min(self.wait_for_cap_ms),
            _ => self.wait_for_cap_ms,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.step_ceiling == 0 {
            return Err("step_ceiling must be at least 1".to_string());
        }
        if self.wait_min_ms > self.wait_max_ms {
            return Err("wait_min_ms must not exceed wait_max_ms".to_string());
        }
        if self.wait_for_poll_ms == 0 {
            return Err("wait_for_poll_ms must be at least 1".to_string());
        }
        if self.max_consecutive_oracle_failures == 0 {
            return Err("max_consecutive_oracle_failures must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wait_is_perturbed_by_step_parity() {
        let config = AgentLoopConfig::default();
        assert_eq!(config.effective_wait_ms(Some(1000.0), 2), 900);
        assert_eq!(config.effective_wait_ms(Some(1000.0), 3), 1300);
        assert_eq!(config.effective_wait_ms(None, 1), 1300);
    }

    #[test]
    fn waits_are_clamped() {
        let config = AgentLoopConfig::default();
        assert_eq!(config.effective_wait_ms(Some(20.0), 1), 100);
        assert_eq!(config.effective_wait_ms(Some(60_000.0), 1), 5_000);
        assert_eq!(config.effective_wait_ms(Some(f64::NAN), 2), 900);
        assert_eq!(config.effective_wait_ms(Some(2_500.4), 2), 2_500);
    }

    #[test]
    fn wait_for_never_exceeds_cap() {
        let config = AgentLoopConfig::default();
        assert_eq!(config.effective_wait_for_ms(Some(10_000.0)), 1_500);
        assert_eq!(config.effective_wait_for_ms(Some(400.0)), 400);
        assert_eq!(config.effective_wait_for_ms(None), 1_500);
    }

    #[test]
    fn stop_markers_match_case_insensitively() {
        let config = AgentLoopConfig::new().stop_markers(["Review order"]);
        assert_eq!(config.find_stop_marker("<h1>REVIEW ORDER</h1>"), Some("Review order"));
        assert_eq!(config.find_stop_marker("<h1>Menu</h1>"), None);
    }

    #[test]
    fn builder_and_validation() {
        let config = AgentLoopConfig::new().step_ceiling(0);
        assert!(config.validate().is_err());
        assert!(AgentLoopConfig::default().validate().is_ok());
    }
}
