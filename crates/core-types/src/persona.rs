use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const NONE_TAG: &str = "none";

/// A synthetic shopper profile. Produced externally; never mutated by a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub id: String,
    /// Sampling condition the persona was generated under (`uniform`, `diet`, `diverse`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub income: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "none_tag")]
    pub diet: String,
    #[serde(default = "none_tag")]
    pub accessibility: String,
    /// Free-text goal, e.g. `Order a vegan ramen (Delivery, under $12) near campus`.
    #[serde(default)]
    pub goal: String,
}

fn none_tag() -> String {
    NONE_TAG.to_string()
}

impl Persona {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            condition: None,
            age: 0,
            income: String::new(),
            location: String::new(),
            diet: none_tag(),
            accessibility: none_tag(),
            goal: String::new(),
        }
    }

    pub fn has_diet(&self) -> bool {
        is_set(&self.diet)
    }

    pub fn has_accessibility_need(&self) -> bool {
        is_set(&self.accessibility)
    }

    /// Budget ceiling embedded in the goal sentence (`under $12`).
    pub fn target_budget(&self) -> Option<f64> {
        let lower = self.goal.to_ascii_lowercase();
        let start = lower.find('$')? + 1;
        let digits: String = lower[start..]
            .chars()
            .take_while(|ch| ch.is_ascii_digit() || *ch == '.')
            .collect();
        digits.trim_end_matches('.').parse().ok()
    }

    /// Fulfilment mode embedded in the goal sentence.
    pub fn fulfilment_mode(&self) -> Option<&'static str> {
        let lower = self.goal.to_ascii_lowercase();
        if lower.contains("pickup") || lower.contains("pick-up") {
            Some("pickup")
        } else if lower.contains("delivery") {
            Some("delivery")
        } else {
            None
        }
    }

    /// Compact single-line description used in oracle prompts.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("id={}", self.id)];
        if self.age > 0 {
            parts.push(format!("age={}", self.age));
        }
        if !self.income.is_empty() {
            parts.push(format!("income={}", self.income));
        }
        if !self.location.is_empty() {
            parts.push(format!("location={}", self.location));
        }
        parts.push(format!("diet={}", self.diet));
        parts.push(format!("accessibility={}", self.accessibility));
        if let Some(mode) = self.fulfilment_mode() {
            parts.push(format!("mode={mode}"));
        }
        if !self.goal.is_empty() {
            parts.push(format!("goal={}", self.goal));
        }
        parts.join(" | ")
    }
}

fn is_set(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(NONE_TAG)
}

/// Hash a persona identifier into a 64-bit seed.
///
/// SHA-256 keeps the value identical across builds and platforms, unlike
/// `DefaultHasher`.
pub fn persona_seed(id: &str) -> u64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Fill empty identifiers with `P-<nn>` based on 1-based position.
pub fn assign_default_ids(personas: &mut [Persona]) {
    for (idx, persona) in personas.iter_mut().enumerate() {
        if persona.id.trim().is_empty() {
            persona.id = format!("P-{:02}", idx + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_stable_for_identifier() {
        assert_eq!(persona_seed("D-03"), persona_seed("D-03"));
        assert_ne!(persona_seed("D-03"), persona_seed("D-04"));
    }

    #[test]
    fn parses_budget_and_mode_from_goal() {
        let mut persona = Persona::new("U-01");
        persona.goal = "Order a vegan ramen (Pickup, under $12) near campus".to_string();
        assert_eq!(persona.target_budget(), Some(12.0));
        assert_eq!(persona.fulfilment_mode(), Some("pickup"));
        assert!(persona.summary().contains("mode=pickup"));
    }

    #[test]
    fn missing_fields_default_to_none_tags() {
        let persona: Persona = serde_json::from_str(r#"{"id":"F-01","age":40}"#).unwrap();
        assert!(!persona.has_diet());
        assert!(!persona.has_accessibility_need());
        assert_eq!(persona.target_budget(), None);
    }

    #[test]
    fn assigns_positional_ids() {
        let mut personas = vec![Persona::new(""), Persona::new("D-09"), Persona::new(" ")];
        assign_default_ids(&mut personas);
        assert_eq!(personas[0].id, "P-01");
        assert_eq!(personas[1].id, "D-09");
        assert_eq!(personas[2].id, "P-03");
    }
}
