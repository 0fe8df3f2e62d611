//! Offline report authoring, used when the analysis oracle is unavailable or
//! returns nothing usable.

use menuprobe_core_types::Persona;
use phrase_store::Section;
use rand::seq::SliceRandom;
use rand::Rng;
use session_judge::{persona_rng, SignalVector};

use crate::category::GENERIC;
use crate::markdown::ReportSections;
use crate::pools::PhrasePools;

/// Bullets for the fixed section, derived from signals.
pub fn critical_from_signals(signals: &SignalVector) -> Vec<String> {
    let mut issues = Vec::new();
    if signals.errors > 0 {
        issues.push(format!(
            "Session ended with {} error diagnostic(s) before the order could be reviewed",
            signals.errors
        ));
    }
    if signals.severe_notes > 0 {
        issues.push(format!(
            "{} diet, allergen, fee or accessibility problem(s) were flagged while browsing",
            signals.severe_notes
        ));
    }
    if signals.timeouts > 0 {
        issues.push(format!(
            "{} action(s) timed out waiting for page controls",
            signals.timeouts
        ));
    }
    if signals.budget_exceeded {
        issues.push("The order total went over the shopper's budget".to_string());
    }
    if !signals.m_item {
        issues.push("No item could be added to the cart".to_string());
    }
    issues
}

/// One-line summary for reports authored without the oracle.
pub fn fallback_description(signals: &SignalVector) -> String {
    if signals.m_review {
        format!(
            "Reached the order review in {} step(s) with {} warning(s).",
            signals.steps, signals.warnings
        )
    } else if signals.m_item {
        format!(
            "Added an item but stopped before the order review after {} step(s).",
            signals.steps
        )
    } else {
        format!(
            "Could not add an item within {} step(s) ({} error(s), {} timeout(s)).",
            signals.steps, signals.errors, signals.timeouts
        )
    }
}

/// Author a complete report from the phrase pools. Deterministic per
/// persona id.
pub fn author_report(pools: &PhrasePools, persona: &Persona, signals: &SignalVector) -> ReportSections {
    let mut rng = persona_rng(&persona.id);

    let worked_count = rng.gen_range(2..=3);
    let friction_count = rng.gen_range(2..=3);
    let worked = pick(pools, Section::WorkedWell, persona, signals, worked_count, &mut rng);
    let friction = pick(pools, Section::MinorFriction, persona, signals, friction_count, &mut rng);

    let mut improvement_categories: Vec<&str> = friction
        .iter()
        .map(|(category, _)| pools.improvement_category_for(category))
        .collect();
    improvement_categories.shuffle(&mut rng);

    let mut improvements: Vec<String> = Vec::new();
    for category in improvement_categories {
        let phrases = pools
            .improvements
            .get(category)
            .or_else(|| pools.improvements.get(GENERIC));
        let Some(phrases) = phrases else {
            continue;
        };
        let fresh: Vec<&String> = phrases
            .iter()
            .filter(|phrase| !improvements.contains(*phrase))
            .collect();
        if let Some(choice) = fresh.choose(&mut rng) {
            improvements.push((*choice).clone());
        }
    }

    ReportSections {
        worked_well: worked.into_iter().map(|(_, text)| text).collect(),
        critical_issues: critical_from_signals(signals),
        minor_friction: friction.into_iter().map(|(_, text)| text).collect(),
        improvements,
    }
}

fn pick<R: Rng>(
    pools: &PhrasePools,
    section: Section,
    persona: &Persona,
    signals: &SignalVector,
    count: usize,
    rng: &mut R,
) -> Vec<(String, String)> {
    // One bullet per axis first, then fill from whatever is left.
    let candidates = pools.candidates(section, persona, signals, rng);
    let mut chosen: Vec<(String, String)> = Vec::new();
    for candidate in &candidates {
        if chosen.len() >= count {
            break;
        }
        if !chosen.iter().any(|(category, _)| *category == candidate.0) {
            chosen.push(candidate.clone());
        }
    }
    for candidate in candidates {
        if chosen.len() >= count {
            break;
        }
        if !chosen.iter().any(|(_, text)| *text == candidate.1) {
            chosen.push(candidate);
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vegan() -> Persona {
        let mut persona = Persona::new("D-02");
        persona.diet = "vegan".into();
        persona.goal = "Order a vegan ramen (Pickup, under $12) near campus".into();
        persona
    }

    #[test]
    fn authoring_is_deterministic_per_persona() {
        let pools = PhrasePools::builtin();
        let signals = SignalVector::default();
        let first = author_report(&pools, &vegan(), &signals);
        let second = author_report(&pools, &vegan(), &signals);
        assert_eq!(first, second);
        assert!((2..=3).contains(&first.worked_well.len()));
        assert!((2..=3).contains(&first.minor_friction.len()));
        assert!(!first.improvements.is_empty());
    }

    #[test]
    fn critical_issues_follow_signals() {
        let signals = SignalVector {
            errors: 1,
            timeouts: 2,
            m_item: true,
            ..SignalVector::default()
        };
        let issues = critical_from_signals(&signals);
        assert_eq!(issues.len(), 2);
        assert!(issues[1].starts_with("2 action(s) timed out"));
        assert!(critical_from_signals(&SignalVector {
            m_item: true,
            ..SignalVector::default()
        })
        .is_empty());
    }

    #[test]
    fn description_reflects_progress() {
        let signals = SignalVector {
            m_item: true,
            m_review: true,
            steps: 12,
            ..SignalVector::default()
        };
        assert!(fallback_description(&signals).starts_with("Reached the order review in 12"));
    }
}
