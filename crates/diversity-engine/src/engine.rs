use std::collections::BTreeSet;

use decision_oracle::DecisionOracle;
use menuprobe_core_types::Persona;
use phrase_store::{Commit, PhraseStore, Section, StoreStats};
use rand::Rng;
use serde::{Deserialize, Serialize};
use session_judge::{persona_rng, SignalVector};
use text_similarity::{corpus_overlap, normalize_phrase, SimilarityThresholds};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::category::{categorize, TEMPLATED};
use crate::fallback::{self, critical_from_signals};
use crate::markdown::ReportSections;
use crate::pools::PhrasePools;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityConfig {
    pub thresholds: SimilarityThresholds,
    pub min_unique_worked: usize,
    pub min_unique_minor: usize,
    pub min_unique_improvements: usize,
    /// Upper bound per deduplicated section.
    pub max_bullets: usize,
    /// Improvements: global uses after which a phrase is rejected.
    pub phrase_cooldown: u32,
    /// Improvements: global uses after which a category is rejected.
    pub category_cooldown: u32,
    pub corpus_overlap_limit: f64,
    pub collision_limit: usize,
    pub rewrite_attempts: u32,
    pub suggestion_rounds: u32,
    pub template_attempts: usize,
    pub forbidden_limit: usize,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            thresholds: SimilarityThresholds::default(),
            min_unique_worked: 2,
            min_unique_minor: 2,
            min_unique_improvements: 2,
            max_bullets: 3,
            phrase_cooldown: 1,
            category_cooldown: 3,
            corpus_overlap_limit: 0.35,
            collision_limit: 2,
            rewrite_attempts: 2,
            suggestion_rounds: 1,
            template_attempts: 48,
            forbidden_limit: 40,
        }
    }
}

impl DiversityConfig {
    pub fn min_unique(&self, section: Section) -> usize {
        match section {
            Section::WorkedWell => self.min_unique_worked,
            Section::MinorFriction => self.min_unique_minor,
            Section::Improvements => self.min_unique_improvements,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_bullets == 0 {
            return Err("diversity.max_bullets must be positive".into());
        }
        for section in Section::ALL {
            if self.min_unique(section) > self.max_bullets {
                return Err(format!(
                    "diversity minimum for {section} exceeds max_bullets ({})",
                    self.max_bullets
                ));
            }
        }
        if self.phrase_cooldown == 0 || self.category_cooldown == 0 {
            return Err("diversity cooldowns must be at least 1".into());
        }
        if self.thresholds.ngram == 0 {
            return Err("diversity.thresholds.ngram must be positive".into());
        }
        let ratios = [
            self.thresholds.jaccard,
            self.thresholds.char_ratio,
            self.corpus_overlap_limit,
        ];
        if ratios.iter().any(|value| !(*value > 0.0 && *value <= 1.0)) {
            return Err("diversity thresholds must lie in (0, 1]".into());
        }
        Ok(())
    }
}

/// Result of finalizing one report against the phrase store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalizedReport {
    pub sections: ReportSections,
    pub markdown: String,
    /// Oracle rewrites attempted for corpus overlap.
    pub rewrites: u32,
    /// Overlap of the final body with prior bodies.
    pub corpus_overlap: f64,
    /// Sections that ended below their configured minimum.
    pub short_sections: Vec<Section>,
}

struct Accepted {
    text: String,
    normalized: String,
    category: String,
}

/// Per-section selection state for one report.
struct Picker<'a> {
    store: &'a PhraseStore,
    config: &'a DiversityConfig,
    section: Section,
    accepted: Vec<Accepted>,
    rejected: Vec<String>,
}

impl<'a> Picker<'a> {
    fn new(store: &'a PhraseStore, config: &'a DiversityConfig, section: Section) -> Self {
        Self {
            store,
            config,
            section,
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn missing(&self) -> usize {
        self.config
            .min_unique(self.section)
            .saturating_sub(self.accepted.len())
    }

    fn needs_more(&self) -> bool {
        self.missing() > 0
    }

    fn is_full(&self) -> bool {
        self.accepted.len() >= self.config.max_bullets
    }

    /// Accept the candidate if it is novel. `category` overrides keyword
    /// categorisation.
    fn offer(&mut self, raw: &str, category: Option<&str>) -> bool {
        if self.is_full() {
            return false;
        }
        let text = raw.trim();
        let normalized = normalize_phrase(text);
        if normalized.is_empty() {
            return false;
        }
        let category = category.unwrap_or_else(|| categorize(text)).to_string();
        if let Some(reason) = self.rejection(&normalized, &category) {
            debug!(
                target: "diversity",
                section = %self.section,
                candidate = text,
                reason,
                "candidate rejected"
            );
            self.rejected.push(text.to_string());
            return false;
        }
        self.accepted.push(Accepted {
            text: text.to_string(),
            normalized,
            category,
        });
        true
    }

    fn rejection(&self, normalized: &str, category: &str) -> Option<&'static str> {
        let thresholds = &self.config.thresholds;
        if self.store.contains(self.section, normalized) {
            return Some("already stored");
        }
        if self
            .accepted
            .iter()
            .any(|prior| thresholds.too_similar(normalized, &prior.normalized))
        {
            return Some("near duplicate within report");
        }
        if thresholds
            .find_conflict(normalized, self.store.phrases(self.section))
            .is_some()
        {
            return Some("near duplicate of stored phrase");
        }
        if self.section == Section::Improvements && category != TEMPLATED {
            if self.store.phrase_uses(self.section, normalized) >= self.config.phrase_cooldown {
                return Some("phrase cooldown");
            }
            let pending = self
                .accepted
                .iter()
                .filter(|prior| prior.category == category)
                .count() as u32;
            if self.store.category_uses(self.section, category) + pending
                >= self.config.category_cooldown
            {
                return Some("category cooldown");
            }
        }
        None
    }

    /// Phrases the oracle must steer away from.
    fn forbidden(&self, limit: usize) -> Vec<String> {
        let mut out: Vec<String> = self
            .accepted
            .iter()
            .map(|accepted| accepted.text.clone())
            .chain(self.rejected.iter().cloned())
            .collect();
        let remaining = limit.saturating_sub(out.len());
        out.extend(
            self.store
                .phrases(self.section)
                .take(remaining)
                .map(str::to_string),
        );
        out.truncate(limit);
        out
    }
}

struct OverlapAssessment {
    overlap: f64,
    collisions: usize,
    conflicts: Vec<String>,
}

impl OverlapAssessment {
    fn exceeds(&self, config: &DiversityConfig) -> bool {
        self.overlap > config.corpus_overlap_limit || self.collisions > config.collision_limit
    }

    fn better_than(&self, other: &OverlapAssessment) -> bool {
        self.collisions < other.collisions
            || (self.collisions == other.collisions && self.overlap < other.overlap)
    }
}

/// Keeps report bullets novel across every report produced against one
/// phrase store.
///
/// The store sits behind an async mutex held from the first novelty check to
/// the final commit, so concurrent sessions finalize one at a time.
pub struct DiversityEngine {
    store: Mutex<PhraseStore>,
    config: DiversityConfig,
    pools: PhrasePools,
    oracle: Option<DecisionOracle>,
}

impl DiversityEngine {
    pub fn new(store: PhraseStore, config: DiversityConfig, pools: PhrasePools) -> Self {
        Self {
            store: Mutex::new(store),
            config,
            pools,
            oracle: None,
        }
    }

    /// Enable oracle rewrites and improvement suggestions.
    pub fn with_oracle(mut self, oracle: DecisionOracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn config(&self) -> &DiversityConfig {
        &self.config
    }

    pub fn pools(&self) -> &PhrasePools {
        &self.pools
    }

    pub async fn stats(&self, top: usize) -> StoreStats {
        self.store.lock().await.stats(top)
    }

    /// Report authored from the phrase pools alone.
    pub fn author_fallback(&self, persona: &Persona, signals: &SignalVector) -> ReportSections {
        fallback::author_report(&self.pools, persona, signals)
    }

    /// Deduplicate a draft against the store and commit the accepted bullets.
    pub async fn finalize(
        &self,
        persona: &Persona,
        signals: &SignalVector,
        draft: ReportSections,
    ) -> FinalizedReport {
        let mut store = self.store.lock().await;
        debug!(target: "diversity", persona = %persona.id, "phrase store locked");

        let (draft, rewrites) = self.reduce_overlap(&store, draft).await;
        let mut rng = persona_rng(&persona.id);

        let mut sections = ReportSections {
            critical_issues: critical_issues(&draft, signals),
            ..ReportSections::default()
        };
        let mut commit = Commit::default();
        let mut short_sections = Vec::new();
        let mut friction_categories: Vec<String> = Vec::new();

        for section in Section::ALL {
            let mut picker = Picker::new(&store, &self.config, section);
            for bullet in draft.section(section) {
                picker.offer(bullet, None);
            }
            if picker.needs_more() {
                self.replenish(&mut picker, persona, signals, &friction_categories, &mut rng)
                    .await;
            }
            if picker.needs_more() {
                warn!(
                    target: "diversity",
                    persona = %persona.id,
                    section = %section,
                    missing = picker.missing(),
                    "section shipped below its minimum"
                );
                short_sections.push(section);
            }
            if section == Section::MinorFriction {
                friction_categories = picker
                    .accepted
                    .iter()
                    .map(|accepted| accepted.category.clone())
                    .collect();
            }
            let bullets = sections.section_mut(section);
            for accepted in picker.accepted {
                commit.push(section, accepted.normalized, accepted.category);
                bullets.push(accepted.text);
            }
        }

        let markdown = sections.render();
        let overlap = corpus_overlap(
            &sections.variable_text(),
            store.bodies().iter().map(String::as_str),
            self.config.thresholds.ngram,
        );
        commit.body = Some(markdown.clone());
        if let Err(err) = store.commit(commit) {
            warn!(target: "diversity", persona = %persona.id, error = %err, "failed to persist phrase store");
        }
        info!(
            target: "diversity",
            persona = %persona.id,
            rewrites,
            overlap,
            short = short_sections.len(),
            "report finalized"
        );

        FinalizedReport {
            sections,
            markdown,
            rewrites,
            corpus_overlap: overlap,
            short_sections,
        }
    }

    async fn reduce_overlap(
        &self,
        store: &PhraseStore,
        draft: ReportSections,
    ) -> (ReportSections, u32) {
        let mut best_score = self.assess(store, &draft);
        let mut best = draft;
        let mut rewrites = 0;
        if !best_score.exceeds(&self.config) {
            return (best, rewrites);
        }
        let Some(oracle) = self.oracle.as_ref() else {
            debug!(
                target: "diversity",
                overlap = best_score.overlap,
                collisions = best_score.collisions,
                "overlap high and no oracle for rewrites"
            );
            return (best, rewrites);
        };

        while best_score.exceeds(&self.config) && rewrites < self.config.rewrite_attempts {
            rewrites += 1;
            let mut forbidden = best_score.conflicts.clone();
            forbidden.truncate(self.config.forbidden_limit);
            let markdown = match oracle.rewrite_report(&best.render(), &forbidden).await {
                Ok(markdown) => markdown,
                Err(err) => {
                    warn!(target: "diversity", attempt = rewrites, error = %err, "report rewrite failed");
                    break;
                }
            };
            let mut candidate = ReportSections::parse(&markdown);
            if !candidate.has_variable_content() {
                warn!(target: "diversity", attempt = rewrites, "rewrite dropped every section");
                continue;
            }
            if candidate.critical_issues.is_empty() {
                candidate.critical_issues = best.critical_issues.clone();
            }
            let score = self.assess(store, &candidate);
            debug!(
                target: "diversity",
                attempt = rewrites,
                overlap = score.overlap,
                collisions = score.collisions,
                "rewrite assessed"
            );
            if score.better_than(&best_score) {
                best = candidate;
                best_score = score;
            }
        }
        (best, rewrites)
    }

    fn assess(&self, store: &PhraseStore, sections: &ReportSections) -> OverlapAssessment {
        let thresholds = &self.config.thresholds;
        let mut collisions = 0;
        let mut conflicts = Vec::new();
        for section in Section::ALL {
            for bullet in sections.section(section) {
                let normalized = normalize_phrase(bullet);
                if normalized.is_empty() {
                    continue;
                }
                let prior = if store.contains(section, &normalized) {
                    Some(normalized.clone())
                } else {
                    thresholds
                        .find_conflict(&normalized, store.phrases(section))
                        .map(str::to_string)
                };
                if let Some(prior) = prior {
                    collisions += 1;
                    conflicts.push(bullet.clone());
                    conflicts.push(prior);
                }
            }
        }
        let overlap = corpus_overlap(
            &sections.variable_text(),
            store.bodies().iter().map(String::as_str),
            thresholds.ngram,
        );
        OverlapAssessment {
            overlap,
            collisions,
            conflicts,
        }
    }

    /// Top up a section: friction-linked and persona pools, then oracle
    /// suggestions (improvements only), then templates.
    async fn replenish<R: Rng + Send>(
        &self,
        picker: &mut Picker<'_>,
        persona: &Persona,
        signals: &SignalVector,
        friction_categories: &[String],
        rng: &mut R,
    ) {
        let section = picker.section;

        if section == Section::Improvements {
            let mut linked = BTreeSet::new();
            for category in friction_categories {
                let target = self.pools.improvement_category_for(category);
                if !linked.insert(target) {
                    continue;
                }
                for phrase in self.pools.improvements.get(target).into_iter().flatten() {
                    if !picker.needs_more() {
                        return;
                    }
                    picker.offer(phrase, Some(target));
                }
            }
        }

        for (category, phrase) in self.pools.candidates(section, persona, signals, rng) {
            if !picker.needs_more() {
                return;
            }
            picker.offer(&phrase, Some(category.as_str()));
        }

        if section == Section::Improvements {
            if let Some(oracle) = self.oracle.as_ref() {
                for round in 0..self.config.suggestion_rounds {
                    if !picker.needs_more() {
                        return;
                    }
                    let forbidden = picker.forbidden(self.config.forbidden_limit);
                    match oracle
                        .suggest_improvements(persona, picker.missing(), &forbidden)
                        .await
                    {
                        Ok(suggestions) => {
                            for suggestion in suggestions {
                                if !picker.needs_more() {
                                    return;
                                }
                                picker.offer(&suggestion, None);
                            }
                        }
                        Err(err) => {
                            warn!(target: "diversity", round, error = %err, "improvement suggestions unavailable");
                            break;
                        }
                    }
                }
            }
        }

        let Some(grid) = self.pools.template(section) else {
            return;
        };
        let capacity = grid.capacity();
        if capacity == 0 {
            warn!(target: "diversity", section = section.as_str(), "template grid is malformed");
            return;
        }
        // Serials already committed are skipped; rejects move on to the next one.
        let start = picker.store.category_uses(section, TEMPLATED) as usize;
        for serial in (start..capacity).take(self.config.template_attempts) {
            if !picker.needs_more() {
                return;
            }
            if let Some(text) = grid.render(serial) {
                picker.offer(&text, Some(TEMPLATED));
            }
        }
    }
}

/// Critical issues are not deduplicated; missing ones come from signals.
fn critical_issues(draft: &ReportSections, signals: &SignalVector) -> Vec<String> {
    let source = if draft.critical_issues.is_empty() {
        critical_from_signals(signals)
    } else {
        draft.critical_issues.clone()
    };
    let mut seen = BTreeSet::new();
    source
        .into_iter()
        .filter(|issue| seen.insert(normalize_phrase(issue)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DiversityConfig::default().validate().is_ok());
        let bad = DiversityConfig {
            min_unique_minor: 5,
            ..DiversityConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn zero_thresholds_are_rejected() {
        let mut config = DiversityConfig::default();
        config.thresholds.char_ratio = 0.0;
        assert!(config.validate().is_err());

        let config = DiversityConfig {
            corpus_overlap_limit: 0.0,
            ..DiversityConfig::default()
        };
        assert!(config.validate().is_err());

        let mut config = DiversityConfig::default();
        config.thresholds.jaccard = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn picker_rejects_near_duplicates_within_report() {
        let store = PhraseStore::in_memory();
        let config = DiversityConfig::default();
        let mut picker = Picker::new(&store, &config, Section::MinorFriction);
        assert!(picker.offer("The vegan filter reset after opening an item", None));
        assert!(!picker.offer("The vegan filter resets after opening items", None));
        assert!(picker.offer("Tax was left out of the cart subtotal", None));
        assert_eq!(picker.accepted.len(), 2);
        assert!(!picker.needs_more());
    }

    #[test]
    fn picker_enforces_category_cooldown() {
        let mut store = PhraseStore::in_memory();
        for phrase in ["fee one", "fee two", "fee three"] {
            store.record(Section::Improvements, phrase, "fees").unwrap();
        }
        let config = DiversityConfig::default();
        let mut picker = Picker::new(&store, &config, Section::Improvements);
        assert!(!picker.offer("Disclose service and delivery fees on the menu page", None));
        assert!(picker.offer("Make search tolerant of typos and partial dish names", None));
        assert!(picker.offer("Add a clear reorder shortcut beside each price for returning customers", Some(TEMPLATED)));
    }

    #[test]
    fn critical_issues_fall_back_to_signals() {
        let draft = ReportSections::default();
        let signals = SignalVector {
            errors: 1,
            m_item: true,
            ..SignalVector::default()
        };
        assert_eq!(critical_issues(&draft, &signals).len(), 1);
    }
}
