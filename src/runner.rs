//! Per-persona orchestration: session, scoring, narrative, deduplication and
//! the report artifact.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use agent_core::SessionRunner;
use decision_oracle::DecisionOracle;
use diversity_engine::{fallback_description, DiversityEngine, ReportSections};
use menuprobe_core_types::{History, Persona};
use serde::Serialize;
use session_judge::{extract_signals, Scorer, SignalVector};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::report::{is_completed, write_report, Authorship, Narrative, Report};

/// What happened to one persona.
#[derive(Debug)]
pub enum PersonaOutcome {
    Completed(Box<Report>),
    Skipped,
    /// Navigation gave up; no report exists.
    Abandoned(String),
    /// The report could not be written.
    Failed(String),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: Option<Uuid>,
    pub completed: Vec<String>,
    pub skipped: Vec<String>,
    pub abandoned: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    fn record(&mut self, persona_id: String, outcome: PersonaOutcome) {
        match outcome {
            PersonaOutcome::Completed(_) => self.completed.push(persona_id),
            PersonaOutcome::Skipped => self.skipped.push(persona_id),
            PersonaOutcome::Abandoned(reason) => self.abandoned.push((persona_id, reason)),
            PersonaOutcome::Failed(reason) => self.failed.push((persona_id, reason)),
        }
    }

    /// Personas without a report after this run.
    pub fn missing(&self) -> usize {
        self.abandoned.len() + self.failed.len()
    }
}

pub struct ProbeRunner {
    sessions: SessionRunner,
    oracle: DecisionOracle,
    engine: Arc<DiversityEngine>,
    scorer: Scorer,
    output_dir: PathBuf,
    concurrency: usize,
    run_id: Uuid,
}

impl ProbeRunner {
    pub fn new(
        sessions: SessionRunner,
        oracle: DecisionOracle,
        engine: Arc<DiversityEngine>,
        scorer: Scorer,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sessions,
            oracle,
            engine,
            scorer,
            output_dir: output_dir.into(),
            concurrency: 1,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn engine(&self) -> &DiversityEngine {
        &self.engine
    }

    /// Run every persona with at most `concurrency` sessions in flight.
    pub async fn run_all(self: Arc<Self>, personas: Vec<Persona>) -> RunSummary {
        let mut summary = RunSummary {
            run_id: Some(self.run_id),
            ..RunSummary::default()
        };
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut scheduled = HashSet::new();

        info!(
            run_id = %self.run_id,
            personas = personas.len(),
            concurrency = self.concurrency,
            "run started"
        );
        for persona in personas {
            if !scheduled.insert(persona.id.clone()) {
                warn!(persona = %persona.id, "duplicate persona skipped");
                continue;
            }
            if is_completed(&self.output_dir, &persona.id) {
                info!(persona = %persona.id, "report exists; skipping");
                summary.record(persona.id, PersonaOutcome::Skipped);
                continue;
            }
            let runner = Arc::clone(&self);
            let gate = Arc::clone(&gate);
            tasks.spawn(async move {
                let outcome = match gate.acquire_owned().await {
                    Ok(_permit) => runner.run_persona(&persona).await,
                    Err(err) => PersonaOutcome::Failed(format!("concurrency gate closed: {err}")),
                };
                (persona.id, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((persona_id, outcome)) => summary.record(persona_id, outcome),
                Err(err) => error!(error = %err, "persona task panicked"),
            }
        }
        summary.completed.sort();
        summary.skipped.sort();
        summary.abandoned.sort();
        summary.failed.sort();
        info!(
            run_id = %self.run_id,
            completed = summary.completed.len(),
            skipped = summary.skipped.len(),
            missing = summary.missing(),
            "run finished"
        );
        summary
    }

    /// Session, signals, score, narrative, dedup and artifact for one persona.
    pub async fn run_persona(&self, persona: &Persona) -> PersonaOutcome {
        let outcome = match self.sessions.run(persona).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(persona = %persona.id, error = %err, "persona abandoned");
                return PersonaOutcome::Abandoned(err.to_string());
            }
        };

        let signals = extract_signals(&outcome.history).with_reached_review(outcome.reached_review);
        let breakdown = self.scorer.breakdown(&persona.id, &signals);
        let (draft, description, oracle_score, authored_by) =
            self.narrative(persona, &outcome.history, &signals).await;
        let finalized = self.engine.finalize(persona, &signals, draft).await;

        let report = Report::assemble(
            persona,
            outcome,
            signals,
            breakdown,
            Narrative {
                description,
                oracle_score,
                authored_by,
                finalized,
            },
            self.run_id,
        );
        match write_report(&self.output_dir, &report).await {
            Ok(dir) => {
                info!(
                    persona = %persona.id,
                    score = report.score,
                    status = report.status.as_str(),
                    dir = %dir.display(),
                    "report written"
                );
                PersonaOutcome::Completed(Box::new(report))
            }
            Err(err) => {
                error!(persona = %persona.id, error = %err, "failed to write report");
                PersonaOutcome::Failed(err.to_string())
            }
        }
    }

    async fn narrative(
        &self,
        persona: &Persona,
        history: &History,
        signals: &SignalVector,
    ) -> (ReportSections, String, Option<f64>, Authorship) {
        match self.oracle.analyze(persona, history).await {
            Ok(analysis) => {
                let sections = ReportSections::parse(&analysis.markdown);
                if sections.has_variable_content() {
                    let description = if analysis.description.is_empty() {
                        fallback_description(signals)
                    } else {
                        analysis.description
                    };
                    return (sections, description, analysis.score, Authorship::Oracle);
                }
                warn!(persona = %persona.id, "analysis had no usable sections; using fallback");
            }
            Err(err) => {
                warn!(persona = %persona.id, error = %err, "analysis unavailable; using fallback");
            }
        }
        (
            self.engine.author_fallback(persona, signals),
            fallback_description(signals),
            None,
            Authorship::Fallback,
        )
    }
}
