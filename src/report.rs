//! Report assembly and the per-persona artifact directory.
//!
//! Each persona gets `<output>/<id>/issues.md` and `<output>/<id>/issues.json`.
//! The JSON file is written last and its presence marks the persona as done.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use agent_core::{SessionOutcome, SessionStatus};
use chrono::{DateTime, Utc};
use diversity_engine::FinalizedReport;
use menuprobe_core_types::{History, Persona};
use serde::{Deserialize, Serialize};
use session_judge::{ScoreBreakdown, SignalVector};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

use crate::errors::{ProbeError, ProbeResult};

pub const REPORT_JSON: &str = "issues.json";
pub const REPORT_MARKDOWN: &str = "issues.md";

/// Who wrote the narrative sections before deduplication.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorship {
    Oracle,
    Fallback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub persona: Persona,
    pub score: u8,
    pub description: String,
    pub markdown: String,
    pub status: SessionStatus,
    pub status_message: String,
    pub history: History,
    pub signals: SignalVector,
    pub score_breakdown: ScoreBreakdown,
    /// Score suggested by the analysis oracle; advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_score: Option<f64>,
    pub authored_by: Authorship,
    pub rewrites: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Narrative inputs to [`Report::assemble`].
pub struct Narrative {
    pub description: String,
    pub oracle_score: Option<f64>,
    pub authored_by: Authorship,
    pub finalized: FinalizedReport,
}

impl Report {
    pub fn assemble(
        persona: &Persona,
        outcome: SessionOutcome,
        signals: SignalVector,
        breakdown: ScoreBreakdown,
        narrative: Narrative,
        run_id: Uuid,
    ) -> Self {
        Self {
            persona: persona.clone(),
            score: breakdown.score,
            description: narrative.description,
            markdown: narrative.finalized.markdown,
            status: outcome.status,
            status_message: outcome.message,
            history: outcome.history,
            signals,
            score_breakdown: breakdown,
            oracle_score: narrative.oracle_score,
            authored_by: narrative.authored_by,
            rewrites: narrative.finalized.rewrites,
            run_id,
            created_at: Utc::now(),
        }
    }
}

pub fn report_dir(output_dir: &Path, persona_id: &str) -> PathBuf {
    output_dir.join(persona_id)
}

/// Whether a report already exists for the persona.
pub fn is_completed(output_dir: &Path, persona_id: &str) -> bool {
    report_dir(output_dir, persona_id).join(REPORT_JSON).is_file()
}

/// Write both artifacts; returns the persona directory.
pub async fn write_report(output_dir: &Path, report: &Report) -> ProbeResult<PathBuf> {
    let dir = report_dir(output_dir, &report.persona.id);
    fs::create_dir_all(&dir)
        .await
        .map_err(|err| ProbeError::io(&dir, err))?;

    let markdown_path = dir.join(REPORT_MARKDOWN);
    fs::write(&markdown_path, &report.markdown)
        .await
        .map_err(|err| ProbeError::io(&markdown_path, err))?;

    let json_path = dir.join(REPORT_JSON);
    let tmp_path = dir.join(format!("{REPORT_JSON}.tmp"));
    let json = serde_json::to_vec_pretty(report).map_err(|err| ProbeError::json(&json_path, err))?;
    fs::write(&tmp_path, json)
        .await
        .map_err(|err| ProbeError::io(&tmp_path, err))?;
    fs::rename(&tmp_path, &json_path)
        .await
        .map_err(|err| ProbeError::io(&json_path, err))?;
    Ok(dir)
}

pub async fn read_report(path: &Path) -> ProbeResult<Report> {
    let raw = fs::read(path).await.map_err(|err| ProbeError::io(path, err))?;
    serde_json::from_slice(&raw).map_err(|err| ProbeError::json(path, err))
}

/// Every readable report directly under `output_dir`. Unreadable ones are
/// skipped with a warning.
pub async fn collect_reports(output_dir: &Path) -> ProbeResult<Vec<Report>> {
    let mut reports = Vec::new();
    let mut entries = fs::read_dir(output_dir)
        .await
        .map_err(|err| ProbeError::io(output_dir, err))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| ProbeError::io(output_dir, err))?
    {
        let path = entry.path().join(REPORT_JSON);
        if !path.is_file() {
            continue;
        }
        match read_report(&path).await {
            Ok(report) => reports.push(report),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable report"),
        }
    }
    order_reports(&mut reports);
    Ok(reports)
}

fn condition_rank(condition: Option<&str>) -> u8 {
    match condition.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("uniform") => 0,
        Some("diet") => 1,
        Some("diverse") => 2,
        _ => 99,
    }
}

/// First run of digits in a persona id, or 0.
fn id_number(id: &str) -> u64 {
    id.chars()
        .skip_while(|ch| !ch.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}

fn compare_personas(a: &Persona, b: &Persona) -> Ordering {
    condition_rank(a.condition.as_deref())
        .cmp(&condition_rank(b.condition.as_deref()))
        .then_with(|| id_number(&a.id).cmp(&id_number(&b.id)))
        .then_with(|| a.id.cmp(&b.id))
}

/// Order by condition (`uniform`, `diet`, `diverse`, others), then by the
/// numeric part of the id.
pub fn order_reports(reports: &mut [Report]) {
    reports.sort_by(|a, b| compare_personas(&a.persona, &b.persona));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona(id: &str, condition: Option<&str>) -> Persona {
        let mut persona = Persona::new(id);
        persona.condition = condition.map(str::to_string);
        persona
    }

    #[test]
    fn orders_by_condition_then_number() {
        let mut personas = vec![
            persona("X-01", None),
            persona("D-10", Some("diet")),
            persona("U-02", Some("uniform")),
            persona("D-02", Some("diet")),
            persona("V-01", Some("diverse")),
        ];
        personas.sort_by(compare_personas);
        let ids: Vec<&str> = personas.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["U-02", "D-02", "D-10", "V-01", "X-01"]);
    }

    #[test]
    fn id_number_reads_first_digits() {
        assert_eq!(id_number("D-07"), 7);
        assert_eq!(id_number("P-12b3"), 12);
        assert_eq!(id_number("anon"), 0);
    }
}
