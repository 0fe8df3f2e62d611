use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use super::context::CliContext;
use super::output::emit;
use crate::report::collect_reports;

#[derive(Args, Clone, Debug)]
pub struct SummaryArgs {
    /// Report directory (defaults to the configured output_dir)
    #[arg(long, value_name = "DIR")]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    id: String,
    condition: String,
    score: u8,
    status: String,
    description: String,
}

pub async fn cmd_summary(args: SummaryArgs, ctx: &CliContext) -> Result<()> {
    let input = args
        .input
        .unwrap_or_else(|| ctx.config().output_dir.clone());
    let reports = collect_reports(&input)
        .await
        .with_context(|| format!("reading reports from {}", input.display()))?;

    let rows: Vec<SummaryRow> = reports
        .into_iter()
        .map(|report| SummaryRow {
            id: report.persona.id,
            condition: report.persona.condition.unwrap_or_else(|| "-".to_string()),
            score: report.score,
            status: report.status.as_str().to_string(),
            description: report.description,
        })
        .collect();

    emit(ctx.output(), &rows, |rows| {
        if rows.is_empty() {
            return format!("no reports under {}", input.display());
        }
        rows.iter()
            .map(|row| {
                format!(
                    "{:<8} {:<8} {}  {:<14} {}",
                    row.id, row.condition, row.score, row.status, row.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
