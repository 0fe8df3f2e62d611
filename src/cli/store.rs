use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use phrase_store::{PhraseStore, Section, StoreStats};
use serde::Serialize;
use text_similarity::normalize_phrase;

use super::context::CliContext;
use super::output::emit;

#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    /// Phrase store directory (defaults to the configured store_dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub action: StoreAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum StoreAction {
    /// Table sizes and most used categories
    Stats {
        /// Categories listed per section
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Test whether a phrase, or a near duplicate, is already stored
    Check {
        /// worked_well, minor_friction or improvements
        #[arg(long)]
        section: Section,

        phrase: String,
    },
}

#[derive(Debug, Serialize)]
struct CheckResult {
    section: Section,
    normalized: String,
    stored: bool,
    near_duplicate: Option<String>,
}

pub async fn cmd_store(args: StoreArgs, ctx: &CliContext) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| ctx.config().store_dir.clone());
    let store = PhraseStore::open(dir.clone())
        .with_context(|| format!("opening phrase store {}", dir.display()))?;

    match args.action {
        StoreAction::Stats { top } => {
            let stats = store.stats(top);
            emit(ctx.output(), &stats, render_stats)
        }
        StoreAction::Check { section, phrase } => {
            let normalized = normalize_phrase(&phrase);
            let stored = store.contains(section, &normalized);
            let near_duplicate = ctx
                .config()
                .diversity
                .thresholds
                .find_conflict(&normalized, store.phrases(section))
                .map(str::to_string);
            let result = CheckResult {
                section,
                normalized,
                stored,
                near_duplicate,
            };
            emit(ctx.output(), &result, |result| {
                match (&result.stored, &result.near_duplicate) {
                    (true, _) => format!("stored in {}: '{}'", result.section, result.normalized),
                    (false, Some(prior)) => {
                        format!("near duplicate in {}: '{}'", result.section, prior)
                    }
                    (false, None) => format!("novel for {}: '{}'", result.section, result.normalized),
                }
            })
        }
    }
}

fn render_stats(stats: &StoreStats) -> String {
    let mut lines = Vec::new();
    for section in Section::ALL {
        let count = stats.phrases.get(&section).copied().unwrap_or(0);
        lines.push(format!("{section}: {count} phrase(s)"));
        if let Some(categories) = stats.top_categories.get(&section) {
            for (category, uses) in categories {
                lines.push(format!("  {category:<16} {uses}"));
            }
        }
    }
    lines.push(format!(
        "bodies: {}  lookups: {}  hits: {}",
        stats.bodies, stats.lookups, stats.hits
    ));
    lines.join("\n")
}
