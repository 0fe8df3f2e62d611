use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{AgentLoopController, SessionRunner};
use anyhow::{Context, Result};
use cdp_adapter::CdpLauncher;
use clap::Args;
use decision_oracle::{DecisionOracle, OpenAiBackend};
use diversity_engine::DiversityEngine;
use phrase_store::PhraseStore;
use session_judge::Scorer;
use tracing::{info, warn};

use super::context::CliContext;
use super::output::emit;
use crate::config::ProbeConfig;
use crate::personas::load_personas;
use crate::runner::{ProbeRunner, RunSummary};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Persona collection (JSON array)
    #[arg(long, value_name = "FILE")]
    pub personas: PathBuf,

    /// Directory receiving one sub-directory per persona
    #[arg(long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Persona sessions in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Step ceiling per session
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Phrase store directory
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut ProbeConfig) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(max_steps) = self.max_steps {
            config.agent.step_ceiling = max_steps;
        }
        if let Some(store) = &self.store {
            config.store_dir = store.clone();
        }
        if self.headed {
            config.browser.headless = false;
        }
    }
}

fn build_oracle(config: &ProbeConfig) -> Result<DecisionOracle> {
    let key_hint = || format!("set {} to an API key", config.oracle.api_key_env);
    let action = OpenAiBackend::new(config.oracle.action_backend()).with_context(key_hint)?;
    let analysis = OpenAiBackend::new(config.oracle.analysis_backend()).with_context(key_hint)?;
    Ok(DecisionOracle::new(Arc::new(action), Arc::new(analysis)).with_temperatures(
        config.oracle.action_temperature,
        config.oracle.analysis_temperature,
    ))
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let mut config = ctx.config().clone();
    args.apply(&mut config);
    config.validate()?;

    let personas = load_personas(&args.personas)
        .await
        .with_context(|| format!("loading personas from {}", args.personas.display()))?;
    if personas.is_empty() {
        warn!(path = %args.personas.display(), "persona file is empty");
    }

    let oracle = build_oracle(&config)?;
    let launcher = Arc::new(CdpLauncher::new(config.browser.launch_settings()));
    let controller = AgentLoopController::new(config.agent.clone(), oracle.clone());
    let sessions = SessionRunner::new(launcher, controller, config.target_url.clone())
        .with_profile(config.browser.device.clone())
        .with_navigation(config.browser.navigation_policy());

    let store = PhraseStore::open(config.store_dir.clone())
        .with_context(|| format!("opening phrase store {}", config.store_dir.display()))?;
    let pools = config.load_pools()?;
    let engine = Arc::new(
        DiversityEngine::new(store, config.diversity.clone(), pools).with_oracle(oracle.clone()),
    );

    let runner = Arc::new(
        ProbeRunner::new(
            sessions,
            oracle,
            engine,
            Scorer::new(config.scoring.clone()),
            config.output_dir.clone(),
        )
        .with_concurrency(config.concurrency),
    );
    info!(
        target_url = %config.target_url,
        output = %config.output_dir.display(),
        "running personas"
    );
    let summary = runner.run_all(personas).await;
    emit(ctx.output(), &summary, render_summary)
}

fn render_summary(summary: &RunSummary) -> String {
    let mut lines = vec![format!(
        "completed {}, skipped {}, without report {}",
        summary.completed.len(),
        summary.skipped.len(),
        summary.missing()
    )];
    for (persona, reason) in summary.abandoned.iter().chain(summary.failed.iter()) {
        lines.push(format!("  {persona}: {reason}"));
    }
    lines.join("\n")
}
