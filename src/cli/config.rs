use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::fs;

use super::context::CliContext;
use super::output::emit;
use crate::config::ProbeConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration, defaults included
    Show,

    /// Parse a configuration file and check its invariants
    Validate {
        /// File to validate (defaults to the resolved configuration file)
        file: Option<PathBuf>,
    },
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let source = if ctx.config_found() {
                ctx.config_path().display().to_string()
            } else {
                format!("defaults ({} not found)", ctx.config_path().display())
            };
            emit(ctx.output(), ctx.config(), |config| {
                let body = serde_yaml::to_string(config)
                    .unwrap_or_else(|err| format!("# failed to render: {err}\n"));
                format!("# source: {source}\n{body}")
            })
        }
        ConfigAction::Validate { file } => {
            let path = file.unwrap_or_else(|| ctx.config_path().to_path_buf());
            let config = if fs::try_exists(&path).await.unwrap_or(false) {
                let raw = fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                ProbeConfig::from_yaml_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            } else {
                println!("No configuration file at {}; checking defaults", path.display());
                ProbeConfig::default()
            };
            config
                .validate()
                .with_context(|| format!("validating {}", path.display()))?;
            println!("Configuration {} is valid", path.display());
            Ok(())
        }
    }
}
