use anyhow::Result;

use super::commands::Commands;
use super::config::cmd_config;
use super::context::CliContext;
use super::env::CliArgs;
use super::run::cmd_run;
use super::store::cmd_store;
use super::summary::cmd_summary;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Run(args) => cmd_run(args, ctx).await,
        Commands::Summary(args) => cmd_summary(args, ctx).await,
        Commands::Store(args) => cmd_store(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
