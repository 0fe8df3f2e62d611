use clap::Subcommand;

use super::config::ConfigArgs;
use super::run::RunArgs;
use super::store::StoreArgs;
use super::summary::SummaryArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Run browser sessions for every persona and write their reports
    Run(RunArgs),

    /// List stored reports in condition and id order
    Summary(SummaryArgs),

    /// Inspect the phrase store
    Store(StoreArgs),

    /// Show or validate configuration
    Config(ConfigArgs),
}
