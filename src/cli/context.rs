use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ProbeConfig;

use super::output::OutputFormat;

pub struct CliContext {
    config: Arc<ProbeConfig>,
    config_path: PathBuf,
    config_found: bool,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: ProbeConfig, config_path: PathBuf, config_found: bool, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            config_found,
            output,
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Whether `config_path` existed when the configuration was loaded.
    pub fn config_found(&self) -> bool {
        self.config_found
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }
}
