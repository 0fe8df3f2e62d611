use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::env::LogFormat;
use crate::config::ProbeConfig;

const LOCAL_ENV_FILE: &str = "config/local.env";
const LOCAL_CONFIG_FILE: &str = "config/menuprobe.yaml";

/// Export `KEY=VALUE` lines from `config/local.env` unless already set.
pub fn load_local_env_overrides() {
    let path = Path::new(LOCAL_ENV_FILE);
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unquote(value.trim()));
            }
            info!(path = %path.display(), "loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

pub fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
    .context("failed to install tracing subscriber")?;

    Ok(())
}

pub struct LoadedConfig {
    pub config: ProbeConfig,
    pub path: PathBuf,
    pub found: bool,
}

/// Resolve the config file: `--config`, then `./config/menuprobe.yaml`, then
/// the user config directory. A missing file yields defaults.
pub fn resolve_config_path(explicit: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path.clone();
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    match dirs::config_dir() {
        Some(mut path) => {
            path.push("menuprobe");
            path.push("config.yaml");
            path
        }
        None => local,
    }
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let path = resolve_config_path(config_path);
    let found = fs::try_exists(&path).await.unwrap_or(false);

    let mut config = if found {
        let raw = fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        ProbeConfig::from_yaml_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    } else {
        if config_path.is_some() {
            anyhow::bail!("configuration file {} does not exist", path.display());
        }
        ProbeConfig::default()
    };
    config
        .apply_env_overrides()
        .context("applying environment overrides")?;

    info!(path = %path.display(), found, "configuration loaded");
    Ok(LoadedConfig {
        config,
        path,
        found,
    })
}
