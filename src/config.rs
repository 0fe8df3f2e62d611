//! Run configuration.
//!
//! Every knob the core consults lives here with a visible default, so
//! `menuprobe config show` prints the complete effective configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use agent_core::{AgentLoopConfig, DeviceProfile, NavigationPolicy};
use cdp_adapter::LaunchSettings;
use decision_oracle::OpenAiConfig;
use diversity_engine::{DiversityConfig, PhrasePools};
use serde::{Deserialize, Serialize};
use session_judge::ScoreWeights;
use tracing::debug;

use crate::errors::{ProbeError, ProbeResult};

pub const TARGET_URL_ENV: &str = "MENUPROBE_TARGET_URL";
pub const CONCURRENCY_ENV: &str = "MENUPROBE_CONCURRENCY";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Pass `--no-sandbox` to the browser (containers).
    pub no_sandbox: bool,
    /// Primary engine followed by its fallback.
    pub engines: Vec<String>,
    pub navigation_timeout_ms: u64,
    /// Navigation attempts per engine.
    pub navigation_retries: u32,
    pub retry_backoff_ms: u64,
    pub launch_timeout_ms: u64,
    pub device: DeviceProfile,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        let navigation = NavigationPolicy::default();
        Self {
            headless: true,
            no_sandbox: false,
            engines: navigation.engines,
            navigation_timeout_ms: navigation.timeout_ms,
            navigation_retries: navigation.attempts_per_engine,
            retry_backoff_ms: navigation.backoff_ms,
            launch_timeout_ms: LaunchSettings::default().launch_timeout_ms,
            device: DeviceProfile::iphone(),
        }
    }
}

impl BrowserSettings {
    pub fn navigation_policy(&self) -> NavigationPolicy {
        NavigationPolicy {
            engines: self.engines.clone(),
            attempts_per_engine: self.navigation_retries,
            timeout_ms: self.navigation_timeout_ms,
            backoff_ms: self.retry_backoff_ms,
        }
    }

    pub fn launch_settings(&self) -> LaunchSettings {
        LaunchSettings {
            headless: self.headless,
            no_sandbox: self.no_sandbox,
            launch_timeout_ms: self.launch_timeout_ms,
            request_timeout_ms: self.navigation_timeout_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub api_base: String,
    pub action_model: String,
    pub analysis_model: String,
    /// Environment variable holding one key, or several separated by commas.
    pub api_key_env: String,
    pub action_temperature: f32,
    pub analysis_temperature: f32,
    pub timeout_ms: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            action_model: "gpt-4o-mini".to_string(),
            analysis_model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            action_temperature: 0.2,
            analysis_temperature: 0.7,
            timeout_ms: 60_000,
        }
    }
}

impl OracleSettings {
    pub fn api_keys(&self) -> Vec<String> {
        env::var(&self.api_key_env)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|key| !key.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn backend_config(&self, model: &str, temperature: f32) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(model, self.api_keys());
        config.api_base = self.api_base.clone();
        config.temperature = temperature;
        config.timeout = Duration::from_millis(self.timeout_ms);
        config
    }

    pub fn action_backend(&self) -> OpenAiConfig {
        self.backend_config(&self.action_model, self.action_temperature)
    }

    pub fn analysis_backend(&self) -> OpenAiConfig {
        self.backend_config(&self.analysis_model, self.analysis_temperature)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub target_url: String,
    /// Persona sessions allowed in flight at once.
    pub concurrency: usize,
    pub output_dir: PathBuf,
    pub store_dir: PathBuf,
    pub browser: BrowserSettings,
    pub agent: AgentLoopConfig,
    pub scoring: ScoreWeights,
    pub diversity: DiversityConfig,
    pub oracle: OracleSettings,
    /// YAML file replacing the built-in phrase pools.
    pub pools_path: Option<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target_url: "https://www.ubereats.com".to_string(),
            concurrency: 2,
            output_dir: PathBuf::from("runs"),
            store_dir: PathBuf::from("state"),
            browser: BrowserSettings::default(),
            agent: AgentLoopConfig::default(),
            scoring: ScoreWeights::default(),
            diversity: DiversityConfig::default(),
            oracle: OracleSettings::default(),
            pools_path: None,
        }
    }
}

impl ProbeConfig {
    pub fn from_yaml_str(raw: &str) -> ProbeResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|err| ProbeError::invalid_config(err.to_string()))
    }

    /// Apply `MENUPROBE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> ProbeResult<()> {
        if let Ok(url) = env::var(TARGET_URL_ENV) {
            if !url.trim().is_empty() {
                debug!(url = %url, "target url overridden from environment");
                self.target_url = url.trim().to_string();
            }
        }
        if let Ok(raw) = env::var(CONCURRENCY_ENV) {
            self.concurrency = raw.trim().parse().map_err(|_| {
                ProbeError::invalid_config(format!("{CONCURRENCY_ENV} must be a positive integer, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ProbeResult<()> {
        let url = self.target_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProbeError::invalid_config(format!(
                "target_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.concurrency == 0 {
            return Err(ProbeError::invalid_config("concurrency must be at least 1"));
        }
        if self.browser.engines.is_empty() {
            return Err(ProbeError::invalid_config("browser.engines must name at least one engine"));
        }
        if self.browser.navigation_retries == 0 || self.browser.navigation_timeout_ms == 0 {
            return Err(ProbeError::invalid_config(
                "browser navigation retries and timeout must be at least 1",
            ));
        }
        self.agent
            .validate()
            .map_err(|err| ProbeError::invalid_config(format!("agent: {err}")))?;
        self.diversity
            .validate()
            .map_err(|err| ProbeError::invalid_config(format!("diversity: {err}")))?;
        let weights = &self.scoring;
        let values = [
            weights.review_bonus,
            weights.severe_penalty,
            weights.timeout_penalty,
            weights.long_wait_penalty,
            weights.budget_exceeded_penalty,
            weights.budget_met_bonus,
            weights.jitter,
            weights.bias,
        ];
        if values.iter().any(|value| !value.is_finite()) || weights.jitter < 0.0 {
            return Err(ProbeError::invalid_config(
                "scoring weights must be finite and jitter non-negative",
            ));
        }
        if self.oracle.timeout_ms == 0 {
            return Err(ProbeError::invalid_config("oracle.timeout_ms must be at least 1"));
        }
        Ok(())
    }

    pub fn load_pools(&self) -> ProbeResult<PhrasePools> {
        match &self.pools_path {
            Some(path) => Ok(PhrasePools::load(path)?),
            None => Ok(PhrasePools::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_validate() {
        let config = ProbeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.step_ceiling, 60);
        assert_eq!(config.browser.navigation_timeout_ms, 30_000);
        assert_eq!(config.browser.device.width, 390);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ProbeConfig::from_yaml_str(
            "concurrency: 4\nagent:\n  step_ceiling: 20\ndiversity:\n  category_cooldown: 5\n",
        )
        .unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.agent.step_ceiling, 20);
        assert_eq!(config.agent.dom_digest_chars, 4_000);
        assert_eq!(config.diversity.category_cooldown, 5);
        assert_eq!(config.diversity.phrase_cooldown, 1);
    }

    #[test]
    fn rejects_zero_concurrency_and_bad_thresholds() {
        let mut config = ProbeConfig {
            concurrency: 0,
            ..ProbeConfig::default()
        };
        assert!(config.validate().is_err());
        config.concurrency = 1;
        config.diversity.thresholds.jaccard = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn environment_overrides_apply() {
        env::set_var(TARGET_URL_ENV, "https://food.test");
        env::set_var(CONCURRENCY_ENV, "3");
        let mut config = ProbeConfig::default();
        let result = config.apply_env_overrides();
        env::remove_var(TARGET_URL_ENV);
        env::remove_var(CONCURRENCY_ENV);
        result.unwrap();
        assert_eq!(config.target_url, "https://food.test");
        assert_eq!(config.concurrency, 3);
    }

    #[test]
    #[serial]
    fn api_keys_split_on_commas() {
        let settings = OracleSettings {
            api_key_env: "MENUPROBE_TEST_KEYS".to_string(),
            ..OracleSettings::default()
        };
        env::set_var("MENUPROBE_TEST_KEYS", "sk-one, sk-two,,");
        let keys = settings.api_keys();
        env::remove_var("MENUPROBE_TEST_KEYS");
        assert_eq!(keys, vec!["sk-one".to_string(), "sk-two".to_string()]);
    }
}
