//! Opening the target site with bounded retries and one engine fallback.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{BrowserLauncher, BrowserPage, DeviceProfile};
use crate::errors::NavigationError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationPolicy {
    /// Primary engine first; only the first two are tried.
    pub engines: Vec<String>,
    /// Attempts per engine before moving on.
    pub attempts_per_engine: u32,
    pub timeout_ms: u64,
    /// Delay before retrying, multiplied by the attempt number.
    pub backoff_ms: u64,
}

impl Default for NavigationPolicy {
    fn default() -> Self {
        Self {
            engines: vec!["chromium".to_string(), "chrome".to_string()],
            attempts_per_engine: 2,
            timeout_ms: 30_000,
            backoff_ms: 500,
        }
    }
}

/// A page that reached the target URL and the engine that served it.
pub struct NavigatedPage {
    pub page: Box<dyn BrowserPage>,
    pub engine: String,
    pub attempts: u32,
}

pub async fn navigate_with_fallback(
    launcher: &dyn BrowserLauncher,
    profile: &DeviceProfile,
    url: &str,
    policy: &NavigationPolicy,
) -> Result<NavigatedPage, NavigationError> {
    let timeout = Duration::from_millis(policy.timeout_ms);
    let attempts_per_engine = policy.attempts_per_engine.max(1);
    let mut attempts = 0u32;
    let mut last: Option<NavigationError> = None;

    for engine in policy.engines.iter().take(2) {
        for attempt in 1..=attempts_per_engine {
            attempts += 1;
            match launcher.open(engine, profile, url, timeout).await {
                Ok(page) => {
                    info!(engine = %engine, attempts, url, "navigation succeeded");
                    return Ok(NavigatedPage {
                        page,
                        engine: engine.clone(),
                        attempts,
                    });
                }
                Err(err) => {
                    warn!(engine = %engine, attempt, error = %err, "navigation attempt failed");
                    last = Some(err);
                    if attempt < attempts_per_engine && policy.backoff_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(
                            policy.backoff_ms * u64::from(attempt),
                        ))
                        .await;
                    }
                }
            }
        }
    }

    Err(NavigationError::Exhausted {
        attempts,
        last: last
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no browser engine configured".to_string()),
    })
}
