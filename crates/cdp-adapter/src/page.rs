use agent_core::{BrowserLauncher, BrowserPage, DeviceProfile, ElementState, NavigationError, PageError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams, SetUserAgentOverrideParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::resolve_engine;
use crate::script;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchSettings {
    pub headless: bool,
    pub no_sandbox: bool,
    pub launch_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: false,
            launch_timeout_ms: 20_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Launches one isolated browser process per session.
#[derive(Clone, Debug, Default)]
pub struct CdpLauncher {
    settings: LaunchSettings,
}

impl CdpLauncher {
    pub fn new(settings: LaunchSettings) -> Self {
        Self { settings }
    }

    fn browser_config(
        &self,
        engine: &str,
        profile: &DeviceProfile,
        profile_dir: &TempDir,
    ) -> Result<BrowserConfig, NavigationError> {
        let executable = resolve_engine(engine)
            .ok_or_else(|| NavigationError::launch(engine, "executable not found"))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .user_data_dir(profile_dir.path())
            .window_size(profile.width, profile.height)
            .request_timeout(Duration::from_millis(self.settings.request_timeout_ms))
            .launch_timeout(Duration::from_millis(self.settings.launch_timeout_ms));
        if !self.settings.headless {
            builder = builder.with_head();
        }
        if self.settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        builder = builder.args(vec![
            "--disable-background-networking",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-sync",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--use-mock-keychain",
        ]);
        builder
            .build()
            .map_err(|err| NavigationError::launch(engine, format!("browser config error: {err}")))
    }
}

#[async_trait]
impl BrowserLauncher for CdpLauncher {
    async fn open(
        &self,
        engine: &str,
        profile: &DeviceProfile,
        url: &str,
        timeout: Duration,
    ) -> Result<Box<dyn BrowserPage>, NavigationError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("menuprobe-profile-")
            .tempdir()
            .map_err(|err| NavigationError::launch(engine, format!("profile dir: {err}")))?;
        let config = self.browser_config(engine, profile, &profile_dir)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| NavigationError::launch(engine, err.to_string()))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp", error = %err, "handler event error");
                }
            }
        });

        match prepare_page(&browser, profile, url, timeout).await {
            Ok(page) => {
                debug!(target: "cdp", engine, url, "page ready");
                Ok(Box::new(CdpPage {
                    page,
                    browser: Mutex::new(Some(browser)),
                    handler,
                    _profile_dir: profile_dir,
                }))
            }
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    warn!(target: "cdp", engine, error = %close_err, "failed to close browser");
                }
                let _ = browser.wait().await;
                handler.abort();
                Err(match err {
                    PrepareError::Timeout => NavigationError::Timeout {
                        engine: engine.to_string(),
                        url: url.to_string(),
                        after_ms: timeout.as_millis() as u64,
                    },
                    PrepareError::Cdp(err) => NavigationError::failed(engine, err.to_string()),
                })
            }
        }
    }
}

enum PrepareError {
    Timeout,
    Cdp(CdpError),
}

impl From<CdpError> for PrepareError {
    fn from(err: CdpError) -> Self {
        Self::Cdp(err)
    }
}

async fn prepare_page(
    browser: &Browser,
    profile: &DeviceProfile,
    url: &str,
    timeout: Duration,
) -> Result<Page, PrepareError> {
    let page = browser.new_page("about:blank").await?;
    page.execute(SetDeviceMetricsOverrideParams::new(
        i64::from(profile.width),
        i64::from(profile.height),
        profile.device_scale_factor,
        profile.mobile,
    ))
    .await?;
    if profile.touch {
        page.execute(SetTouchEmulationEnabledParams::new(true)).await?;
    }
    page.execute(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
        .await?;

    match tokio::time::timeout(timeout, page.goto(url)).await {
        Ok(result) => {
            result?;
        }
        Err(_) => return Err(PrepareError::Timeout),
    }
    Ok(page)
}

/// A navigated page that owns its browser process.
pub struct CdpPage {
    page: Page,
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
    _profile_dir: TempDir,
}

impl CdpPage {
    async fn evaluate<T>(&self, expression: String) -> Result<T, PageError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.page
            .evaluate(expression)
            .await
            .map_err(page_error)?
            .into_value::<T>()
            .map_err(|err| PageError::other(err.to_string()))
    }
}

fn page_error(err: CdpError) -> PageError {
    PageError::other(err.to_string())
}

fn timed_out(selector: &str, timeout: Duration) -> PageError {
    PageError::Timeout {
        selector: selector.to_string(),
        after_ms: timeout.as_millis() as u64,
    }
}

#[async_trait]
impl BrowserPage for CdpPage {
    async fn content(&self) -> Result<String, PageError> {
        self.page.content().await.map_err(page_error)
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        self.evaluate(script::exists(selector)).await
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.evaluate(script::inner_text(selector)).await
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        let action = async {
            let element = self.page.find_element(selector).await?;
            element.scroll_into_view().await?;
            element.click().await?;
            Ok::<(), CdpError>(())
        };
        match tokio::time::timeout(timeout, action).await {
            Ok(result) => result.map_err(page_error),
            Err(_) => Err(timed_out(selector, timeout)),
        }
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<(), PageError> {
        let action = async {
            let element = self.page.find_element(selector).await?;
            element.call_js_fn(script::CLEAR_VALUE, false).await?;
            element.click().await?;
            element.type_str(text).await?;
            Ok::<(), CdpError>(())
        };
        match tokio::time::timeout(timeout, action).await {
            Ok(result) => result.map_err(page_error),
            Err(_) => Err(timed_out(selector, timeout)),
        }
    }

    async fn element_state(&self, selector: &str) -> Result<ElementState, PageError> {
        let state: String = self.evaluate(script::element_state(selector)).await?;
        Ok(match state.as_str() {
            "visible" => ElementState::Visible,
            "hidden" => ElementState::Hidden,
            _ => ElementState::Detached,
        })
    }

    async fn close(&self) -> Result<(), PageError> {
        let result = self.page.clone().close().await.map_err(page_error);
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp", error = %err, "failed to close browser");
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
        result
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
