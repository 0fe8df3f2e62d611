//! Browser port: the page operations the agent loop needs, independent of
//! the automation backend.

use async_trait::async_trait;
use menuprobe_core_types::WaitState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{NavigationError, PageError};

/// Observed state of the element a selector resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementState {
    Detached,
    Hidden,
    Visible,
}

impl ElementState {
    pub fn satisfies(&self, wanted: WaitState) -> bool {
        match wanted {
            WaitState::Visible => matches!(self, ElementState::Visible),
            WaitState::Attached => !matches!(self, ElementState::Detached),
            WaitState::Hidden => !matches!(self, ElementState::Visible),
            WaitState::Detached => matches!(self, ElementState::Detached),
        }
    }
}

/// Mobile device emulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub mobile: bool,
    pub touch: bool,
    pub user_agent: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::iphone()
    }
}

impl DeviceProfile {
    /// Current-generation iPhone viewport with mobile Safari identity.
    pub fn iphone() -> Self {
        Self {
            name: "iphone".to_string(),
            width: 390,
            height: 844,
            device_scale_factor: 3.0,
            mobile: true,
            touch: true,
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
                         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 \
                         Mobile/15E148 Safari/604.1"
                .to_string(),
        }
    }
}

/// An open, navigated page.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Full page content as markup text.
    async fn content(&self) -> Result<String, PageError>;

    async fn exists(&self, selector: &str) -> Result<bool, PageError>;

    /// Visible text of the first matching element.
    async fn element_text(&self, selector: &str) -> Result<Option<String>, PageError>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), PageError>;

    /// Replace the value of an input.
    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<(), PageError>;

    async fn element_state(&self, selector: &str) -> Result<ElementState, PageError>;

    async fn close(&self) -> Result<(), PageError>;
}

/// Opens isolated, device-emulated sessions on a named engine.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(
        &self,
        engine: &str,
        profile: &DeviceProfile,
        url: &str,
        timeout: Duration,
    ) -> Result<Box<dyn BrowserPage>, NavigationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_state_matches_wait_states() {
        assert!(ElementState::Visible.satisfies(WaitState::Attached));
        assert!(ElementState::Hidden.satisfies(WaitState::Attached));
        assert!(ElementState::Detached.satisfies(WaitState::Hidden));
        assert!(!ElementState::Hidden.satisfies(WaitState::Visible));
        assert!(!ElementState::Visible.satisfies(WaitState::Detached));
    }

    #[test]
    fn iphone_profile_dimensions() {
        let profile = DeviceProfile::iphone();
        assert_eq!((profile.width, profile.height), (390, 844));
        assert!(profile.user_agent.contains("iPhone"));
    }
}
