use menuprobe_core_types::{History, Persona};
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent_loop::{AgentLoopController, SessionOutcome};
use crate::browser::{BrowserLauncher, DeviceProfile};
use crate::errors::AgentError;
use crate::navigation::{navigate_with_fallback, NavigationPolicy};

/// Opens the target site for a persona and drives the agent loop on it.
#[derive(Clone)]
pub struct SessionRunner {
    launcher: Arc<dyn BrowserLauncher>,
    controller: AgentLoopController,
    target_url: String,
    profile: DeviceProfile,
    navigation: NavigationPolicy,
}

impl SessionRunner {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        controller: AgentLoopController,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            launcher,
            controller,
            target_url: target_url.into(),
            profile: DeviceProfile::iphone(),
            navigation: NavigationPolicy::default(),
        }
    }

    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationPolicy) -> Self {
        self.navigation = navigation;
        self
    }

    /// Run one persona. `Err` means navigation was abandoned and no session
    /// took place.
    pub async fn run(&self, persona: &Persona) -> Result<SessionOutcome, AgentError> {
        let navigated = navigate_with_fallback(
            self.launcher.as_ref(),
            &self.profile,
            &self.target_url,
            &self.navigation,
        )
        .await?;
        info!(persona = %persona.id, engine = %navigated.engine, "session started");

        let mut history = History::new();
        history.info(format!(
            "navigated to {} via {} after {} attempt(s)",
            self.target_url, navigated.engine, navigated.attempts
        ));
        let outcome = self
            .controller
            .run(persona, navigated.page.as_ref(), history)
            .await;

        if let Err(err) = navigated.page.close().await {
            warn!(persona = %persona.id, error = %err, "failed to close page");
        }
        Ok(outcome)
    }
}
