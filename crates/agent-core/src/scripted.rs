//! Scripted implementations of the browser port for tests and dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::browser::{BrowserLauncher, BrowserPage, DeviceProfile, ElementState};
use crate::errors::{NavigationError, PageError};

#[derive(Clone, Debug)]
struct ScriptedElement {
    text: String,
    state: ElementState,
    /// Becomes visible after this many state polls.
    reveal_after: Option<u32>,
    polls: u32,
    /// Click/fill never completes.
    stalls: bool,
}

#[derive(Debug, Default)]
struct PageScript {
    content: String,
    elements: HashMap<String, ScriptedElement>,
    on_click: HashMap<String, String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    closed: bool,
    /// `element_text` fails for every selector.
    text_unreadable: bool,
}

/// In-memory page whose elements and reactions are declared up front.
#[derive(Debug, Default)]
pub struct ScriptedPage {
    script: Mutex<PageScript>,
}

impl ScriptedPage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(PageScript {
                content: content.into(),
                ..PageScript::default()
            }),
        }
    }

    /// Add a visible element.
    pub fn element(self, selector: &str, text: &str) -> Self {
        self.insert(selector, text, ElementState::Visible, None, false)
    }

    /// Add an element that is hidden until polled `polls` times.
    pub fn delayed_element(self, selector: &str, text: &str, polls: u32) -> Self {
        self.insert(selector, text, ElementState::Hidden, Some(polls), false)
    }

    /// Add an element whose click or fill times out.
    pub fn stalled_element(self, selector: &str, text: &str) -> Self {
        self.insert(selector, text, ElementState::Visible, None, true)
    }

    /// Make every `element_text` call fail.
    pub fn unreadable_text(self) -> Self {
        self.script.lock().text_unreadable = true;
        self
    }

    /// Replace the page content once `selector` is clicked.
    pub fn on_click(self, selector: &str, content: impl Into<String>) -> Self {
        self.script
            .lock()
            .on_click
            .insert(selector.to_string(), content.into());
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.script.lock().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.script.lock().fills.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.script.lock().closed
    }

    fn insert(
        self,
        selector: &str,
        text: &str,
        state: ElementState,
        reveal_after: Option<u32>,
        stalls: bool,
    ) -> Self {
        self.script.lock().elements.insert(
            selector.to_string(),
            ScriptedElement {
                text: text.to_string(),
                state,
                reveal_after,
                polls: 0,
                stalls,
            },
        );
        self
    }

    fn interact(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        let script = self.script.lock();
        if script.closed {
            return Err(PageError::Closed);
        }
        match script.elements.get(selector) {
            None => Err(PageError::NotFound(selector.to_string())),
            Some(element) if element.stalls => Err(PageError::Timeout {
                selector: selector.to_string(),
                after_ms: timeout.as_millis() as u64,
            }),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn content(&self) -> Result<String, PageError> {
        let script = self.script.lock();
        if script.closed {
            return Err(PageError::Closed);
        }
        Ok(script.content.clone())
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        Ok(self.script.lock().elements.contains_key(selector))
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>, PageError> {
        let script = self.script.lock();
        if script.text_unreadable {
            return Err(PageError::other(format!("text of {selector} unavailable")));
        }
        Ok(script
            .elements
            .get(selector)
            .map(|element| element.text.clone()))
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        self.interact(selector, timeout)?;
        let mut script = self.script.lock();
        script.clicks.push(selector.to_string());
        if let Some(content) = script.on_click.get(selector).cloned() {
            script.content = content;
        }
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str, timeout: Duration) -> Result<(), PageError> {
        self.interact(selector, timeout)?;
        self.script
            .lock()
            .fills
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn element_state(&self, selector: &str) -> Result<ElementState, PageError> {
        let mut script = self.script.lock();
        let Some(element) = script.elements.get_mut(selector) else {
            return Ok(ElementState::Detached);
        };
        element.polls += 1;
        if let Some(after) = element.reveal_after {
            if element.polls > after {
                element.state = ElementState::Visible;
            }
        }
        Ok(element.state)
    }

    async fn close(&self) -> Result<(), PageError> {
        self.script.lock().closed = true;
        Ok(())
    }
}

type PageFactory = dyn Fn() -> ScriptedPage + Send + Sync;

/// Launcher that hands out scripted pages, optionally failing first.
pub struct ScriptedLauncher {
    factory: Arc<PageFactory>,
    failures: Mutex<HashMap<String, u32>>,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedLauncher {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> ScriptedPage + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            failures: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next `count` attempts on `engine`.
    pub fn failing(self, engine: &str, count: u32) -> Self {
        self.failures.lock().insert(engine.to_string(), count);
        self
    }

    /// Engines tried so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn open(
        &self,
        engine: &str,
        _profile: &DeviceProfile,
        url: &str,
        timeout: Duration,
    ) -> Result<Box<dyn BrowserPage>, NavigationError> {
        self.attempts.lock().push(engine.to_string());
        {
            let mut failures = self.failures.lock();
            if let Some(remaining) = failures.get_mut(engine) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(NavigationError::Timeout {
                        engine: engine.to_string(),
                        url: url.to_string(),
                        after_ms: timeout.as_millis() as u64,
                    });
                }
            }
        }
        Ok(Box::new((self.factory)()))
    }
}
