//! Browser agent for MenuProbe sessions.
//!
//! A session opens the target site on a mobile-emulated page, then asks the
//! decision oracle for one action at a time. Every proposal is validated
//! before it touches the page: purchase-finalization controls halt the
//! session, missing targets and timeouts degrade to warnings, and the
//! outcome is an append-only [`History`](menuprobe_core_types::History).

pub mod agent_loop;
pub mod browser;
pub mod errors;
pub mod guard;
pub mod navigation;
pub mod scripted;
pub mod session;

pub use agent_loop::{AgentLoopConfig, AgentLoopController, LoopPhase, SessionOutcome, SessionStatus};
pub use browser::{BrowserLauncher, BrowserPage, DeviceProfile, ElementState};
pub use errors::{AgentError, NavigationError, PageError};
pub use navigation::{navigate_with_fallback, NavigatedPage, NavigationPolicy};
pub use scripted::{ScriptedLauncher, ScriptedPage};
pub use session::SessionRunner;
