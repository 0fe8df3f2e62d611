//! Chromium-family browsers driven over the DevTools protocol.
//!
//! Every session launches its own browser process with a throwaway profile
//! directory, applies the device profile, and navigates before the page is
//! handed to the agent loop.

mod engine;
mod page;
mod script;

pub use engine::{engine_executable_names, resolve_engine};
pub use page::{CdpLauncher, CdpPage, LaunchSettings};
