//! MenuProbe: persona-driven usability probing of a food-ordering site.
//!
//! The workspace crates carry the agent loop, scoring and phrase
//! diversity; this crate wires them behind configuration, persona loading,
//! report persistence and the `menuprobe` command line.

pub mod cli;
pub mod config;
pub mod errors;
pub mod personas;
pub mod report;
pub mod runner;

pub use config::ProbeConfig;
pub use errors::{ProbeError, ProbeResult};
pub use report::{Authorship, Report};
pub use runner::{PersonaOutcome, ProbeRunner, RunSummary};
