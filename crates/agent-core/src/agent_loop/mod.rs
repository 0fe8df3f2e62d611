//! Agent loop execution: one oracle-proposed action per step.

pub mod config;
pub mod controller;

pub use config::AgentLoopConfig;
pub use controller::{AgentLoopController, LoopPhase, SessionOutcome, SessionStatus};
