//! Shared primitives for the MenuProbe workspace.
//!
//! Personas are consumed read-only; actions and diagnostics are appended to a
//! per-session [`History`], which every downstream component treats as the
//! source of truth.

pub mod action;
pub mod history;
pub mod persona;

pub use action::{ActionKind, BrowserAction, NoteTag, ProposedAction, WaitState};
pub use history::{
    diagnostics, ActionRecord, DiagnosticLevel, DiagnosticRecord, History, HistoryEntry,
    HistoryError,
};
pub use persona::{assign_default_ids, persona_seed, Persona};
