//! Cross-report novelty for MenuProbe reports.
//!
//! Every report passes through [`DiversityEngine::finalize`], which checks
//! the variable sections against a persistent [`phrase_store::PhraseStore`],
//! tops up short sections and commits what was accepted.

pub mod category;
pub mod engine;
pub mod fallback;
pub mod markdown;
pub mod pools;

pub use category::{categorize, GENERIC, TEMPLATED};
pub use engine::{DiversityConfig, DiversityEngine, FinalizedReport};
pub use fallback::{author_report, critical_from_signals, fallback_description};
pub use markdown::{ReportSections, NONE_OBSERVED};
pub use pools::{persona_axes, PhrasePools, PhraseTable, PoolError, TemplateGrid};
