//! Incremental proofreading for a word processor host.
//!
//! A [`Documents`] handler owns one [`DocumentChecker`] per open document.
//! Requests from the host are answered from per-rule-class result caches;
//! misses run the single-paragraph rules in the foreground while text-level
//! rules are queued for a background worker. Every cache write is diffed
//! against the previous state so the host only repaints paragraphs whose
//! errors actually changed.
//!
//! Paragraph numbering lives in [`galley_index`], the caches in
//! [`galley_cache`], and the worker primitives in [`galley_worker`].

mod ai;
mod checker;
mod config;
mod documents;
mod engine;
mod error;
pub mod logging;
mod model;
mod queue;
mod repaint;
mod slots;
mod spans;
mod state;

pub use ai::{AiBackend, AiSchedule};
pub use checker::{CheckContext, CheckRequest, CheckResult, CheckerStats, DocumentChecker};
pub use config::{AiConfig, CheckConfig};
pub use documents::{AI_QUEUE, Documents, TEXT_QUEUE};
pub use engine::{EngineFactory, EngineRegistry, LinguisticEngine, RuleMatch, RuleMode, sentence_ends};
pub use error::{Error, Result};
pub use model::{DocumentModel, Locale};
pub use queue::{CheckQueue, EntryOutcome, EntryRunner, Focus, QueueEntry, QueueSender, Schedule, TextLevelSchedule};
pub use repaint::{NoRepaint, ParagraphUpdate, RepaintSink, SentenceErrors, group_by_sentence};
pub use slots::{CacheSlots, SlotId, SlotKind};
pub use spans::Adjustments;
pub use state::SharedState;
