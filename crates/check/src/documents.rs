//! Handler for all open documents of one host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use galley_primitives::DocumentId;
use galley_worker::{GenerationToken, TaskClass, WorkerRecord, WorkerRegistry};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ai::{AiBackend, AiRunner, AiSchedule};
use crate::checker::{CheckContext, DocumentChecker};
use crate::engine::EngineRegistry;
use crate::model::DocumentModel;
use crate::queue::{CheckQueue, EntryOutcome, EntryRunner, QueueEntry, TextLevelSchedule};
use crate::repaint::RepaintSink;
use crate::state::SharedState;
use crate::{CheckConfig, Result};

/// Worker name of the text-level queue.
pub const TEXT_QUEUE: &str = "text-level";
/// Worker name of the AI queue.
pub const AI_QUEUE: &str = "ai";

/// Open documents plus the queues and state they share.
pub struct Documents {
	config: Arc<CheckConfig>,
	engines: Arc<EngineRegistry>,
	shared: Arc<SharedState>,
	repaint: Arc<dyn RepaintSink>,
	registry: WorkerRegistry,
	checkers: RwLock<FxHashMap<DocumentId, Arc<DocumentChecker>>>,
	queue: OnceLock<CheckQueue>,
	ai_queue: OnceLock<CheckQueue>,
	enabled: Arc<AtomicBool>,
}

impl std::fmt::Debug for Documents {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Documents")
			.field("documents", &self.checkers.read().len())
			.field("queue", &self.queue.get())
			.field("ai_queue", &self.ai_queue.get())
			.field("enabled", &self.enabled.load(Ordering::Relaxed))
			.finish()
	}
}

impl Documents {
	/// Creates a handler without AI checking.
	pub fn new(config: CheckConfig, engines: EngineRegistry, repaint: Arc<dyn RepaintSink>) -> Result<Arc<Self>> {
		Self::build(config, engines, repaint, None)
	}

	/// Creates a handler whose AI queue uses `backend` when `config.ai` is
	/// enabled.
	pub fn with_ai(config: CheckConfig, engines: EngineRegistry, repaint: Arc<dyn RepaintSink>, backend: Arc<dyn AiBackend>) -> Result<Arc<Self>> {
		Self::build(config, engines, repaint, Some(backend))
	}

	fn build(mut config: CheckConfig, engines: EngineRegistry, repaint: Arc<dyn RepaintSink>, backend: Option<Arc<dyn AiBackend>>) -> Result<Arc<Self>> {
		config.validate()?;
		if backend.is_none() {
			config.ai.enabled = false;
		}
		let documents = Arc::new(Self {
			shared: Arc::new(SharedState::new(config.suggestion_cache_size)),
			config: Arc::new(config),
			engines: Arc::new(engines),
			repaint,
			registry: WorkerRegistry::new(),
			checkers: RwLock::new(FxHashMap::default()),
			queue: OnceLock::new(),
			ai_queue: OnceLock::new(),
			enabled: Arc::new(AtomicBool::new(true)),
		});

		if documents.config.queue_enabled() {
			let runner = Arc::new(WindowRunner {
				documents: Arc::downgrade(&documents),
			});
			let queue = CheckQueue::spawn(TEXT_QUEUE, TaskClass::Background, TextLevelSchedule::default(), runner, documents.registry.clone(), None)?;
			let _ = documents.queue.set(queue);
		}
		if let Some(backend) = backend
			&& documents.config.ai.enabled
		{
			let runner = Arc::new(AiRunner::new(Arc::downgrade(&documents), backend, documents.config.ai.timeout())?);
			let queue = CheckQueue::spawn(
				AI_QUEUE,
				TaskClass::Remote,
				AiSchedule::default(),
				runner,
				documents.registry.clone(),
				Some(documents.config.ai.max_pending),
			)?;
			let _ = documents.ai_queue.set(queue);
		}
		tracing::debug!(
			queue = documents.queue.get().is_some(),
			ai = documents.ai_queue.get().is_some(),
			"check.documents.start"
		);
		Ok(documents)
	}

	pub fn config(&self) -> &CheckConfig {
		&self.config
	}

	pub fn shared(&self) -> &SharedState {
		&self.shared
	}

	fn context(&self) -> CheckContext {
		CheckContext {
			config: Arc::clone(&self.config),
			engines: Arc::clone(&self.engines),
			shared: Arc::clone(&self.shared),
			repaint: Arc::clone(&self.repaint),
			queue: self.queue.get().map(CheckQueue::sender),
			ai_queue: self.ai_queue.get().map(CheckQueue::sender),
			enabled: Arc::clone(&self.enabled),
		}
	}

	/// Starts tracking a document. Reopening an id replaces its checker.
	pub fn open(&self, id: DocumentId, model: Arc<dyn DocumentModel>) -> Arc<DocumentChecker> {
		let checker = Arc::new(DocumentChecker::new(id, model, self.context()));
		if let Some(old) = self.checkers.write().insert(id, Arc::clone(&checker)) {
			old.dispose();
		}
		checker
	}

	/// Stops tracking a document; queued work for it is dropped.
	pub fn close(&self, id: DocumentId) -> bool {
		let Some(checker) = self.checkers.write().remove(&id) else {
			return false;
		};
		checker.dispose();
		tracing::debug!(document = %id, "check.documents.close");
		true
	}

	pub fn get(&self, id: DocumentId) -> Option<Arc<DocumentChecker>> {
		self.checkers.read().get(&id).cloned()
	}

	/// Ids of the open documents, ascending.
	pub fn ids(&self) -> Vec<DocumentId> {
		let mut ids: Vec<_> = self.checkers.read().keys().copied().collect();
		ids.sort_unstable();
		ids
	}

	fn all(&self) -> Vec<Arc<DocumentChecker>> {
		self.checkers.read().values().cloned().collect()
	}

	/// The language of `id` changed: its results and the built engines are
	/// discarded.
	pub fn language_changed(&self, id: DocumentId) {
		self.engines.invalidate();
		if let Some(checker) = self.get(id) {
			checker.discard();
		}
	}

	/// Switches checking off or back on.
	///
	/// Switching off discards every result and drops queued work; the workers
	/// stay alive for when checking resumes.
	pub fn set_enabled(&self, enabled: bool) {
		if self.enabled.swap(enabled, Ordering::AcqRel) == enabled {
			return;
		}
		if !enabled {
			self.for_each_queue(CheckQueue::set_reset);
			for checker in self.all() {
				checker.discard();
			}
		}
		tracing::info!(enabled, "check.documents.enabled");
	}

	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::Acquire)
	}

	/// Drops queued work and all results of every document; the host
	/// rechecks afterwards.
	pub fn reset_all(&self) {
		self.for_each_queue(CheckQueue::set_reset);
		for checker in self.all() {
			checker.reset();
		}
		tracing::debug!(documents = self.checkers.read().len(), "check.documents.reset");
	}

	/// Disables a rule for `language` (all languages with `None`) and strips
	/// its errors from every document.
	pub fn disable_rule(&self, language: Option<&str>, rule_id: &str) {
		if !self.shared.disable_rule(language, rule_id) {
			return;
		}
		for checker in self.all() {
			checker.remove_rule(rule_id);
		}
	}

	/// Re-enables a rule. Its errors only come back through a full recheck.
	pub fn enable_rule(&self, language: Option<&str>, rule_id: &str) {
		if self.shared.enable_rule(language, rule_id) {
			self.reset_all();
		}
	}

	fn for_each_queue(&self, f: impl FnMut(&CheckQueue)) {
		self.queue.get().into_iter().chain(self.ai_queue.get()).for_each(f);
	}

	/// Waits until both queues are idle, at most `timeout` in total.
	pub fn wait_idle(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut idle = true;
		self.for_each_queue(|queue| {
			idle &= queue.wait_idle(deadline.saturating_duration_since(Instant::now()));
		});
		idle
	}

	/// Status of the queue workers, sorted by name.
	pub fn worker_status(&self) -> Vec<WorkerRecord> {
		self.registry.snapshots()
	}

	/// Stops the workers permanently and disposes every document.
	pub fn shutdown(&self) {
		self.for_each_queue(CheckQueue::set_stop);
		for checker in self.checkers.write().drain().map(|(_, c)| c) {
			checker.dispose();
		}
		tracing::debug!("check.documents.shutdown");
	}
}

/// Runs text-level queue entries against the owning document.
struct WindowRunner {
	documents: Weak<Documents>,
}

impl EntryRunner for WindowRunner {
	fn run_entry(&self, entry: &QueueEntry, token: &GenerationToken) -> Result<EntryOutcome> {
		let Some(checker) = self.documents.upgrade().and_then(|documents| documents.get(entry.document)) else {
			return Ok(EntryOutcome {
				written: 0,
				interrupted: true,
			});
		};
		checker.run_queued(entry, token)
	}
}
