//! Background check queues.
//!
//! A [`CheckQueue`] owns one dedicated worker thread that drains a
//! [`WorkQueue`] of [`QueueEntry`] values. Which entry runs next is decided by
//! a [`Schedule`]; what running an entry means is decided by an
//! [`EntryRunner`]. The orchestrator only ever holds a [`QueueSender`].

use std::collections::{BTreeSet, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use galley_primitives::{DocumentId, FlatParagraph};
use galley_worker::{
	GenerationClock, GenerationToken, Placement, PushOutcome, TaskClass, WorkQueue, WorkerRecord, WorkerRegistry, panic_message,
	spawn_named_thread,
};
use parking_lot::Mutex;

use crate::slots::SlotId;
use crate::{Error, Result};

/// One unit of background work: re-check `[start, end)` for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
	pub start: FlatParagraph,
	pub end: FlatParagraph,
	pub slot: SlotId,
	/// Window size the slot's rules need.
	pub window: i32,
	pub document: DocumentId,
	/// Queued in front of normal entries.
	pub high_priority: bool,
}

impl QueueEntry {
	/// Entries for the same range, slot, and document replace each other.
	pub fn same_target(&self, other: &QueueEntry) -> bool {
		self.start == other.start && self.end == other.end && self.slot == other.slot && self.document == other.document
	}

	/// Distance in paragraphs from `flat` to the entry's range.
	pub fn distance_to(&self, flat: FlatParagraph) -> usize {
		if flat < self.start {
			self.start.0 - flat.0
		} else if flat >= self.end {
			(flat.0 + 1).saturating_sub(self.end.0)
		} else {
			0
		}
	}
}

/// Paragraph the user worked on last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
	pub document: DocumentId,
	pub paragraph: FlatParagraph,
}

/// Picks the next entry a worker runs.
pub trait Schedule: Send + 'static {
	/// Index into `pending` of the entry to run next.
	fn select(&mut self, pending: &VecDeque<QueueEntry>, focus: Option<Focus>) -> Option<usize>;
}

/// Runs one entry on the worker thread.
pub trait EntryRunner: Send + Sync {
	/// Must poll `token` between paragraphs and return early once it is
	/// cancelled.
	fn run_entry(&self, entry: &QueueEntry, token: &GenerationToken) -> Result<EntryOutcome>;
}

/// What running one entry achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOutcome {
	/// Paragraph results written.
	pub written: usize,
	/// The entry was abandoned after an interrupt.
	pub interrupted: bool,
}

/// Text-level schedule: high-priority entries, then the focused document
/// nearest to the focused paragraph, then the other documents round-robin.
#[derive(Debug, Default)]
pub struct TextLevelSchedule {
	last: Option<DocumentId>,
}

impl Schedule for TextLevelSchedule {
	fn select(&mut self, pending: &VecDeque<QueueEntry>, focus: Option<Focus>) -> Option<usize> {
		if let Some(idx) = pending.iter().position(|e| e.high_priority) {
			return Some(idx);
		}
		let focused = focus.and_then(|focus| {
			pending
				.iter()
				.enumerate()
				.filter(|(_, e)| e.document == focus.document)
				.min_by_key(|(_, e)| e.distance_to(focus.paragraph))
				.map(|(idx, _)| idx)
		});
		let idx = focused.or_else(|| round_robin(pending, self.last))?;
		self.last = Some(pending[idx].document);
		Some(idx)
	}
}

/// Oldest entry of the first document after `last` that has pending work,
/// wrapping around.
pub(crate) fn round_robin(pending: &VecDeque<QueueEntry>, last: Option<DocumentId>) -> Option<usize> {
	let documents: BTreeSet<DocumentId> = pending.iter().map(|e| e.document).collect();
	let next = last
		.and_then(|last| documents.range(last..).find(|&&d| d != last))
		.or_else(|| documents.first())?;
	pending.iter().position(|e| e.document == *next)
}

struct Running {
	document: DocumentId,
	token: GenerationToken,
}

struct QueueShared {
	name: String,
	class: TaskClass,
	queue: WorkQueue<QueueEntry>,
	running: Mutex<Option<Running>>,
	focus: Mutex<Option<Focus>>,
	clock: GenerationClock,
	registry: WorkerRegistry,
}

impl QueueShared {
	fn add(&self, entry: QueueEntry) -> PushOutcome {
		let placement = if entry.high_priority { Placement::Front } else { Placement::Back };
		let (document, start, slot) = (entry.document, entry.start, entry.slot);
		let outcome = self.queue.push(entry, placement, QueueEntry::same_target);
		tracing::trace!(queue = %self.name, document = %document, start = start.0, slot = %slot, ?outcome, "check.queue.add");
		if outcome != PushOutcome::Closed {
			let pending = self.queue.len();
			self.registry.update(&self.name, self.class, |r| r.pending = pending);
		}
		outcome
	}

	fn interrupt(&self, document: DocumentId, also_future: bool) {
		// Pending entries go first: an entry taken while the queue lock was
		// held is published as running before `retain` gets the lock.
		if also_future {
			let removed = self.queue.retain(|e| e.document != document);
			tracing::debug!(queue = %self.name, document = %document, removed, "check.queue.interrupt");
		}
		if let Some(running) = self.running.lock().as_ref().filter(|r| r.document == document) {
			running.token.cancel();
		}
	}

	fn cancel_running(&self) {
		if let Some(running) = self.running.lock().as_ref() {
			running.token.cancel();
		}
	}
}

/// Handle through which documents feed a [`CheckQueue`].
#[derive(Clone)]
pub struct QueueSender {
	shared: Arc<QueueShared>,
}

impl std::fmt::Debug for QueueSender {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("QueueSender").field("queue", &self.shared.name).finish()
	}
}

impl QueueSender {
	/// Queues `entry`, replacing a pending entry with the same target.
	pub fn add_queue_entry(&self, entry: QueueEntry) -> PushOutcome {
		self.shared.add(entry)
	}

	/// Stops the running entry of `document` at its next paragraph boundary
	/// and, with `also_future`, drops the document's pending entries.
	pub fn interrupt_check(&self, document: DocumentId, also_future: bool) {
		self.shared.interrupt(document, also_future);
	}

	pub fn set_focus(&self, document: DocumentId, paragraph: FlatParagraph) {
		*self.shared.focus.lock() = Some(Focus { document, paragraph });
	}
}

/// Queue plus its dedicated worker thread.
pub struct CheckQueue {
	shared: Arc<QueueShared>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for CheckQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CheckQueue")
			.field("name", &self.shared.name)
			.field("queue", &self.shared.queue)
			.finish()
	}
}

impl CheckQueue {
	/// Starts the worker thread.
	///
	/// `capacity` bounds the pending entries; the oldest is dropped when full.
	pub fn spawn(
		name: impl Into<String>,
		class: TaskClass,
		schedule: impl Schedule,
		runner: Arc<dyn EntryRunner>,
		registry: WorkerRegistry,
		capacity: Option<usize>,
	) -> Result<Self> {
		let name = name.into();
		let shared = Arc::new(QueueShared {
			queue: capacity.map_or_else(WorkQueue::new, WorkQueue::bounded),
			running: Mutex::new(None),
			focus: Mutex::new(None),
			clock: GenerationClock::new(),
			registry,
			class,
			name: name.clone(),
		});
		shared.registry.upsert(WorkerRecord::new(&name, class));
		let worker_shared = Arc::clone(&shared);
		let handle = spawn_named_thread(class, format!("galley-{name}"), move || worker_loop(&worker_shared, schedule, runner.as_ref()))
			.map_err(Error::Spawn)?;
		tracing::debug!(queue = %name, class = class.as_str(), "check.queue.spawn");
		Ok(Self {
			shared,
			worker: Mutex::new(Some(handle)),
		})
	}

	pub fn sender(&self) -> QueueSender {
		QueueSender {
			shared: Arc::clone(&self.shared),
		}
	}

	pub fn name(&self) -> &str {
		&self.shared.name
	}

	/// See [`QueueSender::add_queue_entry`].
	pub fn add_queue_entry(&self, entry: QueueEntry) -> PushOutcome {
		self.shared.add(entry)
	}

	/// See [`QueueSender::interrupt_check`].
	pub fn interrupt_check(&self, document: DocumentId, also_future: bool) {
		self.shared.interrupt(document, also_future);
	}

	pub fn set_focus(&self, document: DocumentId, paragraph: FlatParagraph) {
		*self.shared.focus.lock() = Some(Focus { document, paragraph });
	}

	/// Drops all pending entries and interrupts the running one. The worker
	/// keeps serving new entries.
	pub fn set_reset(&self) {
		let removed = self.shared.queue.clear();
		self.shared.cancel_running();
		self.shared.registry.update(&self.shared.name, self.shared.class, |r| r.pending = 0);
		tracing::debug!(queue = %self.shared.name, removed, "check.queue.reset");
	}

	/// Terminates the worker permanently and waits for it to exit.
	///
	/// Idempotent. Called from the worker thread itself it does not wait.
	pub fn set_stop(&self) {
		self.shared.queue.close();
		self.shared.cancel_running();
		let Some(handle) = self.worker.lock().take() else {
			return;
		};
		if handle.thread().id() == std::thread::current().id() {
			return;
		}
		if let Err(payload) = handle.join() {
			tracing::error!(queue = %self.shared.name, panic = ?panic_message(payload.as_ref()), "check.queue.join_failed");
		}
		self.shared.registry.remove(&self.shared.name);
		tracing::debug!(queue = %self.shared.name, "check.queue.stop");
	}

	pub fn is_stopped(&self) -> bool {
		self.shared.queue.is_closed()
	}

	/// Pending entries in queue order.
	pub fn pending(&self) -> Vec<QueueEntry> {
		self.shared.queue.pending()
	}

	pub fn len(&self) -> usize {
		self.shared.queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.shared.queue.is_empty()
	}

	/// Nothing pending and nothing running.
	pub fn is_idle(&self) -> bool {
		self.shared.queue.is_idle()
	}

	/// Blocks until the queue is idle, at most `timeout`.
	pub fn wait_idle(&self, timeout: Duration) -> bool {
		self.shared.queue.wait_idle(timeout)
	}

	pub fn status(&self) -> Option<WorkerRecord> {
		self.shared.registry.get(&self.shared.name)
	}
}

impl Drop for CheckQueue {
	fn drop(&mut self) {
		self.set_stop();
	}
}

fn worker_loop(shared: &QueueShared, mut schedule: impl Schedule, runner: &dyn EntryRunner) {
	loop {
		let token = shared.clock.token();
		let taken = shared.queue.take(|pending| {
			let idx = schedule.select(pending, *shared.focus.lock())?;
			// Published under the queue lock; `interrupt` relies on it.
			*shared.running.lock() = Some(Running {
				document: pending[idx].document,
				token: token.clone(),
			});
			Some(idx)
		});
		let Some(taken) = taken else {
			break;
		};
		let entry = taken.item();
		let pending = shared.queue.len();
		shared.registry.update(&shared.name, shared.class, |r| {
			r.generation = token.generation();
			r.pending = pending;
		});

		let result = catch_unwind(AssertUnwindSafe(|| runner.run_entry(entry, &token)));
		*shared.running.lock() = None;

		let last_error = match result {
			Ok(Ok(outcome)) => {
				tracing::debug!(
					queue = %shared.name,
					document = %entry.document,
					start = entry.start.0,
					end = entry.end.0,
					slot = %entry.slot,
					written = outcome.written,
					interrupted = outcome.interrupted,
					"check.queue.entry"
				);
				None
			}
			Ok(Err(err)) => {
				tracing::warn!(queue = %shared.name, document = %entry.document, start = entry.start.0, error = %err, "check.queue.entry_failed");
				Some(err.to_string())
			}
			Err(payload) => {
				let msg = panic_message(payload.as_ref()).unwrap_or_else(|| "unknown panic".to_string());
				tracing::error!(queue = %shared.name, document = %entry.document, start = entry.start.0, panic = %msg, "check.queue.entry_panicked");
				Some(msg)
			}
		};
		let pending = shared.queue.len();
		shared.registry.update(&shared.name, shared.class, |r| {
			r.processed += 1;
			r.pending = pending;
			if last_error.is_some() {
				r.last_error = last_error;
			}
		});
		drop(taken);
	}
	tracing::debug!(queue = %shared.name, "check.queue.worker_exit");
}
