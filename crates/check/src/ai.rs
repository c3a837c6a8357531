//! AI-assisted checking on its own queue.
//!
//! Uses the same [`CheckQueue`](crate::queue::CheckQueue) machinery as the
//! text-level queue, but every entry is checked paragraph by paragraph by an
//! async [`AiBackend`] and written to the `Ai` slot.

use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use galley_primitives::{DocumentId, FlatParagraph};
use galley_worker::GenerationToken;

use crate::checker::{DocumentChecker, Prepared};
use crate::documents::Documents;
use crate::engine::RuleMatch;
use crate::model::Locale;
use crate::queue::{EntryOutcome, EntryRunner, Focus, QueueEntry, Schedule, round_robin};
use crate::{Error, Result};

/// Remote or local model that proposes corrections for one paragraph.
#[async_trait]
pub trait AiBackend: Send + Sync {
	/// Findings in `char` offsets of `text`.
	async fn check(&self, text: &str, locale: &Locale) -> Result<Vec<RuleMatch>>;
}

/// High-priority entries first, then documents in turn, each with its
/// oldest entry.
#[derive(Debug, Default)]
pub struct AiSchedule {
	last: Option<DocumentId>,
}

impl Schedule for AiSchedule {
	fn select(&mut self, pending: &VecDeque<QueueEntry>, _focus: Option<Focus>) -> Option<usize> {
		let idx = pending.iter().position(|e| e.high_priority).or_else(|| round_robin(pending, self.last))?;
		self.last = Some(pending[idx].document);
		Some(idx)
	}
}

/// Runs AI entries on the AI worker thread.
///
/// Owns a current-thread tokio runtime; every backend call races the entry's
/// cancellation token and the configured timeout.
pub struct AiRunner {
	documents: Weak<Documents>,
	backend: Arc<dyn AiBackend>,
	runtime: tokio::runtime::Runtime,
	timeout: Duration,
}

impl AiRunner {
	pub(crate) fn new(documents: Weak<Documents>, backend: Arc<dyn AiBackend>, timeout: Duration) -> Result<Self> {
		let runtime = tokio::runtime::Builder::new_current_thread()
			.enable_time()
			.build()
			.map_err(|err| Error::Backend(format!("cannot start runtime: {err}")))?;
		Ok(Self {
			documents,
			backend,
			runtime,
			timeout,
		})
	}

	/// `Ok(None)` if the token fired first.
	fn call(&self, para: &Prepared, token: &GenerationToken) -> Result<Option<Vec<RuleMatch>>> {
		self.runtime.block_on(async {
			tokio::select! {
				() = token.cancelled() => Ok(None),
				res = tokio::time::timeout(self.timeout, self.backend.check(&para.stripped, &para.locale)) => match res {
					Ok(matches) => matches.map(Some),
					Err(_) => Err(Error::BackendTimeout(self.timeout)),
				},
			}
		})
	}

	fn run_for(&self, checker: &DocumentChecker, entry: &QueueEntry, token: &GenerationToken) -> Result<EntryOutcome> {
		let cache = checker.slots().cache(entry.slot).ok_or_else(|| Error::Config(format!("{} does not exist", entry.slot)))?;
		let map = checker.snapshot_for_work()?;
		let generation = map.generation();
		let pre = cache.snapshot();

		let mut outcome = EntryOutcome::default();
		let mut written = BTreeSet::new();
		for flat in (entry.start.0..entry.end.0.min(map.len())).map(FlatParagraph) {
			if token.is_cancelled() || checker.is_disposed() {
				outcome.interrupted = true;
				break;
			}
			let para = match checker.prepare(flat) {
				Ok(para) => para,
				Err(err) => {
					tracing::warn!(document = %entry.document, paragraph = flat.0, error = %err, "check.ai.read_failed");
					checker.write_empty(generation, cache, flat);
					continue;
				}
			};
			match self.call(&para, token) {
				Ok(Some(matches)) => {
					if !checker.store_ai(generation, cache, &para, &matches) {
						outcome.interrupted = true;
						break;
					}
					written.insert(flat);
				}
				Ok(None) => {
					outcome.interrupted = true;
					break;
				}
				Err(err) => {
					tracing::warn!(document = %entry.document, paragraph = flat.0, error = %err, "check.ai.failed");
					checker.write_empty(generation, cache, flat);
				}
			}
		}
		outcome.written = written.len();
		checker.finish_write(cache, &pre, written, None);
		Ok(outcome)
	}
}

impl EntryRunner for AiRunner {
	fn run_entry(&self, entry: &QueueEntry, token: &GenerationToken) -> Result<EntryOutcome> {
		let Some(checker) = self.documents.upgrade().and_then(|documents| documents.get(entry.document)) else {
			return Ok(EntryOutcome {
				written: 0,
				interrupted: true,
			});
		};
		self.run_for(&checker, entry, token)
	}
}
