//! Per-document check orchestration.
//!
//! [`DocumentChecker`] decides per request whether cached results can be
//! served, runs the single-paragraph check on a miss, and either queues or
//! synchronously runs the text-level window checks. After every write it
//! diffs the touched slot against its state before the write and tells the
//! [`RepaintSink`] about exactly the paragraphs whose errors changed.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use galley_cache::{CacheEntry, CacheSnapshot, ResultCache};
use galley_index::{ParagraphIndex, ParagraphMap, ParagraphWindow};
use galley_primitives::{DocumentId, ErrorDisplay, ErrorFilter, ErrorKind, FlatParagraph, LogicalParagraph, ParagraphEdit, ProofError};
use galley_worker::GenerationToken;
use parking_lot::{Mutex, RwLock};

use crate::engine::{EngineRegistry, RuleMatch, RuleMode};
use crate::model::{DocumentModel, HostParagraphs};
use crate::queue::{EntryOutcome, QueueEntry, QueueSender};
use crate::repaint::{ParagraphUpdate, RepaintSink, group_by_sentence};
use crate::slots::{CacheSlots, SlotId, SlotKind};
use crate::spans::Adjustments;
use crate::state::SharedState;
use crate::{CheckConfig, Error, Result};

mod window;

pub(crate) use window::Prepared;
use window::{LocalMatch, concat, distribute};

/// Everything a [`DocumentChecker`] shares with the other documents of its
/// handler.
#[derive(Clone)]
pub struct CheckContext {
	pub config: Arc<CheckConfig>,
	pub engines: Arc<EngineRegistry>,
	pub shared: Arc<SharedState>,
	pub repaint: Arc<dyn RepaintSink>,
	/// Text-level queue; `None` checks text-level rules synchronously.
	pub queue: Option<QueueSender>,
	pub ai_queue: Option<QueueSender>,
	/// Cleared while checking is switched off.
	pub enabled: Arc<AtomicBool>,
}

impl CheckContext {
	/// Context without queues, checking everything synchronously.
	pub fn synchronous(config: CheckConfig, engines: EngineRegistry, repaint: Arc<dyn RepaintSink>) -> Self {
		let shared = Arc::new(SharedState::new(config.suggestion_cache_size));
		Self {
			config: Arc::new(config),
			engines: Arc::new(engines),
			shared,
			repaint,
			queue: None,
			ai_queue: None,
			enabled: Arc::new(AtomicBool::new(true)),
		}
	}
}

/// A proofreading request of the host for one position in a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
	pub paragraph: LogicalParagraph,
	/// `char` offset inside the paragraph; selects the sentence served.
	pub offset: usize,
	pub filter: ErrorFilter,
	/// Issued by a dialog or context menu: text-level rules are checked
	/// before answering instead of being queued.
	pub interactive: bool,
}

impl CheckRequest {
	pub fn new(paragraph: LogicalParagraph, offset: usize) -> Self {
		Self {
			paragraph,
			offset,
			filter: ErrorFilter::Both,
			interactive: false,
		}
	}

	#[must_use]
	pub fn interactive(mut self) -> Self {
		self.interactive = true;
		self
	}

	#[must_use]
	pub fn with_filter(mut self, filter: ErrorFilter) -> Self {
		self.filter = filter;
		self
	}
}

/// Errors of the requested sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
	/// `None` if the paragraph could not be resolved.
	pub paragraph: Option<FlatParagraph>,
	/// `char` range of the sentence in the host paragraph text.
	pub sentence: Range<usize>,
	pub errors: Vec<ProofError>,
}

impl CheckResult {
	fn empty(offset: usize) -> Self {
		Self {
			paragraph: None,
			sentence: offset..offset,
			errors: Vec::new(),
		}
	}

	/// Start of the next sentence, where the host continues.
	pub fn next_sentence(&self) -> usize {
		self.sentence.end
	}
}

/// Cache statistics of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerStats {
	pub paragraphs: usize,
	pub generation: u64,
	pub cached_entries: usize,
	pub cached_errors: usize,
}

/// Check state of one open document.
pub struct DocumentChecker {
	id: DocumentId,
	model: Arc<dyn DocumentModel>,
	index: ParagraphIndex,
	slots: CacheSlots,
	ctx: CheckContext,
	/// Errors the user chose to ignore, by paragraph: `(start, rule_id)`.
	ignored: Mutex<BTreeMap<usize, Vec<(usize, String)>>>,
	/// Paragraphs whose display is known to be out of date, repainted by the
	/// next write that covers them.
	needs_repaint: Mutex<BTreeSet<usize>>,
	/// Held for reading by guarded cache writes and for writing while the
	/// numbering changes.
	structure: RwLock<()>,
	disposed: AtomicBool,
}

impl std::fmt::Debug for DocumentChecker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DocumentChecker")
			.field("id", &self.id)
			.field("generation", &self.index.generation())
			.field("slots", &self.slots.len())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

impl DocumentChecker {
	pub fn new(id: DocumentId, model: Arc<dyn DocumentModel>, ctx: CheckContext) -> Self {
		let index = ParagraphIndex::from_source(&HostParagraphs(model.as_ref())).unwrap_or_else(|err| {
			tracing::warn!(document = %id, error = %err, "check.index.initial_build_failed");
			ParagraphIndex::new()
		});
		let slots = CacheSlots::from_config(&ctx.config);
		tracing::debug!(document = %id, paragraphs = index.snapshot().len(), slots = slots.len(), "check.open");
		Self {
			id,
			model,
			index,
			slots,
			ctx,
			ignored: Mutex::new(BTreeMap::new()),
			needs_repaint: Mutex::new(BTreeSet::new()),
			structure: RwLock::new(()),
			disposed: AtomicBool::new(false),
		}
	}

	pub fn id(&self) -> DocumentId {
		self.id
	}

	pub fn slots(&self) -> &CacheSlots {
		&self.slots
	}

	pub fn index(&self) -> &ParagraphIndex {
		&self.index
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	fn is_active(&self) -> bool {
		!self.is_disposed() && self.ctx.enabled.load(Ordering::Acquire)
	}

	/// Marks the document closed and drops its queued work. In-flight work
	/// notices at its next checkpoint and writes nothing more.
	pub fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}
		for queue in self.queues() {
			queue.interrupt_check(self.id, true);
		}
		tracing::debug!(document = %self.id, "check.dispose");
	}

	fn queues(&self) -> impl Iterator<Item = &QueueSender> {
		self.ctx.queue.iter().chain(self.ctx.ai_queue.iter())
	}

	/// Answers a proofreading request.
	///
	/// Never fails: paragraphs that cannot be read or checked yield no errors.
	pub fn check(&self, request: &CheckRequest) -> CheckResult {
		if !self.is_active() {
			return CheckResult::empty(request.offset);
		}
		let (map, flat) = match self.resolve(request.paragraph) {
			Ok(found) => found,
			Err(err) => {
				tracing::warn!(document = %self.id, paragraph = %request.paragraph, error = %err, "check.resolve_failed");
				if let Some(flat) = self.model.flat_of(request.paragraph) {
					self.slots.single().put_empty(flat);
				}
				return CheckResult::empty(request.offset);
			}
		};
		if let Some(queue) = &self.ctx.queue {
			queue.set_focus(self.id, flat);
		}

		if !self.slots.single().contains(flat) {
			self.check_single(map.generation(), flat);
		}
		for (slot, kind, cache) in self.slots.text_level() {
			if cache.contains(flat) {
				continue;
			}
			if self.ctx.queue.is_some() && !request.interactive {
				self.enqueue_window(&map, slot, kind, flat);
			} else {
				self.check_window_now(&map, slot, kind, request.paragraph, flat);
			}
		}
		if let Some((slot, cache)) = self.slots.ai()
			&& !cache.contains(flat)
		{
			self.enqueue_ai(slot, flat, false);
		}

		if self.is_disposed() {
			return CheckResult::empty(request.offset);
		}
		self.serve(flat, request.offset, request.filter)
	}

	/// Resolves a logical paragraph, rebuilding a stale index once.
	fn resolve(&self, logical: LogicalParagraph) -> Result<(Arc<ParagraphMap>, FlatParagraph)> {
		let map = self.current_index()?;
		let host = self.model.flat_of(logical);
		match map.flat_of(logical) {
			Ok(flat) if host.is_none_or(|h| h == flat) => return Ok((map, flat)),
			Ok(flat) => {
				tracing::debug!(document = %self.id, paragraph = %logical, indexed = flat.0, host = ?host, "check.index.mismatch");
			}
			Err(err) if err.needs_rebuild() => {
				tracing::debug!(document = %self.id, paragraph = %logical, error = %err, "check.index.miss");
			}
			Err(err) => return Err(err.into()),
		}
		let map = self.rebuild_index()?;
		let flat = map.flat_of(logical)?;
		Ok((map, flat))
	}

	/// Current index snapshot; rebuilt if it no longer matches the host.
	fn current_index(&self) -> Result<Arc<ParagraphMap>> {
		match self.index.ensure_current(&HostParagraphs(self.model.as_ref())) {
			Ok(map) => Ok(map),
			Err(err) => {
				tracing::debug!(document = %self.id, error = %err, "check.index.out_of_sync");
				self.rebuild_index()
			}
		}
	}

	/// Rebuilds the numbering from the host. Cached results keyed by the old
	/// numbering become meaningless and are discarded.
	fn rebuild_index(&self) -> Result<Arc<ParagraphMap>> {
		let _guard = self.structure.write();
		let map = self.index.rebuild(&HostParagraphs(self.model.as_ref()))?;
		self.slots.clear_displayed();
		if let Some(baseline) = self.slots.sentence_reset() {
			baseline.clear();
		}
		self.ignored.lock().clear();
		self.needs_repaint.lock().clear();
		Ok(map)
	}

	fn check_single(&self, generation: u64, flat: FlatParagraph) {
		if let Err(err) = self.try_check_single(generation, flat) {
			tracing::warn!(document = %self.id, paragraph = flat.0, error = %err, "check.single_failed");
			self.slots.single().put_empty(flat);
		}
	}

	fn try_check_single(&self, generation: u64, flat: FlatParagraph) -> Result<()> {
		let para = self.prepare(flat)?;
		let engine = self.ctx.engines.engine_for(&para.locale)?;
		let ends = engine.analyze(&para.stripped).into_iter().map(|end| para.adjustments.correct_offset(end)).collect();
		let matches = engine.check(&para.stripped, &[0..para.len], RuleMode::SingleParagraph)?;
		let local: Vec<_> = matches.iter().map(|rule| LocalMatch { from: rule.from, to: rule.to, rule }).collect();
		let errors = self.convert(&para, &local);
		tracing::trace!(document = %self.id, paragraph = flat.0, errors = errors.len(), "check.single");
		self.write_guarded(generation, self.slots.single(), flat, Some(ends), errors);
		Ok(())
	}

	/// Reads and strips one paragraph.
	pub(crate) fn prepare(&self, flat: FlatParagraph) -> Result<Prepared> {
		let text = self.model.paragraph_text(flat)?;
		let locale = self.model.locale(flat)?;
		let adjustments = Adjustments::new(self.model.footnotes(flat)?, self.model.deleted_characters(flat)?);
		let stripped = adjustments.strip_text(&text);
		let len = stripped.chars().count();
		Ok(Prepared {
			flat,
			locale,
			adjustments,
			stripped,
			len,
		})
	}

	/// Turns clipped matches into host-coordinate errors, dropping disabled rules.
	pub(crate) fn convert(&self, para: &Prepared, matches: &[LocalMatch<'_>]) -> Vec<ProofError> {
		let disabled = self.ctx.shared.disabled_rules(para.locale.language());
		let mut errors: Vec<ProofError> = matches
			.iter()
			.filter(|m| !disabled.contains(&m.rule.rule_id))
			.map(|m| self.to_error(para, m))
			.collect();
		errors.sort_by_key(|e| (e.start, e.length));
		errors
	}

	fn to_error(&self, para: &Prepared, m: &LocalMatch<'_>) -> ProofError {
		let rule = m.rule;
		let (start, length) = para.adjustments.correct_span(m.from, m.to.saturating_sub(m.from));
		let mut suggestions = rule.suggestions.clone();
		if rule.kind == ErrorKind::Spelling {
			let word: String = para.stripped.chars().skip(m.from).take(m.to.saturating_sub(m.from)).collect();
			if suggestions.is_empty() {
				suggestions = self.ctx.shared.suggestions(&word).unwrap_or_default();
			} else {
				self.ctx.shared.cache_suggestions(&word, &suggestions);
			}
		}
		ProofError {
			start,
			length,
			kind: rule.kind,
			rule_id: rule.rule_id.clone(),
			short_message: rule.short_message.clone(),
			message: rule.message.clone(),
			suggestions,
			display: ErrorDisplay {
				url: rule.url.clone(),
				..ErrorDisplay::default()
			},
		}
	}

	/// Writes one entry unless the numbering moved on since `generation`.
	fn write_guarded(&self, generation: u64, cache: &ResultCache, flat: FlatParagraph, ends: Option<Vec<usize>>, errors: Vec<ProofError>) -> bool {
		let _guard = self.structure.read();
		if self.index.generation() != generation || self.is_disposed() {
			return false;
		}
		cache.put(flat, ends, errors);
		true
	}

	fn empty_guarded(&self, generation: u64, cache: &ResultCache, flat: FlatParagraph) {
		let _guard = self.structure.read();
		if self.index.generation() == generation && !self.is_disposed() {
			cache.put_empty(flat);
		}
	}

	fn enqueue_window(&self, map: &ParagraphMap, slot: SlotId, kind: SlotKind, flat: FlatParagraph) {
		let Some(queue) = &self.ctx.queue else {
			return;
		};
		let window = match map.logical_of(flat).and_then(|l| map.check_window(l, kind.window(), self.ctx.config.stream_only_windows)) {
			Ok(window) => window,
			Err(err) => {
				tracing::debug!(document = %self.id, paragraph = flat.0, error = %err, "check.enqueue_skipped");
				return;
			}
		};
		let high_priority = self.needs_repaint.lock().contains(&flat.0);
		queue.add_queue_entry(QueueEntry {
			start: window.start(),
			end: window.end(),
			slot,
			window: kind.window(),
			document: self.id,
			high_priority,
		});
	}

	fn enqueue_ai(&self, slot: SlotId, flat: FlatParagraph, high_priority: bool) {
		if let Some(queue) = &self.ctx.ai_queue {
			queue.add_queue_entry(QueueEntry {
				start: flat,
				end: FlatParagraph(flat.0 + 1),
				slot,
				window: 0,
				document: self.id,
				high_priority,
			});
		}
	}

	/// Queues every text-level window around `flat`.
	fn enqueue_all_windows(&self, flat: FlatParagraph) {
		let map = self.index.snapshot();
		for (slot, kind, _) in self.slots.text_level() {
			self.enqueue_window(&map, slot, kind, flat);
		}
	}

	fn check_window_now(&self, map: &ParagraphMap, slot: SlotId, kind: SlotKind, logical: LogicalParagraph, flat: FlatParagraph) {
		let outcome = map
			.check_window(logical, kind.window(), self.ctx.config.stream_only_windows)
			.map_err(Error::from)
			.and_then(|window| self.run_window(slot, &window, map.generation(), None, Some(flat)));
		if let Err(err) = outcome {
			tracing::warn!(document = %self.id, paragraph = flat.0, slot = %slot, error = %err, "check.window_failed");
		}
	}

	/// Runs a queued text-level entry. Called on the queue worker thread.
	pub fn run_queued(&self, entry: &QueueEntry, token: &GenerationToken) -> Result<EntryOutcome> {
		if !self.is_active() {
			return Ok(EntryOutcome {
				written: 0,
				interrupted: true,
			});
		}
		let stream_only = self.ctx.config.stream_only_windows;
		let map = self.current_index()?;
		let (map, window) = match map.window_for_range(entry.start, entry.end, stream_only) {
			Ok(window) => (map, window),
			Err(err) if err.needs_rebuild() => {
				let map = self.rebuild_index()?;
				match map.window_for_range(entry.start, entry.end, stream_only) {
					Ok(window) => (map, window),
					Err(err) => {
						if let Some(cache) = self.slots.cache(entry.slot)
							&& entry.start.0 < map.len()
						{
							self.empty_guarded(map.generation(), cache, entry.start);
						}
						return Err(err.into());
					}
				}
			}
			Err(err) => return Err(err.into()),
		};
		self.run_window(entry.slot, &window, map.generation(), Some(token), None)
	}

	/// Checks one text-level window and writes one entry per member paragraph.
	///
	/// `token` is polled between paragraphs; the results already written stay
	/// valid when it fires. `explicit` is repainted even if its errors did not
	/// change.
	fn run_window(
		&self,
		slot: SlotId,
		window: &ParagraphWindow,
		generation: u64,
		token: Option<&GenerationToken>,
		explicit: Option<FlatParagraph>,
	) -> Result<EntryOutcome> {
		let cache = self.slots.cache(slot).ok_or_else(|| Error::Config(format!("{slot} does not exist")))?;
		let cancelled = || token.is_some_and(GenerationToken::is_cancelled) || !self.is_active();
		let pre = cache.snapshot();

		let mut prepared = Vec::with_capacity(window.len());
		for &flat in window.paragraphs() {
			if cancelled() {
				return Ok(EntryOutcome {
					written: 0,
					interrupted: true,
				});
			}
			match self.prepare(flat) {
				Ok(para) => prepared.push(para),
				Err(err) => return Err(self.fail_window(generation, cache, window, err)),
			}
		}
		let Some(anchor) = prepared.iter().find(|p| p.flat == window.anchor()).or(prepared.first()) else {
			return Ok(EntryOutcome::default());
		};
		let engine = match self.ctx.engines.engine_for(&anchor.locale) {
			Ok(engine) => engine,
			Err(err) => return Err(self.fail_window(generation, cache, window, err)),
		};
		let (text, ranges) = concat(prepared.iter().map(|p| p.stripped.as_str()));
		let matches = match engine.check(&text, &ranges, RuleMode::TextLevel) {
			Ok(matches) => matches,
			Err(err) => return Err(self.fail_window(generation, cache, window, err)),
		};

		let mut outcome = EntryOutcome::default();
		let mut written = BTreeSet::new();
		for (para, local) in prepared.iter().zip(distribute(&matches, &ranges)) {
			if cancelled() {
				outcome.interrupted = true;
				break;
			}
			let errors = self.convert(para, &local);
			if !self.write_guarded(generation, cache, para.flat, None, errors) {
				outcome.interrupted = true;
				break;
			}
			written.insert(para.flat);
		}
		outcome.written = written.len();
		tracing::trace!(
			document = %self.id,
			slot = %slot,
			start = window.start().0,
			end = window.end().0,
			matches = matches.len(),
			written = outcome.written,
			"check.window"
		);
		self.finish_write(cache, &pre, written, explicit);
		Ok(outcome)
	}

	/// Writes empty entries for a window whose check failed.
	fn fail_window(&self, generation: u64, cache: &ResultCache, window: &ParagraphWindow, err: Error) -> Error {
		for &flat in window.paragraphs() {
			self.empty_guarded(generation, cache, flat);
		}
		err
	}

	/// Repaints the written paragraphs whose errors changed since `pre`, plus
	/// those already known to need it.
	///
	/// Paragraphs with a reset baseline are compared against the baseline
	/// instead, so errors that vanished across a reset are repainted too.
	pub(crate) fn finish_write(&self, cache: &ResultCache, pre: &CacheSnapshot, written: BTreeSet<FlatParagraph>, explicit: Option<FlatParagraph>) {
		if written.is_empty() {
			return;
		}
		let mut repaint: BTreeSet<FlatParagraph> = cache.difference(pre).into_iter().filter(|flat| written.contains(flat)).collect();
		if let Some(baseline) = self.slots.sentence_reset() {
			repaint.extend(written.iter().filter(|&&flat| baseline.contains(flat)));
		}
		{
			let mut marked = self.needs_repaint.lock();
			for flat in &written {
				if marked.remove(&flat.0) {
					repaint.insert(*flat);
				}
			}
		}
		repaint.extend(explicit.filter(|flat| written.contains(flat)));
		self.emit_repaint(repaint);
	}

	/// Sends the current display state of `paragraphs` to the repaint sink.
	///
	/// Paragraphs whose errors equal what was displayed before the last reset
	/// are skipped. Paragraphs with a reset baseline wait until every
	/// displayed slot has an entry for them.
	fn emit_repaint(&self, paragraphs: BTreeSet<FlatParagraph>) {
		if paragraphs.is_empty() || self.is_disposed() {
			return;
		}
		let baseline = self.slots.sentence_reset();
		let mut update = ParagraphUpdate::new();
		for flat in paragraphs {
			let errors = self.display_errors(flat, 0..usize::MAX, ErrorFilter::Both);
			if let Some(baseline) = baseline
				&& let Some(before) = baseline.get(flat)
			{
				if !self.slots.is_complete(flat) {
					continue;
				}
				baseline.remove(flat);
				if before.same_grammar_errors(&CacheEntry::new(None, errors.clone())) {
					continue;
				}
			}
			let ends = self.slots.single().get(flat).and_then(|e| e.sentence_ends().map(<[usize]>::to_vec));
			update.insert(flat, group_by_sentence(ends.as_deref(), errors));
		}
		if update.is_empty() {
			return;
		}
		tracing::debug!(document = %self.id, paragraphs = update.len(), "check.repaint");
		self.ctx.repaint.on_paragraphs_changed(self.id, update);
	}

	/// Displayed errors of `flat` in `range`, without ignored ones.
	fn display_errors(&self, flat: FlatParagraph, range: Range<usize>, filter: ErrorFilter) -> Vec<ProofError> {
		let mut errors = self.slots.errors(flat, range, filter);
		if let Some(ignored) = self.ignored.lock().get(&flat.0) {
			errors.retain(|e| !ignored.iter().any(|(start, rule)| *start == e.start && *rule == e.rule_id));
		}
		errors
	}

	fn serve(&self, flat: FlatParagraph, offset: usize, filter: ErrorFilter) -> CheckResult {
		let para_len = match self.slots.single().get(flat).and_then(|e| e.sentence_ends().and_then(|ends| ends.last().copied())) {
			Some(len) => len,
			None => self.model.paragraph_text(flat).map_or(0, |t| t.chars().count()),
		};
		let sentence = self.slots.single().sentence_bounds(flat, offset, para_len);
		// The host redraws what it is served, so a reset baseline is obsolete.
		if let Some(baseline) = self.slots.sentence_reset() {
			baseline.remove(flat);
		}
		CheckResult {
			paragraph: Some(flat),
			errors: self.display_errors(flat, sentence.clone(), filter),
			sentence,
		}
	}

	/// Copies the displayed errors into the reset baseline slot, if configured.
	fn stash_display(&self) {
		let Some(baseline) = self.slots.sentence_reset() else {
			return;
		};
		for flat in self.slots.displayed_paragraphs() {
			let errors = self.display_errors(flat, 0..usize::MAX, ErrorFilter::Both);
			baseline.put(flat, None, errors);
		}
	}

	/// Applies a structural change reported by the host: paragraphs
	/// `[edit.from, edit.to)` were replaced.
	///
	/// The index is renumbered first, then every cache slot is shifted by the
	/// same delta. Windows around the change are queued again.
	pub fn on_structural_change(&self, edit: ParagraphEdit) {
		if !self.is_active() {
			return;
		}
		for queue in self.queues() {
			queue.interrupt_check(self.id, true);
		}
		let shifted = {
			let _guard = self.structure.write();
			match self.index.shift(&edit, &HostParagraphs(self.model.as_ref())) {
				Ok(_) => {
					self.slots.remove_and_shift(&edit);
					shift_keys(&mut self.ignored.lock(), &edit);
					let mut marked = self.needs_repaint.lock();
					*marked = marked.iter().filter_map(|&k| edit.map(k)).collect();
					marked.extend(edit.new_range());
					true
				}
				Err(err) => {
					tracing::warn!(document = %self.id, from = edit.from, to = edit.to, error = %err, "check.shift_failed");
					false
				}
			}
		};
		if !shifted && let Err(err) = self.rebuild_index() {
			tracing::warn!(document = %self.id, error = %err, "check.rebuild_failed");
			return;
		}

		let len = self.index.snapshot().len();
		let mut affected: BTreeSet<usize> = edit.new_range().collect();
		if affected.is_empty() && edit.from < len {
			affected.insert(edit.from);
		}
		for flat in affected {
			self.enqueue_all_windows(FlatParagraph(flat));
		}
		tracing::debug!(document = %self.id, from = edit.from, to = edit.to, delta = edit.delta(), shifted, "check.structural_change");
	}

	/// The text of `flat` changed without changing the paragraph count.
	///
	/// Drops the paragraph's results and queues its windows ahead of other work.
	pub fn paragraph_changed(&self, flat: FlatParagraph) {
		if !self.is_active() {
			return;
		}
		if let Some(queue) = &self.ctx.queue {
			queue.interrupt_check(self.id, false);
		}
		self.ignored.lock().remove(&flat.0);
		self.slots.remove_displayed(flat);
		if let Some(baseline) = self.slots.sentence_reset() {
			baseline.remove(flat);
		}
		self.needs_repaint.lock().insert(flat.0);
		self.enqueue_all_windows(flat);
		if let Some((slot, _)) = self.slots.ai() {
			self.enqueue_ai(slot, flat, true);
		}
		tracing::trace!(document = %self.id, paragraph = flat.0, "check.paragraph_changed");
	}

	/// Hides one error occurrence until the paragraph changes.
	pub fn ignore_once(&self, flat: FlatParagraph, start: usize, rule_id: &str) {
		self.ignored.lock().entry(flat.0).or_default().push((start, rule_id.to_string()));
		self.slots.remove_error_at(flat, start, rule_id);
		self.emit_repaint(BTreeSet::from([flat]));
	}

	/// Strips a newly disabled rule from every slot and repaints the touched
	/// paragraphs. The rule itself is recorded in the shared state.
	pub fn remove_rule(&self, rule_id: &str) {
		let touched = self.slots.remove_rule_error(rule_id);
		tracing::debug!(document = %self.id, rule = rule_id, paragraphs = touched.len(), "check.remove_rule");
		self.emit_repaint(touched);
	}

	/// Discards all results; the host rechecks afterwards.
	///
	/// With a reset baseline slot the displayed errors are remembered, so the
	/// recheck only repaints paragraphs whose errors changed.
	pub fn reset(&self) {
		for queue in self.queues() {
			queue.interrupt_check(self.id, true);
		}
		let _guard = self.structure.write();
		self.stash_display();
		self.slots.clear_displayed();
		self.needs_repaint.lock().clear();
		tracing::debug!(document = %self.id, "check.reset");
	}

	/// Drops every result including the reset baseline, e.g. after a language
	/// change.
	pub fn discard(&self) {
		for queue in self.queues() {
			queue.interrupt_check(self.id, true);
		}
		let _guard = self.structure.write();
		self.slots.clear();
		self.ignored.lock().clear();
		self.needs_repaint.lock().clear();
		tracing::debug!(document = %self.id, "check.discard");
	}

	/// Stores the AI findings for one paragraph.
	pub(crate) fn store_ai(&self, generation: u64, cache: &ResultCache, para: &Prepared, matches: &[RuleMatch]) -> bool {
		let local: Vec<_> = matches.iter().map(|rule| LocalMatch { from: rule.from, to: rule.to, rule }).collect();
		let errors = self.convert(para, &local);
		self.write_guarded(generation, cache, para.flat, None, errors)
	}

	/// Index snapshot for background work, rebuilt if out of sync.
	pub(crate) fn snapshot_for_work(&self) -> Result<Arc<ParagraphMap>> {
		self.current_index()
	}

	pub(crate) fn write_empty(&self, generation: u64, cache: &ResultCache, flat: FlatParagraph) {
		self.empty_guarded(generation, cache, flat);
	}

	pub fn stats(&self) -> CheckerStats {
		let (cached_entries, cached_errors) = self.slots.counts();
		let map = self.index.snapshot();
		CheckerStats {
			paragraphs: map.len(),
			generation: map.generation(),
			cached_entries,
			cached_errors,
		}
	}
}

/// Moves the keys of a per-paragraph map through a structural edit.
fn shift_keys<V>(map: &mut BTreeMap<usize, V>, edit: &ParagraphEdit) {
	*map = std::mem::take(map).into_iter().filter_map(|(k, v)| edit.map(k).map(|k| (k, v))).collect();
}
