use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

use galley_primitives::{ErrorFilter, FlatParagraph, ParagraphEdit, ProofError};
use parking_lot::RwLock;

use crate::CacheEntry;
use crate::entry::same_grammar_errors;

type EntryMap = BTreeMap<usize, Arc<CacheEntry>>;

/// Thread-safe result store of one rule class, keyed by flat paragraph.
///
/// Mutations take the write lock, reads the read lock. No method calls another
/// locking method while holding the lock.
#[derive(Debug, Default)]
pub struct ResultCache {
	entries: RwLock<EntryMap>,
}

/// Point-in-time copy of a [`ResultCache`]. Entries are shared, not cloned.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
	entries: EntryMap,
}

impl CacheSnapshot {
	pub fn get(&self, flat: FlatParagraph) -> Option<&CacheEntry> {
		self.entries.get(&flat.0).map(Arc::as_ref)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = FlatParagraph> + '_ {
		self.entries.keys().map(|&k| FlatParagraph(k))
	}
}

impl ResultCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replaces the entry of `flat`.
	pub fn put(&self, flat: FlatParagraph, sentence_ends: Option<Vec<usize>>, errors: Vec<ProofError>) {
		let entry = Arc::new(CacheEntry::new(sentence_ends, errors));
		self.entries.write().insert(flat.0, entry);
	}

	/// Writes an empty result for `flat`, keeping known sentence boundaries.
	pub fn put_empty(&self, flat: FlatParagraph) {
		let mut entries = self.entries.write();
		let ends = entries.get(&flat.0).and_then(|e| e.sentence_ends().map(<[usize]>::to_vec));
		entries.insert(flat.0, Arc::new(CacheEntry::new(ends, Vec::new())));
	}

	/// Appends errors to an existing entry.
	///
	/// Returns `false` and does nothing if `flat` has no entry yet.
	pub fn add(&self, flat: FlatParagraph, errors: impl IntoIterator<Item = ProofError>) -> bool {
		let mut entries = self.entries.write();
		let Some(entry) = entries.get_mut(&flat.0) else {
			return false;
		};
		Arc::make_mut(entry).errors_mut().extend(errors);
		true
	}

	pub fn remove(&self, flat: FlatParagraph) -> bool {
		self.entries.write().remove(&flat.0).is_some()
	}

	/// Drops all entries with keys in `range`.
	pub fn remove_range(&self, range: Range<usize>) {
		if range.is_empty() {
			return;
		}
		let mut entries = self.entries.write();
		let mut tail = entries.split_off(&range.start);
		let mut rest = tail.split_off(&range.end);
		entries.append(&mut rest);
	}

	/// Applies a structural edit in one step: keys below `edit.from` stay, keys
	/// at or above `edit.to` move by the edit delta, keys in between are dropped.
	pub fn remove_and_shift(&self, edit: &ParagraphEdit) {
		let mut entries = self.entries.write();
		if edit.delta() == 0 {
			let mut tail = entries.split_off(&edit.from);
			let mut rest = tail.split_off(&edit.to);
			entries.append(&mut rest);
			return;
		}
		let old = std::mem::take(&mut *entries);
		*entries = old.into_iter().filter_map(|(key, entry)| edit.map(key).map(|k| (k, entry))).collect();
		tracing::trace!(from = edit.from, to = edit.to, delta = edit.delta(), kept = entries.len(), "cache.shift");
	}

	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Entry of `flat`, shared immutably.
	pub fn get(&self, flat: FlatParagraph) -> Option<Arc<CacheEntry>> {
		self.entries.read().get(&flat.0).cloned()
	}

	pub fn contains(&self, flat: FlatParagraph) -> bool {
		self.entries.read().contains_key(&flat.0)
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Total number of cached errors.
	pub fn error_count(&self) -> usize {
		self.entries.read().values().map(|e| e.errors().len()).sum()
	}

	/// Errors of `flat` starting in `[start, end)` that pass `filter`.
	///
	/// `None` if the paragraph has no entry.
	pub fn get_from_para(&self, flat: FlatParagraph, start: usize, end: usize, filter: ErrorFilter) -> Option<Vec<ProofError>> {
		self.entries.read().get(&flat.0).map(|e| e.errors_in(start..end, filter))
	}

	/// Start of the sentence around `offset`; `0` if boundaries are unknown.
	pub fn sentence_start(&self, flat: FlatParagraph, offset: usize) -> usize {
		self.entries.read().get(&flat.0).map_or(0, |e| e.sentence_start(offset))
	}

	/// End of the sentence around `offset`; `None` if boundaries are unknown,
	/// meaning the sentence runs to the end of the paragraph.
	pub fn next_sentence_position(&self, flat: FlatParagraph, offset: usize) -> Option<usize> {
		self.entries.read().get(&flat.0).and_then(|e| e.next_sentence_position(offset))
	}

	/// Bounds of the sentence around `offset` in a paragraph of `para_len` chars.
	pub fn sentence_bounds(&self, flat: FlatParagraph, offset: usize, para_len: usize) -> Range<usize> {
		let entries = self.entries.read();
		let Some(entry) = entries.get(&flat.0) else {
			return 0..para_len;
		};
		let start = entry.sentence_start(offset).min(para_len);
		let end = entry.next_sentence_position(offset).unwrap_or(para_len).clamp(start, para_len);
		start..end
	}

	pub fn snapshot(&self) -> CacheSnapshot {
		CacheSnapshot {
			entries: self.entries.read().clone(),
		}
	}

	/// Paragraphs whose grammar-relevant errors differ from `old`.
	///
	/// Spelling errors are ignored. A paragraph missing on one side counts as
	/// having no errors there.
	pub fn difference(&self, old: &CacheSnapshot) -> Vec<FlatParagraph> {
		let entries = self.entries.read();
		let mut changed: Vec<usize> = entries
			.iter()
			.filter(|&(key, entry)| {
				let before = old.entries.get(key).map_or(&[][..], |e| e.errors());
				!same_grammar_errors(entry.errors(), before)
			})
			.map(|(&key, _)| key)
			.collect();
		changed.extend(
			old.entries
				.iter()
				.filter(|&(key, entry)| !entries.contains_key(key) && !same_grammar_errors(entry.errors(), &[]))
				.map(|(&key, _)| key),
		);
		changed.sort_unstable();
		changed.into_iter().map(FlatParagraph).collect()
	}

	/// Keeps only the errors of `flat` matching `keep`.
	///
	/// Returns true if an error was removed.
	pub fn retain_errors(&self, flat: FlatParagraph, mut keep: impl FnMut(&ProofError) -> bool) -> bool {
		let mut entries = self.entries.write();
		let Some(entry) = entries.get_mut(&flat.0) else {
			return false;
		};
		if entry.errors().iter().all(&mut keep) {
			return false;
		}
		Arc::make_mut(entry).errors_mut().retain(|e| keep(e));
		true
	}

	/// Removes every error of `rule_id` and returns the touched paragraphs.
	pub fn remove_rule_error(&self, rule_id: &str) -> Vec<FlatParagraph> {
		let mut entries = self.entries.write();
		let mut touched = Vec::new();
		for (&key, entry) in entries.iter_mut() {
			if !entry.errors().iter().any(|e| e.rule_id == rule_id) {
				continue;
			}
			Arc::make_mut(entry).errors_mut().retain(|e| e.rule_id != rule_id);
			touched.push(FlatParagraph(key));
		}
		touched
	}
}
