//! Rule-class cache slots of one document.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use galley_cache::ResultCache;
use galley_primitives::{ErrorFilter, FlatParagraph, ParagraphEdit, ProofError};

use crate::CheckConfig;

/// Index of a cache slot in a [`CacheSlots`] layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl SlotId {
	/// The single-paragraph slot is always first.
	pub const SINGLE: SlotId = SlotId(0);
}

impl fmt::Display for SlotId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "slot#{}", self.0)
	}
}

/// Rule class whose results a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
	SingleParagraph,
	/// Text-level rules seeing this many paragraphs on either side.
	Window(i32),
	WholeDocument,
	/// Findings of the AI backend.
	Ai,
	/// Errors displayed before the last full reset. Never served.
	SentenceReset,
}

impl SlotKind {
	/// Window size passed to the paragraph index.
	pub const fn window(self) -> i32 {
		match self {
			Self::Window(n) => n,
			Self::WholeDocument => -1,
			Self::SingleParagraph | Self::Ai | Self::SentenceReset => 0,
		}
	}

	pub const fn is_text_level(self) -> bool {
		matches!(self, Self::Window(_) | Self::WholeDocument)
	}

	/// Whether errors of this slot are shown to the user.
	pub const fn is_displayed(self) -> bool {
		!matches!(self, Self::SentenceReset)
	}
}

/// The result caches of one document, one per configured rule class.
#[derive(Debug)]
pub struct CacheSlots {
	kinds: Vec<SlotKind>,
	caches: Vec<ResultCache>,
}

impl CacheSlots {
	/// Slot layout for `config`: single paragraph first, then the text-level
	/// windows in configured order, the whole document, AI, and reset slots.
	pub fn from_config(config: &CheckConfig) -> Self {
		let mut kinds = vec![SlotKind::SingleParagraph];
		kinds.extend(config.text_level_windows.iter().map(|&n| SlotKind::Window(n)));
		if config.whole_document_slot {
			kinds.push(SlotKind::WholeDocument);
		}
		if config.ai.enabled {
			kinds.push(SlotKind::Ai);
		}
		if config.sentence_reset_slot {
			kinds.push(SlotKind::SentenceReset);
		}
		Self::new(kinds)
	}

	fn new(kinds: Vec<SlotKind>) -> Self {
		let caches = kinds.iter().map(|_| ResultCache::new()).collect();
		Self { kinds, caches }
	}

	pub fn len(&self) -> usize {
		self.kinds.len()
	}

	pub fn is_empty(&self) -> bool {
		self.kinds.is_empty()
	}

	pub fn kind(&self, slot: SlotId) -> Option<SlotKind> {
		self.kinds.get(slot.0).copied()
	}

	pub fn cache(&self, slot: SlotId) -> Option<&ResultCache> {
		self.caches.get(slot.0)
	}

	pub fn single(&self) -> &ResultCache {
		&self.caches[SlotId::SINGLE.0]
	}

	pub fn slot_of(&self, kind: SlotKind) -> Option<SlotId> {
		self.kinds.iter().position(|&k| k == kind).map(SlotId)
	}

	/// All slots with their kind and cache.
	pub fn iter(&self) -> impl Iterator<Item = (SlotId, SlotKind, &ResultCache)> {
		self.kinds.iter().zip(&self.caches).enumerate().map(|(i, (&kind, cache))| (SlotId(i), kind, cache))
	}

	/// Text-level slots in layout order.
	pub fn text_level(&self) -> impl Iterator<Item = (SlotId, SlotKind, &ResultCache)> {
		self.iter().filter(|(_, kind, _)| kind.is_text_level())
	}

	pub fn ai(&self) -> Option<(SlotId, &ResultCache)> {
		self.iter().find(|(_, kind, _)| *kind == SlotKind::Ai).map(|(id, _, cache)| (id, cache))
	}

	pub fn sentence_reset(&self) -> Option<&ResultCache> {
		self.iter().find(|(_, kind, _)| *kind == SlotKind::SentenceReset).map(|(_, _, cache)| cache)
	}

	fn displayed(&self) -> impl Iterator<Item = &ResultCache> {
		self.iter().filter(|(_, kind, _)| kind.is_displayed()).map(|(_, _, cache)| cache)
	}

	/// Union of the displayed errors of `flat` starting in `range`, ordered by
	/// start offset. Errors found by several slots at the same place are kept
	/// once.
	pub fn errors(&self, flat: FlatParagraph, range: Range<usize>, filter: ErrorFilter) -> Vec<ProofError> {
		let mut errors: Vec<ProofError> = Vec::new();
		for cache in self.displayed() {
			for error in cache.get_from_para(flat, range.start, range.end, filter).unwrap_or_default() {
				if !errors.iter().any(|e| e.same_place(&error)) {
					errors.push(error);
				}
			}
		}
		errors.sort_by_key(|e| (e.start, e.length));
		errors
	}

	/// Whether any displayed slot has an entry for `flat`.
	pub fn has_entry(&self, flat: FlatParagraph) -> bool {
		self.displayed().any(|cache| cache.contains(flat))
	}

	/// Whether every displayed slot has an entry for `flat`.
	pub fn is_complete(&self, flat: FlatParagraph) -> bool {
		self.displayed().all(|cache| cache.contains(flat))
	}

	/// Applies a structural edit to every slot.
	pub fn remove_and_shift(&self, edit: &ParagraphEdit) {
		for cache in &self.caches {
			cache.remove_and_shift(edit);
		}
	}

	pub fn clear(&self) {
		for cache in &self.caches {
			cache.clear();
		}
	}

	/// Clears every displayed slot, leaving the reset baseline alone.
	pub fn clear_displayed(&self) {
		for (_, kind, cache) in self.iter() {
			if kind.is_displayed() {
				cache.clear();
			}
		}
	}

	/// Paragraphs with an entry in any displayed slot.
	pub fn displayed_paragraphs(&self) -> BTreeSet<FlatParagraph> {
		self.displayed().flat_map(|cache| cache.snapshot().keys().collect::<Vec<_>>()).collect()
	}

	/// Drops the entries of `flat` from every displayed slot.
	pub fn remove_displayed(&self, flat: FlatParagraph) {
		for cache in self.displayed() {
			cache.remove(flat);
		}
	}

	/// Strips `rule_id` from every slot; returns the touched paragraphs.
	pub fn remove_rule_error(&self, rule_id: &str) -> BTreeSet<FlatParagraph> {
		self.caches.iter().flat_map(|cache| cache.remove_rule_error(rule_id)).collect()
	}

	/// Drops the error of `rule_id` at `start` of `flat` from every slot.
	pub fn remove_error_at(&self, flat: FlatParagraph, start: usize, rule_id: &str) -> bool {
		let mut removed = false;
		for cache in &self.caches {
			removed |= cache.retain_errors(flat, |e| !(e.start == start && e.rule_id == rule_id));
		}
		removed
	}

	/// Total cached entries and errors across the displayed slots.
	pub fn counts(&self) -> (usize, usize) {
		self.displayed().fold((0, 0), |(entries, errors), cache| (entries + cache.len(), errors + cache.error_count()))
	}
}
