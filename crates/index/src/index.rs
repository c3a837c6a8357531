use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use galley_primitives::{FlatParagraph, LogicalParagraph, ParagraphEdit, StreamKind};

use crate::{IndexError, ParagraphMap, Result};

/// Host view used to (re)build the index.
pub trait ParagraphSource {
	/// Current number of flat paragraphs.
	fn paragraph_count(&self) -> usize;

	/// Stream of a flat paragraph, or `None` if the host cannot tell.
	fn stream_of(&self, flat: usize) -> Option<StreamKind>;
}

/// Published paragraph numbering of one document.
///
/// Readers take an [`Arc<ParagraphMap>`] snapshot; writers publish a fresh
/// generation with compare-and-swap.
#[derive(Debug)]
pub struct ParagraphIndex {
	snap: ArcSwap<ParagraphMap>,
	next_generation: AtomicU64,
}

impl Default for ParagraphIndex {
	fn default() -> Self {
		Self::new()
	}
}

impl ParagraphIndex {
	/// Creates an empty index at generation 0.
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(ParagraphMap::default()),
			next_generation: AtomicU64::new(1),
		}
	}

	/// Creates an index built from `source`.
	pub fn from_source(source: &(impl ParagraphSource + ?Sized)) -> Result<Self> {
		let index = Self::new();
		index.rebuild(source)?;
		Ok(index)
	}

	/// Current generation snapshot.
	#[inline]
	pub fn snapshot(&self) -> Arc<ParagraphMap> {
		self.snap.load_full()
	}

	pub fn generation(&self) -> u64 {
		self.snap.load().generation()
	}

	/// Looks up a flat paragraph, failing if `generation` is not current.
	pub fn flat_of(&self, generation: u64, logical: LogicalParagraph) -> Result<FlatParagraph> {
		self.checked(generation)?.flat_of(logical)
	}

	/// Looks up a logical paragraph, failing if `generation` is not current.
	pub fn logical_of(&self, generation: u64, flat: FlatParagraph) -> Result<LogicalParagraph> {
		self.checked(generation)?.logical_of(flat)
	}

	fn checked(&self, generation: u64) -> Result<Arc<ParagraphMap>> {
		let snap = self.snapshot();
		if snap.generation() != generation {
			return Err(IndexError::Stale {
				expected: generation,
				actual: snap.generation(),
			});
		}
		Ok(snap)
	}

	/// Returns `Ok` if the published map still matches the host's paragraph count.
	pub fn ensure_current(&self, source: &(impl ParagraphSource + ?Sized)) -> Result<Arc<ParagraphMap>> {
		let snap = self.snapshot();
		let actual = source.paragraph_count();
		if snap.len() != actual {
			return Err(IndexError::OutOfSync { indexed: snap.len(), actual });
		}
		Ok(snap)
	}

	/// Rebuilds the whole mapping from the host and publishes it.
	pub fn rebuild(&self, source: &(impl ParagraphSource + ?Sized)) -> Result<Arc<ParagraphMap>> {
		let count = source.paragraph_count();
		let kinds = (0..count)
			.map(|flat| source.stream_of(flat).ok_or(IndexError::UnknownParagraph(flat)))
			.collect::<Result<Vec<_>>>()?;
		let next = Arc::new(ParagraphMap::from_kinds(self.bump(), kinds));
		self.snap.store(Arc::clone(&next));
		tracing::debug!(generation = next.generation(), paragraphs = count, "index.rebuild");
		Ok(next)
	}

	/// Renumbers after a structural edit.
	///
	/// Must run before the matching cache shift so both apply the same delta.
	/// Paragraphs in the replaced range are re-read from `source`.
	pub fn shift(&self, edit: &ParagraphEdit, source: &(impl ParagraphSource + ?Sized)) -> Result<Arc<ParagraphMap>> {
		loop {
			let cur = self.snapshot();
			let next = Arc::new(cur.shifted(self.bump(), edit, |flat| source.stream_of(flat))?);
			let prev = self.snap.compare_and_swap(&cur, Arc::clone(&next));
			if Arc::ptr_eq(&prev, &cur) {
				tracing::debug!(
					generation = next.generation(),
					from = edit.from,
					to = edit.to,
					delta = edit.delta(),
					"index.shift"
				);
				return Ok(next);
			}
		}
	}

	fn bump(&self) -> u64 {
		self.next_generation.fetch_add(1, Ordering::AcqRel)
	}
}

#[cfg(test)]
mod tests;
