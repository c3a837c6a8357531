use std::ops::Range;

use galley_primitives::{ErrorFilter, ProofError};

/// Cached check result of one paragraph for one rule class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheEntry {
	/// End offsets of the paragraph's sentences, ascending. The last one is the
	/// paragraph length.
	sentence_ends: Option<Vec<usize>>,
	errors: Vec<ProofError>,
}

impl CacheEntry {
	pub fn new(sentence_ends: Option<Vec<usize>>, errors: Vec<ProofError>) -> Self {
		Self { sentence_ends, errors }
	}

	pub fn errors(&self) -> &[ProofError] {
		&self.errors
	}

	pub fn sentence_ends(&self) -> Option<&[usize]> {
		self.sentence_ends.as_deref()
	}

	pub(crate) fn errors_mut(&mut self) -> &mut Vec<ProofError> {
		&mut self.errors
	}

	/// Errors starting in `[start, end)` that pass `filter`.
	pub fn errors_in(&self, range: Range<usize>, filter: ErrorFilter) -> Vec<ProofError> {
		self.errors
			.iter()
			.filter(|e| range.contains(&e.start) && filter.accepts(e.kind))
			.cloned()
			.collect()
	}

	/// Start of the sentence containing `offset`.
	pub fn sentence_start(&self, offset: usize) -> usize {
		let Some(ends) = self.sentence_ends.as_deref() else {
			return 0;
		};
		let idx = ends.partition_point(|&end| end <= offset);
		if idx == 0 { 0 } else { ends[idx - 1] }
	}

	/// End of the sentence containing `offset`, if sentence boundaries are known.
	pub fn next_sentence_position(&self, offset: usize) -> Option<usize> {
		let ends = self.sentence_ends.as_deref()?;
		let idx = ends.partition_point(|&end| end <= offset);
		ends.get(idx).or_else(|| ends.last()).copied()
	}

	/// Grammar-relevant equality: same number of non-spelling errors, each at the
	/// same span with the same rule.
	pub fn same_grammar_errors(&self, other: &CacheEntry) -> bool {
		same_grammar_errors(&self.errors, &other.errors)
	}
}

pub(crate) fn same_grammar_errors(a: &[ProofError], b: &[ProofError]) -> bool {
	let mut a = a.iter().filter(|e| !e.is_spelling());
	let mut b = b.iter().filter(|e| !e.is_spelling());
	loop {
		match (a.next(), b.next()) {
			(None, None) => return true,
			(Some(x), Some(y)) if x.same_place(y) => continue,
			_ => return false,
		}
	}
}
