use std::ops::Range;

use thiserror::Error;

/// Invalid structural edit description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
	#[error("edit range is reversed: from {from} > to {to}")]
	Reversed { from: usize, to: usize },
	#[error("edit range {from}..{to} exceeds old paragraph count {old_len}")]
	OutOfBounds { from: usize, to: usize, old_len: usize },
	#[error("edit removes {removed} paragraphs but only {available} were replaced")]
	Underflow { removed: usize, available: usize },
}

/// A structural change reported by the host: the paragraphs `[from, to)` of the
/// old document were replaced, changing the paragraph count from `old_len` to
/// `new_len`.
///
/// Keys below `from` are untouched, keys at or above `to` move by
/// `new_len - old_len`, keys inside `[from, to)` are gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParagraphEdit {
	pub from: usize,
	pub to: usize,
	pub old_len: usize,
	pub new_len: usize,
}

impl ParagraphEdit {
	/// Creates a validated edit.
	pub fn new(from: usize, to: usize, old_len: usize, new_len: usize) -> Result<Self, EditError> {
		if from > to {
			return Err(EditError::Reversed { from, to });
		}
		if to > old_len {
			return Err(EditError::OutOfBounds { from, to, old_len });
		}
		let edit = Self { from, to, old_len, new_len };
		if old_len > new_len && old_len - new_len > to - from {
			return Err(EditError::Underflow {
				removed: old_len - new_len,
				available: to - from,
			});
		}
		Ok(edit)
	}

	/// Edit that only changes the content of one paragraph.
	pub const fn in_place(flat: usize, len: usize) -> Self {
		Self {
			from: flat,
			to: flat + 1,
			old_len: len,
			new_len: len,
		}
	}

	/// Signed change of the paragraph count.
	pub const fn delta(&self) -> isize {
		self.new_len as isize - self.old_len as isize
	}

	/// Returns true if the paragraph count does not change.
	pub const fn is_in_place(&self) -> bool {
		self.old_len == self.new_len
	}

	/// Maps a key of the old numbering into the new numbering.
	///
	/// Returns `None` for keys inside the replaced range.
	pub fn map(&self, key: usize) -> Option<usize> {
		if key < self.from {
			Some(key)
		} else if key >= self.to {
			key.checked_add_signed(self.delta())
		} else {
			None
		}
	}

	/// Paragraphs of the new numbering that replaced `[from, to)`.
	pub fn new_range(&self) -> Range<usize> {
		let end = self.to.saturating_add_signed(self.delta()).max(self.from);
		self.from..end
	}
}
