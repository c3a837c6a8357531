//! Conversion between host paragraph text and the text the engine sees.
//!
//! Footnote anchors and characters of tracked deletions are stripped before a
//! paragraph is checked. [`Adjustments::correct_span`] maps an error span of
//! the stripped text back onto the host text, [`Adjustments::strip_span`] is
//! its left inverse.

use std::iter::Peekable;
use std::slice;

/// Removed `char` offsets of one paragraph, in host coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjustments {
	footnotes: Vec<usize>,
	deletions: Vec<usize>,
}

impl Adjustments {
	/// Sorts and deduplicates both position lists.
	pub fn new(mut footnotes: Vec<usize>, mut deletions: Vec<usize>) -> Self {
		footnotes.sort_unstable();
		footnotes.dedup();
		deletions.sort_unstable();
		deletions.dedup();
		Self { footnotes, deletions }
	}

	pub fn is_empty(&self) -> bool {
		self.footnotes.is_empty() && self.deletions.is_empty()
	}

	/// All removed positions, ascending and without duplicates.
	pub fn removed(&self) -> impl Iterator<Item = usize> + '_ {
		Merged {
			a: self.footnotes.iter().peekable(),
			b: self.deletions.iter().peekable(),
		}
	}

	/// Host text with the removed characters dropped.
	pub fn strip_text(&self, text: &str) -> String {
		if self.is_empty() {
			return text.to_string();
		}
		let mut removed = self.removed().peekable();
		text.chars()
			.enumerate()
			.filter(|&(i, _)| {
				while removed.next_if(|&p| p < i).is_some() {}
				removed.next_if_eq(&i).is_none()
			})
			.map(|(_, c)| c)
			.collect()
	}

	/// Maps a span of the stripped text onto the host text.
	///
	/// A removed position at or before the start pushes the span right; one
	/// strictly inside it widens the span.
	pub fn correct_span(&self, start: usize, length: usize) -> (usize, usize) {
		let (mut start, mut length) = (start, length);
		for p in self.removed() {
			if p <= start {
				start += 1;
			} else if p < start + length {
				length += 1;
			} else {
				break;
			}
		}
		(start, length)
	}

	/// Maps a span of the host text onto the stripped text.
	pub fn strip_span(&self, start: usize, length: usize) -> (usize, usize) {
		let end = start + length;
		let (mut before_start, mut before_end) = (0, 0);
		for p in self.removed() {
			if p >= end {
				break;
			}
			before_end += 1;
			if p < start {
				before_start += 1;
			}
		}
		let start = start - before_start;
		(start, end - before_end - start)
	}

	/// Maps a position of the stripped text onto the host text.
	pub fn correct_offset(&self, offset: usize) -> usize {
		self.correct_span(offset, 0).0
	}
}

/// Ascending merge of two sorted position lists.
struct Merged<'a> {
	a: Peekable<slice::Iter<'a, usize>>,
	b: Peekable<slice::Iter<'a, usize>>,
}

impl Iterator for Merged<'_> {
	type Item = usize;

	fn next(&mut self) -> Option<usize> {
		let next = match (self.a.peek(), self.b.peek()) {
			(Some(&&a), Some(&&b)) if a <= b => {
				self.a.next();
				if a == b {
					self.b.next();
				}
				a
			}
			(_, Some(&&b)) => {
				self.b.next();
				b
			}
			(Some(&&a), None) => {
				self.a.next();
				a
			}
			(None, None) => return None,
		};
		Some(next)
	}
}

#[cfg(test)]
mod tests;
