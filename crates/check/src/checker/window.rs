//! Window text assembly and match distribution.

use std::ops::Range;

use galley_primitives::FlatParagraph;

use crate::engine::RuleMatch;
use crate::model::Locale;
use crate::spans::Adjustments;

/// Paragraph separator in the concatenated window text.
const SEPARATOR: char = '\n';

/// A paragraph read from the host and stripped for the engine.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
	pub flat: FlatParagraph,
	pub locale: Locale,
	pub adjustments: Adjustments,
	pub stripped: String,
	/// `char` length of `stripped`.
	pub len: usize,
}

/// Engine match clipped to one paragraph, in that paragraph's stripped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LocalMatch<'a> {
	pub from: usize,
	pub to: usize,
	pub rule: &'a RuleMatch,
}

/// Joins paragraph texts with a separator; returns the text and the `char`
/// range of every paragraph in it.
pub(crate) fn concat<'a>(texts: impl IntoIterator<Item = &'a str>) -> (String, Vec<Range<usize>>) {
	let mut text = String::new();
	let mut ranges = Vec::new();
	let mut offset = 0;
	for (i, part) in texts.into_iter().enumerate() {
		if i > 0 {
			text.push(SEPARATOR);
			offset += 1;
		}
		let len = part.chars().count();
		text.push_str(part);
		ranges.push(offset..offset + len);
		offset += len;
	}
	(text, ranges)
}

/// Assigns every match to the paragraphs its span intersects.
///
/// A match crossing a paragraph boundary is clipped into each paragraph it
/// touches. Empty matches belong to the paragraph containing their position.
pub(crate) fn distribute<'a>(matches: &'a [RuleMatch], ranges: &[Range<usize>]) -> Vec<Vec<LocalMatch<'a>>> {
	let mut out: Vec<Vec<LocalMatch<'a>>> = ranges.iter().map(|_| Vec::new()).collect();
	for rule in matches {
		let (from, to) = (rule.from, rule.to.max(rule.from));
		for (i, range) in ranges.iter().enumerate() {
			let hit = if from == to {
				range.start <= from && from <= range.end
			} else {
				from < range.end && to > range.start
			};
			if !hit {
				continue;
			}
			out[i].push(LocalMatch {
				from: from.max(range.start) - range.start,
				to: to.min(range.end) - range.start,
				rule,
			});
			if from == to {
				break;
			}
		}
	}
	out
}
