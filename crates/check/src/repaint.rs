//! Repaint notifications to the host.

use std::collections::BTreeMap;
use std::ops::Range;

use galley_primitives::{DocumentId, FlatParagraph, ProofError};

/// The errors of one sentence of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceErrors {
	pub range: Range<usize>,
	pub errors: Vec<ProofError>,
}

/// New display state of every changed paragraph.
pub type ParagraphUpdate = BTreeMap<FlatParagraph, Vec<SentenceErrors>>;

/// Receives the paragraphs whose displayed errors must be redrawn.
///
/// Called from the foreground and from queue worker threads; implementations
/// hand the update over to the host's UI thread.
pub trait RepaintSink: Send + Sync {
	fn on_paragraphs_changed(&self, document: DocumentId, changes: ParagraphUpdate);
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRepaint;

impl RepaintSink for NoRepaint {
	fn on_paragraphs_changed(&self, _: DocumentId, _: ParagraphUpdate) {}
}

/// Splits `errors` by the sentence their start falls in.
///
/// Without known sentence ends the paragraph is one sentence. Sentences
/// without errors are omitted.
pub fn group_by_sentence(sentence_ends: Option<&[usize]>, errors: Vec<ProofError>) -> Vec<SentenceErrors> {
	let mut groups: Vec<SentenceErrors> = Vec::new();
	for error in errors {
		let range = sentence_range(sentence_ends, error.start);
		match groups.last_mut() {
			Some(group) if group.range == range => group.errors.push(error),
			_ => groups.push(SentenceErrors { range, errors: vec![error] }),
		}
	}
	groups
}

fn sentence_range(ends: Option<&[usize]>, offset: usize) -> Range<usize> {
	let Some(ends) = ends.filter(|e| !e.is_empty()) else {
		return 0..usize::MAX;
	};
	let idx = ends.partition_point(|&end| end <= offset);
	let start = if idx == 0 { 0 } else { ends[idx - 1] };
	let end = ends.get(idx).copied().unwrap_or(usize::MAX);
	start..end
}
