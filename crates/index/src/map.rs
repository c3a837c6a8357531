use std::ops::Range;

use galley_primitives::{FlatParagraph, LogicalParagraph, ParagraphEdit, StreamKind};
use rustc_hash::FxHashMap;

use crate::{IndexError, Result};

/// One immutable generation of the flat ⇄ logical paragraph mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphMap {
	generation: u64,
	/// Logical reference of every flat paragraph, in document order.
	flat: Vec<LogicalParagraph>,
	/// Flat paragraphs of each stream, indexed by local number.
	streams: FxHashMap<StreamKind, Vec<usize>>,
}

impl ParagraphMap {
	/// Builds a map from the stream kind of every flat paragraph.
	///
	/// Local numbers are derived from document order within each stream.
	pub fn from_kinds<I>(generation: u64, kinds: I) -> Self
	where
		I: IntoIterator<Item = StreamKind>,
	{
		let mut streams: FxHashMap<StreamKind, Vec<usize>> = FxHashMap::default();
		let flat = kinds
			.into_iter()
			.enumerate()
			.map(|(flat, kind)| {
				let members = streams.entry(kind).or_default();
				members.push(flat);
				LogicalParagraph::new(kind, members.len() - 1)
			})
			.collect();
		Self { generation, flat, streams }
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Number of flat paragraphs.
	pub fn len(&self) -> usize {
		self.flat.len()
	}

	pub fn is_empty(&self) -> bool {
		self.flat.is_empty()
	}

	/// Number of paragraphs in one stream.
	pub fn stream_len(&self, kind: StreamKind) -> usize {
		self.streams.get(&kind).map_or(0, Vec::len)
	}

	/// Converts a logical reference into its flat paragraph.
	pub fn flat_of(&self, logical: LogicalParagraph) -> Result<FlatParagraph> {
		self.streams
			.get(&logical.kind)
			.and_then(|members| members.get(logical.local))
			.map(|&flat| FlatParagraph(flat))
			.ok_or(IndexError::LogicalOutOfBounds(logical))
	}

	/// Converts a flat paragraph into its logical reference.
	pub fn logical_of(&self, flat: FlatParagraph) -> Result<LogicalParagraph> {
		self.flat.get(flat.0).copied().ok_or(IndexError::FlatOutOfBounds {
			flat: flat.0,
			len: self.flat.len(),
		})
	}

	/// Stream kinds of all flat paragraphs in document order.
	pub fn kinds(&self) -> impl Iterator<Item = StreamKind> + '_ {
		self.flat.iter().map(|l| l.kind)
	}

	/// Paragraph range a text-level rule must see for `anchor`.
	///
	/// * `window < 0`: the whole stream (or document).
	/// * `window == 0`: the anchor alone.
	/// * `window > 0`: `window` paragraphs before and after the anchor, clipped.
	///
	/// With `stream_only` the window is counted in the anchor's stream and only
	/// contains members of that stream; otherwise it is counted in flat
	/// numbering and clipped to the document.
	pub fn check_window(&self, anchor: LogicalParagraph, window: i32, stream_only: bool) -> Result<ParagraphWindow> {
		let anchor_flat = self.flat_of(anchor)?;
		if stream_only {
			let members = &self.streams[&anchor.kind];
			let local = clip(anchor.local, window, members.len());
			let paragraphs = members[local].iter().map(|&f| FlatParagraph(f)).collect();
			Ok(ParagraphWindow::new(anchor_flat, Some(anchor.kind), paragraphs))
		} else {
			let range = clip(anchor_flat.0, window, self.flat.len());
			Ok(ParagraphWindow::new(anchor_flat, None, range.map(FlatParagraph).collect()))
		}
	}

	/// Reconstructs the window covering the flat range `[start, end)`.
	///
	/// Used by the background worker, whose queue entries only carry the flat
	/// bounds. With `stream_only`, membership follows the stream of `start`.
	pub fn window_for_range(&self, start: FlatParagraph, end: FlatParagraph, stream_only: bool) -> Result<ParagraphWindow> {
		if end.0 > self.flat.len() {
			return Err(IndexError::FlatOutOfBounds {
				flat: end.0.saturating_sub(1),
				len: self.flat.len(),
			});
		}
		let first = self.logical_of(start)?;
		let paragraphs = (start.0..end.0)
			.filter(|&f| !stream_only || self.flat[f].kind == first.kind)
			.map(FlatParagraph)
			.collect();
		Ok(ParagraphWindow::new(start, stream_only.then_some(first.kind), paragraphs))
	}

	/// Produces the next generation after `edit`, reading the stream kinds of
	/// the replaced paragraphs from `kind_of`.
	pub(crate) fn shifted(&self, generation: u64, edit: &ParagraphEdit, mut kind_of: impl FnMut(usize) -> Option<StreamKind>) -> Result<Self> {
		if self.flat.len() != edit.old_len {
			return Err(IndexError::OutOfSync {
				indexed: self.flat.len(),
				actual: edit.old_len,
			});
		}
		let mut kinds = Vec::with_capacity(edit.new_len);
		kinds.extend(self.flat[..edit.from].iter().map(|l| l.kind));
		for flat in edit.new_range() {
			kinds.push(kind_of(flat).ok_or(IndexError::UnknownParagraph(flat))?);
		}
		kinds.extend(self.flat[edit.to..].iter().map(|l| l.kind));
		if kinds.len() != edit.new_len {
			return Err(IndexError::OutOfSync {
				indexed: kinds.len(),
				actual: edit.new_len,
			});
		}
		Ok(Self::from_kinds(generation, kinds))
	}
}

/// Window around `anchor` in a sequence of `len` items.
fn clip(anchor: usize, window: i32, len: usize) -> Range<usize> {
	match window {
		w if w < 0 => 0..len,
		0 => anchor..anchor + 1,
		w => {
			let w = w as usize;
			anchor.saturating_sub(w)..anchor.saturating_add(w).saturating_add(1).min(len)
		}
	}
}

/// Paragraphs a text-level check covers for one anchor paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphWindow {
	anchor: FlatParagraph,
	stream: Option<StreamKind>,
	paragraphs: Vec<FlatParagraph>,
}

impl ParagraphWindow {
	fn new(anchor: FlatParagraph, stream: Option<StreamKind>, paragraphs: Vec<FlatParagraph>) -> Self {
		Self { anchor, stream, paragraphs }
	}

	pub fn anchor(&self) -> FlatParagraph {
		self.anchor
	}

	/// Stream the window is restricted to, if any.
	pub fn stream(&self) -> Option<StreamKind> {
		self.stream
	}

	/// First flat paragraph of the window.
	pub fn start(&self) -> FlatParagraph {
		self.paragraphs.first().copied().unwrap_or(self.anchor)
	}

	/// One past the last flat paragraph of the window.
	pub fn end(&self) -> FlatParagraph {
		self.paragraphs.last().map_or(self.anchor, |p| FlatParagraph(p.0 + 1))
	}

	/// Flat range `[start, end)` covering the window.
	pub fn flat_range(&self) -> Range<usize> {
		self.start().0..self.end().0
	}

	/// Member paragraphs in document order.
	pub fn paragraphs(&self) -> &[FlatParagraph] {
		&self.paragraphs
	}

	pub fn contains(&self, flat: FlatParagraph) -> bool {
		self.paragraphs.binary_search(&flat).is_ok()
	}

	pub fn len(&self) -> usize {
		self.paragraphs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.paragraphs.is_empty()
	}
}
