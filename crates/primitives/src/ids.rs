use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl DocumentId {
	/// Generates a new unique document ID.
	pub fn next() -> Self {
		Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
	}
}

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "doc#{}", self.0)
	}
}

/// Position of a paragraph in the document-wide paragraph sequence.
///
/// Only meaningful for the index generation it was obtained from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlatParagraph(pub usize);

impl FlatParagraph {
	pub const fn get(self) -> usize {
		self.0
	}
}

impl From<usize> for FlatParagraph {
	fn from(value: usize) -> Self {
		Self(value)
	}
}

impl From<FlatParagraph> for usize {
	fn from(value: FlatParagraph) -> Self {
		value.0
	}
}

impl fmt::Display for FlatParagraph {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "¶{}", self.0)
	}
}

/// Independent paragraph stream of a document. Streams do not share numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamKind {
	/// Body text.
	Text,
	/// Paragraphs inside table cells.
	Table,
	/// Text frames and drawing shapes.
	Shape,
	Footnote,
	Endnote,
	/// Page headers and footers.
	HeaderFooter,
	/// Spreadsheet cell comments.
	CellComment,
}

impl StreamKind {
	pub const ALL: [StreamKind; 7] = [
		Self::Text,
		Self::Table,
		Self::Shape,
		Self::Footnote,
		Self::Endnote,
		Self::HeaderFooter,
		Self::CellComment,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Table => "table",
			Self::Shape => "shape",
			Self::Footnote => "footnote",
			Self::Endnote => "endnote",
			Self::HeaderFooter => "header_footer",
			Self::CellComment => "cell_comment",
		}
	}
}

/// Stream-local paragraph reference: `(stream, local index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalParagraph {
	pub kind: StreamKind,
	pub local: usize,
}

impl LogicalParagraph {
	pub const fn new(kind: StreamKind, local: usize) -> Self {
		Self { kind, local }
	}

	/// Body-text paragraph with the given local index.
	pub const fn text(local: usize) -> Self {
		Self::new(StreamKind::Text, local)
	}
}

impl fmt::Display for LogicalParagraph {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.kind.as_str(), self.local)
	}
}
