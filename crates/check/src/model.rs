//! Host document interface.

use std::fmt;

use galley_index::ParagraphSource;
use galley_primitives::{FlatParagraph, LogicalParagraph, StreamKind};

use crate::Result;

/// BCP 47 style language tag, e.g. `de-CH` or `en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale(String);

impl Locale {
	pub fn new(tag: impl Into<String>) -> Self {
		Self(tag.into())
	}

	pub fn tag(&self) -> &str {
		&self.0
	}

	/// Primary language subtag: `de` for `de-CH`.
	pub fn language(&self) -> &str {
		self.0.split(['-', '_']).next().unwrap_or(&self.0)
	}
}

impl fmt::Display for Locale {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for Locale {
	fn from(tag: &str) -> Self {
		Self::new(tag)
	}
}

/// Read access to a live host document.
///
/// Paragraph text is reported as the host sees it, including footnote anchors
/// and characters of tracked deletions. Offsets are `char` offsets.
pub trait DocumentModel: Send + Sync {
	fn paragraph_count(&self) -> usize;

	fn paragraph_text(&self, flat: FlatParagraph) -> Result<String>;

	fn locale(&self, flat: FlatParagraph) -> Result<Locale>;

	/// Offsets of footnote anchors in the paragraph.
	fn footnotes(&self, _flat: FlatParagraph) -> Result<Vec<usize>> {
		Ok(Vec::new())
	}

	/// Offsets of characters that are tracked deletions.
	fn deleted_characters(&self, _flat: FlatParagraph) -> Result<Vec<usize>> {
		Ok(Vec::new())
	}

	/// `None` if the host cannot place the paragraph.
	fn logical_of(&self, flat: FlatParagraph) -> Option<LogicalParagraph>;

	/// `None` if the logical paragraph does not exist.
	fn flat_of(&self, logical: LogicalParagraph) -> Option<FlatParagraph>;
}

/// Presents a [`DocumentModel`] as the source the paragraph index rebuilds from.
pub(crate) struct HostParagraphs<'a>(pub(crate) &'a dyn DocumentModel);

impl ParagraphSource for HostParagraphs<'_> {
	fn paragraph_count(&self) -> usize {
		self.0.paragraph_count()
	}

	fn stream_of(&self, flat: usize) -> Option<StreamKind> {
		self.0.logical_of(FlatParagraph(flat)).map(|l| l.kind)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn language_strips_region() {
		assert_eq!(Locale::new("de-CH").language(), "de");
		assert_eq!(Locale::new("pt_BR").language(), "pt");
		assert_eq!(Locale::new("en").language(), "en");
		assert_eq!(Locale::from("fr-FR").to_string(), "fr-FR");
	}
}
