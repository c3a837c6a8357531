use std::ops::Range;

/// Broad class of a proofreading error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Grammar, style, and typography findings.
	Grammar,
	/// Spelling findings. Volatile: never a reason to repaint on their own.
	Spelling,
}

/// Error-kind selection used when reading cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorFilter {
	Grammar,
	Spelling,
	#[default]
	Both,
}

impl ErrorFilter {
	/// Returns true if errors of `kind` pass this filter.
	pub const fn accepts(self, kind: ErrorKind) -> bool {
		matches!(
			(self, kind),
			(Self::Both, _) | (Self::Grammar, ErrorKind::Grammar) | (Self::Spelling, ErrorKind::Spelling)
		)
	}
}

/// Underline drawn below an error span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineStyle {
	#[default]
	Wave,
	BoldWave,
	Dotted,
	Dashed,
	Solid,
}

/// Display attributes attached to an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ErrorDisplay {
	pub underline: UnderlineStyle,
	/// `0xRRGGBB`; `None` lets the host pick the default colour for the kind.
	pub color: Option<u32>,
	/// Link to a rule explanation.
	pub url: Option<String>,
}

/// One error found in a paragraph.
///
/// Offsets are `char` offsets into the paragraph text as the host reports it,
/// i.e. including footnote anchors and tracked deletions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProofError {
	pub start: usize,
	pub length: usize,
	pub kind: ErrorKind,
	pub rule_id: String,
	pub short_message: String,
	pub message: String,
	pub suggestions: Vec<String>,
	pub display: ErrorDisplay,
}

impl ProofError {
	/// Creates a grammar error with no messages or suggestions.
	pub fn grammar(start: usize, length: usize, rule_id: impl Into<String>) -> Self {
		Self::new(start, length, ErrorKind::Grammar, rule_id)
	}

	/// Creates a spelling error with no messages or suggestions.
	pub fn spelling(start: usize, length: usize, rule_id: impl Into<String>) -> Self {
		Self::new(start, length, ErrorKind::Spelling, rule_id)
	}

	pub fn new(start: usize, length: usize, kind: ErrorKind, rule_id: impl Into<String>) -> Self {
		Self {
			start,
			length,
			kind,
			rule_id: rule_id.into(),
			short_message: String::new(),
			message: String::new(),
			suggestions: Vec::new(),
			display: ErrorDisplay::default(),
		}
	}

	#[must_use]
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	#[must_use]
	pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.suggestions = suggestions.into_iter().map(Into::into).collect();
		self
	}

	/// Half-open character span `[start, start + length)`.
	pub fn span(&self) -> Range<usize> {
		self.start..self.start + self.length
	}

	pub fn end(&self) -> usize {
		self.start + self.length
	}

	pub fn is_spelling(&self) -> bool {
		self.kind == ErrorKind::Spelling
	}

	/// Identity used for repaint decisions: span and rule.
	pub fn same_place(&self, other: &ProofError) -> bool {
		self.start == other.start && self.length == other.length && self.rule_id == other.rule_id
	}
}
