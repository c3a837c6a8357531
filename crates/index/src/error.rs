use galley_primitives::{EditError, LogicalParagraph};
use thiserror::Error;

/// Errors raised by paragraph index lookups and updates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
	/// The caller's generation no longer matches the published index.
	#[error("paragraph index is stale: caller has generation {expected}, index is at {actual}")]
	Stale { expected: u64, actual: u64 },

	/// The index does not describe the live document any more.
	#[error("paragraph index out of sync: index has {indexed} paragraphs, document has {actual}")]
	OutOfSync { indexed: usize, actual: usize },

	/// Flat paragraph beyond the current paragraph count.
	#[error("flat paragraph {flat} out of bounds (len {len})")]
	FlatOutOfBounds { flat: usize, len: usize },

	/// Logical paragraph not present in its stream.
	#[error("logical paragraph {0} out of bounds")]
	LogicalOutOfBounds(LogicalParagraph),

	/// The host could not describe a paragraph it reported as present.
	#[error("document has no stream information for paragraph {0}")]
	UnknownParagraph(usize),

	#[error(transparent)]
	Edit(#[from] EditError),
}

impl IndexError {
	/// Returns true if rebuilding the index from the host can resolve the error.
	pub fn needs_rebuild(&self) -> bool {
		matches!(
			self,
			Self::Stale { .. } | Self::OutOfSync { .. } | Self::FlatOutOfBounds { .. } | Self::LogicalOutOfBounds(_) | Self::UnknownParagraph(_)
		)
	}
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
