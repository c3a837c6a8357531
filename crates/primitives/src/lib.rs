//! Core value types shared by the paragraph index, the result caches, and the
//! check scheduler: identifiers, proofreading errors, and structural edits.

/// Structural paragraph edits (insert/delete/replace) and key remapping.
pub mod edit;
/// Identifier types for documents and paragraphs.
pub mod ids;
/// Proofreading error records and filters.
pub mod proof;

pub use edit::{EditError, ParagraphEdit};
pub use ids::{DocumentId, FlatParagraph, LogicalParagraph, StreamKind};
pub use proof::{ErrorDisplay, ErrorFilter, ErrorKind, ProofError, UnderlineStyle};
