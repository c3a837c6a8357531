//! Paragraph index: the single source of truth for paragraph numbering.
//!
//! A document is a flat, document-order sequence of paragraphs. Each paragraph
//! also belongs to one logical stream (body text, footnotes, headers, shapes,
//! ...) with its own local numbering. [`ParagraphMap`] is one immutable
//! generation of that mapping; [`ParagraphIndex`] publishes the current
//! generation copy-on-read, so a rebuild racing an in-flight computation can
//! only make that computation stale, never corrupt it.

mod error;
mod index;
mod map;

pub use error::{IndexError, Result};
pub use index::{ParagraphIndex, ParagraphSource};
pub use map::{ParagraphMap, ParagraphWindow};
