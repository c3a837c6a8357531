use std::cell::RefCell;

use super::*;

struct Host {
	kinds: RefCell<Vec<StreamKind>>,
}

impl Host {
	fn new(kinds: Vec<StreamKind>) -> Self {
		Self { kinds: RefCell::new(kinds) }
	}
}

impl ParagraphSource for Host {
	fn paragraph_count(&self) -> usize {
		self.kinds.borrow().len()
	}

	fn stream_of(&self, flat: usize) -> Option<StreamKind> {
		self.kinds.borrow().get(flat).copied()
	}
}

#[test]
fn rebuild_bumps_generation() {
	let host = Host::new(vec![StreamKind::Text; 4]);
	let index = ParagraphIndex::from_source(&host).unwrap();
	let first = index.generation();

	index.rebuild(&host).unwrap();
	assert!(index.generation() > first);
	assert_eq!(index.snapshot().len(), 4);
}

#[test]
fn lookups_with_old_generation_are_stale() {
	let host = Host::new(vec![StreamKind::Text; 4]);
	let index = ParagraphIndex::from_source(&host).unwrap();
	let generation = index.generation();
	assert_eq!(index.flat_of(generation, LogicalParagraph::text(2)).unwrap(), FlatParagraph(2));

	index.rebuild(&host).unwrap();
	let err = index.logical_of(generation, FlatParagraph(2)).unwrap_err();
	assert!(matches!(err, IndexError::Stale { expected, .. } if expected == generation));
	assert!(err.needs_rebuild());
}

#[test]
fn snapshot_survives_concurrent_rebuild() {
	let host = Host::new(vec![StreamKind::Text; 4]);
	let index = ParagraphIndex::from_source(&host).unwrap();
	let snap = index.snapshot();

	host.kinds.borrow_mut().truncate(2);
	index.rebuild(&host).unwrap();

	assert_eq!(snap.len(), 4);
	assert_eq!(index.snapshot().len(), 2);
}

#[test]
fn ensure_current_detects_paragraph_count_change() {
	let host = Host::new(vec![StreamKind::Text; 4]);
	let index = ParagraphIndex::from_source(&host).unwrap();
	assert!(index.ensure_current(&host).is_ok());

	host.kinds.borrow_mut().push(StreamKind::Text);
	assert_eq!(index.ensure_current(&host).unwrap_err(), IndexError::OutOfSync { indexed: 4, actual: 5 });
}

#[test]
fn shift_reads_only_replaced_paragraphs() {
	let host = Host::new(vec![StreamKind::Text; 10]);
	let index = ParagraphIndex::from_source(&host).unwrap();

	// paragraphs 3..6 merged into one footnote paragraph
	{
		let mut kinds = host.kinds.borrow_mut();
		kinds.drain(3..6);
		kinds.insert(3, StreamKind::Footnote);
	}
	let edit = ParagraphEdit::new(3, 6, 10, 8).unwrap();
	let map = index.shift(&edit, &host).unwrap();

	assert_eq!(map.len(), 8);
	assert_eq!(map.logical_of(FlatParagraph(3)).unwrap(), LogicalParagraph::new(StreamKind::Footnote, 0));
	assert_eq!(map.logical_of(FlatParagraph(7)).unwrap(), LogicalParagraph::text(6));
	assert!(index.ensure_current(&host).is_ok());
}

#[test]
fn shift_fails_when_host_cannot_describe_paragraph() {
	let host = Host::new(vec![StreamKind::Text; 3]);
	let index = ParagraphIndex::from_source(&host).unwrap();
	let edit = ParagraphEdit::new(2, 3, 3, 5).unwrap();

	assert_eq!(index.shift(&edit, &host).unwrap_err(), IndexError::UnknownParagraph(3));
	assert_eq!(index.snapshot().len(), 3);
}
