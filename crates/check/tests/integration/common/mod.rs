//! Fake host, engine, and repaint sink shared by the integration tests.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use galley_check::{
	CheckConfig, CheckRequest, DocumentChecker, DocumentModel, Documents, Error, LinguisticEngine, Locale, ParagraphUpdate, RepaintSink, Result,
	RuleMatch, RuleMode,
};
use galley_primitives::{DocumentId, ErrorKind, FlatParagraph, LogicalParagraph, ProofError, StreamKind};
use parking_lot::{Mutex, RwLock};

pub const WAIT: Duration = Duration::from_secs(10);

/// In-memory host document; every paragraph is body text in `en-US`.
#[derive(Default)]
pub struct TestDoc {
	paragraphs: RwLock<Vec<String>>,
}

impl TestDoc {
	pub fn new<S: AsRef<str>>(texts: &[S]) -> Arc<Self> {
		Arc::new(Self {
			paragraphs: RwLock::new(texts.iter().map(|t| t.as_ref().to_string()).collect()),
		})
	}

	pub fn set_text(&self, flat: usize, text: &str) {
		self.paragraphs.write()[flat] = text.to_string();
	}
}

impl DocumentModel for TestDoc {
	fn paragraph_count(&self) -> usize {
		self.paragraphs.read().len()
	}

	fn paragraph_text(&self, flat: FlatParagraph) -> Result<String> {
		self.paragraphs.read().get(flat.0).cloned().ok_or_else(|| Error::Document(format!("no paragraph {flat}")))
	}

	fn locale(&self, _flat: FlatParagraph) -> Result<Locale> {
		Ok(Locale::new("en-US"))
	}

	fn logical_of(&self, flat: FlatParagraph) -> Option<LogicalParagraph> {
		(flat.0 < self.paragraph_count()).then(|| LogicalParagraph::new(StreamKind::Text, flat.0))
	}

	fn flat_of(&self, logical: LogicalParagraph) -> Option<FlatParagraph> {
		(logical.kind == StreamKind::Text && logical.local < self.paragraph_count()).then_some(FlatParagraph(logical.local))
	}
}

/// Flags "bad" per paragraph and every repeated "dup" across a text-level
/// window. Text-level checks sleep for `delay` and panic on "PANIC".
#[derive(Default)]
pub struct TestEngine {
	pub delay: Duration,
	pub single_calls: AtomicUsize,
	/// Concatenated text of every text-level check.
	pub windows: Mutex<Vec<String>>,
}

impl TestEngine {
	pub fn slow(delay: Duration) -> Self {
		Self { delay, ..Self::default() }
	}

	pub fn take_windows(&self) -> Vec<String> {
		std::mem::take(&mut *self.windows.lock())
	}
}

fn find_all(text: &str, needle: &str) -> Vec<usize> {
	text.match_indices(needle).map(|(at, _)| text[..at].chars().count()).collect()
}

impl LinguisticEngine for TestEngine {
	fn check(&self, text: &str, _paragraphs: &[Range<usize>], mode: RuleMode) -> Result<Vec<RuleMatch>> {
		if mode == RuleMode::SingleParagraph {
			self.single_calls.fetch_add(1, Ordering::Relaxed);
			return Ok(find_all(text, "bad").into_iter().map(|at| RuleMatch::new(at, at + 3, "BAD", ErrorKind::Grammar)).collect());
		}
		assert!(!text.contains("PANIC"), "engine crashed");
		self.windows.lock().push(text.to_string());
		std::thread::sleep(self.delay);
		Ok(find_all(text, "dup").into_iter().skip(1).map(|at| RuleMatch::new(at, at + 3, "DUP", ErrorKind::Grammar)).collect())
	}
}

/// Records every repaint notification.
#[derive(Default)]
pub struct Recorder {
	updates: Mutex<Vec<(DocumentId, ParagraphUpdate)>>,
}

impl Recorder {
	pub fn take(&self) -> Vec<(DocumentId, ParagraphUpdate)> {
		std::mem::take(&mut *self.updates.lock())
	}

	/// Repainted paragraphs of `document`, in notification order.
	pub fn repainted(&self, document: DocumentId) -> Vec<FlatParagraph> {
		self.updates
			.lock()
			.iter()
			.filter(|(id, _)| *id == document)
			.flat_map(|(_, update)| update.keys().copied().collect::<Vec<_>>())
			.collect()
	}

	/// Polls until `document` has been repainted or `timeout` passes.
	pub fn wait_for(&self, document: DocumentId, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		while Instant::now() < deadline {
			if !self.repainted(document).is_empty() {
				return true;
			}
			std::thread::sleep(Duration::from_millis(5));
		}
		false
	}
}

impl RepaintSink for Recorder {
	fn on_paragraphs_changed(&self, document: DocumentId, changes: ParagraphUpdate) {
		self.updates.lock().push((document, changes));
	}
}

/// Queued configuration with one text-level slot of the given window size.
pub fn queued(window: i32) -> CheckConfig {
	CheckConfig {
		use_queue: true,
		text_level_windows: vec![window],
		whole_document_slot: false,
		..CheckConfig::default()
	}
}

pub fn open<S: AsRef<str>>(documents: &Documents, texts: &[S]) -> (Arc<TestDoc>, Arc<DocumentChecker>) {
	let doc = TestDoc::new(texts);
	let checker = documents.open(DocumentId::next(), Arc::clone(&doc) as Arc<dyn DocumentModel>);
	(doc, checker)
}

/// Requests the first sentence of every paragraph, as a host does after
/// loading a document.
pub fn check_all(checker: &DocumentChecker, paragraphs: usize) {
	for local in 0..paragraphs {
		checker.check(&CheckRequest::new(LogicalParagraph::text(local), 0));
	}
}

pub fn rule_ids(errors: &[ProofError]) -> Vec<(usize, &str)> {
	errors.iter().map(|e| (e.start, e.rule_id.as_str())).collect()
}
