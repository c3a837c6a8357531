//! Linguistic engine interface and the per-language engine registry.

use std::ops::Range;
use std::sync::Arc;

use galley_primitives::ErrorKind;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::model::Locale;
use crate::{Error, Result};

/// Which rules a check run applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleMode {
	/// Rules that look at one paragraph at a time.
	SingleParagraph,
	/// Rules that need neighbouring paragraphs.
	TextLevel,
	All,
}

/// One finding reported by an engine, in `char` offsets of the checked text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
	pub from: usize,
	pub to: usize,
	pub rule_id: String,
	pub message: String,
	pub short_message: String,
	pub suggestions: Vec<String>,
	pub kind: ErrorKind,
	pub url: Option<String>,
}

impl RuleMatch {
	pub fn new(from: usize, to: usize, rule_id: impl Into<String>, kind: ErrorKind) -> Self {
		Self {
			from,
			to,
			rule_id: rule_id.into(),
			message: String::new(),
			short_message: String::new(),
			suggestions: Vec::new(),
			kind,
			url: None,
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
}

/// A grammar and spelling engine for one language.
pub trait LinguisticEngine: Send + Sync {
	/// Sentence end offsets of `text`, ascending; the last one is the text length.
	fn analyze(&self, text: &str) -> Vec<usize> {
		sentence_ends(text)
	}

	/// Checks `text`, which holds one paragraph per entry of `paragraphs`.
	///
	/// Matches may span paragraph boundaries in [`RuleMode::TextLevel`].
	fn check(&self, text: &str, paragraphs: &[Range<usize>], mode: RuleMode) -> Result<Vec<RuleMatch>>;
}

/// Unicode sentence boundaries of `text` as `char` offsets.
pub fn sentence_ends(text: &str) -> Vec<usize> {
	let mut ends = Vec::new();
	let mut chars = 0;
	for sentence in text.split_sentence_bounds() {
		chars += sentence.chars().count();
		ends.push(chars);
	}
	ends
}

/// Builds the engine for a locale.
pub type EngineFactory = Arc<dyn Fn(&Locale) -> Result<Arc<dyn LinguisticEngine>> + Send + Sync>;

/// Maps language tags to engine factories and caches built engines.
///
/// Lookup falls back from the full tag (`de-CH`) to the primary language
/// (`de`) and then to the default factory.
#[derive(Default)]
pub struct EngineRegistry {
	factories: FxHashMap<String, EngineFactory>,
	fallback: Option<EngineFactory>,
	built: RwLock<FxHashMap<String, Arc<dyn LinguisticEngine>>>,
}

impl std::fmt::Debug for EngineRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut tags: Vec<_> = self.factories.keys().collect();
		tags.sort();
		f.debug_struct("EngineRegistry")
			.field("tags", &tags)
			.field("fallback", &self.fallback.is_some())
			.field("built", &self.built.read().len())
			.finish()
	}
}

impl EngineRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a factory for a language tag.
	#[must_use]
	pub fn with<F>(mut self, tag: impl Into<String>, factory: F) -> Self
	where
		F: Fn(&Locale) -> Result<Arc<dyn LinguisticEngine>> + Send + Sync + 'static,
	{
		self.factories.insert(tag.into(), Arc::new(factory));
		self
	}

	/// Sets the factory used when no tag matches.
	#[must_use]
	pub fn with_fallback<F>(mut self, factory: F) -> Self
	where
		F: Fn(&Locale) -> Result<Arc<dyn LinguisticEngine>> + Send + Sync + 'static,
	{
		self.fallback = Some(Arc::new(factory));
		self
	}

	/// Registers one shared engine instance for a language tag.
	#[must_use]
	pub fn with_engine(self, tag: impl Into<String>, engine: Arc<dyn LinguisticEngine>) -> Self {
		self.with(tag, move |_| Ok(Arc::clone(&engine)))
	}

	/// Returns the engine for `locale`, building it on first use.
	pub fn engine_for(&self, locale: &Locale) -> Result<Arc<dyn LinguisticEngine>> {
		if let Some(engine) = self.built.read().get(locale.tag()) {
			return Ok(Arc::clone(engine));
		}
		let factory = self
			.factories
			.get(locale.tag())
			.or_else(|| self.factories.get(locale.language()))
			.or(self.fallback.as_ref())
			.ok_or_else(|| Error::EngineUnavailable(locale.to_string()))?;
		let engine = factory(locale)?;
		tracing::debug!(locale = %locale, "engine.build");
		let mut built = self.built.write();
		Ok(Arc::clone(built.entry(locale.tag().to_string()).or_insert(engine)))
	}

	/// Drops all built engines; the next lookup rebuilds them.
	pub fn invalidate(&self) {
		self.built.write().clear();
	}
}
