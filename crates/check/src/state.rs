//! State shared by all open documents of one handler.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};

/// Language key under which rules disabled for every language are stored.
const ALL_LANGUAGES: &str = "";

/// User rule switches and the spelling-suggestion cache.
///
/// Injected into every [`crate::DocumentChecker`] of a handler.
#[derive(Debug)]
pub struct SharedState {
	disabled: RwLock<FxHashMap<String, FxHashSet<String>>>,
	suggestions: Mutex<LruCache<String, Vec<String>>>,
}

impl SharedState {
	pub fn new(suggestion_capacity: usize) -> Self {
		let capacity = NonZeroUsize::new(suggestion_capacity).unwrap_or(NonZeroUsize::MIN);
		Self {
			disabled: RwLock::new(FxHashMap::default()),
			suggestions: Mutex::new(LruCache::new(capacity)),
		}
	}

	/// Disables `rule_id` for `language`, or for all languages with `None`.
	///
	/// Returns false if the rule was already disabled.
	pub fn disable_rule(&self, language: Option<&str>, rule_id: &str) -> bool {
		let key = language.unwrap_or(ALL_LANGUAGES).to_string();
		self.disabled.write().entry(key).or_default().insert(rule_id.to_string())
	}

	/// Re-enables `rule_id`. Returns false if it was not disabled.
	pub fn enable_rule(&self, language: Option<&str>, rule_id: &str) -> bool {
		let key = language.unwrap_or(ALL_LANGUAGES);
		self.disabled.write().get_mut(key).is_some_and(|rules| rules.remove(rule_id))
	}

	pub fn is_disabled(&self, language: &str, rule_id: &str) -> bool {
		let disabled = self.disabled.read();
		[ALL_LANGUAGES, language]
			.iter()
			.any(|key| disabled.get(*key).is_some_and(|rules| rules.contains(rule_id)))
	}

	/// Rules disabled for `language`, including those disabled everywhere.
	pub fn disabled_rules(&self, language: &str) -> FxHashSet<String> {
		let disabled = self.disabled.read();
		[ALL_LANGUAGES, language]
			.iter()
			.filter_map(|key| disabled.get(*key))
			.flatten()
			.cloned()
			.collect()
	}

	/// Cached suggestions for a misspelled word.
	pub fn suggestions(&self, word: &str) -> Option<Vec<String>> {
		self.suggestions.lock().get(word).cloned()
	}

	pub fn cache_suggestions(&self, word: &str, suggestions: &[String]) {
		self.suggestions.lock().put(word.to_string(), suggestions.to_vec());
	}

	/// Drops all cached suggestions, e.g. after a dictionary change.
	pub fn clear_suggestions(&self) {
		self.suggestions.lock().clear();
	}
}

impl Default for SharedState {
	fn default() -> Self {
		Self::new(256)
	}
}
