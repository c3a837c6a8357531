//! Checker configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```toml
//! use_queue = true
//! text_level_windows = [1, 3]
//! whole_document_slot = true
//!
//! [ai]
//! enabled = false
//! timeout_ms = 10000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Configuration of one [`crate::Documents`] handler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
	/// Run text-level checks on the background queue instead of in the
	/// foreground request.
	pub use_queue: bool,
	/// Forces synchronous checking, e.g. for automated tests of the host.
	pub test_mode: bool,
	/// Window sizes of the text-level rule classes, one cache slot each.
	pub text_level_windows: Vec<i32>,
	/// Count text-level windows inside the anchor's stream instead of the flat
	/// paragraph sequence.
	pub stream_only_windows: bool,
	/// Adds a slot for rules that need the whole document.
	pub whole_document_slot: bool,
	/// Keeps the displayed errors across a full reset so that rechecks only
	/// repaint paragraphs whose errors changed.
	pub sentence_reset_slot: bool,
	/// Capacity of the shared spelling-suggestion cache.
	pub suggestion_cache_size: usize,
	pub ai: AiConfig,
}

/// AI-assisted checking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
	pub enabled: bool,
	/// Upper bound for one backend call.
	pub timeout_ms: u64,
	/// Entries beyond this many pending ones are dropped.
	pub max_pending: usize,
}

impl Default for CheckConfig {
	fn default() -> Self {
		Self {
			use_queue: true,
			test_mode: false,
			text_level_windows: vec![1],
			stream_only_windows: true,
			whole_document_slot: true,
			sentence_reset_slot: true,
			suggestion_cache_size: 256,
			ai: AiConfig::default(),
		}
	}
}

impl Default for AiConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			timeout_ms: 10_000,
			max_pending: 64,
		}
	}
}

impl AiConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

impl CheckConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses, and validates a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| Error::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml_str(&input)?;
		tracing::debug!(path = %path.display(), windows = ?config.text_level_windows, "config.load");
		Ok(config)
	}

	/// Checks invariants serde cannot express.
	pub fn validate(&self) -> Result<()> {
		for (i, &window) in self.text_level_windows.iter().enumerate() {
			if window <= 0 {
				return Err(Error::Config(format!(
					"text_level_windows[{i}] = {window}: windows must be positive, use whole_document_slot for whole-document rules"
				)));
			}
			if self.text_level_windows[..i].contains(&window) {
				return Err(Error::Config(format!("text_level_windows contains {window} twice")));
			}
		}
		if self.suggestion_cache_size == 0 {
			return Err(Error::Config("suggestion_cache_size must be at least 1".into()));
		}
		if self.ai.enabled && self.ai.timeout_ms == 0 {
			return Err(Error::Config("ai.timeout_ms must be at least 1".into()));
		}
		Ok(())
	}

	/// Whether text-level checks go through the background queue.
	pub fn queue_enabled(&self) -> bool {
		self.use_queue && !self.test_mode
	}
}

#[cfg(test)]
mod tests;
