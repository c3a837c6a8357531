//! Error types for checking and queue orchestration.

use std::path::PathBuf;
use std::time::Duration;

use galley_index::IndexError;
use galley_primitives::DocumentId;
use thiserror::Error;

/// Errors raised while checking a document.
///
/// Engine and document failures are caught where a check request enters the
/// orchestrator and turned into empty results; callers mostly see these in
/// logs and worker status records.
#[derive(Debug, Error)]
pub enum Error {
	/// The paragraph numbering changed under the computation.
	#[error("stale paragraph index: {0}")]
	StaleIndex(IndexError),

	/// A paragraph reference does not exist in the current numbering.
	#[error("paragraph out of bounds: {0}")]
	OutOfBounds(IndexError),

	/// No engine is registered for the locale, not even a fallback.
	#[error("no linguistic engine for locale {0}")]
	EngineUnavailable(String),

	/// The engine failed while checking.
	#[error("linguistic engine failed: {0}")]
	Engine(String),

	/// The host document could not be read.
	#[error("document model error: {0}")]
	Document(String),

	/// The document was closed while work on it was in flight.
	#[error("document {0} is disposed")]
	Disposed(DocumentId),

	/// The AI backend failed.
	#[error("AI backend error: {0}")]
	Backend(String),

	/// The AI backend did not answer in time.
	#[error("AI backend timed out after {0:?}")]
	BackendTimeout(Duration),

	/// Invalid configuration value.
	#[error("invalid configuration: {0}")]
	Config(String),

	/// Configuration file is not valid TOML for [`crate::CheckConfig`].
	#[error("failed to parse configuration: {0}")]
	ConfigParse(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The queue worker thread could not be started.
	#[error("failed to spawn worker thread: {0}")]
	Spawn(std::io::Error),
}

impl From<IndexError> for Error {
	fn from(err: IndexError) -> Self {
		match err {
			IndexError::Stale { .. } | IndexError::OutOfSync { .. } => Self::StaleIndex(err),
			other => Self::OutOfBounds(other),
		}
	}
}

impl Error {
	/// Returns true if rebuilding the paragraph index may resolve the error.
	pub fn needs_rebuild(&self) -> bool {
		match self {
			Self::StaleIndex(err) | Self::OutOfBounds(err) => err.needs_rebuild(),
			_ => false,
		}
	}
}

/// Result type for check operations.
pub type Result<T> = std::result::Result<T, Error>;
