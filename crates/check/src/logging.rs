//! Tracing subscriber setup for hosts and tests.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable holding the log filter, in `EnvFilter` syntax.
pub const LOG_ENV: &str = "GALLEY_LOG";

/// Installs a stderr fmt subscriber filtered by [`LOG_ENV`].
///
/// Does nothing if a global subscriber is already set, so tests may call it
/// freely.
pub fn init() {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("galley=info,warn"));
	let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(true);
	if tracing_subscriber::registry().with(filter).with(layer).try_init().is_ok() {
		tracing::debug!(env = LOG_ENV, "logging.init");
	}
}
