use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Monotonic generation clock for worker runs.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	next: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock starting at generation 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the next generation ID.
	pub fn next(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Creates a fresh token in the next generation.
	pub fn token(&self) -> GenerationToken {
		GenerationToken::new(self.next(), CancellationToken::new())
	}
}

/// Generation-scoped cancellation token for one unit of queued work.
///
/// Cancellation is cooperative: workers poll [`Self::is_cancelled`] at their
/// own checkpoints, async code can await [`Self::cancelled`].
#[derive(Debug, Clone)]
pub struct GenerationToken {
	generation: u64,
	cancel: CancellationToken,
}

impl GenerationToken {
	/// Creates a new generation token.
	pub fn new(generation: u64, cancel: CancellationToken) -> Self {
		Self { generation, cancel }
	}

	/// Returns generation ID.
	pub const fn generation(&self) -> u64 {
		self.generation
	}

	/// Returns true when cancellation is requested.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Requests cancellation.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Future resolving when cancellation is requested.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Creates a child token in the same generation.
	pub fn child(&self) -> Self {
		Self {
			generation: self.generation,
			cancel: self.cancel.child_token(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn generations_are_monotonic() {
		let clock = GenerationClock::new();
		let a = clock.token();
		let b = clock.clone().token();
		assert_eq!(a.generation(), 1);
		assert_eq!(b.generation(), 2);
	}

	#[test]
	fn cancelling_parent_cancels_child() {
		let token = GenerationClock::new().token();
		let child = token.child();
		assert!(!child.is_cancelled());
		token.cancel();
		assert!(child.is_cancelled());
		assert_eq!(child.generation(), token.generation());
	}

	#[tokio::test]
	async fn cancelled_future_resolves() {
		let token = GenerationClock::new().token();
		let waiter = token.clone();
		token.cancel();
		tokio::time::timeout(std::time::Duration::from_secs(1), waiter.cancelled())
			.await
			.expect("cancellation should resolve");
	}
}
