use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Where a pushed item lands in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
	Front,
	Back,
}

/// Outcome from pushing one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
	/// Item was enqueued without replacement.
	Enqueued,
	/// An equal pending item was removed before inserting.
	Coalesced,
	/// The queue was full; the oldest pending item was dropped to make room.
	Evicted,
	/// Queue is closed; the item was dropped.
	Closed,
}

struct QueueState<T> {
	queue: VecDeque<T>,
	closed: bool,
	/// An item was taken and is still being processed.
	busy: bool,
}

struct QueueInner<T> {
	state: Mutex<QueueState<T>>,
	/// Maximum number of pending items, if bounded.
	capacity: Option<usize>,
	/// Signalled on push and close.
	ready: Condvar,
	/// Signalled when the consumer becomes idle.
	idle: Condvar,
}

/// Blocking single-consumer work queue with coalescing pushes.
///
/// Pushing removes any pending item equal to the new one before inserting, so
/// the queue holds at most one pending item per equivalence class. The single
/// consumer blocks in [`Self::take`] while there is nothing to select.
pub struct WorkQueue<T> {
	inner: Arc<QueueInner<T>>,
}

impl<T> Clone for WorkQueue<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for WorkQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> std::fmt::Debug for WorkQueue<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("WorkQueue")
			.field("len", &state.queue.len())
			.field("closed", &state.closed)
			.field("busy", &state.busy)
			.finish()
	}
}

impl<T> WorkQueue<T> {
	pub fn new() -> Self {
		Self::with_capacity(None)
	}

	/// Queue holding at most `capacity` pending items. Pushing into a full
	/// queue drops the oldest pending item.
	pub fn bounded(capacity: usize) -> Self {
		Self::with_capacity(Some(capacity.max(1)))
	}

	fn with_capacity(capacity: Option<usize>) -> Self {
		Self {
			inner: Arc::new(QueueInner {
				state: Mutex::new(QueueState {
					queue: VecDeque::new(),
					closed: false,
					busy: false,
				}),
				capacity,
				ready: Condvar::new(),
				idle: Condvar::new(),
			}),
		}
	}

	/// Enqueues `item`, first removing pending items `same` considers equal.
	pub fn push(&self, item: T, placement: Placement, same: impl Fn(&T, &T) -> bool) -> PushOutcome {
		let mut state = self.inner.state.lock();
		if state.closed {
			return PushOutcome::Closed;
		}
		let before = state.queue.len();
		state.queue.retain(|pending| !same(pending, &item));
		let coalesced = state.queue.len() != before;
		let evicted = self.inner.capacity.is_some_and(|cap| state.queue.len() >= cap);
		if evicted {
			// Evict from the end opposite the insertion point.
			match placement {
				Placement::Front => state.queue.pop_back(),
				Placement::Back => state.queue.pop_front(),
			};
		}
		match placement {
			Placement::Front => state.queue.push_front(item),
			Placement::Back => state.queue.push_back(item),
		}
		drop(state);
		self.inner.ready.notify_one();
		if coalesced {
			PushOutcome::Coalesced
		} else if evicted {
			PushOutcome::Evicted
		} else {
			PushOutcome::Enqueued
		}
	}

	/// Blocks until `select` picks a pending item, then removes and returns it.
	///
	/// `select` sees the pending items in queue order and returns the index to
	/// take. Returns `None` once the queue is closed. The consumer counts as
	/// busy until the returned [`Taken`] is dropped.
	pub fn take(&self, mut select: impl FnMut(&VecDeque<T>) -> Option<usize>) -> Option<Taken<T>> {
		let mut state = self.inner.state.lock();
		loop {
			if state.closed {
				return None;
			}
			if let Some(item) = select(&state.queue).and_then(|idx| state.queue.remove(idx)) {
				state.busy = true;
				return Some(Taken {
					item,
					inner: Arc::clone(&self.inner),
				});
			}
			if state.queue.is_empty() {
				self.inner.idle.notify_all();
			}
			self.inner.ready.wait(&mut state);
		}
	}

	/// Keeps only pending items matching `keep`. Returns the number removed.
	pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> usize {
		let mut state = self.inner.state.lock();
		let before = state.queue.len();
		state.queue.retain(|item| keep(item));
		let removed = before - state.queue.len();
		if state.queue.is_empty() && !state.busy {
			self.inner.idle.notify_all();
		}
		removed
	}

	/// Drops all pending items. Returns the number removed.
	pub fn clear(&self) -> usize {
		self.retain(|_| false)
	}

	/// Closes the queue: pending items are dropped and the consumer wakes up.
	pub fn close(&self) {
		let mut state = self.inner.state.lock();
		state.closed = true;
		state.queue.clear();
		drop(state);
		self.inner.ready.notify_all();
		self.inner.idle.notify_all();
	}

	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}

	/// Number of pending items.
	pub fn len(&self) -> usize {
		self.inner.state.lock().queue.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.state.lock().queue.is_empty()
	}

	/// Returns a copy of the pending items in queue order.
	pub fn pending(&self) -> Vec<T>
	where
		T: Clone,
	{
		self.inner.state.lock().queue.iter().cloned().collect()
	}

	/// Returns true if nothing is pending and nothing is being processed.
	pub fn is_idle(&self) -> bool {
		let state = self.inner.state.lock();
		state.queue.is_empty() && !state.busy
	}

	/// Blocks until the queue is idle or closed, at most `timeout`.
	///
	/// Returns true if the queue became idle.
	pub fn wait_idle(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut state = self.inner.state.lock();
		loop {
			if state.queue.is_empty() && !state.busy {
				return true;
			}
			if state.closed {
				return false;
			}
			if self.inner.idle.wait_until(&mut state, deadline).timed_out() {
				return state.queue.is_empty() && !state.busy;
			}
		}
	}
}

/// An item taken from a [`WorkQueue`]. Dropping it marks the consumer idle.
pub struct Taken<T> {
	item: T,
	inner: Arc<QueueInner<T>>,
}

impl<T> Taken<T> {
	pub fn item(&self) -> &T {
		&self.item
	}
}

impl<T> Drop for Taken<T> {
	fn drop(&mut self) {
		let mut state = self.inner.state.lock();
		state.busy = false;
		let idle = state.queue.is_empty();
		drop(state);
		if idle {
			self.inner.idle.notify_all();
		}
	}
}
