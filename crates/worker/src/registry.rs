use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::TaskClass;

/// Snapshot for one registered worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
	pub name: String,
	pub class: TaskClass,
	/// Generation of the last unit of work started.
	pub generation: u64,
	/// Units of work finished, including failed and interrupted ones.
	pub processed: u64,
	pub pending: usize,
	pub last_error: Option<String>,
}

impl WorkerRecord {
	pub fn new(name: impl Into<String>, class: TaskClass) -> Self {
		Self {
			name: name.into(),
			class,
			generation: 0,
			processed: 0,
			pending: 0,
			last_error: None,
		}
	}
}

/// In-memory worker registry for status snapshots.
#[derive(Debug, Default, Clone)]
pub struct WorkerRegistry {
	inner: Arc<RwLock<HashMap<String, WorkerRecord>>>,
}

impl WorkerRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Upserts one record.
	pub fn upsert(&self, record: WorkerRecord) {
		self.inner.write().insert(record.name.clone(), record);
	}

	/// Updates one record in place, creating it first if missing.
	pub fn update(&self, name: &str, class: TaskClass, f: impl FnOnce(&mut WorkerRecord)) {
		let mut guard = self.inner.write();
		let record = guard.entry(name.to_string()).or_insert_with(|| WorkerRecord::new(name, class));
		f(record);
	}

	/// Removes one record.
	pub fn remove(&self, name: &str) {
		self.inner.write().remove(name);
	}

	pub fn get(&self, name: &str) -> Option<WorkerRecord> {
		self.inner.read().get(name).cloned()
	}

	/// Returns snapshots sorted by name.
	pub fn snapshots(&self) -> Vec<WorkerRecord> {
		let mut records: Vec<_> = self.inner.read().values().cloned().collect();
		records.sort_by(|a, b| a.name.cmp(&b.name));
		records
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn update_creates_and_mutates() {
		let registry = WorkerRegistry::new();
		registry.update("b", TaskClass::Remote, |r| r.processed += 1);
		registry.update("b", TaskClass::Remote, |r| r.processed += 1);
		registry.upsert(WorkerRecord::new("a", TaskClass::Background));

		let names: Vec<_> = registry.snapshots().into_iter().map(|r| r.name).collect();
		assert_eq!(names, vec!["a", "b"]);
		assert_eq!(registry.get("b").map(|r| r.processed), Some(2));

		registry.remove("b");
		assert!(registry.get("b").is_none());
	}
}
