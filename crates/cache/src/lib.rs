//! Per-rule-class paragraph result caches.
//!
//! A [`ResultCache`] maps flat paragraph numbers to the errors and sentence
//! boundaries computed for that paragraph by one rule class. It is written by
//! one thread at a time (the foreground checker or the background worker) and
//! read by many. Every read hands out immutable values, never references into
//! the locked map.

mod cache;
mod entry;

pub use cache::{CacheSnapshot, ResultCache};
pub use entry::CacheEntry;
