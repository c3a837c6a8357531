//! Worker primitives shared by the background check queues.
//!
//! Each queue owns exactly one dedicated OS thread draining a [`WorkQueue`].
//! Work is interrupted cooperatively through [`GenerationToken`]s and worker
//! status is published to a [`WorkerRegistry`].

mod class;
mod panic;
mod queue;
mod registry;
mod spawn;
mod token;

pub use class::TaskClass;
pub use panic::panic_message;
pub use queue::{Placement, PushOutcome, Taken, WorkQueue};
pub use registry::{WorkerRecord, WorkerRegistry};
pub use spawn::spawn_named_thread;
pub use token::{GenerationClock, GenerationToken};
