/// Execution classes used for worker naming and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work that directly affects interactive UX.
	Interactive,
	/// Local analysis that may lag behind the document.
	Background,
	/// Calls to slow remote backends.
	Remote,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
			Self::Remote => "remote",
		}
	}
}
