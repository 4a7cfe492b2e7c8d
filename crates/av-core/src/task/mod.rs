//! Task lifecycle state
//!
//! `submitted -> working -> {completed | failed | canceled}`. Terminal states
//! are absorbing; all terminal writes for a task go through its [`TaskHandle`].

pub mod handle;
pub mod sink;
pub mod types;

pub use handle::{TaskHandle, TerminalWrite};
pub use sink::{InMemoryStatusSink, StatusUpdate, TaskStatusSink, TracingStatusSink};
pub use types::{Task, TaskId, TaskState, TerminalSource, TerminalState};
