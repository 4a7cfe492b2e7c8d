//! Supervised execution of agent handlers
//!
//! The supervisor owns each task's lifecycle: it moves the task to `working`,
//! runs the handler, and turns whatever the handler does (return, error,
//! panic, overrun its deadline) into one terminal state.

pub mod handler;
pub mod runner;

pub use handler::{AgentHandler, FnHandler, TaskContext, handler_fn};
pub use runner::{Supervised, TaskOutcome, TaskSupervisor};
