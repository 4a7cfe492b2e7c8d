//! av-core: agent task supervision core
//!
//! Validates agent configurations before launch, normalizes raw parser
//! output into typed requests, and supervises handler execution so every
//! task ends in exactly one terminal state.

pub mod config;
pub mod error;
pub mod request;
pub mod supervisor;
pub mod task;
pub mod validation;

pub use config::{ProviderEntry, SupervisorConfig};
pub use error::{Error, InvalidStateError, Result, ValidationError};
pub use request::{ParseResult, RequestSchema, ValidatedRequest, normalize, normalize_value};
pub use supervisor::{AgentHandler, TaskContext, TaskOutcome, TaskSupervisor, handler_fn};
pub use task::{TaskHandle, TaskId, TaskState, TaskStatusSink, TerminalState, TerminalWrite};
pub use validation::{AgentConfig, ConfigValidator, ProviderDescriptor, ValidationReport};
