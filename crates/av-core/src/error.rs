//! Error types for av-core

use thiserror::Error;

use crate::task::{TaskId, TaskState};

/// Main error type for av-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Request validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    #[error("Agent not admitted: {agent} ({})", problems.join("; "))]
    AgentNotAdmitted { agent: String, problems: Vec<String> },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Status sink error: {0}")]
    Sink(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Raw parser output that could not be turned into a typed request.
///
/// A diagnostic string returned in place of a structured result is reported
/// as [`ValidationError::Diagnostic`], carrying the parser's text verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Parser error: {0}")]
    Diagnostic(String),

    #[error("Parser returned unexpected shape: {0}")]
    UnexpectedShape(String),

    #[error("Request failed schema validation: {0}")]
    Schema(String),
}

impl ValidationError {
    /// The parser's diagnostic text, if that is what was returned.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Diagnostic(text) => Some(text),
            _ => None,
        }
    }
}

/// An operation was attempted on a task whose state does not allow it
/// (already running, or already terminal).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Task {task_id} is {state}; {operation} is not permitted")]
pub struct InvalidStateError {
    pub task_id: TaskId,
    pub state: TaskState,
    pub operation: &'static str,
}

/// Result type alias for av-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_message_keeps_parser_text() {
        let err = ValidationError::Diagnostic("No valid configuration found".to_string());
        assert_eq!(err.diagnostic(), Some("No valid configuration found"));
        assert!(err.to_string().contains("No valid configuration found"));

        let err = ValidationError::Schema("initial_capital must be positive".to_string());
        assert_eq!(err.diagnostic(), None);
    }

    #[test]
    fn test_invalid_state_display() {
        let err = InvalidStateError {
            task_id: TaskId::new("task-1"),
            state: TaskState::Completed,
            operation: "run",
        };
        assert_eq!(
            err.to_string(),
            "Task task-1 is completed; run is not permitted"
        );
    }

    #[test]
    fn test_agent_not_admitted_display() {
        let err = Error::AgentNotAdmitted {
            agent: "news_agent".to_string(),
            problems: vec!["providers must be non-empty".to_string()],
        };
        assert!(err.to_string().contains("news_agent"));
        assert!(err.to_string().contains("providers must be non-empty"));
    }
}
