//! Task types
//!
//! Defines the lifecycle vocabulary shared by the supervisor and its sinks:
//! - TaskId: opaque task identifier
//! - TaskState / TerminalState: lifecycle states
//! - Task: read-only snapshot of a supervised task

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a supervised task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Submitted,
    Working,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    /// Terminal states are absorbing: no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The states a terminal write may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Completed,
    Failed,
    Canceled,
}

impl From<TerminalState> for TaskState {
    fn from(state: TerminalState) -> Self {
        match state {
            TerminalState::Completed => TaskState::Completed,
            TerminalState::Failed => TaskState::Failed,
            TerminalState::Canceled => TaskState::Canceled,
        }
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TaskState::from(*self).fmt(f)
    }
}

/// Which writer recorded the terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalSource {
    /// The handler called `mark_terminal` itself
    Handler,
    /// The supervisor's own completion or failure path
    Supervisor,
    /// An external cancellation, including deadline expiry
    Cancellation,
}

/// Snapshot of a supervised task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: TaskId,
    /// Agent the task was admitted for
    pub agent_name: String,
    /// Current lifecycle state
    pub state: TaskState,
    /// Set once a terminal state has been recorded; never reset
    pub terminated: bool,
    /// Recorded failure or cancellation cause
    pub error: Option<String>,
    /// Writer that won the terminal transition
    pub terminated_by: Option<TerminalSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a task in the `submitted` state
    pub fn new(agent_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::default(),
            agent_name: agent_name.into(),
            state: TaskState::Submitted,
            terminated: false,
            error: None,
            terminated_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}
