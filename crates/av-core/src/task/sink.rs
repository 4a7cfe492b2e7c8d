//! Task status sinks
//!
//! The supervisor reports each task's `working` transition and its single
//! terminal transition to a [`TaskStatusSink`].

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{info, warn};

use super::types::{TaskId, TaskState};
use crate::Result;

/// External surface receiving `(task_id, state)` updates
#[async_trait]
pub trait TaskStatusSink: Send + Sync {
    /// Deliver a status update
    ///
    /// # Arguments
    /// * `task_id` - Task whose state changed
    /// * `state` - The newly recorded state
    /// * `message` - Optional cause (failure text, cancellation reason)
    async fn update_status(
        &self,
        task_id: &TaskId,
        state: TaskState,
        message: Option<&str>,
    ) -> Result<()>;
}

/// A status update captured by [`InMemoryStatusSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub task_id: TaskId,
    pub state: TaskState,
    pub message: Option<String>,
}

/// Sink that keeps every update in memory
#[derive(Debug, Default)]
pub struct InMemoryStatusSink {
    updates: Mutex<Vec<StatusUpdate>>,
}

impl InMemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates, in delivery order
    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates
            .lock()
            .map(|updates| updates.clone())
            .unwrap_or_default()
    }

    /// States delivered for one task, in delivery order
    pub fn states_for(&self, task_id: &TaskId) -> Vec<TaskState> {
        self.updates()
            .into_iter()
            .filter(|u| &u.task_id == task_id)
            .map(|u| u.state)
            .collect()
    }
}

#[async_trait]
impl TaskStatusSink for InMemoryStatusSink {
    async fn update_status(
        &self,
        task_id: &TaskId,
        state: TaskState,
        message: Option<&str>,
    ) -> Result<()> {
        let mut updates = self
            .updates
            .lock()
            .map_err(|_| crate::Error::Sink("status log poisoned".to_string()))?;
        updates.push(StatusUpdate {
            task_id: task_id.clone(),
            state,
            message: message.map(str::to_string),
        });
        Ok(())
    }
}

/// Sink that emits each update as a tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

#[async_trait]
impl TaskStatusSink for TracingStatusSink {
    async fn update_status(
        &self,
        task_id: &TaskId,
        state: TaskState,
        message: Option<&str>,
    ) -> Result<()> {
        match (state, message) {
            (TaskState::Failed | TaskState::Canceled, Some(message)) => {
                warn!(task_id = %task_id, state = %state, "Task status: {}", message);
            }
            _ => info!(task_id = %task_id, state = %state, "Task status updated"),
        }
        Ok(())
    }
}
