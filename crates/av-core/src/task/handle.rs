//! Per-task terminal cell
//!
//! Every state write for a task goes through one `TaskHandle`. The check for
//! "already terminal" and the write itself happen while holding the task's
//! own lock, so two terminal writers can never both succeed. The `working`
//! update is published under that lock; the single terminal update is
//! handed to a spawned delivery before the lock is released.

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::sink::TaskStatusSink;
use super::types::{Task, TaskId, TaskState, TerminalSource, TerminalState};
use crate::error::InvalidStateError;

/// Result of a terminal write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalWrite {
    /// This write won and is now the task's terminal state
    Recorded,
    /// Another writer got there first; carries the state it recorded
    AlreadyTerminal(TaskState),
}

impl TerminalWrite {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded)
    }
}

/// In-flight delivery of the terminal status update
type TerminalDelivery = Shared<BoxFuture<'static, ()>>;

struct TaskCell {
    id: TaskId,
    agent_name: String,
    record: Mutex<Task>,
    terminated: AtomicBool,
    sink_failures: AtomicU32,
    terminal_delivery: std::sync::Mutex<Option<TerminalDelivery>>,
}

impl TaskCell {
    async fn publish(&self, sink: &dyn TaskStatusSink, state: TaskState, message: Option<&str>) {
        if let Err(e) = sink.update_status(&self.id, state, message).await {
            self.sink_failures.fetch_add(1, Ordering::AcqRel);
            warn!(task_id = %self.id, state = %state, "Status sink delivery failed: {}", e);
        }
    }
}

/// Shared handle to one supervised task
#[derive(Clone)]
pub struct TaskHandle {
    cell: Arc<TaskCell>,
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.cell.id)
            .field("agent_name", &self.cell.agent_name)
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

impl TaskHandle {
    pub(crate) fn new(task: Task) -> Self {
        Self {
            cell: Arc::new(TaskCell {
                id: task.id.clone(),
                agent_name: task.agent_name.clone(),
                terminated: AtomicBool::new(task.terminated),
                record: Mutex::new(task),
                sink_failures: AtomicU32::new(0),
                terminal_delivery: std::sync::Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.cell.id
    }

    pub fn agent_name(&self) -> &str {
        &self.cell.agent_name
    }

    /// Whether a terminal state has been recorded
    pub fn is_terminated(&self) -> bool {
        self.cell.terminated.load(Ordering::Acquire)
    }

    /// Number of status updates the sink failed to accept
    pub fn sink_failures(&self) -> u32 {
        self.cell.sink_failures.load(Ordering::Acquire)
    }

    /// Copy of the current task record
    pub async fn snapshot(&self) -> Task {
        self.cell.record.lock().await.clone()
    }

    /// Move the task to `working` and publish it.
    ///
    /// Fails when a run already started or the task is terminal.
    pub(crate) async fn begin(
        &self,
        sink: &dyn TaskStatusSink,
    ) -> std::result::Result<(), InvalidStateError> {
        let mut record = self.cell.record.lock().await;
        if record.terminated || record.state == TaskState::Working {
            return Err(InvalidStateError {
                task_id: record.id.clone(),
                state: record.state,
                operation: "run",
            });
        }

        record.state = TaskState::Working;
        record.updated_at = Utc::now();
        debug!(task_id = %record.id, "Task transitioned to working");
        self.cell.publish(sink, TaskState::Working, None).await;
        Ok(())
    }

    /// Record a terminal state unless one is already recorded.
    ///
    /// This is the only path that sets `terminated`. The terminal update is
    /// delivered on its own tokio task, so dropping the caller (a handler
    /// overrunning its deadline) cannot lose it; [`flush`](Self::flush)
    /// waits for that delivery.
    pub(crate) async fn terminate(
        &self,
        state: TerminalState,
        source: TerminalSource,
        message: Option<String>,
        sink: &Arc<dyn TaskStatusSink>,
    ) -> TerminalWrite {
        let mut record = self.cell.record.lock().await;
        if record.terminated {
            debug!(
                task_id = %record.id,
                existing = %record.state,
                requested = %state,
                "Terminal write ignored, task already terminal"
            );
            return TerminalWrite::AlreadyTerminal(record.state);
        }

        record.state = state.into();
        record.terminated = true;
        record.terminated_by = Some(source);
        record.updated_at = Utc::now();
        if state != TerminalState::Completed {
            record.error = message.clone();
        }
        self.cell.terminated.store(true, Ordering::Release);
        debug!(task_id = %record.id, state = %state, source = ?source, "Terminal state recorded");

        let delivery = self.deliver_terminal(sink.clone(), state.into(), message);
        drop(record);

        delivery.await;
        TerminalWrite::Recorded
    }

    /// Wait until the terminal update, if any, has reached the sink
    pub(crate) async fn flush(&self) {
        let pending = self
            .cell
            .terminal_delivery
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        if let Some(delivery) = pending {
            delivery.await;
        }
    }

    fn deliver_terminal(
        &self,
        sink: Arc<dyn TaskStatusSink>,
        state: TaskState,
        message: Option<String>,
    ) -> TerminalDelivery {
        let cell = self.cell.clone();
        let join = tokio::spawn(async move {
            cell.publish(sink.as_ref(), state, message.as_deref()).await;
        });

        let task_id = self.cell.id.clone();
        let delivery = async move {
            if let Err(e) = join.await {
                warn!(task_id = %task_id, "Terminal status delivery aborted: {}", e);
            }
        }
        .boxed()
        .shared();

        if let Ok(mut slot) = self.cell.terminal_delivery.lock() {
            *slot = Some(delivery.clone());
        }
        delivery
    }
}
