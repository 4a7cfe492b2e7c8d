//! Task supervisor
//!
//! Wraps handler invocations and resolves exactly one terminal state per task,
//! whichever way the handler exits.

use dashmap::DashMap;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::handler::{AgentHandler, TaskContext};
use crate::config::SupervisorConfig;
use crate::error::{Error, ValidationError};
use crate::request::{ParseResult, RequestSchema, ValidatedRequest, normalize};
use crate::task::{
    Task, TaskHandle, TaskId, TaskState, TaskStatusSink, TerminalSource, TerminalState,
    TerminalWrite,
};
use crate::validation::ValidationReport;
use crate::Result;

/// How a supervised run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    /// Recorded terminal state
    pub state: TaskState,
    /// Writer that recorded it
    pub terminated_by: Option<TerminalSource>,
    /// Recorded failure or cancellation cause
    pub error: Option<String>,
    /// Handler error that arrived after the task was already terminal
    pub suppressed_error: Option<String>,
    /// Status updates the sink failed to accept
    pub sink_failures: u32,
}

impl TaskOutcome {
    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }
}

/// How the handler future finished
enum HandlerExit {
    Returned(anyhow::Result<()>),
    Panicked(String),
    DeadlineExceeded,
}

/// Supervisor driving agent tasks through their lifecycle
///
/// Cloning is cheap; clones share the task registry and sink.
#[derive(Clone)]
pub struct TaskSupervisor {
    config: Arc<SupervisorConfig>,
    sink: Arc<dyn TaskStatusSink>,
    admission: Option<Arc<ValidationReport>>,
    tasks: Arc<DashMap<TaskId, TaskHandle>>,
}

impl TaskSupervisor {
    /// Create a supervisor publishing to `sink`
    pub fn new(config: Arc<SupervisorConfig>, sink: Arc<dyn TaskStatusSink>) -> Self {
        Self {
            config,
            sink,
            admission: None,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Only admit tasks for agents that validated cleanly in `report`
    pub fn with_admission(mut self, report: ValidationReport) -> Self {
        self.admission = Some(Arc::new(report));
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Create a task in the `submitted` state for an admitted agent
    pub fn submit(&self, agent_name: &str) -> Result<TaskHandle> {
        self.check_admission(agent_name)?;

        let handle = TaskHandle::new(Task::new(agent_name));
        info!(task_id = %handle.id(), agent = %agent_name, "Task submitted");
        self.tasks.insert(handle.id().clone(), handle.clone());
        Ok(handle)
    }

    fn check_admission(&self, agent_name: &str) -> Result<()> {
        let verdict = match &self.admission {
            Some(report) => report.problems_for(agent_name),
            None if self.config.require_admission => {
                Some(vec!["no validation report configured".to_string()])
            }
            None => Some(vec![]),
        };

        match verdict {
            Some(problems) if problems.is_empty() => Ok(()),
            Some(problems) => {
                warn!(agent = %agent_name, "Submission refused: agent failed validation");
                Err(Error::AgentNotAdmitted {
                    agent: agent_name.to_string(),
                    problems,
                })
            }
            None if self.config.require_admission => {
                warn!(agent = %agent_name, "Submission refused: agent not in validation report");
                Err(Error::AgentNotAdmitted {
                    agent: agent_name.to_string(),
                    problems: vec!["agent missing from validation report".to_string()],
                })
            }
            None => Ok(()),
        }
    }

    /// Look up a task by ID
    pub fn get(&self, task_id: &TaskId) -> Option<TaskHandle> {
        self.tasks.get(task_id).map(|entry| entry.value().clone())
    }

    /// All tasks currently tracked
    pub fn tasks(&self) -> Vec<TaskHandle> {
        self.tasks.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Stop tracking a task
    pub fn forget(&self, task_id: &TaskId) -> Option<TaskHandle> {
        self.tasks.remove(task_id).map(|(_, handle)| handle)
    }

    /// Run `handler` on `task` and resolve exactly one terminal state.
    ///
    /// Fails with [`Error::InvalidState`] if a run already started or the
    /// task is terminal;
    /// handler errors and panics are recorded on the task instead of
    /// being returned.
    pub async fn run<T, H>(
        &self,
        task: &TaskHandle,
        handler: &H,
        request: ValidatedRequest<T>,
    ) -> Result<TaskOutcome>
    where
        T: Send + 'static,
        H: AgentHandler<T> + ?Sized,
    {
        task.begin(self.sink.as_ref()).await?;
        info!(task_id = %task.id(), agent = %task.agent_name(), "Task started");

        let ctx = TaskContext::new(task.clone(), self.sink.clone());
        let work = AssertUnwindSafe(handler.handle(ctx, request)).catch_unwind();

        let exit = match self.config.task_deadline() {
            Some(deadline) => match tokio::time::timeout(deadline, work).await {
                Ok(result) => HandlerExit::from_unwind(result),
                Err(_) => HandlerExit::DeadlineExceeded,
            },
            None => HandlerExit::from_unwind(work.await),
        };

        let suppressed_error = self.resolve(task, exit).await;
        Ok(self.outcome(task, suppressed_error).await)
    }

    /// Normalize raw parser output, then run the handler on it.
    ///
    /// A normalization failure fails the task without invoking the handler.
    pub async fn execute<T, H>(
        &self,
        task: &TaskHandle,
        handler: &H,
        raw: ParseResult<T>,
    ) -> Result<TaskOutcome>
    where
        T: RequestSchema + Send + 'static,
        H: AgentHandler<T> + ?Sized,
    {
        match normalize(raw) {
            Ok(request) => self.run(task, handler, request).await,
            Err(e) => self.fail_before_handler(task, e).await,
        }
    }

    /// Like [`execute`](Self::execute) for parser output that is untyped JSON
    pub async fn execute_value<T, H>(
        &self,
        task: &TaskHandle,
        handler: &H,
        raw: JsonValue,
    ) -> Result<TaskOutcome>
    where
        T: RequestSchema + DeserializeOwned + Send + 'static,
        H: AgentHandler<T> + ?Sized,
    {
        match ParseResult::from_value(raw) {
            Ok(parsed) => self.execute(task, handler, parsed).await,
            Err(e) => self.fail_before_handler(task, e).await,
        }
    }

    /// Drive a run on its own tokio task
    pub fn spawn<T, H>(
        &self,
        task: TaskHandle,
        handler: Arc<H>,
        request: ValidatedRequest<T>,
    ) -> JoinHandle<Result<TaskOutcome>>
    where
        T: Send + 'static,
        H: AgentHandler<T> + ?Sized + 'static,
    {
        let supervisor = self.clone();
        tokio::spawn(async move { supervisor.run(&task, handler.as_ref(), request).await })
    }

    /// Cancel a task unless it already reached a terminal state.
    ///
    /// Cancellation only records the state; a running handler can observe it
    /// through [`TaskContext::is_terminated`].
    pub async fn cancel(&self, task_id: &TaskId, reason: impl Into<String>) -> Result<TerminalWrite> {
        let task = self
            .get(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        let reason = reason.into();
        let write = task
            .terminate(
                TerminalState::Canceled,
                TerminalSource::Cancellation,
                Some(reason.clone()),
                &self.sink,
            )
            .await;

        match write {
            TerminalWrite::Recorded => {
                info!(task_id = %task_id, "Task canceled: {}", reason);
            }
            TerminalWrite::AlreadyTerminal(state) => {
                debug!(task_id = %task_id, state = %state, "Cancellation ignored, task already terminal");
            }
        }
        Ok(write)
    }

    /// Bind a handler to an agent, giving a reusable supervised invocation
    pub fn wrap<T, H>(&self, agent_name: impl Into<String>, handler: Arc<H>) -> Supervised<T, H>
    where
        T: RequestSchema + Send + 'static,
        H: AgentHandler<T> + ?Sized,
    {
        Supervised {
            supervisor: self.clone(),
            agent_name: agent_name.into(),
            handler,
            _request: std::marker::PhantomData,
        }
    }

    /// Apply the terminal decision for a finished handler.
    ///
    /// Returns the handler's error text when it lost to an earlier terminal write.
    async fn resolve(&self, task: &TaskHandle, exit: HandlerExit) -> Option<String> {
        let sink = &self.sink;
        match exit {
            HandlerExit::Returned(Ok(())) => {
                let write = task
                    .terminate(TerminalState::Completed, TerminalSource::Supervisor, None, sink)
                    .await;
                if let TerminalWrite::AlreadyTerminal(state) = write {
                    debug!(task_id = %task.id(), state = %state, "Handler already ended the task");
                }
                None
            }
            HandlerExit::Returned(Err(e)) => self.fail(task, format!("{e:#}")).await,
            HandlerExit::Panicked(message) => {
                self.fail(task, format!("handler panicked: {message}")).await
            }
            HandlerExit::DeadlineExceeded => {
                let write = task
                    .terminate(
                        TerminalState::Canceled,
                        TerminalSource::Cancellation,
                        Some("deadline exceeded".to_string()),
                        sink,
                    )
                    .await;
                if write.is_recorded() {
                    warn!(task_id = %task.id(), "Task deadline exceeded");
                }
                None
            }
        }
    }

    async fn fail(&self, task: &TaskHandle, message: String) -> Option<String> {
        let write = task
            .terminate(
                TerminalState::Failed,
                TerminalSource::Supervisor,
                Some(message.clone()),
                &self.sink,
            )
            .await;

        match write {
            TerminalWrite::Recorded => {
                warn!(task_id = %task.id(), "Task failed: {}", message);
                None
            }
            TerminalWrite::AlreadyTerminal(state) => {
                warn!(
                    task_id = %task.id(),
                    state = %state,
                    "Suppressed handler error after terminal state: {}",
                    message
                );
                Some(message)
            }
        }
    }

    async fn fail_before_handler(
        &self,
        task: &TaskHandle,
        error: ValidationError,
    ) -> Result<TaskOutcome> {
        task.begin(self.sink.as_ref()).await?;
        let suppressed_error = self.fail(task, error.to_string()).await;
        Ok(self.outcome(task, suppressed_error).await)
    }

    async fn outcome(&self, task: &TaskHandle, suppressed_error: Option<String>) -> TaskOutcome {
        task.flush().await;
        let record = task.snapshot().await;
        TaskOutcome {
            task_id: record.id,
            state: record.state,
            terminated_by: record.terminated_by,
            error: record.error,
            suppressed_error,
            sink_failures: task.sink_failures(),
        }
    }
}

impl HandlerExit {
    fn from_unwind(result: std::result::Result<anyhow::Result<()>, Box<dyn Any + Send>>) -> Self {
        match result {
            Ok(returned) => Self::Returned(returned),
            Err(payload) => Self::Panicked(panic_message(payload.as_ref())),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A handler bound to an agent and a supervisor
pub struct Supervised<T, H: ?Sized> {
    supervisor: TaskSupervisor,
    agent_name: String,
    handler: Arc<H>,
    _request: std::marker::PhantomData<fn(T)>,
}

impl<T, H> Supervised<T, H>
where
    T: RequestSchema + Send + 'static,
    H: AgentHandler<T> + ?Sized,
{
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Submit a new task for the bound agent and execute it
    pub async fn call(&self, raw: ParseResult<T>) -> Result<TaskOutcome> {
        let task = self.supervisor.submit(&self.agent_name)?;
        self.call_task(&task, raw).await
    }

    /// Execute on an already submitted task
    pub async fn call_task(&self, task: &TaskHandle, raw: ParseResult<T>) -> Result<TaskOutcome> {
        self.supervisor
            .execute(task, self.handler.as_ref(), raw)
            .await
    }
}
