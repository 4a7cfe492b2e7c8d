//! Handler contract
//!
//! A handler receives a [`TaskContext`] and a validated request. It may end the
//! task itself through [`TaskContext::mark_terminal`]; otherwise the
//! supervisor decides the terminal state from how the handler returns.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::request::ValidatedRequest;
use crate::task::{TaskHandle, TaskId, TaskStatusSink, TerminalSource, TerminalState, TerminalWrite};

/// Business logic executed under supervisor control
#[async_trait]
pub trait AgentHandler<T: Send + 'static>: Send + Sync {
    /// Perform the task's work
    ///
    /// Returning `Err` (or panicking) fails the task unless the handler
    /// already recorded a terminal state.
    async fn handle(&self, ctx: TaskContext, request: ValidatedRequest<T>) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into an [`AgentHandler`]
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler
///
/// ```rust,ignore
/// let handler = handler_fn(|ctx: TaskContext, request: ValidatedRequest<NewsQuery>| async move {
///     fetch_news(&request).await?;
///     Ok(())
/// });
/// ```
pub fn handler_fn<T, F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(TaskContext, ValidatedRequest<T>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    FnHandler(f)
}

#[async_trait]
impl<T, F, Fut> AgentHandler<T> for FnHandler<F>
where
    T: Send + 'static,
    F: Fn(TaskContext, ValidatedRequest<T>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: TaskContext, request: ValidatedRequest<T>) -> anyhow::Result<()> {
        (self.0)(ctx, request).await
    }
}

/// The handler's view of its task
#[derive(Clone)]
pub struct TaskContext {
    task: TaskHandle,
    sink: Arc<dyn TaskStatusSink>,
}

impl TaskContext {
    pub(crate) fn new(task: TaskHandle, sink: Arc<dyn TaskStatusSink>) -> Self {
        Self { task, sink }
    }

    pub fn task_id(&self) -> &TaskId {
        self.task.id()
    }

    pub fn agent_name(&self) -> &str {
        self.task.agent_name()
    }

    /// Whether any writer (this handler, a cancellation, a deadline) ended the task
    pub fn is_terminated(&self) -> bool {
        self.task.is_terminated()
    }

    /// Record a terminal state on behalf of the handler.
    ///
    /// Returns [`TerminalWrite::AlreadyTerminal`] if the task was already
    /// ended, for example by a concurrent cancellation.
    pub async fn mark_terminal(&self, state: TerminalState, message: Option<String>) -> TerminalWrite {
        self.task
            .terminate(state, TerminalSource::Handler, message, &self.sink)
            .await
    }

    pub async fn complete(&self) -> TerminalWrite {
        self.mark_terminal(TerminalState::Completed, None).await
    }

    pub async fn fail(&self, reason: impl Into<String>) -> TerminalWrite {
        self.mark_terminal(TerminalState::Failed, Some(reason.into())).await
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{InMemoryStatusSink, Task, TaskState};

    fn context() -> (TaskContext, Arc<InMemoryStatusSink>) {
        let sink = Arc::new(InMemoryStatusSink::new());
        let ctx = TaskContext::new(TaskHandle::new(Task::new("news_agent")), sink.clone());
        (ctx, sink)
    }

    #[tokio::test]
    async fn test_mark_terminal_records_handler_source() {
        let (ctx, sink) = context();
        assert!(!ctx.is_terminated());

        let write = ctx.fail("rate limited").await;

        assert!(write.is_recorded());
        assert!(ctx.is_terminated());
        assert_eq!(ctx.agent_name(), "news_agent");
        let updates = sink.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].state, TaskState::Failed);
        assert_eq!(updates[0].message.as_deref(), Some("rate limited"));
    }

    #[tokio::test]
    async fn test_second_mark_terminal_is_rejected() {
        let (ctx, sink) = context();
        ctx.complete().await;

        let write = ctx
            .mark_terminal(TerminalState::Canceled, Some("late".to_string()))
            .await;

        assert_eq!(write, TerminalWrite::AlreadyTerminal(TaskState::Completed));
        assert_eq!(sink.states_for(ctx.task_id()), vec![TaskState::Completed]);
    }

    struct Headlines(String);

    impl crate::request::RequestSchema for Headlines {}

    #[tokio::test]
    async fn test_handler_fn_adapter() {
        let (ctx, _sink) = context();
        let handler = handler_fn(|ctx: TaskContext, req: ValidatedRequest<Headlines>| async move {
            anyhow::ensure!(!req.0.is_empty(), "empty request");
            ctx.complete().await;
            Ok(())
        });
        let request = crate::request::normalize(crate::request::ParseResult::Structured(
            Headlines("markets".to_string()),
        ))
        .unwrap();

        handler.handle(ctx.clone(), request).await.unwrap();
        assert!(ctx.is_terminated());
    }
}
