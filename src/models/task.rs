//! Server-side tasks, such as a deployment in progress.

use serde_json::Value;

use crate::collection::Collection;
use crate::context::Context;
use crate::error::{ConnectError, Result};
use crate::pagination::Pagination;
use crate::schema::{Actions, Schema};
use crate::traits::Queryable;

pub(crate) const TASK: Schema = Schema {
    name: "task",
    path: "v1/tasks",
    id_field: Some("id"),
    context_key: None,
    fields: &[],
    queries: &[],
    pagination: Pagination::None,
    actions: Actions::READ_ONLY,
};

/// Seconds the server may hold a poll open while the task is still running.
const POLL_WAIT_SECONDS: u32 = 1;

resource!(
    /// A unit of work the server runs in the background.
    ///
    /// A task is a snapshot: [`Task::poll`] and [`Task::wait_for`] return
    /// new values and leave the original untouched.
    Task => TASK
);

impl Task {
    pub fn id(&self) -> Result<&str> {
        self.0.field_str("id")
    }

    pub fn is_finished(&self) -> Result<bool> {
        Ok(self.0.field_opt("finished")?.unwrap_or(false))
    }

    /// Console lines the task has written so far.
    pub fn output(&self) -> Result<Vec<String>> {
        Ok(self.0.field_opt("output")?.unwrap_or_default())
    }

    /// Exit code, once the task has finished. Zero means success.
    pub fn error_code(&self) -> Result<Option<i64>> {
        if !self.is_finished()? {
            return Ok(None);
        }
        self.0.field_opt("code")
    }

    /// Failure description, or `None` if the task has not failed.
    pub fn error_message(&self) -> Result<Option<String>> {
        let message: Option<String> = self.0.field_opt("error")?;
        Ok(message.filter(|m| !m.is_empty()))
    }

    /// What the task produced, if it reports anything.
    pub fn result(&self) -> Option<&Value> {
        self.0.raw().get("result").filter(|r| !r.is_null())
    }

    /// Re-read the task.
    ///
    /// `first` skips that many output lines; `wait` lets the server hold the
    /// request up to that many seconds for new output.
    pub async fn poll(&self, first: usize, wait: u32) -> Result<Self> {
        let params = vec![
            ("first".to_string(), first.to_string()),
            ("wait".to_string(), wait.to_string()),
        ];
        Ok(Self(self.0.refresh_with(params).await?))
    }

    /// Poll until the task finishes and return its final state.
    #[tracing::instrument(skip(self), fields(task = ?self.0.id()))]
    pub async fn wait_for(&self) -> Result<Self> {
        let mut task = self.clone();
        while !task.is_finished()? {
            task = task.poll(0, POLL_WAIT_SECONDS).await?;
            tracing::debug!(lines = task.output()?.len(), "task polled");
        }
        Ok(task)
    }
}

/// Look up the task the server answered with after starting work.
///
/// `body` must carry the task's identifier as `task_id`.
pub(crate) async fn started_task(ctx: &Context, path: &str, body: &Value) -> Result<Task> {
    let task_id = match body.get("task_id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(ConnectError::UnexpectedResponse {
                path: path.to_string(),
                reason: "missing 'task_id'".to_string(),
            })
        }
    };
    Collection::<Task>::new(ctx)?.get(&task_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use crate::testing::{context, param, StubTransport};
    use crate::transport::Response;

    #[tokio::test]
    async fn test_started_task_fetches_by_id() {
        let (ctx, transport) = context(StubTransport::new(|request| {
            assert_eq!(request.path, "v1/tasks/t1");
            Ok(Response::ok(json!({"id": "t1", "finished": false, "output": ["Building"]})))
        }));

        let task = started_task(&ctx, "v1/content/c1/deploy", &json!({"task_id": "t1"}))
            .await
            .unwrap();

        assert_eq!(task.id().unwrap(), "t1");
        assert!(!task.is_finished().unwrap());
        assert_eq!(task.output().unwrap(), vec!["Building".to_string()]);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_started_task_requires_task_id() {
        let (ctx, transport) = context(StubTransport::default());

        let result = started_task(&ctx, "v1/content/c1/deploy", &json!({})).await;

        assert!(matches!(result, Err(ConnectError::UnexpectedResponse { .. })));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_error_code_hidden_until_finished() {
        let (ctx, _) = context(StubTransport::new(|request| {
            let finished = request.path == "v1/tasks/done";
            let error = if finished { "exit status 1" } else { "" };
            Ok(Response::ok(json!({
                "id": request.path.trim_start_matches("v1/tasks/"),
                "finished": finished,
                "code": 1,
                "error": error,
            })))
        }));
        let tasks = Collection::<Task>::new(&ctx).unwrap();

        let running = tasks.get("running").await.unwrap();
        assert_eq!(running.error_code().unwrap(), None);
        assert_eq!(running.error_message().unwrap(), None);

        let done = tasks.get("done").await.unwrap();
        assert_eq!(done.error_code().unwrap(), Some(1));
        assert_eq!(done.error_message().unwrap().as_deref(), Some("exit status 1"));
    }

    #[tokio::test]
    async fn test_wait_for_polls_until_finished() {
        let polls = AtomicUsize::new(0);
        let (ctx, transport) = context(StubTransport::new(move |_| {
            let n = polls.fetch_add(1, Ordering::SeqCst);
            let output = vec!["line"; n];
            let result = if n >= 3 { json!({"type": "deploy"}) } else { Value::Null };
            Ok(Response::ok(json!({
                "id": "t1",
                "finished": n >= 3,
                "output": output,
                "code": 0,
                "result": result,
            })))
        }));

        let task = Collection::<Task>::new(&ctx).unwrap().get("t1").await.unwrap();
        let done = task.wait_for().await.unwrap();

        assert!(done.is_finished().unwrap());
        assert_eq!(done.error_code().unwrap(), Some(0));
        assert_eq!(done.result(), Some(&json!({"type": "deploy"})));
        assert!(!task.is_finished().unwrap());

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(param(&requests[1], "wait"), Some("1"));
        assert_eq!(param(&requests[1], "first"), Some("0"));
    }
}
