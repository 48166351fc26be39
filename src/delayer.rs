//! Delay submitter: wraps a reconstructed request into a task-creation
//! request for immediate or countdown-delayed execution.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::backend::types::{CreateTaskRequest, HttpRequest, Task};
use crate::backend::TaskQueueClient;
use crate::constants::DEFAULT_CREATE_TIMEOUT_MS;
use crate::errors::{BuildError, SubmitError};
use crate::hooks::{noop_hook, DelayedTaskHook};
use crate::request::Requester;
use crate::route::{CallArguments, RouteDescriptor};

/// Options binding a delayed submission to a queue.
#[derive(Clone)]
pub struct DelayOptions {
    pub base_url: String,
    pub queue_path: String,
    pub create_timeout: Duration,
    pub pre_create_hook: DelayedTaskHook,
    /// Optional dedup identifier: two submissions with the same id are
    /// idempotent at the backend.
    pub task_id: Option<String>,
    /// Seconds before the task becomes eligible for dispatch; zero or less
    /// means immediate.
    pub countdown: i64,
}

impl DelayOptions {
    pub fn new(base_url: impl Into<String>, queue_path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            queue_path: queue_path.into(),
            create_timeout: Duration::from_millis(DEFAULT_CREATE_TIMEOUT_MS),
            pre_create_hook: noop_hook(),
            task_id: None,
            countdown: 0,
        }
    }

    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    pub fn pre_create_hook(mut self, hook: DelayedTaskHook) -> Self {
        self.pre_create_hook = hook;
        self
    }

    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    pub fn countdown(mut self, seconds: i64) -> Self {
        self.countdown = seconds;
        self
    }
}

/// Submits one route's reconstructed requests as queue tasks.
///
/// Bound to a single route and a single set of options; construction fails
/// with `BadMethod` unless the route resolves to exactly one supported
/// method. Each `delay` call performs its own build, hook and single
/// `create_task` call.
pub struct Delayer {
    requester: Requester,
    options: DelayOptions,
    client: Arc<dyn TaskQueueClient>,
}

impl Delayer {
    pub fn new(
        route: Arc<RouteDescriptor>,
        options: DelayOptions,
        client: Arc<dyn TaskQueueClient>,
    ) -> Result<Self, BuildError> {
        // Only crash if we're being bound.
        route.resolve_method()?;
        let requester = Requester::new(route, &options.base_url);
        Ok(Self {
            requester,
            options,
            client,
        })
    }

    /// Enqueue one task delivering this route's reconstructed request.
    #[instrument(skip_all, fields(queue = %self.options.queue_path))]
    pub async fn delay(&self, args: &CallArguments) -> Result<Task, SubmitError> {
        let built = self.requester.build(args)?;

        let task = Task {
            name: self
                .options
                .task_id
                .as_ref()
                .map(|id| format!("{}/tasks/{}", self.options.queue_path, id)),
            http_request: HttpRequest {
                http_method: built.method,
                url: built.url,
                headers: built.headers,
                body: built.body,
                oidc_token: None,
            },
            schedule_time: self.schedule_time(),
            dispatch_deadline: None,
        };

        let request = CreateTaskRequest {
            parent: self.options.queue_path.clone(),
            task,
        };
        let request = (self.options.pre_create_hook)(request);

        debug!(
            url = %request.task.http_request.url,
            scheduled = request.task.schedule_time.is_some(),
            "submitting task"
        );
        match self
            .client
            .create_task(&request, self.options.create_timeout)
            .await
        {
            Ok(task) => Ok(task),
            // A named task that already exists is the dedup working: the
            // earlier submission won and this one carries the same work.
            Err(e) if e.is_already_exists() && request.task.name.is_some() => {
                debug!(task = ?request.task.name, "task already enqueued, skipping");
                Ok(request.task)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn schedule_time(&self) -> Option<DateTime<Utc>> {
        if self.options.countdown <= 0 {
            return None;
        }
        Some(Utc::now() + ChronoDuration::seconds(self.options.countdown))
    }
}

impl fmt::Debug for Delayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delayer")
            .field("route", &self.requester.route().id())
            .field("queue_path", &self.options.queue_path)
            .field("countdown", &self.options.countdown)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryTaskQueue;
    use crate::errors::BuildError;

    fn client() -> Arc<InMemoryTaskQueue> {
        Arc::new(InMemoryTaskQueue::new())
    }

    fn options() -> DelayOptions {
        DelayOptions::new(
            "http://listener.example.com",
            "projects/p/locations/l/queues/q",
        )
    }

    #[test]
    fn test_construction_rejects_multi_method_routes() {
        let route = Arc::new(RouteDescriptor::new("POST", "/hello").method("GET"));
        let err = Delayer::new(route, options(), client()).unwrap_err();
        assert!(matches!(err, BuildError::BadMethod { .. }));
    }

    #[test]
    fn test_construction_rejects_zero_method_routes() {
        let route = Arc::new(RouteDescriptor::new("POST", "/hello").clear_methods());
        let err = Delayer::new(route, options(), client()).unwrap_err();
        assert!(matches!(err, BuildError::BadMethod { .. }));
    }

    #[tokio::test]
    async fn test_countdown_zero_means_no_schedule_time() {
        let route = Arc::new(RouteDescriptor::new("POST", "/hello"));
        let delayer = Delayer::new(route, options(), client()).unwrap();
        let task = delayer.delay(&CallArguments::new()).await.unwrap();
        assert!(task.schedule_time.is_none());
    }

    #[tokio::test]
    async fn test_countdown_sets_absolute_schedule_time() {
        let route = Arc::new(RouteDescriptor::new("POST", "/hello"));
        let delayer = Delayer::new(route, options().countdown(60), client()).unwrap();
        let before = Utc::now();
        let task = delayer.delay(&CallArguments::new()).await.unwrap();
        let scheduled = task.schedule_time.unwrap();
        let offset = scheduled - before;
        assert!(offset >= ChronoDuration::seconds(59));
        assert!(offset <= ChronoDuration::seconds(61));
    }

    #[tokio::test]
    async fn test_task_id_builds_qualified_name() {
        let route = Arc::new(RouteDescriptor::new("POST", "/hello"));
        let delayer = Delayer::new(route, options().task_id("once-only"), client()).unwrap();
        let task = delayer.delay(&CallArguments::new()).await.unwrap();
        assert_eq!(
            task.name.as_deref(),
            Some("projects/p/locations/l/queues/q/tasks/once-only")
        );
    }

    #[tokio::test]
    async fn test_duplicate_task_id_is_tolerated() {
        let route = Arc::new(RouteDescriptor::new("POST", "/hello"));
        let client = client();
        let delayer = Delayer::new(route, options().task_id("once-only"), client.clone()).unwrap();
        delayer.delay(&CallArguments::new()).await.unwrap();
        let task = delayer.delay(&CallArguments::new()).await.unwrap();
        assert_eq!(
            task.name.as_deref(),
            Some("projects/p/locations/l/queues/q/tasks/once-only")
        );
        // Both calls reached the backend; only one task exists.
        assert_eq!(client.create_task_calls(), 2);
        assert_eq!(client.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_build_makes_no_backend_call() {
        let route = Arc::new(RouteDescriptor::new("POST", "/users/{user_id}"));
        let client = client();
        let delayer = Delayer::new(route, options(), client.clone()).unwrap();
        let err = delayer.delay(&CallArguments::new()).await.unwrap_err();
        assert!(matches!(err, SubmitError::Build(_)));
        assert_eq!(client.create_task_calls(), 0);
    }
}
