//! Endpoint registration: the glue between route declarations and the
//! submitters.
//!
//! Registering a route with a builder returns a handle exposing the
//! submission methods, instead of mutating the route handler the way the
//! classic mixin approach does. A service holds one builder per queue (or
//! scheduler location) and one handle per endpoint:
//!
//! ```rust,ignore
//! let delayed = DelayedRouteBuilder::new(base_url, queue_path, client);
//! let on_user_create = delayed
//!     .register(
//!         RouteDescriptor::new("POST", "/on_user_create/{user_id}")
//!             .body(BodySpec::new("data", JsonType::Object)),
//!     )
//!     .await?;
//!
//! on_user_create
//!     .delay(&CallArguments::new().arg("user_id", "007").arg("data", json!({"name": "Piyush"})))
//!     .await?;
//! ```
//!
//! Default submission overrides can be attached at registration time and are
//! merged under call-time overrides; call-time wins.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::backend::types::{RetryConfig, Task};
use crate::backend::{SchedulerClient, TaskQueueClient};
use crate::constants::DEFAULT_CREATE_TIMEOUT_MS;
use crate::delayer::{DelayOptions, Delayer};
use crate::errors::{BuildError, SubmitError};
use crate::hooks::{noop_hook, DelayedTaskHook, ScheduledJobHook};
use crate::queue::ensure_queue;
use crate::route::{CallArguments, RouteDescriptor};
use crate::scheduler::{ScheduleOptions, Scheduler};

/// Per-call or per-endpoint overrides for delayed submission.
#[derive(Clone, Default)]
pub struct DelayOverrides {
    pub create_timeout: Option<Duration>,
    pub pre_create_hook: Option<DelayedTaskHook>,
    pub task_id: Option<String>,
    pub countdown: Option<i64>,
}

impl DelayOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = Some(timeout);
        self
    }

    pub fn pre_create_hook(mut self, hook: DelayedTaskHook) -> Self {
        self.pre_create_hook = Some(hook);
        self
    }

    pub fn task_id(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    pub fn countdown(mut self, seconds: i64) -> Self {
        self.countdown = Some(seconds);
        self
    }

    /// Merge two override sets; values in `self` win over `under`.
    fn merged_under(self, under: &DelayOverrides) -> DelayOverrides {
        DelayOverrides {
            create_timeout: self.create_timeout.or(under.create_timeout),
            pre_create_hook: self.pre_create_hook.or_else(|| under.pre_create_hook.clone()),
            task_id: self.task_id.or_else(|| under.task_id.clone()),
            countdown: self.countdown.or(under.countdown),
        }
    }
}

/// Builder for endpoints whose requests are submitted to one task queue.
///
/// The queue is provisioned lazily, once, before the first registration
/// completes (unless `auto_create_queue(false)`).
pub struct DelayedRouteBuilder {
    base_url: String,
    queue_path: String,
    create_timeout: Duration,
    pre_create_hook: DelayedTaskHook,
    client: Arc<dyn TaskQueueClient>,
    auto_create_queue: bool,
    provisioned: OnceCell<()>,
}

impl DelayedRouteBuilder {
    pub fn new(
        base_url: impl Into<String>,
        queue_path: impl Into<String>,
        client: Arc<dyn TaskQueueClient>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            queue_path: queue_path.into(),
            create_timeout: Duration::from_millis(DEFAULT_CREATE_TIMEOUT_MS),
            pre_create_hook: noop_hook(),
            client,
            auto_create_queue: true,
            provisioned: OnceCell::new(),
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

    pub fn auto_create_queue(mut self, enabled: bool) -> Self {
        self.auto_create_queue = enabled;
        self
    }

    /// Register a route, returning its submission handle.
    pub async fn register(&self, route: RouteDescriptor) -> Result<DelayedEndpoint, SubmitError> {
        self.register_with_defaults(route, DelayOverrides::default())
            .await
    }

    /// Register a route with default submission overrides attached. The
    /// defaults merge under call-time overrides; call-time wins.
    pub async fn register_with_defaults(
        &self,
        route: RouteDescriptor,
        defaults: DelayOverrides,
    ) -> Result<DelayedEndpoint, SubmitError> {
        route.resolve_method()?;

        if self.auto_create_queue {
            self.provisioned
                .get_or_try_init(|| async {
                    ensure_queue(self.client.as_ref(), &self.queue_path, self.create_timeout).await
                })
                .await?;
        }

        debug!(route = %route.id(), queue = %self.queue_path, "registered delayed endpoint");
        Ok(DelayedEndpoint {
            route: Arc::new(route),
            base_url: self.base_url.clone(),
            queue_path: self.queue_path.clone(),
            create_timeout: self.create_timeout,
            pre_create_hook: self.pre_create_hook.clone(),
            client: self.client.clone(),
            defaults,
        })
    }
}

/// Submission handle for one registered delayed endpoint.
pub struct DelayedEndpoint {
    route: Arc<RouteDescriptor>,
    base_url: String,
    queue_path: String,
    create_timeout: Duration,
    pre_create_hook: DelayedTaskHook,
    client: Arc<dyn TaskQueueClient>,
    defaults: DelayOverrides,
}

impl DelayedEndpoint {
    pub fn route(&self) -> &Arc<RouteDescriptor> {
        &self.route
    }

    /// Build a [`Delayer`] with per-call overrides applied over the
    /// endpoint's registered defaults.
    pub fn options(&self, overrides: DelayOverrides) -> Result<Delayer, BuildError> {
        let merged = overrides.merged_under(&self.defaults);
        let mut opts = DelayOptions::new(self.base_url.clone(), self.queue_path.clone())
            .create_timeout(merged.create_timeout.unwrap_or(self.create_timeout))
            .pre_create_hook(
                merged
                    .pre_create_hook
                    .unwrap_or_else(|| self.pre_create_hook.clone()),
            )
            .countdown(merged.countdown.unwrap_or(0));
        if let Some(id) = merged.task_id {
            opts = opts.task_id(id);
        }
        Delayer::new(self.route.clone(), opts, self.client.clone())
    }

    /// Enqueue a task with the endpoint's default options.
    pub async fn delay(&self, args: &CallArguments) -> Result<Task, SubmitError> {
        self.options(DelayOverrides::default())?.delay(args).await
    }
}

impl fmt::Debug for DelayedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedEndpoint")
            .field("route", &self.route.id())
            .field("queue_path", &self.queue_path)
            .finish()
    }
}

/// Per-call overrides for scheduled submission.
#[derive(Clone, Default)]
pub struct ScheduleOverrides {
    pub time_zone: Option<String>,
    pub retry_config: Option<RetryConfig>,
    pub create_timeout: Option<Duration>,
    pub pre_create_hook: Option<ScheduledJobHook>,
    pub force: Option<bool>,
}

impl ScheduleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = Some(tz.into());
        self
    }

    pub fn retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = Some(retry_config);
        self
    }

    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = Some(timeout);
        self
    }

    pub fn pre_create_hook(mut self, hook: ScheduledJobHook) -> Self {
        self.pre_create_hook = Some(hook);
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }
}

/// Builder for endpoints whose requests are dispatched on a recurring
/// schedule.
pub struct ScheduledRouteBuilder {
    base_url: String,
    location_path: String,
    create_timeout: Duration,
    pre_create_hook: ScheduledJobHook,
    client: Arc<dyn SchedulerClient>,
}

impl ScheduledRouteBuilder {
    pub fn new(
        base_url: impl Into<String>,
        location_path: impl Into<String>,
        client: Arc<dyn SchedulerClient>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            location_path: location_path.into(),
            create_timeout: Duration::from_millis(DEFAULT_CREATE_TIMEOUT_MS),
            pre_create_hook: noop_hook(),
            client,
        }
    }

    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    pub fn pre_create_hook(mut self, hook: ScheduledJobHook) -> Self {
        self.pre_create_hook = hook;
        self
    }

    /// Register a route, returning its scheduling handle.
    pub fn register(&self, route: RouteDescriptor) -> Result<ScheduledEndpoint, BuildError> {
        route.resolve_method()?;
        debug!(route = %route.id(), location = %self.location_path, "registered scheduled endpoint");
        Ok(ScheduledEndpoint {
            route: Arc::new(route),
            base_url: self.base_url.clone(),
            location_path: self.location_path.clone(),
            create_timeout: self.create_timeout,
            pre_create_hook: self.pre_create_hook.clone(),
            client: self.client.clone(),
        })
    }
}

/// Scheduling handle for one registered endpoint.
pub struct ScheduledEndpoint {
    route: Arc<RouteDescriptor>,
    base_url: String,
    location_path: String,
    create_timeout: Duration,
    pre_create_hook: ScheduledJobHook,
    client: Arc<dyn SchedulerClient>,
}

impl ScheduledEndpoint {
    pub fn route(&self) -> &Arc<RouteDescriptor> {
        &self.route
    }

    /// Build a [`Scheduler`] for this endpoint under the given name and cron
    /// schedule, with per-call overrides applied.
    pub fn scheduler(
        &self,
        name: &str,
        schedule: &str,
        overrides: ScheduleOverrides,
    ) -> Result<Scheduler, SubmitError> {
        let mut opts = ScheduleOptions::new(
            self.base_url.clone(),
            self.location_path.clone(),
            schedule,
        )
        .name(name)
        .create_timeout(overrides.create_timeout.unwrap_or(self.create_timeout))
        .pre_create_hook(
            overrides
                .pre_create_hook
                .unwrap_or_else(|| self.pre_create_hook.clone()),
        )
        .force(overrides.force.unwrap_or(false));
        if let Some(tz) = overrides.time_zone {
            opts = opts.time_zone(tz);
        }
        if let Some(rc) = overrides.retry_config {
            opts = opts.retry_config(rc);
        }
        Scheduler::new(self.route.clone(), opts, self.client.clone())
    }
}

impl fmt::Debug for ScheduledEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledEndpoint")
            .field("route", &self.route.id())
            .field("location_path", &self.location_path)
            .finish()
    }
}
