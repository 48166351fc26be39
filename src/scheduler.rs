//! Schedule submitter: reconciles a recurring-job definition against backend
//! state, replacing the job only when the definition materially changed.
//!
//! Replacement is delete-then-create rather than update: the backend's
//! update semantics for nested HTTP-target fields are unreliable across
//! field masks, so a full replace is the only way to guarantee the stored
//! job converges to the declared definition.

use croner::Cron;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::backend::types::{CreateJobRequest, HttpTarget, Job, RetryConfig};
use crate::backend::{BackendError, SchedulerClient};
use crate::constants::{DEFAULT_CREATE_TIMEOUT_MS, DEFAULT_TIME_ZONE};
use crate::errors::SubmitError;
use crate::hooks::{noop_hook, ScheduledJobHook};
use crate::queue::{job_path, parse_location_path};
use crate::request::Requester;
use crate::route::{CallArguments, RouteDescriptor};

/// Options binding a recurring submission to a scheduler location.
#[derive(Clone)]
pub struct ScheduleOptions {
    pub base_url: String,
    pub location_path: String,
    /// Cron expression driving dispatch.
    pub schedule: String,
    /// Job name; empty means derive from the route's unique id.
    pub name: String,
    pub time_zone: String,
    pub retry_config: RetryConfig,
    pub create_timeout: Duration,
    pub pre_create_hook: ScheduledJobHook,
    /// Replace the job unconditionally, skipping the change check.
    pub force: bool,
}

impl ScheduleOptions {
    pub fn new(
        base_url: impl Into<String>,
        location_path: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            location_path: location_path.into(),
            schedule: schedule.into(),
            name: String::new(),
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            retry_config: RetryConfig::default(),
            create_timeout: Duration::from_millis(DEFAULT_CREATE_TIMEOUT_MS),
            pre_create_hook: noop_hook(),
            force: false,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = tz.into();
        self
    }

    pub fn retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    pub fn pre_create_hook(mut self, hook: ScheduledJobHook) -> Self {
        self.pre_create_hook = hook;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Outcome of a best-effort job deletion.
///
/// Deletion failures are values, not errors: multiple service instances may
/// race to delete and recreate the same job on startup, and a job someone
/// else already deleted is a success for our purposes.
#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Failed(BackendError),
}

impl DeleteOutcome {
    /// Gone is gone, whoever got there first.
    pub fn is_gone(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted | DeleteOutcome::NotFound)
    }
}

/// Submits one route's reconstructed request as a recurring job.
///
/// Construction resolves the fully-qualified job id from the location path,
/// fails with `BadMethod` unless the route binds exactly one supported
/// method, and validates the cron expression locally so a bad schedule never
/// reaches the network.
pub struct Scheduler {
    requester: Requester,
    options: ScheduleOptions,
    client: Arc<dyn SchedulerClient>,
    job_id: String,
}

impl Scheduler {
    pub fn new(
        route: Arc<RouteDescriptor>,
        options: ScheduleOptions,
        client: Arc<dyn SchedulerClient>,
    ) -> Result<Self, SubmitError> {
        route.resolve_method()?;

        Cron::new(&options.schedule)
            .parse()
            .map_err(|e| SubmitError::InvalidCron {
                expression: options.schedule.clone(),
                details: e.to_string(),
            })?;

        let (project, location) = parse_location_path(&options.location_path)?;
        let name = if options.name.is_empty() {
            route.id().to_string()
        } else {
            options.name.clone()
        };
        let job_id = job_path(&project, &location, &name);

        let requester = Requester::new(route, &options.base_url);
        Ok(Self {
            requester,
            options,
            client,
            job_id,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Converge the backend job to this definition.
    ///
    /// Builds the job, runs the hook, then decides whether a replace is
    /// needed: forced, or the stored job (with backend-owned fields
    /// stripped) differs structurally, or it cannot be fetched at all.
    /// Repeated calls with identical arguments are no-ops after the first.
    #[instrument(skip_all, fields(job = %self.job_id))]
    pub async fn schedule(&self, args: &CallArguments) -> Result<(), SubmitError> {
        let built = self.requester.build(args)?;

        let job = Job {
            name: self.job_id.clone(),
            http_target: HttpTarget {
                http_method: built.method,
                uri: built.url,
                headers: built.headers,
                body: built.body,
                oidc_token: None,
            },
            schedule: self.options.schedule.clone(),
            time_zone: self.options.time_zone.clone(),
            retry_config: self.options.retry_config.clone(),
            attempt_deadline: None,
            user_update_time: None,
            state: None,
            status: None,
            last_attempt_time: None,
            schedule_time: None,
        };

        let request = CreateJobRequest {
            parent: self.options.location_path.clone(),
            job,
        };
        let request = (self.options.pre_create_hook)(request);

        if !self.options.force && !self.has_changed(&request).await {
            debug!("job definition unchanged, nothing to do");
            return Ok(());
        }

        // Delete and create. A failed delete is tolerated: another instance
        // may have deleted the job already, and create will tell us if the
        // name still exists.
        match self.delete().await {
            DeleteOutcome::Deleted => debug!("deleted previous job"),
            DeleteOutcome::NotFound => debug!("no previous job to delete"),
            DeleteOutcome::Failed(e) => warn!(error = %e, "job deletion failed, creating anyway"),
        }

        self.client
            .create_job(&request, self.options.create_timeout)
            .await?;
        info!(schedule = %self.options.schedule, "job created");
        Ok(())
    }

    /// Compare the stored job against the freshly built request, both
    /// sanitized so header ordering and backend-owned fields never count as a
    /// difference. Any fetch failure counts as changed: a job we cannot see
    /// is a job we must (re)create.
    async fn has_changed(&self, request: &CreateJobRequest) -> bool {
        match self
            .client
            .get_job(&request.job.name, self.options.create_timeout)
            .await
        {
            Ok(existing) => existing.sanitized() != request.job.sanitized(),
            Err(e) => {
                debug!(error = %e, "existing job not comparable, treating as changed");
                true
            }
        }
    }

    /// Delete the job if it exists, reporting the outcome as a value.
    pub async fn delete(&self) -> DeleteOutcome {
        match self
            .client
            .delete_job(&self.job_id, self.options.create_timeout)
            .await
        {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) if e.is_not_found() => DeleteOutcome::NotFound,
            Err(e) => DeleteOutcome::Failed(e),
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("job_id", &self.job_id)
            .field("schedule", &self.options.schedule)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::InMemoryScheduler;
    use crate::errors::BuildError;

    fn client() -> Arc<InMemoryScheduler> {
        Arc::new(InMemoryScheduler::new())
    }

    fn options(schedule: &str) -> ScheduleOptions {
        ScheduleOptions::new(
            "http://listener.example.com",
            "projects/p/locations/l",
            schedule,
        )
    }

    #[test]
    fn test_job_id_defaults_to_route_unique_id() {
        let route = Arc::new(RouteDescriptor::new("POST", "/timed_hello"));
        let scheduler = Scheduler::new(route, options("*/5 * * * *"), client()).unwrap();
        assert_eq!(scheduler.job_id(), "projects/p/locations/l/jobs/timed_hello");
    }

    #[test]
    fn test_explicit_name_wins() {
        let route = Arc::new(RouteDescriptor::new("POST", "/timed_hello"));
        let scheduler =
            Scheduler::new(route, options("*/5 * * * *").name("custom-name"), client()).unwrap();
        assert_eq!(scheduler.job_id(), "projects/p/locations/l/jobs/custom-name");
    }

    #[test]
    fn test_invalid_cron_rejected_at_construction() {
        for bad in ["not a cron", "banana", "* * *"] {
            let route = Arc::new(RouteDescriptor::new("POST", "/timed_hello"));
            let err = Scheduler::new(route, options(bad), client()).unwrap_err();
            assert!(matches!(err, SubmitError::InvalidCron { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_bad_method_rejected_at_construction() {
        let route = Arc::new(RouteDescriptor::new("POST", "/timed_hello").method("GET"));
        let err = Scheduler::new(route, options("*/5 * * * *"), client()).unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Build(BuildError::BadMethod { .. })
        ));
    }

    #[test]
    fn test_malformed_location_rejected() {
        let route = Arc::new(RouteDescriptor::new("POST", "/timed_hello"));
        let opts = ScheduleOptions::new(
            "http://listener.example.com",
            "not/a/location",
            "*/5 * * * *",
        );
        let err = Scheduler::new(route, opts, client()).unwrap_err();
        assert!(matches!(err, SubmitError::Backend(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_job_reports_not_found() {
        let route = Arc::new(RouteDescriptor::new("POST", "/timed_hello"));
        let scheduler = Scheduler::new(route, options("*/5 * * * *"), client()).unwrap();
        let outcome = scheduler.delete().await;
        assert!(matches!(outcome, DeleteOutcome::NotFound));
        assert!(outcome.is_gone());
    }
}
