//! Pre-submission hook pipeline.
//!
//! A hook is a pure transformation over a create-request: same shape in and
//! out, no I/O. Hooks compose left-to-right with [`chained_hook`] and run
//! once, in memory, immediately before the backend call, which keeps them
//! deterministic and unit-testable without network access.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::types::{CreateJobRequest, CreateTaskRequest, OidcToken};

/// A pure transformation applied to an outbound create-request.
pub type Hook<R> = Arc<dyn Fn(R) -> R + Send + Sync>;

/// Hook over task creation requests.
pub type DelayedTaskHook = Hook<CreateTaskRequest>;

/// Hook over job creation requests.
pub type ScheduledJobHook = Hook<CreateJobRequest>;

/// The identity hook.
pub fn noop_hook<R: 'static>() -> Hook<R> {
    Arc::new(|request| request)
}

/// Compose hooks left-to-right: the output of each feeds the next.
pub fn chained_hook<R: 'static>(hooks: impl IntoIterator<Item = Hook<R>>) -> Hook<R> {
    let hooks: Vec<Hook<R>> = hooks.into_iter().collect();
    Arc::new(move |mut request| {
        for hook in &hooks {
            request = hook(request);
        }
        request
    })
}

/// Attach a service-account identity token to the task's HTTP request.
pub fn oidc_delayed_hook(token: OidcToken) -> DelayedTaskHook {
    Arc::new(move |mut request| {
        request.task.http_request.oidc_token = Some(token.clone());
        request
    })
}

/// Attach a service-account identity token to the job's HTTP target.
pub fn oidc_scheduled_hook(token: OidcToken) -> ScheduledJobHook {
    Arc::new(move |mut request| {
        request.job.http_target.oidc_token = Some(token.clone());
        request
    })
}

/// Set the dispatch deadline on the task.
pub fn deadline_delayed_hook(deadline: Duration) -> DelayedTaskHook {
    Arc::new(move |mut request| {
        request.task.dispatch_deadline = Some(deadline);
        request
    })
}

/// Set the attempt deadline on the job.
pub fn deadline_scheduled_hook(deadline: Duration) -> ScheduledJobHook {
    Arc::new(move |mut request| {
        request.job.attempt_deadline = Some(deadline);
        request
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::{HttpMethod, HttpRequest, Task};
    use ordermap::OrderMap;

    fn sample_request() -> CreateTaskRequest {
        CreateTaskRequest {
            parent: "projects/p/locations/l/queues/q".to_string(),
            task: Task {
                name: None,
                http_request: HttpRequest {
                    http_method: HttpMethod::Post,
                    url: "http://listener.example.com/hello".to_string(),
                    headers: OrderMap::new(),
                    body: None,
                    oidc_token: None,
                },
                schedule_time: None,
                dispatch_deadline: None,
            },
        }
    }

    #[test]
    fn test_noop_hook_is_identity() {
        let request = sample_request();
        let out = noop_hook()(request.clone());
        assert_eq!(out, request);
    }

    #[test]
    fn test_chained_hook_runs_left_to_right() {
        let first: DelayedTaskHook = Arc::new(|mut r| {
            r.task.http_request.url.push_str("/first");
            r
        });
        let second: DelayedTaskHook = Arc::new(|mut r| {
            r.task.http_request.url.push_str("/second");
            r
        });
        let out = chained_hook([first, second])(sample_request());
        assert!(out.task.http_request.url.ends_with("/first/second"));
    }

    #[test]
    fn test_oidc_and_deadline_hooks() {
        let hook = chained_hook([
            oidc_delayed_hook(OidcToken::new("svc@project.iam.gserviceaccount.com")),
            deadline_delayed_hook(Duration::from_secs(1800)),
        ]);
        let out = hook(sample_request());
        assert_eq!(
            out.task
                .http_request
                .oidc_token
                .unwrap()
                .service_account_email,
            "svc@project.iam.gserviceaccount.com"
        );
        assert_eq!(out.task.dispatch_deadline, Some(Duration::from_secs(1800)));
    }
}
