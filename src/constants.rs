//! Application-wide constants

/// Header prefix reserved for values the task queue injects on dispatch.
///
/// Any outbound header whose normalized name (lowercase, `-` folded to `_`)
/// starts with this prefix is stripped before submission so callers cannot
/// spoof queue-provided metadata.
pub(crate) const RESERVED_HEADER_PREFIX: &str = "x_cloudtasks_";

/// Inbound headers the queue attaches when it delivers a task.
pub(crate) const HEADER_TASK_RETRY_COUNT: &str = "x-cloudtasks-taskretrycount";
pub(crate) const HEADER_TASK_EXECUTION_COUNT: &str = "x-cloudtasks-taskexecutioncount";
pub(crate) const HEADER_QUEUE_NAME: &str = "x-cloudtasks-queuename";
pub(crate) const HEADER_TASK_NAME: &str = "x-cloudtasks-taskname";
pub(crate) const HEADER_TASK_ETA: &str = "x-cloudtasks-tasketa";
pub(crate) const HEADER_TASK_PREVIOUS_RESPONSE: &str = "x-cloudtasks-taskpreviousresponse";
pub(crate) const HEADER_TASK_RETRY_REASON: &str = "x-cloudtasks-taskretryreason";

/// REST endpoints for the hosted backends.
pub(crate) const CLOUD_TASKS_ENDPOINT: &str = "https://cloudtasks.googleapis.com/v2";
pub(crate) const CLOUD_SCHEDULER_ENDPOINT: &str = "https://cloudscheduler.googleapis.com/v1";

/// Default timeout for create/delete calls against the backends.
pub(crate) const DEFAULT_CREATE_TIMEOUT_MS: u64 = 10_000;

/// Default time zone for scheduled jobs.
pub(crate) const DEFAULT_TIME_ZONE: &str = "UTC";

/// Check whether an outbound header name is reserved for the queue.
pub(crate) fn is_reserved_header(name: &str) -> bool {
    name.to_ascii_lowercase()
        .replace('-', "_")
        .starts_with(RESERVED_HEADER_PREFIX)
}
