//! Backend client abstractions for the task queue and scheduler services.
//!
//! The submitters talk to the backends through the [`TaskQueueClient`] and
//! [`SchedulerClient`] traits so implementations can be swapped per
//! deployment: the in-memory clients for development and tests, the REST
//! clients for the hosted services. All calls are single-shot; retry and
//! backoff are the backend's responsibility.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod rest;
pub mod types;

use types::{CreateJobRequest, CreateQueueRequest, CreateTaskRequest, Job, Queue, Task};

/// Errors surfaced by backend calls. Never retried locally.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("error-taskroute-backend-1 Resource not found: {name}")]
    NotFound { name: String },

    #[error("error-taskroute-backend-2 Resource already exists: {name}")]
    AlreadyExists { name: String },

    #[error("error-taskroute-backend-3 Call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("error-taskroute-backend-4 Transport failure: {details}")]
    Transport { details: String },

    #[error("error-taskroute-backend-5 Backend returned status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("error-taskroute-backend-6 Malformed resource path: {path}")]
    MalformedPath { path: String },
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, BackendError::AlreadyExists { .. })
    }
}

/// Client for the task-queue service.
#[async_trait]
pub trait TaskQueueClient: Send + Sync {
    /// Create a task under `request.parent`. A task that names an already
    /// existing task fails with `AlreadyExists`; dedup callers treat that as
    /// success.
    async fn create_task(
        &self,
        request: &CreateTaskRequest,
        timeout: Duration,
    ) -> Result<Task, BackendError>;

    /// Create a queue under `request.parent`. Fails with `AlreadyExists` if
    /// the queue is already provisioned.
    async fn create_queue(
        &self,
        request: &CreateQueueRequest,
        timeout: Duration,
    ) -> Result<Queue, BackendError>;
}

/// Client for the scheduler service.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn create_job(
        &self,
        request: &CreateJobRequest,
        timeout: Duration,
    ) -> Result<Job, BackendError>;

    async fn get_job(&self, name: &str, timeout: Duration) -> Result<Job, BackendError>;

    async fn delete_job(&self, name: &str, timeout: Duration) -> Result<(), BackendError>;
}
