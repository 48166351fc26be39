//! REST clients for the hosted task-queue and scheduler services.
//!
//! Thin JSON clients over reqwest: one HTTP call per trait method, bearer
//! token auth when configured, and per-call timeouts. Status codes map onto
//! [`BackendError`]: 404 becomes `NotFound`, 409 becomes `AlreadyExists`,
//! anything else non-2xx becomes `Status`. The `emulator` constructors point
//! at a plain-HTTP emulator endpoint with no credentials.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::types::{CreateJobRequest, CreateQueueRequest, CreateTaskRequest, Job, Queue, Task};
use super::{BackendError, SchedulerClient, TaskQueueClient};
use crate::constants::{CLOUD_SCHEDULER_ENDPOINT, CLOUD_TASKS_ENDPOINT};
use async_trait::async_trait;

/// REST client for the task-queue service.
pub struct RestTaskQueueClient {
    http: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl RestTaskQueueClient {
    /// Client for the hosted service, authenticated with a bearer token.
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self::with_endpoint(CLOUD_TASKS_ENDPOINT, Some(auth_token.into()))
    }

    pub fn with_endpoint(endpoint: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Client for a local emulator, e.g. `emulator("localhost", 8123)`.
    pub fn emulator(host: &str, port: u16) -> Self {
        Self::with_endpoint(format!("http://{}:{}/v2", host, port), None)
    }
}

#[async_trait]
impl TaskQueueClient for RestTaskQueueClient {
    async fn create_task(
        &self,
        request: &CreateTaskRequest,
        timeout: Duration,
    ) -> Result<Task, BackendError> {
        let url = format!("{}/{}/tasks", self.endpoint, request.parent);
        debug!(parent = %request.parent, "creating task");
        let builder = authorize(
            self.http.post(&url).json(&json!({ "task": request.task })),
            &self.auth_token,
        );
        let name = request.task.name.as_deref().unwrap_or(&request.parent);
        execute(builder, name, timeout).await
    }

    async fn create_queue(
        &self,
        request: &CreateQueueRequest,
        timeout: Duration,
    ) -> Result<Queue, BackendError> {
        let url = format!("{}/{}/queues", self.endpoint, request.parent);
        debug!(queue = %request.queue.name, "creating queue");
        let builder = authorize(self.http.post(&url).json(&request.queue), &self.auth_token);
        execute(builder, &request.queue.name, timeout).await
    }
}

/// REST client for the scheduler service.
pub struct RestSchedulerClient {
    http: Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl RestSchedulerClient {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self::with_endpoint(CLOUD_SCHEDULER_ENDPOINT, Some(auth_token.into()))
    }

    pub fn with_endpoint(endpoint: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    pub fn emulator(host: &str, port: u16) -> Self {
        Self::with_endpoint(format!("http://{}:{}/v1", host, port), None)
    }
}

#[async_trait]
impl SchedulerClient for RestSchedulerClient {
    async fn create_job(
        &self,
        request: &CreateJobRequest,
        timeout: Duration,
    ) -> Result<Job, BackendError> {
        let url = format!("{}/{}/jobs", self.endpoint, request.parent);
        debug!(job = %request.job.name, "creating job");
        let builder = authorize(self.http.post(&url).json(&request.job), &self.auth_token);
        execute(builder, &request.job.name, timeout).await
    }

    async fn get_job(&self, name: &str, timeout: Duration) -> Result<Job, BackendError> {
        let url = format!("{}/{}", self.endpoint, name);
        let builder = authorize(self.http.get(&url), &self.auth_token);
        execute(builder, name, timeout).await
    }

    async fn delete_job(&self, name: &str, timeout: Duration) -> Result<(), BackendError> {
        let url = format!("{}/{}", self.endpoint, name);
        debug!(job = %name, "deleting job");
        let builder = authorize(self.http.delete(&url), &self.auth_token);
        execute::<serde_json::Value>(builder, name, timeout).await?;
        Ok(())
    }
}

fn authorize(builder: RequestBuilder, token: &Option<String>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn execute<T: DeserializeOwned>(
    builder: RequestBuilder,
    resource: &str,
    timeout: Duration,
) -> Result<T, BackendError> {
    let response = builder.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            BackendError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
        } else {
            BackendError::Transport {
                details: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| BackendError::Transport {
            details: e.to_string(),
        });
    }

    let message = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => BackendError::NotFound {
            name: resource.to_string(),
        },
        StatusCode::CONFLICT => BackendError::AlreadyExists {
            name: resource.to_string(),
        },
        _ => BackendError::Status {
            code: status.as_u16(),
            message,
        },
    })
}
