//! Resource path helpers and idempotent queue provisioning.

use std::time::Duration;
use tracing::debug;

use crate::backend::types::{CreateQueueRequest, Queue};
use crate::backend::{BackendError, TaskQueueClient};

/// `projects/{project}/locations/{location}`
pub fn location_path(project: &str, location: &str) -> String {
    format!("projects/{}/locations/{}", project, location)
}

/// `projects/{project}/locations/{location}/queues/{queue}`
pub fn queue_path(project: &str, location: &str, queue: &str) -> String {
    format!("{}/queues/{}", location_path(project, location), queue)
}

/// `projects/{project}/locations/{location}/jobs/{job}`
pub fn job_path(project: &str, location: &str, job: &str) -> String {
    format!("{}/jobs/{}", location_path(project, location), job)
}

/// Parse `projects/{p}/locations/{l}` out of a location path.
pub fn parse_location_path(path: &str) -> Result<(String, String), BackendError> {
    let parts: Vec<&str> = path.split('/').collect();
    match parts.as_slice() {
        ["projects", project, "locations", location] if !project.is_empty() && !location.is_empty() => {
            Ok((project.to_string(), location.to_string()))
        }
        _ => Err(BackendError::MalformedPath {
            path: path.to_string(),
        }),
    }
}

/// Parse `projects/{p}/locations/{l}/queues/{q}` out of a queue path.
pub fn parse_queue_path(path: &str) -> Result<(String, String, String), BackendError> {
    let parts: Vec<&str> = path.split('/').collect();
    match parts.as_slice() {
        ["projects", project, "locations", location, "queues", queue]
            if !project.is_empty() && !location.is_empty() && !queue.is_empty() =>
        {
            Ok((project.to_string(), location.to_string(), queue.to_string()))
        }
        _ => Err(BackendError::MalformedPath {
            path: path.to_string(),
        }),
    }
}

/// Ensure the named queue exists, idempotently.
///
/// Extracts project and location from the queue path and issues a create
/// under the location parent. `AlreadyExists` is success; multiple instances
/// racing to provision the same queue at startup is expected and benign.
pub async fn ensure_queue(
    client: &dyn TaskQueueClient,
    path: &str,
    timeout: Duration,
) -> Result<(), BackendError> {
    let (project, location, _queue) = parse_queue_path(path)?;
    let request = CreateQueueRequest {
        parent: location_path(&project, &location),
        queue: Queue {
            name: path.to_string(),
        },
    };
    match client.create_queue(&request, timeout).await {
        Ok(_) => {
            debug!(queue = %path, "queue created");
            Ok(())
        }
        Err(e) if e.is_already_exists() => {
            debug!(queue = %path, "queue already provisioned");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
