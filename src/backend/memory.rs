//! In-memory backend clients for development and tests.
//!
//! These stand in for the hosted services the same way the Cloud Tasks
//! emulator does: tasks and jobs live in process, duplicate names are
//! rejected with `AlreadyExists`, and created jobs grow the fields the real
//! backend injects (state, update time, a `User-Agent` header on the target)
//! so reconciliation code is exercised realistically. Call counters let
//! tests assert exactly how many mutating calls a code path performed.

use chrono::Utc;
use ordermap::OrderMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;
use ulid::Ulid;

use super::types::{CreateJobRequest, CreateQueueRequest, CreateTaskRequest, Job, Queue, Task};
use super::{BackendError, SchedulerClient, TaskQueueClient};
use async_trait::async_trait;

/// In-memory task queue client.
#[derive(Default)]
pub struct InMemoryTaskQueue {
    tasks: Mutex<OrderMap<String, Task>>,
    queues: Mutex<OrderMap<String, Queue>>,
    create_task_calls: AtomicUsize,
    create_queue_calls: AtomicUsize,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().values().cloned().collect()
    }

    pub fn queues(&self) -> Vec<Queue> {
        self.queues.lock().values().cloned().collect()
    }

    pub fn create_task_calls(&self) -> usize {
        self.create_task_calls.load(Ordering::SeqCst)
    }

    pub fn create_queue_calls(&self) -> usize {
        self.create_queue_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskQueueClient for InMemoryTaskQueue {
    async fn create_task(
        &self,
        request: &CreateTaskRequest,
        _timeout: Duration,
    ) -> Result<Task, BackendError> {
        self.create_task_calls.fetch_add(1, Ordering::SeqCst);
        let mut task = request.task.clone();
        let name = task
            .name
            .clone()
            .unwrap_or_else(|| format!("{}/tasks/{}", request.parent, Ulid::new()));

        let mut tasks = self.tasks.lock();
        if tasks.contains_key(&name) {
            return Err(BackendError::AlreadyExists { name });
        }
        task.name = Some(name.clone());
        debug!(task = %name, "created in-memory task");
        tasks.insert(name, task.clone());
        Ok(task)
    }

    async fn create_queue(
        &self,
        request: &CreateQueueRequest,
        _timeout: Duration,
    ) -> Result<Queue, BackendError> {
        self.create_queue_calls.fetch_add(1, Ordering::SeqCst);
        let mut queues = self.queues.lock();
        let name = request.queue.name.clone();
        if queues.contains_key(&name) {
            return Err(BackendError::AlreadyExists { name });
        }
        queues.insert(name, request.queue.clone());
        Ok(request.queue.clone())
    }
}

/// In-memory scheduler client.
#[derive(Default)]
pub struct InMemoryScheduler {
    jobs: Mutex<OrderMap<String, Job>>,
    create_job_calls: AtomicUsize,
    get_job_calls: AtomicUsize,
    delete_job_calls: AtomicUsize,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().values().cloned().collect()
    }

    pub fn create_job_calls(&self) -> usize {
        self.create_job_calls.load(Ordering::SeqCst)
    }

    pub fn get_job_calls(&self) -> usize {
        self.get_job_calls.load(Ordering::SeqCst)
    }

    pub fn delete_job_calls(&self) -> usize {
        self.delete_job_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchedulerClient for InMemoryScheduler {
    async fn create_job(
        &self,
        request: &CreateJobRequest,
        _timeout: Duration,
    ) -> Result<Job, BackendError> {
        self.create_job_calls.fetch_add(1, Ordering::SeqCst);
        let mut job = request.job.clone();

        // Fields the hosted backend assigns on create.
        job.user_update_time = Some(Utc::now());
        job.state = Some("ENABLED".to_string());
        job.http_target
            .headers
            .insert("User-Agent".to_string(), "Google-Cloud-Scheduler".to_string());

        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.name) {
            return Err(BackendError::AlreadyExists {
                name: job.name.clone(),
            });
        }
        debug!(job = %job.name, "created in-memory job");
        jobs.insert(job.name.clone(), job.clone());
        Ok(job)
    }

    async fn get_job(&self, name: &str, _timeout: Duration) -> Result<Job, BackendError> {
        self.get_job_calls.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
            })
    }

    async fn delete_job(&self, name: &str, _timeout: Duration) -> Result<(), BackendError> {
        self.delete_job_calls.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::{HttpMethod, HttpRequest};

    fn task_request(name: Option<&str>) -> CreateTaskRequest {
        CreateTaskRequest {
            parent: "projects/p/locations/l/queues/q".to_string(),
            task: Task {
                name: name.map(String::from),
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

    #[tokio::test]
    async fn test_create_task_assigns_name() {
        let queue = InMemoryTaskQueue::new();
        let task = queue
            .create_task(&task_request(None), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(
            task.name
                .unwrap()
                .starts_with("projects/p/locations/l/queues/q/tasks/")
        );
        assert_eq!(queue.create_task_calls(), 1);
    }

    #[tokio::test]
    async fn test_create_task_rejects_duplicate_name() {
        let queue = InMemoryTaskQueue::new();
        let named = task_request(Some("projects/p/locations/l/queues/q/tasks/t1"));
        queue
            .create_task(&named, Duration::from_secs(1))
            .await
            .unwrap();
        let err = queue
            .create_task(&named, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(queue.tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_job_is_not_found() {
        let scheduler = InMemoryScheduler::new();
        let err = scheduler
            .delete_job("projects/p/locations/l/jobs/none", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_existing_job_removes_it() {
        let scheduler = InMemoryScheduler::new();
        let request = CreateJobRequest {
            parent: "projects/p/locations/l".to_string(),
            job: Job {
                name: "projects/p/locations/l/jobs/j1".to_string(),
                http_target: crate::backend::types::HttpTarget {
                    http_method: HttpMethod::Post,
                    uri: "http://listener.example.com/hello".to_string(),
                    headers: OrderMap::new(),
                    body: None,
                    oidc_token: None,
                },
                schedule: "*/5 * * * *".to_string(),
                time_zone: "UTC".to_string(),
                retry_config: crate::backend::types::RetryConfig::default(),
                attempt_deadline: None,
                user_update_time: None,
                state: None,
                status: None,
                last_attempt_time: None,
                schedule_time: None,
            },
        };
        scheduler
            .create_job(&request, Duration::from_secs(1))
            .await
            .unwrap();
        scheduler
            .delete_job("projects/p/locations/l/jobs/j1", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(scheduler.jobs().is_empty());
    }
}
