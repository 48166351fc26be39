//! Demo binary exercising the full submission flow against the in-memory
//! backends.
//!
//! Registers a delayed endpoint and a scheduled endpoint, enqueues a couple
//! of tasks, and schedules the same job twice to show that the second call
//! is a no-op. Run with `RUST_LOG=debug` to watch the reconciliation
//! decisions.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskroute::backend::memory::{InMemoryScheduler, InMemoryTaskQueue};
use taskroute::endpoints::{DelayedRouteBuilder, ScheduledRouteBuilder};
use taskroute::route::{BodySpec, CallArguments, JsonType, RouteDescriptor};
use taskroute::{DelayOverrides, ScheduleOverrides};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let base_url = "http://localhost:8000";
    let queue_path = "projects/sample-project/locations/us-central1/queues/main";
    let location_path = "projects/sample-project/locations/us-central1";

    let tasks = Arc::new(InMemoryTaskQueue::new());
    let jobs = Arc::new(InMemoryScheduler::new());

    let delayed = DelayedRouteBuilder::new(base_url, queue_path, tasks.clone());
    let scheduled = ScheduledRouteBuilder::new(base_url, location_path, jobs.clone());

    // A delayed endpoint taking a path parameter and a JSON body.
    let on_user_create = delayed
        .register(
            RouteDescriptor::new("POST", "/on_user_create/{user_id}")
                .unique_id("on_user_create")
                .body(BodySpec::new("data", JsonType::Object)),
        )
        .await?;

    let task = on_user_create
        .delay(
            &CallArguments::new()
                .arg("user_id", "007")
                .arg("data", json!({"name": "Piyush"})),
        )
        .await?;
    info!(name = ?task.name, url = %task.http_request.url, "enqueued immediate task");

    // Same endpoint, delayed by five minutes and deduplicated by task id.
    let task = on_user_create
        .options(
            DelayOverrides::new()
                .countdown(300)
                .task_id("welcome-user-007"),
        )?
        .delay(
            &CallArguments::new()
                .arg("user_id", "007")
                .arg("data", json!({"name": "Piyush"})),
        )
        .await?;
    info!(
        name = ?task.name,
        schedule_time = ?task.schedule_time,
        "enqueued countdown task"
    );

    // A scheduled endpoint, submitted twice with the same definition. The
    // second call fetches the stored job, sees nothing changed and returns
    // without touching the backend.
    let timed_hello = scheduled.register(
        RouteDescriptor::new("POST", "/timed_hello").unique_id("timed_hello"),
    )?;
    let scheduler = timed_hello.scheduler("timed-hello", "*/5 * * * *", ScheduleOverrides::new())?;

    scheduler.schedule(&CallArguments::new()).await?;
    scheduler.schedule(&CallArguments::new()).await?;
    info!(
        create_calls = jobs.create_job_calls(),
        delete_calls = jobs.delete_job_calls(),
        "schedule submitted twice"
    );

    info!(
        tasks = tasks.tasks().len(),
        queues = tasks.queues().len(),
        jobs = jobs.jobs().len(),
        "demo complete"
    );
    Ok(())
}
