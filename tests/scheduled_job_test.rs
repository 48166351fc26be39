//! Integration tests for recurring-job submission and reconciliation,
//! backed by the in-memory scheduler client.

use anyhow::Result;
use std::sync::Arc;

use taskroute::backend::memory::InMemoryScheduler;
use taskroute::endpoints::{ScheduleOverrides, ScheduledRouteBuilder};
use taskroute::route::{CallArguments, RouteDescriptor};

const BASE_URL: &str = "http://listener.example.com";
const LOCATION_PATH: &str = "projects/sample-project/locations/us-central1";

fn builder(client: Arc<InMemoryScheduler>) -> ScheduledRouteBuilder {
    ScheduledRouteBuilder::new(BASE_URL, LOCATION_PATH, client)
}

fn route() -> RouteDescriptor {
    RouteDescriptor::new("POST", "/timed_hello").unique_id("timed_hello")
}

#[tokio::test]
async fn test_second_identical_schedule_is_a_no_op() -> Result<()> {
    let client = Arc::new(InMemoryScheduler::new());
    let endpoint = builder(client.clone()).register(route())?;
    let scheduler = endpoint.scheduler("timed-hello", "*/5 * * * *", ScheduleOverrides::new())?;

    scheduler.schedule(&CallArguments::new()).await?;
    assert_eq!(client.create_job_calls(), 1);
    let deletes_after_first = client.delete_job_calls();

    // Second identical call performs zero mutating backend calls.
    scheduler.schedule(&CallArguments::new()).await?;
    assert_eq!(client.create_job_calls(), 1);
    assert_eq!(client.delete_job_calls(), deletes_after_first);
    assert_eq!(client.jobs().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_changed_cron_triggers_exactly_one_replace() -> Result<()> {
    let client = Arc::new(InMemoryScheduler::new());
    let endpoint = builder(client.clone()).register(route())?;

    endpoint
        .scheduler("timed-hello", "*/5 * * * *", ScheduleOverrides::new())?
        .schedule(&CallArguments::new())
        .await?;
    assert_eq!(client.create_job_calls(), 1);
    let deletes_after_first = client.delete_job_calls();

    endpoint
        .scheduler("timed-hello", "*/10 * * * *", ScheduleOverrides::new())?
        .schedule(&CallArguments::new())
        .await?;

    // The changed definition replaced the stored job exactly once.
    assert_eq!(client.delete_job_calls(), deletes_after_first + 1);
    assert_eq!(client.create_job_calls(), 2);
    assert_eq!(client.jobs().len(), 1);
    assert_eq!(client.jobs()[0].schedule, "*/10 * * * *");
    Ok(())
}

#[tokio::test]
async fn test_changed_time_zone_triggers_replace() -> Result<()> {
    let client = Arc::new(InMemoryScheduler::new());
    let endpoint = builder(client.clone()).register(route())?;

    endpoint
        .scheduler("timed-hello", "*/5 * * * *", ScheduleOverrides::new())?
        .schedule(&CallArguments::new())
        .await?;
    let deletes_after_first = client.delete_job_calls();

    endpoint
        .scheduler(
            "timed-hello",
            "*/5 * * * *",
            ScheduleOverrides::new().time_zone("Asia/Kolkata"),
        )?
        .schedule(&CallArguments::new())
        .await?;

    assert_eq!(client.delete_job_calls(), deletes_after_first + 1);
    assert_eq!(client.jobs()[0].time_zone, "Asia/Kolkata");
    Ok(())
}

#[tokio::test]
async fn test_force_replaces_without_change_check() -> Result<()> {
    let client = Arc::new(InMemoryScheduler::new());
    let endpoint = builder(client.clone()).register(route())?;
    let scheduler = endpoint.scheduler(
        "timed-hello",
        "*/5 * * * *",
        ScheduleOverrides::new().force(true),
    )?;

    scheduler.schedule(&CallArguments::new()).await?;
    scheduler.schedule(&CallArguments::new()).await?;

    // Forced mode never consults the stored job.
    assert_eq!(client.get_job_calls(), 0);
    assert_eq!(client.create_job_calls(), 2);
    assert_eq!(client.delete_job_calls(), 2);
    assert_eq!(client.jobs().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_distinct_names_coexist() -> Result<()> {
    let client = Arc::new(InMemoryScheduler::new());
    let endpoint = builder(client.clone()).register(route())?;

    endpoint
        .scheduler("hourly", "0 * * * *", ScheduleOverrides::new())?
        .schedule(&CallArguments::new())
        .await?;
    endpoint
        .scheduler("daily", "0 0 * * *", ScheduleOverrides::new())?
        .schedule(&CallArguments::new())
        .await?;

    assert_eq!(client.jobs().len(), 2);
    Ok(())
}
