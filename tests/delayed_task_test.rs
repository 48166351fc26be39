//! Integration tests for delayed task submission through registered
//! endpoints, backed by the in-memory queue client.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;

use taskroute::backend::memory::InMemoryTaskQueue;
use taskroute::backend::types::HttpMethod;
use taskroute::endpoints::{DelayOverrides, DelayedRouteBuilder};
use taskroute::route::{BodySpec, CallArguments, JsonType, RouteDescriptor};

const BASE_URL: &str = "http://listener.example.com";
const QUEUE_PATH: &str = "projects/sample-project/locations/us-central1/queues/main";

fn builder(client: Arc<InMemoryTaskQueue>) -> DelayedRouteBuilder {
    DelayedRouteBuilder::new(BASE_URL, QUEUE_PATH, client)
}

#[tokio::test]
async fn test_delay_reconstructs_full_request() -> Result<()> {
    let client = Arc::new(InMemoryTaskQueue::new());
    let endpoint = builder(client.clone())
        .register(
            RouteDescriptor::new("POST", "/on_user_create/{user_id}")
                .unique_id("on_user_create")
                .body(BodySpec::new("user", JsonType::Object)),
        )
        .await?;

    let task = endpoint
        .delay(
            &CallArguments::new()
                .arg("user_id", "007")
                .arg("user", json!({"name": "Piyush"})),
        )
        .await?;

    assert_eq!(task.http_request.http_method, HttpMethod::Post);
    assert_eq!(
        task.http_request.url,
        "http://listener.example.com/on_user_create/007"
    );
    assert_eq!(
        task.http_request.body.as_deref(),
        Some(br#"{"name":"Piyush"}"#.as_slice())
    );
    assert_eq!(
        task.http_request.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
    assert!(
        task.http_request
            .headers
            .keys()
            .all(|name| !name.to_ascii_lowercase().starts_with("x-cloudtasks")
                && !name.to_ascii_lowercase().starts_with("x_cloudtasks"))
    );

    // Queue was provisioned before the task landed in it.
    assert_eq!(client.queues().len(), 1);
    assert_eq!(client.tasks().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_countdown_semantics() -> Result<()> {
    let client = Arc::new(InMemoryTaskQueue::new());
    let endpoint = builder(client.clone())
        .register(RouteDescriptor::new("POST", "/hello"))
        .await?;

    let immediate = endpoint.delay(&CallArguments::new()).await?;
    assert!(immediate.schedule_time.is_none());

    let before = Utc::now();
    let delayed = endpoint
        .options(DelayOverrides::new().countdown(60))?
        .delay(&CallArguments::new())
        .await?;
    let offset = delayed.schedule_time.unwrap() - before;
    assert!(offset >= ChronoDuration::seconds(59));
    assert!(offset <= ChronoDuration::seconds(61));
    Ok(())
}

#[tokio::test]
async fn test_dedup_by_task_id_yields_one_task() -> Result<()> {
    let client = Arc::new(InMemoryTaskQueue::new());
    let endpoint = builder(client.clone())
        .register_with_defaults(
            RouteDescriptor::new("POST", "/hello"),
            DelayOverrides::new().task_id("nightly-run"),
        )
        .await?;

    endpoint.delay(&CallArguments::new()).await?;
    endpoint.delay(&CallArguments::new()).await?;

    assert_eq!(client.tasks().len(), 1);
    assert_eq!(
        client.tasks()[0].name.as_deref(),
        Some("projects/sample-project/locations/us-central1/queues/main/tasks/nightly-run")
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_required_parameter_fails_before_network() -> Result<()> {
    let client = Arc::new(InMemoryTaskQueue::new());
    let endpoint = builder(client.clone())
        .register(
            RouteDescriptor::new("POST", "/hello")
                .body(BodySpec::new("payload", JsonType::Object)),
        )
        .await?;

    let err = endpoint.delay(&CallArguments::new()).await.unwrap_err();
    assert!(err.to_string().contains("payload"));
    assert_eq!(client.create_task_calls(), 0);
    Ok(())
}
